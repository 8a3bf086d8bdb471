use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    accounts::extractors::AuthUser,
    error::ApiError,
    products::repo_types::{Product, ProductInput},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/name/:name", get(search_products))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/:id", put(update_product).delete(delete_product))
}

fn validate(input: &ProductInput) -> Result<(), ApiError> {
    if input.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".into()));
    }
    if input.price_cents < 0 {
        return Err(ApiError::BadRequest("price_cents must be >= 0".into()));
    }
    if input.stock < 0 {
        return Err(ApiError::BadRequest("stock must be >= 0".into()));
    }
    Ok(())
}

fn not_found() -> ApiError {
    ApiError::NotFound("Product not found".into())
}

#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.products.list().await?))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    state
        .products
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state))]
pub async fn search_products(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.products.search_by_name(&name).await?))
}

#[instrument(skip(state, body))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    validate(&body)?;
    let product = state.products.insert(body).await?;
    info!(product_id = %product.id, %user_id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, body))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ProductInput>,
) -> Result<Json<Product>, ApiError> {
    validate(&body)?;
    let product = state
        .products
        .update(id, body)
        .await?
        .ok_or_else(not_found)?;
    info!(product_id = %id, %user_id, "product updated");
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.products.delete(id).await? {
        return Err(not_found());
    }
    info!(product_id = %id, %user_id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, price_cents: i64, stock: i32) -> ProductInput {
        ProductInput {
            name: name.into(),
            description: String::new(),
            price_cents,
            stock,
        }
    }

    #[test]
    fn validate_rejects_bad_input() {
        assert!(validate(&input("Turbante", 1000, 1)).is_ok());
        assert!(validate(&input("  ", 1000, 1)).is_err());
        assert!(validate(&input("Turbante", -1, 1)).is_err());
        assert!(validate(&input("Turbante", 0, -1)).is_err());
    }
}
