use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::products::repo_types::{Product, ProductInput};

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Product>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>>;
    /// Case-insensitive substring match on the product name.
    async fn search_by_name(&self, fragment: &str) -> anyhow::Result<Vec<Product>>;
    async fn insert(&self, input: ProductInput) -> anyhow::Result<Product>;
    async fn update(&self, id: Uuid, input: ProductInput) -> anyhow::Result<Option<Product>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

/// Escapes LIKE wildcards so the fragment matches literally.
fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[derive(Clone)]
pub struct PgProductRepository {
    db: PgPool,
}

impl PgProductRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn list(&self) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, stock, created_at, updated_at
            FROM products
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, stock, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn search_by_name(&self, fragment: &str) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, stock, created_at, updated_at
            FROM products
            WHERE name ILIKE $1 ESCAPE '\'
            ORDER BY name, id
            "#,
        )
        .bind(like_pattern(fragment))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn insert(&self, input: ProductInput) -> anyhow::Result<Product> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, description, price_cents, stock)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, price_cents, stock, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price_cents)
        .bind(input.stock)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, input: ProductInput) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = $2, description = $3, price_cents = $4, stock = $5, updated_at = now()
            WHERE id = $1
            RETURNING id, name, description, price_cents, stock, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price_cents)
        .bind(input.stock)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[derive(Default)]
pub struct MemoryProductRepository {
    products: RwLock<HashMap<Uuid, Product>>,
}

impl MemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted(mut items: Vec<Product>) -> Vec<Product> {
    items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    items
}

#[async_trait]
impl ProductRepository for MemoryProductRepository {
    async fn list(&self) -> anyhow::Result<Vec<Product>> {
        Ok(sorted(self.products.read().await.values().cloned().collect()))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn search_by_name(&self, fragment: &str) -> anyhow::Result<Vec<Product>> {
        let needle = fragment.to_lowercase();
        let products = self.products.read().await;
        Ok(sorted(
            products
                .values()
                .filter(|p| p.name.to_lowercase().contains(&needle))
                .cloned()
                .collect(),
        ))
    }

    async fn insert(&self, input: ProductInput) -> anyhow::Result<Product> {
        let now = OffsetDateTime::now_utc();
        let product = Product {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            price_cents: input.price_cents,
            stock: input.stock,
            created_at: now,
            updated_at: now,
        };
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(&self, id: Uuid, input: ProductInput) -> anyhow::Result<Option<Product>> {
        let mut products = self.products.write().await;
        let Some(product) = products.get_mut(&id) else {
            return Ok(None);
        };
        product.name = input.name;
        product.description = input.description;
        product.price_cents = input.price_cents;
        product.stock = input.stock;
        product.updated_at = OffsetDateTime::now_utc();
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.products.write().await.remove(&id).is_some())
    }
}
