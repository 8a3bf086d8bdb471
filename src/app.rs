use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{accounts, products};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(accounts::router())
                .merge(products::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = addr.parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::util::ServiceExt; // for `oneshot`

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    fn json_req(method: &str, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    async fn body_json(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register_and_login(app: &Router, email: &str, password: &str) -> Value {
        let res = send(
            app,
            json_req(
                "POST",
                "/api/v1/users/register",
                None,
                json!({"email": email, "full_name": "Ana Souza", "password": password}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = send(
            app,
            json_req(
                "POST",
                "/api/v1/users/login",
                None,
                json!({"email": email, "password": password}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        body_json(res).await
    }

    #[tokio::test]
    async fn health_endpoint_works() {
        let app = build_app(AppState::fake());
        let res = send(
            &app,
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_login_flow() {
        let app = build_app(AppState::fake());
        let login = register_and_login(&app, "a@x.com", "pw1").await;
        assert_eq!(login["token"], "Basic YUB4LmNvbTpwdzE=");
        assert_eq!(login["full_name"], "Ana Souza");
        assert_eq!(login["role"], "customer");
        assert!(login["access_token"].as_str().unwrap().contains('.'));
        assert!(login.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = build_app(AppState::fake());
        register_and_login(&app, "a@x.com", "pw1").await;
        let res = send(
            &app,
            json_req(
                "POST",
                "/api/v1/users/register",
                None,
                json!({"email": "a@x.com", "full_name": "Other", "password": "pw2"}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn register_rejects_malformed_email() {
        let app = build_app(AppState::fake());
        let res = send(
            &app,
            json_req(
                "POST",
                "/api/v1/users/register",
                None,
                json!({"email": "not-an-email", "full_name": "X", "password": "pw"}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_colon_in_email() {
        let app = build_app(AppState::fake());
        let res = send(
            &app,
            json_req(
                "POST",
                "/api/v1/users/register",
                None,
                json!({"email": "a:b@x.com", "full_name": "X", "password": "pw1"}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn issued_basic_token_authenticates_with_colon_in_password() {
        let app = build_app(AppState::fake());
        let login = register_and_login(&app, "a@x.com", "p:w:1").await;
        let res = send(
            &app,
            Request::builder()
                .uri("/api/v1/me")
                .header(header::AUTHORIZATION, login["token"].as_str().unwrap())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["email"], "a@x.com");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let app = build_app(AppState::fake());
        register_and_login(&app, "a@x.com", "pw1").await;

        let wrong = send(
            &app,
            json_req(
                "POST",
                "/api/v1/users/login",
                None,
                json!({"email": "a@x.com", "password": "wrong"}),
            ),
        )
        .await;
        let unknown = send(
            &app,
            json_req(
                "POST",
                "/api/v1/users/login",
                None,
                json!({"email": "b@x.com", "password": "pw1"}),
            ),
        )
        .await;
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(wrong).await, body_json(unknown).await);
    }

    #[tokio::test]
    async fn me_accepts_bearer_and_basic_tokens() {
        let app = build_app(AppState::fake());
        let login = register_and_login(&app, "a@x.com", "pw1").await;
        let bearer = format!("Bearer {}", login["access_token"].as_str().unwrap());
        let basic = login["token"].as_str().unwrap().to_string();

        for auth in [bearer.as_str(), basic.as_str()] {
            let res = send(
                &app,
                Request::builder()
                    .uri("/api/v1/me")
                    .header(header::AUTHORIZATION, auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
            assert_eq!(res.status(), StatusCode::OK);
            assert_eq!(body_json(res).await["id"], login["id"]);
        }

        let res = send(
            &app,
            Request::builder()
                .uri("/api/v1/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn update_profile_own_account_only() {
        let app = build_app(AppState::fake());
        let ana = register_and_login(&app, "a@x.com", "pw1").await;
        let bia = register_and_login(&app, "b@x.com", "pw2").await;
        let auth = format!("Bearer {}", ana["access_token"].as_str().unwrap());

        let res = send(
            &app,
            json_req(
                "PUT",
                "/api/v1/users",
                Some(&auth),
                json!({"id": bia["id"], "full_name": "Hacked", "password": "x"}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = send(
            &app,
            json_req(
                "PUT",
                "/api/v1/users",
                Some(&auth),
                json!({"id": ana["id"], "full_name": "Ana Lima", "password": "pw3"}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["full_name"], "Ana Lima");

        let res = send(
            &app,
            json_req(
                "POST",
                "/api/v1/users/login",
                None,
                json!({"email": "a@x.com", "password": "pw3"}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn product_crud_and_search() {
        let app = build_app(AppState::fake());
        let login = register_and_login(&app, "a@x.com", "pw1").await;
        let auth = format!("Bearer {}", login["access_token"].as_str().unwrap());

        let res = send(
            &app,
            json_req(
                "POST",
                "/api/v1/products",
                None,
                json!({"name": "Turbante", "price_cents": 3500}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = send(
            &app,
            json_req(
                "POST",
                "/api/v1/products",
                Some(&auth),
                json!({"name": "Turbante Estampado", "price_cents": 3500, "stock": 4}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created = body_json(res).await;
        let id = created["id"].as_str().unwrap().to_string();

        let res = send(
            &app,
            Request::builder()
                .uri("/api/v1/products/name/ESTAMP")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let hits = body_json(res).await;
        assert_eq!(hits.as_array().unwrap().len(), 1);
        assert_eq!(hits[0]["id"], created["id"]);

        let res = send(
            &app,
            json_req(
                "PUT",
                &format!("/api/v1/products/{id}"),
                Some(&auth),
                json!({"name": "Turbante Liso", "price_cents": -5}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = send(
            &app,
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/products/{id}"))
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = send(
            &app,
            Request::builder()
                .uri(format!("/api/v1/products/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
