use std::{any::Any, net::SocketAddr};

use axum::{
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::{self, extractors::require_user};
use crate::error::AppError;
use crate::state::AppState;
use crate::{categories, operations};

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth::handlers::protected_routes())
        .merge(categories::handlers::routes())
        .merge(operations::handlers::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::handlers::public_routes())
                .merge(protected)
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    AppError::internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::UserRepo;
    use crate::memory::MemoryStore;
    use crate::operations::repo_types::OperationType;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use time::macros::datetime;
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register_and_login(app: &Router, username: &str) -> String {
        let email = format!("{username}@example.com");
        let (status, body) = send(
            app,
            Method::POST,
            "/api/users",
            None,
            Some(json!({"username": username, "email": email, "password": "secret"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body, json!({"message": "User successfully created."}));

        let (status, body) = send(
            app,
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({"email": email, "password": "secret"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["expires_in"], json!(3600));
        body["token"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let app = build_app(AppState::fake());
        for uri in [
            "/api/users/current",
            "/api/users/balance",
            "/api/categories",
            "/api/operations",
            "/api/operations/1",
        ] {
            let (status, body) = send(&app, Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body, json!({"error": "Not authorized"}));
        }
    }

    #[tokio::test]
    async fn full_flow_reports_balance() {
        let store = Arc::new(MemoryStore::default());
        let work = store.insert_category(None, "Work", "#fdg123");
        let app = build_app(AppState::with_memory_store(store));
        let token = register_and_login(&app, "pedro").await;

        let (status, body) = send(&app, Method::GET, "/api/users/current", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"email": "pedro@example.com", "username": "pedro"})
        );

        for (kind, amount) in [("income", 100.25), ("expense", 29.75)] {
            let (status, body) = send(
                &app,
                Method::POST,
                "/api/operations",
                Some(&token),
                Some(json!({
                    "type": kind,
                    "amount": amount,
                    "date": "2024-04-30T10:00:00Z",
                    "description": "entry",
                    "category_id": work.id.to_string(),
                })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            assert_eq!(body, json!({"message": "Operation successfully created."}));
        }

        let (status, body) = send(&app, Method::GET, "/api/operations", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["category"], json!({"name": "Work", "color": "#fdg123"}));

        let (status, body) = send(&app, Method::GET, "/api/users/balance", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"total_balance": "70.50"}));
    }

    #[tokio::test]
    async fn zero_amount_is_rejected_before_category_lookup() {
        let app = build_app(AppState::fake());
        let token = register_and_login(&app, "pedro").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/operations",
            Some(&token),
            Some(json!({
                "type": "income",
                "amount": 0,
                "date": "2024-04-30T10:00:00Z",
                "category_id": "1",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid parameters."}));
    }

    #[tokio::test]
    async fn unknown_category_is_unprocessable() {
        let app = build_app(AppState::fake());
        let token = register_and_login(&app, "pedro").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/operations",
            Some(&token),
            Some(json!({
                "type": "expense",
                "amount": 12.5,
                "date": "2024-04-30T10:00:00Z",
                "category_id": "42",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, json!({"error": "Invalid category."}));
    }

    #[tokio::test]
    async fn malformed_bodies_are_invalid_parameters() {
        let app = build_app(AppState::fake());
        let token = register_and_login(&app, "pedro").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/categories",
            Some(&token),
            Some(json!({"name": "Custom", "color": "193zge"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid parameters."}));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/operations",
            Some(&token),
            Some(json!({"type": "income", "amount": "lots"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid parameters."}));
    }

    #[tokio::test]
    async fn foreign_resources_look_missing() {
        let store = Arc::new(MemoryStore::default());
        let work = store.insert_category(None, "Work", "#fdg123");
        let app = build_app(AppState::with_memory_store(store.clone()));
        let alice = register_and_login(&app, "alice").await;
        let bob = register_and_login(&app, "bob").await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/categories",
            Some(&alice),
            Some(json!({"name": "Mine", "color": "#6495ed"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, listed) = send(&app, Method::GET, "/api/categories", Some(&alice), None).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);
        let own_id = listed[1]["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/api/categories/{own_id}"),
            Some(&bob),
            Some(json!({"name": "Stolen", "color": "#000000"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not found."}));
        assert_eq!(store.category(own_id).unwrap().name, "Mine");

        let alice_id = UserRepo::find_by_email(&*store, "alice@example.com")
            .await
            .unwrap()
            .unwrap()
            .id;
        let op = store.insert_operation(
            alice_id,
            work.id,
            OperationType::Income,
            Decimal::new(10, 0),
            datetime!(2024-04-01 00:00 UTC),
            "private",
        );
        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/operations/{}", op.id),
            Some(&bob),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not found."}));

        let (status, body) = send(&app, Method::GET, "/api/operations/abc", Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not found."}));
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        async fn boom() -> &'static str {
            panic!("boom")
        }
        let app = Router::new()
            .route("/boom", get(boom))
            .layer(CatchPanicLayer::custom(handle_panic));
        let (status, body) = send(&app, Method::GET, "/boom", None, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal server error"}));
    }
}
