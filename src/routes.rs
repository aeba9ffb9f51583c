// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, exam, register, results, sync},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (registration, exam, results, sync, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let exam_routes = Router::new()
        .route("/{session_id}", get(exam::get_session))
        .route("/{session_id}/answers/{index}", put(exam::answer_question))
        .route("/{session_id}/next", post(exam::next_question))
        .route("/{session_id}/previous", post(exam::previous_question))
        .route("/{session_id}/submit", post(exam::submit_exam));

    let results_routes = Router::new()
        .route("/search", get(results::search_results))
        .route("/summary", get(results::result_summary));

    let admin_routes = Router::new()
        .route("/login", post(admin::login))
        // Protected admin routes: Auth first, then Admin check
        .merge(
            Router::new()
                .route("/results", get(admin::list_results))
                .route(
                    "/results/{user_id}",
                    put(admin::update_result).delete(admin::delete_result),
                )
                .layer(middleware::from_fn(admin_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    Router::new()
        .route("/api/register", post(register::register))
        .route("/api/offline/users", get(results::pending_users))
        .route("/api/sync", post(sync::trigger_sync))
        .route("/api/sync/status", get(sync::sync_status))
        .nest("/api/exam", exam_routes)
        .nest("/api/results", results_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::Config,
        store::{LocalBuffer, PgRemoteStore},
    };

    fn local_only_router() -> Router {
        let config = Config::from_lookup(|key| match key {
            "JWT_SECRET" => Some("secret".to_string()),
            "LOCAL_BUFFER_URL" => Some("none".to_string()),
            _ => None,
        })
        .unwrap();
        let state = AppState::new(
            config,
            LocalBuffer::disabled(),
            Arc::new(PgRemoteStore::unconfigured()),
        )
        .unwrap();
        create_router(state)
    }

    async fn status_of(request: Request<Body>) -> StatusCode {
        local_only_router().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_admin_results_need_a_bearer_token() {
        let request = Request::get("/api/admin/results")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);

        let request = Request::get("/api/admin/results")
            .header(header::AUTHORIZATION, "Bearer not-a-token")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_search_without_remote_is_unavailable() {
        let request = Request::get("/api/results/search?enrollment_id=A001")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_admin_login_is_locked_without_credentials() {
        let request = Request::post("/api/admin/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"username":"a","password":"b"}"#))
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
    }
}
