//! Content-management backend for a media organization: accounts with role
//! gates, blog items with categories and public comments, a services
//! catalog, and the shows/seasons/episodes hierarchy.

pub mod auth;
pub mod db;
pub mod error;
pub mod logging;
pub mod media;
pub mod repo;
pub mod routes;
pub mod slug;
pub mod state;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use auth::middleware::{authenticate, require_admin, require_author, require_presenter};
use state::AppState;

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                "http://localhost:3000".parse().unwrap(),
                "http://127.0.0.1:3000".parse().unwrap(),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

async fn root() -> Json<routes::MessageResponse> {
    Json(routes::MessageResponse {
        message: "Media CMS backend is running".to_string(),
    })
}

/// No credentials needed: sign-up/sign-in, health, and the public read and
/// comment surface.
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/api/auth/sign-up", post(routes::auth::sign_up))
        .route("/api/auth/sign-in", post(routes::auth::sign_in))
        .route("/health", get(routes::health::health_ping))
        .route("/health/database", get(routes::health::health_database))
        .route("/api/blogs/{slug}", get(routes::blogs::get_by_slug))
        .route("/api/blogs/like/{slug}", patch(routes::blogs::like))
        .route(
            "/api/blogs/comments/{slug}",
            get(routes::blogs::list_comments)
                .post(routes::blogs::create_comment)
                .patch(routes::blogs::like_comment),
        )
        .route(
            "/api/blogs/category/get-categories",
            get(routes::blogs::list_categories),
        )
        .route(
            "/api/blogs/comments/delete/{id}",
            axum::routing::delete(routes::blogs::delete_comment),
        )
        .route("/api/shows", get(routes::shows::list))
        .route("/api/shows/{id}", get(routes::shows::get_by_id))
        .route("/api/shows/seasons/{id}", get(routes::shows::list_seasons))
        .route(
            "/api/shows/seasons/episodes/{id}",
            get(routes::shows::list_episodes),
        )
}

/// Any active account, no role requirement.
fn authenticated_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/users/me", get(routes::users::me))
        .route(
            "/api/shows/seasons/episodes/{id}/{episode_id}",
            axum::routing::delete(routes::shows::delete_episode),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
}

fn author_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/blogs",
            get(routes::blogs::list).post(routes::blogs::create),
        )
        .route("/api/blogs/{slug}", patch(routes::blogs::update))
        .route(
            "/api/blogs/type/toggle/{slug}",
            patch(routes::blogs::toggle_type),
        )
        .route(
            "/api/blogs/category/create",
            post(routes::blogs::create_category),
        )
        .route(
            "/api/blogs/category/{id}",
            axum::routing::delete(routes::blogs::delete_category),
        )
        .route_layer(middleware::from_fn(require_author))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
}

fn presenter_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/shows", post(routes::shows::create))
        .route("/api/shows/{id}", patch(routes::shows::update))
        .route(
            "/api/shows/seasons/episodes/{id}",
            patch(routes::shows::add_episodes),
        )
        .route(
            "/api/shows/episodes/{id}",
            patch(routes::shows::update_episode),
        )
        .route_layer(middleware::from_fn(require_presenter))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/users",
            get(routes::users::list).post(routes::users::create),
        )
        .route("/api/users/stats", get(routes::users::stats))
        .route(
            "/api/users/{id}",
            get(routes::users::get_by_id)
                .patch(routes::users::update)
                .delete(routes::users::delete),
        )
        .route(
            "/api/users/toggle-status/{id}",
            patch(routes::users::toggle_status),
        )
        .route(
            "/api/blogs/{slug}",
            axum::routing::delete(routes::blogs::delete),
        )
        .route(
            "/api/services",
            get(routes::services::list).post(routes::services::create),
        )
        .route(
            "/api/services/{id}",
            get(routes::services::get_by_id)
                .patch(routes::services::update)
                .delete(routes::services::delete),
        )
        .route(
            "/api/shows/{id}",
            axum::routing::delete(routes::shows::delete),
        )
        .route("/api/shows/seasons", post(routes::shows::create_season))
        .route(
            "/api/shows/seasons/{id}",
            axum::routing::delete(routes::shows::delete_season),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors();
    tracing::info!("CORS configured");

    public_routes()
        .merge(authenticated_routes(&state))
        .merge(author_routes(&state))
        .merge(presenter_routes(&state))
        .merge(admin_routes(&state))
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        // Image parts are capped at 5 MB; the body cap leaves headroom for
        // the rest of the multipart payload.
        .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024))
        .layer(cors)
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();

    // Guards MUST be held for the programme's lifetime; dropping them early
    // shuts down background log-writer threads and loses buffered log lines.
    let _log_guards = logging::init();

    routes::health::init_start_time();

    // Refuse to start in production with the insecure default JWT secret.
    let environment = std::env::var("ENVIRONMENT").unwrap_or_default();
    if environment == "production" {
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        if secret.is_empty() || secret == "default-jwt-secret-change-in-production" {
            panic!(
                "FATAL: JWT_SECRET must be set to a secure, unique value in production. \
                 Refusing to start with the default secret."
            );
        }
    }

    let pool = if std::env::var("DATABASE_URL").is_ok() {
        match db::init_pool(None).await {
            Ok(pool) => {
                if let Err(e) = db::run_migrations(&pool).await {
                    tracing::error!("Failed to run database migrations: {}", e);
                }
                Some(pool)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize database pool: {}. Continuing without database.",
                    e
                );
                None
            }
        }
    } else {
        tracing::info!("DATABASE_URL not set. Running without database connection.");
        None
    };

    let media = Arc::new(media::CloudinaryStore::from_env());
    let state = AppState::new(pool, media);

    let app = create_app(state);

    // Bind address is configurable via HOST / PORT env vars, defaulting to
    // 127.0.0.1:3001 so existing dev setups keep working unchanged.
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3001);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Invalid HOST/PORT configuration");
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app).await.expect("Server error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        create_app(AppState::for_tests())
    }

    #[tokio::test]
    async fn test_root_answers() {
        let res = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_gated_routes_require_credentials() {
        for (method, uri) in [
            ("GET", "/api/users"),
            ("GET", "/api/users/me"),
            ("GET", "/api/blogs"),
            ("GET", "/api/services"),
            ("POST", "/api/shows"),
            ("POST", "/api/shows/seasons"),
        ] {
            let res = app()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(
                res.status(),
                StatusCode::UNAUTHORIZED,
                "{method} {uri} should demand a token"
            );
        }
    }

    #[tokio::test]
    async fn test_public_reads_skip_authentication() {
        // 503 (no database), not 401: the request got past the gates.
        for uri in [
            "/api/shows",
            "/api/blogs/category/get-categories",
            "/api/blogs/some-slug",
            "/api/blogs/comments/some-slug",
        ] {
            let res = app()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(
                res.status(),
                StatusCode::SERVICE_UNAVAILABLE,
                "{uri} should be public"
            );
        }
    }

    #[tokio::test]
    async fn test_health_is_public_and_alive() {
        let res = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
