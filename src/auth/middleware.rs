//! Access control middleware.
//!
//! Per-request gate chain: bearer extraction, token verification, account
//! status recheck against the store, then role gates layered per route.
//! Terminal outcomes are an `AuthUser` request extension or a 401/403.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::{verify_token, Role};
use crate::error::ApiError;
use crate::repo;
use crate::state::AppState;

/// Authenticated caller context attached to the request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
    pub status: String,
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

async fn resolve_caller(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| ApiError::Authentication("Unauthorized.".to_string()))?;

    let claims =
        verify_token(&token).map_err(|_| ApiError::Authentication("Invalid token.".to_string()))?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::Authentication("Invalid token.".to_string()))?;
    let role = Role::parse(&claims.role)
        .ok_or_else(|| ApiError::Authentication("Invalid token.".to_string()))?;

    // Status is re-read on every request so a deactivated account is locked
    // out immediately, not when its token expires.
    let pool = state.pool()?;
    let user = repo::users::find_by_id(pool, user_id)
        .await?
        .filter(|u| u.status == "active")
        .ok_or_else(|| {
            ApiError::Authentication("Unauthorized. Account inactive.".to_string())
        })?;

    Ok(AuthUser {
        user_id,
        role,
        status: user.status,
    })
}

/// Authentication layer; gated routers wrap this outermost.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_caller(&state, request.headers()).await {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

pub fn role_allowed(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

async fn role_gate(request: Request, next: Next, allowed: &[Role], denied: &str) -> Response {
    let caller = request.extensions().get::<AuthUser>();
    match caller {
        Some(c) if c.status == "active" && role_allowed(c.role, allowed) => next.run(request).await,
        _ => ApiError::Authorization(denied.to_string()).into_response(),
    }
}

pub async fn require_admin(request: Request, next: Next) -> Response {
    role_gate(
        request,
        next,
        &[Role::Admin],
        "Unauthorized. Admins only.",
    )
    .await
}

pub async fn require_presenter(request: Request, next: Next) -> Response {
    role_gate(
        request,
        next,
        &[Role::Presenter, Role::Admin],
        "Unauthorized, only presenters can access this resource",
    )
    .await
}

pub async fn require_author(request: Request, next: Next) -> Response {
    role_gate(
        request,
        next,
        &[Role::Author, Role::Admin],
        "Unauthorized. Only authors can access this resource",
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::middleware;
    use axum::routing::get;
    use axum::{Extension, Router};
    use tower::ServiceExt;

    async fn ok_handler() -> &'static str {
        "ok"
    }

    /// Router with a role gate and a pre-inserted caller, bypassing the
    /// authentication layer so the gate is tested in isolation.
    macro_rules! gated_router {
        ($gate:expr, $caller:expr) => {
            Router::new()
                .route("/gated", get(ok_handler))
                .route_layer(middleware::from_fn($gate))
                .layer(Extension($caller))
        };
    }

    fn caller(role: Role, status: &str) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
            status: status.to_string(),
        }
    }

    async fn hit(app: Router) -> StatusCode {
        let res = app
            .oneshot(HttpRequest::get("/gated").body(Body::empty()).unwrap())
            .await
            .unwrap();
        res.status()
    }

    #[test]
    fn test_role_allowed_is_exact_set_membership() {
        assert!(role_allowed(Role::Admin, &[Role::Admin]));
        assert!(role_allowed(Role::Admin, &[Role::Author, Role::Admin]));
        assert!(!role_allowed(Role::Author, &[Role::Admin]));
        assert!(!role_allowed(Role::User, &[Role::Author, Role::Admin]));
    }

    #[tokio::test]
    async fn test_admin_gate_rejects_author() {
        let status = hit(gated_router!(require_admin, caller(Role::Author, "active"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_gate_accepts_admin() {
        let status = hit(gated_router!(require_admin, caller(Role::Admin, "active"))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_presenter_gate_accepts_presenter_and_admin() {
        assert_eq!(
            hit(gated_router!(require_presenter, caller(Role::Presenter, "active"))).await,
            StatusCode::OK
        );
        assert_eq!(
            hit(gated_router!(require_presenter, caller(Role::Admin, "active"))).await,
            StatusCode::OK
        );
        assert_eq!(
            hit(gated_router!(require_presenter, caller(Role::User, "active"))).await,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_author_gate_rejects_presenter() {
        let status = hit(gated_router!(require_author, caller(Role::Presenter, "active"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_gate_rejects_inactive_status_even_for_admin() {
        let status = hit(gated_router!(require_admin, caller(Role::Admin, "pending"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_gate_rejects_missing_caller_extension() {
        let app = Router::new()
            .route("/gated", get(ok_handler))
            .route_layer(middleware::from_fn(require_admin));
        let status = hit(app).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_authenticate_without_header_is_unauthorized() {
        let state = AppState::for_tests();
        let app = Router::new()
            .route("/gated", get(ok_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
            .with_state(state);
        let status = hit(app).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_authenticate_with_garbage_token_is_unauthorized() {
        let state = AppState::for_tests();
        let app = Router::new()
            .route("/gated", get(ok_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
            .with_state(state);
        let res = app
            .oneshot(
                HttpRequest::get("/gated")
                    .header("authorization", "Bearer junk")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_authenticate_valid_token_without_db_is_unavailable() {
        let state = AppState::for_tests();
        let token = crate::auth::issue_token(Uuid::new_v4(), Role::Admin).unwrap();
        let app = Router::new()
            .route("/gated", get(ok_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
            .with_state(state);
        let res = app
            .oneshot(
                HttpRequest::get("/gated")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
