//! Sign-up and sign-in.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::auth::{self, Role};
use crate::db::models::PublicUser;
use crate::error::ApiError;
use crate::repo;
use crate::routes::MessageResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub gender: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub user: PublicUser,
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = [
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
        payload.email.as_deref(),
        payload.phone.as_deref(),
        payload.password.as_deref(),
        payload.role.as_deref(),
        payload.gender.as_deref(),
    ];
    if fields.iter().any(|f| f.map_or(true, str::is_empty)) {
        return Err(ApiError::Validation(
            "All fields must be filled".to_string(),
        ));
    }
    let (first_name, last_name, email, phone, password, gender) = (
        payload.first_name.unwrap_or_default(),
        payload.last_name.unwrap_or_default(),
        payload.email.unwrap_or_default(),
        payload.phone.unwrap_or_default(),
        payload.password.unwrap_or_default(),
        payload.gender.unwrap_or_default(),
    );

    let role = Role::parse(payload.role.as_deref().unwrap_or_default())
        .ok_or_else(|| ApiError::Validation("Invalid role".to_string()))?;

    let pool = state.pool()?;

    // Fast path; the unique index on email is the real guard.
    if repo::users::find_by_email(pool, &email).await?.is_some() {
        return Err(ApiError::Validation("User already exists".to_string()));
    }

    let password_hash = auth::hash_password(password).await?;

    repo::users::insert(
        pool,
        repo::users::NewUser {
            email,
            password_hash,
            first_name,
            last_name,
            phone,
            role: role.as_str().to_string(),
            created_by: None,
            gender,
            image: None,
        },
    )
    .await?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Account created successfully".to_string(),
        }),
    ))
}

/// Lookup failures and credential failures map to distinct statuses, and the
/// account-status gate runs before the password check.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (email, password) = match (payload.email, payload.password) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e, p),
        _ => {
            return Err(ApiError::Validation(
                "All fields must be filled".to_string(),
            ))
        }
    };

    let pool = state.pool()?;

    let user = repo::users::find_by_email(pool, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if user.status != "active" {
        return Err(ApiError::Authentication(
            "Account is not active".to_string(),
        ));
    }

    if !auth::verify_password(password, user.password_hash.clone()).await {
        return Err(ApiError::Validation("Invalid credentials".to_string()));
    }

    let role = Role::parse(&user.role).unwrap_or(Role::User);
    let token = auth::issue_token(user.id, role)?;

    Ok(Json(SignInResponse {
        token,
        user: user.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request},
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState::for_tests();
        Router::new()
            .route("/api/auth/sign-up", post(sign_up))
            .route("/api/auth/sign-in", post(sign_in))
            .with_state(state)
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_sign_up_rejects_missing_fields() {
        let (status, body) = post_json(
            app(),
            "/api/auth/sign-up",
            r#"{"firstName":"Ada","email":"ada@example.com"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "All fields must be filled");
    }

    #[tokio::test]
    async fn test_sign_up_rejects_empty_strings() {
        let (status, _) = post_json(
            app(),
            "/api/auth/sign-up",
            r#"{"firstName":"Ada","lastName":"L","email":"ada@example.com","phone":"","password":"pw"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sign_up_rejects_unknown_role() {
        let (status, body) = post_json(
            app(),
            "/api/auth/sign-up",
            r#"{"firstName":"Ada","lastName":"L","email":"ada@example.com","phone":"123","password":"pw","role":"owner","gender":"female"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid role");
    }

    #[tokio::test]
    async fn test_sign_up_without_database_is_unavailable() {
        let (status, _) = post_json(
            app(),
            "/api/auth/sign-up",
            r#"{"firstName":"Ada","lastName":"L","email":"ada@example.com","phone":"123","password":"pw","role":"author","gender":"female"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_sign_in_rejects_missing_fields() {
        let (status, body) =
            post_json(app(), "/api/auth/sign-in", r#"{"email":"ada@example.com"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "All fields must be filled");
    }

    #[tokio::test]
    async fn test_sign_in_without_database_is_unavailable() {
        let (status, _) = post_json(
            app(),
            "/api/auth/sign-in",
            r#"{"email":"ada@example.com","password":"pw"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
