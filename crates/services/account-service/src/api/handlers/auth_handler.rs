//! Authentication handlers.

use axum::{extract::State, response::Json, routing::post, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use common::AppResult;

use crate::api::extractors::ValidatedForm;
use crate::api::AppState;
use crate::types::ApiResponse;

/// Login form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginForm {
    #[serde(rename = "Username", default)]
    #[validate(length(min = 1, message = "Username is required"))]
    #[schema(example = "admin-01")]
    pub username: String,
    #[serde(rename = "Password", default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Signed-in account. The session token travels only in the cookie.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    #[serde(rename = "ID")]
    pub id: Uuid,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ExpiresAt")]
    pub expires_at: DateTime<Utc>,
}

/// Create authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Sign in and receive a session cookie
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Authentication",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Signed in; session cookie set", body = LoginResponse),
        (status = 400, description = "Unknown username or wrong password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedForm(form): ValidatedForm<LoginForm>,
) -> AppResult<(CookieJar, Json<ApiResponse<LoginResponse>>)> {
    let outcome = state
        .auth_service
        .login(&form.username, &form.password)
        .await?;

    let cookie = Cookie::build((state.session_cookie.to_string(), outcome.token.into_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    let body = LoginResponse {
        id: outcome.account.id,
        username: outcome.account.login_name,
        name: outcome.account.display_name,
        expires_at: outcome.session.expires_at,
    };

    Ok((jar.add(cookie), Json(ApiResponse::success(body))))
}

/// End the current session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Authentication",
    responses(
        (status = 200, description = "Signed out; session cookie cleared")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<ApiResponse<()>>)> {
    if let Some(cookie) = jar.get(&state.session_cookie) {
        state.auth_service.logout(cookie.value()).await?;
    }

    let removal = Cookie::build((state.session_cookie.to_string(), "")).path("/");
    Ok((jar.remove(removal), Json(ApiResponse::message("Signed out"))))
}
