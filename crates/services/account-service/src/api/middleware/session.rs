//! Session cookie middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use common::AppError;
use domain::Session;

use crate::api::AppState;

/// Resolved caller identity. `None` when the request carried no session cookie.
#[derive(Clone, Debug, Default)]
pub struct Caller(pub Option<Session>);

impl Caller {
    pub fn session(&self) -> Option<&Session> {
        self.0.as_ref()
    }
}

/// Resolve the session cookie once per request and attach the result as a
/// [`Caller`] extension.
///
/// A cookie that does not resolve to a live session is rejected here; an
/// absent cookie is passed through as an anonymous caller.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let jar = CookieJar::from_headers(request.headers());

    let session = match jar.get(&state.session_cookie) {
        Some(cookie) => Some(state.auth_service.resolve(Some(cookie.value())).await?),
        None => None,
    };

    request.extensions_mut().insert(Caller(session));
    Ok(next.run(request).await)
}
