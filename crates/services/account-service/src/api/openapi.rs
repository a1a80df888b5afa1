//! OpenAPI document, served as JSON.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{account_handler, auth_handler};
use crate::config::DEFAULT_SESSION_COOKIE;
use domain::{AccountStatus, AccountSummary};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Account Service",
        version = "0.1.0",
        description = "Account administration behind a permission gate"
    ),
    paths(
        auth_handler::login,
        auth_handler::logout,
        account_handler::list_accounts,
        account_handler::get_account,
        account_handler::add_account,
        account_handler::edit_account,
        account_handler::delete_account,
        account_handler::change_password,
    ),
    components(
        schemas(
            AccountStatus,
            AccountSummary,
            auth_handler::LoginForm,
            auth_handler::LoginResponse,
            account_handler::AddAccountForm,
            account_handler::EditAccountForm,
            account_handler::DeleteAccountForm,
            account_handler::ChangePasswordForm,
        )
    ),
    modifiers(&SessionCookieAddon),
    tags(
        (name = "Authentication", description = "Sign in and out"),
        (name = "Accounts", description = "Account lifecycle")
    )
)]
pub struct ApiDoc;

/// Session cookie security scheme
struct SessionCookieAddon;

impl Modify for SessionCookieAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    DEFAULT_SESSION_COOKIE,
                    "Session token set by /api/auth/login",
                ))),
            );
        }
    }
}
