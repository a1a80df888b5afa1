//! Account lifecycle handlers.
//!
//! Request fields keep their wire names (`Username`, `RoleID`, ...). The
//! caller is always taken from the session, never from a request field.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use common::{AppError, AppResult};
use domain::{AccountDraft, AccountEdit, AccountSummary, FIELD_DEPT_ID, FIELD_ROLE_ID};

use crate::api::extractors::{ValidatedForm, ValidatedQuery};
use crate::api::middleware::Caller;
use crate::api::AppState;
use crate::repository::AccountCriteria;
use crate::service::PasswordChange;
use crate::types::{ApiResponse, Created, Paginated, PaginationParams};

const FIELD_ID: &str = "ID";

/// Account search parameters
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Case-insensitive substring of login name or display name
    #[validate(length(max = 128, message = "keyword must be at most 128 characters"))]
    pub keyword: Option<String>,
    /// Page number, starting at 1
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: Option<u64>,
    /// Page size, capped at 100
    #[serde(rename = "pageSize")]
    #[validate(range(min = 1, message = "pageSize must be at least 1"))]
    pub page_size: Option<u64>,
}

/// Single account lookup
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GetQuery {
    #[serde(rename = "ID", default)]
    #[validate(length(min = 1, message = "ID is required"))]
    pub id: String,
}

/// Account creation form. Presence of every field is checked together.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddAccountForm {
    #[serde(rename = "Username", default)]
    #[schema(example = "user-0102")]
    #[validate(length(max = 64, message = "Username is too long"))]
    pub username: String,
    #[serde(rename = "Password", default)]
    #[schema(example = "123")]
    pub password: String,
    #[serde(rename = "Name", default)]
    #[schema(example = "User 0102")]
    #[validate(length(max = 128, message = "Name is too long"))]
    pub name: String,
    #[serde(rename = "RoleID", default)]
    pub role_id: Option<String>,
    #[serde(rename = "DeptID", default)]
    pub dept_id: Option<String>,
}

/// Account edit form. Blank fields are left unchanged; `Username` is ignored.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EditAccountForm {
    #[serde(rename = "ID", default)]
    #[validate(length(min = 1, message = "ID is required"))]
    pub id: String,
    #[serde(rename = "Username", default)]
    pub username: Option<String>,
    #[serde(rename = "Name", default)]
    #[validate(length(max = 128, message = "Name is too long"))]
    pub name: Option<String>,
    #[serde(rename = "RoleID", default)]
    pub role_id: Option<String>,
    #[serde(rename = "DeptID", default)]
    pub dept_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeleteAccountForm {
    #[serde(rename = "ID", default)]
    #[validate(length(min = 1, message = "ID is required"))]
    pub id: String,
}

/// Password change for the signed-in account
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordForm {
    #[serde(rename = "OldPassword", default)]
    #[validate(length(min = 1, message = "OldPassword is required"))]
    pub old_password: String,
    #[serde(rename = "NewPassword", default)]
    #[validate(length(min = 1, message = "NewPassword is required"))]
    pub new_password: String,
    #[serde(rename = "ConfirmPassword", default)]
    #[validate(length(min = 1, message = "ConfirmPassword is required"))]
    pub confirm_password: String,
}

/// Create account routes
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(list_accounts))
        .route("/get", get(get_account))
        .route("/add", post(add_account))
        .route("/edit", post(edit_account))
        .route("/delete", post(delete_account))
        .route("/change-password", post(change_password))
}

/// Search active accounts
#[utoipa::path(
    get,
    path = "/api/user/list",
    tag = "Accounts",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of account summaries", body = [AccountSummary]),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Missing read permission"),
        (status = 503, description = "Store unavailable, retry later")
    ),
    security(("session_cookie" = []))
)]
pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ValidatedQuery(query): ValidatedQuery<ListQuery>,
) -> AppResult<Json<ApiResponse<Paginated<AccountSummary>>>> {
    let criteria = AccountCriteria::new(
        query.keyword,
        PaginationParams::new(query.page, query.page_size),
    );
    let page = state
        .account_service
        .list(caller.session(), criteria)
        .await?;

    Ok(Json(ApiResponse::success(page)))
}

/// Get one account, including deleted ones
#[utoipa::path(
    get,
    path = "/api/user/get",
    tag = "Accounts",
    params(GetQuery),
    responses(
        (status = 200, description = "Account summary", body = AccountSummary),
        (status = 404, description = "No account with this ID")
    ),
    security(("session_cookie" = []))
)]
pub async fn get_account(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ValidatedQuery(query): ValidatedQuery<GetQuery>,
) -> AppResult<Json<ApiResponse<AccountSummary>>> {
    let id = parse_id(FIELD_ID, &query.id)?;
    let account = state.account_service.get(caller.session(), id).await?;

    Ok(Json(ApiResponse::success(account)))
}

/// Create an account
#[utoipa::path(
    post,
    path = "/api/user/add",
    tag = "Accounts",
    request_body(content = AddAccountForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Account created", body = AccountSummary),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Username already exists")
    ),
    security(("session_cookie" = []))
)]
pub async fn add_account(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ValidatedForm(form): ValidatedForm<AddAccountForm>,
) -> AppResult<Created<AccountSummary>> {
    let draft = AccountDraft {
        username: form.username,
        password: form.password,
        name: form.name,
        role_id: parse_optional_id(FIELD_ROLE_ID, form.role_id)?,
        department_id: parse_optional_id(FIELD_DEPT_ID, form.dept_id)?,
    };
    let account = state.account_service.add(caller.session(), draft).await?;

    Ok(Created(account))
}

/// Edit display name, role or department
#[utoipa::path(
    post,
    path = "/api/user/edit",
    tag = "Accounts",
    request_body(content = EditAccountForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Account updated", body = AccountSummary),
        (status = 400, description = "Invalid fields"),
        (status = 404, description = "No active account with this ID")
    ),
    security(("session_cookie" = []))
)]
pub async fn edit_account(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ValidatedForm(form): ValidatedForm<EditAccountForm>,
) -> AppResult<Json<ApiResponse<AccountSummary>>> {
    let id = parse_id(FIELD_ID, &form.id)?;
    let edit = AccountEdit {
        username: non_blank(form.username),
        name: non_blank(form.name),
        role_id: parse_optional_id(FIELD_ROLE_ID, form.role_id)?,
        department_id: parse_optional_id(FIELD_DEPT_ID, form.dept_id)?,
    };
    let account = state
        .account_service
        .edit(caller.session(), id, edit)
        .await?;

    Ok(Json(ApiResponse::success(account)))
}

/// Soft delete an account
#[utoipa::path(
    post,
    path = "/api/user/delete",
    tag = "Accounts",
    request_body(content = DeleteAccountForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Account deleted"),
        (status = 404, description = "No active account with this ID"),
        (status = 409, description = "Account is the last administrator")
    ),
    security(("session_cookie" = []))
)]
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ValidatedForm(form): ValidatedForm<DeleteAccountForm>,
) -> AppResult<Json<ApiResponse<()>>> {
    let id = parse_id(FIELD_ID, &form.id)?;
    state.account_service.delete(caller.session(), id).await?;

    Ok(Json(ApiResponse::message("Account deleted")))
}

/// Change the signed-in account's password
#[utoipa::path(
    post,
    path = "/api/user/change-password",
    tag = "Accounts",
    request_body(content = ChangePasswordForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Wrong current password, mismatched confirmation or policy violation"),
        (status = 401, description = "Not signed in")
    ),
    security(("session_cookie" = []))
)]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ValidatedForm(form): ValidatedForm<ChangePasswordForm>,
) -> AppResult<Json<ApiResponse<()>>> {
    let change = PasswordChange {
        old_password: form.old_password,
        new_password: form.new_password,
        confirm_password: form.confirm_password,
    };
    state
        .account_service
        .change_password(caller.session(), change)
        .await?;

    Ok(Json(ApiResponse::message("Password changed")))
}

fn parse_id(field: &str, raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::validation(format!("{} must be a valid id", field)))
}

/// Blank means absent.
fn parse_optional_id(field: &str, raw: Option<String>) -> AppResult<Option<Uuid>> {
    non_blank(raw).map(|r| parse_id(field, &r)).transpose()
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.filter(|r| !r.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_optional_id_is_absent() {
        assert_eq!(parse_optional_id(FIELD_ROLE_ID, None).unwrap(), None);
        assert_eq!(
            parse_optional_id(FIELD_ROLE_ID, Some("  ".to_string())).unwrap(),
            None
        );
    }

    #[test]
    fn malformed_id_names_the_field() {
        let err = parse_optional_id(FIELD_DEPT_ID, Some("r1".to_string())).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("DeptID")));
    }

    #[test]
    fn id_is_trimmed() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(FIELD_ID, &format!(" {} ", id)).unwrap(), id);
    }
}
