use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::credential::models::Scope;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

/// Issue a named personal token for the authenticated user.
///
/// The response is the only place the plaintext ever appears.
pub async fn create_token(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<CreateTokenRequestBody>,
) -> Result<ApiSuccess<CreateTokenResponseData>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Token name is required".to_string()));
    }

    let scope = Scope::from_capabilities(body.scope.unwrap_or_default());
    let issued = state
        .issuer
        .issue_personal_token(&user.user_id, body.name, scope, body.expires_at)
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::CREATED,
        CreateTokenResponseData {
            token: issued.token,
            expires_at: issued.expires_at,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateTokenRequestBody {
    name: String,
    scope: Option<Vec<String>>,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateTokenResponseData {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}
