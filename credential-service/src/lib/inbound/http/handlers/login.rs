use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::router::AppState;

/// Interactive login: verify the password, then issue a session.
///
/// Every failure path returns the same Unauthorized answer.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequestBody>,
) -> Result<ApiSuccess<LoginResponseData>, ApiError> {
    let verified = state
        .engine
        .verify_user_password(&body.username, &body.password)
        .await?;

    if !verified {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let session = state
        .sessions
        .issue_session(&body.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    Ok(ApiSuccess::new(
        StatusCode::CREATED,
        LoginResponseData {
            session_id: session.id,
            expires_at: session.expires_at,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    username: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponseData {
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}
