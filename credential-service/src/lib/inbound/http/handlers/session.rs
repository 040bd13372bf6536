use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::router::AppState;

/// Session lookup; applies the expiry and idle-sliding rules.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<ApiSuccess<SessionData>, ApiError> {
    let session = state
        .sessions
        .lookup_session(&session_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid session".to_string()))?;

    Ok(ApiSuccess::new(StatusCode::OK, SessionData::from(session)))
}

/// Logout.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<ApiSuccess<()>, ApiError> {
    state.sessions.delete_session(&session_id).await?;

    Ok(ApiSuccess::new(StatusCode::OK, ()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionData {
    pub session_id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub idle_at: DateTime<Utc>,
}

impl From<crate::session::models::Session> for SessionData {
    fn from(session: crate::session::models::Session) -> Self {
        Self {
            session_id: session.id,
            user_id: session.user_id.to_string(),
            expires_at: session.expires_at,
            idle_at: session.idle_at,
        }
    }
}
