use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::router::AppState;

/// Broker auth hook for single-tenant users (platform services, one-time
/// frontend identities).
pub async fn auth_user(
    State(state): State<AppState>,
    Json(body): Json<BrokerUserRequestBody>,
) -> Result<ApiSuccess<VerdictData>, ApiError> {
    let allowed = state
        .engine
        .authenticate_simple(&body.username, &body.password)
        .await?;

    if !allowed {
        return Err(ApiError::Unauthorized("Access denied".to_string()));
    }

    Ok(ApiSuccess::new(
        StatusCode::OK,
        VerdictData {
            result: "allow".to_string(),
        },
    ))
}

/// Broker auth hook for team-scoped node identities.
///
/// On success the broker receives the resolved principal, never the raw
/// owner row id.
pub async fn auth_client(
    State(state): State<AppState>,
    Json(body): Json<BrokerClientRequestBody>,
) -> Result<ApiSuccess<PrincipalData>, ApiError> {
    let principal = state
        .engine
        .authenticate_structured(&body.username, &body.clientid, &body.password)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Access denied".to_string()))?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        PrincipalData {
            result: "allow".to_string(),
            username: principal.username,
            team: principal.team_id,
            ha: principal.ha_present,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BrokerUserRequestBody {
    username: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BrokerClientRequestBody {
    username: String,
    clientid: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerdictData {
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrincipalData {
    pub result: String,
    pub username: String,
    pub team: String,
    pub ha: bool,
}
