use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::{self};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;

use crate::credential::models::OwnerKind;
use crate::credential::models::SCOPE_DEVICE_PROVISION;
use crate::credential::models::SCOPE_PASSWORD_RESET;
use crate::inbound::http::router::AppState;
use crate::user::models::UserId;

/// Scopes that never satisfy the general bearer-token check.
const EXCLUDED_SCOPES: &[&str] = &[SCOPE_PASSWORD_RESET, SCOPE_DEVICE_PROVISION];

/// Extension type carrying the authenticated token owner.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Middleware resolving a bearer access token to its owning user.
///
/// The get-or-expire lookup runs here, so an expired token is already
/// gone by the time the handler sees the request denied.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_token_from_header(&req)?;

    let record = state
        .engine
        .lookup_access_token(token, EXCLUDED_SCOPES)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Token lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error"
                })),
            )
                .into_response()
        })?
        .ok_or_else(|| unauthorized("Invalid or expired token"))?;

    if record.owner.kind != OwnerKind::User {
        return Err(unauthorized("Invalid or expired token"));
    }

    req.extensions_mut().insert(AuthenticatedUser {
        user_id: UserId(record.owner.id),
    });

    Ok(next.run(req).await)
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": message
        })),
    )
        .into_response()
}

fn extract_token_from_header(req: &Request) -> Result<&str, Response> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| unauthorized("Invalid Authorization header"))?;

    if !auth_str.starts_with("Bearer ") {
        return Err(unauthorized(
            "Invalid Authorization header format. Expected: Bearer <token>",
        ));
    }

    Ok(auth_str.trim_start_matches("Bearer "))
}
