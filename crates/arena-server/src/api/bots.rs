//! Bot upload and listing API handlers.
//!
//! This is the narrow HTTP surface the upload/listing collaborators use:
//! raw bot bytes in, a descriptor or the full violation report out. All
//! actual vetting, quarantine, and bookkeeping lives in `bot-sandbox`.

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, Query, State},
    http::StatusCode,
    Json,
};
use bot_sandbox::{BotDescriptor, CatalogError, SecurityLogEntry, SecurityViolation};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::AppState;

/// List all available bots.
///
/// # Endpoint
///
/// `GET /api/bots`
pub async fn list_bots(State(state): State<AppState>) -> Json<Vec<BotDescriptor>> {
    Json(state.catalog.list())
}

/// Query parameters for uploads.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// Name of the uploaded file, e.g. `my_bot.py`.
    pub filename: String,
}

/// Response body for a rejected upload.
#[derive(Debug, Serialize)]
pub struct UploadRejection {
    pub error: String,
    /// Complete violation report, in source order. Empty for
    /// non-security failures (duplicate name, bad filename).
    pub violations: Vec<SecurityViolation>,
}

/// Upload a bot for vetting.
///
/// # Endpoint
///
/// `POST /api/bots/upload?filename=my_bot.py` with the raw source as the
/// request body.
///
/// # Response
///
/// - `200 OK`: descriptor of the accepted bot
/// - `400 Bad Request`: rejection with the full violation list; rejected
///   sources are quarantined, not stored
pub async fn upload_bot(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<BotDescriptor>, (StatusCode, Json<UploadRejection>)> {
    let submitter = addr.to_string();
    match state.catalog.upload(&query.filename, &body, &submitter) {
        Ok(descriptor) => Ok(Json(descriptor)),
        Err(CatalogError::Rejected(violations)) => Err((
            StatusCode::BAD_REQUEST,
            Json(UploadRejection {
                error: format!("bot source rejected with {} violation(s)", violations.len()),
                violations,
            }),
        )),
        Err(CatalogError::Io(e)) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(UploadRejection {
                error: e.to_string(),
                violations: Vec::new(),
            }),
        )),
        Err(e) => Err((
            StatusCode::BAD_REQUEST,
            Json(UploadRejection {
                error: e.to_string(),
                violations: Vec::new(),
            }),
        )),
    }
}

/// Delete an uploaded bot.
///
/// # Endpoint
///
/// `DELETE /api/bots/:name`
///
/// # Response
///
/// - `204 No Content`: bot removed
/// - `400 Bad Request`: builtin bots cannot be removed
/// - `404 Not Found`: no such bot
pub async fn delete_bot(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    match state.catalog.remove(&name) {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e @ CatalogError::NotFound(_)) => Err((StatusCode::NOT_FOUND, e.to_string())),
        Err(e @ CatalogError::BuiltinImmutable(_)) => {
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// Read the audit trail of rejected uploads.
///
/// # Endpoint
///
/// `GET /api/security/log`
pub async fn security_log(
    State(state): State<AppState>,
) -> Result<Json<Vec<SecurityLogEntry>>, StatusCode> {
    state
        .catalog
        .security_entries()
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
