use chrono::{DateTime, Utc};
use shared::{
    domain::{Guest, RsvpResponse},
    error::{ApiError, ErrorCode, RsvpError},
    protocol::{AdminLoginRequest, AdminSessionResponse, VerifyGuestRequest},
};
use storage::Storage;
use tracing::{info, warn};

use crate::{
    admin::{AdminGate, AdminSession},
    directory::{lookup_guest, validate_guest_record},
    export::{export_csv, ExportOptions},
    submission::submit_response,
    summary::AdminSnapshot,
};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub admin: AdminGate,
    pub export: ExportOptions,
}

pub async fn verify_guest(ctx: &ApiContext, request: &VerifyGuestRequest) -> Result<Guest, ApiError> {
    lookup_guest(&ctx.storage, &request.name, &request.email)
        .await
        .map_err(ApiError::from)
}

/// Validates and appends one response. The stored response is returned so
/// callers can fan it out to subscribers.
pub async fn record_response(
    ctx: &ApiContext,
    response: RsvpResponse,
) -> Result<RsvpResponse, ApiError> {
    response.validate()?;
    let known = ctx
        .storage
        .get_guest(&response.guest_id)
        .await
        .map_err(|error| {
            warn!(guest_id = %response.guest_id, %error, "guest check failed");
            ApiError::from(RsvpError::submission_failed())
        })?;
    if known.is_none() {
        info!(guest_id = %response.guest_id, "response for unknown guest rejected");
        return Err(ApiError::new(
            ErrorCode::NotFound,
            format!("no guest with id '{}'", response.guest_id),
        ));
    }
    submit_response(&ctx.storage, &response).await?;
    Ok(response)
}

pub fn admin_login(
    ctx: &ApiContext,
    request: &AdminLoginRequest,
    now: DateTime<Utc>,
) -> Result<AdminSessionResponse, ApiError> {
    let session = ctx.admin.login(&request.password, now)?;
    Ok(AdminSessionResponse {
        token: session.token,
        expires_at: session.expires_at,
    })
}

pub fn authorize_admin(
    ctx: &ApiContext,
    token: &str,
    now: DateTime<Utc>,
) -> Result<AdminSession, ApiError> {
    ctx.admin.authorize(token, now).map_err(ApiError::from)
}

pub async fn admin_snapshot(
    ctx: &ApiContext,
    session: &AdminSession,
    now: DateTime<Utc>,
) -> Result<AdminSnapshot, ApiError> {
    ensure_live(session, now)?;
    let responses = ctx
        .storage
        .list_responses()
        .await
        .map_err(internal)?
        .into_iter()
        .map(|stored| stored.response)
        .collect();
    let snapshot = AdminSnapshot::new(responses, now);
    info!(
        session_id = %session.session_id,
        total = snapshot.summary.total,
        "admin snapshot served"
    );
    Ok(snapshot)
}

pub async fn admin_export(
    ctx: &ApiContext,
    session: &AdminSession,
    now: DateTime<Utc>,
) -> Result<String, ApiError> {
    let snapshot = admin_snapshot(ctx, session, now).await?;
    Ok(export_csv(&snapshot.responses, &ctx.export))
}

/// Upserts directory entries in one transaction. Nothing is written if any
/// entry is invalid or the store fails partway.
pub async fn import_guests(ctx: &ApiContext, guests: &[Guest]) -> Result<usize, ApiError> {
    for guest in guests {
        validate_guest_record(guest)
            .map_err(|message| ApiError::new(ErrorCode::Validation, message))?;
    }
    ctx.storage.upsert_guests(guests).await.map_err(internal)?;
    info!(count = guests.len(), "guests imported");
    Ok(guests.len())
}

fn ensure_live(session: &AdminSession, now: DateTime<Utc>) -> Result<(), ApiError> {
    if session.is_expired(now) {
        return Err(RsvpError::SessionExpired.into());
    }
    Ok(())
}

fn internal(err: anyhow::Error) -> ApiError {
    warn!(error = %err, "internal storage error");
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
