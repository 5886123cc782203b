use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Query, State, WebSocketUpgrade},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rsvp_core::{
    admin::{AdminGate, AdminSession},
    api::{
        admin_export, admin_login, admin_snapshot, authorize_admin, record_response,
        verify_guest, ApiContext,
    },
    export::{ExportOptions, EXPORT_CONTENT_TYPE, EXPORT_FILENAME},
};
use serde::Deserialize;
use shared::{
    domain::{Guest, RsvpResponse},
    error::{ApiError, ErrorCode},
    protocol::{
        AdminLoginRequest, AdminSessionResponse, RsvpSummary, ServerEvent, SubmitResponseAck,
        VerifyGuestRequest,
    },
};
use storage::Storage;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url, DEV_SESSION_SECRET};

type HttpError = (StatusCode, Json<ApiError>);

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct EventsQuery {
    token: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    if settings.admin_password.is_empty() {
        warn!("APP__ADMIN_PASSWORD is not set; admin login is disabled");
    }
    if settings.admin_session_secret == DEV_SESSION_SECRET {
        warn!("using the development admin session secret; set APP__ADMIN_SESSION_SECRET");
    }

    let api = ApiContext {
        storage,
        admin: AdminGate::new(
            settings.admin_password,
            settings.admin_session_secret,
            settings.admin_session_ttl_seconds,
        ),
        export: ExportOptions {
            utc_offset_minutes: settings.export_utc_offset_minutes,
        },
    };
    let (events, _) = broadcast::channel(256);

    let state = AppState { api, events };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/guests/verify", post(http_verify_guest))
        .route("/responses", post(http_record_response))
        .route("/admin/login", post(http_admin_login))
        .route("/admin/responses", get(http_admin_responses))
        .route("/admin/summary", get(http_admin_summary))
        .route("/admin/export.csv", get(http_admin_export))
        .route("/admin/events", get(ws_handler))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized | ErrorCode::SessionExpired => StatusCode::UNAUTHORIZED,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn http_error(err: ApiError) -> HttpError {
    (status_for(err.code), Json(err))
}

/// Keeps axum's status for a rejected body but answers in the `ApiError` shape.
fn json_rejection(rejection: JsonRejection) -> HttpError {
    (
        rejection.status(),
        Json(ApiError::new(ErrorCode::Validation, rejection.body_text())),
    )
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, HttpError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            http_error(ApiError::new(
                ErrorCode::Unauthorized,
                "missing bearer token",
            ))
        })
}

fn admin_session(state: &AppState, headers: &HeaderMap) -> Result<AdminSession, HttpError> {
    let token = bearer_token(headers)?;
    authorize_admin(&state.api, token, Utc::now()).map_err(http_error)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.api.storage.health_check().await.map_err(|error| {
        warn!(%error, "health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}

async fn http_verify_guest(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyGuestRequest>, JsonRejection>,
) -> Result<Json<Guest>, HttpError> {
    let Json(req) = payload.map_err(json_rejection)?;
    let guest = verify_guest(&state.api, &req).await.map_err(http_error)?;
    Ok(Json(guest))
}

async fn http_record_response(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RsvpResponse>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponseAck>), HttpError> {
    let Json(response) = payload.map_err(json_rejection)?;
    let response = record_response(&state.api, response)
        .await
        .map_err(http_error)?;
    let _ = state.events.send(ServerEvent::ResponseRecorded { response });
    Ok((StatusCode::CREATED, Json(SubmitResponseAck { success: true })))
}

async fn http_admin_login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AdminLoginRequest>, JsonRejection>,
) -> Result<Json<AdminSessionResponse>, HttpError> {
    let Json(req) = payload.map_err(json_rejection)?;
    let session = admin_login(&state.api, &req, Utc::now()).map_err(http_error)?;
    Ok(Json(session))
}

async fn http_admin_responses(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<RsvpResponse>>, HttpError> {
    let session = admin_session(&state, &headers)?;
    let snapshot = admin_snapshot(&state.api, &session, Utc::now())
        .await
        .map_err(http_error)?;
    Ok(Json(snapshot.responses))
}

async fn http_admin_summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RsvpSummary>, HttpError> {
    let session = admin_session(&state, &headers)?;
    let snapshot = admin_snapshot(&state.api, &session, Utc::now())
        .await
        .map_err(http_error)?;
    Ok(Json(snapshot.summary))
}

async fn http_admin_export(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, HttpError> {
    let session = admin_session(&state, &headers)?;
    let csv = admin_export(&state.api, &session, Utc::now())
        .await
        .map_err(http_error)?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(EXPORT_CONTENT_TYPE),
    );
    let disposition = format!("attachment; filename=\"{EXPORT_FILENAME}\"");
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        response_headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok((response_headers, csv).into_response())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(q): Query<EventsQuery>,
) -> Result<Response, HttpError> {
    let session = authorize_admin(&state.api, &q.token, Utc::now()).map_err(http_error)?;
    let events_rx = state.events.subscribe();
    Ok(ws.on_upgrade(move |socket| ws_connection(socket, events_rx, session)))
}

async fn ws_connection(
    socket: axum::extract::ws::WebSocket,
    mut events_rx: broadcast::Receiver<ServerEvent>,
    session: AdminSession,
) {
    use axum::extract::ws::Message;
    use futures::{SinkExt, StreamExt};

    info!(session_id = %session.session_id, "admin subscribed to response events");
    let (mut sender, mut receiver) = socket.split();
    let expires_at = session.expires_at;

    let send_task = tokio::spawn(async move {
        loop {
            let event = match events_rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "admin subscriber lagged; client should refresh");
                    ServerEvent::Error(ApiError::new(
                        ErrorCode::Unavailable,
                        format!("missed {skipped} events; refresh the dashboard"),
                    ))
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if Utc::now() >= expires_at {
                let expired = ServerEvent::Error(ApiError::new(
                    ErrorCode::SessionExpired,
                    "admin session expired",
                ));
                if let Ok(text) = serde_json::to_string(&expired) {
                    let _ = sender.send(Message::Text(text)).await;
                }
                break;
            }
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
