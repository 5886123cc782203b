//! HTTP and WebSocket clients for the RSVP service.
//!
//! `RsvpClient` serves the guest flow: verification and response
//! submission. `AdminClient` holds an admin session token and reads the
//! response log; `AdminDashboard` layers pull-on-demand refresh and pushed
//! updates over it.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use rsvp_core::{submission::ResponseStore, summary::AdminSnapshot};
use shared::{
    domain::{Guest, RsvpResponse},
    error::{ApiError, ErrorCode, RsvpError},
    protocol::{
        AdminLoginRequest, AdminSessionResponse, RsvpSummary, ServerEvent, SubmitResponseAck,
        VerifyGuestRequest,
    },
};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};
use url::Url;

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Rsvp(#[from] RsvpError),
    #[error("server returned {status}: {}", .error.message)]
    Server { status: u16, error: ApiError },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("not logged in")]
    NotLoggedIn,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    /// True when the admin must log in again before retrying.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ClientError::NotLoggedIn
                | ClientError::Rsvp(RsvpError::Unauthorized(_))
                | ClientError::Rsvp(RsvpError::SessionExpired)
        )
    }
}

async fn api_error(response: Response) -> (StatusCode, ApiError) {
    let status = response.status();
    let fallback = || {
        ApiError::new(
            ErrorCode::Internal,
            format!("unexpected response status {status}"),
        )
    };
    let error = match response.bytes().await {
        Ok(body) => serde_json::from_slice::<ApiError>(&body).unwrap_or_else(|_| fallback()),
        Err(_) => fallback(),
    };
    (status, error)
}

fn admin_error(status: StatusCode, error: ApiError) -> ClientError {
    match error.code {
        ErrorCode::Unauthorized => RsvpError::Unauthorized(error.message).into(),
        ErrorCode::SessionExpired => RsvpError::SessionExpired.into(),
        _ => ClientError::Server {
            status: status.as_u16(),
            error,
        },
    }
}

fn trim_base(server_url: impl Into<String>) -> String {
    server_url.into().trim_end_matches('/').to_string()
}

/// Guest-facing client.
#[derive(Debug, Clone)]
pub struct RsvpClient {
    http: Client,
    server_url: String,
}

impl RsvpClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            server_url: trim_base(server_url),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Resolves the guest or returns the lookup failure the server reported.
    /// Transport faults surface as `LookupUnavailable`.
    pub async fn verify_guest(&self, name: &str, email: &str) -> Result<Guest, RsvpError> {
        let sent = self
            .http
            .post(format!("{}/guests/verify", self.server_url))
            .json(&VerifyGuestRequest {
                name: name.to_string(),
                email: email.to_string(),
            })
            .send()
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "guest verification request failed");
                return Err(RsvpError::lookup_unavailable());
            }
        };

        if response.status().is_success() {
            return response.json::<Guest>().await.map_err(|error| {
                warn!(%error, "malformed guest verification response");
                RsvpError::lookup_unavailable()
            });
        }

        let (status, error) = api_error(response).await;
        info!(%status, code = ?error.code, "guest verification rejected");
        Err(match error.code {
            ErrorCode::NotFound => RsvpError::GuestNotFound(error.message),
            ErrorCode::Conflict => RsvpError::LookupAmbiguous(error.message),
            _ => RsvpError::lookup_unavailable(),
        })
    }

    pub async fn submit(&self, response: &RsvpResponse) -> anyhow::Result<()> {
        let res = self
            .http
            .post(format!("{}/responses", self.server_url))
            .json(response)
            .send()
            .await
            .context("failed to reach RSVP server")?;
        if !res.status().is_success() {
            let (status, error) = api_error(res).await;
            return Err(anyhow!("server returned {status}: {}", error.message));
        }
        let ack: SubmitResponseAck = res.json().await?;
        if !ack.success {
            return Err(anyhow!("server did not acknowledge the response"));
        }
        Ok(())
    }
}

#[async_trait]
impl ResponseStore for RsvpClient {
    async fn append(&self, response: &RsvpResponse) -> anyhow::Result<()> {
        self.submit(response).await
    }
}

/// Admin-facing client. Every read carries the session token obtained from
/// `login`.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    server_url: String,
    session: Option<AdminSessionResponse>,
}

impl AdminClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            server_url: trim_base(server_url),
            session: None,
        }
    }

    pub fn session(&self) -> Option<&AdminSessionResponse> {
        self.session.as_ref()
    }

    pub fn is_logged_in(&self, now: DateTime<Utc>) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| now < session.expires_at)
    }

    pub fn logout(&mut self) {
        self.session = None;
    }

    pub async fn login(&mut self, password: &str) -> Result<&AdminSessionResponse, ClientError> {
        let res = self
            .http
            .post(format!("{}/admin/login", self.server_url))
            .json(&AdminLoginRequest {
                password: password.to_string(),
            })
            .send()
            .await?;
        if !res.status().is_success() {
            let (status, error) = api_error(res).await;
            return Err(admin_error(status, error));
        }
        let session: AdminSessionResponse = res.json().await?;
        info!(expires_at = %session.expires_at, "admin logged in");
        Ok(&*self.session.insert(session))
    }

    fn token(&self) -> Result<&str, ClientError> {
        self.session
            .as_ref()
            .map(|session| session.token.as_str())
            .ok_or(ClientError::NotLoggedIn)
    }

    async fn get_admin(&self, path: &str) -> Result<Response, ClientError> {
        let token = self.token()?;
        let res = self
            .http
            .get(format!("{}{path}", self.server_url))
            .bearer_auth(token)
            .send()
            .await?;
        if !res.status().is_success() {
            let (status, error) = api_error(res).await;
            return Err(admin_error(status, error));
        }
        Ok(res)
    }

    /// Most recent first.
    pub async fn responses(&self) -> Result<Vec<RsvpResponse>, ClientError> {
        Ok(self.get_admin("/admin/responses").await?.json().await?)
    }

    pub async fn summary(&self) -> Result<RsvpSummary, ClientError> {
        Ok(self.get_admin("/admin/summary").await?.json().await?)
    }

    pub async fn export_csv(&self) -> Result<String, ClientError> {
        Ok(self.get_admin("/admin/export.csv").await?.text().await?)
    }

    pub async fn fetch_snapshot(&self) -> Result<AdminSnapshot, ClientError> {
        let responses = self.responses().await?;
        Ok(AdminSnapshot::new(responses, Utc::now()))
    }

    pub fn events_url(&self) -> Result<Url, ClientError> {
        let token = self.token()?;
        let mut url = Url::parse(&self.server_url)
            .with_context(|| format!("invalid server url '{}'", self.server_url))?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => {
                return Err(anyhow!("server_url must be http:// or https://, got {other}://").into())
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| anyhow!("cannot switch '{}' to {scheme}", self.server_url))?;
        url.set_path("/admin/events");
        url.query_pairs_mut().clear().append_pair("token", token);
        Ok(url)
    }

    /// Opens the push channel. Events arrive on the returned receiver until
    /// the socket closes or the receiver is dropped.
    pub async fn subscribe(&self) -> Result<EventSubscription, ClientError> {
        let url = self.events_url()?;
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .context("failed to connect admin event stream")?;
        let (_, mut ws_reader) = ws_stream.split();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let task = tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(error) => warn!(%error, "ignoring malformed server event"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(error) => {
                        warn!(%error, "admin event stream failed");
                        break;
                    }
                }
            }
        });

        Ok(EventSubscription { events: rx, task })
    }
}

pub struct EventSubscription {
    pub events: mpsc::Receiver<ServerEvent>,
    task: JoinHandle<()>,
}

impl EventSubscription {
    pub async fn next(&mut self) -> Option<ServerEvent> {
        self.events.recv().await
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Admin view state: the last good snapshot plus the last failure.
pub struct AdminDashboard {
    client: AdminClient,
    snapshot: Option<AdminSnapshot>,
    last_error: Option<String>,
}

impl AdminDashboard {
    pub fn new(client: AdminClient) -> Self {
        Self {
            client,
            snapshot: None,
            last_error: None,
        }
    }

    pub fn client(&self) -> &AdminClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut AdminClient {
        &mut self.client
    }

    pub fn snapshot(&self) -> Option<&AdminSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Pulls a fresh snapshot. On failure the previous snapshot is kept.
    pub async fn refresh(&mut self) -> Result<&AdminSnapshot, ClientError> {
        match self.client.fetch_snapshot().await {
            Ok(snapshot) => {
                self.last_error = None;
                info!(total = snapshot.summary.total, "dashboard refreshed");
                Ok(&*self.snapshot.insert(snapshot))
            }
            Err(error) => {
                warn!(%error, "dashboard refresh failed; keeping previous snapshot");
                self.last_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    /// Subscribes to pushed events, then pulls the first snapshot. Anything
    /// recorded in between arrives on the subscription as well as in the
    /// snapshot; `apply_event` drops that duplicate.
    pub async fn watch(&mut self) -> Result<EventSubscription, ClientError> {
        let subscription = self.client.subscribe().await?;
        self.refresh().await?;
        Ok(subscription)
    }

    /// Applies a pushed event. Returns whether the snapshot changed.
    /// Responses pushed before the first successful refresh are ignored;
    /// that refresh will include them. Responses the snapshot already holds
    /// are ignored too.
    pub fn apply_event(&mut self, event: ServerEvent) -> bool {
        match event {
            ServerEvent::ResponseRecorded { response } => match self.snapshot.as_mut() {
                Some(snapshot) => snapshot.apply_recorded(response, Utc::now()),
                None => false,
            },
            ServerEvent::Error(error) => {
                self.last_error = Some(error.message);
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
