//! Admin sessions as short-lived signed tokens.
//!
//! A successful login mints an HS256 JWT; every admin operation takes the
//! token and the caller's notion of "now". Nothing about the session lives
//! in ambient state, so expiry is entirely under the caller's control.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::RsvpError;
use tracing::{info, warn};
use uuid::Uuid;

const ISSUER: &str = "wedding-rsvp";
const SUBJECT: &str = "admin";

pub const INVALID_PASSWORD_MESSAGE: &str = "Invalid password. Please try again.";
pub const INVALID_SESSION_MESSAGE: &str = "Admin session is not valid. Please log in again.";

#[derive(Debug, Clone)]
pub struct AdminGate {
    password: String,
    signing_secret: String,
    ttl: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
    jti: String,
}

/// Proof of a successful admin login, passed to every admin operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub token: String,
    pub session_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl AdminGate {
    pub fn new(
        password: impl Into<String>,
        signing_secret: impl Into<String>,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            password: password.into(),
            signing_secret: signing_secret.into(),
            ttl: Duration::seconds(ttl_seconds.max(1)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// An empty configured password disables admin access entirely.
    pub fn login(&self, password: &str, now: DateTime<Utc>) -> Result<AdminSession, RsvpError> {
        if self.password.is_empty() || password != self.password {
            warn!("admin login rejected");
            return Err(RsvpError::Unauthorized(INVALID_PASSWORD_MESSAGE.to_string()));
        }

        let session_id = Uuid::new_v4();
        let issued_at = truncate_to_seconds(now);
        let expires_at = issued_at + self.ttl;
        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: SUBJECT.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: session_id.to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.signing_secret.as_bytes()),
        )
        .map_err(|error| {
            warn!(%error, "failed to sign admin session");
            RsvpError::Unauthorized(INVALID_SESSION_MESSAGE.to_string())
        })?;

        info!(session_id = %session_id, expires_at = %expires_at, "admin session issued");
        Ok(AdminSession {
            token,
            session_id,
            issued_at,
            expires_at,
        })
    }

    /// Verifies the signature and checks expiry against `now`.
    pub fn authorize(&self, token: &str, now: DateTime<Utc>) -> Result<AdminSession, RsvpError> {
        let invalid = || RsvpError::Unauthorized(INVALID_SESSION_MESSAGE.to_string());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
        validation.set_issuer(&[ISSUER]);
        validation.sub = Some(SUBJECT.to_string());

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.signing_secret.as_bytes()),
            &validation,
        )
        .map_err(|error| {
            warn!(%error, "admin token rejected");
            invalid()
        })?;

        let claims = data.claims;
        let session_id = Uuid::parse_str(&claims.jti).map_err(|_| invalid())?;
        let issued_at = Utc.timestamp_opt(claims.iat, 0).single().ok_or_else(invalid)?;
        let expires_at = Utc.timestamp_opt(claims.exp, 0).single().ok_or_else(invalid)?;

        let session = AdminSession {
            token: token.to_string(),
            session_id,
            issued_at,
            expires_at,
        };
        if session.is_expired(now) {
            return Err(RsvpError::SessionExpired);
        }
        Ok(session)
    }
}

fn truncate_to_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(at.timestamp(), 0).single().unwrap_or(at)
}

#[cfg(test)]
#[path = "tests/admin_tests.rs"]
mod tests;
