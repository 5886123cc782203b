use std::collections::HashSet;

use async_trait::async_trait;
use shared::{
    domain::{fold_case, Guest},
    error::RsvpError,
};
use tracing::{info, warn};

/// Source of guest records for identity verification.
#[async_trait]
pub trait GuestDirectory: Send + Sync {
    /// Returns a superset of the guests that could match; `match_guest`
    /// makes the final decision.
    async fn candidates(&self, name: &str, email: &str) -> anyhow::Result<Vec<Guest>>;
}

#[async_trait]
impl GuestDirectory for storage::Storage {
    async fn candidates(&self, name: &str, email: &str) -> anyhow::Result<Vec<Guest>> {
        self.find_guest_candidates(name, email).await
    }
}

/// Case-insensitive, whitespace-trimmed form used for equality tests.
pub fn normalize(raw: &str) -> String {
    fold_case(raw)
}

/// Picks the guest whose full name or email exactly equals the input.
///
/// Blank inputs never match. When several distinct guests qualify, the one
/// matching both name and email wins; otherwise the lookup is ambiguous.
pub fn match_guest(candidates: &[Guest], name: &str, email: &str) -> Result<Guest, RsvpError> {
    let name = normalize(name);
    let email = normalize(email);

    let name_matches = |guest: &Guest| !name.is_empty() && normalize(&guest.name) == name;
    let email_matches = |guest: &Guest| !email.is_empty() && normalize(&guest.email) == email;

    let mut seen = HashSet::new();
    let exact: Vec<&Guest> = candidates
        .iter()
        .filter(|guest| name_matches(guest) || email_matches(guest))
        .filter(|guest| seen.insert(guest.id.clone()))
        .collect();

    match exact.as_slice() {
        [] => Err(RsvpError::guest_not_found()),
        [only] => Ok((*only).clone()),
        many => {
            let both: Vec<&Guest> = many
                .iter()
                .copied()
                .filter(|guest| name_matches(guest) && email_matches(guest))
                .collect();
            match both.as_slice() {
                [only] => Ok((*only).clone()),
                _ => Err(RsvpError::lookup_ambiguous()),
            }
        }
    }
}

/// Rejects directory entries with a blank id, name, or email.
pub fn validate_guest_record(guest: &Guest) -> Result<(), String> {
    let blank = [
        ("id", guest.id.as_str()),
        ("name", guest.name.as_str()),
        ("email", guest.email.as_str()),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty());
    match blank {
        Some((field, _)) => Err(format!("guest '{}' has a blank {field}", guest.id)),
        None => Ok(()),
    }
}

/// Resolves a name/email pair to exactly one guest.
pub async fn lookup_guest<D>(directory: &D, name: &str, email: &str) -> Result<Guest, RsvpError>
where
    D: GuestDirectory + ?Sized,
{
    let candidates = directory.candidates(name, email).await.map_err(|error| {
        warn!(%error, "guest directory unavailable");
        RsvpError::lookup_unavailable()
    })?;

    let outcome = match_guest(&candidates, name, email);
    match &outcome {
        Ok(guest) => info!(guest_id = %guest.id, "guest verified"),
        Err(RsvpError::LookupAmbiguous(_)) => {
            warn!(candidates = candidates.len(), "guest lookup ambiguous")
        }
        Err(_) => info!(candidates = candidates.len(), "guest not found"),
    }
    outcome
}

#[cfg(test)]
#[path = "tests/directory_tests.rs"]
mod tests;
