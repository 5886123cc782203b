use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RsvpError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuestId(pub String);

impl GuestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GuestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponseId(pub i64);

/// Trimmed, Unicode-lowercased form of a name or email. Directory matching
/// and the stored lookup columns both go through this.
pub fn fold_case(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// An invitee as listed in the guest directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub id: GuestId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plus_one: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attendance {
    Accept,
    Decline,
}

impl Attendance {
    pub fn as_str(self) -> &'static str {
        match self {
            Attendance::Accept => "accept",
            Attendance::Decline => "decline",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "accept" => Some(Attendance::Accept),
            "decline" => Some(Attendance::Decline),
            _ => None,
        }
    }

    pub fn is_accept(self) -> bool {
        self == Attendance::Accept
    }

    /// Wording used on the confirmation screen.
    pub fn attending_label(self) -> &'static str {
        match self {
            Attendance::Accept => "Attending",
            Attendance::Decline => "Not Attending",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntreeChoice {
    Chicken,
    Fish,
    Vegetable,
}

impl EntreeChoice {
    pub const ALL: [EntreeChoice; 3] = [
        EntreeChoice::Chicken,
        EntreeChoice::Fish,
        EntreeChoice::Vegetable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntreeChoice::Chicken => "chicken",
            EntreeChoice::Fish => "fish",
            EntreeChoice::Vegetable => "vegetable",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "chicken" => Some(EntreeChoice::Chicken),
            "fish" => Some(EntreeChoice::Fish),
            "vegetable" => Some(EntreeChoice::Vegetable),
            _ => None,
        }
    }
}

/// One guest's completed RSVP. Created once when the wizard completes and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpResponse {
    pub guest_id: GuestId,
    pub guest_name: String,
    pub guest_email: String,
    pub welcome_event: Attendance,
    pub wedding: Attendance,
    pub farewell_event: Attendance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entree_choice: Option<EntreeChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RsvpResponse {
    /// Checks the entree/note branch invariant: an entree is present exactly
    /// when the wedding is accepted, and a note only accompanies a declined
    /// wedding.
    pub fn validate(&self) -> Result<(), RsvpError> {
        match (self.wedding, self.entree_choice) {
            (Attendance::Accept, None) => {
                return Err(RsvpError::InvalidResponse(
                    "an entree choice is required when attending the wedding".into(),
                ))
            }
            (Attendance::Decline, Some(_)) => {
                return Err(RsvpError::InvalidResponse(
                    "an entree choice is only accepted when attending the wedding".into(),
                ))
            }
            _ => {}
        }

        if let Some(note) = &self.note {
            if self.wedding.is_accept() {
                return Err(RsvpError::InvalidResponse(
                    "a note is only accepted when declining the wedding".into(),
                ));
            }
            if note.trim().is_empty() {
                return Err(RsvpError::InvalidResponse(
                    "note must not be blank when present".into(),
                ));
            }
        }

        if self.guest_id.as_str().trim().is_empty() {
            return Err(RsvpError::InvalidResponse("guest id is required".into()));
        }

        Ok(())
    }

    /// Label/value pairs summarising the response for the guest after a
    /// successful submission.
    pub fn confirmation_lines(&self) -> Vec<(&'static str, String)> {
        let mut lines = vec![
            (
                "Welcome Event",
                self.welcome_event.attending_label().to_string(),
            ),
            ("Wedding", self.wedding.attending_label().to_string()),
        ];
        if let Some(entree) = self.entree_choice {
            lines.push(("Entree", entree.as_str().to_string()));
        }
        lines.push((
            "Farewell Event",
            self.farewell_event.attending_label().to_string(),
        ));
        if let Some(note) = &self.note {
            lines.push(("Note", note.clone()));
        }
        lines
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
