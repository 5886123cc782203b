use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{EntreeChoice, RsvpResponse},
    error::ApiError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyGuestRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponseAck {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLoginRequest {
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Aggregate counts over every stored response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpSummary {
    pub total: usize,
    pub welcome_accept: usize,
    pub wedding_accept: usize,
    pub farewell_accept: usize,
    pub chicken: usize,
    pub fish: usize,
    pub vegetable: usize,
}

impl RsvpSummary {
    pub fn from_responses(responses: &[RsvpResponse]) -> Self {
        let mut summary = Self::default();
        for response in responses {
            summary.record(response);
        }
        summary
    }

    pub fn record(&mut self, response: &RsvpResponse) {
        self.total += 1;
        if response.welcome_event.is_accept() {
            self.welcome_accept += 1;
        }
        if response.wedding.is_accept() {
            self.wedding_accept += 1;
        }
        if response.farewell_event.is_accept() {
            self.farewell_accept += 1;
        }
        match response.entree_choice {
            Some(EntreeChoice::Chicken) => self.chicken += 1,
            Some(EntreeChoice::Fish) => self.fish += 1,
            Some(EntreeChoice::Vegetable) => self.vegetable += 1,
            None => {}
        }
    }

    pub fn welcome_decline(&self) -> usize {
        self.total - self.welcome_accept
    }

    pub fn wedding_decline(&self) -> usize {
        self.total - self.wedding_accept
    }

    pub fn farewell_decline(&self) -> usize {
        self.total - self.farewell_accept
    }

    pub fn entree_count(&self, entree: EntreeChoice) -> usize {
        match entree {
            EntreeChoice::Chicken => self.chicken,
            EntreeChoice::Fish => self.fish,
            EntreeChoice::Vegetable => self.vegetable,
        }
    }

    pub fn entree_total(&self) -> usize {
        self.chicken + self.fish + self.vegetable
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    ResponseRecorded { response: RsvpResponse },
    Error(ApiError),
}
