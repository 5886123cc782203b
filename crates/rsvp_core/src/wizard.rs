//! The four-step RSVP question flow.
//!
//! The flow is a tagged-variant state machine: every state carries the
//! answers accumulated so far and `WizardState::transition` is a pure
//! `(state, event) -> state` mapping. Step three depends on the wedding
//! answer: declining leads to the optional note, accepting to the entree
//! choice. `RsvpSession` wraps the machine for one guest and performs the
//! single submission attempt.

use std::fmt;

use chrono::{DateTime, Utc};
use shared::{
    domain::{Attendance, EntreeChoice, Guest, RsvpResponse},
    error::RsvpError,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::submission::{submit_response, ResponseStore};

pub const TOTAL_STEPS: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WizardStep {
    WelcomeEvent,
    Wedding,
    Entree,
    Note,
    FarewellEvent,
}

impl WizardStep {
    /// 1-based position shown as "Step n of 4". Entree and Note share step 3.
    pub fn position(self) -> u8 {
        match self {
            WizardStep::WelcomeEvent => 1,
            WizardStep::Wedding => 2,
            WizardStep::Entree | WizardStep::Note => 3,
            WizardStep::FarewellEvent => 4,
        }
    }

    pub fn is_optional(self) -> bool {
        self == WizardStep::Note
    }

    pub fn is_final(self) -> bool {
        self == WizardStep::FarewellEvent
    }

    fn next(self, form: &RsvpFormData) -> Option<WizardStep> {
        match self {
            WizardStep::WelcomeEvent => Some(WizardStep::Wedding),
            WizardStep::Wedding => Some(conditional_step(form)),
            WizardStep::Entree | WizardStep::Note => Some(WizardStep::FarewellEvent),
            WizardStep::FarewellEvent => None,
        }
    }

    fn previous(self, form: &RsvpFormData) -> Option<WizardStep> {
        match self {
            WizardStep::WelcomeEvent => None,
            WizardStep::Wedding => Some(WizardStep::WelcomeEvent),
            WizardStep::Entree | WizardStep::Note => Some(WizardStep::Wedding),
            WizardStep::FarewellEvent => Some(conditional_step(form)),
        }
    }

    pub fn prompt(self) -> StepPrompt {
        match self {
            WizardStep::WelcomeEvent => StepPrompt {
                step: self,
                title: "Welcome Event",
                question: "Will you be able to join us at our Welcome Event on May 15, 2026?",
                hint: None,
                choices: &ATTENDANCE_CHOICES,
            },
            WizardStep::Wedding => StepPrompt {
                step: self,
                title: "Wedding Ceremony",
                question: "Will you be able to join us at our wedding on May 16, 2026?",
                hint: Some("Kindly reply by September 1, 2025"),
                choices: &ATTENDANCE_CHOICES,
            },
            WizardStep::Entree => StepPrompt {
                step: self,
                title: "Dinner Selection",
                question: "What entree would you prefer at our wedding?",
                hint: None,
                choices: &ENTREE_CHOICES,
            },
            WizardStep::Note => StepPrompt {
                step: self,
                title: "We'll miss you!",
                question: "Would you like to include a note to the couple?",
                hint: Some("Your message to the couple (optional)"),
                choices: &[],
            },
            WizardStep::FarewellEvent => StepPrompt {
                step: self,
                title: "Farewell Event",
                question: "Will you be able to join us at our Farewell Event on May 17, 2026?",
                hint: None,
                choices: &ATTENDANCE_CHOICES,
            },
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prompt().title)
    }
}

fn conditional_step(form: &RsvpFormData) -> WizardStep {
    match form.wedding {
        Some(Attendance::Decline) => WizardStep::Note,
        _ => WizardStep::Entree,
    }
}

/// A selectable answer on a multiple-choice step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Attendance(Attendance),
    Entree(EntreeChoice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceOption {
    pub label: &'static str,
    pub choice: Choice,
}

const ATTENDANCE_CHOICES: [ChoiceOption; 2] = [
    ChoiceOption {
        label: "Joyfully Accept",
        choice: Choice::Attendance(Attendance::Accept),
    },
    ChoiceOption {
        label: "Regretfully Decline",
        choice: Choice::Attendance(Attendance::Decline),
    },
];

const ENTREE_CHOICES: [ChoiceOption; 3] = [
    ChoiceOption {
        label: "Chicken",
        choice: Choice::Entree(EntreeChoice::Chicken),
    },
    ChoiceOption {
        label: "Fish",
        choice: Choice::Entree(EntreeChoice::Fish),
    },
    ChoiceOption {
        label: "Vegetable",
        choice: Choice::Entree(EntreeChoice::Vegetable),
    },
];

/// What a step asks. A step with no choices takes free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPrompt {
    pub step: WizardStep,
    pub title: &'static str,
    pub question: &'static str,
    pub hint: Option<&'static str>,
    pub choices: &'static [ChoiceOption],
}

impl StepPrompt {
    pub fn takes_free_text(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn required(&self) -> bool {
        !self.step.is_optional()
    }
}

/// Answers collected so far. `None` means the question is unanswered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RsvpFormData {
    pub welcome_event: Option<Attendance>,
    pub wedding: Option<Attendance>,
    pub farewell_event: Option<Attendance>,
    pub entree_choice: Option<EntreeChoice>,
    pub note: String,
}

impl RsvpFormData {
    pub fn is_answered(&self, step: WizardStep) -> bool {
        match step {
            WizardStep::WelcomeEvent => self.welcome_event.is_some(),
            WizardStep::Wedding => self.wedding.is_some(),
            WizardStep::Entree => self.entree_choice.is_some(),
            WizardStep::Note => true,
            WizardStep::FarewellEvent => self.farewell_event.is_some(),
        }
    }

    /// The recorded answer for a multiple-choice step.
    pub fn answer(&self, step: WizardStep) -> Option<Choice> {
        match step {
            WizardStep::WelcomeEvent => self.welcome_event.map(Choice::Attendance),
            WizardStep::Wedding => self.wedding.map(Choice::Attendance),
            WizardStep::Entree => self.entree_choice.map(Choice::Entree),
            WizardStep::Note => None,
            WizardStep::FarewellEvent => self.farewell_event.map(Choice::Attendance),
        }
    }

    /// Builds the persistent response. Only the branch selected by the
    /// wedding answer is carried over; answers left behind on the other
    /// branch by back-navigation are dropped.
    pub fn assemble(&self, guest: &Guest, at: DateTime<Utc>) -> Result<RsvpResponse, WizardError> {
        let welcome_event = self
            .welcome_event
            .ok_or(WizardError::AnswerRequired(WizardStep::WelcomeEvent))?;
        let wedding = self
            .wedding
            .ok_or(WizardError::AnswerRequired(WizardStep::Wedding))?;
        let farewell_event = self
            .farewell_event
            .ok_or(WizardError::AnswerRequired(WizardStep::FarewellEvent))?;

        let (entree_choice, note) = match wedding {
            Attendance::Accept => {
                let entree = self
                    .entree_choice
                    .ok_or(WizardError::AnswerRequired(WizardStep::Entree))?;
                (Some(entree), None)
            }
            Attendance::Decline => {
                let note = self.note.trim();
                (None, (!note.is_empty()).then(|| note.to_string()))
            }
        };

        Ok(RsvpResponse {
            guest_id: guest.id.clone(),
            guest_name: guest.name.clone(),
            guest_email: guest.email.clone(),
            welcome_event,
            wedding,
            farewell_event,
            entree_choice,
            note,
            timestamp: at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    Choose(Choice),
    WriteNote(String),
    Continue,
    /// Completes the final step; `at` becomes the response timestamp.
    Submit {
        at: DateTime<Utc>,
    },
    Back,
    StartOver,
    SubmissionSucceeded,
    SubmissionFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("please answer the {0} question before continuing")]
    AnswerRequired(WizardStep),
    #[error("{choice:?} is not an answer to the {step} question")]
    ChoiceNotOffered { step: WizardStep, choice: Choice },
    #[error("the {0} question does not take a note")]
    NoteNotOffered(WizardStep),
    #[error("already at the first question")]
    NoPreviousStep,
    #[error("the {0} question is not the last one; continue instead")]
    SubmitNotAvailable(WizardStep),
    #[error("the {0} question is the last one; submit instead")]
    FinalStepRequiresSubmit(WizardStep),
    #[error("the RSVP is being submitted")]
    SubmissionInFlight,
    #[error("the RSVP has already been submitted")]
    AlreadySubmitted,
    #[error("no submission is in progress")]
    NotSubmitting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    Answering {
        step: WizardStep,
        form: RsvpFormData,
    },
    Submitting {
        form: RsvpFormData,
        response: RsvpResponse,
    },
    Submitted {
        response: RsvpResponse,
    },
}

impl Default for WizardState {
    fn default() -> Self {
        WizardState::Answering {
            step: WizardStep::WelcomeEvent,
            form: RsvpFormData::default(),
        }
    }
}

impl WizardState {
    pub fn transition(&self, guest: &Guest, event: WizardEvent) -> Result<WizardState, WizardError> {
        match self {
            WizardState::Answering { step, form } => answering(*step, form, guest, event),
            WizardState::Submitting { form, response } => match event {
                WizardEvent::SubmissionSucceeded => Ok(WizardState::Submitted {
                    response: response.clone(),
                }),
                WizardEvent::SubmissionFailed => Ok(WizardState::Answering {
                    step: WizardStep::FarewellEvent,
                    form: form.clone(),
                }),
                _ => Err(WizardError::SubmissionInFlight),
            },
            WizardState::Submitted { .. } => Err(WizardError::AlreadySubmitted),
        }
    }

    pub fn step(&self) -> Option<WizardStep> {
        match self {
            WizardState::Answering { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub fn form(&self) -> Option<&RsvpFormData> {
        match self {
            WizardState::Answering { form, .. } | WizardState::Submitting { form, .. } => {
                Some(form)
            }
            WizardState::Submitted { .. } => None,
        }
    }
}

fn answering(
    step: WizardStep,
    form: &RsvpFormData,
    guest: &Guest,
    event: WizardEvent,
) -> Result<WizardState, WizardError> {
    match event {
        WizardEvent::Choose(choice) => {
            let mut form = form.clone();
            match (step, choice) {
                (WizardStep::WelcomeEvent, Choice::Attendance(answer)) => {
                    form.welcome_event = Some(answer)
                }
                (WizardStep::Wedding, Choice::Attendance(answer)) => form.wedding = Some(answer),
                (WizardStep::FarewellEvent, Choice::Attendance(answer)) => {
                    form.farewell_event = Some(answer)
                }
                (WizardStep::Entree, Choice::Entree(entree)) => form.entree_choice = Some(entree),
                _ => return Err(WizardError::ChoiceNotOffered { step, choice }),
            }
            Ok(WizardState::Answering { step, form })
        }
        WizardEvent::WriteNote(note) => {
            if step != WizardStep::Note {
                return Err(WizardError::NoteNotOffered(step));
            }
            let mut form = form.clone();
            form.note = note;
            Ok(WizardState::Answering { step, form })
        }
        WizardEvent::Continue => {
            if step.is_final() {
                return Err(WizardError::FinalStepRequiresSubmit(step));
            }
            if !form.is_answered(step) {
                return Err(WizardError::AnswerRequired(step));
            }
            let next = step
                .next(form)
                .ok_or(WizardError::FinalStepRequiresSubmit(step))?;
            Ok(WizardState::Answering {
                step: next,
                form: form.clone(),
            })
        }
        WizardEvent::Submit { at } => {
            if !step.is_final() {
                return Err(WizardError::SubmitNotAvailable(step));
            }
            if !form.is_answered(step) {
                return Err(WizardError::AnswerRequired(step));
            }
            let response = form.assemble(guest, at)?;
            Ok(WizardState::Submitting {
                form: form.clone(),
                response,
            })
        }
        WizardEvent::Back => {
            let previous = step.previous(form).ok_or(WizardError::NoPreviousStep)?;
            Ok(WizardState::Answering {
                step: previous,
                form: form.clone(),
            })
        }
        WizardEvent::StartOver => Ok(WizardState::default()),
        WizardEvent::SubmissionSucceeded | WizardEvent::SubmissionFailed => {
            Err(WizardError::NotSubmitting)
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Rsvp(#[from] RsvpError),
}

/// One verified guest's pass through the wizard.
#[derive(Debug, Clone)]
pub struct RsvpSession {
    guest: Guest,
    state: WizardState,
    last_error: Option<RsvpError>,
}

impl RsvpSession {
    pub fn new(guest: Guest) -> Self {
        Self {
            guest,
            state: WizardState::default(),
            last_error: None,
        }
    }

    pub fn guest(&self) -> &Guest {
        &self.guest
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn current_step(&self) -> Option<WizardStep> {
        self.state.step()
    }

    pub fn prompt(&self) -> Option<StepPrompt> {
        self.current_step().map(WizardStep::prompt)
    }

    pub fn form(&self) -> Option<&RsvpFormData> {
        self.state.form()
    }

    /// The submitted response once the session has completed.
    pub fn response(&self) -> Option<&RsvpResponse> {
        match &self.state {
            WizardState::Submitted { response } => Some(response),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<&RsvpError> {
        self.last_error.as_ref()
    }

    /// Whether the forward control (Continue or Submit) is enabled.
    pub fn can_advance(&self) -> bool {
        match &self.state {
            WizardState::Answering { step, form } => form.is_answered(*step),
            _ => false,
        }
    }

    pub fn can_go_back(&self) -> bool {
        matches!(
            &self.state,
            WizardState::Answering { step, .. } if *step != WizardStep::WelcomeEvent
        )
    }

    pub fn apply(&mut self, event: WizardEvent) -> Result<(), WizardError> {
        self.state = self.state.transition(&self.guest, event)?;
        Ok(())
    }

    pub fn choose(&mut self, choice: Choice) -> Result<(), WizardError> {
        self.apply(WizardEvent::Choose(choice))
    }

    pub fn write_note(&mut self, note: impl Into<String>) -> Result<(), WizardError> {
        self.apply(WizardEvent::WriteNote(note.into()))
    }

    pub fn advance(&mut self) -> Result<(), WizardError> {
        self.apply(WizardEvent::Continue)
    }

    pub fn back(&mut self) -> Result<(), WizardError> {
        self.apply(WizardEvent::Back)
    }

    pub fn start_over(&mut self) -> Result<(), WizardError> {
        self.apply(WizardEvent::StartOver)?;
        self.last_error = None;
        Ok(())
    }

    /// Completes the final step and makes exactly one submission attempt.
    /// On failure the session is back on the final step with its answers
    /// intact and the error is returned.
    pub async fn submit<S>(
        &mut self,
        store: &S,
        at: DateTime<Utc>,
    ) -> Result<RsvpResponse, SessionError>
    where
        S: ResponseStore + ?Sized,
    {
        self.apply(WizardEvent::Submit { at })?;
        let WizardState::Submitting { response, .. } = &self.state else {
            return Err(WizardError::NotSubmitting.into());
        };
        let response = response.clone();

        match submit_response(store, &response).await {
            Ok(()) => {
                self.apply(WizardEvent::SubmissionSucceeded)?;
                self.last_error = None;
                info!(guest_id = %self.guest.id, "rsvp submitted");
                Ok(response)
            }
            Err(error) => {
                self.apply(WizardEvent::SubmissionFailed)?;
                warn!(guest_id = %self.guest.id, %error, "rsvp submission failed");
                self.last_error = Some(error.clone());
                Err(error.into())
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
