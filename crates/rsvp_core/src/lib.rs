pub mod admin;
pub mod api;
pub mod directory;
pub mod export;
pub mod submission;
pub mod summary;
pub mod wizard;

pub use admin::{AdminGate, AdminSession};
pub use directory::{lookup_guest, match_guest, GuestDirectory};
pub use export::{export_csv, ExportOptions, EXPORT_FILENAME};
pub use submission::{submit_response, ResponseStore};
pub use summary::{AdminSnapshot, RsvpSummary};
pub use wizard::{
    Choice, RsvpFormData, RsvpSession, SessionError, StepPrompt, WizardError, WizardEvent,
    WizardState, WizardStep,
};
