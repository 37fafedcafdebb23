// Hiring pipeline: the application status lookup table and its audit trail.
// Status changes and their history rows always commit in the same transaction.

pub mod history;
pub mod status;

pub use history::{change_status, history_for, record_transition, TransitionRecord};
pub use status::{allowed_transitions, ApplicationStatus};
