//! Dialogue controller and domain prompt

mod controller;
mod prompt;

pub use controller::{DialogueController, SessionContext};
pub use prompt::DomainPrompt;
