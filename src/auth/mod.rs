pub mod gate;
pub mod outcome;

// Re-export so we can do "use crate::auth::*;"
pub use gate::{AuthGate, Authenticator, OutcomeWatcher};
pub use outcome::{AuthOutcome, AuthValue};
