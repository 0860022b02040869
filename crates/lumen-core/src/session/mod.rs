//! Session domain module.
//!
//! # Module Structure
//!
//! - `message`: Conversation turn types (`TurnRole`, `Turn`)
//! - `model`: Page-lifetime session state (`Session`, `Credential`, `ContextState`, `GenerationState`)

mod message;
mod model;

// Re-export public API
pub use message::{Turn, TurnRole};
pub use model::{ContextState, Credential, GenerationState, Session};
