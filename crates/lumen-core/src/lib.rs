pub mod config;
pub mod credential;
pub mod error;
pub mod prompt;
pub mod session;
pub mod suggestion;
pub mod view;

// Re-export common error type
pub use error::{LumenError, Result};
