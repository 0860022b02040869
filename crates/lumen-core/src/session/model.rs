use super::message::{Turn, TurnRole};
use std::fmt;

/// Captured credentials for the generation endpoint.
///
/// The API key is opaque and only checked for non-emptiness.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential {
    pub api_key: Option<String>,
    pub passkey_verified: bool,
}

impl Credential {
    /// True once the passkey matched and an API key is held.
    pub fn is_unlocked(&self) -> bool {
        self.passkey_verified && self.api_key.is_some()
    }

    pub fn unlock(&mut self, api_key: String) {
        self.api_key = Some(api_key);
        self.passkey_verified = true;
    }

    pub fn reset(&mut self) {
        self.api_key = None;
        self.passkey_verified = false;
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("passkey_verified", &self.passkey_verified)
            .finish()
    }
}

/// The knowledge context for the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContextState {
    /// Nothing loaded yet.
    #[default]
    Unset,
    /// Decoded context text.
    Ready(String),
    /// Sticky failure sentinel holding the surfaced error message.
    Failed(String),
}

impl ContextState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ContextState::Ready(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ContextState::Ready(text) => Some(text),
            _ => None,
        }
    }
}

/// Lifecycle of the single generation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationState {
    #[default]
    Idle,
    AwaitingResponse,
    /// Cancel requested; cleanup has not finished yet.
    Cancelled,
}

/// Page-lifetime state of one chat widget.
///
/// Owned by the conversation controller; nothing here is persisted.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub context: ContextState,
    pub credential: Credential,
    history: Vec<Turn>,
    pub generation: GenerationState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered conversation history.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn push_turn(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    /// Drops a trailing user turn that never got a reply.
    ///
    /// Only used when the user cancels the generation for that turn.
    pub fn discard_pending_user_turn(&mut self) -> Option<Turn> {
        if self.has_pending_user_turn() {
            self.history.pop()
        } else {
            None
        }
    }

    /// Explicit reset: drops the whole history at once.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn is_generating(&self) -> bool {
        self.generation != GenerationState::Idle
    }

    /// True when the history ends with a user turn that has no reply yet.
    pub fn has_pending_user_turn(&self) -> bool {
        self.history
            .last()
            .is_some_and(|turn| turn.role == TurnRole::User)
    }
}
