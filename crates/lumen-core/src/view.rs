//! UI surface consumed by the conversation controller.
//!
//! Front ends (terminal, web view, tests) implement [`ChatView`]. The
//! controller never touches widgets directly; it only reads the input line,
//! appends and rewrites transcript messages, and toggles the send/cancel
//! actions and status indicators.

use crate::session::TurnRole;
use std::sync::{Mutex, MutexGuard};

/// Identifies a message previously appended to the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub usize);

/// Tone of a status line message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Success,
    Error,
}

/// Contract between the controller and whatever renders the widget.
///
/// Every method is synchronous and must not block: the controller calls them
/// between its own suspension points.
pub trait ChatView: Send + Sync {
    /// Current text of the message input.
    fn input_text(&self) -> String;

    fn clear_input(&self);

    /// Appends a message and scrolls to it.
    fn append_message(&self, role: TurnRole, content: &str, is_markup: bool) -> MessageId;

    /// Replaces the content of an appended message.
    fn set_message_content(&self, id: MessageId, content: &str);

    /// Shows or hides the "typing" indicator on a message.
    fn set_message_typing(&self, id: MessageId, typing: bool);

    fn set_send_enabled(&self, enabled: bool);

    fn set_cancel_visible(&self, visible: bool);

    /// Credential inputs become read-only once the gate is passed.
    fn set_credentials_locked(&self, locked: bool);

    fn set_context_loaded(&self, loaded: bool);

    fn set_status(&self, message: &str, tone: StatusTone);

    fn show_suggestions(&self, suggestions: &[String]);

    fn clear_transcript(&self);
}

/// One rendered transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptMessage {
    pub role: TurnRole,
    pub content: String,
    pub is_markup: bool,
    pub typing: bool,
}

/// Snapshot of everything a [`TranscriptBuffer`] displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub input: String,
    pub messages: Vec<TranscriptMessage>,
    pub scrolled_to: Option<MessageId>,
    pub send_enabled: bool,
    pub cancel_visible: bool,
    pub credentials_locked: bool,
    pub context_loaded: bool,
    pub status: Option<(String, StatusTone)>,
    pub suggestions: Vec<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            input: String::new(),
            messages: Vec::new(),
            scrolled_to: None,
            send_enabled: true,
            cancel_visible: false,
            credentials_locked: false,
            context_loaded: false,
            status: None,
            suggestions: Vec::new(),
        }
    }
}

/// In-memory [`ChatView`] for headless embedding and tests.
#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    state: Mutex<ViewState>,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates typing into the message input.
    pub fn set_input(&self, text: impl Into<String>) {
        self.lock().input = text.into();
    }

    pub fn snapshot(&self) -> ViewState {
        self.lock().clone()
    }

    pub fn messages(&self) -> Vec<TranscriptMessage> {
        self.lock().messages.clone()
    }

    /// Content of the most recent transcript message.
    pub fn last_content(&self) -> Option<String> {
        self.lock().messages.last().map(|m| m.content.clone())
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        // A panic elsewhere must not take the transcript down with it
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ChatView for TranscriptBuffer {
    fn input_text(&self) -> String {
        self.lock().input.clone()
    }

    fn clear_input(&self) {
        self.lock().input.clear();
    }

    fn append_message(&self, role: TurnRole, content: &str, is_markup: bool) -> MessageId {
        let mut state = self.lock();
        state.messages.push(TranscriptMessage {
            role,
            content: content.to_string(),
            is_markup,
            typing: false,
        });
        let id = MessageId(state.messages.len() - 1);
        state.scrolled_to = Some(id);
        id
    }

    fn set_message_content(&self, id: MessageId, content: &str) {
        let mut state = self.lock();
        if let Some(message) = state.messages.get_mut(id.0) {
            message.content.clear();
            message.content.push_str(content);
        }
        state.scrolled_to = state.messages.len().checked_sub(1).map(MessageId);
    }

    fn set_message_typing(&self, id: MessageId, typing: bool) {
        if let Some(message) = self.lock().messages.get_mut(id.0) {
            message.typing = typing;
        }
    }

    fn set_send_enabled(&self, enabled: bool) {
        self.lock().send_enabled = enabled;
    }

    fn set_cancel_visible(&self, visible: bool) {
        self.lock().cancel_visible = visible;
    }

    fn set_credentials_locked(&self, locked: bool) {
        self.lock().credentials_locked = locked;
    }

    fn set_context_loaded(&self, loaded: bool) {
        self.lock().context_loaded = loaded;
    }

    fn set_status(&self, message: &str, tone: StatusTone) {
        self.lock().status = Some((message.to_string(), tone));
    }

    fn show_suggestions(&self, suggestions: &[String]) {
        self.lock().suggestions = suggestions.to_vec();
    }

    fn clear_transcript(&self) {
        let mut state = self.lock();
        state.messages.clear();
        state.scrolled_to = None;
    }
}
