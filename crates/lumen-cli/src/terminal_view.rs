//! Line-oriented [`ChatView`] for the terminal.
//!
//! Rewrites of a message that only extend it print the new suffix, so the
//! typewriter reveal streams into the current line.

use colored::Colorize;
use lumen_core::session::TurnRole;
use lumen_core::view::{ChatView, MessageId, StatusTone};
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

struct PrintedMessage {
    role: TurnRole,
    is_markup: bool,
    printed: String,
    line_open: bool,
}

#[derive(Default)]
pub struct TerminalView {
    input: Mutex<String>,
    messages: Mutex<Vec<PrintedMessage>>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input(&self, text: &str) {
        *lock(&self.input) = text.to_string();
    }

    /// Terminates any message line left open by an interrupted reveal.
    pub fn finish_lines(&self) {
        let mut messages = lock(&self.messages);
        for message in messages.iter_mut().filter(|m| m.line_open) {
            message.line_open = false;
            println!();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn paint(role: TurnRole, is_markup: bool, text: &str) -> String {
    match (role, is_markup) {
        (TurnRole::User, _) => format!("> {text}").green().to_string(),
        (TurnRole::Assistant, true) => text.bright_blue().to_string(),
        (TurnRole::Assistant, false) => text.bright_yellow().to_string(),
    }
}

impl ChatView for TerminalView {
    fn input_text(&self) -> String {
        lock(&self.input).clone()
    }

    fn clear_input(&self) {
        lock(&self.input).clear();
    }

    fn append_message(&self, role: TurnRole, content: &str, is_markup: bool) -> MessageId {
        let mut messages = lock(&self.messages);
        if !content.is_empty() {
            println!("{}", paint(role, is_markup, content));
        }
        messages.push(PrintedMessage {
            role,
            is_markup,
            printed: content.to_string(),
            line_open: false,
        });
        MessageId(messages.len() - 1)
    }

    fn set_message_content(&self, id: MessageId, content: &str) {
        let mut messages = lock(&self.messages);
        let Some(message) = messages.get_mut(id.0) else {
            return;
        };

        let mut out = io::stdout().lock();
        if let Some(suffix) = content.strip_prefix(message.printed.as_str()) {
            let suffix = if message.line_open {
                suffix
            } else {
                suffix.trim_start_matches('\n')
            };
            if !suffix.is_empty() {
                let _ = write!(out, "{}", paint(message.role, message.is_markup, suffix));
                message.line_open = true;
            }
        } else {
            if message.line_open {
                let _ = writeln!(out);
            }
            let _ = write!(out, "{}", paint(message.role, message.is_markup, content));
            message.line_open = !content.is_empty();
        }
        let _ = out.flush();
        message.printed = content.to_string();
    }

    fn set_message_typing(&self, id: MessageId, typing: bool) {
        if typing {
            return;
        }
        let mut messages = lock(&self.messages);
        if let Some(message) = messages.get_mut(id.0) {
            if message.line_open {
                message.line_open = false;
                println!();
            }
        }
    }

    fn set_send_enabled(&self, _enabled: bool) {}

    fn set_cancel_visible(&self, visible: bool) {
        if visible {
            println!("{}", "(Ctrl-C to stop)".bright_black());
        }
    }

    fn set_credentials_locked(&self, _locked: bool) {}

    fn set_context_loaded(&self, _loaded: bool) {}

    fn set_status(&self, message: &str, tone: StatusTone) {
        let line = match tone {
            StatusTone::Success => message.bright_green(),
            StatusTone::Error => message.red(),
        };
        println!("{line}");
    }

    fn show_suggestions(&self, suggestions: &[String]) {
        println!("{}", "Suggested questions:".bright_magenta());
        for (index, suggestion) in suggestions.iter().enumerate() {
            println!("  {}", format!("/{} {}", index + 1, suggestion).magenta());
        }
    }

    fn clear_transcript(&self) {
        lock(&self.messages).clear();
        println!("{}", "Conversation cleared.".bright_green());
    }
}
