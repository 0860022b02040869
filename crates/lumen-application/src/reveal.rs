//! Typewriter reveal of a finished reply.

use lumen_core::view::{ChatView, MessageId};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Timing of the reveal animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealPace {
    /// Pause before the first character appears.
    pub lead_in: Duration,
    /// Pause after each character.
    pub per_char: Duration,
}

impl RevealPace {
    pub fn instant() -> Self {
        Self {
            lead_in: Duration::ZERO,
            per_char: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Completed,
    /// Stopped early; `shown` characters of the text remain visible.
    Cancelled { shown: usize },
}

/// Writes `text` into message `id` one character at a time.
///
/// Every pause races the token, so a cancel is observed immediately and
/// leaves the prefix written so far.
pub async fn reveal_incrementally(
    view: &dyn ChatView,
    id: MessageId,
    text: &str,
    cancel: &CancellationToken,
    pace: RevealPace,
) -> RevealOutcome {
    view.set_message_content(id, "");
    view.set_message_typing(id, true);

    if !pause(pace.lead_in, cancel).await {
        view.set_message_typing(id, false);
        return RevealOutcome::Cancelled { shown: 0 };
    }

    let mut shown = 0;
    for (offset, ch) in text.char_indices() {
        if cancel.is_cancelled() {
            view.set_message_typing(id, false);
            return RevealOutcome::Cancelled { shown };
        }

        view.set_message_content(id, &text[..offset + ch.len_utf8()]);
        shown += 1;

        if pace.per_char.is_zero() {
            tokio::task::yield_now().await;
        } else if !pause(pace.per_char, cancel).await {
            view.set_message_typing(id, false);
            return RevealOutcome::Cancelled { shown };
        }
    }

    view.set_message_typing(id, false);
    RevealOutcome::Completed
}

/// Sleeps for `duration` unless cancelled first. Returns false on cancel.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
