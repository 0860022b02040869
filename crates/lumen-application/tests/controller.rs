use async_trait::async_trait;
use lumen_application::controller::{GENERATION_ERROR_TEXT, STATUS_READY, STOPPED_BY_USER};
use lumen_application::{
    ContextReady, ConversationController, GenerationOutcome, Notice, SendOutcome, Unlocked,
};
use lumen_core::config::{
    ContextConfig, MarkupFormat, PayloadEncoding, SuggestionStrategy, WidgetConfig,
};
use lumen_core::credential::passkey_digest;
use lumen_core::error::{LumenError, Result};
use lumen_core::session::{ContextState, GenerationState, TurnRole};
use lumen_core::suggestion::fallback_suggestions;
use lumen_core::view::{StatusTone, TranscriptBuffer};
use lumen_interaction::{ContextSource, GenerationAgent};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const PASSKEY: &str = "XLCRSCI2025";
const CONTEXT: &str = "Rust ownership borrowing lifetimes";

/// Agent that replays scripted replies and records every prompt.
struct ScriptedAgent {
    replies: Mutex<VecDeque<Result<String>>>,
    delay: Duration,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAgent {
    fn new(replies: Vec<Result<String>>) -> Self {
        Self::with_delay(replies, Duration::ZERO)
    }

    fn with_delay(replies: Vec<Result<String>>, delay: Duration) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            delay,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationAgent for ScriptedAgent {
    async fn generate(
        &self,
        _api_key: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("scripted reply".to_string()));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LumenError::GenerationAborted),
            _ = tokio::time::sleep(self.delay) => reply,
        }
    }
}

/// Context source that counts fetches; the last scripted payload repeats.
struct CountingSource {
    payloads: Mutex<VecDeque<Result<String>>>,
    delay: Duration,
    fetches: AtomicUsize,
}

impl CountingSource {
    fn new(payloads: Vec<Result<String>>) -> Self {
        Self::with_delay(payloads, Duration::ZERO)
    }

    fn with_delay(payloads: Vec<Result<String>>, delay: Duration) -> Self {
        Self {
            payloads: Mutex::new(payloads.into()),
            delay,
            fetches: AtomicUsize::new(0),
        }
    }

    fn ok(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextSource for CountingSource {
    async fn fetch(&self) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let payload = {
            let mut payloads = self.payloads.lock().unwrap();
            if payloads.len() > 1 {
                payloads.pop_front().unwrap()
            } else {
                payloads.front().cloned().unwrap()
            }
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        payload
    }

    fn describe(&self) -> String {
        "counting source".to_string()
    }
}

struct Harness {
    controller: Arc<ConversationController>,
    agent: Arc<ScriptedAgent>,
    source: Arc<CountingSource>,
    view: Arc<TranscriptBuffer>,
}

fn test_config() -> WidgetConfig {
    WidgetConfig {
        reveal_delay_ms: 0.0,
        reveal_lead_in_ms: 0,
        markup: MarkupFormat::Markdown,
        context: ContextConfig {
            location: "context.txt".to_string(),
            encoding: PayloadEncoding::Raw,
        },
        ..WidgetConfig::default()
    }
}

fn harness(config: WidgetConfig, agent: ScriptedAgent, source: CountingSource) -> Harness {
    let agent = Arc::new(agent);
    let source = Arc::new(source);
    let view = Arc::new(TranscriptBuffer::new());
    let controller = Arc::new(
        ConversationController::new(config, agent.clone(), source.clone(), view.clone())
            .expect("valid config"),
    );
    Harness {
        controller,
        agent,
        source,
        view,
    }
}

fn ready_harness(agent: ScriptedAgent) -> Harness {
    harness(test_config(), agent, CountingSource::ok(CONTEXT))
}

async fn unlock(h: &Harness) {
    let unlocked = h.controller.submit_credentials("api-key", PASSKEY).await;
    assert_eq!(unlocked, Ok(Unlocked { context_loaded: true }));
}

// ============================================================================
// Credential gate and context loading
// ============================================================================

#[tokio::test]
async fn test_unlock_loads_context_once() {
    let h = ready_harness(ScriptedAgent::new(vec![]));

    unlock(&h).await;

    assert!(h.controller.is_unlocked().await);
    assert_eq!(h.source.fetches(), 1);
    assert_eq!(
        h.controller.context_state().await,
        ContextState::Ready(CONTEXT.to_string())
    );

    let view = h.view.snapshot();
    assert!(view.credentials_locked);
    assert!(view.context_loaded);
    assert_eq!(view.status, Some((STATUS_READY.to_string(), StatusTone::Success)));
    assert_eq!(view.suggestions.len(), 3);
    assert_eq!(view.suggestions, h.controller.suggestions().await);
    assert_eq!(view.suggestions[0], "What is Rust about?");

    // Resubmitting does not reload
    unlock(&h).await;
    assert_eq!(h.source.fetches(), 1);
}

#[tokio::test]
async fn test_wrong_passkey_keeps_widget_locked() {
    let h = ready_harness(ScriptedAgent::new(vec![]));

    let result = h.controller.submit_credentials("api-key", "wrong").await;

    assert_eq!(result, Err(LumenError::InvalidPasskey));
    assert!(!h.controller.is_unlocked().await);
    assert_eq!(h.source.fetches(), 0);
    assert_eq!(
        h.view.snapshot().status,
        Some(("Incorrect passkey.".to_string(), StatusTone::Error))
    );

    let outcome = h.controller.send("hi").await;
    assert_eq!(outcome, SendOutcome::Rejected(Notice::SubmitCredentials));
    assert_eq!(
        h.view.last_content().as_deref(),
        Some("Please submit a valid API key and passkey.")
    );
    assert_eq!(h.agent.calls(), 0);
    assert!(h.controller.history().await.is_empty());
}

#[tokio::test]
async fn test_missing_input_is_rejected() {
    let h = ready_harness(ScriptedAgent::new(vec![]));

    assert_eq!(
        h.controller.submit_credentials("", PASSKEY).await,
        Err(LumenError::MissingInput)
    );
    assert_eq!(
        h.controller.submit_credentials("api-key", "  ").await,
        Err(LumenError::MissingInput)
    );
    assert!(!h.controller.is_unlocked().await);
    assert!(!h.view.snapshot().credentials_locked);
}

#[test]
fn test_invalid_reveal_delay_is_rejected_at_construction() {
    for delay in [-1.0, f64::NAN, f64::INFINITY] {
        let config = WidgetConfig {
            reveal_delay_ms: delay,
            ..test_config()
        };
        let result = ConversationController::new(
            config,
            Arc::new(ScriptedAgent::new(vec![])),
            Arc::new(CountingSource::ok(CONTEXT)),
            Arc::new(TranscriptBuffer::new()),
        );
        assert!(
            matches!(result, Err(LumenError::Config(_))),
            "delay {delay} should be rejected"
        );
    }
}

#[tokio::test]
async fn test_disabled_gate_accepts_api_key_alone() {
    let config = WidgetConfig {
        passkey_gate_enabled: false,
        ..test_config()
    };
    let h = harness(config, ScriptedAgent::new(vec![]), CountingSource::ok(CONTEXT));

    let result = h.controller.submit_credentials("api-key", "").await;

    assert_eq!(result, Ok(Unlocked { context_loaded: true }));
}

#[tokio::test]
async fn test_configured_digest_replaces_shipped_passkey() {
    let config = WidgetConfig {
        passkey_digest: Some(passkey_digest("open sesame")),
        ..test_config()
    };
    let h = harness(config, ScriptedAgent::new(vec![]), CountingSource::ok(CONTEXT));

    assert_eq!(
        h.controller.submit_credentials("api-key", PASSKEY).await,
        Err(LumenError::InvalidPasskey)
    );
    assert!(h.controller.submit_credentials("api-key", "open sesame").await.is_ok());
}

#[tokio::test]
async fn test_load_context_is_skipped_before_unlock() {
    let h = ready_harness(ScriptedAgent::new(vec![]));

    assert_eq!(h.controller.load_context().await, Ok(ContextReady::Skipped));
    assert_eq!(h.source.fetches(), 0);
    assert_eq!(h.controller.context_state().await, ContextState::Unset);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_load_fetches_once() {
    let source =
        CountingSource::with_delay(vec![Ok(CONTEXT.to_string())], Duration::from_millis(100));
    let h = harness(test_config(), ScriptedAgent::new(vec![]), source);

    let (unlocked, second) = tokio::join!(
        h.controller.submit_credentials("api-key", PASSKEY),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            h.controller.load_context().await
        }
    );

    assert_eq!(unlocked, Ok(Unlocked { context_loaded: true }));
    assert_eq!(second, Ok(ContextReady::Skipped));
    assert_eq!(h.source.fetches(), 1);
    assert!(!h.controller.is_context_loading());
}

#[tokio::test(start_paused = true)]
async fn test_send_while_loading_asks_to_wait() {
    let source =
        CountingSource::with_delay(vec![Ok(CONTEXT.to_string())], Duration::from_millis(100));
    let h = harness(test_config(), ScriptedAgent::new(vec![]), source);

    let (_, outcome) = tokio::join!(
        h.controller.submit_credentials("api-key", PASSKEY),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            h.controller.send("too early").await
        }
    );

    assert_eq!(outcome, SendOutcome::Rejected(Notice::WaitForContext));
    assert_eq!(h.agent.calls(), 0);
    assert!(h.controller.history().await.is_empty());
}

#[tokio::test]
async fn test_failed_context_blocks_sending() {
    let source = CountingSource::new(vec![Err(LumenError::ContextFetchFailed { status: 404 })]);
    let h = harness(test_config(), ScriptedAgent::new(vec![]), source);

    let unlocked = h.controller.submit_credentials("api-key", PASSKEY).await;
    assert_eq!(unlocked, Ok(Unlocked { context_loaded: false }));

    let expected = "Context failed to load: Failed to load context file: 404";
    assert_eq!(
        h.controller.context_state().await,
        ContextState::Failed(expected.to_string())
    );
    assert_eq!(
        h.view.snapshot().status,
        Some((expected.to_string(), StatusTone::Error))
    );

    let outcome = h.controller.send("hello").await;
    assert_eq!(outcome, SendOutcome::Rejected(Notice::ContextNotLoaded));
    assert_eq!(
        h.view.last_content().as_deref(),
        Some("Context not loaded. Please check the context file.")
    );
    assert_eq!(h.agent.calls(), 0);
    assert!(h.controller.history().await.is_empty());
}

#[tokio::test]
async fn test_reload_recovers_from_failed_context() {
    let source = CountingSource::new(vec![
        Err(LumenError::ContextIo("connection refused".to_string())),
        Ok(CONTEXT.to_string()),
    ]);
    let h = harness(test_config(), ScriptedAgent::new(vec![]), source);

    let unlocked = h.controller.submit_credentials("api-key", PASSKEY).await;
    assert_eq!(unlocked, Ok(Unlocked { context_loaded: false }));

    let reloaded = h.controller.load_context().await;
    assert_eq!(
        reloaded,
        Ok(ContextReady::Loaded {
            chars: CONTEXT.chars().count()
        })
    );
    assert!(h.controller.context_state().await.is_ready());
    assert!(h.view.snapshot().context_loaded);
}

#[tokio::test]
async fn test_base64_context_is_decoded() {
    let config = WidgetConfig {
        context: ContextConfig {
            location: "context.txt".to_string(),
            encoding: PayloadEncoding::Base64,
        },
        ..test_config()
    };
    let source = CountingSource::ok("SGVsbG8gY29u\ndGV4dA==\n");
    let h = harness(config, ScriptedAgent::new(vec![]), source);

    unlock(&h).await;

    assert_eq!(
        h.controller.context_state().await,
        ContextState::Ready("Hello context".to_string())
    );
}

#[tokio::test]
async fn test_undecodable_context_is_a_failure() {
    let config = WidgetConfig {
        context: ContextConfig {
            location: "context.txt".to_string(),
            encoding: PayloadEncoding::Base64,
        },
        ..test_config()
    };
    let h = harness(config, ScriptedAgent::new(vec![]), CountingSource::ok("not base64!"));

    let unlocked = h.controller.submit_credentials("api-key", PASSKEY).await;

    assert_eq!(unlocked, Ok(Unlocked { context_loaded: false }));
    assert!(matches!(
        h.controller.context_state().await,
        ContextState::Failed(_)
    ));
}

// ============================================================================
// Suggestions
// ============================================================================

#[tokio::test]
async fn test_remote_suggestions_are_parsed() {
    let config = WidgetConfig {
        suggestion_strategy: SuggestionStrategy::Remote,
        ..test_config()
    };
    let agent = ScriptedAgent::new(vec![Ok("Q1?\n\n  Q2?  \nQ3?\nQ4?".to_string())]);
    let h = harness(config, agent, CountingSource::ok(CONTEXT));

    unlock(&h).await;

    assert_eq!(h.controller.suggestions().await, vec!["Q1?", "Q2?", "Q3?"]);
    assert_eq!(h.agent.calls(), 1);
}

#[tokio::test]
async fn test_remote_suggestion_failure_uses_fallback() {
    let config = WidgetConfig {
        suggestion_strategy: SuggestionStrategy::Remote,
        ..test_config()
    };
    let agent = ScriptedAgent::new(vec![Err(LumenError::request_failed("offline"))]);
    let h = harness(config, agent, CountingSource::ok(CONTEXT));

    unlock(&h).await;

    assert_eq!(h.controller.suggestions().await, fallback_suggestions());
    assert_eq!(h.view.snapshot().suggestions, fallback_suggestions());
}

#[tokio::test]
async fn test_choosing_suggestion_sends_it() {
    let h = ready_harness(ScriptedAgent::new(vec![Ok("It is a language.".to_string())]));
    unlock(&h).await;

    let suggestion = h.controller.suggestions().await[0].clone();
    let outcome = h.controller.choose_suggestion(&suggestion).await;

    assert_eq!(outcome, SendOutcome::Finished(GenerationOutcome::Completed));
    assert_eq!(h.controller.history().await[0].content, suggestion);
}

// ============================================================================
// Sending
// ============================================================================

#[tokio::test]
async fn test_successful_send_records_both_turns() {
    let h = ready_harness(ScriptedAgent::new(vec![Ok("Ownership moves values.".to_string())]));
    unlock(&h).await;

    h.view.set_input("What is ownership?");
    let outcome = h.controller.send_input().await;

    assert_eq!(outcome, SendOutcome::Finished(GenerationOutcome::Completed));

    let history = h.controller.history().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, TurnRole::User);
    assert_eq!(history[0].content, "What is ownership?");
    assert_eq!(history[1].role, TurnRole::Assistant);
    assert_eq!(history[1].content, "Ownership moves values.");

    let view = h.view.snapshot();
    assert_eq!(view.input, "");
    assert!(view.send_enabled);
    assert!(!view.cancel_visible);
    assert_eq!(view.messages.len(), 2);
    assert_eq!(view.messages[1].content, "Ownership moves values.");
    assert!(!view.messages[1].typing);
    assert_eq!(h.controller.generation_state().await, GenerationState::Idle);
}

#[tokio::test]
async fn test_reply_is_converted_to_html() {
    let config = WidgetConfig {
        markup: MarkupFormat::Html,
        ..test_config()
    };
    let agent = ScriptedAgent::new(vec![Ok("**bold** move".to_string())]);
    let h = harness(config, agent, CountingSource::ok(CONTEXT));
    unlock(&h).await;

    h.controller.send("explain").await;

    let html = "<p><strong>bold</strong> move</p>\n";
    assert_eq!(h.view.last_content().as_deref(), Some(html));
    assert_eq!(h.controller.history().await[1].content, html);
    assert!(h.view.messages()[1].is_markup);
}

#[tokio::test]
async fn test_prompt_carries_previous_turns() {
    let agent = ScriptedAgent::new(vec![
        Ok("reply one".to_string()),
        Ok("reply two".to_string()),
    ]);
    let h = ready_harness(agent);
    unlock(&h).await;

    h.controller.send("first").await;
    h.controller.send("second").await;

    let prompts = h.agent.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].starts_with(&format!("Context: {CONTEXT}\n\nConversation History:\nUser: first\n")));
    assert!(prompts[1].contains("User: first\nAssistant: reply one\nUser: second\n"));
    assert!(prompts[1].contains("\nCurrent Question: second\n\n"));
    assert_eq!(h.controller.history().await.len(), 4);
}

#[tokio::test]
async fn test_empty_input_is_ignored() {
    let h = ready_harness(ScriptedAgent::new(vec![]));
    unlock(&h).await;

    assert_eq!(h.controller.send("   \n").await, SendOutcome::Ignored);
    assert!(h.view.messages().is_empty());
    assert_eq!(h.agent.calls(), 0);
}

#[tokio::test]
async fn test_failed_generation_keeps_user_turn() {
    let failure = LumenError::request_failed_with_status(500, "INTERNAL: Internal error");
    let agent = ScriptedAgent::new(vec![Err(failure.clone()), Ok("recovered".to_string())]);
    let h = ready_harness(agent);
    unlock(&h).await;

    let outcome = h.controller.send("hello").await;

    assert_eq!(outcome, SendOutcome::Finished(GenerationOutcome::Failed(failure)));
    assert_eq!(h.view.last_content().as_deref(), Some(GENERATION_ERROR_TEXT));
    let history = h.controller.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, TurnRole::User);

    let view = h.view.snapshot();
    assert!(view.send_enabled);
    assert!(!view.cancel_visible);

    // The next send works and appends its own pair
    let outcome = h.controller.send("again").await;
    assert_eq!(outcome, SendOutcome::Finished(GenerationOutcome::Completed));
    assert_eq!(h.controller.history().await.len(), 3);
}

// ============================================================================
// Cancellation and concurrency
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_during_reveal_keeps_prefix() {
    let reply = "abcdefghij".repeat(50);
    let config = WidgetConfig {
        reveal_delay_ms: 1.0,
        ..test_config()
    };
    let h = harness(
        config,
        ScriptedAgent::new(vec![Ok(reply.clone())]),
        CountingSource::ok(CONTEXT),
    );
    unlock(&h).await;

    let controller = h.controller.clone();
    let sending = tokio::spawn(async move { controller.send("long answer please").await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.view.snapshot().cancel_visible);
    assert!(h.controller.cancel().await);

    let outcome = sending.await.unwrap();
    assert_eq!(outcome, SendOutcome::Finished(GenerationOutcome::Cancelled));

    let shown = h.view.last_content().unwrap();
    let partial = shown
        .strip_suffix(&format!("\n\n{STOPPED_BY_USER}"))
        .expect("stopped marker appended");
    assert!(!partial.is_empty());
    assert!(partial.len() < reply.len());
    assert!(reply.starts_with(partial));

    assert!(h.controller.history().await.is_empty());
    assert_eq!(h.controller.generation_state().await, GenerationState::Idle);
    let view = h.view.snapshot();
    assert!(view.send_enabled);
    assert!(!view.cancel_visible);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_error_text_is_revealed() {
    let failure = LumenError::request_failed_with_status(500, "INTERNAL: Internal error");
    let config = WidgetConfig {
        reveal_delay_ms: 1.0,
        ..test_config()
    };
    let h = harness(
        config,
        ScriptedAgent::new(vec![Err(failure)]),
        CountingSource::ok(CONTEXT),
    );
    unlock(&h).await;

    let controller = h.controller.clone();
    let sending = tokio::spawn(async move { controller.send("hello").await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(h.controller.cancel().await);

    let outcome = sending.await.unwrap();
    assert_eq!(outcome, SendOutcome::Finished(GenerationOutcome::Cancelled));

    let shown = h.view.last_content().unwrap();
    let partial = shown
        .strip_suffix(&format!("\n\n{STOPPED_BY_USER}"))
        .expect("stopped marker appended");
    assert!(!partial.is_empty());
    assert!(GENERATION_ERROR_TEXT.starts_with(partial));
    assert!(partial.len() < GENERATION_ERROR_TEXT.len());
    assert!(h.controller.history().await.is_empty());
    assert!(!h.view.snapshot().cancel_visible);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_lead_in_stops_promptly() {
    let config = WidgetConfig {
        reveal_lead_in_ms: 5000,
        ..test_config()
    };
    let h = harness(
        config,
        ScriptedAgent::new(vec![Ok("answer".to_string())]),
        CountingSource::ok(CONTEXT),
    );
    unlock(&h).await;

    let controller = h.controller.clone();
    let sending = tokio::spawn(async move { controller.send("question").await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    let cancelled_at = tokio::time::Instant::now();
    assert!(h.controller.cancel().await);

    let outcome = sending.await.unwrap();
    assert_eq!(outcome, SendOutcome::Finished(GenerationOutcome::Cancelled));
    assert!(cancelled_at.elapsed() < Duration::from_millis(10));
    assert_eq!(h.view.last_content().as_deref(), Some(STOPPED_BY_USER));
    assert_eq!(h.controller.generation_state().await, GenerationState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_request() {
    let agent = ScriptedAgent::with_delay(vec![Ok("late".to_string())], Duration::from_secs(10));
    let h = ready_harness(agent);
    unlock(&h).await;

    let controller = h.controller.clone();
    let sending = tokio::spawn(async move { controller.send("slow question").await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        h.controller.generation_state().await,
        GenerationState::AwaitingResponse
    );
    assert!(h.controller.cancel().await);

    let outcome = sending.await.unwrap();
    assert_eq!(outcome, SendOutcome::Finished(GenerationOutcome::Cancelled));
    assert_eq!(h.view.last_content().as_deref(), Some(STOPPED_BY_USER));
    assert!(h.controller.history().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_send_is_ignored_while_generating() {
    let agent = ScriptedAgent::with_delay(vec![Ok("done".to_string())], Duration::from_secs(1));
    let h = ready_harness(agent);
    unlock(&h).await;

    let controller = h.controller.clone();
    let sending = tokio::spawn(async move { controller.send("first").await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(!h.view.snapshot().send_enabled);
    assert_eq!(h.controller.send("second").await, SendOutcome::Ignored);
    assert_eq!(
        h.controller.choose_suggestion("What is Rust about?").await,
        SendOutcome::Ignored
    );
    assert!(!h.controller.clear().await);

    assert_eq!(
        sending.await.unwrap(),
        SendOutcome::Finished(GenerationOutcome::Completed)
    );
    assert_eq!(h.agent.calls(), 1);
    assert_eq!(h.controller.history().await.len(), 2);
}

#[tokio::test]
async fn test_cancel_when_idle_does_nothing() {
    let h = ready_harness(ScriptedAgent::new(vec![]));
    unlock(&h).await;

    assert!(!h.controller.cancel().await);
    assert_eq!(h.controller.generation_state().await, GenerationState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_unsupported() {
    let config = WidgetConfig {
        supports_cancel: false,
        ..test_config()
    };
    let agent = ScriptedAgent::with_delay(vec![Ok("done".to_string())], Duration::from_secs(1));
    let h = harness(config, agent, CountingSource::ok(CONTEXT));
    unlock(&h).await;

    let controller = h.controller.clone();
    let sending = tokio::spawn(async move { controller.send("question").await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(!h.view.snapshot().cancel_visible);
    assert!(!h.controller.cancel().await);
    assert_eq!(
        sending.await.unwrap(),
        SendOutcome::Finished(GenerationOutcome::Completed)
    );
}

// ============================================================================
// Clear
// ============================================================================

#[tokio::test]
async fn test_clear_resets_history_and_transcript() {
    let h = ready_harness(ScriptedAgent::new(vec![]));
    unlock(&h).await;
    h.controller.send("question").await;
    assert_eq!(h.controller.history().await.len(), 2);

    assert!(h.controller.clear().await);

    assert!(h.controller.history().await.is_empty());
    assert!(h.view.messages().is_empty());
    // Context and credentials survive a clear
    assert!(h.controller.context_state().await.is_ready());
    assert!(h.controller.is_unlocked().await);
}

#[tokio::test]
async fn test_clear_unsupported() {
    let config = WidgetConfig {
        supports_clear: false,
        ..test_config()
    };
    let h = harness(config, ScriptedAgent::new(vec![]), CountingSource::ok(CONTEXT));
    unlock(&h).await;
    h.controller.send("question").await;

    assert!(!h.controller.clear().await);
    assert_eq!(h.controller.history().await.len(), 2);
}
