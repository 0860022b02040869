//! Conversation session controller.
//!
//! Owns the [`Session`] and drives the whole widget lifecycle:
//!
//! 1. `submit_credentials` passes the passkey gate and triggers `load_context`
//! 2. `load_context` fetches and decodes the context, then refreshes suggestions
//! 3. `send` checks preconditions, records the user turn and runs one generation
//! 4. the generation builds the prompt, calls the agent, converts the reply
//!    markup, reveals it, and only then records the assistant turn
//!
//! At most one generation runs at a time. A second `send` while one is in
//! flight is rejected, not queued. `cancel` fires the cancellation token shared
//! by the request and the reveal loop.

use crate::reveal::{RevealOutcome, RevealPace, reveal_incrementally};
use crate::suggestions::SuggestionService;
use lumen_core::config::WidgetConfig;
use lumen_core::credential::CredentialGate;
use lumen_core::error::{LumenError, Result};
use lumen_core::prompt::build_prompt;
use lumen_core::session::{ContextState, GenerationState, Session, Turn, TurnRole};
use lumen_core::view::{ChatView, MessageId, StatusTone};
use lumen_interaction::{
    ContextSource, GeminiApiAgent, GenerationAgent, decode_payload, render_reply,
    source_for_location,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

pub const STATUS_LOADING_CONTEXT: &str = "API Key and Passkey submitted. Loading context...";
pub const STATUS_READY: &str = "API and Passkey accepted. Ready to chat.";
pub const GENERATION_ERROR_TEXT: &str =
    "Error: Check your API key or connection. See the log for details.";
pub const STOPPED_BY_USER: &str = "Stopped by user.";

/// Why a `send` was refused before anything was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    SubmitCredentials,
    WaitForContext,
    ContextNotLoaded,
}

impl Notice {
    pub fn text(self) -> &'static str {
        match self {
            Notice::SubmitCredentials => "Please submit a valid API key and passkey.",
            Notice::WaitForContext => {
                "Please wait for the context to load before sending messages."
            }
            Notice::ContextNotLoaded => "Context not loaded. Please check the context file.",
        }
    }
}

/// Result of passing the credential gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unlocked {
    /// Whether the context was ready once the triggered load finished.
    pub context_loaded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextReady {
    Loaded { chars: usize },
    /// A load was already running or the gate is still closed.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Reply revealed and recorded as an assistant turn.
    Completed,
    /// Stopped by the user, including while the error text was shown;
    /// history is back to its state before the send.
    Cancelled,
    /// Error text fully revealed; only the user turn was recorded.
    Failed(LumenError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty input, or a generation is already in flight.
    Ignored,
    Rejected(Notice),
    Finished(GenerationOutcome),
}

/// Mutable controller state behind one lock.
#[derive(Default)]
struct ControllerState {
    session: Session,
    /// Token of the in-flight generation, if any.
    active_generation: Option<CancellationToken>,
}

/// Holds the context-loading flag for the duration of one load.
struct LoadingFlag<'a>(&'a AtomicBool);

impl<'a> LoadingFlag<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The client-side conversation session controller.
pub struct ConversationController {
    config: WidgetConfig,
    gate: CredentialGate,
    state: RwLock<ControllerState>,
    context_loading: AtomicBool,
    suggestions: RwLock<Vec<String>>,
    agent: Arc<dyn GenerationAgent>,
    context_source: Arc<dyn ContextSource>,
    suggestion_service: SuggestionService,
    view: Arc<dyn ChatView>,
}

impl ConversationController {
    /// Creates a controller with explicit collaborators.
    ///
    /// The configuration is validated first; an out-of-range value is a
    /// `Config` error.
    pub fn new(
        config: WidgetConfig,
        agent: Arc<dyn GenerationAgent>,
        context_source: Arc<dyn ContextSource>,
        view: Arc<dyn ChatView>,
    ) -> Result<Self> {
        config.validate()?;
        let gate = if config.passkey_gate_enabled {
            config
                .passkey_digest
                .clone()
                .map(CredentialGate::new)
                .unwrap_or_default()
        } else {
            CredentialGate::without_passkey()
        };
        let suggestion_service =
            SuggestionService::new(config.suggestion_strategy, Arc::clone(&agent));

        Ok(Self {
            config,
            gate,
            state: RwLock::new(ControllerState::default()),
            context_loading: AtomicBool::new(false),
            suggestions: RwLock::new(Vec::new()),
            agent,
            context_source,
            suggestion_service,
            view,
        })
    }

    /// Creates a controller talking to Gemini and the configured context location.
    pub fn from_config(config: WidgetConfig, view: Arc<dyn ChatView>) -> Result<Self> {
        let agent: Arc<dyn GenerationAgent> =
            Arc::new(GeminiApiAgent::from_config(&config.generation)?);
        let context_source = source_for_location(&config.context.location);
        Self::new(config, agent, context_source, view)
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    // ============================================================================
    // Credential gate
    // ============================================================================

    /// Validates the API key and passkey, then loads the context.
    ///
    /// Any failure leaves the session locked with no API key stored.
    /// Once unlocked, further submissions are no-ops.
    pub async fn submit_credentials(&self, api_key: &str, passkey: &str) -> Result<Unlocked> {
        {
            let mut state = self.state.write().await;
            if state.session.credential.is_unlocked() {
                tracing::debug!("credentials already accepted, ignoring resubmission");
                return Ok(Unlocked {
                    context_loaded: state.session.context.is_ready(),
                });
            }

            match self.gate.check(api_key, passkey) {
                Ok(api_key) => state.session.credential.unlock(api_key),
                Err(err) => {
                    state.session.credential.reset();
                    drop(state);
                    tracing::warn!(error = %err, "credential gate rejected submission");
                    self.view.set_status(&err.to_string(), StatusTone::Error);
                    return Err(err);
                }
            }
        }

        tracing::info!("credentials accepted");
        self.view.set_credentials_locked(true);
        self.view.set_status(STATUS_LOADING_CONTEXT, StatusTone::Success);

        let context_loaded = matches!(self.load_context().await, Ok(ContextReady::Loaded { .. }));
        Ok(Unlocked { context_loaded })
    }

    pub async fn is_unlocked(&self) -> bool {
        self.state.read().await.session.credential.is_unlocked()
    }

    // ============================================================================
    // Context loading
    // ============================================================================

    /// Fetches and decodes the context, then refreshes the suggestions.
    ///
    /// Returns `Skipped` without fetching while the gate is closed or another
    /// load is running. A failure stores the sticky failure sentinel, which
    /// only a later successful call clears.
    pub async fn load_context(&self) -> Result<ContextReady> {
        let api_key = {
            let state = self.state.read().await;
            if !state.session.credential.is_unlocked() {
                tracing::debug!("context load skipped: credentials not verified");
                return Ok(ContextReady::Skipped);
            }
            state.session.credential.api_key.clone().unwrap_or_default()
        };

        let Some(loading) = LoadingFlag::acquire(&self.context_loading) else {
            tracing::debug!("context load skipped: already loading");
            return Ok(ContextReady::Skipped);
        };

        tracing::info!(source = %self.context_source.describe(), "loading context");
        let fetched = self.fetch_context().await;

        let mut state = self.state.write().await;
        match fetched {
            Ok(text) => {
                let chars = text.chars().count();
                state.session.context = ContextState::Ready(text.clone());
                drop(state);
                drop(loading);

                tracing::info!(chars, "context loaded");
                self.view.set_context_loaded(true);
                self.view.set_status(STATUS_READY, StatusTone::Success);
                self.refresh_suggestions(&text, &api_key).await;
                Ok(ContextReady::Loaded { chars })
            }
            Err(err) => {
                let message = format!("Context failed to load: {err}");
                state.session.context = ContextState::Failed(message.clone());
                drop(state);

                tracing::warn!(error = %err, "context load failed");
                self.view.set_context_loaded(false);
                self.view.set_status(&message, StatusTone::Error);
                Err(err)
            }
        }
    }

    async fn fetch_context(&self) -> Result<String> {
        let payload = self.context_source.fetch().await?;
        decode_payload(&payload, self.config.context.encoding)
    }

    pub async fn context_state(&self) -> ContextState {
        self.state.read().await.session.context.clone()
    }

    pub fn is_context_loading(&self) -> bool {
        self.context_loading.load(Ordering::SeqCst)
    }

    // ============================================================================
    // Suggestions
    // ============================================================================

    async fn refresh_suggestions(&self, context: &str, api_key: &str) {
        let suggestions = self.suggestion_service.suggest(context, api_key).await;
        tracing::debug!(count = suggestions.len(), "suggestions ready");
        self.view.show_suggestions(&suggestions);
        *self.suggestions.write().await = suggestions;
    }

    pub async fn suggestions(&self) -> Vec<String> {
        self.suggestions.read().await.clone()
    }

    /// Sends a suggestion as if it had been typed; ignored while generating.
    pub async fn choose_suggestion(&self, suggestion: &str) -> SendOutcome {
        if self.state.read().await.session.is_generating() {
            tracing::debug!("suggestion ignored: generation in flight");
            return SendOutcome::Ignored;
        }
        self.send(suggestion).await
    }

    // ============================================================================
    // Conversation
    // ============================================================================

    /// Sends whatever is currently in the view's input field.
    pub async fn send_input(&self) -> SendOutcome {
        let text = self.view.input_text();
        self.send(&text).await
    }

    /// Sends a user message and runs the generation for it to completion.
    pub async fn send(&self, message: &str) -> SendOutcome {
        let message = message.trim();
        if message.is_empty() {
            return SendOutcome::Ignored;
        }

        let token = {
            let mut state = self.state.write().await;
            if state.session.is_generating() {
                tracing::debug!("send ignored: generation in flight");
                return SendOutcome::Ignored;
            }

            let notice = if !state.session.credential.is_unlocked() {
                Some(Notice::SubmitCredentials)
            } else if self.is_context_loading() {
                Some(Notice::WaitForContext)
            } else if !state.session.context.is_ready() {
                Some(Notice::ContextNotLoaded)
            } else {
                None
            };
            if let Some(notice) = notice {
                drop(state);
                tracing::debug!(?notice, "send rejected");
                self.view.append_message(TurnRole::Assistant, notice.text(), false);
                return SendOutcome::Rejected(notice);
            }

            let token = CancellationToken::new();
            state.session.push_turn(Turn::user(message));
            state.session.generation = GenerationState::AwaitingResponse;
            state.active_generation = Some(token.clone());
            token
        };

        self.view.append_message(TurnRole::User, message, false);
        self.view.clear_input();

        SendOutcome::Finished(self.generate(message, token).await)
    }

    /// Runs one generation and restores the idle UI afterwards.
    async fn generate(&self, message: &str, token: CancellationToken) -> GenerationOutcome {
        self.view.set_send_enabled(false);
        if self.config.supports_cancel {
            self.view.set_cancel_visible(true);
        }

        let outcome = self.run_generation(message, &token).await;

        // run_generation reports every failure as an outcome, so this reset
        // runs after success, cancellation and error alike
        {
            let mut state = self.state.write().await;
            if outcome == GenerationOutcome::Cancelled {
                state.session.discard_pending_user_turn();
            }
            state.session.generation = GenerationState::Idle;
            state.active_generation = None;
        }
        self.view.set_send_enabled(true);
        self.view.set_cancel_visible(false);

        outcome
    }

    async fn run_generation(&self, message: &str, token: &CancellationToken) -> GenerationOutcome {
        let (prompt, api_key) = {
            let state = self.state.read().await;
            let session = &state.session;
            let prompt = build_prompt(
                session.context.text().unwrap_or_default(),
                session.history(),
                message,
                &self.config.prompt_suffix,
            );
            let api_key = session.credential.api_key.clone().unwrap_or_default();
            (prompt, api_key)
        };

        let handle = self.view.append_message(TurnRole::Assistant, "", true);
        self.view.set_message_typing(handle, true);

        let result = self.agent.generate(&api_key, &prompt, token).await;
        self.view.set_message_typing(handle, false);

        match result {
            Ok(reply) => {
                let rendered = render_reply(&reply, self.config.markup);
                if !self.reveal_or_stop(handle, &rendered, token).await {
                    return GenerationOutcome::Cancelled;
                }
                self.state
                    .write()
                    .await
                    .session
                    .push_turn(Turn::assistant(rendered));
                tracing::info!("generation completed");
                GenerationOutcome::Completed
            }
            Err(err) if err.is_aborted() => {
                self.mark_stopped(handle, "");
                GenerationOutcome::Cancelled
            }
            Err(err) => {
                tracing::warn!(error = %err, "generation failed");
                // A cancel while the error text is shown still counts as a stop
                if !self
                    .reveal_or_stop(handle, GENERATION_ERROR_TEXT, token)
                    .await
                {
                    return GenerationOutcome::Cancelled;
                }
                GenerationOutcome::Failed(err)
            }
        }
    }

    /// Reveals `text`; on cancel marks the message stopped and returns false.
    async fn reveal_or_stop(
        &self,
        handle: MessageId,
        text: &str,
        token: &CancellationToken,
    ) -> bool {
        match reveal_incrementally(self.view.as_ref(), handle, text, token, self.pace()).await {
            RevealOutcome::Completed => true,
            RevealOutcome::Cancelled { shown } => {
                let partial: String = text.chars().take(shown).collect();
                self.mark_stopped(handle, &partial);
                false
            }
        }
    }

    fn mark_stopped(&self, handle: MessageId, partial: &str) {
        tracing::info!(shown_chars = partial.chars().count(), "generation stopped by user");
        let content = if partial.is_empty() {
            STOPPED_BY_USER.to_string()
        } else {
            format!("{partial}\n\n{STOPPED_BY_USER}")
        };
        self.view.set_message_content(handle, &content);
    }

    fn pace(&self) -> RevealPace {
        RevealPace {
            lead_in: self.config.reveal_lead_in(),
            per_char: self.config.reveal_delay(),
        }
    }

    /// Requests cancellation of the in-flight generation.
    ///
    /// Returns false when cancel is disabled or nothing is running.
    pub async fn cancel(&self) -> bool {
        if !self.config.supports_cancel {
            return false;
        }

        let mut state = self.state.write().await;
        let Some(token) = state.active_generation.clone() else {
            return false;
        };
        token.cancel();
        state.session.generation = GenerationState::Cancelled;
        tracing::debug!("cancel requested");
        true
    }

    /// Clears history and transcript. Refused while a generation runs.
    pub async fn clear(&self) -> bool {
        if !self.config.supports_clear {
            return false;
        }

        let mut state = self.state.write().await;
        if state.session.is_generating() {
            return false;
        }
        state.session.clear_history();
        drop(state);

        self.view.clear_transcript();
        tracing::debug!("conversation cleared");
        true
    }

    pub async fn history(&self) -> Vec<Turn> {
        self.state.read().await.session.history().to_vec()
    }

    pub async fn generation_state(&self) -> GenerationState {
        self.state.read().await.session.generation
    }
}
