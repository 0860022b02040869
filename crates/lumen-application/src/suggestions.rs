//! Starter-question service.

use lumen_core::config::SuggestionStrategy;
use lumen_core::suggestion::{
    fallback_suggestions, local_suggestions, parse_remote_suggestions, remote_suggestion_prompt,
};
use lumen_interaction::GenerationAgent;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Produces 1-3 clickable questions for a freshly loaded context.
pub struct SuggestionService {
    strategy: SuggestionStrategy,
    agent: Arc<dyn GenerationAgent>,
}

impl SuggestionService {
    pub fn new(strategy: SuggestionStrategy, agent: Arc<dyn GenerationAgent>) -> Self {
        Self { strategy, agent }
    }

    /// Never fails: the remote strategy degrades to a fixed fallback set.
    pub async fn suggest(&self, context: &str, api_key: &str) -> Vec<String> {
        match self.strategy {
            SuggestionStrategy::Local => local_suggestions(context),
            SuggestionStrategy::Remote => {
                let prompt = remote_suggestion_prompt(context);
                match self
                    .agent
                    .generate(api_key, &prompt, &CancellationToken::new())
                    .await
                {
                    Ok(reply) => parse_remote_suggestions(&reply),
                    Err(err) => {
                        tracing::warn!(error = %err, "remote suggestions failed, using fallback");
                        fallback_suggestions()
                    }
                }
            }
        }
    }
}
