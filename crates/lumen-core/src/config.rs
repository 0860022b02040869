//! Widget configuration.
//!
//! All behavioral variants of the chat widget (suggestion strategy, typing
//! speed, cancel/clear support, passkey gate) are flags on one [`WidgetConfig`]
//! loaded from TOML, e.g. `~/.config/lumen/config.toml`:
//!
//! ```toml
//! suggestion_strategy = "remote"
//! reveal_delay_ms = 0.5
//! supports_clear = false
//!
//! [context]
//! location = "https://example.org/context.txt"
//! encoding = "raw"
//! ```

use crate::error::{LumenError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_GENERATION_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_PROMPT_SUFFIX: &str = "Please provide a well-formatted answer using Markdown syntax. Use headings, bullet points, numbered lists, and other appropriate formatting to make the response clear and easy to read.";

/// How starter questions are derived from the loaded context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStrategy {
    /// First long words of the context fill fixed question templates
    #[default]
    Local,
    /// Ask the generation endpoint for questions
    Remote,
}

/// How the fetched context payload is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    /// Payload is the UTF-8 context text itself
    Raw,
    /// Payload is base64-encoded UTF-8 text
    #[default]
    Base64,
}

/// Target format for reply conversion before display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarkupFormat {
    /// Markdown is rendered to HTML
    #[default]
    Html,
    /// Markdown is kept as-is (terminal front ends)
    Markdown,
}

/// Where the knowledge context comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// `http(s)://` URL or a filesystem path
    pub location: String,
    pub encoding: PayloadEncoding,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            location: "context.txt".to_string(),
            encoding: PayloadEncoding::Base64,
        }
    }
}

/// Generation endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL; the request goes to `{endpoint}/{model}:generateContent`
    pub endpoint: String,
    pub model: String,
    /// Deadline for a single generation request
    pub request_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GENERATION_ENDPOINT.to_string(),
            model: DEFAULT_GENERATION_MODEL.to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl GenerationConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Root configuration for one chat widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub suggestion_strategy: SuggestionStrategy,
    /// Per-character reveal delay; fractional milliseconds are allowed
    pub reveal_delay_ms: f64,
    /// Pause before the first revealed character
    pub reveal_lead_in_ms: u64,
    pub supports_cancel: bool,
    pub supports_clear: bool,
    pub passkey_gate_enabled: bool,
    /// Overrides the compiled-in reference digest (lowercase hex SHA-256)
    pub passkey_digest: Option<String>,
    pub markup: MarkupFormat,
    pub prompt_suffix: String,
    pub context: ContextConfig,
    pub generation: GenerationConfig,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            suggestion_strategy: SuggestionStrategy::Local,
            reveal_delay_ms: 1.0,
            reveal_lead_in_ms: 100,
            supports_cancel: true,
            supports_clear: true,
            passkey_gate_enabled: true,
            passkey_digest: None,
            markup: MarkupFormat::Html,
            prompt_suffix: DEFAULT_PROMPT_SUFFIX.to_string(),
            context: ContextConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl WidgetConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LumenError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !self.reveal_delay_ms.is_finite() || self.reveal_delay_ms < 0.0 {
            return Err(LumenError::config(format!(
                "reveal_delay_ms must be a non-negative number, got {}",
                self.reveal_delay_ms
            )));
        }
        if self.generation.endpoint.trim().is_empty() {
            return Err(LumenError::config("generation.endpoint must not be empty"));
        }
        if self.generation.model.trim().is_empty() {
            return Err(LumenError::config("generation.model must not be empty"));
        }
        if self.generation.request_timeout_secs == 0 {
            return Err(LumenError::config(
                "generation.request_timeout_secs must be greater than zero",
            ));
        }
        if self.context.location.trim().is_empty() {
            return Err(LumenError::config("context.location must not be empty"));
        }
        if let Some(digest) = &self.passkey_digest {
            let well_formed = digest.len() == 64
                && digest
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
            if !well_formed {
                return Err(LumenError::config(
                    "passkey_digest must be 64 lowercase hex characters",
                ));
            }
        }
        Ok(())
    }

    /// Per-character delay; a value `validate` would reject maps to zero.
    pub fn reveal_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.reveal_delay_ms / 1000.0).unwrap_or(Duration::ZERO)
    }

    pub fn reveal_lead_in(&self) -> Duration {
        Duration::from_millis(self.reveal_lead_in_ms)
    }
}
