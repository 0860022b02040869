//! External collaborators of the chat widget: the generation endpoint, the
//! context resource and reply markup conversion.

pub mod context_source;
pub mod gemini_api_agent;
pub mod markup;

pub use context_source::{ContextSource, FileContextSource, HttpContextSource, decode_payload, source_for_location};
pub use gemini_api_agent::{GeminiApiAgent, GenerationAgent};
pub use markup::render_reply;
