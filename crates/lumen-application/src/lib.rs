pub mod controller;
pub mod reveal;
pub mod suggestions;

pub use controller::{
    ContextReady, ConversationController, GenerationOutcome, Notice, SendOutcome, Unlocked,
};
pub use reveal::{RevealOutcome, RevealPace, reveal_incrementally};
pub use suggestions::SuggestionService;
