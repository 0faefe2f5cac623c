//! Answering policy module
//!
//! The chat service decides, per incoming message, whether to answer at
//! all: grounded answers only. No qualifying passages means a fixed polite
//! refusal, a retrieval fault means a distinct apology, and in both cases
//! the completion provider is never called and nothing is persisted.

pub mod prompts;
pub mod service;

pub use prompts::DEGRADED_TEXT;
pub use prompts::REFUSAL_TEXT;
pub use service::ChatOutcome;
pub use service::ChatService;
pub use service::OutcomeKind;
