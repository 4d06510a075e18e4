//! AI Provider Adapters.
//!
//! Implementations of the AIProvider port and the model-backed summarizer.
//!
//! ## Available Adapters
//!
//! - `MockAIProvider` - Scripted mock for testing, routed by request purpose
//! - `OpenAIProvider` - OpenAI-compatible chat completions with tool calling
//! - `AISummarizer` - ConversationSummarizer backed by any AIProvider

mod ai_summarizer;
mod mock_provider;
mod openai_provider;

pub use ai_summarizer::AISummarizer;
pub use mock_provider::{MockAIProvider, MockError, MockResponse};
pub use openai_provider::{OpenAIConfig, OpenAIProvider};
