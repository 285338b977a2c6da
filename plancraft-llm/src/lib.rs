//! # plancraft LLM
//!
//! Completion providers for the planning and developer agents.
//!
//! - **Provider**: trait-based LLM communication (OpenAI-compatible, Anthropic)
//! - **Usage**: token accounting across the calls of one run

pub mod provider;

pub use plancraft_error::{Error, ErrorKind, ErrorStatus, Result};
pub use provider::{
    AnthropicProvider, ChatMessage, CompletionRequest, CompletionResponse, FinishReason,
    LlmProvider, OpenAIProvider, Provider, ProviderConfig, ProviderError, ProviderType, Role,
    Usage, UsageTracker,
};
