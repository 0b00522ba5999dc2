//! # Triad Core
//!
//! Building blocks for a three-agent prompt chain.
//!
//! ## Core Concepts
//! - **Roles**: the fixed Planner, Context and Coder agents with their instructions
//! - **Provider**: trait-based LLM communication (Gemini, OpenAI-compatible)
//! - **Runner**: one prompt per agent turn, trimmed reply back
//! - **Memory**: append-only SQLite log of every reply
//! - **Session**: the plan/context/code produced by one run

pub mod error;
pub mod memory;
pub mod provider;
pub mod role;
pub mod runner;
pub mod session;

pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use memory::{InteractionLog, InteractionRecord, DEFAULT_DB_PATH, DEFAULT_RECENT_LIMIT};
pub use provider::{
    AnyProvider, ChatMessage, CompletionRequest, CompletionResponse, FinishReason,
    GeminiProvider, LlmProvider, OpenAIProvider, ProviderConfig, ProviderError, ProviderType,
    Role, Usage, UsageTracker,
};
pub use role::AgentRole;
pub use runner::{format_prompt, PromptRunner};
pub use session::{SessionState, DEFAULT_GOAL};
