//! # Prompt Runner
//!
//! Turns an agent role, its instruction and the user's text into one prompt,
//! sends it to the provider and hands back the trimmed reply.
//!
//! The runner never retries: a provider failure is returned to the caller as
//! a transport error with the agent attached as context.

use crate::error::{self, Error, Result};
use crate::provider::{ChatMessage, CompletionRequest, LlmProvider, UsageTracker};
use crate::role::AgentRole;

/// Build the single prompt string sent for one agent turn
pub fn format_prompt(agent: AgentRole, role_description: &str, user_message: &str) -> String {
    format!(
        "You are {}. {} User Input: {}",
        agent.name(),
        role_description,
        user_message
    )
}

/// Sends agent prompts through an [`LlmProvider`]
pub struct PromptRunner<P> {
    provider: P,
    /// Model override; the provider's default when unset
    model: Option<String>,
    usage: UsageTracker,
}

impl<P: LlmProvider> PromptRunner<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            model: None,
            usage: UsageTracker::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Model the next request will use
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Token usage accumulated over every successful call
    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Ask `agent` to respond to `user_message`.
    ///
    /// Returns the reply with surrounding whitespace removed. An empty reply
    /// is a valid answer.
    pub async fn run(
        &mut self,
        agent: AgentRole,
        role_description: &str,
        user_message: &str,
    ) -> Result<String> {
        if role_description.trim().is_empty() {
            return Err(error::blank_argument("role_description").with_operation("runner::run"));
        }

        let prompt = format_prompt(agent, role_description, user_message);
        let model = self.model().to_string();
        let request = CompletionRequest::new(vec![ChatMessage::user(prompt)]).with_model(&model);

        tracing::info!(agent = %agent, model = %model, "{} is responding", agent);

        let response = self.provider.complete(request).await.map_err(|e| {
            Error::from(e)
                .with_operation("runner::run")
                .with_context("agent", agent.name())
                .with_context("model", model.clone())
        })?;

        let usage_model = if response.model.is_empty() {
            model.as_str()
        } else {
            response.model.as_str()
        };
        self.usage.track(usage_model, &response.usage);

        let reply = response.content.as_deref().unwrap_or_default().trim().to_string();
        if reply.is_empty() {
            tracing::warn!(agent = %agent, finish_reason = ?response.finish_reason, "empty reply");
        }
        tracing::debug!(agent = %agent, chars = reply.len(), "reply:\n{}", reply);

        Ok(reply)
    }

    /// Run `agent` with its built-in role instruction
    pub async fn run_role(&mut self, agent: AgentRole, user_message: &str) -> Result<String> {
        self.run(agent, agent.description(), user_message).await
    }
}
