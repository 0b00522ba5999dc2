//! # Session State
//!
//! The outputs of one run of the chain. A run starts from a goal and fills
//! `plan`, `context` and `code` in that order; a field is only ever set after
//! the one before it.

use crate::role::AgentRole;
use serde::{Deserialize, Serialize};

/// Goal used when the user does not supply one
pub const DEFAULT_GOAL: &str =
    "Build a Python script to create an AI assistant using Google Gemini";

/// What one run of the chain has produced so far
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub goal: String,
    pub plan: Option<String>,
    pub context: Option<String>,
    pub code: Option<String>,
}

impl SessionState {
    /// Fresh state for `goal` with no stage output yet
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            ..Default::default()
        }
    }

    /// The agent that runs next, or `None` once all three have answered
    pub fn next_stage(&self) -> Option<AgentRole> {
        match (&self.plan, &self.context, &self.code) {
            (None, _, _) => Some(AgentRole::Planner),
            (Some(_), None, _) => Some(AgentRole::Context),
            (Some(_), Some(_), None) => Some(AgentRole::Coder),
            (Some(_), Some(_), Some(_)) => None,
        }
    }

    /// Text the given agent is asked to work on: the goal for the planner,
    /// the previous agent's output for the others.
    pub fn input_for(&self, agent: AgentRole) -> Option<&str> {
        match agent {
            AgentRole::Planner => Some(self.goal.as_str()),
            AgentRole::Context => self.plan.as_deref(),
            AgentRole::Coder => self.context.as_deref(),
        }
    }

    /// Output stored for the given agent, if it has answered
    pub fn output_of(&self, agent: AgentRole) -> Option<&str> {
        match agent {
            AgentRole::Planner => self.plan.as_deref(),
            AgentRole::Context => self.context.as_deref(),
            AgentRole::Coder => self.code.as_deref(),
        }
    }

    /// Record `output` as the given agent's answer, returning the new state
    pub fn with_output(mut self, agent: AgentRole, output: impl Into<String>) -> Self {
        let slot = match agent {
            AgentRole::Planner => &mut self.plan,
            AgentRole::Context => &mut self.context,
            AgentRole::Coder => &mut self.code,
        };
        *slot = Some(output.into());
        self
    }

    pub fn is_complete(&self) -> bool {
        self.next_stage().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_advance_in_order() {
        let state = SessionState::new("build X");
        assert_eq!(state.next_stage(), Some(AgentRole::Planner));
        assert_eq!(state.input_for(AgentRole::Planner), Some("build X"));
        assert_eq!(state.input_for(AgentRole::Context), None);

        let state = state.with_output(AgentRole::Planner, "plan");
        assert_eq!(state.next_stage(), Some(AgentRole::Context));
        assert_eq!(state.input_for(AgentRole::Context), Some("plan"));

        let state = state.with_output(AgentRole::Context, "ctx");
        assert_eq!(state.next_stage(), Some(AgentRole::Coder));
        assert_eq!(state.input_for(AgentRole::Coder), Some("ctx"));

        let state = state.with_output(AgentRole::Coder, "code");
        assert!(state.is_complete());
        assert_eq!(state.output_of(AgentRole::Coder), Some("code"));
    }

    #[test]
    fn test_empty_output_counts_as_answered() {
        let state = SessionState::new("g").with_output(AgentRole::Planner, "");
        assert_eq!(state.next_stage(), Some(AgentRole::Context));
        assert_eq!(state.input_for(AgentRole::Context), Some(""));
    }

    #[test]
    fn test_json_shape() {
        let state = SessionState::new("g").with_output(AgentRole::Planner, "p");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"goal": "g", "plan": "p", "context": null, "code": null})
        );
    }
}
