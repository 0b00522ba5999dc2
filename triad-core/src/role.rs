//! The three fixed agent roles and their instructions.

use crate::error::{self, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three agents in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentRole {
    #[serde(rename = "PlannerAgent")]
    Planner,
    #[serde(rename = "ContextAgent")]
    Context,
    #[serde(rename = "CoderAgent")]
    Coder,
}

impl AgentRole {
    /// All roles, in the order the chain runs them
    pub const ALL: [AgentRole; 3] = [AgentRole::Planner, AgentRole::Context, AgentRole::Coder];

    /// Name the agent is addressed by in prompts and stored under in the log
    pub fn name(&self) -> &'static str {
        match self {
            AgentRole::Planner => "PlannerAgent",
            AgentRole::Context => "ContextAgent",
            AgentRole::Coder => "CoderAgent",
        }
    }

    /// Fixed role instruction sent with every prompt for this agent
    pub fn description(&self) -> &'static str {
        match self {
            AgentRole::Planner => {
                "You are a Planner Agent. Break down the user's goal into clear, logical steps."
            }
            AgentRole::Context => {
                "You are a Context Agent. Given a step or question, provide relevant knowledge and context."
            }
            AgentRole::Coder => {
                "You are a Coding Agent. Based on the plan and context, write or explain Python code."
            }
        }
    }

    /// Progress line shown while the agent is working
    pub fn progress_label(&self) -> &'static str {
        match self {
            AgentRole::Planner => "Planning Agent thinking...",
            AgentRole::Context => "Context Agent thinking...",
            AgentRole::Coder => "Coding Agent thinking...",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AgentRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentRole::ALL
            .into_iter()
            .find(|role| role.name() == s)
            .ok_or_else(|| error::unknown_agent(s))
    }
}
