//! Session controller - drives planner -> context -> coder

use std::fmt;
use triad_core::error;
use triad_core::{AgentRole, Error, InteractionLog, LlmProvider, PromptRunner, SessionState};

/// A run that stopped part-way.
///
/// Carries the state as it was before the failing stage, so whatever the
/// earlier agents produced is still available to show.
#[derive(Debug)]
pub struct StageError {
    /// Stage that failed; `None` when the run was rejected before any stage
    pub stage: Option<AgentRole>,
    /// State produced before the failure
    pub state: SessionState,
    pub error: Error,
}

impl StageError {
    fn new(stage: Option<AgentRole>, state: SessionState, error: Error) -> Self {
        Self { stage, state, error }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            Some(stage) => write!(f, "{} failed: {}", stage, self.error),
            None => write!(f, "run rejected: {}", self.error),
        }
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

type ProgressCallback = Box<dyn Fn(AgentRole) + Send + Sync>;

/// Runs the three agents in order, persisting each reply before the next
/// agent starts.
pub struct SessionController<P> {
    runner: PromptRunner<P>,
    log: InteractionLog,
    on_stage: Option<ProgressCallback>,
}

impl<P: LlmProvider> SessionController<P> {
    pub fn new(runner: PromptRunner<P>, log: InteractionLog) -> Self {
        Self {
            runner,
            log,
            on_stage: None,
        }
    }

    /// Called with each agent right before it is prompted
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(AgentRole) + Send + Sync + 'static,
    {
        self.on_stage = Some(Box::new(callback));
        self
    }

    pub fn runner(&self) -> &PromptRunner<P> {
        &self.runner
    }

    pub fn log(&self) -> &InteractionLog {
        &self.log
    }

    /// Run all three stages for `goal`, starting from an empty state
    pub async fn run(&mut self, goal: &str) -> Result<SessionState, StageError> {
        let state = SessionState::new(goal);
        if goal.trim().is_empty() {
            let err = error::blank_argument("goal").with_operation("controller::run");
            return Err(StageError::new(None, state, err));
        }

        tracing::info!(goal = %goal, "starting run");
        let mut state = state;
        while !state.is_complete() {
            state = self.step(state).await?;
        }
        tracing::info!("run complete");
        Ok(state)
    }

    /// Run the next pending stage of `state`.
    ///
    /// The reply is written to the log before it is placed in the returned
    /// state. A complete state comes back unchanged.
    pub async fn step(&mut self, state: SessionState) -> Result<SessionState, StageError> {
        let agent = match state.next_stage() {
            Some(agent) => agent,
            None => return Ok(state),
        };
        let input = state.input_for(agent).unwrap_or_default().to_string();

        if let Some(callback) = &self.on_stage {
            callback(agent);
        }

        let output = match self.runner.run_role(agent, &input).await {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(agent = %agent, error = %err, "stage failed");
                let err = err.with_operation("controller::step");
                return Err(StageError::new(Some(agent), state, err));
            }
        };

        if let Err(err) = self.log.append(agent, &state.goal, &output) {
            tracing::warn!(agent = %agent, error = %err, "could not store reply");
            let err = err.with_operation("controller::step");
            return Err(StageError::new(Some(agent), state, err));
        }

        Ok(state.with_output(agent, output))
    }
}
