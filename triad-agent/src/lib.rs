//! # Triad Agent
//!
//! The session controller runs the fixed three-agent chain:
//! 1. PlannerAgent breaks the user's goal into steps
//! 2. ContextAgent adds background knowledge to the plan
//! 3. CoderAgent writes or explains code from that context
//!
//! Each reply is stored in the interaction log before the next agent is
//! asked. A failure stops the chain and hands back what was produced so far.

mod controller;

pub use controller::{SessionController, StageError};
