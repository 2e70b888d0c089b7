#![doc = include_str!("../README.md")]

pub mod cli;
pub mod commands;
pub mod error;
pub mod executor;
pub mod logging;
pub mod output;
pub mod workflow;

pub use error::CliError;
pub use executor::{TestExecutor, TestRunner};
pub use workflow::{RunOutcome, RunPhase, Workflow, WorkflowBuilder};
