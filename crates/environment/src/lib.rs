#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`EnvironmentError`)
//! - [`backend`]: The `EnvironmentBackend` contract, `EnvironmentSpec`, runtime `Backend`
//! - [`compose`]: `docker compose` backend and command builder
//! - [`ansible`]: `ansible-playbook` backend
//! - [`docker`]: Docker Engine API abstraction (`DockerClient`, `BollardDockerClient`)
//! - [`collect`]: Artifact collection report and metadata

pub mod ansible;
pub mod backend;
pub mod collect;
pub mod compose;
pub mod docker;
pub mod error;

#[cfg(test)]
mod testing;

// --- Public API Re-exports ---

pub use ansible::AnsibleBackend;
pub use backend::{Backend, BackendKind, EnvironmentBackend, EnvironmentSpec, PathResolver};
pub use collect::{CollectionFailure, CollectionReport, EnvironmentMetadata};
pub use compose::{ComposeBackend, ComposeCommand};
pub use docker::{BollardDockerClient, ContainerState, DockerClient};
pub use error::EnvironmentError;
