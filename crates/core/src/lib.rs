#![doc = include_str!("../README.md")]

pub mod artifacts;
pub mod config;
pub mod error;
pub mod process;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{AutoE2eError, ConfigError, ProcessError};

// 설정
pub use config::{ArtifactPolicy, CollectMode, ServiceSelection, SpecConfig, SpecFormat};

// 아티팩트
pub use artifacts::ArtifactLayout;

// 외부 프로세스
pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemCommandRunner};

// 도메인 타입
pub use types::{HealthCheckSpec, RunContext, RunExitCode, RunId};
