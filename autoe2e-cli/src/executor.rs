//! Test execution engine invocation
//!
//! The engine (pytest by default) is an external process. The executor
//! builds its command line from the spec, exports `API_BASE_URL`, and
//! passes the engine's exit code through unmodified.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use autoe2e_core::config::SpecConfig;
use autoe2e_core::error::{AutoE2eError, ConfigError};
use autoe2e_core::process::{CommandRunner, CommandSpec};

/// Environment variable carrying the target base URL to the engine.
pub const BASE_URL_ENV: &str = "API_BASE_URL";

/// Runs a test suite and reports the engine's exit code.
pub trait TestRunner: Send + Sync + 'static {
    /// Runs `suite`, writing structured results to `results_path`.
    ///
    /// A non-zero engine exit is `Ok(code)`; `Err` means the engine could
    /// not be started at all.
    fn run(
        &self,
        suite: &str,
        parallel: Option<u32>,
        results_path: &Path,
    ) -> impl Future<Output = Result<i32, AutoE2eError>> + Send;
}

/// Engine-invoking [`TestRunner`].
pub struct TestExecutor<R: CommandRunner> {
    runner: Arc<R>,
    config: SpecConfig,
    work_dir: PathBuf,
}

impl<R: CommandRunner> TestExecutor<R> {
    /// `work_dir` is the engine's working directory; `test_path` is relative to it.
    pub fn new(runner: Arc<R>, config: &SpecConfig, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            config: config.clone(),
            work_dir: work_dir.into(),
        }
    }

    /// `<test_command> <test_path> -v [-m <marker>] [-n <N>] --junit-xml <results_path>`
    pub fn command(
        &self,
        suite: &str,
        parallel: Option<u32>,
        results_path: &Path,
    ) -> Result<CommandSpec, ConfigError> {
        let (program, leading) =
            self.config
                .test_command
                .split_first()
                .ok_or_else(|| ConfigError::InvalidValue {
                    field: "test_command".to_owned(),
                    reason: "must not be empty".to_owned(),
                })?;

        let mut spec = CommandSpec::new(program)
            .args(leading)
            .arg(&self.config.test_path)
            .arg("-v");
        if let Some(marker) = self.config.suite_marker(suite) {
            spec = spec.arg("-m").arg(marker);
        }
        if let Some(workers) = parallel.filter(|n| *n > 1) {
            spec = spec.arg("-n").arg(workers.to_string());
        }
        Ok(spec
            .arg("--junit-xml")
            .arg(results_path.display().to_string())
            .env(BASE_URL_ENV, &self.config.base_url)
            .current_dir(&self.work_dir))
    }
}

impl<R: CommandRunner> TestRunner for TestExecutor<R> {
    async fn run(
        &self,
        suite: &str,
        parallel: Option<u32>,
        results_path: &Path,
    ) -> Result<i32, AutoE2eError> {
        // the engine runs in `work_dir`, not the caller's cwd
        let results_path = std::path::absolute(results_path)?;
        if let Some(parent) = results_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let spec = self.command(suite, parallel, &results_path)?;
        info!(suite, command = %spec, "running test suite");
        let output = self.runner.run(&spec).await?;
        info!(suite, exit_code = output.exit_code, "test suite finished");
        Ok(output.exit_code)
    }
}
