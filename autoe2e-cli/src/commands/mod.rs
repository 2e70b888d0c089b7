//! Command handlers -- one module per subcommand
//!
//! Every handler returns the process exit code on success. A `CliError`
//! means the command could not produce an outcome at all.

pub mod down;
pub mod logs;
pub mod run;
pub mod status;
pub mod up;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use autoe2e_core::artifacts::ArtifactLayout;
use autoe2e_core::config::SpecConfig;
use autoe2e_core::process::SystemCommandRunner;
use autoe2e_core::types::RunId;
use autoe2e_environment::{
    AnsibleBackend, Backend, BackendKind, BollardDockerClient, ComposeBackend,
};

use crate::cli::{Cli, Commands, SpecArgs};
use crate::error::CliError;
use crate::output::OutputWriter;

/// Backend wired to real processes and the local Docker engine.
pub type SystemBackend = Backend<SystemCommandRunner, BollardDockerClient>;

/// Backend selection taken from the global flags.
#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub kind: BackendKind,
    pub playbooks_dir: PathBuf,
}

/// A validated spec and the directory its relative paths resolve against.
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    pub config: SpecConfig,
    pub base_dir: PathBuf,
}

/// Dispatch a parsed command line to its handler.
pub async fn dispatch(cli: Cli, writer: &OutputWriter) -> Result<i32, CliError> {
    let backend = BackendOptions {
        kind: cli.backend.into(),
        playbooks_dir: cli.playbooks_dir,
    };

    match cli.command {
        Commands::Up(args) => up::execute(args, &backend, writer).await,
        Commands::Test(args) => test::execute(args, writer).await,
        Commands::Down(args) => down::execute(args, &backend, writer).await,
        Commands::Run(args) => run::execute(args, &backend, writer).await,
        Commands::Status(args) => status::execute(args, &backend, writer).await,
        Commands::Logs(args) => logs::execute(args, &backend, writer).await,
    }
}

/// Load, override and validate the spec file.
pub async fn load_spec(spec: &SpecArgs) -> Result<LoadedSpec, CliError> {
    let config = SpecConfig::load(&spec.file).await?;
    let base_dir = std::path::absolute(spec_base_dir(&spec.file))?;
    debug!(
        spec = %spec.file.display(),
        base_dir = %base_dir.display(),
        "spec file loaded"
    );
    Ok(LoadedSpec { config, base_dir })
}

/// Directory containing the spec file (`.` for a bare file name).
pub fn spec_base_dir(spec_file: &Path) -> PathBuf {
    match spec_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Apply `--timeout` / `--interval` and re-validate.
pub fn apply_overrides(
    config: &mut SpecConfig,
    timeout: Option<u64>,
    interval: Option<u64>,
) -> Result<(), CliError> {
    if let Some(timeout) = timeout {
        config.timeout = timeout;
    }
    if let Some(interval) = interval {
        config.poll_interval = interval;
    }
    config.validate()?;
    Ok(())
}

/// Build the selected backend rooted at `base_dir`.
pub fn build_backend(options: &BackendOptions, base_dir: &Path) -> Result<SystemBackend, CliError> {
    let runner = Arc::new(SystemCommandRunner);
    let backend = match options.kind {
        BackendKind::Compose => {
            let docker = Arc::new(BollardDockerClient::connect_local()?);
            Backend::Compose(ComposeBackend::new(runner, docker, base_dir)?)
        }
        BackendKind::Ansible => {
            Backend::Ansible(AnsibleBackend::new(runner, &options.playbooks_dir, base_dir)?)
        }
    };
    Ok(backend)
}

/// `--artifacts-dir`, or `artifacts/<run_id>` under the current directory.
pub fn artifacts_layout(dir: Option<&Path>, run_id: &RunId) -> Result<ArtifactLayout, CliError> {
    let layout = match dir {
        Some(dir) => ArtifactLayout::new(std::path::absolute(dir)?),
        None => ArtifactLayout::for_run(&std::env::current_dir()?, run_id),
    };
    Ok(layout)
}

/// Parse an optional `--run-id`.
pub fn require_run_id(raw: Option<&str>) -> Result<RunId, CliError> {
    let raw = raw.ok_or_else(|| {
        CliError::Config("no run id given: pass --run-id or set AUTOE2E_RUN_ID".to_owned())
    })?;
    Ok(RunId::parse(raw)?)
}
