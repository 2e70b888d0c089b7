//! `autoe2e up` command handler

use std::io::Write;

use serde::Serialize;
use tracing::{error, info};

use autoe2e_core::types::{RunExitCode, RunId};
use autoe2e_environment::{EnvironmentBackend, EnvironmentSpec};
use autoe2e_readiness::{NetworkProbe, ReadinessPoller};

use crate::cli::UpArgs;
use crate::commands::{BackendOptions, LoadedSpec, apply_overrides, build_backend, load_spec};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `up` command.
///
/// Starts the environment under a fresh run ID and waits for readiness.
/// The environment is left running either way; `down --run-id` removes it.
pub async fn execute(
    args: UpArgs,
    options: &BackendOptions,
    writer: &OutputWriter,
) -> Result<i32, CliError> {
    let LoadedSpec {
        mut config,
        base_dir,
    } = load_spec(&args.spec).await?;
    apply_overrides(&mut config, args.timeout, args.interval)?;

    let run_id = RunId::generate();
    let env = EnvironmentSpec::from_config(&config, run_id.clone());
    let backend = build_backend(options, &base_dir)?;
    info!(run_id = %run_id, backend = backend.name(), "starting environment");

    let up_exit = match backend.up(&env).await {
        Ok(code) => Some(code),
        Err(e) => {
            error!(run_id = %run_id, error = %e, "environment start failed");
            None
        }
    };

    let ready = if up_exit == Some(0) {
        let poller = ReadinessPoller::new(NetworkProbe::new()?);
        poller
            .wait_ready(&env.health_checks, env.timeout, config.poll_interval_duration())
            .await
    } else {
        false
    };

    let exit_code = if ready {
        RunExitCode::Success
    } else {
        RunExitCode::EnvironmentFailure
    };

    let report = UpReport {
        run_id: run_id.to_string(),
        project: env.project_name(),
        backend: backend.kind().to_string(),
        spec_file: args.spec.file.display().to_string(),
        up_exit,
        ready,
        exit_code,
    };
    writer.render(&report)?;

    Ok(exit_code.code())
}

#[derive(Serialize)]
pub struct UpReport {
    pub run_id: String,
    pub project: String,
    pub backend: String,
    pub spec_file: String,
    pub up_exit: Option<i32>,
    pub ready: bool,
    pub exit_code: RunExitCode,
}

impl Render for UpReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Run ID:   {}", self.run_id.bold())?;
        writeln!(w, "Project:  {}", self.project)?;
        writeln!(w, "Backend:  {}", self.backend)?;

        if self.ready {
            writeln!(w, "Status:   {}", "READY".green().bold())?;
        } else {
            let reason = match self.up_exit {
                Some(0) => "readiness timeout".to_owned(),
                Some(code) => format!("start exited with {code}"),
                None => "start could not be invoked".to_owned(),
            };
            writeln!(w, "Status:   {} ({})", "NOT READY".red().bold(), reason)?;
        }

        writeln!(w)?;
        writeln!(
            w,
            "Tear down with: autoe2e down -f {} --run-id {}",
            self.spec_file, self.run_id
        )?;
        Ok(())
    }
}
