//! `autoe2e down` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use autoe2e_environment::{EnvironmentBackend, EnvironmentSpec};

use crate::cli::DownArgs;
use crate::commands::{BackendOptions, LoadedSpec, build_backend, load_spec, require_run_id};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `down` command.
///
/// Safe to repeat: an environment that is already gone counts as success.
pub async fn execute(
    args: DownArgs,
    options: &BackendOptions,
    writer: &OutputWriter,
) -> Result<i32, CliError> {
    let run_id = require_run_id(Some(args.run_id.as_str()))?;
    let LoadedSpec { config, base_dir } = load_spec(&args.spec).await?;

    let env = EnvironmentSpec::from_config(&config, run_id);
    let backend = build_backend(options, &base_dir)?;
    let remove_volumes = !args.keep_volumes;

    info!(run_id = %env.run_id, backend = backend.name(), remove_volumes, "tearing down environment");
    let exit_code = backend.down(&env, remove_volumes).await?;

    let report = DownReport {
        run_id: env.run_id.to_string(),
        project: env.project_name(),
        remove_volumes,
        exit_code,
    };
    writer.render(&report)?;

    Ok(if exit_code == 0 { 0 } else { 1 })
}

#[derive(Serialize)]
pub struct DownReport {
    pub run_id: String,
    pub project: String,
    pub remove_volumes: bool,
    pub exit_code: i32,
}

impl Render for DownReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.exit_code == 0 {
            writeln!(w, "Environment {} removed", self.project.bold())?;
        } else {
            writeln!(
                w,
                "Teardown of {} reported exit code {}",
                self.project.bold(),
                self.exit_code.to_string().yellow()
            )?;
        }
        if !self.remove_volumes {
            writeln!(w, "  {}", "volumes kept".dimmed())?;
        }
        Ok(())
    }
}
