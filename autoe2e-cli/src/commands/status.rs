//! `autoe2e status` command handler

use std::io::Write;

use serde::Serialize;

use autoe2e_environment::{EnvironmentBackend, EnvironmentSpec};

use crate::cli::StatusArgs;
use crate::commands::{BackendOptions, LoadedSpec, build_backend, load_spec, require_run_id};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `status` command.
pub async fn execute(
    args: StatusArgs,
    options: &BackendOptions,
    writer: &OutputWriter,
) -> Result<i32, CliError> {
    let run_id = require_run_id(args.run_id.as_deref())?;
    let LoadedSpec { config, base_dir } = load_spec(&args.spec).await?;

    let env = EnvironmentSpec::from_config(&config, run_id);
    let backend = build_backend(options, &base_dir)?;
    let containers = backend.status(&env).await?;

    let report = StatusReport {
        run_id: env.run_id.to_string(),
        project: env.project_name(),
        backend: backend.kind().to_string(),
        containers,
    };
    writer.render(&report)?;
    Ok(0)
}

#[derive(Serialize)]
pub struct StatusReport {
    pub run_id: String,
    pub project: String,
    pub backend: String,
    /// Backend-rendered container listing.
    pub containers: String,
}

impl Render for StatusReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Project: {} ({})", self.project.bold(), self.backend)?;
        writeln!(w)?;
        write!(w, "{}", self.containers)?;
        if !self.containers.ends_with('\n') {
            writeln!(w)?;
        }
        Ok(())
    }
}
