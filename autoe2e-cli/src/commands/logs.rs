//! `autoe2e logs` command handler

use std::io::Write;

use serde::Serialize;

use autoe2e_environment::{EnvironmentBackend, EnvironmentSpec};

use crate::cli::LogsArgs;
use crate::commands::{BackendOptions, LoadedSpec, build_backend, load_spec, require_run_id};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `logs` command.
pub async fn execute(
    args: LogsArgs,
    options: &BackendOptions,
    writer: &OutputWriter,
) -> Result<i32, CliError> {
    let run_id = require_run_id(args.run_id.as_deref())?;
    let LoadedSpec { config, base_dir } = load_spec(&args.spec).await?;

    let env = EnvironmentSpec::from_config(&config, run_id);
    let backend = build_backend(options, &base_dir)?;
    let logs = backend.logs(&env, args.service.as_deref()).await?;

    writer.render(&LogsReport {
        run_id: env.run_id.to_string(),
        service: args.service,
        logs,
    })?;
    Ok(0)
}

#[derive(Serialize)]
pub struct LogsReport {
    pub run_id: String,
    pub service: Option<String>,
    pub logs: String,
}

impl Render for LogsReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        // raw passthrough, no decoration
        w.write_all(self.logs.as_bytes())
    }
}
