//! `autoe2e run` command handler

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use autoe2e_core::process::SystemCommandRunner;
use autoe2e_core::types::RunId;
use autoe2e_environment::EnvironmentSpec;
use autoe2e_readiness::{NetworkProbe, ReadinessPoller};

use crate::cli::RunArgs;
use crate::commands::{
    BackendOptions, LoadedSpec, apply_overrides, artifacts_layout, build_backend, load_spec,
};
use crate::error::CliError;
use crate::executor::TestExecutor;
use crate::output::{OutputWriter, Render};
use crate::workflow::{RunOutcome, WorkflowBuilder};

/// Execute the `run` command: the full workflow under a fresh run ID.
pub async fn execute(
    args: RunArgs,
    options: &BackendOptions,
    writer: &OutputWriter,
) -> Result<i32, CliError> {
    let LoadedSpec {
        mut config,
        base_dir,
    } = load_spec(&args.spec).await?;
    apply_overrides(&mut config, args.timeout, args.interval)?;

    let run_id = RunId::generate();
    let layout = artifacts_layout(args.artifacts_dir.as_deref(), &run_id)?;
    let artifacts_dir = layout.root().to_path_buf();
    let env = EnvironmentSpec::from_config(&config, run_id);
    let project = env.project_name();

    let workflow = WorkflowBuilder::new(env, layout)
        .backend(build_backend(options, &base_dir)?)
        .test_runner(TestExecutor::new(
            Arc::new(SystemCommandRunner),
            &config,
            &base_dir,
        ))
        .poller(ReadinessPoller::new(NetworkProbe::new()?))
        .policy(config.artifacts.clone())
        .selection(config.service_selection())
        .suite(args.suite)
        .parallel(args.parallel)
        .interval(config.poll_interval_duration())
        .keep_on_fail(args.keep_on_fail)
        .build()?;

    let outcome = workflow.run().await;
    let exit_code = outcome.exit_code.code();

    writer.render(&RunReport {
        project,
        artifacts_dir,
        outcome,
    })?;

    Ok(exit_code)
}

#[derive(Serialize)]
pub struct RunReport {
    pub project: String,
    pub artifacts_dir: PathBuf,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

fn seconds(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_owned(), |s| format!("{s:.1}s"))
}

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let outcome = &self.outcome;
        let summary = &outcome.summary;

        writeln!(w, "Run: {} ({})", summary.run_id.as_str().bold(), self.project)?;
        let phases: Vec<String> = outcome.phases.iter().map(ToString::to_string).collect();
        writeln!(w, "Phases: {}", phases.join(" -> ").dimmed())?;
        writeln!(
            w,
            "Environment bring-up: {}",
            seconds(summary.environment_bring_up_time_seconds)
        )?;
        writeln!(w, "Test runtime: {}", seconds(summary.test_runtime_seconds))?;
        writeln!(
            w,
            "Tests: {} total, {} passed, {} failed",
            summary.total_tests,
            summary.passed.to_string().green(),
            summary.failed.to_string().red()
        )?;
        for failure in &summary.failures {
            writeln!(w, "  {} {}: {}", "FAIL".red(), failure.name, failure.reason)?;
        }

        match &outcome.collection {
            Some(report) if report.is_complete() => {
                writeln!(w, "Artifacts: {} files collected", report.written.len())?;
            }
            Some(report) => {
                writeln!(
                    w,
                    "Artifacts: {} files collected, {} steps {}",
                    report.written.len(),
                    report.failures.len(),
                    "failed".yellow()
                )?;
            }
            None => writeln!(w, "Artifacts: not collected")?,
        }
        match &outcome.summary_path {
            Some(path) => writeln!(w, "Summary: {}", path.display())?,
            None => writeln!(w, "Summary: {}", "not written".red())?,
        }

        if outcome.retained {
            writeln!(
                w,
                "Environment kept: autoe2e down -f <spec> --run-id {}",
                summary.run_id
            )?;
        } else {
            match outcome.teardown_exit {
                Some(0) => writeln!(w, "Teardown: done")?,
                Some(code) => writeln!(w, "Teardown: exit code {}", code.to_string().yellow())?,
                None => writeln!(w, "Teardown: {}", "failed".yellow())?,
            }
        }

        writeln!(w, "{}", "=".repeat(50))?;
        if outcome.exit_code.is_success() {
            writeln!(w, "{}", "E2E run completed successfully".green().bold())?;
        } else {
            writeln!(
                w,
                "{}",
                format!("E2E run failed (exit code: {})", outcome.exit_code)
                    .red()
                    .bold()
            )?;
        }
        writeln!(w, "Artifacts: {}", self.artifacts_dir.display())?;
        Ok(())
    }
}
