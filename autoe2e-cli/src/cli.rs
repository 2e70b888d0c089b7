//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no side effects or I/O happen here.

use std::path::PathBuf;

use autoe2e_core::config::ALL_SUITES;
use autoe2e_environment::BackendKind;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// autoe2e -- one-command end-to-end test runs against containerized environments.
///
/// Use `autoe2e <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "autoe2e", version, about, long_about = None)]
pub struct Cli {
    /// Log level filter (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Log line format, written to stderr.
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Output format for command results on stdout.
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Environment backend.
    #[arg(long, global = true, value_enum, default_value = "compose")]
    pub backend: BackendArg,

    /// Playbook directory for the ansible backend (relative to the spec file).
    #[arg(long, global = true, default_value = "playbooks")]
    pub playbooks_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

/// Supported log formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable multi-line logs.
    Pretty,
    /// JSON lines.
    Json,
}

/// Environment backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Invoke `docker compose` directly.
    Compose,
    /// Run the `ansible-playbook` playbooks.
    Ansible,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Compose => BackendKind::Compose,
            BackendArg::Ansible => BackendKind::Ansible,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the environment and wait for readiness.
    Up(UpArgs),

    /// Run the test suite against an already running environment.
    Test(TestArgs),

    /// Tear down the environment of a run.
    Down(DownArgs),

    /// Full workflow: up, wait, test, collect, summarize, down.
    Run(RunArgs),

    /// Show container states of a run.
    Status(StatusArgs),

    /// Show container logs of a run.
    Logs(LogsArgs),
}

/// The spec file shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct SpecArgs {
    /// Path to the spec file (.yml, .yaml or .toml).
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,
}

// ---- up ----

#[derive(Args, Debug)]
pub struct UpArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    /// Readiness timeout in seconds (overrides the spec).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Readiness poll interval in seconds (overrides the spec).
    #[arg(long)]
    pub interval: Option<u64>,
}

// ---- test ----

#[derive(Args, Debug)]
pub struct TestArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    /// Suite name: a key of the spec's `suites` table, a marker expression, or `all`.
    #[arg(long, default_value = ALL_SUITES)]
    pub suite: String,

    /// Number of parallel test workers.
    #[arg(short = 'n', long = "parallel")]
    pub parallel: Option<u32>,

    /// Artifacts directory (default: `artifacts/<run_id>`).
    #[arg(long)]
    pub artifacts_dir: Option<PathBuf>,
}

// ---- down ----

#[derive(Args, Debug)]
pub struct DownArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    /// Run ID printed by `autoe2e up` or `autoe2e run`.
    #[arg(long, env = "AUTOE2E_RUN_ID")]
    pub run_id: String,

    /// Keep named volumes.
    #[arg(long)]
    pub keep_volumes: bool,
}

// ---- run ----

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    /// Suite name: a key of the spec's `suites` table, a marker expression, or `all`.
    #[arg(long, default_value = ALL_SUITES)]
    pub suite: String,

    /// Number of parallel test workers.
    #[arg(short = 'n', long = "parallel")]
    pub parallel: Option<u32>,

    /// Artifacts directory (default: `artifacts/<run_id>`).
    #[arg(long)]
    pub artifacts_dir: Option<PathBuf>,

    /// Readiness timeout in seconds (overrides the spec).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Readiness poll interval in seconds (overrides the spec).
    #[arg(long)]
    pub interval: Option<u64>,

    /// Keep the environment running when tests fail.
    #[arg(long)]
    pub keep_on_fail: bool,
}

// ---- status ----

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    /// Run ID printed by `autoe2e up` or `autoe2e run`.
    #[arg(long, env = "AUTOE2E_RUN_ID")]
    pub run_id: Option<String>,
}

// ---- logs ----

#[derive(Args, Debug)]
pub struct LogsArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    /// Run ID printed by `autoe2e up` or `autoe2e run`.
    #[arg(long, env = "AUTOE2E_RUN_ID")]
    pub run_id: Option<String>,

    /// Only show logs of this service.
    #[arg(long)]
    pub service: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse_run_defaults() {
        let cli = Cli::try_parse_from(["autoe2e", "run", "-f", "autoe2e.yml"])
            .expect("should parse 'run'");
        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.output, OutputFormat::Text);
        assert_eq!(cli.log_format, LogFormat::Pretty);
        assert_eq!(cli.backend, BackendArg::Compose);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.spec.file, PathBuf::from("autoe2e.yml"));
                assert_eq!(args.suite, "all");
                assert!(args.parallel.is_none());
                assert!(args.artifacts_dir.is_none());
                assert!(args.timeout.is_none());
                assert!(!args.keep_on_fail, "keep_on_fail should default to false");
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_all_flags() {
        let cli = Cli::try_parse_from([
            "autoe2e",
            "run",
            "-f",
            "spec.toml",
            "--suite",
            "smoke",
            "-n",
            "4",
            "--artifacts-dir",
            "out",
            "--timeout",
            "60",
            "--interval",
            "2",
            "--keep-on-fail",
        ])
        .expect("should parse run with all flags");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.suite, "smoke");
                assert_eq!(args.parallel, Some(4));
                assert_eq!(args.artifacts_dir, Some(PathBuf::from("out")));
                assert_eq!(args.timeout, Some(60));
                assert_eq!(args.interval, Some(2));
                assert!(args.keep_on_fail);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "autoe2e",
            "up",
            "-f",
            "spec.yml",
            "--backend",
            "ansible",
            "--output",
            "json",
            "--log-format",
            "json",
        ])
        .expect("global flags should be accepted after the subcommand");
        assert_eq!(cli.backend, BackendArg::Ansible);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(BackendKind::from(cli.backend), BackendKind::Ansible);
    }

    #[test]
    fn test_cli_parse_down_requires_run_id() {
        // SAFETY: no other test in this crate reads or writes AUTOE2E_RUN_ID.
        unsafe { std::env::remove_var("AUTOE2E_RUN_ID") };
        let result = Cli::try_parse_from(["autoe2e", "down", "-f", "spec.yml"]);
        assert!(result.is_err(), "down without --run-id should fail");
    }

    #[test]
    fn test_cli_parse_down_keep_volumes() {
        let cli = Cli::try_parse_from([
            "autoe2e",
            "down",
            "-f",
            "spec.yml",
            "--run-id",
            "3f2a9c1b7d4e",
            "--keep-volumes",
        ])
        .expect("should parse down");
        match cli.command {
            Commands::Down(args) => {
                assert_eq!(args.run_id, "3f2a9c1b7d4e");
                assert!(args.keep_volumes);
            }
            _ => panic!("expected Down command"),
        }
    }

    #[test]
    fn test_cli_parse_logs_service() {
        let cli = Cli::try_parse_from([
            "autoe2e",
            "logs",
            "-f",
            "spec.yml",
            "--run-id",
            "3f2a9c1b7d4e",
            "--service",
            "api",
        ])
        .expect("should parse logs");
        match cli.command {
            Commands::Logs(args) => {
                assert_eq!(args.run_id.as_deref(), Some("3f2a9c1b7d4e"));
                assert_eq!(args.service.as_deref(), Some("api"));
            }
            _ => panic!("expected Logs command"),
        }
    }

    #[test]
    fn test_cli_parse_missing_spec_file_fails() {
        let result = Cli::try_parse_from(["autoe2e", "status"]);
        assert!(result.is_err(), "-f is required");
    }

    #[test]
    fn test_cli_parse_unknown_backend_fails() {
        let result =
            Cli::try_parse_from(["autoe2e", "up", "-f", "spec.yml", "--backend", "podman"]);
        assert!(result.is_err(), "unknown backend should be rejected");
    }
}
