use std::process::ExitCode;

use clap::Parser;

use autoe2e_cli::cli::Cli;
use autoe2e_cli::commands;
use autoe2e_cli::logging;
use autoe2e_cli::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_tracing(&cli.log_level, cli.log_format) {
        eprintln!("error: {e:#}");
        return ExitCode::from(1);
    }

    let writer = OutputWriter::new(cli.output);
    match commands::dispatch(cli, &writer).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}
