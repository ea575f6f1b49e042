//! arca-lcpctl entry point.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};

use arca_lcpctl::{error_action, resolve_config, run, Cli};

/// Initialize tracing/logging. `RUST_LOG` overrides the configured level.
fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(io::stderr)
                .compact(),
        )
        .init();
}

fn execute(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    init_logging(&config.logging.level);
    debug!(
        config = %cli.config.display(),
        mapping_path = %config.persistence.mapping_path.display(),
        "Configuration loaded"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli, &config, &mut out)?;
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "arca-lcpctl failed");
            eprintln!("arca-lcpctl: {:#}", e);
            if let Some(action) = error_action(&e) {
                eprintln!("hint: {}", action);
            }
            ExitCode::FAILURE
        }
    }
}
