use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::io;
use taskpay::interfaces::cli::{Cli, run};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli, &mut out).await.into_diagnostic()?;

    Ok(())
}
