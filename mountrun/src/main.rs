use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use mountrun::args::Cli;
use mountrun::{Controller, OverlayService, STARTUP_FAILED};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn launch(cli: Cli) -> Result<i32> {
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "mountrun".to_string());
    let config = cli.into_config(program);
    config.prepare()?;
    let mut action = config.action()?;

    let service = Arc::new(OverlayService::new(&config.upper_dir, config.privileged));
    let mut controller = Controller::new(service, config.budget);
    match controller.run(config.service_args(), &mut action) {
        Ok(code) => Ok(code),
        Err(startup_error) => {
            eprintln!("{startup_error}");
            Ok(startup_error.exit_code())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match launch(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{e:?}");
            std::process::exit(STARTUP_FAILED);
        }
    }
}
