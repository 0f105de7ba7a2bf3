use anyhow::Result;
use log::error;
use std::process;

use plugin_verifier::{app, cli, logging};

/// Exit status when at least one plugin failed verification
const EXIT_FAILURES: i32 = 2;

fn main() {
    logging::install_panic_hook();

    match run() {
        Ok(true) => process::exit(EXIT_FAILURES),
        Ok(false) => {}
        Err(e) => {
            error!("Application error: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run() -> Result<bool> {
    let args = cli::args::parse_args();
    cli::args::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;
    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;

    let no_color = args.no_color || config_manager.get_bool("base", "no-color")?.unwrap_or(false);
    if no_color {
        colored::control::set_override(false);
    }

    let config = app::verifier_config(&args, &config_manager)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(app::run_verification(args, config))
}
