//! Application initialization and configuration

use anyhow::{Context, Result};
use log::{debug, LevelFilter};
use std::str::FromStr;

use crate::{cli, config, logging};

pub fn load_configuration(args: &cli::Args) -> Result<config::ConfigManager> {
    let mut manager = match &args.config_file {
        Some(config_file) => {
            debug!("Loading configuration from explicit file: {}", config_file.display());
            config::ConfigManager::load_from_file(config_file.clone())?
        }
        None => config::ConfigManager::load()?,
    };
    if let Some(section_name) = &args.config_name {
        manager.select_section(section_name.clone());
    }
    Ok(manager)
}

/// Log settings from flags, falling back to the `base` section
pub fn configure_logging(args: &cli::Args, config: &config::ConfigManager) -> Result<logging::LogConfig> {
    let console_level = if args.debug {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Error
    } else {
        config.get_log_level("base", "console-level")?.unwrap_or(LevelFilter::Info)
    };

    let format = if args.log_format != "text" {
        logging::LogFormat::from_str(&args.log_format).map_err(|e| anyhow::anyhow!(e))?
    } else {
        match config.get_value("base", "log-format") {
            Some(format) => logging::LogFormat::from_str(format).map_err(|e| anyhow::anyhow!(e))?,
            None => logging::LogFormat::Text,
        }
    };

    let log_file = args.log_file.clone().or_else(|| config.get_path("base", "log-file"));
    let file_level = match &args.log_file_level {
        Some(level) => Some(logging::parse_log_level(level)?),
        None => config.get_log_level("base", "file-log-level")?,
    };

    let (destination, file_level) = match log_file {
        Some(path) => {
            let level = file_level.unwrap_or(console_level);
            debug!("File logging enabled: {} (level: {:?})", path.display(), level);
            (logging::LogDestination::Both(path), Some(level))
        }
        None => (logging::LogDestination::Console, None),
    };

    Ok(logging::LogConfig {
        console_level,
        file_level,
        format,
        destination,
    })
}

/// Configuration file settings with command line overrides applied
pub fn verifier_config(args: &cli::Args, manager: &config::ConfigManager) -> Result<config::VerifierConfig> {
    let mut config = manager
        .get_verifier_config()
        .context("Invalid verifier configuration")?;

    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(quota) = args.disk_quota {
        config.disk_quota_bytes = quota;
    }
    if let Some(dir) = &args.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    if let Some(path) = &args.documented_problems {
        config.documented_problems = Some(path.clone());
    }
    config.external_prefixes.extend(args.external_prefixes.iter().cloned());

    config.validate()?;
    debug!("Verifier configuration: {:?}", config);
    Ok(config)
}
