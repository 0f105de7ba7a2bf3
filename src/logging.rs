// Logging for plugin-verifier
//
// A `log::Log` implementation writing text or JSON lines to the console,
// a file, or both, each destination with its own level. Verification runs
// on many worker threads at once, so every line also carries the name of
// the thread that produced it.
//
// Example usage:
// ```
// let config = LogConfig {
//     console_level: LevelFilter::Info,
//     file_level: Some(LevelFilter::Debug),
//     format: LogFormat::Json,
//     destination: LogDestination::Both(PathBuf::from("verifier.log")),
// };
// init_logger(config)?;
// log::info!("Verifier started");
// ```

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::{Level, LevelFilter};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}. Valid options: text, json", s)),
        }
    }
}

/// Log destination options
#[derive(Debug, Clone, PartialEq)]
pub enum LogDestination {
    Console,
    File(PathBuf),
    Both(PathBuf),
}

impl LogDestination {
    fn file(&self) -> Option<&Path> {
        match self {
            LogDestination::Console => None,
            LogDestination::File(path) | LogDestination::Both(path) => Some(path),
        }
    }

    fn console(&self) -> bool {
        match self {
            LogDestination::Console | LogDestination::Both(_) => true,
            LogDestination::File(_) => false,
        }
    }
}

/// JSON log line
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub console_level: LevelFilter,
    pub file_level: Option<LevelFilter>,
    pub format: LogFormat,
    pub destination: LogDestination,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::Info,
            file_level: None,
            format: LogFormat::Text,
            destination: LogDestination::Console,
        }
    }
}

impl LogConfig {
    /// Most verbose level any destination accepts
    pub fn max_level(&self) -> LevelFilter {
        let console = if self.destination.console() {
            self.console_level
        } else {
            LevelFilter::Off
        };
        match (self.destination.file(), self.file_level) {
            (Some(_), Some(file_level)) => console.max(file_level),
            _ => console,
        }
    }
}

pub struct VerifierLogger {
    config: LogConfig,
    file: Mutex<Option<File>>,
}

impl VerifierLogger {
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            file: Mutex::new(None),
        }
    }

    fn format_timestamp() -> String {
        let now: DateTime<Local> = Local::now();
        now.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn format_text(&self, level: Level, target: &str, message: &str) -> String {
        let thread = std::thread::current();
        match thread.name() {
            Some(name) => format!(
                "{} [{}] {} ({}) {}",
                Self::format_timestamp(),
                level.to_string().to_uppercase(),
                target,
                name,
                message
            ),
            None => format!(
                "{} [{}] {} {}",
                Self::format_timestamp(),
                level.to_string().to_uppercase(),
                target,
                message
            ),
        }
    }

    fn format_json(&self, level: Level, target: &str, message: &str) -> Result<String> {
        let entry = JsonLogEntry {
            timestamp: Self::format_timestamp(),
            level: level.to_string().to_uppercase(),
            target: target.to_string(),
            thread: std::thread::current().name().map(str::to_string),
            message: message.to_string(),
        };
        serde_json::to_string(&entry).context("Failed to serialize log entry to JSON")
    }

    fn console_accepts(&self, level: Level) -> bool {
        self.config.destination.console() && level <= self.config.console_level
    }

    fn file_accepts(&self, level: Level) -> bool {
        self.config.destination.file().is_some() && self.config.file_level.is_some_and(|file_level| level <= file_level)
    }

    fn write_to_console(&self, line: &str) -> Result<()> {
        writeln!(io::stderr(), "{}", line).context("Failed to write to console")
    }

    fn write_to_file(&self, line: &str, path: &Path) -> Result<()> {
        let mut file = self.file.lock();
        if file.is_none() {
            let opened = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            *file = Some(opened);
        }
        match file.as_mut() {
            Some(file) => writeln!(file, "{}", line).context("Failed to write to log file"),
            None => Ok(()),
        }
    }
}

impl log::Log for VerifierLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.console_accepts(metadata.level()) || self.file_accepts(metadata.level())
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = record.level();
        let message = record.args().to_string();
        let line = match self.config.format {
            LogFormat::Text => self.format_text(level, record.target(), &message),
            LogFormat::Json => self.format_json(level, record.target(), &message).unwrap_or_else(|e| {
                eprintln!("JSON formatting error: {}. Falling back to text format.", e);
                self.format_text(level, record.target(), &message)
            }),
        };

        if self.console_accepts(level) {
            if let Err(e) = self.write_to_console(&line) {
                eprintln!("Console logging error: {}", e);
            }
        }
        if let (true, Some(path)) = (self.file_accepts(level), self.config.destination.file()) {
            if let Err(e) = self.write_to_file(&line, path) {
                eprintln!("File logging error: {}. Falling back to console.", e);
                if !self.console_accepts(level) {
                    let _ = self.write_to_console(&line);
                }
            }
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.flush();
        }
    }
}

/// Install the logger globally
pub fn init_logger(config: LogConfig) -> Result<()> {
    let max_level = config.max_level();
    log::set_boxed_logger(Box::new(VerifierLogger::new(config))).context("Failed to set global logger")?;
    log::set_max_level(max_level);
    Ok(())
}

/// Route panics through the logger, then let the previously installed hook
/// print them. The process keeps running, so a panic inside a scheduled task
/// only fails that task.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        log::error!("Panic: {}", panic_info);
        default_hook(panic_info);
    }));
}

pub fn parse_log_level(level_str: &str) -> Result<LevelFilter> {
    match level_str.to_lowercase().as_str() {
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        "off" => Ok(LevelFilter::Off),
        _ => Err(anyhow::anyhow!(
            "Invalid log level: {}. Valid levels: error, warn, info, debug, trace, off",
            level_str
        )),
    }
}
