use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use log::debug;
use std::path::PathBuf;

use super::size_parser::parse_size;

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// JVM plugin API compatibility verifier
#[derive(Parser, Debug)]
#[command(name = "plugin-verifier")]
#[command(about = "Checks compiled plugins for API compatibility against host builds by resolving every bytecode reference")]
#[command(version)]
pub struct Args {
    /// Plugins to verify, as `id` (newest stored version) or `id:version`; all stored plugins by default
    #[arg(value_name = "PLUGIN")]
    pub plugins: Vec<String>,

    /// Plugin store laid out as <dir>/<id>/<version>/
    #[arg(short = 'p', long = "plugins-dir", value_name = "DIR")]
    pub plugins_dir: PathBuf,

    /// Host store laid out as <dir>/<version>/
    #[arg(short = 'H', long = "hosts-dir", value_name = "DIR")]
    pub hosts_dir: PathBuf,

    /// Host versions to verify against; every stored host inside the plugin's range by default
    #[arg(long = "host-version", value_name = "VERSION", action = ArgAction::Append)]
    pub host_versions: Vec<String>,

    /// Extra class directories appended to the classpath after the host
    #[arg(long = "classpath", value_name = "DIR", action = ArgAction::Append)]
    pub classpath: Vec<PathBuf>,

    /// Package prefixes provided at runtime by something other than the host
    #[arg(long = "external-prefix", value_name = "PREFIX", action = ArgAction::Append)]
    pub external_prefixes: Vec<String>,

    /// File of `plugin-id:description` patterns of problems to ignore
    #[arg(long = "ignored-problems", value_name = "FILE")]
    pub ignored_problems: Option<PathBuf>,

    /// YAML list of documented host API changes
    #[arg(long = "documented-problems", value_name = "FILE")]
    pub documented_problems: Option<PathBuf>,

    /// Number of concurrent verifications
    #[arg(short = 'j', long = "workers", value_name = "N")]
    pub workers: Option<usize>,

    /// Disk quota of the cache directory, e.g. 5GB
    #[arg(long = "disk-quota", value_name = "SIZE", value_parser = parse_size_arg)]
    pub disk_quota: Option<u64>,

    /// Cache directory kept under the disk quota
    #[arg(long = "cache-dir", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,

    /// Verbose output (debug level logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long)]
    pub debug: bool,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log file path for file output
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL")]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Configuration section name
    #[arg(long, value_name = "SECTION")]
    pub config_name: Option<String>,
}

fn parse_size_arg(value: &str) -> Result<u64, String> {
    parse_size(value).map_err(|e| e.to_string())
}

pub fn parse_args() -> Args {
    Args::parse()
}

/// Checks clap cannot express
pub fn validate_args(args: &Args) -> Result<()> {
    if args.log_file_level.is_some() && args.log_file.is_none() {
        anyhow::bail!("--log-file-level requires --log-file");
    }
    if [args.verbose, args.quiet, args.debug].iter().filter(|f| **f).count() > 1 {
        anyhow::bail!("--verbose, --quiet and --debug are mutually exclusive");
    }
    if args.workers == Some(0) {
        anyhow::bail!("--workers must be at least 1");
    }
    for (name, dir) in [("plugins", &args.plugins_dir), ("hosts", &args.hosts_dir)] {
        if !dir.is_dir() {
            anyhow::bail!("{} directory does not exist: {}", name, dir.display());
        }
    }
    debug!("Arguments validated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(extra: &[&str], dir: &TempDir) -> Args {
        let root = dir.path().to_str().unwrap();
        let mut argv = vec!["plugin-verifier", "--plugins-dir", root, "--hosts-dir", root];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let temp = TempDir::new().unwrap();
        let args = parse(&[], &temp);
        assert!(args.plugins.is_empty());
        assert_eq!(args.format, OutputFormat::Table);
        assert_eq!(args.log_format, "text");
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_repeated_and_parsed_flags() {
        let temp = TempDir::new().unwrap();
        let args = parse(
            &[
                "com.example:1.0",
                "org.other",
                "--host-version",
                "146.1",
                "--host-version",
                "IU-147.2",
                "--external-prefix",
                "kotlin",
                "--disk-quota",
                "2GB",
                "-j",
                "3",
                "--format",
                "json",
            ],
            &temp,
        );
        assert_eq!(args.plugins, vec!["com.example:1.0", "org.other"]);
        assert_eq!(args.host_versions, vec!["146.1", "IU-147.2"]);
        assert_eq!(args.external_prefixes, vec!["kotlin"]);
        assert_eq!(args.disk_quota, Some(2 * 1024 * 1024 * 1024));
        assert_eq!(args.workers, Some(3));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_invalid_combinations() {
        let temp = TempDir::new().unwrap();
        assert!(validate_args(&parse(&["--log-file-level", "debug"], &temp)).is_err());
        assert!(validate_args(&parse(&["-v", "-q"], &temp)).is_err());
        assert!(validate_args(&parse(&["-j", "0"], &temp)).is_err());

        let root = temp.path().to_str().unwrap();
        assert!(Args::try_parse_from(["plugin-verifier", "--plugins-dir", root, "--hosts-dir", root, "--disk-quota", "lots"]).is_err());

        let missing = Args::try_parse_from(["plugin-verifier", "--plugins-dir", "/no/such/dir", "--hosts-dir", root]).unwrap();
        assert!(validate_args(&missing).is_err());
    }
}
