use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;
use crate::utils::logging::DEFAULT_LOG_FILE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Console,
    Json,
}

/// Command-line options for the monitor binary.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub config_path: PathBuf,
    pub database_path: Option<PathBuf>,
    pub host: Option<String>,
    pub interval: Option<f64>,
    pub format: OutputFormat,
    pub once: bool,
    pub headless: bool,
    pub reset_database: bool,
    /// `None` when file logging is disabled.
    pub log_file: Option<PathBuf>,
}

impl CliArgs {
    pub fn parse() -> Self {
        let matches = Self::build_cli().get_matches();
        Self::from_matches(&matches)
    }

    pub fn build_cli() -> Command {
        Command::new("tank_monitor")
            .version(crate::VERSION)
            .about("Polls tank level registers over Modbus TCP and logs them to SQLite")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Path to the settings file")
                    .default_value(DEFAULT_CONFIG_PATH),
            )
            .arg(
                Arg::new("database")
                    .short('d')
                    .long("database")
                    .value_name("FILE")
                    .help("SQLite log file (default: tank_levels.db)"),
            )
            .arg(
                Arg::new("host")
                    .long("host")
                    .value_name("ADDRESS")
                    .help("Device host for this run (overrides the settings file)"),
            )
            .arg(
                Arg::new("interval")
                    .short('i')
                    .long("interval")
                    .value_name("SECONDS")
                    .help("Poll interval for this run (overrides the settings file)")
                    .value_parser(clap::value_parser!(f64)),
            )
            .arg(
                Arg::new("format")
                    .short('f')
                    .long("format")
                    .value_name("FORMAT")
                    .help("Display format")
                    .value_parser(["console", "json"])
                    .default_value("console"),
            )
            .arg(
                Arg::new("once")
                    .long("once")
                    .help("Run a single poll cycle, print it and exit")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("headless")
                    .long("headless")
                    .help("No operator console; stop with Ctrl-C")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("reset-database")
                    .long("reset-database")
                    .help("Delete the existing log file before starting")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("log-file")
                    .long("log-file")
                    .value_name("FILE")
                    .help("Also append log output to this file")
                    .default_value(DEFAULT_LOG_FILE),
            )
            .arg(
                Arg::new("no-log-file")
                    .long("no-log-file")
                    .help("Log to the console only")
                    .action(ArgAction::SetTrue)
                    .conflicts_with("log-file"),
            )
    }

    pub fn from_matches(matches: &ArgMatches) -> Self {
        let format = match matches.get_one::<String>("format").map(String::as_str) {
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Console,
        };

        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            database_path: matches.get_one::<String>("database").map(PathBuf::from),
            host: matches.get_one::<String>("host").cloned(),
            interval: matches.get_one::<f64>("interval").copied(),
            format,
            once: matches.get_flag("once"),
            headless: matches.get_flag("headless"),
            reset_database: matches.get_flag("reset-database"),
            log_file: if matches.get_flag("no-log-file") {
                None
            } else {
                matches.get_one::<String>("log-file").map(PathBuf::from)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        let matches = CliArgs::build_cli().try_get_matches_from(args).unwrap();
        CliArgs::from_matches(&matches)
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["tank_monitor"]);

        assert_eq!(args.config_path, PathBuf::from("config.toml"));
        assert_eq!(args.database_path, None);
        assert_eq!(args.format, OutputFormat::Console);
        assert!(!args.once && !args.headless && !args.reset_database);
        assert_eq!(args.log_file, Some(PathBuf::from("tank_monitor.log")));
    }

    #[test]
    fn test_log_file_options() {
        let args = parse(&["tank_monitor", "--log-file", "/var/log/tanks.log"]);
        assert_eq!(args.log_file, Some(PathBuf::from("/var/log/tanks.log")));

        let args = parse(&["tank_monitor", "--no-log-file"]);
        assert_eq!(args.log_file, None);
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "tank_monitor",
            "--config",
            "/etc/tanks.toml",
            "--host",
            "10.1.1.9",
            "-i",
            "2.5",
            "--format",
            "json",
            "--once",
        ]);

        assert_eq!(args.config_path, PathBuf::from("/etc/tanks.toml"));
        assert_eq!(args.host.as_deref(), Some("10.1.1.9"));
        assert_eq!(args.interval, Some(2.5));
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.once);
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(CliArgs::build_cli()
            .try_get_matches_from(["tank_monitor", "--format", "csv"])
            .is_err());
    }
}
