//! Command line and config file settings
//!
//! Values are resolved in order: command line flag, then the YAML config
//! file, then built-in defaults.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Deserialize;

use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_BASE_URL};
use crate::models::{DocumentKind, ExportFilter, ResourceKind};
use crate::network::PayloadEncoding;
use crate::prefs::Prefs;

#[derive(Parser, Debug)]
#[command(name = "timetable-console", version, about = "Terminal console for a timetable REST API", long_about = None)]
struct ClapArgs {
    /// Base URL of the API, e.g. http://127.0.0.1:8000/api
    #[arg(short = 'u', long, value_name = "URL")]
    base_url: Option<String>,

    /// Config file (default ~/.timetable-console/config.yaml)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory exported documents are saved to
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Directory of the log file
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Send create/update payloads as JSON instead of multipart form fields
    #[arg(long)]
    json_payloads: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Headless commands; without one the interactive console starts
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print a collection as a table
    Dump {
        /// schedule, groups, teachers, rooms or subjects
        kind: ResourceKind,
        /// Emit an HTML table instead of plain text
        #[arg(long)]
        html: bool,
    },
    /// Download a generated document into the export directory
    Export {
        /// word, pdf, excel or legacy
        document: DocumentKind,
        /// Group name (Word only)
        #[arg(long)]
        group: Option<String>,
        /// First day, YYYY-MM-DD (Word only)
        #[arg(long)]
        date_start: Option<NaiveDate>,
        /// Last day, YYYY-MM-DD (Word only)
        #[arg(long)]
        date_end: Option<NaiveDate>,
    },
    /// Upload a file for bulk import
    Import {
        file: PathBuf,
    },
}

impl Command {
    /// Export filter of an `export` command
    pub fn export_filter(&self) -> Option<ExportFilter> {
        match self {
            Command::Export { group, date_start, date_end, .. } => Some(ExportFilter {
                group: group.clone(),
                date_start: *date_start,
                date_end: *date_end,
            }),
            _ => None,
        }
    }
}

/// Contents of the YAML config file; every key is optional
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub export_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub payload_encoding: Option<PayloadEncoding>,
}

impl FileConfig {
    /// Read `path`. A missing file is only an error when it was named explicitly.
    pub fn load(path: &Path, explicit: bool) -> Result<FileConfig> {
        if !path.exists() {
            if explicit {
                bail!("config file {} does not exist", path.display());
            }
            return Ok(FileConfig::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(FileConfig::default());
        }
        serde_yaml::from_str(&content).with_context(|| format!("invalid config file {}", path.display()))
    }
}

/// `~/.timetable-console`
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Resolved settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub export_dir: PathBuf,
    pub log_dir: PathBuf,
    pub payload_encoding: PayloadEncoding,
    pub prefs_path: PathBuf,
    pub command: Option<Command>,
}

impl Settings {
    /// Parse the process arguments; exits with usage on bad flags
    pub fn parse() -> Result<Self> {
        Self::resolve(ClapArgs::parse())
    }

    pub fn try_parse_from<I, T>(itr: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::resolve(ClapArgs::try_parse_from(itr)?)
    }

    fn resolve(args: ClapArgs) -> Result<Self> {
        let explicit = args.config.is_some();
        let config_path = args
            .config
            .clone()
            .unwrap_or_else(|| config_dir().join(CONFIG_FILE_NAME));
        let file = FileConfig::load(&config_path, explicit)?;

        let payload_encoding = if args.json_payloads {
            PayloadEncoding::Json
        } else {
            file.payload_encoding.unwrap_or_default()
        };

        Ok(Settings {
            base_url: args
                .base_url
                .or(file.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            export_dir: args
                .export_dir
                .or(file.export_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            log_dir: args.log_dir.or(file.log_dir).unwrap_or_else(config_dir),
            payload_encoding,
            prefs_path: Prefs::default_path(),
            command: args.command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_config(dir: &Path, content: &str) -> String {
        let path = dir.join("config.yaml");
        fs::write(&path, content).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn test_defaults_with_empty_config() {
        let dir = tempdir().unwrap();
        let config = write_config(dir.path(), "");
        let settings = Settings::try_parse_from(["tc", "--config", &config]).unwrap();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.export_dir, PathBuf::from("."));
        assert_eq!(settings.payload_encoding, PayloadEncoding::Multipart);
        assert_eq!(settings.command, None);
    }

    #[test]
    fn test_file_values_apply() {
        let dir = tempdir().unwrap();
        let config = write_config(
            dir.path(),
            "base_url: http://timetable.local/api\nexport_dir: /tmp/exports\npayload_encoding: json\n",
        );
        let settings = Settings::try_parse_from(["tc", "-c", &config]).unwrap();
        assert_eq!(settings.base_url, "http://timetable.local/api");
        assert_eq!(settings.export_dir, PathBuf::from("/tmp/exports"));
        assert_eq!(settings.payload_encoding, PayloadEncoding::Json);
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempdir().unwrap();
        let config = write_config(dir.path(), "base_url: http://file/api\n");
        let settings =
            Settings::try_parse_from(["tc", "-c", &config, "--base-url", "http://flag/api", "--json-payloads"])
                .unwrap();
        assert_eq!(settings.base_url, "http://flag/api");
        assert_eq!(settings.payload_encoding, PayloadEncoding::Json);
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        let result = Settings::try_parse_from(["tc", "--config", missing.to_str().unwrap()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_config_key_is_error() {
        let dir = tempdir().unwrap();
        let config = write_config(dir.path(), "base_uri: typo\n");
        assert!(Settings::try_parse_from(["tc", "-c", &config]).is_err());
    }

    #[test]
    fn test_dump_subcommand() {
        let dir = tempdir().unwrap();
        let config = write_config(dir.path(), "");
        let settings = Settings::try_parse_from(["tc", "-c", &config, "dump", "teachers", "--html"]).unwrap();
        assert_eq!(
            settings.command,
            Some(Command::Dump { kind: ResourceKind::Teacher, html: true })
        );
    }

    #[test]
    fn test_export_subcommand_filter() {
        let dir = tempdir().unwrap();
        let config = write_config(dir.path(), "");
        let settings = Settings::try_parse_from([
            "tc", "-c", &config, "export", "word", "--group", "CS-101", "--date-start", "2025-09-01",
        ])
        .unwrap();
        let command = settings.command.unwrap();
        let filter = command.export_filter().unwrap();
        assert_eq!(filter.group.as_deref(), Some("CS-101"));
        assert_eq!(filter.date_start, NaiveDate::from_ymd_opt(2025, 9, 1));
        assert!(matches!(command, Command::Export { document: DocumentKind::Word, .. }));
    }

    #[test]
    fn test_bad_kind_rejected() {
        assert!(Settings::try_parse_from(["tc", "dump", "planets"]).is_err());
    }
}
