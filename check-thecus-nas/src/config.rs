//! Plugin configuration
//!
//! Handles:
//! - optional TOML config file (`[device]`, `[check]`, `[thresholds.<kind>]`)
//! - command line values, which override file values
//! - validation with the plugin's usage messages

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thecus_core::{CheckSettings, CheckType, ThresholdKind, ThresholdPair, Thresholds};
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Parser, Debug)]
#[command(
    name = "check_thecus_nas",
    version,
    about = "Checks the health of a Thecus NAS through its web interface",
    after_help = r#"Check types:
  health      fans, RAID, disks and SMART attributes
  cpu         CPU usage
  memory      memory usage
  disk-usage  space used on each RAID volume
  uptime      time since the last reboot

Examples:
  check_thecus_nas --hostname=thecus.example.com --username=admin --password=password -t health
  check_thecus_nas -H thecus.example.com -u admin -p password -t cpu --cpu-warning 80 --cpu-critical 90
  check_thecus_nas -c /etc/nagios/thecus.toml -t disk-usage"#
)]
pub struct Cli {
    /// File containing configuration parameters
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    #[arg(short = 'H', long)]
    pub hostname: Option<String>,

    /// The username (usually admin)
    #[arg(short, long)]
    pub username: Option<String>,

    #[arg(short, long)]
    pub password: Option<String>,

    /// The check type: health, cpu, memory, disk-usage or uptime
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub check_type: Option<String>,

    /// CPU usage warning level in % (default: 95)
    #[arg(long, value_name = "PCT")]
    pub cpu_warning: Option<f64>,
    /// CPU usage critical level in % (default: 98)
    #[arg(long, value_name = "PCT")]
    pub cpu_critical: Option<f64>,

    /// Memory usage warning level in % (default: 90)
    #[arg(long, value_name = "PCT")]
    pub mem_warning: Option<f64>,
    /// Memory usage critical level in % (default: 95)
    #[arg(long, value_name = "PCT")]
    pub mem_critical: Option<f64>,

    /// Disk usage warning level in % (default: 80)
    #[arg(long, value_name = "PCT")]
    pub disk_usage_warning: Option<f64>,
    /// Disk usage critical level in % (default: 90)
    #[arg(long, value_name = "PCT")]
    pub disk_usage_critical: Option<f64>,

    /// Disk temperature warning level in °C (default: 55)
    #[arg(long, value_name = "CELSIUS")]
    pub disk_temp_warning: Option<f64>,
    /// Disk temperature critical level in °C (default: 60)
    #[arg(long, value_name = "CELSIUS")]
    pub disk_temp_critical: Option<f64>,

    /// Reallocated sector count warning level (default: 32)
    #[arg(long, value_name = "COUNT")]
    pub realloc_sector_warning: Option<f64>,
    /// Reallocated sector count critical level (default: 320)
    #[arg(long, value_name = "COUNT")]
    pub realloc_sector_critical: Option<f64>,

    /// Current pending sector count warning level (default: 1)
    #[arg(long, value_name = "COUNT")]
    pub pending_sector_warning: Option<f64>,
    /// Current pending sector count critical level (default: 1)
    #[arg(long, value_name = "COUNT")]
    pub pending_sector_critical: Option<f64>,

    /// Uptime warning level in seconds, lower is worse (default: 1200)
    #[arg(long, value_name = "SECONDS")]
    pub uptime_warning: Option<f64>,
    /// Uptime critical level in seconds, lower is worse (default: 300)
    #[arg(long, value_name = "SECONDS")]
    pub uptime_critical: Option<f64>,

    /// Do not evaluate reallocated sector counts below this number
    #[arg(long, value_name = "COUNT")]
    pub ignore_bad_sectors: Option<u64>,

    /// Do not report a failing overall SMART status
    #[arg(long)]
    pub ignore_smart_status: bool,

    /// Directory holding the session cookie file (default: system temp dir)
    #[arg(long, value_name = "DIR")]
    pub cookie_dir: Option<PathBuf>,

    /// Connect and request timeout in seconds (default: 10)
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Talk to the device over HTTPS
    #[arg(long)]
    pub https: bool,

    /// Display extra information on stderr, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Contents of the TOML config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub device: DeviceSection,
    pub check: CheckSection,
    /// Levels keyed by threshold kind (`cpu_usage`, `disk_temp`, ...)
    pub thresholds: BTreeMap<String, ThresholdPair>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceSection {
    pub hostname: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub https: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub cookie_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckSection {
    #[serde(rename = "type")]
    pub check_type: Option<String>,
    pub ignore_bad_sectors: Option<u64>,
    pub ignore_smart_status: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Can't read config file")?;
        toml::from_str(&content).context("Can't parse config file")
    }

    /// Default location, used when no file is given on the command line
    pub fn config_file_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("check-thecus-nas");
        path.push("config.toml");
        Some(path)
    }
}

/// Fully resolved settings of one plugin run
#[derive(Debug, Clone)]
pub struct PluginConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub check_type: CheckType,
    pub settings: CheckSettings,
    pub cookie_dir: PathBuf,
    pub timeout: Duration,
    pub scheme: &'static str,
}

impl PluginConfig {
    /// Reads the config file (given or default) and merges the command line over it
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let file = match &cli.config_file {
            Some(path) => FileConfig::load(path)?,
            None => match FileConfig::config_file_path().filter(|p| p.exists()) {
                Some(path) => {
                    debug!("Using config file {}", path.display());
                    FileConfig::load(&path)?
                }
                None => FileConfig::default(),
            },
        };
        Self::resolve(cli, file)
    }

    pub fn resolve(cli: &Cli, file: FileConfig) -> Result<Self> {
        let device = file.device;
        let check = file.check;

        let hostname = required(&cli.hostname, device.hostname, "Hostname missing")?;
        let username = required(&cli.username, device.username, "Username missing")?;
        let password = required(&cli.password, device.password, "Password missing")?;
        let check_type: CheckType =
            required(&cli.check_type, check.check_type, "Check type not specified")?.parse()?;

        let mut thresholds = Thresholds::default();
        for (name, levels) in &file.thresholds {
            let kind = ThresholdKind::ALL
                .into_iter()
                .find(|kind| kind.as_str() == name.as_str())
                .with_context(|| format!("Unknown threshold '{}' in config file", name))?;
            thresholds.override_levels(kind, levels.warn, levels.crit);
        }
        for (kind, warn, crit) in [
            (ThresholdKind::CpuUsage, cli.cpu_warning, cli.cpu_critical),
            (ThresholdKind::MemUsage, cli.mem_warning, cli.mem_critical),
            (ThresholdKind::DiskUsage, cli.disk_usage_warning, cli.disk_usage_critical),
            (ThresholdKind::DiskTemp, cli.disk_temp_warning, cli.disk_temp_critical),
            (
                ThresholdKind::ReallocatedSector,
                cli.realloc_sector_warning,
                cli.realloc_sector_critical,
            ),
            (
                ThresholdKind::CurrentPendingSector,
                cli.pending_sector_warning,
                cli.pending_sector_critical,
            ),
            (ThresholdKind::Uptime, cli.uptime_warning, cli.uptime_critical),
        ] {
            thresholds.override_levels(kind, warn, crit);
        }

        let settings = CheckSettings {
            thresholds,
            ignore_bad_sectors: cli.ignore_bad_sectors.or(check.ignore_bad_sectors),
            ignore_smart_status: cli.ignore_smart_status
                || check.ignore_smart_status.unwrap_or(false),
        };

        let https = cli.https || device.https.unwrap_or(false);
        Ok(Self {
            hostname,
            username,
            password,
            check_type,
            settings,
            cookie_dir: cli
                .cookie_dir
                .clone()
                .or(device.cookie_dir)
                .unwrap_or_else(std::env::temp_dir),
            timeout: Duration::from_secs(
                cli.timeout.or(device.timeout_secs).unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            scheme: if https { "https" } else { "http" },
        })
    }
}

/// Command line value, else file value; empty strings count as missing
fn required(cli: &Option<String>, file: Option<String>, missing: &str) -> Result<String> {
    match cli.clone().or(file).filter(|v| !v.trim().is_empty()) {
        Some(value) => Ok(value),
        None => bail!("{}. Use --help for usage information.", missing),
    }
}
