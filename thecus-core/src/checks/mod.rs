//! Check routines
//!
//! Each routine pulls what it needs through the endpoint resolver and feeds
//! partial results into one [`StatusAggregator`]. Failure policy:
//! - `UnparseableMetric` becomes an UNKNOWN contribution and the run goes on
//! - any other error becomes an UNKNOWN contribution carrying the error
//!   message and ends the run
//!
//! A run therefore always produces an [`AggregateResult`].

pub mod cpu;
pub mod disk_usage;
pub mod health;
pub mod memory;
pub mod uptime;

use crate::aggregator::{AggregateResult, StatusAggregator};
use crate::error::{CheckError, Result};
use crate::resolver::{DeviceSource, EndpointFallbackResolver};
use crate::severity::Severity;
use crate::thresholds::Thresholds;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckType {
    Health,
    Cpu,
    Memory,
    DiskUsage,
    Uptime,
}

impl CheckType {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckType::Health => "health",
            CheckType::Cpu => "cpu",
            CheckType::Memory => "memory",
            CheckType::DiskUsage => "disk-usage",
            CheckType::Uptime => "uptime",
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid check type")]
pub struct InvalidCheckType;

impl FromStr for CheckType {
    type Err = InvalidCheckType;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "health" => Ok(CheckType::Health),
            "cpu" => Ok(CheckType::Cpu),
            "memory" => Ok(CheckType::Memory),
            "disk-usage" => Ok(CheckType::DiskUsage),
            "uptime" => Ok(CheckType::Uptime),
            _ => Err(InvalidCheckType),
        }
    }
}

/// Everything a routine needs besides the device itself
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckSettings {
    pub thresholds: Thresholds,
    /// Reallocated sector counts below this are not evaluated
    pub ignore_bad_sectors: Option<u64>,
    pub ignore_smart_status: bool,
}

impl CheckSettings {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            ..Default::default()
        }
    }
}

/// Runs one check against the device and returns its final state
pub async fn run_check<S: DeviceSource>(
    check_type: CheckType,
    resolver: &mut EndpointFallbackResolver<S>,
    settings: &CheckSettings,
) -> AggregateResult {
    info!("Running {} check", check_type);
    let mut aggregator = StatusAggregator::new();

    let outcome = match check_type {
        CheckType::Health => health::check(resolver, settings, &mut aggregator).await,
        CheckType::Cpu => cpu::check(resolver, settings, &mut aggregator).await,
        CheckType::Memory => memory::check(resolver, settings, &mut aggregator).await,
        CheckType::DiskUsage => disk_usage::check(resolver, settings, &mut aggregator).await,
        CheckType::Uptime => uptime::check(resolver, settings, &mut aggregator).await,
    };

    if let Err(e) = outcome {
        if !matches!(e, CheckError::UnparseableMetric(_)) {
            warn!("{} check aborted: {}", check_type, e);
        }
        aggregator.report(Severity::Unknown, Some(e.to_string()), None);
    }

    let result = aggregator.into_result();
    info!("{} check finished: {}", check_type, result.severity);
    result
}

/// Turns an unparseable metric into an UNKNOWN contribution so the caller
/// can carry on with its next sub-check
pub(crate) fn tolerate_unparseable(
    aggregator: &mut StatusAggregator,
    outcome: Result<()>,
) -> Result<()> {
    match outcome {
        Err(CheckError::UnparseableMetric(message)) => {
            warn!("{}", message);
            aggregator.report(Severity::Unknown, Some(message), None);
            Ok(())
        }
        other => other,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeDevice;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_type_parsing() {
        assert_eq!("health".parse(), Ok(CheckType::Health));
        assert_eq!(" CPU ".parse(), Ok(CheckType::Cpu));
        assert_eq!("Disk-Usage".parse(), Ok(CheckType::DiskUsage));
        assert_eq!("Memory".parse(), Ok(CheckType::Memory));
        assert_eq!("uptime".parse(), Ok(CheckType::Uptime));

        let err = "raid".parse::<CheckType>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid check type");
    }

    #[tokio::test]
    async fn test_fatal_error_ends_run_as_unknown() {
        let device = FakeDevice::new().fail("/adm/getmain.php?fun=systatus&update=1", || {
            CheckError::SessionConflict
        });
        let mut resolver = EndpointFallbackResolver::new(device);
        let result = run_check(CheckType::Cpu, &mut resolver, &CheckSettings::default()).await;

        assert_eq!(result.severity, Severity::Unknown);
        assert_eq!(result.texts, vec!["Admin has already logged in from another host"]);
        // the fallback candidate is never asked
        assert_eq!(resolver.source().queried.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_endpoint_reported_as_unknown() {
        let mut resolver = EndpointFallbackResolver::new(FakeDevice::new());
        let result = run_check(CheckType::Memory, &mut resolver, &CheckSettings::default()).await;

        assert_eq!(result.severity, Severity::Unknown);
        assert_eq!(
            result.texts,
            vec!["No endpoint satisfied query system status (2 candidates tried)"]
        );
    }

    #[tokio::test]
    async fn test_cpu_run() {
        let device = FakeDevice::new().answer(
            "/adm/getmain.php?fun=systatus&update=1",
            json!({"cpu_loading": "12"}),
        );
        let mut resolver = EndpointFallbackResolver::new(device);
        let result = run_check(CheckType::Cpu, &mut resolver, &CheckSettings::default()).await;

        assert_eq!(result.severity, Severity::Ok);
        assert_eq!(result.perf_line(), "CPU=12;95;98;0;100");
    }
}
