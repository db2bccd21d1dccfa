//! Space used on every RAID volume
//!
//! The firmware only reports a capacity string such as `512 GB / 1024 GB`.
//! Values in different units are not converted; the volume is reported as
//! unparseable instead.

use super::CheckSettings;
use crate::aggregator::StatusAggregator;
use crate::endpoints;
use crate::error::{CheckError, Result};
use crate::model::{raid_volumes, round2};
use crate::resolver::{DeviceSource, EndpointFallbackResolver};
use crate::severity::Severity;
use crate::thresholds::PerfMetric;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static CAPACITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9.]+) ?([KMGTP]B)[^0-9.]+([0-9.]+) ?([KMGTP]B)")
        .expect("capacity pattern must compile")
});

const UNPARSEABLE: &str = "Can't parse disk usage data.";
const MIXED_UNITS: &str = "Can't parse disk usage data. Different units used.";

/// Used percentage from a capacity string, rounded to two decimals
pub fn used_percent(capacity: &str) -> Result<f64> {
    let caps = CAPACITY
        .captures(capacity)
        .ok_or_else(|| CheckError::unparseable(UNPARSEABLE))?;

    if caps[2] != caps[4] {
        return Err(CheckError::unparseable(MIXED_UNITS));
    }

    let used: f64 = caps[1].parse().map_err(|_| CheckError::unparseable(UNPARSEABLE))?;
    let total: f64 = caps[3].parse().map_err(|_| CheckError::unparseable(UNPARSEABLE))?;
    if total <= 0.0 {
        return Err(CheckError::unparseable(UNPARSEABLE));
    }
    Ok(round2(used / total * 100.0))
}

pub async fn check<S: DeviceSource>(
    resolver: &mut EndpointFallbackResolver<S>,
    settings: &CheckSettings,
    aggregator: &mut StatusAggregator,
) -> Result<()> {
    let response = resolver.fetch(&endpoints::raid_list()).await?;
    let levels = settings.thresholds.disk_usage;

    let mut severity = Severity::Ok;
    let mut texts = Vec::new();
    let mut perf = Vec::new();

    // nothing is reported unless every volume parses
    for volume in raid_volumes(&response) {
        let capacity = volume.capacity.unwrap_or_default();
        let percent = used_percent(&capacity)?;
        debug!("{} uses {}% ({})", volume.id, percent, capacity);

        severity = severity.escalate(levels.evaluate(percent));
        texts.push(format!("{} {}% ({})", volume.id, percent, capacity));
        perf.push(
            PerfMetric::new(format!("{}_usage", volume.id), percent, levels)
                .percent()
                .to_string(),
        );
    }

    if texts.is_empty() {
        aggregator.report(severity, None, None);
    } else {
        aggregator.report(severity, Some(format!("Disk usage: {}", texts.join(", "))), None);
    }
    for metric in perf {
        aggregator.report(Severity::Ok, None, Some(metric));
    }
    Ok(())
}
