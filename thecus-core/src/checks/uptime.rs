//! Time since the last boot
//!
//! Thresholds are lower bounds: a device that restarted recently is flagged.
//! Firmware reports uptime as plain seconds, as `N days N hours N mins`, as a
//! clock `HH:MM[:SS]`, or a mix like `3 days, 04:12`.

use super::CheckSettings;
use crate::aggregator::StatusAggregator;
use crate::endpoints;
use crate::error::{CheckError, Result};
use crate::model::SystemStatus;
use crate::resolver::{DeviceSource, EndpointFallbackResolver};
use crate::thresholds::PerfMetric;
use once_cell::sync::Lazy;
use regex::Regex;

static UNIT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s*(days?|hours?|hrs?|minutes?|mins?|seconds?|secs?)\b")
        .expect("uptime unit pattern must compile")
});

static CLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,3}):(\d{2})(?::(\d{2}))?\b").expect("uptime clock pattern must compile")
});

/// Seconds since boot, `None` when nothing in `raw` looks like a duration
pub fn parse_uptime(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(seconds);
    }

    let mut total = 0u64;
    let mut matched = false;

    for caps in UNIT_TOKEN.captures_iter(raw) {
        let amount: u64 = caps[1].parse().ok()?;
        let unit = caps[2].to_ascii_lowercase();
        let factor = match unit.as_bytes().first() {
            Some(b'd') => 86_400,
            Some(b'h') => 3_600,
            Some(b'm') => 60,
            _ => 1,
        };
        total = total.checked_add(amount.checked_mul(factor)?)?;
        matched = true;
    }

    if let Some(caps) = CLOCK.captures(raw) {
        let hours: u64 = caps[1].parse().ok()?;
        let minutes: u64 = caps[2].parse().ok()?;
        let seconds: u64 = match caps.get(3) {
            Some(s) => s.as_str().parse().ok()?,
            None => 0,
        };
        let clock = hours
            .checked_mul(3_600)?
            .checked_add(minutes * 60)?
            .checked_add(seconds)?;
        total = total.checked_add(clock)?;
        matched = true;
    }

    matched.then_some(total)
}

pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = seconds % 86_400 / 3_600;
    let minutes = seconds % 3_600 / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m {}s", minutes, seconds % 60)
    }
}

pub async fn check<S: DeviceSource>(
    resolver: &mut EndpointFallbackResolver<S>,
    settings: &CheckSettings,
    aggregator: &mut StatusAggregator,
) -> Result<()> {
    let response = resolver.fetch(&endpoints::system_status()).await?;
    let raw = SystemStatus::from_response(&response)
        .uptime
        .ok_or_else(|| CheckError::unparseable("Uptime not reported by device"))?;
    let seconds = parse_uptime(&raw)
        .ok_or_else(|| CheckError::unparseable(format!("Can't parse uptime: {}", raw)))?;

    let levels = settings.thresholds.uptime;
    aggregator.report(
        levels.evaluate_at_most(seconds as f64),
        Some(format!("Uptime: {}", format_uptime(seconds))),
        Some(
            PerfMetric::new("uptime", seconds as f64, levels)
                .unit("s")
                .range(Some(0.0), None)
                .to_string(),
        ),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::FakeDevice;
    use crate::severity::Severity;
    use serde_json::json;

    #[test]
    fn test_parse_uptime_formats() {
        assert_eq!(parse_uptime("3600"), Some(3600));
        assert_eq!(parse_uptime("2 days 3 hours 4 mins"), Some(2 * 86_400 + 3 * 3_600 + 240));
        assert_eq!(parse_uptime("1 day, 02:30"), Some(86_400 + 9_000));
        assert_eq!(parse_uptime("12:00:05"), Some(43_205));
        assert_eq!(parse_uptime("45 sec"), Some(45));
        assert_eq!(parse_uptime("soon"), None);
        assert_eq!(parse_uptime(""), None);
    }

    #[test]
    fn test_parse_uptime_overflow_is_unparseable() {
        assert_eq!(parse_uptime("300000000000000 days"), None);
        assert_eq!(parse_uptime(&format!("{} days", u64::MAX)), None);
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(90), "1m 30s");
        assert_eq!(format_uptime(3_600), "1h 0m");
        assert_eq!(format_uptime(2 * 86_400 + 7_260), "2d 2h 1m");
    }

    #[tokio::test]
    async fn test_recent_reboot_is_critical() {
        let device = FakeDevice::new().answer(
            "/adm/getmain.php?fun=systatus&update=1",
            json!({"up_time": "0 days 4 mins"}),
        );
        let mut resolver = EndpointFallbackResolver::new(device);
        let mut aggregator = StatusAggregator::new();
        check(&mut resolver, &CheckSettings::default(), &mut aggregator)
            .await
            .unwrap();

        let result = aggregator.finalize();
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.texts, vec!["Uptime: 4m 0s"]);
        assert_eq!(result.perf_metrics, vec!["uptime=240s;1200;300;0;"]);
    }

    #[tokio::test]
    async fn test_long_uptime_is_ok() {
        let device = FakeDevice::new().answer(
            "/adm/getmain.php?fun=systatus&update=1",
            json!({"uptime": 864000}),
        );
        let mut resolver = EndpointFallbackResolver::new(device);
        let mut aggregator = StatusAggregator::new();
        check(&mut resolver, &CheckSettings::default(), &mut aggregator)
            .await
            .unwrap();
        assert_eq!(aggregator.severity(), Severity::Ok);
    }
}
