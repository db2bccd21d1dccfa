use super::CheckSettings;
use crate::aggregator::StatusAggregator;
use crate::endpoints;
use crate::error::{CheckError, Result};
use crate::model::SystemStatus;
use crate::resolver::{DeviceSource, EndpointFallbackResolver};
use crate::thresholds::PerfMetric;

/// CPU load from the system status, compared against `cpu_usage`
pub async fn check<S: DeviceSource>(
    resolver: &mut EndpointFallbackResolver<S>,
    settings: &CheckSettings,
    aggregator: &mut StatusAggregator,
) -> Result<()> {
    let response = resolver.fetch(&endpoints::system_status()).await?;
    let status = SystemStatus::from_response(&response);
    let load = status
        .cpu_load
        .ok_or_else(|| CheckError::unparseable("CPU usage not reported by device"))?;

    let levels = settings.thresholds.cpu_usage;
    aggregator.report(
        levels.evaluate(load),
        Some(format!("CPU usage: {}%", load)),
        Some(PerfMetric::new("CPU", load, levels).percent().to_string()),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::FakeDevice;
    use crate::checks::tolerate_unparseable;
    use crate::severity::Severity;
    use crate::thresholds::ThresholdPair;
    use serde_json::json;

    async fn run(system_status: serde_json::Value, settings: &CheckSettings) -> StatusAggregator {
        let device = FakeDevice::new().answer("/adm/getmain.php?fun=systatus", system_status);
        let mut resolver = EndpointFallbackResolver::new(device);
        let mut aggregator = StatusAggregator::new();
        let outcome = check(&mut resolver, settings, &mut aggregator).await;
        tolerate_unparseable(&mut aggregator, outcome).unwrap();
        aggregator
    }

    #[tokio::test]
    async fn test_cpu_critical() {
        let mut settings = CheckSettings::default();
        settings.thresholds.cpu_usage = ThresholdPair::levels(90.0, 95.0);

        let result = run(json!({"cpu_loading": "97.6"}), &settings).await.finalize();
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.texts, vec!["CPU usage: 97%"]);
        assert_eq!(result.perf_metrics, vec!["CPU=97;90;95;0;100"]);
    }

    #[tokio::test]
    async fn test_cpu_missing_field_is_unknown() {
        let result = run(json!({"cpu_fan": "OK"}), &CheckSettings::default())
            .await
            .finalize();
        assert_eq!(result.severity, Severity::Unknown);
        assert!(result.perf_metrics.is_empty());
    }
}
