use super::CheckSettings;
use crate::aggregator::StatusAggregator;
use crate::endpoints;
use crate::error::{CheckError, Result};
use crate::model::SystemStatus;
use crate::resolver::{DeviceSource, EndpointFallbackResolver};
use crate::thresholds::PerfMetric;

pub async fn check<S: DeviceSource>(
    resolver: &mut EndpointFallbackResolver<S>,
    settings: &CheckSettings,
    aggregator: &mut StatusAggregator,
) -> Result<()> {
    let response = resolver.fetch(&endpoints::system_status()).await?;
    let percent = SystemStatus::from_response(&response)
        .memory_percent
        .ok_or_else(|| CheckError::unparseable("Memory usage not reported by device"))?;

    let levels = settings.thresholds.mem_usage;
    aggregator.report(
        levels.evaluate(percent),
        Some(format!("Memory usage: {}%", percent)),
        Some(PerfMetric::new("MEM", percent, levels).percent().to_string()),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::FakeDevice;
    use crate::severity::Severity;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_from_totals() {
        let device = FakeDevice::new().answer(
            "/adm/getmain.php?fun=systatus&update=1",
            json!({"mem_total": "1000", "mem_free": "40"}),
        );
        let mut resolver = EndpointFallbackResolver::new(device);
        let mut aggregator = StatusAggregator::new();
        check(&mut resolver, &CheckSettings::default(), &mut aggregator)
            .await
            .unwrap();

        let result = aggregator.finalize();
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.texts, vec!["Memory usage: 96%"]);
        assert_eq!(result.perf_metrics, vec!["MEM=96;90;95;0;100"]);
    }

    #[tokio::test]
    async fn test_memory_not_reported() {
        let device = FakeDevice::new().answer(
            "/adm/getmain.php?fun=systatus&update=1",
            json!({"cpu_loading": 3}),
        );
        let mut resolver = EndpointFallbackResolver::new(device);
        let mut aggregator = StatusAggregator::new();
        let err = check(&mut resolver, &CheckSettings::default(), &mut aggregator)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::UnparseableMetric(_)));
        assert!(!aggregator.has_texts());
    }
}
