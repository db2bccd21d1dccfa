//! Overall device health
//!
//! Runs three sub-checks in order, each contributing to the same aggregate:
//! - system: CPU fan and system fans
//! - RAID: access status and every volume
//! - disks: disk status plus SMART attributes of each present disk

use super::{tolerate_unparseable, CheckSettings};
use crate::aggregator::{PartialStatus, StatusAggregator};
use crate::endpoints;
use crate::error::{CheckError, Result};
use crate::model::{
    disk_entries, raid_access_state, raid_volumes, DiskEntry, DiskState, RaidState, RaidVolume,
    SmartReport, SystemStatus,
};
use crate::resolver::{DeviceSource, EndpointFallbackResolver};
use crate::severity::Severity;
use crate::thresholds::PerfMetric;
use tracing::{debug, info};

const HARDWARE_FINE: &str = "Hardware working fine";
const SYSTEM_HEALTHY: &str = "System healthy";

pub async fn check<S: DeviceSource>(
    resolver: &mut EndpointFallbackResolver<S>,
    settings: &CheckSettings,
    aggregator: &mut StatusAggregator,
) -> Result<()> {
    check_system(resolver, aggregator).await?;
    check_raid(resolver, aggregator).await?;
    check_disks(resolver, settings, aggregator).await?;

    if aggregator.severity().is_ok() && !aggregator.has_texts() {
        aggregator.report(Severity::Ok, Some(SYSTEM_HEALTHY.to_string()), None);
    }
    Ok(())
}

async fn check_system<S: DeviceSource>(
    resolver: &mut EndpointFallbackResolver<S>,
    aggregator: &mut StatusAggregator,
) -> Result<()> {
    let status = match resolver.fetch(&endpoints::system_status()).await {
        Ok(response) => Some(SystemStatus::from_response(&response)),
        // some models (N2520) serve no system status at all
        Err(CheckError::NoEndpointSatisfied { .. }) => {
            info!("Device reports no system status, fan checks skipped");
            None
        }
        Err(e) => return Err(e),
    };

    aggregator.report_partial(evaluate_system(status.as_ref()));
    Ok(())
}

/// Fan states of the system status
pub fn evaluate_system(status: Option<&SystemStatus>) -> PartialStatus {
    let mut partial = PartialStatus::new(Severity::Ok);
    let mut texts = Vec::new();

    if let Some(status) = status {
        if let Some(cpu_fan) = &status.cpu_fan {
            if cpu_fan != "OK" {
                partial.escalate(Severity::Critical);
                texts.push("CPU fan not OK".to_string());
            }
        }
        for fan in status.fans.iter().filter(|fan| !fan.is_ok()) {
            partial.escalate(Severity::Critical);
            texts.push(format!("System fan {} not OK", fan.index));
        }
    }

    if partial.severity.is_ok() {
        texts.push(HARDWARE_FINE.to_string());
    }
    partial.text = Some(texts.join(", "));
    partial
}

async fn check_raid<S: DeviceSource>(
    resolver: &mut EndpointFallbackResolver<S>,
    aggregator: &mut StatusAggregator,
) -> Result<()> {
    let access = match resolver.fetch(&endpoints::raid_access_status()).await {
        Ok(response) => raid_access_state(&response),
        // N5200 firmware has no access status
        Err(CheckError::NoEndpointSatisfied { .. }) => None,
        Err(e) => return Err(e),
    };
    let volumes = raid_volumes(&resolver.fetch(&endpoints::raid_list()).await?);

    aggregator.report_partial(evaluate_raid(access.as_ref(), &volumes));
    Ok(())
}

/// Access status and volume states; the worst one decides
pub fn evaluate_raid(access: Option<&RaidState>, volumes: &[RaidVolume]) -> PartialStatus {
    let mut partial = PartialStatus::new(Severity::Ok);
    let mut parts = Vec::new();

    if let Some(access) = access {
        partial.escalate(access.severity());
        if !access.severity().is_ok() {
            parts.push(format!("access status: {}", access.label()));
        }
    }
    for volume in volumes {
        let severity = volume.state.severity();
        partial.escalate(severity);
        if !severity.is_ok() {
            parts.push(format!("{} status: {}", volume.id, volume.state.label()));
        }
    }

    if partial.severity.is_ok() {
        parts.push("Healthy".to_string());
    }
    partial.with_text(format!("RAID {}", parts.join(", ")))
}

async fn check_disks<S: DeviceSource>(
    resolver: &mut EndpointFallbackResolver<S>,
    settings: &CheckSettings,
    aggregator: &mut StatusAggregator,
) -> Result<()> {
    let disks = disk_entries(&resolver.fetch(&endpoints::disk_list()).await?);
    debug!("{} disk slots reported", disks.len());

    for disk in disks {
        let outcome = match &disk.state {
            DiskState::NotPresent => continue,
            DiskState::Critical => {
                aggregator.report(
                    Severity::Critical,
                    Some(format!("Disk {} status: Critical", disk.tray)),
                    None,
                );
                Ok(())
            }
            DiskState::Warning => check_smart(resolver, settings, &disk)
                .await
                .map(|partial| aggregator.report_partial(partial.floor(Severity::Warning))),
            DiskState::Healthy(_) => check_smart(resolver, settings, &disk)
                .await
                .map(|partial| aggregator.report_partial(partial)),
        };
        tolerate_unparseable(aggregator, outcome)?;
    }
    Ok(())
}

async fn check_smart<S: DeviceSource>(
    resolver: &mut EndpointFallbackResolver<S>,
    settings: &CheckSettings,
    disk: &DiskEntry,
) -> Result<PartialStatus> {
    let no_data = || CheckError::unparseable(format!("Disk {}: no SMART data", disk.tray));

    let responses = match resolver
        .fetch_all(&endpoints::smart_info(&disk.disk, &disk.tray))
        .await
    {
        Ok(responses) => responses,
        Err(CheckError::NoEndpointSatisfied { .. }) => return Err(no_data()),
        Err(e) => return Err(e),
    };

    let report = responses
        .iter()
        .map(SmartReport::from_response)
        .find(|report| !report.is_placeholder())
        .ok_or_else(no_data)?;

    Ok(evaluate_smart(&disk.tray, &report, settings))
}

/// SMART status and attribute thresholds of one disk
pub fn evaluate_smart(tray: &str, report: &SmartReport, settings: &CheckSettings) -> PartialStatus {
    let thresholds = &settings.thresholds;
    let mut partial = PartialStatus::new(Severity::Ok);
    let mut parts = Vec::new();

    if !settings.ignore_smart_status && !report.status_ok() {
        partial.escalate(Severity::Critical);
        parts.push("Status not OK".to_string());
    }

    if let Some(count) = report.reallocated_sectors {
        let floor = settings.ignore_bad_sectors.map(|n| n as f64);
        let severity = thresholds
            .reallocated_sector
            .evaluate_with_floor(count as f64, floor);
        if !severity.is_ok() {
            partial.escalate(severity);
            parts.push(format!("Bad sector count: {}", count));
        }
    }

    if let Some(temp) = report.temperature {
        let levels = thresholds.disk_temp;
        let severity = levels.evaluate(temp as f64);
        if !severity.is_ok() {
            partial.escalate(severity);
            parts.push(format!("Temp: {}°C", temp));
        }
        partial.perf =
            Some(PerfMetric::new(format!("Disk{}_temp", tray), temp as f64, levels).to_string());
    }

    if let Some(count) = report.pending_sectors {
        let severity = thresholds.current_pending_sector.evaluate(count as f64);
        if !severity.is_ok() {
            partial.escalate(severity);
            parts.push(format!("Unstable sector count: {}", count));
        }
    }

    if !parts.is_empty() {
        partial.text = Some(format!(
            "Disk {} ({}) {}",
            tray,
            report.model_label(),
            parts.join(", ")
        ));
    }
    partial
}
