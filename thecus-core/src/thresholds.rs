//! Warning/critical thresholds and the shared evaluation policy
//!
//! Thresholds are resolved once (defaults overridden by configuration) before
//! any device query runs and stay immutable for the rest of the run. An unset
//! level is never triggered.

use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Identifies which measured quantity a threshold pair applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    CpuUsage,
    MemUsage,
    DiskUsage,
    DiskTemp,
    ReallocatedSector,
    CurrentPendingSector,
    Uptime,
}

impl ThresholdKind {
    pub const ALL: [ThresholdKind; 7] = [
        ThresholdKind::CpuUsage,
        ThresholdKind::MemUsage,
        ThresholdKind::DiskUsage,
        ThresholdKind::DiskTemp,
        ThresholdKind::ReallocatedSector,
        ThresholdKind::CurrentPendingSector,
        ThresholdKind::Uptime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ThresholdKind::CpuUsage => "cpu_usage",
            ThresholdKind::MemUsage => "mem_usage",
            ThresholdKind::DiskUsage => "disk_usage",
            ThresholdKind::DiskTemp => "disk_temp",
            ThresholdKind::ReallocatedSector => "reallocated_sector",
            ThresholdKind::CurrentPendingSector => "current_pending_sector",
            ThresholdKind::Uptime => "uptime",
        }
    }
}

/// Warning and critical levels for one quantity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub warn: Option<f64>,
    pub crit: Option<f64>,
}

impl ThresholdPair {
    pub fn new(warn: Option<f64>, crit: Option<f64>) -> Self {
        Self { warn, crit }
    }

    pub fn levels(warn: f64, crit: f64) -> Self {
        Self::new(Some(warn), Some(crit))
    }

    /// Upper-bound evaluation: the higher the value, the worse
    pub fn evaluate(&self, value: f64) -> Severity {
        let severity = match (self.crit, self.warn) {
            (Some(crit), _) if value >= crit => Severity::Critical,
            (_, Some(warn)) if value >= warn => Severity::Warning,
            _ => Severity::Ok,
        };
        debug!(
            "threshold evaluated: {} against warn={:?} crit={:?} -> {}",
            value, self.warn, self.crit, severity
        );
        severity
    }

    /// Lower-bound evaluation: the lower the value, the worse
    pub fn evaluate_at_most(&self, value: f64) -> Severity {
        let severity = match (self.crit, self.warn) {
            (Some(crit), _) if value <= crit => Severity::Critical,
            (_, Some(warn)) if value <= warn => Severity::Warning,
            _ => Severity::Ok,
        };
        debug!(
            "threshold evaluated (at most): {} against warn={:?} crit={:?} -> {}",
            value, self.warn, self.crit, severity
        );
        severity
    }

    /// Like [`evaluate`](Self::evaluate), but values below `floor` are not
    /// compared at all
    pub fn evaluate_with_floor(&self, value: f64, floor: Option<f64>) -> Severity {
        match floor {
            Some(floor) if value < floor => {
                debug!("threshold skipped: {} is below ignore floor {}", value, floor);
                Severity::Ok
            }
            _ => self.evaluate(value),
        }
    }
}

/// Thresholds for every kind, defaults taken from the Thecus manual where it
/// defines one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub cpu_usage: ThresholdPair,
    pub mem_usage: ThresholdPair,
    pub disk_usage: ThresholdPair,
    pub disk_temp: ThresholdPair,
    pub reallocated_sector: ThresholdPair,
    pub current_pending_sector: ThresholdPair,
    pub uptime: ThresholdPair,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_usage: ThresholdPair::levels(95.0, 98.0),
            mem_usage: ThresholdPair::levels(90.0, 95.0),
            disk_usage: ThresholdPair::levels(80.0, 90.0),
            disk_temp: ThresholdPair::levels(55.0, 60.0),
            reallocated_sector: ThresholdPair::levels(32.0, 320.0),
            current_pending_sector: ThresholdPair::levels(1.0, 1.0),
            // seconds since boot, lower is worse
            uptime: ThresholdPair::levels(1200.0, 300.0),
        }
    }
}

impl Thresholds {
    pub fn get(&self, kind: ThresholdKind) -> ThresholdPair {
        *self.slot(kind)
    }

    pub fn set(&mut self, kind: ThresholdKind, pair: ThresholdPair) {
        *self.slot_mut(kind) = pair;
    }

    /// Overrides only the levels that are given
    pub fn override_levels(&mut self, kind: ThresholdKind, warn: Option<f64>, crit: Option<f64>) {
        let slot = self.slot_mut(kind);
        if warn.is_some() {
            slot.warn = warn;
        }
        if crit.is_some() {
            slot.crit = crit;
        }
    }

    fn slot(&self, kind: ThresholdKind) -> &ThresholdPair {
        match kind {
            ThresholdKind::CpuUsage => &self.cpu_usage,
            ThresholdKind::MemUsage => &self.mem_usage,
            ThresholdKind::DiskUsage => &self.disk_usage,
            ThresholdKind::DiskTemp => &self.disk_temp,
            ThresholdKind::ReallocatedSector => &self.reallocated_sector,
            ThresholdKind::CurrentPendingSector => &self.current_pending_sector,
            ThresholdKind::Uptime => &self.uptime,
        }
    }

    fn slot_mut(&mut self, kind: ThresholdKind) -> &mut ThresholdPair {
        match kind {
            ThresholdKind::CpuUsage => &mut self.cpu_usage,
            ThresholdKind::MemUsage => &mut self.mem_usage,
            ThresholdKind::DiskUsage => &mut self.disk_usage,
            ThresholdKind::DiskTemp => &mut self.disk_temp,
            ThresholdKind::ReallocatedSector => &mut self.reallocated_sector,
            ThresholdKind::CurrentPendingSector => &mut self.current_pending_sector,
            ThresholdKind::Uptime => &mut self.uptime,
        }
    }
}

/// One perfdata token: `label=value[unit];warn;crit[;min;max]`
#[derive(Debug, Clone, PartialEq)]
pub struct PerfMetric {
    label: String,
    value: f64,
    unit: &'static str,
    levels: ThresholdPair,
    range: Option<(Option<f64>, Option<f64>)>,
}

impl PerfMetric {
    pub fn new(label: impl Into<String>, value: f64, levels: ThresholdPair) -> Self {
        Self {
            label: label.into(),
            value,
            unit: "",
            levels,
            range: None,
        }
    }

    pub fn unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.range = Some((min, max));
        self
    }

    /// Percentages are bounded to 0..100
    pub fn percent(self) -> Self {
        self.range(Some(0.0), Some(100.0))
    }
}

impl fmt::Display for PerfMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}{};{};{}",
            self.label,
            self.value,
            self.unit,
            optional_number(self.levels.warn),
            optional_number(self.levels.crit)
        )?;
        if let Some((min, max)) = self.range {
            write!(f, ";{};{}", optional_number(min), optional_number(max))?;
        }
        Ok(())
    }
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
