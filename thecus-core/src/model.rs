//! Common status records built from firmware-specific response shapes
//!
//! Different Thecus generations name and number the same things differently.
//! Each record below picks its shape variant from the fields that are present
//! and maps it to one internal representation, so check routines never branch
//! on the device model.

use crate::device::{value_text, DeviceResponse};
use crate::severity::Severity;
use tracing::debug;

/// Model string the device reports for slots/endpoints that do not apply
pub const PLACEHOLDER: &str = "N/A";

/// How the system fans are numbered in the `systatus` response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanLayout {
    /// `sys_fan_speed`, `sys_fan_speed2`, `sys_fan_speed3`, ... (N5500)
    Numbered,
    /// `sys_fan_speed1`, `sys_fan_speed2`, ...
    Indexed,
    /// No system fan fields at all
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FanReading {
    pub index: u32,
    pub state: String,
}

impl FanReading {
    pub fn is_ok(&self) -> bool {
        self.state == "OK"
    }
}

/// Hardware status from the `systatus` endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct SystemStatus {
    pub fan_layout: FanLayout,
    pub cpu_fan: Option<String>,
    pub fans: Vec<FanReading>,
    pub cpu_load: Option<f64>,
    pub memory_percent: Option<f64>,
    pub uptime: Option<String>,
}

impl SystemStatus {
    pub fn from_response(response: &DeviceResponse) -> Self {
        let fan_layout = if response.has("sys_fan_speed") || response.has("sys_fan_speed2") {
            FanLayout::Numbered
        } else if response.has("sys_fan_speed1") {
            FanLayout::Indexed
        } else {
            FanLayout::None
        };

        let mut fans = Vec::new();
        match fan_layout {
            FanLayout::Numbered => {
                if let Some(state) = response.text("sys_fan_speed") {
                    fans.push(FanReading { index: 1, state });
                }
                fans.extend(probe_fans(response, 2));
            }
            FanLayout::Indexed => fans.extend(probe_fans(response, 1)),
            FanLayout::None => {}
        }
        debug!("system status: {:?} fan layout, {} fans", fan_layout, fans.len());

        Self {
            fan_layout,
            cpu_fan: response.text("cpu_fan"),
            fans,
            cpu_load: response.number("cpu_loading").map(f64::trunc),
            memory_percent: memory_percent(response),
            uptime: response.text("up_time").or_else(|| response.text("uptime")),
        }
    }
}

fn probe_fans(response: &DeviceResponse, start: u32) -> Vec<FanReading> {
    response
        .probe("sys_fan_speed", start)
        .map(|(index, value)| FanReading {
            index,
            state: value_text(value).unwrap_or_default(),
        })
        .collect()
}

fn memory_percent(response: &DeviceResponse) -> Option<f64> {
    if let Some(percent) = response.first_number(&["mem_loading", "mem_usage", "memory_usage"]) {
        return Some(percent);
    }

    let total = response.number("mem_total")?;
    if total <= 0.0 {
        return None;
    }
    let used = match response.number("mem_used") {
        Some(used) => used,
        None => total - response.number("mem_free")?,
    };
    Some(round2(used / total * 100.0))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// RAID (and RAID access) state strings the web UI uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaidState {
    Healthy,
    Degraded,
    Damaged,
    Other(String),
}

impl RaidState {
    pub fn parse(status: &str) -> Self {
        match status {
            "Healthy" => RaidState::Healthy,
            "Degraded" => RaidState::Degraded,
            "Damaged" => RaidState::Damaged,
            other => RaidState::Other(other.to_string()),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            RaidState::Healthy => Severity::Ok,
            RaidState::Degraded => Severity::Warning,
            RaidState::Damaged => Severity::Critical,
            RaidState::Other(_) => Severity::Unknown,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            RaidState::Healthy => "Healthy",
            RaidState::Degraded => "Degraded",
            RaidState::Damaged => "Damaged",
            RaidState::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaidVolume {
    pub id: String,
    pub state: RaidState,
    pub capacity: Option<String>,
}

/// Volumes from the `getraidlist` response
pub fn raid_volumes(response: &DeviceResponse) -> Vec<RaidVolume> {
    response
        .items("raid_list")
        .iter()
        .enumerate()
        .map(|(i, raid)| RaidVolume {
            id: raid.text("raid_id").unwrap_or_else(|| format!("RAID{}", i)),
            state: RaidState::parse(&raid.text("raid_status").unwrap_or_default()),
            capacity: raid.text("data_capacity"),
        })
        .collect()
}

/// Access status from `getAccessStatus`; older units do not report one
pub fn raid_access_state(response: &DeviceResponse) -> Option<RaidState> {
    response.text("status").map(|s| RaidState::parse(&s))
}

/// How a disk entry identifies its slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskNumbering {
    /// `trayno` and `diskno` both present
    Tray,
    /// Only `diskno`; the tray is the disk number
    DiskOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskState {
    NotPresent,
    Critical,
    Warning,
    /// `OK`, `Detected` and whatever else the firmware reports for usable disks
    Healthy(String),
}

impl DiskState {
    pub fn parse(status: &str) -> Self {
        match status {
            PLACEHOLDER => DiskState::NotPresent,
            "Critical" => DiskState::Critical,
            "Warning" => DiskState::Warning,
            other => DiskState::Healthy(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskEntry {
    pub tray: String,
    pub disk: String,
    pub numbering: DiskNumbering,
    pub state: DiskState,
}

/// Disks from the `disks` response
pub fn disk_entries(response: &DeviceResponse) -> Vec<DiskEntry> {
    let mut entries = Vec::new();
    for item in response.items("disk_data") {
        let state = item
            .text("s_status")
            .or_else(|| item.text("status"))
            .map(|status| DiskState::parse(&status))
            .unwrap_or_else(|| DiskState::Healthy(String::new()));

        let (tray, disk, numbering) = match (item.text("trayno"), item.text("diskno")) {
            (Some(tray), Some(disk)) => (tray, disk, DiskNumbering::Tray),
            (None, Some(disk)) => (disk.clone(), disk, DiskNumbering::DiskOnly),
            (Some(tray), None) => (tray.clone(), tray, DiskNumbering::Tray),
            (None, None) => {
                debug!("skipping disk entry without tray or disk number");
                continue;
            }
        };

        entries.push(DiskEntry {
            tray,
            disk,
            numbering,
            state,
        });
    }
    entries
}

/// SMART attributes of one disk
#[derive(Debug, Clone, PartialEq)]
pub struct SmartReport {
    pub model: Option<String>,
    pub smart_status: Option<f64>,
    /// ATTR5
    pub reallocated_sectors: Option<i64>,
    /// ATTR194
    pub temperature: Option<i64>,
    /// ATTR197
    pub pending_sectors: Option<i64>,
}

impl SmartReport {
    pub fn from_response(response: &DeviceResponse) -> Self {
        Self {
            model: response.text("model"),
            smart_status: response.number("smart_status"),
            reallocated_sectors: response.integer("ATTR5"),
            temperature: response.integer("ATTR194"),
            pending_sectors: response.integer("ATTR197"),
        }
    }

    /// Syntactically valid answer from an endpoint that does not apply to
    /// this disk
    pub fn is_placeholder(&self) -> bool {
        match self.model.as_deref() {
            Some(model) => model.trim().is_empty() || model == PLACEHOLDER,
            None => true,
        }
    }

    pub fn status_ok(&self) -> bool {
        self.smart_status == Some(0.0)
    }

    pub fn model_label(&self) -> &str {
        self.model.as_deref().unwrap_or(PLACEHOLDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbered_fan_layout() {
        let response = DeviceResponse::new(json!({
            "cpu_fan": "OK",
            "sys_fan_speed": "OK",
            "sys_fan_speed2": "Fail",
            "cpu_loading": "12.7"
        }));
        let status = SystemStatus::from_response(&response);
        assert_eq!(status.fan_layout, FanLayout::Numbered);
        assert_eq!(status.fans.len(), 2);
        assert_eq!(status.fans[1], FanReading { index: 2, state: "Fail".into() });
        assert_eq!(status.cpu_load, Some(12.0));
    }

    #[test]
    fn test_indexed_fan_layout() {
        let response = DeviceResponse::new(json!({
            "sys_fan_speed1": "OK",
            "sys_fan_speed2": "OK",
            "sys_fan_speed3": "OK"
        }));
        let status = SystemStatus::from_response(&response);
        assert_eq!(status.fan_layout, FanLayout::Indexed);
        assert_eq!(status.fans.iter().map(|f| f.index).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(status.cpu_fan, None);
    }

    #[test]
    fn test_memory_percent_variants() {
        let direct = DeviceResponse::new(json!({"mem_usage": "41"}));
        assert_eq!(SystemStatus::from_response(&direct).memory_percent, Some(41.0));

        let computed = DeviceResponse::new(json!({"mem_total": 2048, "mem_free": 512}));
        assert_eq!(SystemStatus::from_response(&computed).memory_percent, Some(75.0));

        let none = DeviceResponse::new(json!({"mem_total": 0, "mem_free": 0}));
        assert_eq!(SystemStatus::from_response(&none).memory_percent, None);
    }

    #[test]
    fn test_disk_numbering_variants() {
        let response = DeviceResponse::new(json!({"disk_data": [
            {"trayno": "1", "diskno": "a", "s_status": "OK"},
            {"diskno": "3", "status": "Warning"},
            {"trayno": "4", "diskno": "d", "s_status": "N/A"},
            {"model": "orphan"}
        ]}));
        let disks = disk_entries(&response);
        assert_eq!(disks.len(), 3);
        assert_eq!(disks[0].numbering, DiskNumbering::Tray);
        assert_eq!(disks[0].state, DiskState::Healthy("OK".into()));
        assert_eq!(disks[1].numbering, DiskNumbering::DiskOnly);
        assert_eq!(disks[1].tray, "3");
        assert_eq!(disks[1].state, DiskState::Warning);
        assert_eq!(disks[2].state, DiskState::NotPresent);
    }

    #[test]
    fn test_disk_without_status_still_gets_smart() {
        let response = DeviceResponse::new(json!({"disk_data": [
            {"trayno": "1", "diskno": "a"}
        ]}));
        let disks = disk_entries(&response);
        assert_eq!(disks.len(), 1);
        assert_eq!(disks[0].state, DiskState::Healthy(String::new()));
    }

    #[test]
    fn test_smart_placeholder_and_status() {
        let placeholder = SmartReport::from_response(&DeviceResponse::new(json!({"model": "N/A"})));
        assert!(placeholder.is_placeholder());

        let real = SmartReport::from_response(&DeviceResponse::new(json!({
            "model": "WDC WD20EFRX",
            "smart_status": 0,
            "ATTR5": "0",
            "ATTR194": "38",
            "ATTR197": "0"
        })));
        assert!(!real.is_placeholder());
        assert!(real.status_ok());
        assert_eq!(real.temperature, Some(38));
    }

    #[test]
    fn test_raid_state_severity() {
        assert_eq!(RaidState::parse("Damaged").severity(), Severity::Critical);
        assert_eq!(RaidState::parse("Degraded").severity(), Severity::Warning);
        assert_eq!(RaidState::parse("Healthy").severity(), Severity::Ok);
        assert_eq!(RaidState::parse("Rebuilding").severity(), Severity::Unknown);
        assert_eq!(RaidState::parse("Rebuilding").label(), "Rebuilding");
    }
}
