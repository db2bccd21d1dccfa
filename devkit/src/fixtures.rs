/*!
Device JSON fixtures

Builders for the payloads Thecus firmware returns, shaped like the N5500
answers unless stated otherwise.
*/

use serde_json::{json, Map, Value};

pub struct DeviceFixtures;

impl DeviceFixtures {
    /// Login accepted
    pub fn login_ok() -> Value {
        json!({"success": "true"})
    }

    pub fn login_rejected(message: &str) -> Value {
        json!({"success": "false", "errormsg": {"msg": message}})
    }

    /// `systatus` with numbered system fans (`sys_fan_speed`, `sys_fan_speed2`, ...)
    pub fn system_status(cpu_fan: &str, fans: &[&str], cpu_loading: u32) -> Value {
        let mut status = Map::new();
        status.insert("cpu_fan".into(), json!(cpu_fan));
        for (i, state) in fans.iter().enumerate() {
            let key = if i == 0 {
                "sys_fan_speed".to_string()
            } else {
                format!("sys_fan_speed{}", i + 1)
            };
            status.insert(key, json!(state));
        }
        status.insert("cpu_loading".into(), json!(cpu_loading.to_string()));
        status.insert("mem_loading".into(), json!("37"));
        status.insert("up_time".into(), json!("12 days 3 hours 4 mins"));
        Value::Object(status)
    }

    pub fn system_healthy() -> Value {
        Self::system_status("OK", &["OK", "OK"], 3)
    }

    pub fn raid_access(status: &str) -> Value {
        json!({"status": status})
    }

    /// `getraidlist` from `(raid_id, raid_status, data_capacity)` triples
    pub fn raid_list(volumes: &[(&str, &str, &str)]) -> Value {
        let list: Vec<Value> = volumes
            .iter()
            .map(|(id, status, capacity)| {
                json!({
                    "raid_id": id,
                    "raid_status": status,
                    "data_capacity": capacity
                })
            })
            .collect();
        json!({"raid_list": list})
    }

    /// `disks` from `(trayno, diskno, s_status)` triples
    pub fn disks(disks: &[(&str, &str, &str)]) -> Value {
        let list: Vec<Value> = disks
            .iter()
            .map(|(tray, disk, status)| {
                json!({
                    "trayno": tray,
                    "diskno": disk,
                    "s_status": status,
                    "model": "WDC WD40EFRX"
                })
            })
            .collect();
        json!({"disk_data": list})
    }

    pub fn smart(model: &str, smart_status: u32, attr5: u32, attr194: u32, attr197: u32) -> Value {
        json!({
            "model": model,
            "smart_status": smart_status,
            "ATTR5": attr5.to_string(),
            "ATTR194": attr194.to_string(),
            "ATTR197": attr197.to_string()
        })
    }

    pub fn smart_healthy(model: &str) -> Value {
        Self::smart(model, 0, 0, 36, 0)
    }

    /// What firmware answers for SMART parameters it does not understand
    pub fn smart_placeholder() -> Value {
        json!({"model": "N/A", "smart_status": "N/A"})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_numbering() {
        let status = DeviceFixtures::system_status("OK", &["OK", "Fail", "OK"], 5);
        assert_eq!(status["sys_fan_speed"], "OK");
        assert_eq!(status["sys_fan_speed2"], "Fail");
        assert_eq!(status["sys_fan_speed3"], "OK");
        assert!(status.get("sys_fan_speed1").is_none());
    }

    #[test]
    fn test_disk_list_shape() {
        let disks = DeviceFixtures::disks(&[("1", "a", "OK")]);
        assert_eq!(disks["disk_data"][0]["trayno"], "1");
        assert_eq!(disks["disk_data"][0]["s_status"], "OK");
    }
}
