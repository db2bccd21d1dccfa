//! Decoded device responses
//!
//! The device web UI answers with loosely-typed JSON whose fields differ per
//! firmware. `DeviceResponse` never assumes a schema: it only answers
//! "does field X exist" and "read field X" questions. A JSON `null` counts as
//! absent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?\d+(?:\.\d+)?)").expect("Invalid leading number regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceResponse(Value);

impl DeviceResponse {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Decodes a response body; empty bodies are rejected
    pub fn parse(body: &str) -> Result<Self, String> {
        if body.trim().is_empty() {
            return Err("empty body".to_string());
        }
        serde_json::from_str(body)
            .map(Self)
            .map_err(|e| e.to_string())
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Field rendered as text; numbers and booleans are stringified
    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field).and_then(value_text)
    }

    /// Field read as a number; numeric strings with a trailing unit
    /// (`"97%"`) are accepted
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(value_number)
    }

    /// Number truncated toward zero, the way the web UI reports counters
    pub fn integer(&self, field: &str) -> Option<i64> {
        self.number(field).map(|n| n.trunc() as i64)
    }

    /// First of several alternative field names that is present
    pub fn first_number(&self, fields: &[&str]) -> Option<f64> {
        fields.iter().find_map(|field| self.number(field))
    }

    /// Entries of an array field, each wrapped as its own response
    pub fn items(&self, field: &str) -> Vec<DeviceResponse> {
        match self.get(field) {
            Some(Value::Array(entries)) => entries.iter().cloned().map(DeviceResponse).collect(),
            _ => Vec::new(),
        }
    }

    /// Iterates `prefix{n}`, `prefix{n+1}`, ... until the first missing name
    pub fn probe<'a>(&'a self, prefix: &'a str, start: u32) -> Probe<'a> {
        Probe {
            response: self,
            prefix,
            next: start,
        }
    }
}

/// Sparse field scan produced by [`DeviceResponse::probe`]
pub struct Probe<'a> {
    response: &'a DeviceResponse,
    prefix: &'a str,
    next: u32,
}

impl<'a> Iterator for Probe<'a> {
    type Item = (u32, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next;
        let value = self.response.get(&format!("{}{}", self.prefix, index))?;
        self.next += 1;
        Some((index, value))
    }
}

pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        _ => None,
    }
}

pub fn leading_number(text: &str) -> Option<f64> {
    LEADING_NUMBER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_counts_as_absent() {
        let response = DeviceResponse::new(json!({"a": null, "b": "x"}));
        assert!(!response.has("a"));
        assert!(response.has("b"));
        assert!(!response.has("c"));
    }

    #[test]
    fn test_numbers_from_strings() {
        let response = DeviceResponse::new(json!({
            "cpu_loading": "97%",
            "attr": "12",
            "float": 3.5,
            "bad": "n/a"
        }));
        assert_eq!(response.number("cpu_loading"), Some(97.0));
        assert_eq!(response.integer("attr"), Some(12));
        assert_eq!(response.integer("float"), Some(3));
        assert_eq!(response.number("bad"), None);
        assert_eq!(response.first_number(&["missing", "attr"]), Some(12.0));
    }

    #[test]
    fn test_probe_stops_at_first_miss() {
        let response = DeviceResponse::new(json!({
            "sys_fan_speed2": "OK",
            "sys_fan_speed3": "Fail",
            "sys_fan_speed5": "OK"
        }));
        let found: Vec<u32> = response.probe("sys_fan_speed", 2).map(|(n, _)| n).collect();
        assert_eq!(found, vec![2, 3]);
    }

    #[test]
    fn test_parse_rejects_empty_and_malformed() {
        assert!(DeviceResponse::parse("").is_err());
        assert!(DeviceResponse::parse("   \n").is_err());
        assert!(DeviceResponse::parse("<html>").is_err());
        assert!(DeviceResponse::parse(r#"{"ok": true}"#).is_ok());
    }

    #[test]
    fn test_items() {
        let response = DeviceResponse::new(json!({"raid_list": [{"raid_id": "md0"}, {"raid_id": "md1"}]}));
        let ids: Vec<String> = response
            .items("raid_list")
            .iter()
            .filter_map(|r| r.text("raid_id"))
            .collect();
        assert_eq!(ids, vec!["md0", "md1"]);
        assert!(response.items("missing").is_empty());
    }
}
