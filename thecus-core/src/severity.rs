//! Severity scale shared by every check routine
//!
//! The variant order is the escalation order used when partial results are
//! merged: `Ok < Warning < Unknown < Critical`. UNKNOWN outranks WARNING so a
//! sub-check that could not be evaluated is never hidden by a later warning,
//! while a real CRITICAL finding still wins over it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health verdict consumed by the monitoring supervisor
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Ok,
    Warning,
    Unknown,
    Critical,
}

impl Severity {
    /// Process exit code expected by the plugin protocol
    pub fn exit_code(self) -> i32 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
            Severity::Unknown => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Unknown => "UNKNOWN",
        }
    }

    /// Returns the more severe of the two under the escalation order
    pub fn escalate(self, other: Severity) -> Severity {
        self.max(other)
    }

    pub fn is_ok(self) -> bool {
        self == Severity::Ok
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
