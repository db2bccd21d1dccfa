//! Status aggregation for one check run
//!
//! Every sub-check (fans, RAID, each disk, ...) reports independently. The
//! aggregator keeps:
//! - the escalation-max of all reported severities
//! - every status text, in report order
//! - every perfdata token, in report order

use crate::severity::Severity;
use tracing::trace;

/// Final state of a check run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateResult {
    pub severity: Severity,
    pub texts: Vec<String>,
    pub perf_metrics: Vec<String>,
}

impl AggregateResult {
    /// Status texts joined the way the plugin line shows them
    pub fn text_line(&self) -> String {
        self.texts.join(", ")
    }

    /// Perfdata tokens joined the way the plugin line shows them
    pub fn perf_line(&self) -> String {
        self.perf_metrics.join(" ")
    }
}

/// Result of a single sub-check before it is handed to the aggregator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialStatus {
    pub severity: Severity,
    pub text: Option<String>,
    pub perf: Option<String>,
}

impl PartialStatus {
    pub fn new(severity: Severity) -> Self {
        Self {
            severity,
            text: None,
            perf: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_perf(mut self, perf: impl Into<String>) -> Self {
        self.perf = Some(perf.into());
        self
    }

    /// Raises the severity to at least `floor`
    pub fn floor(mut self, floor: Severity) -> Self {
        self.escalate(floor);
        self
    }

    pub fn escalate(&mut self, severity: Severity) {
        self.severity = self.severity.escalate(severity);
    }
}

#[derive(Debug, Default)]
pub struct StatusAggregator {
    result: AggregateResult,
}

impl StatusAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one contribution. Never fails.
    pub fn report(&mut self, severity: Severity, text: Option<String>, perf: Option<String>) {
        let current = self.result.severity;
        self.result.severity = current.escalate(severity);
        trace!(
            "report {} -> {} (text: {:?}, perf: {:?})",
            severity,
            self.result.severity,
            text,
            perf
        );

        if let Some(text) = text {
            self.result.texts.push(text);
        }
        if let Some(perf) = perf {
            self.result.perf_metrics.push(perf);
        }
    }

    pub fn report_partial(&mut self, partial: PartialStatus) {
        self.report(partial.severity, partial.text, partial.perf);
    }

    pub fn severity(&self) -> Severity {
        self.result.severity
    }

    pub fn has_texts(&self) -> bool {
        !self.result.texts.is_empty()
    }

    /// Current state, unchanged
    pub fn finalize(&self) -> AggregateResult {
        self.result.clone()
    }

    pub fn into_result(self) -> AggregateResult {
        self.result
    }
}
