//! Plugin output line: `STATUS - text, text | perf perf`

use thecus_core::{AggregateResult, Severity};

const NO_TEXT: &str = "System working fine";

pub fn render(result: &AggregateResult) -> String {
    let mut line = format!("{} - ", result.severity);
    if result.texts.is_empty() {
        line.push_str(NO_TEXT);
    } else {
        line.push_str(&result.text_line());
    }
    if !result.perf_metrics.is_empty() {
        line.push_str(" | ");
        line.push_str(&result.perf_line());
    }
    line
}

/// Result standing in for a run that never reached the device
pub fn failure(message: impl Into<String>) -> AggregateResult {
    AggregateResult {
        severity: Severity::Unknown,
        texts: vec![message.into()],
        perf_metrics: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_perf() {
        let result = AggregateResult {
            severity: Severity::Critical,
            texts: vec!["CPU usage: 97%".into()],
            perf_metrics: vec!["CPU=97;90;95;0;100".into()],
        };
        assert_eq!(render(&result), "CRITICAL - CPU usage: 97% | CPU=97;90;95;0;100");
        assert_eq!(result.severity.exit_code(), 2);
    }

    #[test]
    fn test_render_without_text() {
        let result = AggregateResult {
            severity: Severity::Warning,
            texts: Vec::new(),
            perf_metrics: vec!["Disk1_temp=36;55;60".into(), "Disk2_temp=37;55;60".into()],
        };
        assert_eq!(
            render(&result),
            "WARNING - System working fine | Disk1_temp=36;55;60 Disk2_temp=37;55;60"
        );
    }

    #[test]
    fn test_failure_line() {
        let result = failure("Hostname missing. Use --help for usage information.");
        assert_eq!(
            render(&result),
            "UNKNOWN - Hostname missing. Use --help for usage information."
        );
        assert_eq!(result.severity.exit_code(), 3);
    }
}
