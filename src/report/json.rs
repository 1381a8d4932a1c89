//! JSON output formatter

use super::{messages, ReportFormatter};
use crate::finding::{BatchReport, Severity};
use crate::rules::Rule;
use serde::Serialize;

/// JSON formatter for machine-readable output
pub struct JsonFormatter<'a> {
    rules: &'a [Rule],

    /// Pretty print with indentation
    pub pretty: bool,
}

impl<'a> JsonFormatter<'a> {
    pub fn new(rules: &'a [Rule]) -> Self {
        Self {
            rules,
            pretty: false,
        }
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    summary: JsonSummary<'a>,
    files: Vec<JsonFile<'a>>,
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    files_analyzed: usize,
    files_with_findings: usize,
    error_count: usize,
    warning_count: usize,
    info_count: usize,
    rules: Vec<JsonRuleTotal<'a>>,
}

#[derive(Serialize)]
struct JsonRuleTotal<'a> {
    rule_id: &'a str,
    severity: Severity,
    occurrences: usize,
    message: String,
}

#[derive(Serialize)]
struct JsonFile<'a> {
    path: String,
    findings: Vec<JsonFinding<'a>>,
}

#[derive(Serialize)]
struct JsonFinding<'a> {
    rule_id: &'a str,
    severity: Severity,
    count: usize,
    parameters: &'a [String],
    message: String,
}

impl ReportFormatter for JsonFormatter<'_> {
    fn format(&self, batch: &BatchReport) -> String {
        let rules = batch
            .totals(self.rules)
            .into_iter()
            .map(|t| JsonRuleTotal {
                rule_id: t.rule_id,
                severity: t.severity,
                occurrences: t.occurrences,
                message: messages::summarized(t.message_key, &[t.occurrences.to_string()]),
            })
            .collect();

        let files = batch
            .files
            .iter()
            .map(|file| JsonFile {
                path: file.path.display().to_string(),
                findings: file
                    .ordered(self.rules)
                    .into_iter()
                    .map(|f| JsonFinding {
                        rule_id: f.rule_id,
                        severity: f.severity,
                        count: f.count,
                        parameters: &f.parameters,
                        message: messages::detailed(f.message_key, &f.parameters),
                    })
                    .collect(),
            })
            .collect();

        let output = JsonOutput {
            summary: JsonSummary {
                files_analyzed: batch.files_processed(),
                files_with_findings: batch.files_with_findings(),
                error_count: batch.count_by_severity(Severity::Error),
                warning_count: batch.count_by_severity(Severity::Warning),
                info_count: batch.count_by_severity(Severity::Info),
                rules,
            },
            files,
        };

        let rendered = if self.pretty {
            serde_json::to_string_pretty(&output)
        } else {
            serde_json::to_string(&output)
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::FileReport;
    use crate::rules::{self, builtin_rules};
    use std::path::Path;

    #[test]
    fn test_json_output() {
        let mut file = FileReport::new(Path::new("a.xhtml"));
        file.set(&rules::A4J_RERENDER, 3, vec!["3".into()]);
        let mut batch = BatchReport::default();
        batch.push(file);

        let output = JsonFormatter::new(builtin_rules()).pretty().format(&batch);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["summary"]["files_analyzed"], 1);
        assert_eq!(value["summary"]["warning_count"], 3);
        assert_eq!(value["summary"]["rules"][0]["rule_id"], "a4j-rerender");
        assert_eq!(value["files"][0]["findings"][0]["count"], 3);
        assert_eq!(value["files"][0]["findings"][0]["severity"], "warning");
    }

    #[test]
    fn test_compact_output_is_single_line() {
        let output = JsonFormatter::new(builtin_rules()).format(&BatchReport::default());
        assert!(!output.contains('\n'));
    }
}
