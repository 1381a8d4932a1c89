//! Finding types for migration results

use crate::rules::Rule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Severity level for findings
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, usually migrated automatically
    Info,
    /// Needs a look after migration
    #[default]
    Warning,
    /// Must be migrated by hand
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "hint" | "note" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            _ => Err(()),
        }
    }
}

/// One rule's detection result for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Rule that produced the finding
    pub rule_id: &'static str,
    /// Severity copied from the rule
    pub severity: Severity,
    /// Message key used by the report formatter
    pub message_key: &'static str,
    /// Number of occurrences in the file
    pub count: usize,
    /// Display parameters, in message placeholder order
    pub parameters: Vec<String>,
}

impl Finding {
    pub fn new(rule: &Rule, count: usize, parameters: Vec<String>) -> Self {
        Self {
            rule_id: rule.id,
            severity: rule.severity,
            message_key: rule.message_key,
            count,
            parameters,
        }
    }
}

/// All findings for a single template
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub findings: BTreeMap<&'static str, Finding>,
}

impl FileReport {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            findings: BTreeMap::new(),
        }
    }

    /// Record one more occurrence of a rule.
    ///
    /// The parameters of the first occurrence are kept.
    pub fn record(&mut self, rule: &Rule, parameters: Vec<String>) {
        self.findings
            .entry(rule.id)
            .and_modify(|f| f.count += 1)
            .or_insert_with(|| Finding::new(rule, 1, parameters));
    }

    /// Replace the finding for a rule
    pub fn set(&mut self, rule: &Rule, count: usize, parameters: Vec<String>) {
        self.findings
            .insert(rule.id, Finding::new(rule, count, parameters));
    }

    pub fn get(&self, rule_id: &str) -> Option<&Finding> {
        self.findings.get(rule_id)
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Occurrence count for a rule, 0 when it did not fire
    pub fn count(&self, rule_id: &str) -> usize {
        self.findings.get(rule_id).map(|f| f.count).unwrap_or(0)
    }

    /// Occurrences of all rules together
    pub fn total(&self) -> usize {
        self.findings.values().map(|f| f.count).sum()
    }

    /// Highest severity among the findings
    pub fn max_severity(&self) -> Option<Severity> {
        self.findings.values().map(|f| f.severity).max()
    }

    /// Findings in rule table order; findings of rules missing from the
    /// table come last
    pub fn ordered(&self, rules: &[Rule]) -> Vec<&Finding> {
        let mut out: Vec<&Finding> = rules
            .iter()
            .filter_map(|r| self.findings.get(r.id))
            .collect();
        out.extend(
            self.findings
                .values()
                .filter(|f| !rules.iter().any(|r| r.id == f.rule_id)),
        );
        out
    }
}

/// Per-rule total across a batch
#[derive(Debug, Clone, Serialize)]
pub struct RuleTotal {
    pub rule_id: &'static str,
    pub severity: Severity,
    pub message_key: &'static str,
    pub occurrences: usize,
}

/// Result of processing a list of templates
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,

    /// Wall time of the run
    #[serde(skip)]
    pub duration: Duration,
}

impl BatchReport {
    pub fn push(&mut self, report: FileReport) {
        self.files.push(report);
    }

    pub fn files_processed(&self) -> usize {
        self.files.len()
    }

    /// Files with at least one finding
    pub fn files_with_findings(&self) -> usize {
        self.files.iter().filter(|f| !f.is_empty()).count()
    }

    /// Occurrence totals per rule, in rule table order, skipping rules that
    /// never fired
    pub fn totals(&self, rules: &[Rule]) -> Vec<RuleTotal> {
        rules
            .iter()
            .filter_map(|rule| {
                let occurrences: usize = self.files.iter().map(|f| f.count(rule.id)).sum();
                (occurrences > 0).then_some(RuleTotal {
                    rule_id: rule.id,
                    severity: rule.severity,
                    message_key: rule.message_key,
                    occurrences,
                })
            })
            .collect()
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.files
            .iter()
            .flat_map(|f| f.findings.values())
            .filter(|f| f.severity == severity)
            .map(|f| f.count)
            .sum()
    }

    /// Exit code (0 = clean, 1 = warnings, 2 = errors)
    pub fn exit_code(&self) -> i32 {
        if self.count_by_severity(Severity::Error) > 0 {
            2
        } else if self.count_by_severity(Severity::Warning) > 0 {
            1
        } else {
            0
        }
    }
}
