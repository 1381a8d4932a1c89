//! Human-readable migration report

use super::{messages, ReportFormatter};
use crate::finding::{BatchReport, FileReport, Severity};
use crate::rules::Rule;
use colored::*;
use std::path::{Path, PathBuf};

const BANNER: &str = "##############################\n\
                      # Migration report for JSF 2 #\n\
                      ##############################\n";

/// Text formatter with optional color support
pub struct TextFormatter<'a> {
    rules: &'a [Rule],

    /// Enable colored output
    pub colored: bool,

    /// File paths are shown relative to this directory when set
    pub base: Option<PathBuf>,
}

impl<'a> TextFormatter<'a> {
    pub fn new(rules: &'a [Rule]) -> Self {
        Self {
            rules,
            colored: false,
            base: None,
        }
    }

    pub fn with_color(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    pub fn with_base(mut self, base: &Path) -> Self {
        self.base = Some(base.to_path_buf());
        self
    }

    fn severity_str(&self, severity: Severity) -> ColoredString {
        let s = format!("[{}]", severity);
        if !self.colored {
            return s.normal();
        }
        match severity {
            Severity::Error => s.red().bold(),
            Severity::Warning => s.yellow().bold(),
            Severity::Info => s.blue(),
        }
    }

    fn display_path(&self, path: &Path) -> String {
        self.base
            .as_deref()
            .and_then(|base| path.strip_prefix(base).ok())
            .unwrap_or(path)
            .display()
            .to_string()
    }

    /// The `Summary` section: files analysed and per-rule totals
    pub fn format_summary(&self, batch: &BatchReport) -> String {
        let mut output = String::from("Summary\n#######\n");
        output.push_str(&format!(
            "Number of files analyzed : {}\n",
            batch.files_processed()
        ));

        for total in batch.totals(self.rules) {
            let params = vec![total.occurrences.to_string()];
            output.push_str(&format!(
                " * {} {}\n",
                self.severity_str(total.severity),
                messages::summarized(total.message_key, &params)
            ));
        }
        output
    }

    /// Detail block of one file
    pub fn format_file(&self, file: &FileReport) -> String {
        let name = self.display_path(&file.path);
        let mut output = String::new();
        if self.colored {
            output.push_str(&format!("{}\n", name.underline()));
        } else {
            output.push_str(&format!("{}\n", name));
        }
        output.push_str(&"-".repeat(name.chars().count()));
        output.push('\n');

        if file.is_empty() {
            output.push_str(messages::NOTHING_TO_MIGRATE);
            output.push('\n');
        }
        for finding in file.ordered(self.rules) {
            output.push_str(&format!(
                "{} {}\n",
                self.severity_str(finding.severity),
                messages::detailed(finding.message_key, &finding.parameters)
            ));
        }
        output
    }
}

impl ReportFormatter for TextFormatter<'_> {
    fn format(&self, batch: &BatchReport) -> String {
        let mut output = String::from(BANNER);
        output.push('\n');
        output.push_str(&self.format_summary(batch));
        output.push_str("\nDetails\n#######\n");

        for file in &batch.files {
            output.push_str(&self.format_file(file));
            output.push('\n');
        }
        output
    }
}
