//! Rule executor
//!
//! Runs the rule table over one template at a time. For each rule the
//! detection result is handed straight to the fix and dropped afterwards;
//! per-document state (the namespace fix list, the prefixes already
//! reported) lives in locals of [`Executor::analyze_document`], so nothing
//! carries over from one template to the next.

use crate::config::{Config, OutputConfig};
use crate::document::Document;
use crate::finding::{BatchReport, FileReport};
use crate::matcher::{detect, enumerate_namespaces, Detection, MatchError, NamespaceIssue};
use crate::namespace::NamespaceCatalog;
use crate::overrides::{relative_template_path, OverrideIndex};
use crate::rules::{self, Rule, RuleKind};
use crate::transform::{apply_fix, retarget_namespaces, NamespaceFixList, TransformError};
use crate::writer::serialize;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Failure while running rules on a parsed template
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Executor settings
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Apply fixes and write migrated copies
    pub migrate: bool,

    /// Also rewrite the original template with the output formatting
    pub format: bool,

    /// Override detection compares platform-relative paths
    pub complete_path: bool,

    pub root_marker: String,

    pub output: OutputConfig,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            migrate: false,
            format: false,
            complete_path: true,
            root_marker: "nuxeo.war".to_string(),
            output: OutputConfig::default(),
        }
    }
}

impl From<&Config> for ExecutorOptions {
    fn from(config: &Config) -> Self {
        Self {
            migrate: config.migrate,
            format: config.format,
            complete_path: config.templates.complete_path,
            root_marker: config.files.root_marker.clone(),
            output: config.output.clone(),
        }
    }
}

/// Result of processing one template
#[derive(Debug, Clone)]
pub enum FileOutcome {
    /// All rules ran
    Analyzed(FileReport),
    /// The template could not be read or parsed
    DocumentUnreadable(FileReport),
    /// A rule or the output step failed
    TransformFailed(FileReport),
}

impl FileOutcome {
    pub fn report(&self) -> &FileReport {
        match self {
            FileOutcome::Analyzed(r)
            | FileOutcome::DocumentUnreadable(r)
            | FileOutcome::TransformFailed(r) => r,
        }
    }

    pub fn into_report(self) -> FileReport {
        match self {
            FileOutcome::Analyzed(r)
            | FileOutcome::DocumentUnreadable(r)
            | FileOutcome::TransformFailed(r) => r,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Analyzed(_))
    }
}

/// Path of the migrated copy of a template
pub fn migrated_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Runs an ordered rule table over templates
pub struct Executor<'a> {
    rules: &'a [Rule],
    catalog: NamespaceCatalog,
    overrides: OverrideIndex,
    options: ExecutorOptions,
}

impl<'a> Executor<'a> {
    pub fn new(rules: &'a [Rule], catalog: NamespaceCatalog, options: ExecutorOptions) -> Self {
        for rule in rules {
            match rule.required_prefixes() {
                Ok(prefixes) => {
                    for prefix in prefixes.iter().filter(|p| !catalog.contains(p)) {
                        warn!("rule {} uses prefix '{}' missing from the catalog", rule.id, prefix);
                    }
                }
                Err(e) => warn!("rule {}: {}", rule.id, e),
            }
        }
        debug!(
            "{} rule(s), {} known namespace(s)",
            rules.len(),
            catalog.len()
        );

        Self {
            rules,
            catalog,
            overrides: OverrideIndex::default(),
            options,
        }
    }

    /// Use platform template lists for override detection
    pub fn with_overrides(mut self, overrides: OverrideIndex) -> Self {
        self.overrides = overrides;
        self
    }

    /// Run detection (and fixes when migrating) over a parsed template
    pub fn analyze_document(
        &self,
        doc: &mut Document,
        report: &mut FileReport,
    ) -> Result<(), PipelineError> {
        let mut fixes = NamespaceFixList::new();
        let mut reported_prefixes: HashSet<String> = HashSet::new();

        for rule in self.rules {
            match rule.kind {
                RuleKind::NamespaceEnumeration => {
                    for issue in enumerate_namespaces(doc, &self.catalog) {
                        if let NamespaceIssue::Drift { prefix, expected, .. } = issue {
                            fixes.insert(&prefix);
                            report.record(rule, vec![prefix, expected]);
                        }
                    }
                }
                RuleKind::Pattern { fix, .. } => {
                    let Detection { matches, issues } = detect(doc, rule, &self.catalog)?;

                    for issue in issues {
                        if !reported_prefixes.insert(issue.prefix().to_string()) {
                            continue;
                        }
                        match issue {
                            NamespaceIssue::UnknownPrefix { prefix } => {
                                report.record(&rules::UNKNOWN_PREFIX, vec![prefix]);
                            }
                            NamespaceIssue::Drift { prefix, expected, .. } => {
                                fixes.insert(&prefix);
                                report.record(&rules::NAMESPACE_DRIFT, vec![prefix, expected]);
                            }
                        }
                    }

                    if matches.is_empty() {
                        continue;
                    }
                    let count = matches.len();
                    report.set(rule, count, vec![count.to_string()]);

                    if !(self.options.migrate && rule.auto_fixable) {
                        continue;
                    }
                    if let Some(fix) = fix {
                        let rewritten = apply_fix(doc, &fix, &matches, &self.catalog)?;
                        debug!("{}: rewrote {} node(s)", rule.id, rewritten);
                    }
                }
                RuleKind::Override(_) | RuleKind::Injected => {}
            }
        }

        if self.options.migrate && !fixes.is_empty() {
            let retagged = retarget_namespaces(doc, &self.catalog, &fixes);
            debug!("retargeted {} prefix(es), {} node(s)", fixes.len(), retagged);
        }

        Ok(())
    }

    /// Record collisions with platform templates
    pub fn check_overrides(&self, path: &Path, report: &mut FileReport) {
        let name = relative_template_path(path, &self.options.root_marker)
            .or_else(|| path.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| path.display().to_string());

        for rule in self.rules {
            if let RuleKind::Override(set) = rule.kind {
                let index = self.overrides.index(set);
                if index.is_override(path, &self.options.root_marker, self.options.complete_path) {
                    report.set(rule, 1, vec![name.clone()]);
                }
            }
        }
    }

    /// Process one template: overrides, parse, rules, migrated output
    pub fn process_file(&self, path: &Path) -> FileOutcome {
        let mut report = FileReport::new(path);
        self.check_overrides(path, &mut report);

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("cannot read {}: {}", path.display(), e);
                report.set(&rules::DOCUMENT_UNREADABLE, 1, vec![e.to_string()]);
                return FileOutcome::DocumentUnreadable(report);
            }
        };

        let mut doc = match Document::parse(&content) {
            Ok(d) => d,
            Err(e) => {
                warn!("cannot parse {}: {}", path.display(), e);
                report.set(&rules::DOCUMENT_UNREADABLE, 1, vec![e.to_string()]);
                return FileOutcome::DocumentUnreadable(report);
            }
        };

        let original = (self.options.migrate && self.options.format).then(|| doc.clone());

        if let Err(e) = self.analyze_document(&mut doc, &mut report) {
            error!("processing {} failed: {}", path.display(), e);
            report.set(&rules::PROCESSING_ERROR, 1, vec![e.to_string()]);
            return FileOutcome::TransformFailed(report);
        }

        if self.options.migrate && !report.is_empty() {
            if let Err(e) = self.write_outputs(path, &doc, original.as_ref()) {
                error!("{}", e);
                report.set(&rules::PROCESSING_ERROR, 1, vec![e.to_string()]);
                return FileOutcome::TransformFailed(report);
            }
        }

        FileOutcome::Analyzed(report)
    }

    fn write_outputs(
        &self,
        path: &Path,
        doc: &Document,
        original: Option<&Document>,
    ) -> Result<(), PipelineError> {
        let target = migrated_path(path, &self.options.output.migrated_suffix);
        std::fs::write(&target, serialize(doc, &self.options.output)).map_err(|source| {
            PipelineError::Write {
                path: target.clone(),
                source,
            }
        })?;
        info!("wrote {}", target.display());

        if let Some(original) = original {
            std::fs::write(path, serialize(original, &self.options.output)).map_err(|source| {
                PipelineError::Write {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            debug!("reformatted {}", path.display());
        }
        Ok(())
    }

    /// Process templates in order
    pub fn run(&self, files: &[PathBuf]) -> BatchReport {
        let start = Instant::now();
        let mut batch = BatchReport::default();

        for file in files {
            let outcome = self.process_file(file);
            let report = outcome.report();
            if outcome.is_success() {
                debug!("{}: {} occurrence(s)", file.display(), report.total());
            } else {
                debug!("{}: {:?}", file.display(), report.max_severity());
            }
            batch.push(outcome.into_report());
        }

        batch.duration = start.elapsed();
        info!(
            "analyzed {} file(s) in {:.2?}, {} with findings",
            batch.files_processed(),
            batch.duration,
            batch.files_with_findings()
        );
        batch
    }
}
