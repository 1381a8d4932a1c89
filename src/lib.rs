//! jsf2-migrate - Migration assistant for JSF 2 Facelets templates
//!
//! Finds JSF 1.2 / RichFaces 3.3 constructs in `.xhtml` templates, reports
//! them, and rewrites the ones that have a deterministic JSF 2 /
//! RichFaces 4 equivalent.
//!
//! # Architecture
//!
//! ```text
//! walker -> Executor -> (matcher -> transform) per rule -> FileReport -> report
//! ```
//!
//! The executor runs the ordered rule table over each template. Detection
//! is a pure function of the document and the rule; its match set is
//! handed to the fix of the same rule and then dropped, so no state
//! survives from one rule or one template to the next.
//!
//! # Example
//!
//! ```no_run
//! use jsf2_migrate::{builtin_rules, Executor, ExecutorOptions, NamespaceCatalog};
//! use std::path::PathBuf;
//!
//! let options = ExecutorOptions {
//!     migrate: true,
//!     ..Default::default()
//! };
//! let executor = Executor::new(builtin_rules(), NamespaceCatalog::builtin(), options);
//! let batch = executor.run(&[PathBuf::from("view.xhtml")]);
//! println!("{} file(s) with findings", batch.files_with_findings());
//! ```

pub mod config;
pub mod document;
pub mod executor;
pub mod finding;
pub mod matcher;
pub mod namespace;
pub mod overrides;
pub mod pattern;
pub mod report;
pub mod rules;
pub mod transform;
pub mod walker;
pub mod writer;

// Re-export main types
pub use config::{Config, ConfigError};
pub use document::{Document, ParseError};
pub use executor::{Executor, ExecutorOptions, FileOutcome, PipelineError};
pub use finding::{BatchReport, FileReport, Finding, Severity};
pub use matcher::{detect, enumerate_namespaces, Detection, MatchError, MatchSet, NamespaceIssue};
pub use namespace::NamespaceCatalog;
pub use overrides::{OverrideIndex, TemplateIndex, TemplateListError};
pub use pattern::{MatchedNode, Pattern, PatternError};
pub use rules::{builtin_rules, FixAction, Rule, RuleKind, TemplateSet, ValueRewrite};
pub use transform::{
    apply_fix, retarget_namespaces, rewrite_multi_value, NamespaceFixList, TransformError,
};
