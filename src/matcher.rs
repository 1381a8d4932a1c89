//! Pattern matcher
//!
//! Binds the prefixes a rule's pattern references to namespace URIs and
//! evaluates the pattern. Binding never fails on account of the template's
//! own declarations: a missing declaration falls back to the catalog URI,
//! and a stale one is reported and used as is so that the legacy markup on
//! disk is still found.

use crate::document::Document;
use crate::namespace::NamespaceCatalog;
use crate::pattern::{Bindings, MatchedNode, Pattern, PatternError};
use crate::rules::Rule;
use log::{debug, trace};
use thiserror::Error;

/// Nodes matched by one rule in one document
pub type MatchSet = Vec<MatchedNode>;

/// Error during detection
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Rule {rule} has an invalid pattern: {source}")]
    Pattern {
        rule: &'static str,
        #[source]
        source: PatternError,
    },
}

/// Namespace problem noticed while binding prefixes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceIssue {
    /// The prefix is not in the catalog
    UnknownPrefix { prefix: String },
    /// The template binds a known prefix to an unexpected URI
    Drift {
        prefix: String,
        expected: String,
        declared: String,
    },
}

impl NamespaceIssue {
    pub fn prefix(&self) -> &str {
        match self {
            NamespaceIssue::UnknownPrefix { prefix } | NamespaceIssue::Drift { prefix, .. } => {
                prefix
            }
        }
    }
}

/// Result of running one rule's detection
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub matches: MatchSet,
    pub issues: Vec<NamespaceIssue>,
}

/// Run a rule's pattern against a document.
///
/// Rules without a pattern yield an empty detection.
pub fn detect(doc: &Document, rule: &Rule, catalog: &NamespaceCatalog) -> Result<Detection, MatchError> {
    let Some(source) = rule.pattern() else {
        return Ok(Detection::default());
    };
    let pattern = Pattern::parse(source).map_err(|source| MatchError::Pattern {
        rule: rule.id,
        source,
    })?;

    let (bindings, issues) = bind_prefixes(doc, &pattern.prefixes(), catalog);
    let matches = pattern.select(doc, &bindings);
    if !matches.is_empty() {
        debug!("{}: {} match(es)", rule.id, matches.len());
    }

    Ok(Detection { matches, issues })
}

/// Resolve pattern prefixes against the document's declarations and the catalog
pub fn bind_prefixes(
    doc: &Document,
    prefixes: &[String],
    catalog: &NamespaceCatalog,
) -> (Bindings, Vec<NamespaceIssue>) {
    let mut bindings = Bindings::new();
    let mut issues = Vec::new();

    for prefix in prefixes {
        let Some(expected) = catalog.resolve(prefix) else {
            trace!("prefix '{}' is not in the catalog", prefix);
            issues.push(NamespaceIssue::UnknownPrefix {
                prefix: prefix.clone(),
            });
            continue;
        };

        let uri = match doc.document_namespace(prefix) {
            Some(declared) if declared != expected => {
                issues.push(NamespaceIssue::Drift {
                    prefix: prefix.clone(),
                    expected: expected.to_string(),
                    declared: declared.to_string(),
                });
                declared
            }
            _ => expected,
        };
        bindings.insert(prefix.clone(), uri.to_string());
    }

    (bindings, issues)
}

/// Compare every catalog prefix declared on the root with its expected URI
pub fn enumerate_namespaces(doc: &Document, catalog: &NamespaceCatalog) -> Vec<NamespaceIssue> {
    catalog
        .iter()
        .filter_map(|known| {
            let declared = doc.root_namespace(known.prefix)?;
            (declared != known.uri).then(|| NamespaceIssue::Drift {
                prefix: known.prefix.to_string(),
                expected: known.uri.to_string(),
                declared: declared.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Severity;
    use crate::rules::{self, RuleKind};

    const STALE_A4J: &str = "https://ajax4jsf.dev.java.net/ajax";

    fn pattern_rule(pattern: &'static str) -> Rule {
        Rule {
            id: "test-rule",
            kind: RuleKind::Pattern { pattern, fix: None },
            severity: Severity::Warning,
            message_key: "test.message",
            auto_fixable: false,
        }
    }

    #[test]
    fn test_detect_with_correct_declaration() {
        let doc = Document::parse(
            r#"<r xmlns:a4j="http://richfaces.org/a4j"><a4j:form/><a4j:form/><a4j:form/></r>"#,
        )
        .unwrap();
        let detection = detect(&doc, &rules::A4J_FORM, &NamespaceCatalog::builtin()).unwrap();
        assert_eq!(detection.matches.len(), 3);
        assert!(detection.issues.is_empty());
    }

    #[test]
    fn test_detect_binds_stale_uri_and_reports_drift() {
        let doc = Document::parse(&format!(r#"<r xmlns:a4j="{STALE_A4J}"><a4j:form/></r>"#)).unwrap();
        let detection = detect(&doc, &rules::A4J_FORM, &NamespaceCatalog::builtin()).unwrap();
        assert_eq!(detection.matches.len(), 1);
        assert_eq!(
            detection.issues,
            vec![NamespaceIssue::Drift {
                prefix: "a4j".to_string(),
                expected: "http://richfaces.org/a4j".to_string(),
                declared: STALE_A4J.to_string(),
            }]
        );
    }

    #[test]
    fn test_detect_without_root_declaration_uses_catalog() {
        let doc = Document::parse(
            r#"<r><f xmlns:a4j="http://richfaces.org/a4j"><a4j:form/></f></r>"#,
        )
        .unwrap();
        let detection = detect(&doc, &rules::A4J_FORM, &NamespaceCatalog::builtin()).unwrap();
        assert_eq!(detection.matches.len(), 1);
        assert!(detection.issues.is_empty());
    }

    #[test]
    fn test_detect_finds_stale_declaration_below_root() {
        let doc = Document::parse(&format!(
            r#"<ui:composition xmlns:ui="http://java.sun.com/jsf/facelets"><div xmlns:a4j="{STALE_A4J}"><a4j:form/></div></ui:composition>"#
        ))
        .unwrap();
        let detection = detect(&doc, &rules::A4J_FORM, &NamespaceCatalog::builtin()).unwrap();
        assert_eq!(detection.matches.len(), 1);
        assert_eq!(detection.issues.len(), 1);
        assert_eq!(detection.issues[0].prefix(), "a4j");
    }

    #[test]
    fn test_unknown_prefix_yields_issue_and_no_match() {
        let doc = Document::parse(r#"<r xmlns:zzz="urn:z"><zzz:thing/></r>"#).unwrap();
        let detection = detect(
            &doc,
            &pattern_rule("//zzz:thing"),
            &NamespaceCatalog::builtin(),
        )
        .unwrap();
        assert!(detection.matches.is_empty());
        assert_eq!(
            detection.issues,
            vec![NamespaceIssue::UnknownPrefix {
                prefix: "zzz".to_string()
            }]
        );
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let doc = Document::parse("<r/>").unwrap();
        let err = detect(&doc, &pattern_rule("a4j:form"), &NamespaceCatalog::builtin()).unwrap_err();
        assert!(err.to_string().contains("test-rule"));
    }

    #[test]
    fn test_rule_without_pattern_detects_nothing() {
        let doc = Document::parse("<r/>").unwrap();
        let detection =
            detect(&doc, &rules::TEMPLATE_OVERRIDE, &NamespaceCatalog::builtin()).unwrap();
        assert!(detection.matches.is_empty());
        assert!(detection.issues.is_empty());
    }

    #[test]
    fn test_enumerate_namespaces() {
        let doc = Document::parse(&format!(
            r#"<r xmlns:a4j="{STALE_A4J}" xmlns:h="http://java.sun.com/jsf/html" xmlns:zzz="urn:z" xmlns:c="http://java.sun.com/jsp/jstl/core"/>"#
        ))
        .unwrap();
        let issues = enumerate_namespaces(&doc, &NamespaceCatalog::builtin());
        let prefixes: Vec<_> = issues.iter().map(|i| i.prefix()).collect();
        // catalog order, not declaration order
        assert_eq!(prefixes, vec!["c", "a4j"]);
    }

    #[test]
    fn test_enumeration_matches_lazy_binding() {
        let doc = Document::parse(&format!(r#"<r xmlns:a4j="{STALE_A4J}"><a4j:form/></r>"#)).unwrap();
        let catalog = NamespaceCatalog::builtin();
        let eager = enumerate_namespaces(&doc, &catalog);
        let lazy = detect(&doc, &rules::A4J_FORM, &catalog).unwrap().issues;
        assert_eq!(eager, lazy);
    }
}
