//! Migration rule definitions
//!
//! The rule table is fixed at build time and ordered: detection runs in
//! table order and reports list findings in the same order. Rules that
//! rewrite the same element family must therefore be placed so that a
//! later rule sees what an earlier one produced (see `A4J_PROCESS` and
//! `A4J_AJAX_SINGLE`).

use crate::finding::Severity;
use crate::pattern::{Pattern, PatternError};
use std::fmt;

/// Which platform template list an override rule checks against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateSet {
    /// Templates currently shipped by the platform
    Current,
    /// Templates removed or renamed by the platform
    Compat,
}

/// How an attribute value is carried over when the attribute is renamed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRewrite {
    /// Value copied as is
    Keep,
    /// Comma separated ids become whitespace separated ids
    SpaceSeparated,
}

/// Deterministic rewrite applied to every node a rule matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixAction {
    /// Rename the matched element (`prefix:local` or `local`)
    RenameElement { name: &'static str },
    /// Rename the matched attribute
    RenameAttribute {
        name: &'static str,
        rewrite: ValueRewrite,
    },
    /// Drop the matched attribute and set another one with a fixed value
    ReplaceAttribute {
        name: &'static str,
        value: &'static str,
    },
}

impl FixAction {
    /// New element/attribute name produced by the fix
    pub fn replacement(&self) -> &'static str {
        match self {
            FixAction::RenameElement { name }
            | FixAction::RenameAttribute { name, .. }
            | FixAction::ReplaceAttribute { name, .. } => name,
        }
    }
}

/// What drives a rule's detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Structural pattern evaluated against the document
    Pattern {
        pattern: &'static str,
        fix: Option<FixAction>,
    },
    /// Compares every catalog prefix declared on the root with its expected URI
    NamespaceEnumeration,
    /// Checks the file path against a platform template list
    Override(TemplateSet),
    /// Never evaluated; findings are recorded directly by the pipeline
    Injected,
}

/// A migration rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    /// Stable identifier, also used as report key
    pub id: &'static str,
    pub kind: RuleKind,
    pub severity: Severity,
    /// Key into the report message catalog
    pub message_key: &'static str,
    /// Whether the pipeline may rewrite the markup on its own
    pub auto_fixable: bool,
}

impl Rule {
    /// Match pattern source, `None` for rules that are not pattern driven
    pub fn pattern(&self) -> Option<&'static str> {
        match self.kind {
            RuleKind::Pattern { pattern, .. } => Some(pattern),
            _ => None,
        }
    }

    pub fn fix(&self) -> Option<FixAction> {
        match self.kind {
            RuleKind::Pattern { fix, .. } => fix,
            _ => None,
        }
    }

    /// New element/attribute name when the rule has a rename fix
    pub fn replacement(&self) -> Option<&'static str> {
        self.fix().map(|f| f.replacement())
    }

    /// Prefixes referenced by the match pattern, in order of first use
    pub fn required_prefixes(&self) -> Result<Vec<String>, PatternError> {
        match self.pattern() {
            Some(source) => Ok(Pattern::parse(source)?.prefixes()),
            None => Ok(Vec::new()),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

pub const NAMESPACE_MISMATCH: Rule = Rule {
    id: "namespace-mismatch",
    kind: RuleKind::NamespaceEnumeration,
    severity: Severity::Error,
    message_key: "namespace.rule1.message",
    auto_fixable: true,
};

pub const A4J_FORM: Rule = Rule {
    id: "a4j-form",
    kind: RuleKind::Pattern {
        pattern: "//a4j:form",
        fix: None,
    },
    severity: Severity::Error,
    message_key: "a4j.form.rule.message",
    auto_fixable: false,
};

pub const A4J_RERENDER: Rule = Rule {
    id: "a4j-rerender",
    kind: RuleKind::Pattern {
        pattern: "//@reRender",
        fix: Some(FixAction::RenameAttribute {
            name: "render",
            rewrite: ValueRewrite::SpaceSeparated,
        }),
    },
    severity: Severity::Warning,
    message_key: "a4j.rerender.rule.message",
    auto_fixable: true,
};

/// Runs before `A4J_AJAX_SINGLE`: an element carrying both attributes ends
/// up with `execute="@this"`, which is what `ajaxSingle` meant.
pub const A4J_PROCESS: Rule = Rule {
    id: "a4j-process",
    kind: RuleKind::Pattern {
        pattern: "//@process",
        fix: Some(FixAction::RenameAttribute {
            name: "execute",
            rewrite: ValueRewrite::SpaceSeparated,
        }),
    },
    severity: Severity::Warning,
    message_key: "a4j.process.rule.message",
    auto_fixable: true,
};

/// Every `ajaxSingle` becomes `execute="@this"`, whatever its value.
/// `ajaxSingle="false"` is rewritten as well and the warning asks for a
/// manual review of those.
pub const A4J_AJAX_SINGLE: Rule = Rule {
    id: "a4j-ajax-single",
    kind: RuleKind::Pattern {
        pattern: "//@ajaxSingle",
        fix: Some(FixAction::ReplaceAttribute {
            name: "execute",
            value: "@this",
        }),
    },
    severity: Severity::Warning,
    message_key: "a4j.ajaxSingle.rule.message",
    auto_fixable: true,
};

pub const A4J_LIMIT_TO_LIST: Rule = Rule {
    id: "a4j-limit-to-list",
    kind: RuleKind::Pattern {
        pattern: "//@limitToList",
        fix: Some(FixAction::RenameAttribute {
            name: "limitRender",
            rewrite: ValueRewrite::Keep,
        }),
    },
    severity: Severity::Info,
    message_key: "a4j.limitToList.rule.message",
    auto_fixable: true,
};

pub const A4J_ACTIONPARAM: Rule = Rule {
    id: "a4j-actionparam",
    kind: RuleKind::Pattern {
        pattern: "//a4j:actionparam",
        fix: Some(FixAction::RenameElement { name: "a4j:param" }),
    },
    severity: Severity::Info,
    message_key: "a4j.actionParam.rule.message",
    auto_fixable: true,
};

/// Event names change (`onclick` -> `click`), so no automatic rename.
pub const A4J_SUPPORT: Rule = Rule {
    id: "a4j-support",
    kind: RuleKind::Pattern {
        pattern: "//a4j:support",
        fix: None,
    },
    severity: Severity::Warning,
    message_key: "a4j.support.rule.message",
    auto_fixable: false,
};

pub const RICH_MODAL_PANEL: Rule = Rule {
    id: "rich-modal-panel",
    kind: RuleKind::Pattern {
        pattern: "//rich:modalPanel",
        fix: Some(FixAction::RenameElement {
            name: "rich:popupPanel",
        }),
    },
    severity: Severity::Warning,
    message_key: "rich.modalPanel.rule.message",
    auto_fixable: true,
};

pub const RICH_SUGGESTIONBOX: Rule = Rule {
    id: "rich-suggestionbox",
    kind: RuleKind::Pattern {
        pattern: "//rich:suggestionbox",
        fix: None,
    },
    severity: Severity::Info,
    message_key: "rich.suggestionBox.rule.message",
    auto_fixable: false,
};

pub const NAMESPACE_DRIFT: Rule = Rule {
    id: "namespace-drift",
    kind: RuleKind::Injected,
    severity: Severity::Info,
    message_key: "namespace.rule2.message",
    auto_fixable: true,
};

pub const UNKNOWN_PREFIX: Rule = Rule {
    id: "unknown-prefix",
    kind: RuleKind::Injected,
    severity: Severity::Info,
    message_key: "namespace.rule3.message",
    auto_fixable: false,
};

pub const TEMPLATE_OVERRIDE: Rule = Rule {
    id: "template-override",
    kind: RuleKind::Override(TemplateSet::Current),
    severity: Severity::Warning,
    message_key: "override.rule.message",
    auto_fixable: false,
};

pub const TEMPLATE_OVERRIDE_REMOVED: Rule = Rule {
    id: "template-override-removed",
    kind: RuleKind::Override(TemplateSet::Compat),
    severity: Severity::Error,
    message_key: "override.compat.rule.message",
    auto_fixable: false,
};

pub const DOCUMENT_UNREADABLE: Rule = Rule {
    id: "document-unreadable",
    kind: RuleKind::Injected,
    severity: Severity::Error,
    message_key: "error.reading.document.message",
    auto_fixable: false,
};

pub const PROCESSING_ERROR: Rule = Rule {
    id: "processing-error",
    kind: RuleKind::Injected,
    severity: Severity::Error,
    message_key: "error.processing.document.message",
    auto_fixable: false,
};

static BUILTIN_RULES: &[Rule] = &[
    NAMESPACE_MISMATCH,
    A4J_FORM,
    A4J_RERENDER,
    A4J_PROCESS,
    A4J_AJAX_SINGLE,
    A4J_LIMIT_TO_LIST,
    A4J_ACTIONPARAM,
    A4J_SUPPORT,
    RICH_MODAL_PANEL,
    RICH_SUGGESTIONBOX,
    NAMESPACE_DRIFT,
    UNKNOWN_PREFIX,
    TEMPLATE_OVERRIDE,
    TEMPLATE_OVERRIDE_REMOVED,
    DOCUMENT_UNREADABLE,
    PROCESSING_ERROR,
];

/// The full rule table, in detection and report order
pub fn builtin_rules() -> &'static [Rule] {
    BUILTIN_RULES
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::NamespaceCatalog;
    use std::collections::HashSet;

    #[test]
    fn test_rule_ids_are_unique() {
        let ids: HashSet<_> = builtin_rules().iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), builtin_rules().len());
    }

    #[test]
    fn test_builtin_patterns_parse() {
        for rule in builtin_rules() {
            if let Some(source) = rule.pattern() {
                assert!(Pattern::parse(source).is_ok(), "{} does not parse", rule.id);
            }
        }
    }

    #[test]
    fn test_builtin_prefixes_are_in_catalog() {
        let catalog = NamespaceCatalog::builtin();
        for rule in builtin_rules() {
            for prefix in rule.required_prefixes().unwrap() {
                assert!(catalog.contains(&prefix), "{}: {}", rule.id, prefix);
            }
        }
    }

    #[test]
    fn test_required_prefixes() {
        assert_eq!(A4J_FORM.required_prefixes().unwrap(), vec!["a4j"]);
        assert!(A4J_RERENDER.required_prefixes().unwrap().is_empty());
        assert!(NAMESPACE_MISMATCH.required_prefixes().unwrap().is_empty());
    }

    #[test]
    fn test_replacement() {
        assert_eq!(A4J_ACTIONPARAM.replacement(), Some("a4j:param"));
        assert_eq!(A4J_RERENDER.replacement(), Some("render"));
        assert_eq!(A4J_FORM.replacement(), None);
        assert_eq!(DOCUMENT_UNREADABLE.replacement(), None);
    }

    #[test]
    fn test_fixable_rules_carry_a_fix() {
        for rule in builtin_rules() {
            if rule.pattern().is_some() && rule.auto_fixable {
                assert!(rule.fix().is_some(), "{} is fixable without a fix", rule.id);
            }
        }
    }

    #[test]
    fn test_process_runs_before_ajax_single() {
        let rules = builtin_rules();
        let pos = |id: &str| rules.iter().position(|r| r.id == id).unwrap();
        assert!(pos(A4J_PROCESS.id) < pos(A4J_AJAX_SINGLE.id));
    }
}
