//! Report message catalog
//!
//! Each message key has a summarized form, fed with the total number of
//! occurrences across the batch, and a detailed form, fed with the
//! finding's own parameters. Placeholders are `{0}`, `{1}`, ...

use regex::{Captures, Regex};
use std::sync::OnceLock;

struct Message {
    key: &'static str,
    summarized: &'static str,
    detailed: Option<&'static str>,
}

const MESSAGES: &[Message] = &[
    Message {
        key: "namespace.rule1.message",
        summarized: "{0} namespace declaration(s) use an outdated URI",
        detailed: Some("Prefix '{0}' must be bound to {1}"),
    },
    Message {
        key: "a4j.form.rule.message",
        summarized: "{0} a4j:form element(s) must be replaced by h:form",
        detailed: Some("{0} a4j:form element(s) found, replace them with h:form (and a4j:ajax where needed)"),
    },
    Message {
        key: "a4j.rerender.rule.message",
        summarized: "{0} reRender attribute(s) must be renamed to render",
        detailed: Some("{0} reRender attribute(s) renamed to render, ids are now separated by spaces"),
    },
    Message {
        key: "a4j.process.rule.message",
        summarized: "{0} process attribute(s) must be renamed to execute",
        detailed: Some("{0} process attribute(s) renamed to execute, ids are now separated by spaces"),
    },
    Message {
        key: "a4j.ajaxSingle.rule.message",
        summarized: "{0} ajaxSingle attribute(s) must be replaced by execute=\"@this\"",
        detailed: Some(
            "{0} ajaxSingle attribute(s) replaced by execute=\"@this\", check the ones that were false",
        ),
    },
    Message {
        key: "a4j.limitToList.rule.message",
        summarized: "{0} limitToList attribute(s) must be renamed to limitRender",
        detailed: None,
    },
    Message {
        key: "a4j.actionParam.rule.message",
        summarized: "{0} a4j:actionparam element(s) must be renamed to a4j:param",
        detailed: None,
    },
    Message {
        key: "a4j.support.rule.message",
        summarized: "{0} a4j:support element(s) must be replaced by a4j:ajax",
        detailed: Some("{0} a4j:support element(s) found, replace them with a4j:ajax and drop the 'on' prefix of event names"),
    },
    Message {
        key: "rich.modalPanel.rule.message",
        summarized: "{0} rich:modalPanel element(s) must be renamed to rich:popupPanel",
        detailed: Some("{0} rich:modalPanel element(s) renamed to rich:popupPanel, check the show/hide JavaScript API calls"),
    },
    Message {
        key: "rich.suggestionBox.rule.message",
        summarized: "{0} rich:suggestionbox element(s) must be replaced by rich:autocomplete",
        detailed: None,
    },
    Message {
        key: "namespace.rule2.message",
        summarized: "{0} prefix(es) used by migration rules are bound to an outdated URI",
        detailed: Some("Prefix '{0}' is bound to an outdated URI, expected {1}"),
    },
    Message {
        key: "namespace.rule3.message",
        summarized: "{0} unknown namespace prefix(es) referenced by migration rules",
        detailed: Some("Prefix '{0}' is not a known namespace prefix"),
    },
    Message {
        key: "override.rule.message",
        summarized: "{0} template(s) override a platform template",
        detailed: Some("{0} overrides a platform template, compare it with the migrated platform version"),
    },
    Message {
        key: "override.compat.rule.message",
        summarized: "{0} template(s) override a template removed from the platform",
        detailed: Some("{0} overrides a template that was removed or renamed in the platform"),
    },
    Message {
        key: "error.reading.document.message",
        summarized: "{0} file(s) could not be read",
        detailed: Some("The file could not be read: {0}"),
    },
    Message {
        key: "error.processing.document.message",
        summarized: "{0} file(s) failed during processing",
        detailed: Some("Processing failed: {0}"),
    },
];

/// Shown in the details of a file without findings
pub const NOTHING_TO_MIGRATE: &str = "Nothing to migrate";

fn lookup(key: &str) -> Option<&'static Message> {
    MESSAGES.iter().find(|m| m.key == key)
}

/// Replace `{n}` placeholders with the matching parameter.
///
/// Placeholders without a parameter are left as they are. The template is
/// scanned once, so braces inside a parameter are copied verbatim.
pub fn format_message(template: &str, params: &[String]) -> String {
    placeholder_re()
        .replace_all(template, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| params.get(i))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\d+)\}").expect("placeholder pattern is valid"))
}

/// Summary line for a message key; unknown keys are returned as is
pub fn summarized(key: &str, params: &[String]) -> String {
    match lookup(key) {
        Some(m) => format_message(m.summarized, params),
        None => key.to_string(),
    }
}

/// Detail line for a message key, falling back to the summarized form
pub fn detailed(key: &str, params: &[String]) -> String {
    match lookup(key) {
        Some(m) => format_message(m.detailed.unwrap_or(m.summarized), params),
        None => key.to_string(),
    }
}
