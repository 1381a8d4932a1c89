//! Transform engine
//!
//! Rewrites the nodes a rule matched and rebinds stale namespace prefixes.
//! Every operation works on the working copy of one document and touches
//! nothing but the matched nodes.

use crate::document::{escape_attr, split_qualified, Attribute, Document, NodeId, QName};
use crate::matcher::MatchSet;
use crate::namespace::NamespaceCatalog;
use crate::pattern::MatchedNode;
use crate::rules::{FixAction, ValueRewrite};
use log::{debug, warn};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Error while applying a fix
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Matched attribute '{name}' is no longer present")]
    MissingAttribute { name: String },

    #[error("{fix} cannot be applied to {found}")]
    WrongTarget { fix: &'static str, found: &'static str },

    #[error("Prefix '{prefix}' of '{name}' is not bound and not in the catalog")]
    UnknownPrefix { prefix: String, name: String },

    #[error("Node is not an element")]
    NotAnElement,
}

/// Prefixes whose declaration must be rebound to the catalog URI.
///
/// Insertion ordered; a prefix is held at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceFixList {
    prefixes: Vec<String>,
}

impl NamespaceFixList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prefix; returns false when it was already queued
    pub fn insert(&mut self, prefix: &str) -> bool {
        if self.contains(prefix) {
            return false;
        }
        self.prefixes.push(prefix.to_string());
        true
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.prefixes.iter().any(|p| p == prefix)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.prefixes.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

/// Apply a rule's fix to every node of its match set.
///
/// Returns the number of nodes rewritten.
pub fn apply_fix(
    doc: &mut Document,
    fix: &FixAction,
    matches: &MatchSet,
    catalog: &NamespaceCatalog,
) -> Result<usize, TransformError> {
    let mut rewritten = 0;

    for node in matches {
        match (fix, node) {
            (FixAction::RenameElement { name }, MatchedNode::Element(id)) => {
                rename_element(doc, *id, name, catalog)?;
            }
            (FixAction::RenameAttribute { name, rewrite }, MatchedNode::Attribute { element, name: old }) => {
                let new_name = resolve_name(doc, *element, name, catalog)?;
                replace_attribute(doc, *element, old, new_name, |value| match rewrite {
                    ValueRewrite::Keep => value.to_string(),
                    ValueRewrite::SpaceSeparated => rewrite_multi_value(value),
                })?;
            }
            (FixAction::ReplaceAttribute { name, value }, MatchedNode::Attribute { element, name: old }) => {
                let new_name = resolve_name(doc, *element, name, catalog)?;
                let escaped = escape_attr(value);
                replace_attribute(doc, *element, old, new_name, |_| escaped.clone())?;
            }
            (FixAction::RenameElement { .. }, MatchedNode::Attribute { .. }) => {
                return Err(TransformError::WrongTarget {
                    fix: "element rename",
                    found: "an attribute",
                });
            }
            (_, MatchedNode::Element(_)) => {
                return Err(TransformError::WrongTarget {
                    fix: "attribute rewrite",
                    found: "an element",
                });
            }
        }
        rewritten += 1;
    }

    Ok(rewritten)
}

fn rename_element(
    doc: &mut Document,
    id: NodeId,
    name: &str,
    catalog: &NamespaceCatalog,
) -> Result<(), TransformError> {
    let (prefix, _) = split_qualified(name);
    let new_name = match prefix {
        Some(_) => resolve_name(doc, id, name, catalog)?,
        // unprefixed replacement keeps the element in its namespace
        None => {
            let el = doc.element(id).ok_or(TransformError::NotAnElement)?;
            QName {
                local: name.to_string(),
                ..el.name.clone()
            }
        }
    };

    let el = doc.element_mut(id).ok_or(TransformError::NotAnElement)?;
    debug!("rename <{}> to <{}>", el.name.qualified(), new_name.qualified());
    el.name = new_name;
    Ok(())
}

/// Build the QName for a replacement name at an element.
///
/// A prefix in scope keeps its binding; otherwise the catalog URI is
/// declared on the root.
fn resolve_name(
    doc: &mut Document,
    id: NodeId,
    name: &str,
    catalog: &NamespaceCatalog,
) -> Result<QName, TransformError> {
    let (prefix, local) = split_qualified(name);
    let Some(prefix) = prefix else {
        return Ok(QName::new(None, local, None));
    };

    if let Some(uri) = doc.lookup_namespace(id, Some(prefix)) {
        return Ok(QName::new(Some(prefix), local, Some(uri)));
    }

    let uri = catalog
        .resolve(prefix)
        .ok_or_else(|| TransformError::UnknownPrefix {
            prefix: prefix.to_string(),
            name: name.to_string(),
        })?;
    let root = doc.root_element().ok_or(TransformError::NotAnElement)?;
    if let Some(el) = doc.element_mut(root) {
        el.declare_namespace(Some(prefix), uri);
    }
    Ok(QName::new(Some(prefix), local, Some(uri)))
}

/// Swap an attribute for one named `new_name`, keeping its position.
///
/// An attribute already carrying the new name is overwritten.
fn replace_attribute(
    doc: &mut Document,
    id: NodeId,
    old: &str,
    new_name: QName,
    value: impl FnOnce(&str) -> String,
) -> Result<(), TransformError> {
    let el = doc.element_mut(id).ok_or(TransformError::NotAnElement)?;
    let current = el
        .attribute_value(old)
        .ok_or_else(|| TransformError::MissingAttribute {
            name: old.to_string(),
        })?;

    let new_value = value(current);
    let new_qualified = new_name.qualified();
    debug!("replace @{} with @{}=\"{}\"", old, new_qualified, new_value);

    let replacement = Attribute {
        name: new_name,
        value: new_value,
    };
    let position = |name: &str| el.attributes.iter().position(|a| a.name.qualified() == name);
    match (position(old), position(&new_qualified)) {
        (Some(idx), Some(existing)) if existing != idx => {
            el.attributes[existing] = replacement;
            el.attributes.remove(idx);
        }
        (Some(idx), _) => el.attributes[idx] = replacement,
        (None, _) => {}
    }
    Ok(())
}

fn expression_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[#$]\{[^}]+\}[^, ]*|[^, ]+").expect("token pattern is valid")
    })
}

/// Whether the value holds an expression: a `#{` or `${` opener with a
/// closing brace somewhere after it
pub fn contains_expression(value: &str) -> bool {
    value
        .match_indices(['#', '$'])
        .any(|(i, _)| value[i + 1..].starts_with('{') && value[i + 2..].contains('}'))
}

/// Turn a legacy comma separated id list into a whitespace separated one.
///
/// Without expressions every comma becomes a space. With expressions the
/// value is split into expression spans (plus any trailing non-separator
/// text) and plain tokens, then joined with single spaces, so commas inside
/// an expression survive.
pub fn rewrite_multi_value(value: &str) -> String {
    if !contains_expression(value) {
        return value.replace(',', " ");
    }
    expression_token_re()
        .find_iter(value)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rebind every queued prefix to its catalog URI.
///
/// Every declaration of the prefix is swapped to the expected URI, and every
/// element and attribute tagged with a replaced URI under that prefix is
/// retagged. A prefix declared nowhere is declared on the root. Returns the
/// number of nodes retagged.
pub fn retarget_namespaces(
    doc: &mut Document,
    catalog: &NamespaceCatalog,
    fixes: &NamespaceFixList,
) -> usize {
    let Some(root) = doc.root_element() else {
        return 0;
    };
    let mut retagged = 0;

    for prefix in fixes.iter() {
        let Some(expected) = catalog.resolve(prefix) else {
            warn!("cannot retarget unknown prefix '{}'", prefix);
            continue;
        };

        let mut declared = false;
        let mut stale: Vec<String> = Vec::new();

        // document order: a declaration is swapped before the elements in its scope
        for id in doc.elements() {
            let Some(el) = doc.element_mut(id) else {
                continue;
            };
            for decl in el.namespaces.iter_mut() {
                if decl.prefix.as_deref() != Some(prefix) {
                    continue;
                }
                declared = true;
                if decl.uri != expected {
                    if !stale.contains(&decl.uri) {
                        stale.push(decl.uri.clone());
                    }
                    decl.uri = expected.to_string();
                }
            }
            if retag(&mut el.name, prefix, &stale, expected) {
                retagged += 1;
            }
            for attr in el.attributes.iter_mut() {
                if retag(&mut attr.name, prefix, &stale, expected) {
                    retagged += 1;
                }
            }
        }

        if !declared {
            if let Some(el) = doc.element_mut(root) {
                el.declare_namespace(Some(prefix), expected);
            }
        }
        debug!("retargeted '{}' from {:?} to {}", prefix, stale, expected);
    }

    retagged
}

fn retag(name: &mut QName, prefix: &str, stale: &[String], new: &str) -> bool {
    if name.prefix.as_deref() == Some(prefix)
        && name.namespace.as_ref().is_some_and(|ns| stale.contains(ns))
    {
        name.namespace = Some(new.to_string());
        true
    } else {
        false
    }
}
