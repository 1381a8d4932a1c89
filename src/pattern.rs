//! Structural match patterns
//!
//! Rules locate nodes with a small path language:
//!
//! ```text
//! //a4j:form              every a4j:form element
//! //@reRender             every reRender attribute
//! /ui:composition/h:form  h:form children of the root composition
//! //rich:*[@id='x']       rich elements whose id is x
//! //h:panelGrid/@columns  columns attribute of any panelGrid
//! ```
//!
//! Prefixes in a pattern are resolved through a [`Bindings`] map supplied
//! at evaluation time. An unprefixed element test only matches elements
//! outside any namespace, and a prefix missing from the bindings matches
//! nothing.

use crate::document::{Document, Element, NodeId, QName};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Prefix -> namespace URI bindings used while evaluating a pattern
pub type Bindings = HashMap<String, String>;

/// Error while parsing a pattern
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid pattern '{pattern}' at offset {offset}: {message}")]
pub struct PatternError {
    pub pattern: String,
    pub offset: usize,
    pub message: String,
}

/// A node selected by a pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchedNode {
    Element(NodeId),
    /// Attribute identified by its owner and qualified name
    Attribute { element: NodeId, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    AnyInNamespace(String),
    Name { prefix: Option<String>, local: String },
}

impl NameTest {
    fn prefix(&self) -> Option<&str> {
        match self {
            NameTest::Any => None,
            NameTest::AnyInNamespace(prefix) => Some(prefix),
            NameTest::Name { prefix, .. } => prefix.as_deref(),
        }
    }

    fn matches_element(&self, name: &QName, bindings: &Bindings) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::AnyInNamespace(prefix) => match bindings.get(prefix) {
                Some(uri) => name.namespace.as_deref() == Some(uri.as_str()),
                None => false,
            },
            NameTest::Name { prefix, local } => {
                if &name.local != local {
                    return false;
                }
                match prefix {
                    Some(p) => match bindings.get(p) {
                        Some(uri) => name.namespace.as_deref() == Some(uri.as_str()),
                        None => false,
                    },
                    None => name.namespace.is_none(),
                }
            }
        }
    }

    // Unprefixed attributes never take the default namespace, so the
    // element rule applies unchanged.
    fn matches_attribute(&self, name: &QName, bindings: &Bindings) -> bool {
        self.matches_element(name, bindings)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Predicate {
    attribute: NameTest,
    value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Element(NameTest),
    Attribute(NameTest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    target: Target,
    predicates: Vec<Predicate>,
}

/// A parsed pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    steps: Vec<Step>,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        PatternParser::new(source).parse()
    }

    /// Prefixes the pattern references, in order of first use
    pub fn prefixes(&self) -> Vec<String> {
        let mut seen = Vec::new();
        let mut push = |test: &NameTest| {
            if let Some(prefix) = test.prefix() {
                if !seen.iter().any(|p: &String| p == prefix) {
                    seen.push(prefix.to_string());
                }
            }
        };
        for step in &self.steps {
            match &step.target {
                Target::Element(test) | Target::Attribute(test) => push(test),
            }
            for predicate in &step.predicates {
                push(&predicate.attribute);
            }
        }
        seen
    }

    /// Evaluate against a document; results come back in document order
    pub fn select(&self, doc: &Document, bindings: &Bindings) -> Vec<MatchedNode> {
        let mut context = vec![doc.document_node()];

        for step in &self.steps {
            match &step.target {
                Target::Element(test) => {
                    context = candidates(doc, &context, step.axis, false)
                        .into_iter()
                        .filter(|&id| {
                            doc.element(id).is_some_and(|el| {
                                test.matches_element(&el.name, bindings)
                                    && step
                                        .predicates
                                        .iter()
                                        .all(|p| predicate_holds(p, el, bindings))
                            })
                        })
                        .collect();
                }
                Target::Attribute(test) => {
                    let owners = candidates(doc, &context, step.axis, true);
                    return owners
                        .into_iter()
                        .filter_map(|id| doc.element(id).map(|el| (id, el)))
                        .flat_map(|(id, el)| {
                            el.attributes
                                .iter()
                                .filter(|a| test.matches_attribute(&a.name, bindings))
                                .map(move |a| MatchedNode::Attribute {
                                    element: id,
                                    name: a.name.qualified(),
                                })
                                .collect::<Vec<_>>()
                        })
                        .collect();
                }
            }
            if context.is_empty() {
                break;
            }
        }

        context.into_iter().map(MatchedNode::Element).collect()
    }
}

/// Elements reachable from the context along an axis, in document order.
///
/// Attribute steps look at the context elements themselves on the child
/// axis (`a/@x`) and at the context plus its descendants on the
/// descendant axis (`a//@x`).
fn candidates(doc: &Document, context: &[NodeId], axis: Axis, for_attributes: bool) -> Vec<NodeId> {
    match (axis, for_attributes) {
        (Axis::Child, false) => context
            .iter()
            .flat_map(|&id| doc.child_elements(id))
            .collect(),
        (Axis::Child, true) => context
            .iter()
            .copied()
            .filter(|&id| doc.element(id).is_some())
            .collect(),
        (Axis::Descendant, include_self) => {
            let context: HashSet<NodeId> = context.iter().copied().collect();
            doc.elements()
                .into_iter()
                .filter(|&id| {
                    (include_self && context.contains(&id))
                        || context.iter().any(|&c| doc.is_ancestor(c, id))
                })
                .collect()
        }
    }
}

fn predicate_holds(predicate: &Predicate, el: &Element, bindings: &Bindings) -> bool {
    el.attributes.iter().any(|a| {
        predicate.attribute.matches_attribute(&a.name, bindings)
            && predicate.value.as_ref().map_or(true, |v| &a.value == v)
    })
}

struct PatternParser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> PatternParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> PatternError {
        PatternError {
            pattern: self.source.to_string(),
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse(mut self) -> Result<Pattern, PatternError> {
        let mut steps = Vec::new();

        if self.chars.is_empty() {
            return Err(self.error("empty pattern"));
        }
        if self.peek() != Some('/') {
            return Err(self.error("pattern must start with '/' or '//'"));
        }

        while self.pos < self.chars.len() {
            if let Some(Step {
                target: Target::Attribute(_),
                ..
            }) = steps.last()
            {
                return Err(self.error("attribute step must be the last step"));
            }

            let axis = if self.eat('/') {
                if self.eat('/') {
                    Axis::Descendant
                } else {
                    Axis::Child
                }
            } else {
                return Err(self.error("expected '/'"));
            };

            let target = if self.eat('@') {
                Target::Attribute(self.name_test()?)
            } else {
                Target::Element(self.name_test()?)
            };

            let mut predicates = Vec::new();
            while self.eat('[') {
                if matches!(target, Target::Attribute(_)) {
                    return Err(self.error("predicates are not allowed on attribute steps"));
                }
                predicates.push(self.predicate()?);
            }

            steps.push(Step {
                axis,
                target,
                predicates,
            });
        }

        Ok(Pattern { steps })
    }

    fn ncname(&mut self) -> Option<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            let valid = if self.pos == start {
                c.is_alphabetic() || c == '_'
            } else {
                c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
            };
            if !valid {
                break;
            }
            self.pos += 1;
        }
        (self.pos > start).then(|| self.chars[start..self.pos].iter().collect())
    }

    fn name_test(&mut self) -> Result<NameTest, PatternError> {
        if self.eat('*') {
            return Ok(NameTest::Any);
        }
        let first = self.ncname().ok_or_else(|| self.error("expected a name"))?;
        if !self.eat(':') {
            return Ok(NameTest::Name {
                prefix: None,
                local: first,
            });
        }
        if self.eat('*') {
            return Ok(NameTest::AnyInNamespace(first));
        }
        let local = self
            .ncname()
            .ok_or_else(|| self.error("expected a local name after ':'"))?;
        Ok(NameTest::Name {
            prefix: Some(first),
            local,
        })
    }

    fn predicate(&mut self) -> Result<Predicate, PatternError> {
        self.skip_whitespace();
        if !self.eat('@') {
            return Err(self.error("only attribute predicates are supported"));
        }
        let attribute = self.name_test()?;
        self.skip_whitespace();

        let value = if self.eat('=') {
            self.skip_whitespace();
            Some(self.literal()?)
        } else {
            None
        };

        self.skip_whitespace();
        if !self.eat(']') {
            return Err(self.error("expected ']'"));
        }
        Ok(Predicate { attribute, value })
    }

    fn literal(&mut self) -> Result<String, PatternError> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted value")),
        };
        self.pos += 1;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let value = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                return Ok(value);
            }
            self.pos += 1;
        }
        Err(self.error("unterminated string"))
    }
}
