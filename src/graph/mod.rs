//! RDF data model shared by the dataset providers and the criteria.
//!
//! - [`Term`]: an IRI, blank node or literal
//! - [`Triple`]: one streamed statement
//! - [`Row`]: one solution of an aggregate query, keyed by variable name
//! - [`HierarchyGraph`](hierarchy::HierarchyGraph): explicit subsumption levels
//! - [`implicit`]: subsumption inferred from set containment

pub mod hierarchy;
pub mod implicit;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An RDF term as returned by a dataset provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    /// An absolute IRI, stored without angle brackets.
    Iri(String),
    /// A blank node label, unique within one dataset only.
    Blank(String),
    /// A literal with an optional datatype IRI or language tag.
    Literal {
        value: String,
        datatype: Option<String>,
        language: Option<String>,
    },
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Self::Blank(label.into())
    }

    /// A plain string literal.
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn lang_literal(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Self::Iri(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal { .. })
    }

    /// The IRI, if this term is one.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Key identifying a resource in criterion state.
    ///
    /// IRIs map to themselves and blank nodes to `_:label`, so the two can
    /// never collide. Literals map to their N-Triples form.
    pub fn key(&self) -> String {
        match self {
            Self::Iri(iri) => iri.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "{iri}"),
            Self::Blank(label) => write!(f, "_:{label}"),
            Self::Literal {
                value,
                datatype,
                language,
            } => {
                write!(f, "\"{}\"", value.escape_default())?;
                if let Some(lang) = language {
                    write!(f, "@{lang}")
                } else if let Some(dt) = datatype {
                    write!(f, "^^<{dt}>")
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// A single RDF statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    /// IRI or blank node.
    pub subject: Term,
    /// Predicate IRI.
    pub predicate: String,
    /// IRI, blank node or literal.
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }

    /// Shorthand for a triple whose three positions are IRIs.
    pub fn iris(subject: &str, predicate: &str, object: &str) -> Self {
        Self::new(Term::iri(subject), predicate, Term::iri(object))
    }

    /// Build a triple from a window row bound to `?subject ?predicate ?object`.
    ///
    /// Returns `None` when a binding is missing or the predicate is not an IRI.
    pub fn from_row(row: &Row) -> Option<Self> {
        let subject = row.get("subject")?.clone();
        if subject.is_literal() {
            return None;
        }
        let predicate = row.iri("predicate")?.to_string();
        let object = row.get("object")?.clone();
        Some(Self {
            subject,
            predicate,
            object,
        })
    }

    /// Whether this is an `rdf:type` statement with an IRI class.
    pub fn is_class_typing(&self) -> bool {
        self.predicate == crate::vocab::RDF_TYPE && self.object.is_iri()
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {}", self.subject, self.predicate, self.object)
    }
}

/// Triple component a stream window is sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKey {
    #[default]
    Subject,
    Predicate,
    Object,
}

impl OrderKey {
    /// SPARQL `ORDER BY` variables: the key first, then the remaining
    /// components so that the order is total and pages never overlap.
    pub fn order_by(self) -> &'static str {
        match self {
            Self::Subject => "?subject ?predicate ?object",
            Self::Predicate => "?predicate ?subject ?object",
            Self::Object => "?object ?subject ?predicate",
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Subject => "subject",
            Self::Predicate => "predicate",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// One solution of a SELECT query: variable name to bound term.
///
/// Unbound variables are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    bindings: BTreeMap<String, Term>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style binding, mostly for tests and fake providers.
    pub fn with(mut self, var: impl Into<String>, term: Term) -> Self {
        self.bindings.insert(var.into(), term);
        self
    }

    pub fn insert(&mut self, var: impl Into<String>, term: Term) {
        self.bindings.insert(var.into(), term);
    }

    pub fn get(&self, var: &str) -> Option<&Term> {
        self.bindings.get(var)
    }

    /// The binding as an IRI, if bound to one.
    pub fn iri(&self, var: &str) -> Option<&str> {
        self.get(var)?.as_iri()
    }

    /// The binding as a resource key (IRI or `_:label`).
    pub fn resource(&self, var: &str) -> Option<String> {
        match self.get(var)? {
            Term::Literal { .. } => None,
            term => Some(term.key()),
        }
    }

    /// The binding parsed as an integer literal.
    pub fn integer(&self, var: &str) -> Option<i64> {
        match self.get(var)? {
            Term::Literal { value, .. } => value.trim().parse().ok(),
            _ => None,
        }
    }

    /// The binding as a literal's lexical value.
    pub fn string(&self, var: &str) -> Option<&str> {
        match self.get(var)? {
            Term::Literal { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl From<&Triple> for Row {
    fn from(t: &Triple) -> Self {
        Row::new()
            .with("subject", t.subject.clone())
            .with("predicate", Term::iri(t.predicate.clone()))
            .with("object", t.object.clone())
    }
}
