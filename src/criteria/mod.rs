//! Statistical criteria: pluggable aggregators computing one metric family.
//!
//! Every criterion can be fed two ways and must end up in the same state:
//!
//! - **stream**: [`Criterion::consider_triple`] for every triple of the dataset
//! - **aggregate query**: [`Criterion::aggregate_query`] is evaluated by the
//!   provider and the rows are handed to [`Criterion::consume_aggregate_rows`]
//!
//! [`Criterion::result_map`] is the comparable, finalized view of that state.
//! Criteria whose metric needs a join over everything streamed so far keep
//! the join in a [`LazyView`] that is computed once per read after new input.

pub mod blank;
pub mod cooccurrence;
pub mod hierarchy;
pub mod namespace;
pub mod ratio;
pub mod usage;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CriterionError, CriterionResult, SinkResult};
use crate::graph::hierarchy::HierarchyGraph;
use crate::graph::{Row, Triple};
use crate::sink::ReportSink;

pub use blank::{DistinctSubjectOnlyBlanks, DistinctSubjectsBlank};
pub use cooccurrence::{
    ClassInstancesPerProperty, CommonProperties, PropertyUsagePerSubjectClass,
    TriplesPerSubjectClass,
};
pub use hierarchy::{ClassHierarchy, ImplicitClassHierarchy, ImplicitPropertyHierarchy, PropertyHierarchy};
pub use namespace::NamespaceLinks;
pub use ratio::{OntologyConceptRatio, OntologyRatio, SubjectObjectRatio, TypedSubjectRatio};
pub use usage::{ClassUsageCount, NumTriples, PredicateVocabularies, PropertyUsage, SameAs};

/// Value stored in scalar counters before a failed aggregate query.
pub const UNINITIALIZED: i64 = -1;

// ---------------------------------------------------------------------------
// Result values
// ---------------------------------------------------------------------------

/// A single metric value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Int(i) => *i as f64,
            Self::Float(f) => *f,
        }
    }
}

/// Bitwise equality, so that two finalized ratios compare exactly.
impl PartialEq for MetricValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for MetricValue {}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Metric name to value, ordered by name.
pub type ResultMap = BTreeMap<String, MetricValue>;

/// `numerator / denominator`, or exactly `0.0` for an empty denominator.
/// A negative input means a count is uninitialized and yields `-1.0`.
pub(crate) fn ratio(numerator: i64, denominator: i64) -> f64 {
    if numerator < 0 || denominator < 0 {
        UNINITIALIZED as f64
    } else if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

// ---------------------------------------------------------------------------
// Lazy join state
// ---------------------------------------------------------------------------

/// Two-phase derived view: accumulating (no view) or finalized.
///
/// New input drops the view; the next read computes it exactly once and
/// further reads return the cached value.
#[derive(Debug, Clone)]
pub(crate) struct LazyView<V> {
    view: Option<V>,
    finalizations: usize,
}

impl<V> Default for LazyView<V> {
    fn default() -> Self {
        Self {
            view: None,
            finalizations: 0,
        }
    }
}

impl<V> LazyView<V> {
    /// Back to accumulating; the next read recomputes.
    pub fn invalidate(&mut self) {
        self.view = None;
    }

    /// Finalize with `compute` unless already finalized.
    pub fn get_or_finalize(&mut self, compute: impl FnOnce() -> V) -> &V {
        if self.view.is_none() {
            self.finalizations += 1;
        }
        self.view.get_or_insert_with(compute)
    }

    /// Install an already final view, e.g. from aggregate rows.
    pub fn set_finalized(&mut self, view: V) {
        self.view = Some(view);
    }

    pub fn is_finalized(&self) -> bool {
        self.view.is_some()
    }

    /// How many times a view was computed since creation.
    pub fn finalizations(&self) -> usize {
        self.finalizations
    }
}

// ---------------------------------------------------------------------------
// Aggregate row helpers
// ---------------------------------------------------------------------------

/// Read a single integer binding from a scalar aggregate result.
pub(crate) fn scalar_from_rows(kind: CriterionKind, rows: &[Row], var: &str) -> CriterionResult<i64> {
    rows.first()
        .and_then(|row| row.integer(var))
        .ok_or_else(|| CriterionError::EmptyAggregate {
            criterion: kind.label().to_string(),
        })
}

/// Store a scalar read from aggregate rows, or the uninitialized sentinel.
pub(crate) fn apply_scalar(slot: &mut i64, value: CriterionResult<i64>) -> CriterionResult<()> {
    match value {
        Ok(v) => {
            *slot = v;
            Ok(())
        }
        Err(e) => {
            *slot = UNINITIALIZED;
            Err(e)
        }
    }
}

/// Tally of rows skipped while consuming grouped aggregate results.
pub(crate) struct MalformedRows {
    kind: CriterionKind,
    skipped: usize,
    first_binding: Option<String>,
}

impl MalformedRows {
    pub fn new(kind: CriterionKind) -> Self {
        Self {
            kind,
            skipped: 0,
            first_binding: None,
        }
    }

    pub fn skip(&mut self, binding: &str) {
        tracing::debug!(criterion = self.kind.label(), binding, "skipping malformed row");
        self.skipped += 1;
        if self.first_binding.is_none() {
            self.first_binding = Some(binding.to_string());
        }
    }

    /// `Ok` when every row was usable.
    pub fn finish(self) -> CriterionResult<()> {
        match self.first_binding {
            None => Ok(()),
            Some(binding) => Err(CriterionError::MalformedRow {
                criterion: self.kind.label().to_string(),
                binding,
                skipped: self.skipped,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Criterion contract
// ---------------------------------------------------------------------------

/// One pluggable statistic.
///
/// Criteria hold private state only, so the order in which triples are
/// dispatched to several criteria never matters.
pub trait Criterion: fmt::Debug + Send {
    fn kind(&self) -> CriterionKind;

    /// Reset all state for a new analysis run.
    fn init(&mut self);

    /// Incorporate one streamed triple.
    fn consider_triple(&mut self, triple: &Triple);

    /// SELECT query computing this criterion on the provider side.
    fn aggregate_query(&self) -> String;

    /// Incorporate the rows returned for [`Criterion::aggregate_query`].
    ///
    /// Usable rows are applied even when an error is returned; the error
    /// reports what was skipped.
    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()>;

    /// Current finalized metrics.
    fn result_map(&mut self) -> ResultMap;

    /// Explicit hierarchy built by this criterion, if any.
    fn hierarchy(&self) -> Option<&HierarchyGraph> {
        None
    }

    /// Human-readable report lines.
    fn report(&mut self) -> Vec<String> {
        self.result_map()
            .iter()
            .map(|(key, value)| format!("Result: {key} = {value}"))
            .collect()
    }

    /// Write the report and the metrics to a sink.
    fn flush(&mut self, sink: &mut dyn ReportSink) -> SinkResult<()> {
        let lines = self.report();
        sink.write_report(self.kind(), &lines)?;
        let metrics = self.result_map();
        sink.write_metrics(self.kind(), &metrics)
    }

    /// Whether both criteria reached the same finalized state.
    fn same_results(&mut self, other: &mut dyn Criterion) -> bool {
        self.kind() == other.kind()
            && self.result_map() == other.result_map()
            && self.hierarchy() == other.hierarchy()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Every available criterion, with stable numeric ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CriterionKind {
    ClassUsageCount,
    TriplesPerSubjectClass,
    ClassHierarchy,
    ImplicitClassHierarchy,
    OntologyConceptRatio,
    TypedSubjectRatio,
    PropertyUsage,
    PredicateVocabularies,
    PropertyUsagePerSubjectClass,
    ClassInstancesPerProperty,
    PropertyHierarchy,
    ImplicitPropertyHierarchy,
    DistinctSubjectsBlank,
    NamespaceLinks,
    DistinctSubjectOnlyBlanks,
    NumTriples,
    SameAs,
    CommonProperties,
    SubjectObjectRatio,
    OntologyRatio,
}

impl CriterionKind {
    const ALL: [CriterionKind; 20] = [
        Self::ClassUsageCount,
        Self::TriplesPerSubjectClass,
        Self::ClassHierarchy,
        Self::ImplicitClassHierarchy,
        Self::OntologyConceptRatio,
        Self::TypedSubjectRatio,
        Self::PropertyUsage,
        Self::PredicateVocabularies,
        Self::PropertyUsagePerSubjectClass,
        Self::ClassInstancesPerProperty,
        Self::PropertyHierarchy,
        Self::ImplicitPropertyHierarchy,
        Self::DistinctSubjectsBlank,
        Self::NamespaceLinks,
        Self::DistinctSubjectOnlyBlanks,
        Self::NumTriples,
        Self::SameAs,
        Self::CommonProperties,
        Self::SubjectObjectRatio,
        Self::OntologyRatio,
    ];

    /// All criteria in id order.
    pub fn all() -> &'static [CriterionKind] {
        &Self::ALL
    }

    /// The eighteen criteria selected by "all criteria" (ids 1 to 18).
    pub fn standard() -> &'static [CriterionKind] {
        &Self::ALL[..18]
    }

    /// Stable numeric id, starting at 1.
    pub fn id(self) -> u8 {
        Self::ALL.iter().position(|k| *k == self).unwrap_or(0) as u8 + 1
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(usize::from(id).checked_sub(1)?).copied()
    }

    /// Kebab-case name, as used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Self::ClassUsageCount => "class-usage-count",
            Self::TriplesPerSubjectClass => "triples-per-subject-class",
            Self::ClassHierarchy => "class-hierarchy",
            Self::ImplicitClassHierarchy => "implicit-class-hierarchy",
            Self::OntologyConceptRatio => "ontology-concept-ratio",
            Self::TypedSubjectRatio => "typed-subject-ratio",
            Self::PropertyUsage => "property-usage",
            Self::PredicateVocabularies => "predicate-vocabularies",
            Self::PropertyUsagePerSubjectClass => "property-usage-per-subject-class",
            Self::ClassInstancesPerProperty => "class-instances-per-property",
            Self::PropertyHierarchy => "property-hierarchy",
            Self::ImplicitPropertyHierarchy => "implicit-property-hierarchy",
            Self::DistinctSubjectsBlank => "distinct-subjects-blank",
            Self::NamespaceLinks => "namespace-links",
            Self::DistinctSubjectOnlyBlanks => "distinct-subject-only-blanks",
            Self::NumTriples => "num-triples",
            Self::SameAs => "same-as",
            Self::CommonProperties => "common-properties",
            Self::SubjectObjectRatio => "subject-object-ratio",
            Self::OntologyRatio => "ontology-ratio",
        }
    }

    /// Human-readable label used in reports and diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::ClassUsageCount => "Class usage count",
            Self::TriplesPerSubjectClass => "Triples per subject class",
            Self::ClassHierarchy => "Class hierarchy",
            Self::ImplicitClassHierarchy => "Implicit class hierarchy",
            Self::OntologyConceptRatio => "Ontology ratio with concepts",
            Self::TypedSubjectRatio => "Typed subject ratio",
            Self::PropertyUsage => "Property usage",
            Self::PredicateVocabularies => "Predicate vocabularies",
            Self::PropertyUsagePerSubjectClass => "Property usage per subject class",
            Self::ClassInstancesPerProperty => "Class instances per property",
            Self::PropertyHierarchy => "Property hierarchy",
            Self::ImplicitPropertyHierarchy => "Implicit property hierarchy",
            Self::DistinctSubjectsBlank => "Distinct blank subjects",
            Self::NamespaceLinks => "Namespace links",
            Self::DistinctSubjectOnlyBlanks => "Distinct subject-only blanks",
            Self::NumTriples => "Number of triples",
            Self::SameAs => "sameAs triples",
            Self::CommonProperties => "Common properties",
            Self::SubjectObjectRatio => "Subject/object ratio",
            Self::OntologyRatio => "Ontology ratio",
        }
    }

    /// A fresh, initialized criterion of this kind.
    pub fn create(self) -> Box<dyn Criterion> {
        match self {
            Self::ClassUsageCount => Box::new(ClassUsageCount::new()),
            Self::TriplesPerSubjectClass => Box::new(TriplesPerSubjectClass::new()),
            Self::ClassHierarchy => Box::new(ClassHierarchy::new()),
            Self::ImplicitClassHierarchy => Box::new(ImplicitClassHierarchy::new()),
            Self::OntologyConceptRatio => Box::new(OntologyConceptRatio::new()),
            Self::TypedSubjectRatio => Box::new(TypedSubjectRatio::new()),
            Self::PropertyUsage => Box::new(PropertyUsage::new()),
            Self::PredicateVocabularies => Box::new(PredicateVocabularies::new()),
            Self::PropertyUsagePerSubjectClass => Box::new(PropertyUsagePerSubjectClass::new()),
            Self::ClassInstancesPerProperty => Box::new(ClassInstancesPerProperty::new()),
            Self::PropertyHierarchy => Box::new(PropertyHierarchy::new()),
            Self::ImplicitPropertyHierarchy => Box::new(ImplicitPropertyHierarchy::new()),
            Self::DistinctSubjectsBlank => Box::new(DistinctSubjectsBlank::new()),
            Self::NamespaceLinks => Box::new(NamespaceLinks::new()),
            Self::DistinctSubjectOnlyBlanks => Box::new(DistinctSubjectOnlyBlanks::new()),
            Self::NumTriples => Box::new(NumTriples::new()),
            Self::SameAs => Box::new(SameAs::new()),
            Self::CommonProperties => Box::new(CommonProperties::new()),
            Self::SubjectObjectRatio => Box::new(SubjectObjectRatio::new()),
            Self::OntologyRatio => Box::new(OntologyRatio::new()),
        }
    }
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses a numeric id (`"7"`) or a kebab-case name (`"property-usage"`).
impl FromStr for CriterionKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let found = match s.parse::<u8>() {
            Ok(id) => Self::from_id(id),
            Err(_) => Self::ALL.iter().copied().find(|k| k.name() == s),
        };
        found.ok_or_else(|| ConfigError::UnknownCriterion { name: s.to_string() })
    }
}
