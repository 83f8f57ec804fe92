//! Class/property co-occurrence.
//!
//! A subject's `rdf:type` statements may stream in before or after its other
//! statements, so these criteria keep two independent maps while streaming
//! (subject to classes, and property usage) and join them when results are
//! read.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::CriterionResult;
use crate::graph::{Row, Triple};
use crate::vocab::SPARQL_PREFIXES;

use super::{Criterion, CriterionKind, LazyView, MalformedRows, MetricValue, ResultMap};

/// Classes of every subject seen in a class-typing triple.
#[derive(Debug, Default)]
struct SubjectClasses {
    classes: HashMap<String, BTreeSet<String>>,
}

impl SubjectClasses {
    /// Record a class-typing triple; `false` for any other triple.
    fn record(&mut self, triple: &Triple) -> bool {
        if !triple.is_class_typing() {
            return false;
        }
        if let Some(class) = triple.object.as_iri() {
            self.classes
                .entry(triple.subject.key())
                .or_default()
                .insert(class.to_string());
        }
        true
    }

    fn of(&self, subject: &str) -> Option<&BTreeSet<String>> {
        self.classes.get(subject)
    }

    /// Number of distinct instances per class.
    fn instance_counts(&self) -> BTreeMap<&str, i64> {
        let mut counts = BTreeMap::new();
        for classes in self.classes.values() {
            for class in classes {
                *counts.entry(class.as_str()).or_default() += 1;
            }
        }
        counts
    }
}

/// Distinct subjects per property over non-typing triples.
fn instances_per_class_property(
    subject_classes: &SubjectClasses,
    property_subjects: &BTreeMap<String, BTreeSet<String>>,
) -> BTreeMap<(String, String), i64> {
    let mut joined = BTreeMap::new();
    for (property, subjects) in property_subjects {
        for subject in subjects {
            let Some(classes) = subject_classes.of(subject) else {
                continue;
            };
            for class in classes {
                *joined
                    .entry((class.clone(), property.clone()))
                    .or_default() += 1;
            }
        }
    }
    joined
}

fn pair_metrics(
    pairs: impl IntoIterator<Item = ((String, String), i64)>,
    relation: &str,
) -> ResultMap {
    pairs
        .into_iter()
        .map(|((class, property), n)| (format!("{class}_{relation}_{property}"), n.into()))
        .collect()
}

/// Read `(?class, ?property, ?count)` rows.
fn consume_class_property_rows(
    kind: CriterionKind,
    rows: &[Row],
    count_var: &str,
) -> (BTreeMap<(String, String), i64>, CriterionResult<()>) {
    let mut out = BTreeMap::new();
    let mut malformed = MalformedRows::new(kind);
    for row in rows {
        let (Some(class), Some(property)) = (row.iri("class"), row.iri("property")) else {
            malformed.skip("class");
            continue;
        };
        let Some(n) = row.integer(count_var) else {
            malformed.skip(count_var);
            continue;
        };
        out.insert((class.to_string(), property.to_string()), n);
    }
    (out, malformed.finish())
}

const NON_TYPING_FILTER: &str = "FILTER(?property != rdf:type || !isIRI(?o))";

// ---------------------------------------------------------------------------
// Class instances per property
// ---------------------------------------------------------------------------

/// Number of distinct instances of each class that use each property.
#[derive(Debug, Default)]
pub struct ClassInstancesPerProperty {
    subject_classes: SubjectClasses,
    property_subjects: BTreeMap<String, BTreeSet<String>>,
    view: LazyView<BTreeMap<(String, String), i64>>,
}

impl ClassInstancesPerProperty {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(class, property)` to number of instances, finalizing if needed.
    pub fn counts(&mut self) -> &BTreeMap<(String, String), i64> {
        self.view.get_or_finalize(|| {
            instances_per_class_property(&self.subject_classes, &self.property_subjects)
        })
    }

    pub fn finalizations(&self) -> usize {
        self.view.finalizations()
    }
}

impl Criterion for ClassInstancesPerProperty {
    fn kind(&self) -> CriterionKind {
        CriterionKind::ClassInstancesPerProperty
    }

    fn init(&mut self) {
        *self = Self::default();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        if !self.subject_classes.record(triple) {
            self.property_subjects
                .entry(triple.predicate.clone())
                .or_default()
                .insert(triple.subject.key());
        }
        self.view.invalidate();
    }

    fn aggregate_query(&self) -> String {
        format!(
            "{SPARQL_PREFIXES}\
             SELECT ?class ?property (COUNT(DISTINCT ?s) AS ?numInstances) WHERE {{ \
               ?s rdf:type ?class FILTER(isIRI(?class)) \
               ?s ?property ?o {NON_TYPING_FILTER} \
             }} GROUP BY ?class ?property"
        )
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        let (counts, result) = consume_class_property_rows(self.kind(), rows, "numInstances");
        self.view.set_finalized(counts);
        result
    }

    fn result_map(&mut self) -> ResultMap {
        let counts = self.counts().clone();
        pair_metrics(counts, "classInstancesPerProperty")
    }
}

// ---------------------------------------------------------------------------
// Common properties
// ---------------------------------------------------------------------------

/// `(class, property)` pairs where every instance of the class uses the
/// property.
#[derive(Debug, Default)]
pub struct CommonProperties {
    subject_classes: SubjectClasses,
    property_subjects: BTreeMap<String, BTreeSet<String>>,
    view: LazyView<BTreeSet<(String, String)>>,
}

impl CommonProperties {
    pub fn new() -> Self {
        Self::default()
    }

    fn join(
        subject_classes: &SubjectClasses,
        property_subjects: &BTreeMap<String, BTreeSet<String>>,
    ) -> BTreeSet<(String, String)> {
        let instances = subject_classes.instance_counts();
        instances_per_class_property(subject_classes, property_subjects)
            .into_iter()
            .filter(|((class, _), users)| instances.get(class.as_str()) == Some(users))
            .map(|(pair, _)| pair)
            .collect()
    }

    /// Common `(class, property)` pairs, finalizing if needed.
    pub fn common(&mut self) -> &BTreeSet<(String, String)> {
        self.view
            .get_or_finalize(|| Self::join(&self.subject_classes, &self.property_subjects))
    }
}

impl Criterion for CommonProperties {
    fn kind(&self) -> CriterionKind {
        CriterionKind::CommonProperties
    }

    fn init(&mut self) {
        *self = Self::default();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        if !self.subject_classes.record(triple) {
            self.property_subjects
                .entry(triple.predicate.clone())
                .or_default()
                .insert(triple.subject.key());
        }
        self.view.invalidate();
    }

    fn aggregate_query(&self) -> String {
        format!(
            "{SPARQL_PREFIXES}\
             SELECT ?class ?property WHERE {{ \
               {{ SELECT ?class ?property (COUNT(DISTINCT ?s) AS ?numUsers) WHERE {{ \
                   ?s rdf:type ?class FILTER(isIRI(?class)) \
                   ?s ?property ?o {NON_TYPING_FILTER} \
               }} GROUP BY ?class ?property }} \
               {{ SELECT ?class (COUNT(DISTINCT ?i) AS ?numInstances) WHERE {{ \
                   ?i rdf:type ?class FILTER(isIRI(?class)) \
               }} GROUP BY ?class }} \
               FILTER(?numUsers = ?numInstances) \
             }}"
        )
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        let mut common = BTreeSet::new();
        let mut malformed = MalformedRows::new(self.kind());
        for row in rows {
            match (row.iri("class"), row.iri("property")) {
                (Some(class), Some(property)) => {
                    common.insert((class.to_string(), property.to_string()));
                }
                (None, _) => malformed.skip("class"),
                (_, None) => malformed.skip("property"),
            }
        }
        self.view.set_finalized(common);
        malformed.finish()
    }

    fn result_map(&mut self) -> ResultMap {
        self.common()
            .iter()
            .map(|(class, property)| {
                (
                    format!("{class}_classWithCommonProperty_{property}"),
                    MetricValue::Int(1),
                )
            })
            .collect()
    }

    fn report(&mut self) -> Vec<String> {
        let common = self.common();
        let mut lines = vec![format!(
            "Result: number of common class properties = {}",
            common.len()
        )];
        lines.extend(
            common
                .iter()
                .map(|(class, property)| format!("Result: all instances of {class} use {property}")),
        );
        lines
    }
}

// ---------------------------------------------------------------------------
// Property usage per subject class
// ---------------------------------------------------------------------------

/// Finalized property usage split by subject class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassPropertyUsage {
    /// `(class, property)` to number of triples.
    pub by_class: BTreeMap<(String, String), i64>,
    /// Property to number of triples whose subject has no class.
    pub untyped: BTreeMap<String, i64>,
}

/// Number of non-typing triples per subject class and property; subjects
/// without any class are counted per property separately.
#[derive(Debug, Default)]
pub struct PropertyUsagePerSubjectClass {
    subject_classes: SubjectClasses,
    subject_usage: HashMap<String, BTreeMap<String, i64>>,
    view: LazyView<ClassPropertyUsage>,
}

impl PropertyUsagePerSubjectClass {
    pub fn new() -> Self {
        Self::default()
    }

    fn join(
        subject_classes: &SubjectClasses,
        subject_usage: &HashMap<String, BTreeMap<String, i64>>,
    ) -> ClassPropertyUsage {
        let mut usage = ClassPropertyUsage::default();
        for (subject, properties) in subject_usage {
            match subject_classes.of(subject) {
                Some(classes) => {
                    for class in classes {
                        for (property, n) in properties {
                            *usage
                                .by_class
                                .entry((class.clone(), property.clone()))
                                .or_default() += n;
                        }
                    }
                }
                None => {
                    for (property, n) in properties {
                        *usage.untyped.entry(property.clone()).or_default() += n;
                    }
                }
            }
        }
        usage
    }

    /// Usage per class and untyped usage, finalizing if needed.
    pub fn usage(&mut self) -> &ClassPropertyUsage {
        self.view
            .get_or_finalize(|| Self::join(&self.subject_classes, &self.subject_usage))
    }
}

impl Criterion for PropertyUsagePerSubjectClass {
    fn kind(&self) -> CriterionKind {
        CriterionKind::PropertyUsagePerSubjectClass
    }

    fn init(&mut self) {
        *self = Self::default();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        if !self.subject_classes.record(triple) {
            *self
                .subject_usage
                .entry(triple.subject.key())
                .or_default()
                .entry(triple.predicate.clone())
                .or_default() += 1;
        }
        self.view.invalidate();
    }

    fn aggregate_query(&self) -> String {
        format!(
            "{SPARQL_PREFIXES}\
             SELECT ?class ?property (COUNT(*) AS ?numTriples) WHERE {{ \
               ?s ?property ?o {NON_TYPING_FILTER} \
               OPTIONAL {{ ?s rdf:type ?class FILTER(isIRI(?class)) }} \
             }} GROUP BY ?class ?property"
        )
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        let mut usage = ClassPropertyUsage::default();
        let mut malformed = MalformedRows::new(self.kind());
        for row in rows {
            let Some(property) = row.iri("property") else {
                malformed.skip("property");
                continue;
            };
            let Some(n) = row.integer("numTriples") else {
                malformed.skip("numTriples");
                continue;
            };
            match row.iri("class") {
                Some(class) => {
                    usage
                        .by_class
                        .insert((class.to_string(), property.to_string()), n);
                }
                None => {
                    usage.untyped.insert(property.to_string(), n);
                }
            }
        }
        self.view.set_finalized(usage);
        malformed.finish()
    }

    fn result_map(&mut self) -> ResultMap {
        let usage = self.usage().clone();
        let mut m = pair_metrics(usage.by_class, "classUsesProperty");
        m.extend(
            usage
                .untyped
                .into_iter()
                .map(|(property, n)| (format!("{property}_usedByUntyped"), n.into())),
        );
        m
    }

    fn report(&mut self) -> Vec<String> {
        let usage = self.usage();
        let classes: BTreeSet<&str> = usage.by_class.keys().map(|(c, _)| c.as_str()).collect();
        let mut lines = vec![format!("Result: number of classes found = {}", classes.len())];
        lines.extend(
            usage
                .by_class
                .iter()
                .map(|((class, property), n)| format!("Result: {class} uses {property} {n} times")),
        );
        lines.extend(
            usage
                .untyped
                .iter()
                .map(|(property, n)| format!("Result: untyped subjects use {property} {n} times")),
        );
        lines
    }
}

// ---------------------------------------------------------------------------
// Triples per subject class
// ---------------------------------------------------------------------------

/// Number of triples whose subject is an instance of each class.
///
/// A subject with several classes contributes all its triples to each.
#[derive(Debug, Default)]
pub struct TriplesPerSubjectClass {
    subject_classes: SubjectClasses,
    subject_triples: HashMap<String, i64>,
    view: LazyView<BTreeMap<String, i64>>,
}

impl TriplesPerSubjectClass {
    pub fn new() -> Self {
        Self::default()
    }

    fn join(
        subject_classes: &SubjectClasses,
        subject_triples: &HashMap<String, i64>,
    ) -> BTreeMap<String, i64> {
        let mut per_class = BTreeMap::new();
        for (subject, n) in subject_triples {
            if let Some(classes) = subject_classes.of(subject) {
                for class in classes {
                    *per_class.entry(class.clone()).or_default() += n;
                }
            }
        }
        per_class
    }

    /// Triples per class, finalizing if needed.
    pub fn triples_per_class(&mut self) -> &BTreeMap<String, i64> {
        self.view
            .get_or_finalize(|| Self::join(&self.subject_classes, &self.subject_triples))
    }
}

impl Criterion for TriplesPerSubjectClass {
    fn kind(&self) -> CriterionKind {
        CriterionKind::TriplesPerSubjectClass
    }

    fn init(&mut self) {
        *self = Self::default();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        self.subject_classes.record(triple);
        *self.subject_triples.entry(triple.subject.key()).or_default() += 1;
        self.view.invalidate();
    }

    fn aggregate_query(&self) -> String {
        format!(
            "{SPARQL_PREFIXES}\
             SELECT ?class (COUNT(*) AS ?numTriples) WHERE {{ \
               ?s rdf:type ?class FILTER(isIRI(?class)) \
               ?s ?p ?o \
             }} GROUP BY ?class"
        )
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        let mut per_class = BTreeMap::new();
        let mut malformed = MalformedRows::new(self.kind());
        for row in rows {
            let Some(class) = row.iri("class") else {
                malformed.skip("class");
                continue;
            };
            let Some(n) = row.integer("numTriples") else {
                malformed.skip("numTriples");
                continue;
            };
            per_class.insert(class.to_string(), n);
        }
        self.view.set_finalized(per_class);
        malformed.finish()
    }

    fn result_map(&mut self) -> ResultMap {
        self.triples_per_class()
            .iter()
            .map(|(class, n)| (format!("{class}_triplesPerSubjectClass"), (*n).into()))
            .collect()
    }
}
