//! Usage counters: triples, classes, properties, vocabularies, `owl:sameAs`.

use std::collections::BTreeMap;

use crate::error::CriterionResult;
use crate::graph::{Row, Triple};
use crate::vocab::{self, SPARQL_PREFIXES};

use super::{
    Criterion, CriterionKind, MalformedRows, ResultMap, apply_scalar, scalar_from_rows,
};

/// Add grouped `(key, count)` rows to a counter map.
fn consume_counts(
    kind: CriterionKind,
    counts: &mut BTreeMap<String, i64>,
    rows: &[Row],
    key_var: &str,
    key: impl Fn(&Row) -> Option<String>,
    count_var: &str,
) -> CriterionResult<()> {
    let mut malformed = MalformedRows::new(kind);
    for row in rows {
        let Some(k) = key(row) else {
            malformed.skip(key_var);
            continue;
        };
        let Some(n) = row.integer(count_var) else {
            malformed.skip(count_var);
            continue;
        };
        *counts.entry(k).or_default() += n;
    }
    malformed.finish()
}

fn suffixed(counts: &BTreeMap<String, i64>, suffix: &str) -> ResultMap {
    counts
        .iter()
        .map(|(k, n)| (format!("{k}{suffix}"), (*n).into()))
        .collect()
}

// ---------------------------------------------------------------------------
// Number of triples
// ---------------------------------------------------------------------------

/// Total number of triples.
#[derive(Debug, Default)]
pub struct NumTriples {
    num_triples: i64,
}

impl NumTriples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_triples(&self) -> i64 {
        self.num_triples
    }
}

impl Criterion for NumTriples {
    fn kind(&self) -> CriterionKind {
        CriterionKind::NumTriples
    }

    fn init(&mut self) {
        self.num_triples = 0;
    }

    fn consider_triple(&mut self, _triple: &Triple) {
        self.num_triples = self.num_triples.max(0) + 1;
    }

    fn aggregate_query(&self) -> String {
        "SELECT (COUNT(*) AS ?numTriples) WHERE { ?s ?p ?o }".to_string()
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        let value = scalar_from_rows(self.kind(), rows, "numTriples");
        apply_scalar(&mut self.num_triples, value)
    }

    fn result_map(&mut self) -> ResultMap {
        ResultMap::from([("numTriples".to_string(), self.num_triples.into())])
    }

    fn report(&mut self) -> Vec<String> {
        vec![format!("Result: number of triples = {}", self.num_triples)]
    }
}

// ---------------------------------------------------------------------------
// Class usage
// ---------------------------------------------------------------------------

/// Number of `rdf:type` statements per class.
#[derive(Debug, Default)]
pub struct ClassUsageCount {
    usage: BTreeMap<String, i64>,
}

impl ClassUsageCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn usage(&self) -> &BTreeMap<String, i64> {
        &self.usage
    }
}

impl Criterion for ClassUsageCount {
    fn kind(&self) -> CriterionKind {
        CriterionKind::ClassUsageCount
    }

    fn init(&mut self) {
        self.usage.clear();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        if triple.predicate != vocab::RDF_TYPE {
            return;
        }
        if let Some(class) = triple.object.as_iri() {
            *self.usage.entry(class.to_string()).or_default() += 1;
        }
    }

    fn aggregate_query(&self) -> String {
        format!(
            "{SPARQL_PREFIXES}\
             SELECT ?class (COUNT(*) AS ?numInstances) WHERE {{ \
               ?s rdf:type ?class FILTER(isIRI(?class)) \
             }} GROUP BY ?class"
        )
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        consume_counts(
            self.kind(),
            &mut self.usage,
            rows,
            "class",
            |row| row.iri("class").map(str::to_string),
            "numInstances",
        )
    }

    fn result_map(&mut self) -> ResultMap {
        suffixed(&self.usage, "_classUsage")
    }

    fn report(&mut self) -> Vec<String> {
        let mut lines = vec![format!("Result: number of classes used = {}", self.usage.len())];
        lines.extend(
            self.usage
                .iter()
                .map(|(class, n)| format!("Result: {n} instances of class {class}")),
        );
        lines
    }
}

// ---------------------------------------------------------------------------
// Property usage
// ---------------------------------------------------------------------------

/// Number of triples per predicate.
#[derive(Debug, Default)]
pub struct PropertyUsage {
    usage: BTreeMap<String, i64>,
}

impl PropertyUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn usage(&self) -> &BTreeMap<String, i64> {
        &self.usage
    }
}

impl Criterion for PropertyUsage {
    fn kind(&self) -> CriterionKind {
        CriterionKind::PropertyUsage
    }

    fn init(&mut self) {
        self.usage.clear();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        *self.usage.entry(triple.predicate.clone()).or_default() += 1;
    }

    fn aggregate_query(&self) -> String {
        "SELECT ?property (COUNT(*) AS ?numTriples) WHERE { ?s ?property ?o } GROUP BY ?property"
            .to_string()
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        consume_counts(
            self.kind(),
            &mut self.usage,
            rows,
            "property",
            |row| row.iri("property").map(str::to_string),
            "numTriples",
        )
    }

    fn result_map(&mut self) -> ResultMap {
        suffixed(&self.usage, "_propertyUsage")
    }

    fn report(&mut self) -> Vec<String> {
        let mut lines = vec![format!("Result: number of properties used = {}", self.usage.len())];
        lines.extend(
            self.usage
                .iter()
                .map(|(p, n)| format!("Result: {n} triples with property {p}")),
        );
        lines
    }
}

// ---------------------------------------------------------------------------
// Predicate vocabularies
// ---------------------------------------------------------------------------

/// Number of triples per predicate namespace.
#[derive(Debug, Default)]
pub struct PredicateVocabularies {
    usage: BTreeMap<String, i64>,
}

impl PredicateVocabularies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn usage(&self) -> &BTreeMap<String, i64> {
        &self.usage
    }
}

impl Criterion for PredicateVocabularies {
    fn kind(&self) -> CriterionKind {
        CriterionKind::PredicateVocabularies
    }

    fn init(&mut self) {
        self.usage.clear();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        let ns = vocab::namespace_of(&triple.predicate);
        *self.usage.entry(ns.to_string()).or_default() += 1;
    }

    fn aggregate_query(&self) -> String {
        "SELECT ?vocabulary (COUNT(*) AS ?numTriples) WHERE { \
           ?s ?p ?o BIND(REPLACE(STR(?p), \"[^/#]+$\", \"\") AS ?vocabulary) \
         } GROUP BY ?vocabulary"
            .to_string()
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        consume_counts(
            self.kind(),
            &mut self.usage,
            rows,
            "vocabulary",
            |row| row.string("vocabulary").map(str::to_string),
            "numTriples",
        )
    }

    fn result_map(&mut self) -> ResultMap {
        suffixed(&self.usage, "_predVocabUsage")
    }

    fn report(&mut self) -> Vec<String> {
        let mut lines = vec![format!(
            "Result: number of predicate vocabularies used = {}",
            self.usage.len()
        )];
        lines.extend(
            self.usage
                .iter()
                .map(|(ns, n)| format!("Result: {n} triples with predicate vocabulary {ns}")),
        );
        lines
    }
}

// ---------------------------------------------------------------------------
// owl:sameAs
// ---------------------------------------------------------------------------

/// Number of `owl:sameAs` triples.
#[derive(Debug, Default)]
pub struct SameAs {
    num_same_as: i64,
}

impl SameAs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_same_as(&self) -> i64 {
        self.num_same_as
    }
}

impl Criterion for SameAs {
    fn kind(&self) -> CriterionKind {
        CriterionKind::SameAs
    }

    fn init(&mut self) {
        self.num_same_as = 0;
    }

    fn consider_triple(&mut self, triple: &Triple) {
        if triple.predicate == vocab::OWL_SAME_AS {
            self.num_same_as = self.num_same_as.max(0) + 1;
        }
    }

    fn aggregate_query(&self) -> String {
        format!(
            "{SPARQL_PREFIXES}\
             SELECT (COUNT(*) AS ?numSameAsTriples) WHERE {{ ?s owl:sameAs ?o }}"
        )
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        let value = scalar_from_rows(self.kind(), rows, "numSameAsTriples");
        apply_scalar(&mut self.num_same_as, value)
    }

    fn result_map(&mut self) -> ResultMap {
        ResultMap::from([("SameAsTriples".to_string(), self.num_same_as.into())])
    }

    fn report(&mut self) -> Vec<String> {
        vec![format!("Result: number of sameAs triples = {}", self.num_same_as)]
    }
}
