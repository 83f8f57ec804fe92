//! Typing and ontology ratios.
//!
//! Stream state keeps the distinct resources seen so far; the counts used by
//! the ratio are refreshed after every triple so that reads are O(1). The
//! aggregate path sets the counts directly.

use std::collections::HashSet;

use crate::error::{CriterionError, CriterionResult};
use crate::graph::{Row, Triple};
use crate::vocab::{self, SPARQL_PREFIXES};

use super::{Criterion, CriterionKind, ResultMap, UNINITIALIZED, ratio};

/// Read several integer bindings from the first row of a scalar aggregate.
fn counts_from_rows<const N: usize>(
    kind: CriterionKind,
    rows: &[Row],
    vars: [&str; N],
) -> CriterionResult<[i64; N]> {
    let row = rows.first().ok_or_else(|| CriterionError::EmptyAggregate {
        criterion: kind.label().to_string(),
    })?;
    let mut out = [0; N];
    for (slot, var) in out.iter_mut().zip(vars) {
        *slot = row.integer(var).ok_or_else(|| CriterionError::MalformedRow {
            criterion: kind.label().to_string(),
            binding: var.to_string(),
            skipped: 1,
        })?;
    }
    Ok(out)
}

fn is_rdfs_resource(triple: &Triple) -> bool {
    triple.object.as_iri() == Some(vocab::RDFS_RESOURCE)
}

// ---------------------------------------------------------------------------
// Typed subject ratio
// ---------------------------------------------------------------------------

/// Share of subjects (of non-type triples) that are also typed with a class
/// other than `rdfs:Resource`.
#[derive(Debug, Default)]
pub struct TypedSubjectRatio {
    subjects: HashSet<String>,
    typed_candidates: HashSet<String>,
    typed_subjects: HashSet<String>,
    num_subjects: i64,
    num_typed_subjects: i64,
}

impl TypedSubjectRatio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ratio(&self) -> f64 {
        ratio(self.num_typed_subjects, self.num_subjects)
    }
}

impl Criterion for TypedSubjectRatio {
    fn kind(&self) -> CriterionKind {
        CriterionKind::TypedSubjectRatio
    }

    fn init(&mut self) {
        *self = Self::default();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        let subject = triple.subject.key();
        if triple.predicate == vocab::RDF_TYPE {
            if triple.object.is_iri() && !is_rdfs_resource(triple) {
                if self.subjects.contains(&subject) {
                    self.typed_subjects.insert(subject.clone());
                }
                self.typed_candidates.insert(subject);
            }
        } else {
            if self.typed_candidates.contains(&subject) {
                self.typed_subjects.insert(subject.clone());
            }
            self.subjects.insert(subject);
        }
        self.num_subjects = self.subjects.len() as i64;
        self.num_typed_subjects = self.typed_subjects.len() as i64;
    }

    fn aggregate_query(&self) -> String {
        format!(
            "{SPARQL_PREFIXES}\
             SELECT (COUNT(DISTINCT ?s) AS ?numSubjects) (COUNT(DISTINCT ?ts) AS ?numTypedSubjects) \
             WHERE {{ \
               ?s ?p ?o FILTER(?p != rdf:type) \
               OPTIONAL {{ \
                 ?s rdf:type ?class \
                 FILTER(isIRI(?class) && ?class != rdfs:Resource) \
                 BIND(?s AS ?ts) \
               }} \
             }}"
        )
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        match counts_from_rows(self.kind(), rows, ["numSubjects", "numTypedSubjects"]) {
            Ok([subjects, typed]) => {
                self.num_subjects = subjects;
                self.num_typed_subjects = typed;
                Ok(())
            }
            Err(e) => {
                self.num_subjects = UNINITIALIZED;
                self.num_typed_subjects = UNINITIALIZED;
                Err(e)
            }
        }
    }

    fn result_map(&mut self) -> ResultMap {
        ResultMap::from([("TypedSubjectRatio".to_string(), self.ratio().into())])
    }

    fn report(&mut self) -> Vec<String> {
        vec![format!(
            "Result: TypedSubjectRatio = {} (|S|={}; |TS|={})",
            self.ratio(),
            self.num_subjects,
            self.num_typed_subjects
        )]
    }
}

// ---------------------------------------------------------------------------
// Subject/object ratio
// ---------------------------------------------------------------------------

/// Share of IRIs used both as subject and as object among all IRIs used in
/// either position.
#[derive(Debug, Default)]
pub struct SubjectObjectRatio {
    subjects: HashSet<String>,
    objects: HashSet<String>,
    num_common: i64,
    num_distinct: i64,
}

impl SubjectObjectRatio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ratio(&self) -> f64 {
        ratio(self.num_common, self.num_distinct)
    }
}

impl Criterion for SubjectObjectRatio {
    fn kind(&self) -> CriterionKind {
        CriterionKind::SubjectObjectRatio
    }

    fn init(&mut self) {
        *self = Self::default();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        let mut common = self.num_common.max(0);
        if let Some(s) = triple.subject.as_iri() {
            if self.subjects.insert(s.to_string()) && self.objects.contains(s) {
                common += 1;
            }
        }
        if let Some(o) = triple.object.as_iri() {
            if self.objects.insert(o.to_string()) && self.subjects.contains(o) {
                common += 1;
            }
        }
        self.num_common = common;
        self.num_distinct = (self.subjects.len() + self.objects.len()) as i64 - common;
    }

    fn aggregate_query(&self) -> String {
        "SELECT ?numCommon ?numDistinct WHERE { \
           { SELECT (COUNT(DISTINCT ?r) AS ?numCommon) WHERE { \
               ?r ?p ?o FILTER(isIRI(?r)) FILTER EXISTS { ?x ?y ?r } \
           } } \
           { SELECT (COUNT(DISTINCT ?r) AS ?numDistinct) WHERE { \
               { ?r ?p ?o } UNION { ?s ?p ?r } FILTER(isIRI(?r)) \
           } } \
         }"
        .to_string()
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        match counts_from_rows(self.kind(), rows, ["numCommon", "numDistinct"]) {
            Ok([common, distinct]) => {
                self.num_common = common;
                self.num_distinct = distinct;
                Ok(())
            }
            Err(e) => {
                self.num_common = UNINITIALIZED;
                self.num_distinct = UNINITIALIZED;
                Err(e)
            }
        }
    }

    fn result_map(&mut self) -> ResultMap {
        ResultMap::from([("SubjectObjectRatio".to_string(), self.ratio().into())])
    }

    fn report(&mut self) -> Vec<String> {
        vec![format!(
            "Result: SubjectObjectRatio = {} (|S&O|={}; |S|O|={})",
            self.ratio(),
            self.num_common,
            self.num_distinct
        )]
    }
}

// ---------------------------------------------------------------------------
// Ontology ratio
// ---------------------------------------------------------------------------

/// Share of typed IRI resources that are defined classes or properties.
#[derive(Debug, Default)]
pub struct OntologyRatio {
    typed: HashSet<String>,
    classes: HashSet<String>,
    properties: HashSet<String>,
    num_typed: i64,
    num_classes: i64,
    num_properties: i64,
}

impl OntologyRatio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ratio(&self) -> f64 {
        if self.num_classes < 0 || self.num_properties < 0 {
            return UNINITIALIZED as f64;
        }
        ratio(self.num_classes + self.num_properties, self.num_typed)
    }
}

impl Criterion for OntologyRatio {
    fn kind(&self) -> CriterionKind {
        CriterionKind::OntologyRatio
    }

    fn init(&mut self) {
        *self = Self::default();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        if triple.predicate != vocab::RDF_TYPE {
            return;
        }
        let Some(subject) = triple.subject.as_iri() else {
            return;
        };
        self.typed.insert(subject.to_string());
        match triple.object.as_iri() {
            Some(vocab::RDFS_CLASS) | Some(vocab::OWL_CLASS) => {
                self.classes.insert(subject.to_string());
            }
            Some(vocab::RDF_PROPERTY) => {
                self.properties.insert(subject.to_string());
            }
            _ => {}
        }
        self.num_typed = self.typed.len() as i64;
        self.num_classes = self.classes.len() as i64;
        self.num_properties = self.properties.len() as i64;
    }

    fn aggregate_query(&self) -> String {
        format!(
            "{SPARQL_PREFIXES}\
             SELECT ?numTypedResources ?numDefClasses ?numDefProperties WHERE {{ \
               {{ SELECT (COUNT(DISTINCT ?s) AS ?numTypedResources) WHERE {{ \
                   ?s rdf:type ?t FILTER(isIRI(?s)) }} }} \
               {{ SELECT (COUNT(DISTINCT ?s) AS ?numDefClasses) WHERE {{ \
                   ?s rdf:type ?t FILTER(isIRI(?s) && ?t IN (rdfs:Class, owl:Class)) }} }} \
               {{ SELECT (COUNT(DISTINCT ?s) AS ?numDefProperties) WHERE {{ \
                   ?s rdf:type rdf:Property FILTER(isIRI(?s)) }} }} \
             }}"
        )
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        let vars = ["numTypedResources", "numDefClasses", "numDefProperties"];
        match counts_from_rows(self.kind(), rows, vars) {
            Ok([typed, classes, properties]) => {
                self.num_typed = typed;
                self.num_classes = classes;
                self.num_properties = properties;
                Ok(())
            }
            Err(e) => {
                self.num_typed = UNINITIALIZED;
                self.num_classes = UNINITIALIZED;
                self.num_properties = UNINITIALIZED;
                Err(e)
            }
        }
    }

    fn result_map(&mut self) -> ResultMap {
        ResultMap::from([("OntologyRatio".to_string(), self.ratio().into())])
    }

    fn report(&mut self) -> Vec<String> {
        vec![format!(
            "Result: ontologyRatio = {} (|C|={}; |P|={}; |I|={})",
            self.ratio(),
            self.num_classes,
            self.num_properties,
            self.num_typed
        )]
    }
}

// ---------------------------------------------------------------------------
// Ontology ratio with SKOS concepts
// ---------------------------------------------------------------------------

/// Share of typed resources that are classes, SKOS concepts or properties.
///
/// Typing with `rdfs:Resource` does not make a resource typed.
#[derive(Debug, Default)]
pub struct OntologyConceptRatio {
    typed: HashSet<String>,
    classes: HashSet<String>,
    concepts: HashSet<String>,
    properties: HashSet<String>,
    num_typed: i64,
    num_classes: i64,
    num_concepts: i64,
    num_properties: i64,
}

impl OntologyConceptRatio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ratio(&self) -> f64 {
        if self.num_classes < 0 || self.num_concepts < 0 || self.num_properties < 0 {
            return UNINITIALIZED as f64;
        }
        ratio(
            self.num_classes + self.num_concepts + self.num_properties,
            self.num_typed,
        )
    }
}

impl Criterion for OntologyConceptRatio {
    fn kind(&self) -> CriterionKind {
        CriterionKind::OntologyConceptRatio
    }

    fn init(&mut self) {
        *self = Self::default();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        if triple.predicate != vocab::RDF_TYPE {
            return;
        }
        let subject = triple.subject.key();
        if !is_rdfs_resource(triple) {
            self.typed.insert(subject.clone());
        }
        match triple.object.as_iri() {
            Some(vocab::RDFS_CLASS) | Some(vocab::OWL_CLASS) => {
                self.classes.insert(subject);
            }
            Some(vocab::SKOS_CONCEPT) => {
                self.concepts.insert(subject);
            }
            Some(vocab::RDF_PROPERTY) => {
                self.properties.insert(subject);
            }
            _ => {}
        }
        self.num_typed = self.typed.len() as i64;
        self.num_classes = self.classes.len() as i64;
        self.num_concepts = self.concepts.len() as i64;
        self.num_properties = self.properties.len() as i64;
    }

    fn aggregate_query(&self) -> String {
        format!(
            "{SPARQL_PREFIXES}\
             SELECT ?numTypedResources ?numDefClasses ?numDefConcepts ?numDefProperties WHERE {{ \
               {{ SELECT (COUNT(DISTINCT ?s) AS ?numTypedResources) WHERE {{ \
                   ?s rdf:type ?t FILTER(!isIRI(?t) || ?t != rdfs:Resource) }} }} \
               {{ SELECT (COUNT(DISTINCT ?s) AS ?numDefClasses) WHERE {{ \
                   ?s rdf:type ?t FILTER(?t IN (rdfs:Class, owl:Class)) }} }} \
               {{ SELECT (COUNT(DISTINCT ?s) AS ?numDefConcepts) WHERE {{ \
                   ?s rdf:type skos:Concept }} }} \
               {{ SELECT (COUNT(DISTINCT ?s) AS ?numDefProperties) WHERE {{ \
                   ?s rdf:type rdf:Property }} }} \
             }}"
        )
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        let vars = [
            "numTypedResources",
            "numDefClasses",
            "numDefConcepts",
            "numDefProperties",
        ];
        match counts_from_rows(self.kind(), rows, vars) {
            Ok([typed, classes, concepts, properties]) => {
                self.num_typed = typed;
                self.num_classes = classes;
                self.num_concepts = concepts;
                self.num_properties = properties;
                Ok(())
            }
            Err(e) => {
                self.num_typed = UNINITIALIZED;
                self.num_classes = UNINITIALIZED;
                self.num_concepts = UNINITIALIZED;
                self.num_properties = UNINITIALIZED;
                Err(e)
            }
        }
    }

    fn result_map(&mut self) -> ResultMap {
        ResultMap::from([("OntologyRatioWithConcepts".to_string(), self.ratio().into())])
    }

    fn report(&mut self) -> Vec<String> {
        vec![format!(
            "Result: ontologyRatio = {} (|CL|={}; |CO|={}; |P|={}; |I|={})",
            self.ratio(),
            self.num_classes,
            self.num_concepts,
            self.num_properties,
            self.num_typed
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Term;

    const EX: &str = "http://example.com/";
    const FOAF_PERSON: &str = "http://xmlns.com/foaf/0.1/Person";

    fn ex(local: &str) -> String {
        format!("{EX}{local}")
    }

    fn feed(c: &mut dyn Criterion, triples: &[Triple]) {
        c.init();
        for t in triples {
            c.consider_triple(t);
        }
    }

    /// Two people who know each other, with names.
    fn people() -> Vec<Triple> {
        let fn_ = "http://www.w3.org/2006/vcard/ns#fn";
        let knows = "http://xmlns.com/foaf/0.1/knows";
        vec![
            Triple::new(Term::iri(ex("Max")), fn_, Term::literal("Max Mustermann")),
            Triple::new(Term::iri(ex("Petra")), fn_, Term::literal("Petra Mustermann")),
            Triple::iris(&ex("Petra"), knows, &ex("Max")),
            Triple::iris(&ex("Max"), knows, &ex("Petra")),
        ]
    }

    /// Classes, instances and property definitions over [`people`].
    fn simple_ontology() -> Vec<Triple> {
        let mut t = people();
        t.extend([
            Triple::iris(&ex("Max"), vocab::RDF_TYPE, &ex("Man")),
            Triple::iris(&ex("Petra"), vocab::RDF_TYPE, &ex("Woman")),
            Triple::iris(&ex("Max"), vocab::RDF_TYPE, FOAF_PERSON),
            Triple::iris(&ex("Petra"), vocab::RDF_TYPE, FOAF_PERSON),
            Triple::iris(&ex("Man"), vocab::RDFS_SUBCLASS_OF, FOAF_PERSON),
            Triple::iris(&ex("Woman"), vocab::RDFS_SUBCLASS_OF, FOAF_PERSON),
            Triple::iris(&ex("Woman"), vocab::RDF_TYPE, vocab::RDFS_CLASS),
            Triple::iris(&ex("Woman"), vocab::RDF_TYPE, vocab::OWL_CLASS),
            Triple::iris(&ex("Man"), vocab::RDF_TYPE, vocab::RDFS_CLASS),
            Triple::iris(&ex("Man"), vocab::RDF_TYPE, vocab::OWL_CLASS),
            Triple::iris(FOAF_PERSON, vocab::RDF_TYPE, vocab::RDFS_CLASS),
            Triple::iris(vocab::RDF_TYPE, vocab::RDF_TYPE, vocab::RDF_PROPERTY),
            Triple::iris(vocab::RDFS_SUBCLASS_OF, vocab::RDF_TYPE, vocab::RDF_PROPERTY),
        ]);
        t
    }

    #[test]
    fn ontology_ratios_without_ontology_are_zero() {
        let mut classic = OntologyRatio::new();
        feed(&mut classic, &people());
        assert_eq!(classic.ratio().to_bits(), 0.0f64.to_bits());

        let mut concepts = OntologyConceptRatio::new();
        feed(&mut concepts, &people());
        assert_eq!(concepts.ratio().to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn simple_ontology_ratio_is_five_sevenths() {
        let mut classic = OntologyRatio::new();
        feed(&mut classic, &simple_ontology());
        assert!((classic.ratio() - 5.0 / 7.0).abs() < 1e-12);

        let mut concepts = OntologyConceptRatio::new();
        feed(&mut concepts, &simple_ontology());
        assert!((concepts.ratio() - 5.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn concepts_count_and_rdfs_resource_does_not_type() {
        let triples = vec![
            Triple::iris(&ex("topic"), vocab::RDF_TYPE, vocab::SKOS_CONCEPT),
            Triple::iris(&ex("thing"), vocab::RDF_TYPE, vocab::RDFS_RESOURCE),
            Triple::new(Term::blank("b"), vocab::RDF_TYPE, Term::iri(ex("C"))),
        ];
        let mut c = OntologyConceptRatio::new();
        feed(&mut c, &triples);
        assert_eq!(c.ratio(), 0.5);

        let mut classic = OntologyRatio::new();
        feed(&mut classic, &triples);
        assert_eq!(classic.ratio(), 0.0);
    }

    #[test]
    fn typed_subject_ratio_is_order_independent() {
        let triples = vec![
            Triple::iris(&ex("a"), "http://ex.org/p", &ex("b")),
            Triple::iris(&ex("b"), "http://ex.org/p", &ex("a")),
            Triple::iris(&ex("a"), vocab::RDF_TYPE, &ex("C")),
            Triple::iris(&ex("b"), vocab::RDF_TYPE, vocab::RDFS_RESOURCE),
            Triple::iris(&ex("c"), vocab::RDF_TYPE, &ex("C")),
        ];
        let mut forward = TypedSubjectRatio::new();
        feed(&mut forward, &triples);
        assert_eq!(forward.ratio(), 0.5);

        let mut reversed_triples = triples.clone();
        reversed_triples.reverse();
        let mut backward = TypedSubjectRatio::new();
        feed(&mut backward, &reversed_triples);
        assert!(forward.same_results(&mut backward));
    }

    #[test]
    fn subject_object_ratio_counts_iris_only() {
        let triples = vec![
            Triple::iris(&ex("a"), "http://ex.org/p", &ex("b")),
            Triple::iris(&ex("b"), "http://ex.org/p", &ex("c")),
            Triple::iris(&ex("d"), "http://ex.org/p", &ex("d")),
            Triple::new(Term::blank("x"), "http://ex.org/p", Term::iri(ex("a"))),
            Triple::new(Term::iri(ex("e")), "http://ex.org/p", Term::literal("e")),
        ];
        let mut c = SubjectObjectRatio::new();
        feed(&mut c, &triples);
        // a, b, d are both subject and object among a, b, c, d, e.
        assert_eq!(c.ratio(), 3.0 / 5.0);
    }

    #[test]
    fn missing_binding_sets_sentinel() {
        let rows = vec![Row::new().with(
            "numSubjects",
            Term::typed_literal("3", "http://www.w3.org/2001/XMLSchema#integer"),
        )];
        let mut c = TypedSubjectRatio::new();
        c.init();
        assert!(c.consume_aggregate_rows(&rows).is_err());
        assert_eq!(c.ratio(), -1.0);
    }
}
