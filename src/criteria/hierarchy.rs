//! Explicit and implicit class/property hierarchies.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::CriterionResult;
use crate::graph::hierarchy::HierarchyGraph;
use crate::graph::implicit::{ImplicitHierarchy, infer_class_hierarchy, infer_property_hierarchy};
use crate::graph::{Row, Term, Triple};
use crate::vocab::{self, SPARQL_PREFIXES};

use super::{Criterion, CriterionKind, LazyView, MalformedRows, MetricValue, ResultMap};

// ---------------------------------------------------------------------------
// Explicit hierarchies
// ---------------------------------------------------------------------------

/// Shared state of the explicit hierarchy criteria.
#[derive(Debug, Default)]
struct ExplicitHierarchy {
    graph: HierarchyGraph,
    statements: i64,
}

impl ExplicitHierarchy {
    fn add(&mut self, sub: &str, sup: &str) {
        if self.graph.add_edge(sub, sup) {
            self.statements += 1;
        }
    }

    fn consume_rows(&mut self, kind: CriterionKind, rows: &[Row]) -> CriterionResult<()> {
        let mut malformed = MalformedRows::new(kind);
        for row in rows {
            let Some(sub) = row.iri("sub") else {
                malformed.skip("sub");
                continue;
            };
            let Some(sup) = row.iri("super") else {
                malformed.skip("super");
                continue;
            };
            self.add(sub, sup);
        }
        malformed.finish()
    }

    fn result_map(&self, statements: &str, depth: &str, nodes: &str) -> ResultMap {
        ResultMap::from([
            (statements.to_string(), self.statements.into()),
            (depth.to_string(), self.graph.max_depth().into()),
            (nodes.to_string(), self.graph.node_count().into()),
        ])
    }

    fn report(&self, noun: &str) -> Vec<String> {
        let mut lines = vec![
            format!("Result: number of sub{noun} statements = {}", self.statements),
            format!("Result: {noun} hierarchy depth = {}", self.graph.max_depth()),
            format!("Result: {noun} nodes in hierarchy = {}", self.graph.node_count()),
        ];
        if self.graph.is_cyclic() {
            lines.push(format!("Result: {noun} hierarchy contains a cycle"));
        }
        lines.extend(self.graph.to_string().lines().map(str::to_string));
        lines
    }
}

/// Both ends of a hierarchy statement as IRIs.
fn iri_edge(triple: &Triple) -> Option<(&str, &str)> {
    Some((triple.subject.as_iri()?, triple.object.as_iri()?))
}

/// `rdfs:subClassOf` hierarchy between named classes.
///
/// Self-edges and edges into `rdfs:Resource` carry no structure and are
/// dropped.
#[derive(Debug, Default)]
pub struct ClassHierarchy {
    inner: ExplicitHierarchy,
}

impl ClassHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_statements(&self) -> i64 {
        self.inner.statements
    }

    pub fn depth(&self) -> usize {
        self.inner.graph.max_depth()
    }

    pub fn num_classes(&self) -> usize {
        self.inner.graph.node_count()
    }

    pub fn graph(&self) -> &HierarchyGraph {
        &self.inner.graph
    }
}

impl Criterion for ClassHierarchy {
    fn kind(&self) -> CriterionKind {
        CriterionKind::ClassHierarchy
    }

    fn init(&mut self) {
        self.inner = ExplicitHierarchy::default();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        if triple.predicate != vocab::RDFS_SUBCLASS_OF {
            return;
        }
        if let Some((sub, sup)) = iri_edge(triple) {
            if sup != vocab::RDFS_RESOURCE {
                self.inner.add(sub, sup);
            }
        }
    }

    fn aggregate_query(&self) -> String {
        format!(
            "{SPARQL_PREFIXES}\
             SELECT ?sub ?super WHERE {{ \
               ?sub rdfs:subClassOf ?super \
               FILTER(isIRI(?sub) && isIRI(?super) && ?sub != ?super && ?super != rdfs:Resource) \
             }}"
        )
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        let kind = self.kind();
        self.inner.consume_rows(kind, rows)
    }

    fn result_map(&mut self) -> ResultMap {
        self.inner
            .result_map("numSubclassStatements", "classHierarchyDepth", "classesInHierarchy")
    }

    fn hierarchy(&self) -> Option<&HierarchyGraph> {
        Some(&self.inner.graph)
    }

    fn report(&mut self) -> Vec<String> {
        self.inner.report("class")
    }
}

/// `rdfs:subPropertyOf` hierarchy between named properties.
#[derive(Debug, Default)]
pub struct PropertyHierarchy {
    inner: ExplicitHierarchy,
}

impl PropertyHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_statements(&self) -> i64 {
        self.inner.statements
    }

    pub fn depth(&self) -> usize {
        self.inner.graph.max_depth()
    }

    pub fn num_properties(&self) -> usize {
        self.inner.graph.node_count()
    }

    pub fn graph(&self) -> &HierarchyGraph {
        &self.inner.graph
    }
}

impl Criterion for PropertyHierarchy {
    fn kind(&self) -> CriterionKind {
        CriterionKind::PropertyHierarchy
    }

    fn init(&mut self) {
        self.inner = ExplicitHierarchy::default();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        if triple.predicate != vocab::RDFS_SUBPROPERTY_OF {
            return;
        }
        if let Some((sub, sup)) = iri_edge(triple) {
            self.inner.add(sub, sup);
        }
    }

    fn aggregate_query(&self) -> String {
        format!(
            "{SPARQL_PREFIXES}\
             SELECT ?sub ?super WHERE {{ \
               ?sub rdfs:subPropertyOf ?super \
               FILTER(isIRI(?sub) && isIRI(?super) && ?sub != ?super) \
             }}"
        )
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        let kind = self.kind();
        self.inner.consume_rows(kind, rows)
    }

    fn result_map(&mut self) -> ResultMap {
        self.inner.result_map(
            "numSubpropertyStatements",
            "propertyHierarchyDepth",
            "propertiesInHierarchy",
        )
    }

    fn hierarchy(&self) -> Option<&HierarchyGraph> {
        Some(&self.inner.graph)
    }

    fn report(&mut self) -> Vec<String> {
        self.inner.report("property")
    }
}

// ---------------------------------------------------------------------------
// Implicit hierarchies
// ---------------------------------------------------------------------------

fn consume_pairs(
    kind: CriterionKind,
    rows: &[Row],
    sub_var: &str,
    super_var: &str,
) -> (ImplicitHierarchy, CriterionResult<()>) {
    let mut hierarchy = ImplicitHierarchy::new();
    let mut malformed = MalformedRows::new(kind);
    for row in rows {
        let Some(sub) = row.iri(sub_var) else {
            malformed.skip(sub_var);
            continue;
        };
        let Some(sup) = row.iri(super_var) else {
            malformed.skip(super_var);
            continue;
        };
        hierarchy.insert(sub, sup);
    }
    (hierarchy, malformed.finish())
}

fn implicit_result_map(hierarchy: &ImplicitHierarchy, relation: &str, total: &str) -> ResultMap {
    let mut m: ResultMap = hierarchy
        .iter()
        .map(|(sub, sup)| (format!("{sub}_{relation}_{sup}"), MetricValue::Int(1)))
        .collect();
    m.insert(total.to_string(), hierarchy.len().into());
    m
}

fn implicit_report(hierarchy: &ImplicitHierarchy, relation: &str) -> Vec<String> {
    let mut lines = vec![format!(
        "Result: number of implicit {relation} statements = {}",
        hierarchy.len()
    )];
    lines.extend(
        hierarchy
            .iter()
            .map(|(sub, sup)| format!("Result: {sub} {relation} {sup}")),
    );
    for group in hierarchy.equivalence_groups() {
        let members: Vec<&str> = group.iter().map(String::as_str).collect();
        lines.push(format!("Result: equivalent under {relation}: {}", members.join(", ")));
    }
    lines
}

/// Class subsumption inferred from instance-set containment.
///
/// Instances are collected while streaming; the pairwise containment check
/// runs at the first read after new input.
#[derive(Debug, Default)]
pub struct ImplicitClassHierarchy {
    instances: BTreeMap<String, BTreeSet<String>>,
    view: LazyView<ImplicitHierarchy>,
}

impl ImplicitClassHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// The inferred hierarchy, finalizing it if needed.
    pub fn hierarchy_view(&mut self) -> &ImplicitHierarchy {
        self.view
            .get_or_finalize(|| infer_class_hierarchy(&self.instances))
    }

    /// How often the containment check ran.
    pub fn finalizations(&self) -> usize {
        self.view.finalizations()
    }
}

impl Criterion for ImplicitClassHierarchy {
    fn kind(&self) -> CriterionKind {
        CriterionKind::ImplicitClassHierarchy
    }

    fn init(&mut self) {
        *self = Self::default();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        if triple.predicate != vocab::RDF_TYPE {
            return;
        }
        match triple.object.as_iri() {
            Some(class) if class != vocab::RDFS_RESOURCE => {
                self.instances
                    .entry(class.to_string())
                    .or_default()
                    .insert(triple.subject.key());
                self.view.invalidate();
            }
            _ => {}
        }
    }

    fn aggregate_query(&self) -> String {
        format!(
            "{SPARQL_PREFIXES}\
             SELECT ?subClass ?superClass WHERE {{ \
               {{ SELECT DISTINCT ?subClass WHERE {{ \
                   ?a rdf:type ?subClass FILTER(isIRI(?subClass) && ?subClass != rdfs:Resource) }} }} \
               {{ SELECT DISTINCT ?superClass WHERE {{ \
                   ?b rdf:type ?superClass FILTER(isIRI(?superClass) && ?superClass != rdfs:Resource) }} }} \
               FILTER(?subClass != ?superClass) \
               FILTER NOT EXISTS {{ \
                 ?x rdf:type ?subClass \
                 FILTER NOT EXISTS {{ ?x rdf:type ?superClass }} \
               }} \
             }}"
        )
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        let (hierarchy, result) = consume_pairs(self.kind(), rows, "subClass", "superClass");
        self.view.set_finalized(hierarchy);
        result
    }

    fn result_map(&mut self) -> ResultMap {
        implicit_result_map(
            self.hierarchy_view(),
            "implicitSubClassOf",
            "implicitSubClassStatements",
        )
    }

    fn report(&mut self) -> Vec<String> {
        implicit_report(self.hierarchy_view(), "implicitSubClassOf")
    }
}

/// Property subsumption inferred from per-subject object-set containment.
#[derive(Debug, Default)]
pub struct ImplicitPropertyHierarchy {
    usage: BTreeMap<String, BTreeMap<String, BTreeSet<Term>>>,
    view: LazyView<ImplicitHierarchy>,
}

impl ImplicitPropertyHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// The inferred hierarchy, finalizing it if needed.
    pub fn hierarchy_view(&mut self) -> &ImplicitHierarchy {
        self.view
            .get_or_finalize(|| infer_property_hierarchy(&self.usage))
    }

    pub fn finalizations(&self) -> usize {
        self.view.finalizations()
    }
}

impl Criterion for ImplicitPropertyHierarchy {
    fn kind(&self) -> CriterionKind {
        CriterionKind::ImplicitPropertyHierarchy
    }

    fn init(&mut self) {
        *self = Self::default();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        self.usage
            .entry(triple.predicate.clone())
            .or_default()
            .entry(triple.subject.key())
            .or_default()
            .insert(triple.object.clone());
        self.view.invalidate();
    }

    fn aggregate_query(&self) -> String {
        "SELECT ?subProperty ?superProperty WHERE { \
           { SELECT DISTINCT ?subProperty WHERE { ?a ?subProperty ?b } } \
           { SELECT DISTINCT ?superProperty WHERE { ?c ?superProperty ?d } } \
           FILTER(?subProperty != ?superProperty) \
           FILTER NOT EXISTS { \
             ?s ?subProperty ?o \
             FILTER NOT EXISTS { ?s ?superProperty ?o } \
           } \
         }"
        .to_string()
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        let (hierarchy, result) =
            consume_pairs(self.kind(), rows, "subProperty", "superProperty");
        self.view.set_finalized(hierarchy);
        result
    }

    fn result_map(&mut self) -> ResultMap {
        implicit_result_map(
            self.hierarchy_view(),
            "implicitSubPropertyOf",
            "implicitSubPropertyStatements",
        )
    }

    fn report(&mut self) -> Vec<String> {
        implicit_report(self.hierarchy_view(), "implicitSubPropertyOf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EX: &str = "http://example.com/";

    fn ex(local: &str) -> String {
        format!("{EX}{local}")
    }

    fn feed(c: &mut dyn Criterion, triples: &[Triple]) {
        c.init();
        for t in triples {
            c.consider_triple(t);
        }
    }

    fn subclass(sub: &str, sup: &str) -> Triple {
        Triple::iris(&ex(sub), vocab::RDFS_SUBCLASS_OF, &ex(sup))
    }

    #[test]
    fn no_hierarchy() {
        let mut c = ClassHierarchy::new();
        feed(&mut c, &[Triple::iris(&ex("a"), "http://ex.org/p", &ex("b"))]);
        assert_eq!(c.num_statements(), 0);
        assert_eq!(c.depth(), 0);
        assert_eq!(c.num_classes(), 0);
    }

    #[test]
    fn simple_hierarchy() {
        let person = "http://xmlns.com/foaf/0.1/Person";
        let mut c = ClassHierarchy::new();
        feed(
            &mut c,
            &[
                Triple::iris(&ex("Man"), vocab::RDFS_SUBCLASS_OF, person),
                Triple::iris(&ex("Woman"), vocab::RDFS_SUBCLASS_OF, person),
            ],
        );
        assert_eq!(c.num_classes(), 3);
        assert_eq!(c.depth(), 1);
        assert_eq!(c.num_statements(), 2);
    }

    #[test]
    fn self_edges_and_rdfs_resource_are_dropped() {
        let mut c = ClassHierarchy::new();
        feed(
            &mut c,
            &[
                subclass("A", "A"),
                Triple::iris(&ex("A"), vocab::RDFS_SUBCLASS_OF, vocab::RDFS_RESOURCE),
                subclass("B", "A"),
            ],
        );
        assert_eq!(c.num_statements(), 1);
        assert_eq!(c.num_classes(), 2);
    }

    #[test]
    fn stream_and_rows_build_equal_graphs() {
        let triples = [subclass("B", "A"), subclass("C", "B"), subclass("D", "A")];
        let mut streamed = ClassHierarchy::new();
        feed(&mut streamed, &triples);

        let rows: Vec<Row> = triples
            .iter()
            .rev()
            .map(|t| {
                Row::new()
                    .with("sub", t.subject.clone())
                    .with("super", t.object.clone())
            })
            .collect();
        let mut queried = ClassHierarchy::new();
        queried.init();
        queried.consume_aggregate_rows(&rows).unwrap();

        assert!(streamed.same_results(&mut queried));
        assert_eq!(streamed.graph(), queried.graph());
    }

    #[test]
    fn property_hierarchy_counts_statements() {
        let mut c = PropertyHierarchy::new();
        feed(
            &mut c,
            &[
                Triple::iris(&ex("mother"), vocab::RDFS_SUBPROPERTY_OF, &ex("parent")),
                Triple::iris(&ex("parent"), vocab::RDFS_SUBPROPERTY_OF, &ex("relative")),
                Triple::iris(&ex("p"), vocab::RDFS_SUBPROPERTY_OF, &ex("p")),
            ],
        );
        let m = c.result_map();
        assert_eq!(m["numSubpropertyStatements"], MetricValue::Int(2));
        assert_eq!(m["propertyHierarchyDepth"], MetricValue::Int(2));
        assert_eq!(m["propertiesInHierarchy"], MetricValue::Int(3));
    }

    #[test]
    fn implicit_class_hierarchy_waits_for_late_types() {
        let triples = vec![
            Triple::iris(&ex("rex"), vocab::RDF_TYPE, &ex("Dog")),
            Triple::iris(&ex("rex"), vocab::RDF_TYPE, &ex("Animal")),
            Triple::iris(&ex("tom"), vocab::RDF_TYPE, &ex("Animal")),
            Triple::iris(&ex("tom"), vocab::RDF_TYPE, vocab::RDFS_RESOURCE),
        ];
        let mut c = ImplicitClassHierarchy::new();
        c.init();
        c.consider_triple(&triples[0]);
        assert_eq!(c.hierarchy_view().len(), 0);
        // Dog and Animal are momentarily equivalent.
        c.consider_triple(&triples[1]);
        assert_eq!(c.hierarchy_view().len(), 2);
        c.consider_triple(&triples[2]);
        c.consider_triple(&triples[3]);

        let m = c.result_map();
        assert_eq!(m[&format!("{EX}Dog_implicitSubClassOf_{EX}Animal")], MetricValue::Int(1));
        assert_eq!(m["implicitSubClassStatements"], MetricValue::Int(1));
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut c = ImplicitPropertyHierarchy::new();
        feed(
            &mut c,
            &[
                Triple::iris(&ex("ann"), &ex("mother"), &ex("eve")),
                Triple::iris(&ex("ann"), &ex("parent"), &ex("eve")),
                Triple::iris(&ex("ann"), &ex("parent"), &ex("bob")),
            ],
        );
        let first = c.result_map();
        let second = c.result_map();
        assert_eq!(first, second);
        assert_eq!(c.finalizations(), 1);
        assert_eq!(
            first[&format!("{EX}mother_implicitSubPropertyOf_{EX}parent")],
            MetricValue::Int(1)
        );
        assert_eq!(first["implicitSubPropertyStatements"], MetricValue::Int(1));
    }

    #[test]
    fn report_lists_equivalences() {
        let mut c = ImplicitClassHierarchy::new();
        feed(
            &mut c,
            &[
                Triple::iris(&ex("x"), vocab::RDF_TYPE, &ex("A")),
                Triple::iris(&ex("x"), vocab::RDF_TYPE, &ex("B")),
            ],
        );
        let report = c.report();
        assert!(report.iter().any(|l| l.starts_with("Result: equivalent under")));
    }
}
