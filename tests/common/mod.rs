//! Shared fixtures and test doubles for the integration tests.

#![allow(dead_code)]

use std::cell::Cell;

use rdf_synopsis::dataset::{DatasetProvider, OxigraphDataset};
use rdf_synopsis::error::{ProviderError, ProviderResult};
use rdf_synopsis::graph::{OrderKey, Row, Term, Triple};
use rdf_synopsis::vocab::{
    OWL_CLASS, OWL_SAME_AS, RDF_PROPERTY, RDF_TYPE, RDFS_CLASS, RDFS_RESOURCE, RDFS_SUBCLASS_OF,
    RDFS_SUBPROPERTY_OF, SKOS_CONCEPT,
};

pub const EX: &str = "http://example.com/";
pub const FOAF: &str = "http://xmlns.com/foaf/0.1/";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";

pub fn ex(local: &str) -> String {
    format!("{EX}{local}")
}

pub fn foaf(local: &str) -> String {
    format!("{FOAF}{local}")
}

/// Route `tracing` output through the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn dataset(triples: &[Triple]) -> OxigraphDataset {
    OxigraphDataset::from_triples(triples).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Twelve `rdfs:subClassOf` edges over ten vehicle classes, plus instances.
pub fn vehicles() -> Vec<Triple> {
    let edges = [
        ("Airplane", "Vehicle"),
        ("Car", "Thing"),
        ("Convertible", "Car"),
        ("Yacht", "Thing"),
        ("Motorbike", "Bike"),
        ("SUV", "Car"),
        ("Bike", "Thing"),
        ("Car", "Vehicle"),
        ("Vehicle", "Thing"),
        ("Bike", "Vehicle"),
        ("Ship", "Vehicle"),
        ("Yacht", "Ship"),
    ];
    let mut t: Vec<Triple> = edges
        .iter()
        .map(|(sub, sup)| Triple::iris(&ex(sub), RDFS_SUBCLASS_OF, &ex(sup)))
        .collect();
    // Ignored by the class hierarchy.
    t.push(Triple::iris(&ex("Car"), RDFS_SUBCLASS_OF, &ex("Car")));
    t.push(Triple::iris(&ex("Thing"), RDFS_SUBCLASS_OF, RDFS_RESOURCE));

    for (instance, class) in [
        ("beetle", "Car"),
        ("beetle", "Vehicle"),
        ("golf", "Car"),
        ("golf", "Vehicle"),
        ("golf", "Thing"),
        ("harley", "Motorbike"),
        ("queenMary", "Ship"),
        ("queenMary", "Vehicle"),
    ] {
        t.push(Triple::iris(&ex(instance), RDF_TYPE, &ex(class)));
    }
    t.push(Triple::new(
        Term::iri(ex("beetle")),
        ex("wheels"),
        Term::typed_literal("4", XSD_INTEGER),
    ));
    t.push(Triple::new(
        Term::iri(ex("golf")),
        ex("wheels"),
        Term::typed_literal("4", XSD_INTEGER),
    ));
    t.push(Triple::new(
        Term::iri(ex("harley")),
        ex("wheels"),
        Term::typed_literal("2", XSD_INTEGER),
    ));
    t.push(Triple::iris(&ex("golf"), &ex("madeBy"), "http://vw.example.org/company#VW"));
    t
}

/// Two people, two defined classes, one class without definition triple and
/// two defined properties over seven typed resources.
pub fn simple_ontology() -> Vec<Triple> {
    let person = foaf("Person");
    vec![
        Triple::new(Term::iri(ex("Max")), foaf("name"), Term::literal("Max Mustermann")),
        Triple::new(Term::iri(ex("Petra")), foaf("name"), Term::literal("Petra Mustermann")),
        Triple::iris(&ex("Petra"), &foaf("knows"), &ex("Max")),
        Triple::iris(&ex("Max"), &foaf("knows"), &ex("Petra")),
        Triple::iris(&ex("Max"), RDF_TYPE, &ex("Man")),
        Triple::iris(&ex("Petra"), RDF_TYPE, &ex("Woman")),
        Triple::iris(&ex("Max"), RDF_TYPE, &person),
        Triple::iris(&ex("Petra"), RDF_TYPE, &person),
        Triple::iris(&ex("Man"), RDFS_SUBCLASS_OF, &person),
        Triple::iris(&ex("Woman"), RDFS_SUBCLASS_OF, &person),
        Triple::iris(&ex("Woman"), RDF_TYPE, RDFS_CLASS),
        Triple::iris(&ex("Woman"), RDF_TYPE, OWL_CLASS),
        Triple::iris(&ex("Man"), RDF_TYPE, RDFS_CLASS),
        Triple::iris(&ex("Man"), RDF_TYPE, OWL_CLASS),
        Triple::iris(&person, RDF_TYPE, RDFS_CLASS),
        Triple::iris(RDF_TYPE, RDF_TYPE, RDF_PROPERTY),
        Triple::iris(RDFS_SUBCLASS_OF, RDF_TYPE, RDF_PROPERTY),
    ]
}

/// Two people with structured names held in blank nodes used as objects.
/// With `groups`, two more blank nodes each link both people as subjects.
pub fn blank_names(groups: bool) -> Vec<Triple> {
    let vcard = |local: &str| format!("http://www.w3.org/2006/vcard/ns#{local}");
    let mut t = Vec::new();
    for (person, blank, given, family) in [
        ("Max", "n1", "Max", "Mustermann"),
        ("Petra", "n2", "Petra", "Mustermann"),
    ] {
        t.push(Triple::new(Term::iri(ex(person)), vcard("N"), Term::blank(blank)));
        t.push(Triple::new(Term::blank(blank), vcard("Given"), Term::literal(given)));
        t.push(Triple::new(Term::blank(blank), vcard("Family"), Term::literal(family)));
    }
    if groups {
        for group in ["g1", "g2"] {
            for member in ["Max", "Petra"] {
                t.push(Triple::new(Term::blank(group), ex("contains"), Term::iri(ex(member))));
            }
        }
    }
    t
}

/// A small social graph touching every criterion: several namespaces,
/// literals of all kinds, untyped and blank subjects, `owl:sameAs`,
/// sub-properties, SKOS concepts and classes with equal extents.
pub fn people() -> Vec<Triple> {
    let dbr = |local: &str| format!("http://dbpedia.org/resource/{local}");
    let mut t = vec![
        Triple::iris(&ex("ann"), RDF_TYPE, &foaf("Person")),
        Triple::iris(&ex("ann"), RDF_TYPE, &ex("Employee")),
        Triple::iris(&ex("bob"), RDF_TYPE, &foaf("Person")),
        Triple::iris(&ex("bob"), RDF_TYPE, &ex("Employee")),
        Triple::iris(&ex("carl"), RDF_TYPE, &foaf("Person")),
        Triple::iris(&ex("acme"), RDF_TYPE, &foaf("Organization")),
        Triple::iris(&ex("acme"), RDF_TYPE, RDFS_RESOURCE),
        Triple::iris(&ex("dora"), RDF_TYPE, RDFS_RESOURCE),
        Triple::new(Term::iri(ex("ann")), RDF_TYPE, Term::literal("not a class")),
        Triple::new(Term::iri(ex("ann")), foaf("name"), Term::literal("Ann")),
        Triple::new(Term::iri(ex("ann")), foaf("nick"), Term::literal("Ann")),
        Triple::new(Term::iri(ex("bob")), foaf("name"), Term::lang_literal("Bob", "en")),
        Triple::new(Term::iri(ex("bob")), foaf("nick"), Term::lang_literal("Bob", "en")),
        Triple::new(Term::iri(ex("carl")), foaf("name"), Term::literal("Carl")),
        Triple::new(Term::iri(ex("dora")), foaf("name"), Term::literal("Dora")),
        Triple::new(Term::iri(ex("ann")), foaf("age"), Term::typed_literal("41", XSD_INTEGER)),
        Triple::iris(&ex("ann"), &foaf("knows"), &ex("bob")),
        Triple::iris(&ex("bob"), &foaf("knows"), &ex("ann")),
        Triple::iris(&ex("carl"), &foaf("knows"), &dbr("Ada_Lovelace")),
        Triple::iris(&ex("ann"), &ex("worksFor"), &ex("acme")),
        Triple::iris(&ex("bob"), &ex("worksFor"), &ex("acme")),
        Triple::iris(&ex("ann"), &ex("memberOf"), &ex("acme")),
        Triple::iris(&ex("bob"), &ex("memberOf"), &ex("acme")),
        Triple::iris(&ex("ann"), OWL_SAME_AS, &dbr("Ann")),
        Triple::iris(&dbr("Ada_Lovelace"), OWL_SAME_AS, "http://www.wikidata.org/entity/Q7259"),
        Triple::iris(&ex("worksFor"), RDFS_SUBPROPERTY_OF, &ex("memberOf")),
        Triple::iris(&foaf("nick"), RDFS_SUBPROPERTY_OF, &foaf("name")),
        Triple::iris(&ex("memberOf"), RDFS_SUBPROPERTY_OF, &ex("memberOf")),
        Triple::iris(&foaf("name"), RDF_TYPE, RDF_PROPERTY),
        Triple::iris(&foaf("Person"), RDF_TYPE, OWL_CLASS),
        Triple::iris(&ex("topic"), RDF_TYPE, SKOS_CONCEPT),
        Triple::new(Term::blank("addr"), ex("city"), Term::literal("Berlin")),
        Triple::new(Term::iri(ex("ann")), ex("address"), Term::blank("addr")),
        Triple::new(Term::blank("note"), RDF_TYPE, Term::iri(ex("Note"))),
        Triple::new(Term::blank("note"), ex("about"), Term::iri(ex("ann"))),
    ];
    t.push(Triple::new(
        Term::blank("note"),
        ex("text"),
        Term::lang_literal("Hallo", "de"),
    ));
    t
}

/// Subsumption cycles: `Cat` and `Feline` subclass each other below `Animal`,
/// and three properties form a `rdfs:subPropertyOf` ring.
pub fn subsumption_cycles() -> Vec<Triple> {
    vec![
        Triple::iris(&ex("Cat"), RDFS_SUBCLASS_OF, &ex("Feline")),
        Triple::iris(&ex("Feline"), RDFS_SUBCLASS_OF, &ex("Cat")),
        Triple::iris(&ex("Cat"), RDFS_SUBCLASS_OF, &ex("Animal")),
        Triple::iris(&ex("Kitten"), RDFS_SUBCLASS_OF, &ex("Cat")),
        Triple::iris(&ex("likes"), RDFS_SUBPROPERTY_OF, &ex("knows")),
        Triple::iris(&ex("knows"), RDFS_SUBPROPERTY_OF, &ex("meets")),
        Triple::iris(&ex("meets"), RDFS_SUBPROPERTY_OF, &ex("likes")),
        Triple::iris(&ex("tom"), RDF_TYPE, &ex("Cat")),
        Triple::iris(&ex("tom"), RDF_TYPE, &ex("Feline")),
        Triple::iris(&ex("tom"), &ex("likes"), &ex("jerry")),
        Triple::iris(&ex("tom"), &ex("knows"), &ex("jerry")),
    ]
}

/// Every fixture in one graph.
pub fn mixed() -> Vec<Triple> {
    let mut t = vehicles();
    t.extend(simple_ontology());
    t.extend(blank_names(true));
    t.extend(people());
    t
}

pub fn fixtures() -> Vec<(&'static str, Vec<Triple>)> {
    vec![
        ("empty", Vec::new()),
        ("vehicles", vehicles()),
        ("simple_ontology", simple_ontology()),
        ("blank_names", blank_names(false)),
        ("blank_groups", blank_names(true)),
        ("people", people()),
        ("mixed", mixed()),
        ("subsumption_cycles", subsumption_cycles()),
    ]
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Knows how many triples there are but cannot fetch any of them.
pub struct FailingProvider {
    pub total: u64,
}

impl DatasetProvider for FailingProvider {
    fn count(&self) -> ProviderResult<u64> {
        Ok(self.total)
    }

    fn window(&self, _order: OrderKey, _limit: usize, offset: usize) -> ProviderResult<Vec<Row>> {
        Err(ProviderError::Query {
            message: format!("connection reset while fetching offset {offset}"),
        })
    }

    fn run_aggregate_query(&self, _query: &str) -> ProviderResult<Vec<Row>> {
        Err(ProviderError::Query {
            message: "connection reset".into(),
        })
    }
}

/// Appends one incomplete row to every window of the wrapped provider.
pub struct MalformedRowProvider<P> {
    pub inner: P,
}

impl<P: DatasetProvider> DatasetProvider for MalformedRowProvider<P> {
    fn count(&self) -> ProviderResult<u64> {
        self.inner.count()
    }

    fn window(&self, order: OrderKey, limit: usize, offset: usize) -> ProviderResult<Vec<Row>> {
        let mut rows = self.inner.window(order, limit, offset)?;
        rows.push(
            Row::new()
                .with("subject", Term::iri(ex("orphan")))
                .with("predicate", Term::iri(ex("p"))),
        );
        Ok(rows)
    }

    fn run_aggregate_query(&self, query: &str) -> ProviderResult<Vec<Row>> {
        self.inner.run_aggregate_query(query)
    }
}

/// Fails the first `failures` window fetches with a transient error.
pub struct FlakyProvider<P> {
    pub inner: P,
    pub failures: Cell<u32>,
    pub calls: Cell<u32>,
}

impl<P> FlakyProvider<P> {
    pub fn new(inner: P, failures: u32) -> Self {
        Self {
            inner,
            failures: Cell::new(failures),
            calls: Cell::new(0),
        }
    }
}

impl<P: DatasetProvider> DatasetProvider for FlakyProvider<P> {
    fn count(&self) -> ProviderResult<u64> {
        self.inner.count()
    }

    fn window(&self, order: OrderKey, limit: usize, offset: usize) -> ProviderResult<Vec<Row>> {
        self.calls.set(self.calls.get() + 1);
        let left = self.failures.get();
        if left > 0 {
            self.failures.set(left - 1);
            return Err(ProviderError::Query {
                message: "temporarily unavailable".into(),
            });
        }
        self.inner.window(order, limit, offset)
    }

    fn run_aggregate_query(&self, query: &str) -> ProviderResult<Vec<Row>> {
        self.inner.run_aggregate_query(query)
    }
}
