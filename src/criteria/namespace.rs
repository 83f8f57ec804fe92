//! Links between namespaces.

use std::collections::BTreeMap;

use crate::error::CriterionResult;
use crate::graph::{Row, Triple};
use crate::vocab;

use super::{Criterion, CriterionKind, MalformedRows, ResultMap};

/// Subject namespace to object namespace to predicate to count.
pub type LinkCounts = BTreeMap<String, BTreeMap<String, BTreeMap<String, i64>>>;

/// Number of IRI-to-IRI triples per subject namespace, object namespace and
/// predicate.
#[derive(Debug, Default)]
pub struct NamespaceLinks {
    links: LinkCounts,
}

impl NamespaceLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn links(&self) -> &LinkCounts {
        &self.links
    }

    fn add(&mut self, from: &str, to: &str, predicate: &str, n: i64) {
        *self
            .links
            .entry(from.to_string())
            .or_default()
            .entry(to.to_string())
            .or_default()
            .entry(predicate.to_string())
            .or_default() += n;
    }

    fn flattened(&self) -> impl Iterator<Item = (&str, &str, &str, i64)> {
        self.links.iter().flat_map(|(from, targets)| {
            targets.iter().flat_map(move |(to, predicates)| {
                predicates
                    .iter()
                    .map(move |(p, n)| (from.as_str(), to.as_str(), p.as_str(), *n))
            })
        })
    }
}

impl Criterion for NamespaceLinks {
    fn kind(&self) -> CriterionKind {
        CriterionKind::NamespaceLinks
    }

    fn init(&mut self) {
        self.links.clear();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        let (Some(s), Some(o)) = (triple.subject.as_iri(), triple.object.as_iri()) else {
            return;
        };
        self.add(
            vocab::namespace_of(s),
            vocab::namespace_of(o),
            &triple.predicate,
            1,
        );
    }

    fn aggregate_query(&self) -> String {
        "SELECT ?ns1 ?ns2 ?property (COUNT(*) AS ?numLinks) WHERE { \
           ?s ?property ?o FILTER(isIRI(?s) && isIRI(?o)) \
           BIND(REPLACE(STR(?s), \"[^/#]+$\", \"\") AS ?ns1) \
           BIND(REPLACE(STR(?o), \"[^/#]+$\", \"\") AS ?ns2) \
         } GROUP BY ?ns1 ?ns2 ?property"
            .to_string()
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        let mut malformed = MalformedRows::new(self.kind());
        for row in rows {
            let (Some(from), Some(to)) = (row.string("ns1"), row.string("ns2")) else {
                malformed.skip("ns1");
                continue;
            };
            let Some(property) = row.iri("property") else {
                malformed.skip("property");
                continue;
            };
            let Some(n) = row.integer("numLinks") else {
                malformed.skip("numLinks");
                continue;
            };
            self.add(from, to, property, n);
        }
        malformed.finish()
    }

    fn result_map(&mut self) -> ResultMap {
        self.flattened()
            .map(|(from, to, p, n)| (format!("{from}_linksTo_{to}_via_{p}"), n.into()))
            .collect()
    }

    fn report(&mut self) -> Vec<String> {
        let mut lines = vec![format!(
            "Result: number of linking namespaces = {}",
            self.links.len()
        )];
        lines.extend(
            self.flattened()
                .map(|(from, to, p, n)| format!("Result: {from} links to {to} via {p} {n} times")),
        );
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::MetricValue;
    use crate::graph::Term;

    const DBR: &str = "http://dbpedia.org/resource/";
    const FOAF: &str = "http://xmlns.com/foaf/0.1/";

    #[test]
    fn counts_iri_links_by_namespace_pair() {
        let knows = format!("{FOAF}knows");
        let triples = [
            Triple::iris(&format!("{DBR}Ada"), &knows, &format!("{DBR}Charles")),
            Triple::iris(&format!("{DBR}Ada"), &knows, "http://example.org/people#Bob"),
            Triple::iris(&format!("{DBR}Alan"), &knows, &format!("{DBR}Ada")),
            Triple::new(Term::iri(format!("{DBR}Ada")), format!("{FOAF}name"), Term::literal("Ada")),
            Triple::new(Term::blank("b0"), knows.clone(), Term::iri(format!("{DBR}Ada"))),
        ];
        let mut c = NamespaceLinks::new();
        c.init();
        for t in &triples {
            c.consider_triple(t);
        }
        let m = c.result_map();
        assert_eq!(m.len(), 2);
        assert_eq!(m[&format!("{DBR}_linksTo_{DBR}_via_{knows}")], MetricValue::Int(2));
        assert_eq!(
            m[&format!("{DBR}_linksTo_http://example.org/people#_via_{knows}")],
            MetricValue::Int(1)
        );
    }

    #[test]
    fn aggregate_rows_fill_the_same_map() {
        let xsd_int = "http://www.w3.org/2001/XMLSchema#integer";
        let rows = [Row::new()
            .with("ns1", Term::literal(DBR))
            .with("ns2", Term::literal(DBR))
            .with("property", Term::iri(format!("{FOAF}knows")))
            .with("numLinks", Term::typed_literal("2", xsd_int))];
        let mut c = NamespaceLinks::new();
        c.init();
        c.consume_aggregate_rows(&rows).unwrap();
        assert_eq!(c.links()[DBR][DBR][&format!("{FOAF}knows")], 2);
    }
}
