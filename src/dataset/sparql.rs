//! In-memory RDF dataset backed by oxigraph.
//!
//! Windows and aggregate queries are plain SPARQL SELECT queries evaluated by
//! the embedded store.

use oxigraph::model::{
    BlankNode, GraphName, Literal, NamedNode, Quad, Term as OxTerm,
};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::error::{ProviderError, ProviderResult};
use crate::graph::{OrderKey, Row, Term, Triple};

use super::DatasetProvider;

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// SPARQL-capable in-memory dataset.
pub struct OxigraphDataset {
    store: Store,
}

impl OxigraphDataset {
    /// Create an empty in-memory dataset.
    pub fn in_memory() -> ProviderResult<Self> {
        let store = Store::new().map_err(|e| ProviderError::Store {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self { store })
    }

    /// Create a dataset holding the given triples.
    pub fn from_triples<'a>(triples: impl IntoIterator<Item = &'a Triple>) -> ProviderResult<Self> {
        let dataset = Self::in_memory()?;
        dataset.extend(triples)?;
        Ok(dataset)
    }

    fn named_node(iri: &str) -> ProviderResult<NamedNode> {
        NamedNode::new(iri).map_err(|e| ProviderError::InvalidTerm {
            message: format!("invalid IRI <{iri}>: {e}"),
        })
    }

    fn blank_node(label: &str) -> ProviderResult<BlankNode> {
        BlankNode::new(label).map_err(|e| ProviderError::InvalidTerm {
            message: format!("invalid blank node _:{label}: {e}"),
        })
    }

    fn to_object(term: &Term) -> ProviderResult<OxTerm> {
        Ok(match term {
            Term::Iri(iri) => Self::named_node(iri)?.into(),
            Term::Blank(label) => Self::blank_node(label)?.into(),
            Term::Literal {
                value,
                language: Some(lang),
                ..
            } => Literal::new_language_tagged_literal(value.as_str(), lang.as_str())
                .map_err(|e| ProviderError::InvalidTerm {
                    message: format!("invalid language tag {lang}: {e}"),
                })?
                .into(),
            Term::Literal {
                value,
                datatype: Some(dt),
                ..
            } => Literal::new_typed_literal(value.as_str(), Self::named_node(dt)?).into(),
            Term::Literal { value, .. } => Literal::new_simple_literal(value.as_str()).into(),
        })
    }

    /// Convert a store term back into the crate's model.
    ///
    /// `xsd:string` literals come back without a datatype so that plain
    /// literals compare equal to the ones inserted.
    fn from_ox(term: &OxTerm) -> Option<Term> {
        match term {
            OxTerm::NamedNode(node) => Some(Term::Iri(node.as_str().to_string())),
            OxTerm::BlankNode(node) => Some(Term::Blank(node.as_str().to_string())),
            OxTerm::Literal(literal) => Some(if let Some(lang) = literal.language() {
                Term::lang_literal(literal.value(), lang)
            } else if literal.datatype().as_str() == XSD_STRING {
                Term::literal(literal.value())
            } else {
                Term::typed_literal(literal.value(), literal.datatype().as_str())
            }),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// Insert a triple into the default graph.
    pub fn insert_triple(&self, triple: &Triple) -> ProviderResult<()> {
        let predicate = Self::named_node(&triple.predicate)?;
        let object = Self::to_object(&triple.object)?;
        let quad = match &triple.subject {
            Term::Iri(iri) => Quad::new(
                Self::named_node(iri)?,
                predicate,
                object,
                GraphName::DefaultGraph,
            ),
            Term::Blank(label) => Quad::new(
                Self::blank_node(label)?,
                predicate,
                object,
                GraphName::DefaultGraph,
            ),
            Term::Literal { .. } => {
                return Err(ProviderError::InvalidTerm {
                    message: format!("literal subject in {triple}"),
                });
            }
        };

        self.store.insert(&quad).map_err(|e| ProviderError::Store {
            message: format!("insert failed: {e}"),
        })?;
        Ok(())
    }

    /// Insert every triple, returning how many were processed.
    pub fn extend<'a>(&self, triples: impl IntoIterator<Item = &'a Triple>) -> ProviderResult<usize> {
        let mut count = 0;
        for triple in triples {
            self.insert_triple(triple)?;
            count += 1;
        }
        Ok(count)
    }

    /// Number of triples held by the store.
    pub fn len(&self) -> ProviderResult<usize> {
        Ok(self.count()? as usize)
    }

    pub fn is_empty(&self) -> ProviderResult<bool> {
        self.len().map(|n| n == 0)
    }

    /// Execute a SELECT query and convert every solution into a [`Row`].
    pub fn query_select(&self, sparql: &str) -> ProviderResult<Vec<Row>> {
        let results = self.store.query(sparql).map_err(|e| ProviderError::Query {
            message: format!("SPARQL query failed: {e}"),
        })?;

        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| ProviderError::Query {
                        message: format!("solution error: {e}"),
                    })?;
                    let mut row = Row::new();
                    for (var, term) in solution.iter() {
                        match Self::from_ox(term) {
                            Some(term) => row.insert(var.as_str(), term),
                            None => {
                                tracing::debug!(var = var.as_str(), "skipping unsupported term kind")
                            }
                        }
                    }
                    rows.push(row);
                }
                Ok(rows)
            }
            QueryResults::Boolean(_) => Err(ProviderError::UnexpectedResult {
                message: "ASK queries are not supported".into(),
            }),
            QueryResults::Graph(_) => Err(ProviderError::UnexpectedResult {
                message: "CONSTRUCT/DESCRIBE queries are not supported".into(),
            }),
        }
    }
}

impl DatasetProvider for OxigraphDataset {
    fn count(&self) -> ProviderResult<u64> {
        let rows = self.query_select("SELECT (COUNT(*) AS ?numTriples) WHERE { ?s ?p ?o }")?;
        let count = rows
            .first()
            .and_then(|row| row.integer("numTriples"))
            .ok_or_else(|| ProviderError::UnexpectedResult {
                message: "count query returned no integer".into(),
            })?;
        Ok(count.max(0) as u64)
    }

    fn window(&self, order: OrderKey, limit: usize, offset: usize) -> ProviderResult<Vec<Row>> {
        let query = format!(
            "SELECT ?subject ?predicate ?object WHERE {{ ?subject ?predicate ?object }} \
             ORDER BY {} LIMIT {limit} OFFSET {offset}",
            order.order_by()
        );
        self.query_select(&query)
    }

    fn run_aggregate_query(&self, query: &str) -> ProviderResult<Vec<Row>> {
        self.query_select(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Triple> {
        vec![
            Triple::iris("http://ex.org/a", "http://ex.org/p", "http://ex.org/b"),
            Triple::new(Term::blank("n1"), "http://ex.org/p", Term::literal("plain")),
            Triple::new(
                Term::iri("http://ex.org/a"),
                "http://ex.org/label",
                Term::lang_literal("Haus", "de"),
            ),
            Triple::new(
                Term::iri("http://ex.org/b"),
                "http://ex.org/age",
                Term::typed_literal("7", "http://www.w3.org/2001/XMLSchema#integer"),
            ),
        ]
    }

    #[test]
    fn count_matches_inserted() {
        let ds = OxigraphDataset::from_triples(&sample()).unwrap();
        assert_eq!(ds.count().unwrap(), 4);
        assert!(!ds.is_empty().unwrap());
    }

    #[test]
    fn empty_store_counts_zero() {
        let ds = OxigraphDataset::in_memory().unwrap();
        assert_eq!(ds.count().unwrap(), 0);
        assert!(ds.window(OrderKey::Subject, 10, 0).unwrap().is_empty());
    }

    #[test]
    fn windows_round_trip_terms() {
        let triples = sample();
        let ds = OxigraphDataset::from_triples(&triples).unwrap();
        let rows = ds.window(OrderKey::Predicate, 100, 0).unwrap();
        let mut back: Vec<Triple> = rows.iter().filter_map(Triple::from_row).collect();
        let mut expected = triples.clone();
        back.sort_by_key(|t| t.to_string());
        expected.sort_by_key(|t| t.to_string());
        assert_eq!(back, expected);
    }

    #[test]
    fn windows_partition_the_dataset() {
        let triples: Vec<Triple> = (0..23)
            .map(|i| Triple::iris(&format!("http://ex.org/s{}", i % 5), "http://ex.org/p", &format!("http://ex.org/o{i}")))
            .collect();
        let ds = OxigraphDataset::from_triples(&triples).unwrap();
        for order in [OrderKey::Subject, OrderKey::Predicate, OrderKey::Object] {
            let mut seen = Vec::new();
            for offset in (0..23).step_by(4) {
                let rows = ds.window(order, 4, offset).unwrap();
                assert!(rows.len() <= 4);
                seen.extend(rows.iter().filter_map(Triple::from_row));
            }
            assert_eq!(seen.len(), 23, "order {order}");
            let distinct: std::collections::HashSet<_> = seen.iter().collect();
            assert_eq!(distinct.len(), 23, "order {order}");
        }
    }

    #[test]
    fn literal_subject_is_rejected() {
        let ds = OxigraphDataset::in_memory().unwrap();
        let bad = Triple::new(Term::literal("x"), "http://ex.org/p", Term::iri("http://ex.org/o"));
        assert!(matches!(
            ds.insert_triple(&bad),
            Err(ProviderError::InvalidTerm { .. })
        ));
    }

    #[test]
    fn invalid_query_is_transient_query_error() {
        let ds = OxigraphDataset::in_memory().unwrap();
        let err = ds.run_aggregate_query("SELEKT nothing").unwrap_err();
        assert!(matches!(err, ProviderError::Query { .. }));
    }

    #[test]
    fn ask_query_is_rejected() {
        let ds = OxigraphDataset::in_memory().unwrap();
        let err = ds.run_aggregate_query("ASK { ?s ?p ?o }").unwrap_err();
        assert!(matches!(err, ProviderError::UnexpectedResult { .. }));
    }
}
