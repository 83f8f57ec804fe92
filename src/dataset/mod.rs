//! Dataset providers: the source of triples and aggregate-query results.
//!
//! The analyzer only talks to a [`DatasetProvider`]. [`OxigraphDataset`] is
//! the in-process implementation; [`RetryingProvider`] wraps any provider with
//! bounded retry and a per-call deadline.

pub mod retry;
pub mod sparql;

pub use retry::{RetryPolicy, RetryingProvider};
pub use sparql::OxigraphDataset;

use crate::error::ProviderResult;
use crate::graph::{OrderKey, Row};

/// Read access to an RDF dataset.
///
/// Calls block until the provider answers. Implementations must return
/// windows under a total order so that consecutive offsets neither overlap
/// nor skip triples.
pub trait DatasetProvider {
    /// Total number of triples.
    fn count(&self) -> ProviderResult<u64>;

    /// One page of triples sorted by `order`, as rows bound to
    /// `?subject ?predicate ?object`.
    fn window(&self, order: OrderKey, limit: usize, offset: usize) -> ProviderResult<Vec<Row>>;

    /// Evaluate a SELECT query supplied by a criterion.
    fn run_aggregate_query(&self, query: &str) -> ProviderResult<Vec<Row>>;
}

impl<P: DatasetProvider + ?Sized> DatasetProvider for &P {
    fn count(&self) -> ProviderResult<u64> {
        (**self).count()
    }

    fn window(&self, order: OrderKey, limit: usize, offset: usize) -> ProviderResult<Vec<Row>> {
        (**self).window(order, limit, offset)
    }

    fn run_aggregate_query(&self, query: &str) -> ProviderResult<Vec<Row>> {
        (**self).run_aggregate_query(query)
    }
}

impl<P: DatasetProvider + ?Sized> DatasetProvider for Box<P> {
    fn count(&self) -> ProviderResult<u64> {
        (**self).count()
    }

    fn window(&self, order: OrderKey, limit: usize, offset: usize) -> ProviderResult<Vec<Row>> {
        (**self).window(order, limit, offset)
    }

    fn run_aggregate_query(&self, query: &str) -> ProviderResult<Vec<Row>> {
        (**self).run_aggregate_query(query)
    }
}
