//! Analysis driver.
//!
//! An [`Analyzer`] owns a set of criteria and feeds them from a
//! [`DatasetProvider`] with one of two strategies:
//!
//! - [`Strategy::AggregateQuery`]: every criterion's own aggregate query is
//!   evaluated by the provider and the rows are handed back to it.
//! - [`Strategy::Stream`]: the dataset is paged through in windows and every
//!   triple is dispatched to every criterion.
//!
//! Both must leave each criterion in the same finalized state.

pub mod aggregate;
pub mod stream;

pub use stream::{StreamConfig, plan_offsets};

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::criteria::{Criterion, CriterionKind};
use crate::dataset::DatasetProvider;
use crate::error::SynopsisResult;
use crate::sink::ReportSink;

/// Which strategy a run uses, without its parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    Stream,
    AggregateQuery,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream => f.write_str("stream"),
            Self::AggregateQuery => f.write_str("aggregate-query"),
        }
    }
}

/// How the criteria are fed.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    AggregateQuery,
    Stream(StreamConfig),
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::AggregateQuery => StrategyKind::AggregateQuery,
            Self::Stream(_) => StrategyKind::Stream,
        }
    }
}

/// Counters of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub strategy: StrategyKind,
    /// Triple count reported by the provider; `None` for aggregate runs.
    pub total_triples: Option<u64>,
    pub windows_planned: usize,
    pub windows_visited: usize,
    pub triples_considered: u64,
    /// Window rows and aggregate rows that could not be used.
    pub rows_dropped: u64,
    /// Recoverable criterion errors (empty or malformed aggregates).
    pub criterion_errors: usize,
    pub elapsed_ms: u64,
}

/// Mutable state of a single run, passed explicitly to the strategies.
pub(crate) struct RunContext {
    started: Instant,
    pub summary: RunSummary,
}

impl RunContext {
    fn new(strategy: StrategyKind) -> Self {
        Self {
            started: Instant::now(),
            summary: RunSummary {
                strategy,
                total_triples: None,
                windows_planned: 0,
                windows_visited: 0,
                triples_considered: 0,
                rows_dropped: 0,
                criterion_errors: 0,
                elapsed_ms: 0,
            },
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn finish(mut self) -> RunSummary {
        self.summary.elapsed_ms = self.elapsed_ms();
        self.summary
    }
}

/// Runs a set of criteria against one dataset provider.
pub struct Analyzer<P> {
    provider: P,
    strategy: Strategy,
    criteria: Vec<Box<dyn Criterion>>,
}

impl<P: DatasetProvider> Analyzer<P> {
    pub fn new(provider: P, strategy: Strategy) -> Self {
        Self {
            provider,
            strategy,
            criteria: Vec::new(),
        }
    }

    /// Register a criterion. Registration order is report order.
    pub fn add_criterion(&mut self, criterion: Box<dyn Criterion>) -> &mut Self {
        self.criteria.push(criterion);
        self
    }

    /// Register a fresh criterion for every kind.
    pub fn with_criteria(mut self, kinds: impl IntoIterator<Item = CriterionKind>) -> Self {
        self.criteria.extend(kinds.into_iter().map(CriterionKind::create));
        self
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn criteria(&self) -> &[Box<dyn Criterion>] {
        &self.criteria
    }

    /// Criteria in registration order, for reading results after a run.
    pub fn criteria_mut(&mut self) -> &mut [Box<dyn Criterion>] {
        &mut self.criteria
    }

    /// The registered criterion of the given kind, if any.
    pub fn criterion_mut(&mut self, kind: CriterionKind) -> Option<&mut Box<dyn Criterion>> {
        self.criteria.iter_mut().find(|c| c.kind() == kind)
    }

    pub fn into_criteria(self) -> Vec<Box<dyn Criterion>> {
        self.criteria
    }

    /// Reset every criterion, feed it with the configured strategy and flush
    /// it into `sink`.
    ///
    /// Provider failures abort the run. Unusable rows and criterion-level
    /// errors are logged, counted in the summary and skipped.
    pub fn perform_analysis(&mut self, sink: &mut dyn ReportSink) -> SynopsisResult<RunSummary> {
        let kind = self.strategy.kind();
        tracing::info!(
            strategy = %kind,
            criteria = self.criteria.len(),
            "starting analysis"
        );

        for criterion in &mut self.criteria {
            criterion.init();
        }

        let mut ctx = RunContext::new(kind);
        match &self.strategy {
            Strategy::AggregateQuery => {
                aggregate::run(&self.provider, &mut self.criteria, sink, &mut ctx)?
            }
            Strategy::Stream(config) => {
                stream::run(&self.provider, config, &mut self.criteria, sink, &mut ctx)?
            }
        }

        let summary = ctx.finish();
        tracing::info!(
            strategy = %kind,
            windows = summary.windows_visited,
            triples = summary.triples_considered,
            rows_dropped = summary.rows_dropped,
            criterion_errors = summary.criterion_errors,
            elapsed_ms = summary.elapsed_ms,
            "analysis finished"
        );
        Ok(summary)
    }
}
