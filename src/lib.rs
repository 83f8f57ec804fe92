// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # rdf-synopsis
//!
//! Structural statistics ("synopses") over RDF graphs: class and property
//! usage, explicit and implicit subsumption hierarchies, typing ratios,
//! namespace links and class/property co-occurrence.
//!
//! ## Architecture
//!
//! - **Dataset providers** (`dataset`): count, ordered windows and aggregate
//!   SELECT queries; an in-memory oxigraph implementation and a retry decorator
//! - **Criteria** (`criteria`): twenty pluggable statistics, each computable
//!   from a triple stream or from its own aggregate query
//! - **Analyzer** (`analyzer`): drives the criteria with the aggregate-query or
//!   the stream strategy
//! - **Hierarchies** (`graph`): level-propagating hierarchy graph and
//!   containment-based implicit hierarchy inference
//! - **Sinks** (`sink`): text, JSON lines, per-window CSV series, in-memory
//!
//! ## Library usage
//!
//! ```
//! use rdf_synopsis::analyzer::{Analyzer, Strategy, StreamConfig};
//! use rdf_synopsis::criteria::{CriterionKind, MetricValue};
//! use rdf_synopsis::dataset::OxigraphDataset;
//! use rdf_synopsis::graph::Triple;
//! use rdf_synopsis::sink::MemorySink;
//! use rdf_synopsis::vocab::RDF_TYPE;
//!
//! let dataset = OxigraphDataset::from_triples(&[
//!     Triple::iris("http://ex.org/rex", RDF_TYPE, "http://ex.org/Dog"),
//!     Triple::iris("http://ex.org/rex", "http://ex.org/owner", "http://ex.org/ann"),
//! ])
//! .unwrap();
//!
//! let mut analyzer = Analyzer::new(&dataset, Strategy::Stream(StreamConfig::default()))
//!     .with_criteria([CriterionKind::NumTriples, CriterionKind::ClassUsageCount]);
//! let mut sink = MemorySink::new();
//! let summary = analyzer.perform_analysis(&mut sink).unwrap();
//!
//! assert_eq!(summary.triples_considered, 2);
//! assert_eq!(
//!     sink.metrics[&CriterionKind::ClassUsageCount]["http://ex.org/Dog_classUsage"],
//!     MetricValue::Int(1)
//! );
//! ```

pub mod analyzer;
pub mod config;
pub mod criteria;
pub mod dataset;
pub mod error;
pub mod graph;
pub mod sink;
pub mod vocab;

pub use analyzer::{Analyzer, RunSummary, Strategy, StrategyKind, StreamConfig};
pub use config::AnalysisConfig;
pub use criteria::{Criterion, CriterionKind, MetricValue, ResultMap};
pub use dataset::{DatasetProvider, OxigraphDataset, RetryPolicy, RetryingProvider};
pub use error::{SynopsisError, SynopsisResult};
pub use graph::{OrderKey, Row, Term, Triple};
