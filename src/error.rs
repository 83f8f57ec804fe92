//! Rich diagnostic error types for the synopsis engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! so a failed run tells the caller which collaborator failed and what to check.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for an analysis run.
///
/// Each variant wraps a subsystem-specific error, preserving its diagnostic
/// code and help text.
#[derive(Debug, Error, Diagnostic)]
pub enum SynopsisError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Criterion(#[from] CriterionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Sink(#[from] SinkError),
}

// ---------------------------------------------------------------------------
// Dataset provider errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ProviderError {
    #[error("failed to create triple store: {message}")]
    #[diagnostic(
        code(synopsis::provider::store),
        help("The backing triple store could not be created or written to.")
    )]
    Store { message: String },

    #[error("query evaluation failed: {message}")]
    #[diagnostic(
        code(synopsis::provider::query),
        help(
            "The dataset provider rejected or failed to evaluate a query. \
             If the provider is remote this may be transient and is retried \
             when a retry policy is configured."
        )
    )]
    Query { message: String },

    #[error("unexpected query result: {message}")]
    #[diagnostic(
        code(synopsis::provider::unexpected_result),
        help("Only SELECT queries are supported; the provider returned another result form.")
    )]
    UnexpectedResult { message: String },

    #[error("term cannot be stored: {message}")]
    #[diagnostic(
        code(synopsis::provider::invalid_term),
        help("Subjects and predicates must be IRIs or blank nodes; predicates must be IRIs.")
    )]
    InvalidTerm { message: String },

    #[error("provider call exceeded {timeout_ms} ms: {operation}")]
    #[diagnostic(
        code(synopsis::provider::timeout),
        help("Raise `retry.call_timeout_ms` or reduce `stream.window_limit`.")
    )]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("giving up on {operation} after {attempts} attempts: {last_error}")]
    #[diagnostic(
        code(synopsis::provider::retries_exhausted),
        help(
            "Every retry attempt failed. Check that the dataset provider is \
             reachable, or raise `retry.max_attempts`."
        )
    )]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },
}

impl ProviderError {
    /// Whether a retry of the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Query { .. } | Self::Timeout { .. })
    }
}

/// Convenience alias for provider results.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

// ---------------------------------------------------------------------------
// Criterion errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CriterionError {
    #[error("aggregate query for {criterion} returned no usable row")]
    #[diagnostic(
        code(synopsis::criterion::empty_aggregate),
        help(
            "The scalar aggregate produced no result; the criterion keeps its \
             uninitialized value (-1) and the run continues."
        )
    )]
    EmptyAggregate { criterion: String },

    #[error("{skipped} malformed rows for {criterion}, first missing or ill-typed binding `{binding}`")]
    #[diagnostic(
        code(synopsis::criterion::malformed_row),
        help("The rows were skipped. Check that the provider returns every projected variable.")
    )]
    MalformedRow {
        criterion: String,
        binding: String,
        skipped: usize,
    },
}

/// Convenience alias for criterion results.
pub type CriterionResult<T> = std::result::Result<T, CriterionError>;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}")]
    #[diagnostic(
        code(synopsis::config::read),
        help("Check that the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {message}")]
    #[diagnostic(
        code(synopsis::config::parse),
        help("The configuration must be valid TOML. See `AnalysisConfig` for the accepted keys.")
    )]
    Parse { message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(synopsis::config::invalid))]
    Invalid { message: String },

    #[error("failed to serialize configuration: {message}")]
    #[diagnostic(code(synopsis::config::serialize))]
    Serialize { message: String },

    #[error("unknown criterion: {name}")]
    #[diagnostic(
        code(synopsis::config::unknown_criterion),
        help("Use a criterion id between 1 and 20 or its kebab-case name, e.g. `class-usage-count`.")
    )]
    UnknownCriterion { name: String },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Sink errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SinkError {
    #[error("failed to write report")]
    #[diagnostic(
        code(synopsis::sink::io),
        help("The report writer rejected the output. Check the destination.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize metrics: {message}")]
    #[diagnostic(code(synopsis::sink::serialization))]
    Serialization { message: String },
}

impl From<std::io::Error> for SinkError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}

/// Convenience alias for sink results.
pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// Convenience alias for whole-run results.
pub type SynopsisResult<T> = std::result::Result<T, SynopsisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ProviderError::Query { message: "x".into() }.is_transient());
        assert!(
            ProviderError::Timeout {
                operation: "window".into(),
                timeout_ms: 10
            }
            .is_transient()
        );
        assert!(!ProviderError::InvalidTerm { message: "x".into() }.is_transient());
        assert!(
            !ProviderError::RetriesExhausted {
                operation: "count".into(),
                attempts: 3,
                last_error: "x".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn subsystem_errors_convert() {
        let err: SynopsisError = ConfigError::UnknownCriterion { name: "42".into() }.into();
        assert!(err.to_string().contains("unknown criterion"));
    }
}
