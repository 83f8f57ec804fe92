//! Analysis configuration.
//!
//! A run is described by a TOML document:
//!
//! ```toml
//! strategy = "stream"
//! criteria = [1, "property-usage", 16]
//!
//! [stream]
//! order_key = "subject"
//! window_limit = 10000
//! randomize = true
//! max_windows = -1
//!
//! [retry]
//! max_attempts = 3
//! call_timeout_ms = 30000
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analyzer::{Analyzer, StrategyKind, Strategy, StreamConfig};
use crate::criteria::CriterionKind;
use crate::dataset::{DatasetProvider, RetryPolicy, RetryingProvider};
use crate::error::{ConfigError, ConfigResult};

/// A criterion named by numeric id or kebab-case name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriterionRef {
    Id(u8),
    Name(String),
}

impl CriterionRef {
    pub fn resolve(&self) -> ConfigResult<CriterionKind> {
        match self {
            Self::Id(id) => CriterionKind::from_id(*id).ok_or_else(|| ConfigError::UnknownCriterion {
                name: id.to_string(),
            }),
            Self::Name(name) => name.parse(),
        }
    }
}

impl fmt::Display for CriterionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<CriterionKind> for CriterionRef {
    fn from(kind: CriterionKind) -> Self {
        Self::Name(kind.name().to_string())
    }
}

/// Everything needed to set up one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub strategy: StrategyKind,
    /// Register the eighteen standard criteria.
    pub all_criteria: bool,
    /// Explicit criterion selection; exclusive with `all_criteria`.
    pub criteria: Vec<CriterionRef>,
    pub stream: StreamConfig,
    pub retry: RetryPolicy,
}

impl AnalysisConfig {
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        toml::from_str(s).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        match (self.all_criteria, self.criteria.is_empty()) {
            (true, false) => {
                return Err(ConfigError::Invalid {
                    message: "`all_criteria` and an explicit `criteria` list are exclusive".into(),
                });
            }
            (false, true) => {
                return Err(ConfigError::Invalid {
                    message: "select criteria with `all_criteria = true` or a `criteria` list".into(),
                });
            }
            _ => {}
        }
        for criterion in &self.criteria {
            criterion.resolve()?;
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                message: "retry.max_attempts must be at least 1".into(),
            });
        }
        if self.strategy == StrategyKind::Stream {
            self.stream.validate()?;
        }
        Ok(())
    }

    /// The selected criteria in configuration order.
    pub fn selected_criteria(&self) -> ConfigResult<Vec<CriterionKind>> {
        if self.all_criteria {
            return Ok(CriterionKind::standard().to_vec());
        }
        self.criteria.iter().map(CriterionRef::resolve).collect()
    }

    pub fn build_strategy(&self) -> Strategy {
        match self.strategy {
            StrategyKind::AggregateQuery => Strategy::AggregateQuery,
            StrategyKind::Stream => Strategy::Stream(self.stream.clone()),
        }
    }

    /// Validate and set up an analyzer over `provider`, with the configured
    /// retry policy and criteria.
    pub fn build_analyzer<P: DatasetProvider>(
        &self,
        provider: P,
    ) -> ConfigResult<Analyzer<RetryingProvider<P>>> {
        self.validate()?;
        let kinds = self.selected_criteria()?;
        tracing::debug!(
            strategy = %self.strategy,
            criteria = kinds.len(),
            "configured analyzer"
        );
        let provider = RetryingProvider::new(provider, self.retry.clone());
        Ok(Analyzer::new(provider, self.build_strategy()).with_criteria(kinds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::OrderKey;

    #[test]
    fn parses_ids_and_names() {
        let cfg = AnalysisConfig::from_toml_str(
            r#"
            strategy = "aggregate-query"
            criteria = [1, "property-usage", 16]
            "#,
        )
        .unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.strategy, StrategyKind::AggregateQuery);
        assert_eq!(
            cfg.selected_criteria().unwrap(),
            vec![
                CriterionKind::ClassUsageCount,
                CriterionKind::PropertyUsage,
                CriterionKind::NumTriples
            ]
        );
        assert_eq!(cfg.build_strategy(), Strategy::AggregateQuery);
    }

    #[test]
    fn stream_section_defaults() {
        let cfg = AnalysisConfig::from_toml_str(
            r#"
            all_criteria = true
            [stream]
            order_key = "object"
            randomize = true
            max_windows = -1
            "#,
        )
        .unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.strategy, StrategyKind::Stream);
        assert_eq!(cfg.stream.order_key, OrderKey::Object);
        assert_eq!(cfg.stream.window_limit, 50_000);
        assert_eq!(cfg.stream.max_windows, None);
        assert_eq!(cfg.retry, RetryPolicy::default());
        assert_eq!(cfg.selected_criteria().unwrap().len(), 18);
    }

    #[test]
    fn criteria_selection_must_be_exactly_one_form() {
        let neither = AnalysisConfig::default();
        assert!(matches!(neither.validate(), Err(ConfigError::Invalid { .. })));

        let both = AnalysisConfig {
            all_criteria: true,
            criteria: vec![CriterionRef::Id(1)],
            ..AnalysisConfig::default()
        };
        assert!(matches!(both.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn unknown_criteria_are_rejected() {
        for bad in ["criteria = [21]", "criteria = [0]", "criteria = [\"no-such\"]"] {
            let cfg = AnalysisConfig::from_toml_str(bad).unwrap();
            assert!(matches!(
                cfg.validate(),
                Err(ConfigError::UnknownCriterion { .. })
            ));
        }
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let cfg = AnalysisConfig::from_toml_str("all_criteria = true\n[stream]\nwindow_limit = 0").unwrap();
        assert!(cfg.validate().is_err());

        let cfg = AnalysisConfig::from_toml_str("all_criteria = true\n[retry]\nmax_attempts = 0").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        assert!(matches!(
            AnalysisConfig::from_toml_str("strategy = "),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            AnalysisConfig::from_toml_str("strategy = \"sideways\""),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn load_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synopsis.toml");
        let cfg = AnalysisConfig {
            criteria: vec![CriterionKind::SameAs.into(), CriterionRef::Id(3)],
            stream: StreamConfig {
                window_limit: 7,
                max_windows: Some(2),
                seed: Some(42),
                ..StreamConfig::default()
            },
            ..AnalysisConfig::default()
        };
        std::fs::write(&path, cfg.to_toml_string().unwrap()).unwrap();
        assert_eq!(AnalysisConfig::load(&path).unwrap(), cfg);
    }

    #[test]
    fn unrepresentable_values_are_serialize_errors() {
        // TOML integers are signed 64-bit.
        let cfg = AnalysisConfig {
            all_criteria: true,
            stream: StreamConfig {
                seed: Some(u64::MAX),
                ..StreamConfig::default()
            },
            ..AnalysisConfig::default()
        };
        let err = cfg.to_toml_string().unwrap_err();
        assert!(matches!(err, ConfigError::Serialize { .. }));
        assert!(err.to_string().starts_with("failed to serialize configuration"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AnalysisConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
