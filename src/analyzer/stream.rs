//! Stream strategy: page through the dataset and dispatch every triple.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize};

use crate::criteria::{Criterion, ResultMap};
use crate::dataset::DatasetProvider;
use crate::error::{ConfigError, ConfigResult, SynopsisResult};
use crate::graph::{OrderKey, Triple};
use crate::sink::{ReportSink, WindowProgress};

use super::RunContext;

/// Parameters of the stream strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Triple component windows are sorted by.
    pub order_key: OrderKey,
    /// Triples per window.
    pub window_limit: usize,
    /// Visit windows in a random permutation instead of ascending offset.
    pub randomize: bool,
    /// Stop after this many windows. `None` (or `-1` in a config file)
    /// visits every window.
    #[serde(
        deserialize_with = "unbounded_if_negative",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_windows: Option<usize>,
    /// Seed for the window permutation; `None` draws one from the OS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            order_key: OrderKey::Subject,
            window_limit: 50_000,
            randomize: false,
            max_windows: None,
            seed: None,
        }
    }
}

fn unbounded_if_negative<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
    let value = Option::<i64>::deserialize(d)?;
    Ok(value.and_then(|n| usize::try_from(n).ok()))
}

impl StreamConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.window_limit == 0 {
            return Err(ConfigError::Invalid {
                message: "stream.window_limit must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

/// Window offsets to visit, in visiting order.
///
/// Offsets `0, limit, 2 * limit, ...` cover `[0, total)`. Randomization only
/// permutes them; truncation to `max_windows` happens after the permutation.
pub fn plan_offsets(total: u64, config: &StreamConfig) -> Vec<usize> {
    let total = usize::try_from(total).unwrap_or(usize::MAX);
    let mut offsets: Vec<usize> = (0..total).step_by(config.window_limit.max(1)).collect();
    if config.randomize {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        offsets.shuffle(&mut rng);
    }
    if let Some(max) = config.max_windows {
        offsets.truncate(max);
    }
    offsets
}

/// Merged current results of all criteria.
fn snapshot(criteria: &mut [Box<dyn Criterion>]) -> ResultMap {
    let mut merged = ResultMap::new();
    for criterion in criteria.iter_mut() {
        merged.extend(criterion.result_map());
    }
    merged
}

pub(crate) fn run<P: DatasetProvider + ?Sized>(
    provider: &P,
    config: &StreamConfig,
    criteria: &mut [Box<dyn Criterion>],
    sink: &mut dyn ReportSink,
    ctx: &mut RunContext,
) -> SynopsisResult<()> {
    config.validate()?;
    let total = provider.count().inspect_err(|e| {
        tracing::error!(error = %e, "failed to count triples");
    })?;
    let offsets = plan_offsets(total, config);
    ctx.summary.total_triples = Some(total);
    ctx.summary.windows_planned = offsets.len();
    tracing::debug!(
        total,
        windows = offsets.len(),
        limit = config.window_limit,
        order = %config.order_key,
        randomize = config.randomize,
        "planned stream windows"
    );

    let snapshots = sink.wants_window_snapshots();
    for (index, &offset) in offsets.iter().enumerate() {
        let rows = provider
            .window(config.order_key, config.window_limit, offset)
            .inspect_err(|e| {
                tracing::error!(offset, error = %e, "failed to fetch window");
            })?;

        let mut considered = 0u64;
        for row in &rows {
            let Some(triple) = Triple::from_row(row) else {
                tracing::warn!(offset, bindings = row.len(), "dropping incomplete window row");
                ctx.summary.rows_dropped += 1;
                continue;
            };
            tracing::trace!(%triple, "dispatching");
            for criterion in criteria.iter_mut() {
                criterion.consider_triple(&triple);
            }
            considered += 1;
        }
        ctx.summary.triples_considered += considered;
        ctx.summary.windows_visited += 1;
        tracing::debug!(index, offset, rows = rows.len(), considered, "window done");

        if snapshots {
            let progress = WindowProgress {
                index,
                offset,
                triples_considered: ctx.summary.triples_considered,
                elapsed_ms: ctx.elapsed_ms(),
            };
            let merged = snapshot(criteria);
            sink.window_completed(&progress, &merged)?;
        }
    }

    for criterion in criteria.iter_mut() {
        criterion.flush(sink)?;
    }
    Ok(())
}
