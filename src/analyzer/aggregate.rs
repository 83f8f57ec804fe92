//! Aggregate-query strategy: every criterion computes itself on the provider.

use crate::criteria::Criterion;
use crate::dataset::DatasetProvider;
use crate::error::{CriterionError, SynopsisResult};
use crate::sink::ReportSink;

use super::RunContext;

pub(crate) fn run<P: DatasetProvider + ?Sized>(
    provider: &P,
    criteria: &mut [Box<dyn Criterion>],
    sink: &mut dyn ReportSink,
    ctx: &mut RunContext,
) -> SynopsisResult<()> {
    for criterion in criteria.iter_mut() {
        let kind = criterion.kind();
        let query = criterion.aggregate_query();
        tracing::debug!(criterion = kind.name(), %query, "running aggregate query");

        let rows = provider.run_aggregate_query(&query).inspect_err(|e| {
            tracing::error!(criterion = kind.name(), error = %e, "aggregate query failed");
        })?;

        if let Err(e) = criterion.consume_aggregate_rows(&rows) {
            tracing::warn!(criterion = kind.name(), error = %e, "criterion kept partial results");
            ctx.summary.criterion_errors += 1;
            if let CriterionError::MalformedRow { skipped, .. } = e {
                ctx.summary.rows_dropped += skipped as u64;
            }
        }
        criterion.flush(sink)?;
    }
    Ok(())
}
