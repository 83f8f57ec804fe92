//! Report sinks.
//!
//! The analyzer never writes files itself. Each criterion flushes its report
//! lines and its finalized [`ResultMap`] into a [`ReportSink`], which renders
//! them as text, JSON lines, a per-window series, or keeps them in memory
//! (testing).

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::criteria::{CriterionKind, ResultMap};
use crate::error::{SinkError, SinkResult};

/// Progress of a stream run after one window was dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowProgress {
    /// Position of the window in visiting order, starting at 0.
    pub index: usize,
    /// Offset of the window in the ordered dataset.
    pub offset: usize,
    /// Triples dispatched so far, this window included.
    pub triples_considered: u64,
    /// Milliseconds since the run started.
    pub elapsed_ms: u64,
}

// ── ReportSink trait ────────────────────────────────────────────────────

/// A destination for criterion reports and metrics.
pub trait ReportSink {
    /// Human-readable report lines of one criterion.
    fn write_report(&mut self, kind: CriterionKind, lines: &[String]) -> SinkResult<()>;

    /// Finalized metrics of one criterion.
    fn write_metrics(&mut self, kind: CriterionKind, metrics: &ResultMap) -> SinkResult<()>;

    /// Whether the stream driver should report every window.
    ///
    /// Snapshots finalize every lazily joined criterion once per window.
    fn wants_window_snapshots(&self) -> bool {
        false
    }

    /// Metrics of all criteria merged after a window.
    fn window_completed(&mut self, _progress: &WindowProgress, _metrics: &ResultMap) -> SinkResult<()> {
        Ok(())
    }
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    fn write_report(&mut self, kind: CriterionKind, lines: &[String]) -> SinkResult<()> {
        (**self).write_report(kind, lines)
    }

    fn write_metrics(&mut self, kind: CriterionKind, metrics: &ResultMap) -> SinkResult<()> {
        (**self).write_metrics(kind, metrics)
    }

    fn wants_window_snapshots(&self) -> bool {
        (**self).wants_window_snapshots()
    }

    fn window_completed(&mut self, progress: &WindowProgress, metrics: &ResultMap) -> SinkResult<()> {
        (**self).window_completed(progress, metrics)
    }
}

// ── TextSink ────────────────────────────────────────────────────────────

/// Renders report lines under a header per criterion.
pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for TextSink<W> {
    fn write_report(&mut self, kind: CriterionKind, lines: &[String]) -> SinkResult<()> {
        writeln!(self.out, "== {} ({}) ==", kind.label(), kind.id())?;
        for line in lines {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    fn write_metrics(&mut self, _kind: CriterionKind, _metrics: &ResultMap) -> SinkResult<()> {
        Ok(())
    }
}

// ── JsonLinesSink ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct MetricsLine<'a> {
    criterion: CriterionKind,
    metrics: &'a ResultMap,
}

#[derive(Serialize)]
struct WindowLine<'a> {
    window: &'a WindowProgress,
    metrics: &'a ResultMap,
}

/// Emits one JSON object per criterion (and optionally per window).
pub struct JsonLinesSink<W: Write> {
    out: W,
    snapshots: bool,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            snapshots: false,
        }
    }

    /// Also emit a line after every stream window.
    pub fn with_snapshots(mut self) -> Self {
        self.snapshots = true;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit<T: Serialize>(&mut self, value: &T) -> SinkResult<()> {
        let json = serde_json::to_string(value).map_err(|e| SinkError::Serialization {
            message: e.to_string(),
        })?;
        writeln!(self.out, "{json}")?;
        Ok(())
    }
}

impl<W: Write> ReportSink for JsonLinesSink<W> {
    fn write_report(&mut self, _kind: CriterionKind, _lines: &[String]) -> SinkResult<()> {
        Ok(())
    }

    fn write_metrics(&mut self, kind: CriterionKind, metrics: &ResultMap) -> SinkResult<()> {
        self.emit(&MetricsLine {
            criterion: kind,
            metrics,
        })
    }

    fn wants_window_snapshots(&self) -> bool {
        self.snapshots
    }

    fn window_completed(&mut self, progress: &WindowProgress, metrics: &ResultMap) -> SinkResult<()> {
        self.emit(&WindowLine {
            window: progress,
            metrics,
        })
    }
}

// ── MemorySink ──────────────────────────────────────────────────────────

/// Collects everything in memory for testing.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub reports: BTreeMap<CriterionKind, Vec<String>>,
    pub metrics: BTreeMap<CriterionKind, ResultMap>,
    pub windows: Vec<WindowProgress>,
    snapshots: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also record progress after every stream window.
    pub fn with_snapshots() -> Self {
        Self {
            snapshots: true,
            ..Self::default()
        }
    }

    /// Metrics of every criterion merged into one map.
    pub fn merged_metrics(&self) -> ResultMap {
        self.metrics
            .values()
            .flat_map(|m| m.iter().map(|(k, v)| (k.clone(), *v)))
            .collect()
    }
}

impl ReportSink for MemorySink {
    fn write_report(&mut self, kind: CriterionKind, lines: &[String]) -> SinkResult<()> {
        self.reports.insert(kind, lines.to_vec());
        Ok(())
    }

    fn write_metrics(&mut self, kind: CriterionKind, metrics: &ResultMap) -> SinkResult<()> {
        self.metrics.insert(kind, metrics.clone());
        Ok(())
    }

    fn wants_window_snapshots(&self) -> bool {
        self.snapshots
    }

    fn window_completed(&mut self, progress: &WindowProgress, _metrics: &ResultMap) -> SinkResult<()> {
        self.windows.push(progress.clone());
        Ok(())
    }
}

// ── SeriesSink ──────────────────────────────────────────────────────────

/// Per-window metric series: one row per window, one column per metric.
///
/// A metric that only appears in later windows is left empty in earlier rows.
#[derive(Debug, Default)]
pub struct SeriesSink {
    rows: Vec<(WindowProgress, ResultMap)>,
}

impl SeriesSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[(WindowProgress, ResultMap)] {
        &self.rows
    }

    /// Every metric name seen in any window, sorted.
    pub fn columns(&self) -> BTreeSet<&str> {
        self.rows
            .iter()
            .flat_map(|(_, m)| m.keys().map(String::as_str))
            .collect()
    }

    /// Render the series as CSV with leading `Offset` and `TimeMS` columns.
    pub fn write_csv<W: Write>(&self, mut out: W) -> SinkResult<()> {
        let columns = self.columns();
        let mut header = vec!["Offset".to_string(), "TimeMS".to_string()];
        header.extend(columns.iter().map(|c| csv_field(c)));
        writeln!(out, "{}", header.join(","))?;
        for (progress, metrics) in &self.rows {
            let mut cells = vec![progress.offset.to_string(), progress.elapsed_ms.to_string()];
            cells.extend(
                columns
                    .iter()
                    .map(|c| metrics.get(*c).map(|v| v.to_string()).unwrap_or_default()),
            );
            writeln!(out, "{}", cells.join(","))?;
        }
        Ok(())
    }
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

impl ReportSink for SeriesSink {
    fn write_report(&mut self, _kind: CriterionKind, _lines: &[String]) -> SinkResult<()> {
        Ok(())
    }

    fn write_metrics(&mut self, _kind: CriterionKind, _metrics: &ResultMap) -> SinkResult<()> {
        Ok(())
    }

    fn wants_window_snapshots(&self) -> bool {
        true
    }

    fn window_completed(&mut self, progress: &WindowProgress, metrics: &ResultMap) -> SinkResult<()> {
        self.rows.push((progress.clone(), metrics.clone()));
        Ok(())
    }
}
