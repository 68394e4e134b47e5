//! Recalculation reporting.
//!
//! [`crate::sheet::Sheet::recalculate`] clears every formula cache and
//! re-evaluates in dependency order; this module defines the report it
//! returns. Hosts that want a log line print [`RecalcSummary::log_line`].

/// Report from a full ordered recompute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecalcSummary {
    /// Time taken for the full recompute in milliseconds.
    pub duration_ms: u64,

    /// Number of formula cells that were recomputed.
    pub cells_recomputed: usize,

    /// Maximum dependency depth encountered.
    /// A formula with no formula precedents has depth 1; a formula reading
    /// another formula has depth = max(precedent depths) + 1.
    pub max_depth: usize,
}

impl RecalcSummary {
    /// Create a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Format as a concise one-line summary for logging.
    pub fn summary(&self) -> String {
        format!(
            "{} cells in {}ms, depth={}",
            self.cells_recomputed, self.duration_ms, self.max_depth
        )
    }

    /// Format as a one-line log entry.
    ///
    /// Format: `[recalc/full]   14ms  628 cells  depth=7`
    pub fn log_line(&self) -> String {
        format!(
            "[recalc/full] {:>4}ms  {} cells  depth={}",
            self.duration_ms, self.cells_recomputed, self.max_depth
        )
    }
}
