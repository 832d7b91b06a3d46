//! Audit sweep configuration.

/// Bounds for batch archival/deletion sweeps.
///
/// Deletion never runs as a single unbounded statement: `batch_size`
/// caps rows per statement, `max_batches` caps one sweep's work.
/// Remaining backlog is left for the next scheduled run.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Maximum rows deleted per batch (default: 500).
    pub batch_size: u64,
    /// Maximum batches per sweep invocation (default: 20).
    pub max_batches: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_batches: 20,
        }
    }
}
