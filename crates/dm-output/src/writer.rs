//! The `OutputWriter` trait implemented by all backend writers.

use crate::{CompletionRow, OutputResult, SnapshotRow};

/// Trait implemented by CSV, SQLite, and Parquet writers.
///
/// Errors never interrupt a run: the observer stores them for
/// [`DepotOutputObserver::take_error`][crate::DepotOutputObserver::take_error].
pub trait OutputWriter {
    /// Write a batch of completed activities.
    fn write_completions(&mut self, rows: &[CompletionRow]) -> OutputResult<()>;

    /// Write one end-of-tick snapshot.
    fn write_snapshot(&mut self, row: &SnapshotRow) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent: safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
