//! `DepotOutputObserver<W>` — bridges `DepotObserver` to an `OutputWriter`.

use dm_core::Tick;
use dm_depot::{CompletionRecord, DepotObserver, DepotSnapshot, RunReport};

use crate::row::{CompletionRow, SnapshotRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// Completions are buffered and written in batches of this size.
const COMPLETION_BATCH: usize = 256;

/// A [`DepotObserver`] that writes completions and snapshots to any
/// [`OutputWriter`] backend.
///
/// Observer methods have no return value, so write errors are stored.  After
/// `depot.run()` returns, check for them with [`take_error`][Self::take_error].
pub struct DepotOutputObserver<W: OutputWriter> {
    writer:     W,
    pending:    Vec<CompletionRow>,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> DepotOutputObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, pending: Vec::new(), last_error: None }
    }

    /// Take the stored write error (if any).  Only the first error is kept.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer (e.g. to inspect files after the run).
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let result = self.writer.write_completions(&self.pending);
        self.pending.clear();
        self.store_err(result);
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> DepotObserver for DepotOutputObserver<W> {
    fn on_completion(&mut self, record: &CompletionRecord) {
        self.pending.push(record.into());
        if self.pending.len() >= COMPLETION_BATCH {
            self.flush();
        }
    }

    fn on_snapshot(&mut self, snapshot: &DepotSnapshot) {
        let result = self.writer.write_snapshot(&SnapshotRow::from(snapshot));
        self.store_err(result);
    }

    fn on_sim_end(&mut self, _final_tick: Tick, _report: &RunReport) {
        self.flush();
        let result = self.writer.finish();
        self.store_err(result);
    }
}
