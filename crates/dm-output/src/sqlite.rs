//! SQLite output backend (feature `sqlite`).
//!
//! Creates `output.db` in the output directory with two tables:
//! `completions` and `depot_snapshots`.

use std::path::Path;

use rusqlite::Connection;

use crate::writer::OutputWriter;
use crate::{CompletionRow, OutputResult, SnapshotRow};

pub struct SqliteWriter {
    conn:     Connection,
    finished: bool,
}

impl SqliteWriter {
    /// Open (or create) `output.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let conn = Connection::open(dir.join("output.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS completions (
                 unit                  INTEGER NOT NULL,
                 activity              TEXT    NOT NULL,
                 requested_at          INTEGER NOT NULL,
                 deadline              INTEGER NOT NULL,
                 start                 INTEGER NOT NULL,
                 start_weekday         TEXT    NOT NULL,
                 start_hour            REAL    NOT NULL,
                 end                   INTEGER NOT NULL,
                 end_weekday           TEXT    NOT NULL,
                 end_hour              REAL    NOT NULL,
                 timetable_requirement INTEGER NOT NULL,
                 occupancy_at_seizure  INTEGER NOT NULL,
                 tolerance_exceeded    INTEGER NOT NULL,
                 road                  TEXT    NOT NULL,
                 seized_at             INTEGER NOT NULL,
                 remaining_slack       INTEGER NOT NULL,
                 remaining_slack_days  REAL    NOT NULL,
                 units_maintained      INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS depot_snapshots (
                 tick                  INTEGER PRIMARY KEY,
                 weekday               TEXT    NOT NULL,
                 hour                  REAL    NOT NULL,
                 roads_free            INTEGER NOT NULL,
                 staff_in_use          INTEGER NOT NULL,
                 occupancy             INTEGER NOT NULL,
                 timetable_requirement INTEGER NOT NULL,
                 shunting              TEXT    NOT NULL,
                 trains_available      INTEGER NOT NULL,
                 spare_units           INTEGER NOT NULL,
                 live_requests         INTEGER NOT NULL,
                 units_in_service      INTEGER NOT NULL,
                 peak                  INTEGER NOT NULL
             );",
        )?;

        Ok(Self { conn, finished: false })
    }
}

impl OutputWriter for SqliteWriter {
    fn write_completions(&mut self, rows: &[CompletionRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO completions VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.unit,
                    row.activity,
                    row.requested_at,
                    row.deadline,
                    row.start,
                    row.start_weekday,
                    row.start_hour,
                    row.end,
                    row.end_weekday,
                    row.end_hour,
                    row.timetable_requirement,
                    row.occupancy_at_seizure,
                    row.tolerance_exceeded as i64,
                    row.road,
                    row.seized_at,
                    row.remaining_slack,
                    row.remaining_slack_days,
                    row.units_maintained,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_snapshot(&mut self, row: &SnapshotRow) -> OutputResult<()> {
        self.conn.execute(
            "INSERT INTO depot_snapshots VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            rusqlite::params![
                row.tick,
                row.weekday,
                row.hour,
                row.roads_free,
                row.staff_in_use,
                row.occupancy,
                row.timetable_requirement,
                row.shunting,
                row.trains_available,
                row.spare_units,
                row.live_requests,
                row.units_in_service,
                row.peak as i64,
            ],
        )?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
