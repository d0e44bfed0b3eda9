//! CSV output backend.
//!
//! Creates two files in the output directory:
//! - `completions.csv`
//! - `depot_snapshots.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::row::{COMPLETION_COLUMNS, SNAPSHOT_COLUMNS};
use crate::writer::OutputWriter;
use crate::{CompletionRow, OutputResult, SnapshotRow};

pub struct CsvWriter {
    completions: Writer<File>,
    snapshots:   Writer<File>,
    finished:    bool,
}

impl CsvWriter {
    /// Create both files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut completions = Writer::from_path(dir.join("completions.csv"))?;
        completions.write_record(COMPLETION_COLUMNS)?;

        let mut snapshots = Writer::from_path(dir.join("depot_snapshots.csv"))?;
        snapshots.write_record(SNAPSHOT_COLUMNS)?;

        Ok(Self { completions, snapshots, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_completions(&mut self, rows: &[CompletionRow]) -> OutputResult<()> {
        for row in rows {
            self.completions.write_record(&[
                row.unit.to_string(),
                row.activity.clone(),
                row.requested_at.to_string(),
                row.deadline.to_string(),
                row.start.to_string(),
                row.start_weekday.to_owned(),
                format!("{:.2}", row.start_hour),
                row.end.to_string(),
                row.end_weekday.to_owned(),
                format!("{:.2}", row.end_hour),
                row.timetable_requirement.to_string(),
                row.occupancy_at_seizure.to_string(),
                (row.tolerance_exceeded as u8).to_string(),
                row.road.clone(),
                row.seized_at.to_string(),
                row.remaining_slack.to_string(),
                format!("{:.3}", row.remaining_slack_days),
                row.units_maintained.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_snapshot(&mut self, row: &SnapshotRow) -> OutputResult<()> {
        self.snapshots.write_record(&[
            row.tick.to_string(),
            row.weekday.to_owned(),
            format!("{:.2}", row.hour),
            row.roads_free.to_string(),
            row.staff_in_use.to_string(),
            row.occupancy.to_string(),
            row.timetable_requirement.to_string(),
            row.shunting.to_owned(),
            row.trains_available.to_string(),
            row.spare_units.to_string(),
            row.live_requests.to_string(),
            row.units_in_service.to_string(),
            (row.peak as u8).to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.completions.flush()?;
        self.snapshots.flush()?;
        Ok(())
    }
}
