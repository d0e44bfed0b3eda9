//! Parquet output backend (feature `parquet`).
//!
//! Creates two files in the output directory:
//! - `completions.parquet`
//! - `depot_snapshots.parquet`

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder, UInt32Builder,
    UInt64Builder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::writer::OutputWriter;
use crate::{CompletionRow, OutputResult, SnapshotRow};

fn completion_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("unit",                  DataType::UInt32,  false),
        Field::new("activity",              DataType::Utf8,    false),
        Field::new("requested_at",          DataType::UInt64,  false),
        Field::new("deadline",              DataType::UInt64,  false),
        Field::new("start",                 DataType::UInt64,  false),
        Field::new("start_weekday",         DataType::Utf8,    false),
        Field::new("start_hour",            DataType::Float64, false),
        Field::new("end",                   DataType::UInt64,  false),
        Field::new("end_weekday",           DataType::Utf8,    false),
        Field::new("end_hour",              DataType::Float64, false),
        Field::new("timetable_requirement", DataType::UInt32,  false),
        Field::new("occupancy_at_seizure",  DataType::UInt32,  false),
        Field::new("tolerance_exceeded",    DataType::Boolean, false),
        Field::new("road",                  DataType::Utf8,    false),
        Field::new("seized_at",             DataType::UInt64,  false),
        Field::new("remaining_slack",       DataType::Int64,   false),
        Field::new("remaining_slack_days",  DataType::Float64, false),
        Field::new("units_maintained",      DataType::UInt32,  false),
    ]))
}

fn snapshot_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("tick",                  DataType::UInt64,  false),
        Field::new("weekday",               DataType::Utf8,    false),
        Field::new("hour",                  DataType::Float64, false),
        Field::new("roads_free",            DataType::UInt32,  false),
        Field::new("staff_in_use",          DataType::UInt32,  false),
        Field::new("occupancy",             DataType::UInt32,  false),
        Field::new("timetable_requirement", DataType::UInt32,  false),
        Field::new("shunting",              DataType::Utf8,    false),
        Field::new("trains_available",      DataType::Int64,   false),
        Field::new("spare_units",           DataType::Int64,   false),
        Field::new("live_requests",         DataType::UInt32,  false),
        Field::new("units_in_service",      DataType::Int64,   false),
        Field::new("peak",                  DataType::Boolean, false),
    ]))
}

fn snappy_props() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

/// Writes depot output to two Parquet files.
///
/// `finish()` **must** be called to write the Parquet file footer; files
/// written without calling `finish()` cannot be opened by Parquet readers.
pub struct ParquetWriter {
    completions: Option<ArrowWriter<File>>,
    snapshots:   Option<ArrowWriter<File>>,
    comp_schema: Arc<Schema>,
    snap_schema: Arc<Schema>,
    /// Snapshots are buffered and written in batches.
    pending:     Vec<SnapshotRow>,
}

const SNAPSHOT_BATCH: usize = 1024;

impl ParquetWriter {
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let comp_schema = completion_schema();
        let snap_schema = snapshot_schema();

        let completions = ArrowWriter::try_new(
            File::create(dir.join("completions.parquet"))?,
            Arc::clone(&comp_schema),
            Some(snappy_props()),
        )?;
        let snapshots = ArrowWriter::try_new(
            File::create(dir.join("depot_snapshots.parquet"))?,
            Arc::clone(&snap_schema),
            Some(snappy_props()),
        )?;

        Ok(Self {
            completions: Some(completions),
            snapshots: Some(snapshots),
            comp_schema,
            snap_schema,
            pending: Vec::new(),
        })
    }

    fn flush_snapshots(&mut self) -> OutputResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let Some(writer) = self.snapshots.as_mut() else {
            self.pending.clear();
            return Ok(());
        };

        let mut tick      = UInt64Builder::new();
        let mut weekday   = StringBuilder::new();
        let mut hour      = Float64Builder::new();
        let mut roads     = UInt32Builder::new();
        let mut staff     = UInt32Builder::new();
        let mut occupancy = UInt32Builder::new();
        let mut demand    = UInt32Builder::new();
        let mut shunting  = StringBuilder::new();
        let mut available = Int64Builder::new();
        let mut spare     = Int64Builder::new();
        let mut live      = UInt32Builder::new();
        let mut serving   = Int64Builder::new();
        let mut peak      = BooleanBuilder::new();

        for row in self.pending.drain(..) {
            tick.append_value(row.tick);
            weekday.append_value(row.weekday);
            hour.append_value(row.hour);
            roads.append_value(row.roads_free);
            staff.append_value(row.staff_in_use);
            occupancy.append_value(row.occupancy);
            demand.append_value(row.timetable_requirement);
            shunting.append_value(row.shunting);
            available.append_value(row.trains_available);
            spare.append_value(row.spare_units);
            live.append_value(row.live_requests);
            serving.append_value(row.units_in_service);
            peak.append_value(row.peak);
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(tick.finish()),
            Arc::new(weekday.finish()),
            Arc::new(hour.finish()),
            Arc::new(roads.finish()),
            Arc::new(staff.finish()),
            Arc::new(occupancy.finish()),
            Arc::new(demand.finish()),
            Arc::new(shunting.finish()),
            Arc::new(available.finish()),
            Arc::new(spare.finish()),
            Arc::new(live.finish()),
            Arc::new(serving.finish()),
            Arc::new(peak.finish()),
        ];
        writer.write(&RecordBatch::try_new(Arc::clone(&self.snap_schema), columns)?)?;
        Ok(())
    }
}

impl OutputWriter for ParquetWriter {
    fn write_completions(&mut self, rows: &[CompletionRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let Some(writer) = self.completions.as_mut() else {
            return Ok(());
        };

        let mut unit          = UInt32Builder::new();
        let mut activity      = StringBuilder::new();
        let mut requested_at  = UInt64Builder::new();
        let mut deadline      = UInt64Builder::new();
        let mut start         = UInt64Builder::new();
        let mut start_weekday = StringBuilder::new();
        let mut start_hour    = Float64Builder::new();
        let mut end           = UInt64Builder::new();
        let mut end_weekday   = StringBuilder::new();
        let mut end_hour      = Float64Builder::new();
        let mut requirement   = UInt32Builder::new();
        let mut occupancy     = UInt32Builder::new();
        let mut exceeded      = BooleanBuilder::new();
        let mut road          = StringBuilder::new();
        let mut seized_at     = UInt64Builder::new();
        let mut slack         = Int64Builder::new();
        let mut slack_days    = Float64Builder::new();
        let mut maintained    = UInt32Builder::new();

        for row in rows {
            unit.append_value(row.unit);
            activity.append_value(&row.activity);
            requested_at.append_value(row.requested_at);
            deadline.append_value(row.deadline);
            start.append_value(row.start);
            start_weekday.append_value(row.start_weekday);
            start_hour.append_value(row.start_hour);
            end.append_value(row.end);
            end_weekday.append_value(row.end_weekday);
            end_hour.append_value(row.end_hour);
            requirement.append_value(row.timetable_requirement);
            occupancy.append_value(row.occupancy_at_seizure);
            exceeded.append_value(row.tolerance_exceeded);
            road.append_value(&row.road);
            seized_at.append_value(row.seized_at);
            slack.append_value(row.remaining_slack);
            slack_days.append_value(row.remaining_slack_days);
            maintained.append_value(row.units_maintained);
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(unit.finish()),
            Arc::new(activity.finish()),
            Arc::new(requested_at.finish()),
            Arc::new(deadline.finish()),
            Arc::new(start.finish()),
            Arc::new(start_weekday.finish()),
            Arc::new(start_hour.finish()),
            Arc::new(end.finish()),
            Arc::new(end_weekday.finish()),
            Arc::new(end_hour.finish()),
            Arc::new(requirement.finish()),
            Arc::new(occupancy.finish()),
            Arc::new(exceeded.finish()),
            Arc::new(road.finish()),
            Arc::new(seized_at.finish()),
            Arc::new(slack.finish()),
            Arc::new(slack_days.finish()),
            Arc::new(maintained.finish()),
        ];
        writer.write(&RecordBatch::try_new(Arc::clone(&self.comp_schema), columns)?)?;
        Ok(())
    }

    fn write_snapshot(&mut self, row: &SnapshotRow) -> OutputResult<()> {
        self.pending.push(*row);
        if self.pending.len() >= SNAPSHOT_BATCH {
            self.flush_snapshots()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.flush_snapshots()?;
        if let Some(w) = self.completions.take() {
            w.close()?;
        }
        if let Some(w) = self.snapshots.take() {
            w.close()?;
        }
        Ok(())
    }
}
