//! Integration tests for dm-output.

use dm_depot::{Depot, DepotConfig};

use crate::row::{CompletionRow, SnapshotRow};

fn completion_row(unit: u32, start: u64) -> CompletionRow {
    CompletionRow {
        unit,
        activity:              "A-exam".into(),
        requested_at:          start - 1,
        deadline:              start + 1,
        start,
        start_weekday:         "Monday",
        start_hour:            6.25,
        end:                   start + 4,
        end_weekday:           "Monday",
        end_hour:              7.25,
        timetable_requirement: 8,
        occupancy_at_seizure:  1,
        tolerance_exceeded:    unit % 2 == 1,
        road:                  "road 1".into(),
        seized_at:             start,
        remaining_slack:       1,
        remaining_slack_days:  1.0 / 96.0,
        units_maintained:      2,
    }
}

fn snapshot_row(tick: u64) -> SnapshotRow {
    SnapshotRow {
        tick,
        weekday:               "Tuesday",
        hour:                  0.0,
        roads_free:            1,
        staff_in_use:          3,
        occupancy:             2,
        timetable_requirement: 7,
        shunting:              "RECEPTION",
        trains_available:      8,
        spare_units:           1,
        live_requests:         0,
        units_in_service:      7,
        peak:                  false,
    }
}

/// Ten units, three maintained, one tick per day.
fn small_depot(ticks: u64, interval: u64) -> Depot {
    let json = format!(
        r#"{{
            "fleet_size": 10,
            "sim": {{ "ticks_per_day": 1, "total_ticks": {ticks}, "seed": 3,
                      "output_interval_ticks": {interval} }},
            "activities": [{{
                "name": "A", "interval_unit": "calendar day", "interval": 4,
                "tolerance": 2, "duration_ticks": 1, "staff": 1, "units": [0, 1, 2]
            }}],
            "roads": ["road 1"],
            "eligibility": {{ "A": ["road 1"] }},
            "timetable": {{ "flat": 8 }}
        }}"#
    );
    Depot::from_config(&DepotConfig::from_json(&json).unwrap()).unwrap()
}

#[cfg(test)]
mod csv_tests {
    use tempfile::TempDir;

    use super::*;
    use crate::csv::CsvWriter;
    use crate::observer::DepotOutputObserver;
    use crate::row::{COMPLETION_COLUMNS, SNAPSHOT_COLUMNS};
    use crate::writer::OutputWriter;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn headers(path: &std::path::Path) -> Vec<String> {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        rdr.headers().unwrap().iter().map(str::to_owned).collect()
    }

    #[test]
    fn csv_headers_correct() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        assert_eq!(headers(&dir.path().join("completions.csv")), COMPLETION_COLUMNS);
        assert_eq!(headers(&dir.path().join("depot_snapshots.csv")), SNAPSHOT_COLUMNS);
    }

    #[test]
    fn csv_completion_rows() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_completions(&[completion_row(0, 24), completion_row(1, 30)]).unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("completions.csv")).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "0");
        assert_eq!(&rows[0][1], "A-exam");
        assert_eq!(&rows[0][6], "6.25");
        assert_eq!(&rows[0][12], "0");
        assert_eq!(&rows[1][12], "1");
        assert_eq!(&rows[1][13], "road 1");
        assert_eq!(&rows[1][16], "0.010");
    }

    #[test]
    fn csv_snapshot_row() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_snapshot(&snapshot_row(96)).unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("depot_snapshots.csv")).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "96");
        assert_eq!(&rows[0][1], "Tuesday");
        assert_eq!(&rows[0][7], "RECEPTION");
        assert_eq!(&rows[0][12], "0");
    }

    #[test]
    fn csv_finish_idempotent() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        w.finish().unwrap();
    }

    #[test]
    fn integration_csv() {
        let mut depot = small_depot(40, 5);
        let dir = tmp();
        let mut obs = DepotOutputObserver::new(CsvWriter::new(dir.path()).unwrap());
        let report = depot.run(&mut obs).unwrap();
        assert!(obs.take_error().is_none(), "no write errors expected");

        let mut rdr = csv::Reader::from_path(dir.path().join("completions.csv")).unwrap();
        let completions = rdr.records().count() as u64;
        assert!(completions > 0);
        assert_eq!(completions, report.completions);

        // output_interval 5 over 40 ticks → snapshots at 0, 5, …, 35.
        let mut rdr = csv::Reader::from_path(dir.path().join("depot_snapshots.csv")).unwrap();
        assert_eq!(rdr.records().count(), 8);
    }
}

#[cfg(test)]
mod observer_tests {
    use std::io;

    use dm_depot::NoopObserver;

    use super::*;
    use crate::observer::DepotOutputObserver;
    use crate::writer::OutputWriter;
    use crate::{OutputError, OutputResult};

    /// Fails every write with a distinct message.
    #[derive(Default)]
    struct Failing {
        calls:    u32,
        finished: u32,
    }

    impl OutputWriter for Failing {
        fn write_completions(&mut self, _rows: &[CompletionRow]) -> OutputResult<()> {
            self.calls += 1;
            Err(io::Error::other(format!("write {}", self.calls)).into())
        }
        fn write_snapshot(&mut self, _row: &SnapshotRow) -> OutputResult<()> {
            self.calls += 1;
            Err(io::Error::other(format!("write {}", self.calls)).into())
        }
        fn finish(&mut self) -> OutputResult<()> {
            self.finished += 1;
            Ok(())
        }
    }

    #[test]
    fn keeps_only_the_first_error() {
        let mut depot = small_depot(20, 1);
        let mut obs = DepotOutputObserver::new(Failing::default());
        depot.run(&mut obs).unwrap();

        let err = obs.take_error().expect("a stored error");
        assert!(matches!(&err, OutputError::Io(e) if e.to_string() == "write 1"));
        assert!(obs.take_error().is_none());
        let writer = obs.into_writer();
        assert!(writer.calls > 1);
        assert_eq!(writer.finished, 1);
    }

    #[test]
    fn completions_are_flushed_at_the_end() {
        let mut depot = small_depot(30, 0);
        let mut reference = small_depot(30, 0);
        let expected = reference.run(&mut NoopObserver).unwrap().completions;

        #[derive(Default)]
        struct Count(u64, u64);
        impl OutputWriter for Count {
            fn write_completions(&mut self, rows: &[CompletionRow]) -> OutputResult<()> {
                self.0 += rows.len() as u64;
                Ok(())
            }
            fn write_snapshot(&mut self, _row: &SnapshotRow) -> OutputResult<()> {
                self.1 += 1;
                Ok(())
            }
            fn finish(&mut self) -> OutputResult<()> {
                Ok(())
            }
        }

        let mut obs = DepotOutputObserver::new(Count::default());
        depot.run(&mut obs).unwrap();
        let count = obs.into_writer();
        assert_eq!(count.0, expected);
        assert_eq!(count.1, 0, "output_interval_ticks = 0 disables snapshots");
    }
}

// ── SQLite tests ──────────────────────────────────────────────────────────────

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_tests {
    use tempfile::TempDir;

    use super::*;
    use crate::observer::DepotOutputObserver;
    use crate::sqlite::SqliteWriter;
    use crate::writer::OutputWriter;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    #[test]
    fn sqlite_completion_columns() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        w.write_completions(&[completion_row(0, 24), completion_row(1, 30)]).unwrap();
        w.finish().unwrap();
        w.finish().unwrap();

        let conn = rusqlite::Connection::open(dir.path().join("output.db")).unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM completions", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
        let (road, exceeded): (String, i64) = conn
            .query_row(
                "SELECT road, tolerance_exceeded FROM completions WHERE unit = 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(road, "road 1");
        assert_eq!(exceeded, 1);
    }

    #[test]
    fn sqlite_snapshot_row() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        w.write_snapshot(&snapshot_row(7)).unwrap();
        w.finish().unwrap();

        let conn = rusqlite::Connection::open(dir.path().join("output.db")).unwrap();
        let (shunting, spare): (String, i64) = conn
            .query_row(
                "SELECT shunting, spare_units FROM depot_snapshots WHERE tick = 7",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(shunting, "RECEPTION");
        assert_eq!(spare, 1);
    }

    #[test]
    fn integration_sqlite() {
        let mut depot = small_depot(40, 1);
        let dir = tmp();
        let mut obs = DepotOutputObserver::new(SqliteWriter::new(dir.path()).unwrap());
        let report = depot.run(&mut obs).unwrap();
        assert!(obs.take_error().is_none());

        let conn = rusqlite::Connection::open(dir.path().join("output.db")).unwrap();
        let completions: i64 =
            conn.query_row("SELECT COUNT(*) FROM completions", [], |r| r.get(0)).unwrap();
        let snapshots: i64 =
            conn.query_row("SELECT COUNT(*) FROM depot_snapshots", [], |r| r.get(0)).unwrap();
        assert_eq!(completions as u64, report.completions);
        assert_eq!(snapshots, 40);
    }
}

// ── Parquet tests ─────────────────────────────────────────────────────────────

#[cfg(all(test, feature = "parquet"))]
mod parquet_tests {
    use tempfile::TempDir;

    use arrow::datatypes::DataType;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    use super::*;
    use crate::parquet::ParquetWriter;
    use crate::row::COMPLETION_COLUMNS;
    use crate::writer::OutputWriter;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn rows_in(path: std::path::PathBuf) -> usize {
        let file = std::fs::File::open(path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file).unwrap().build().unwrap();
        reader.map(|b| b.unwrap().num_rows()).sum()
    }

    #[test]
    fn parquet_completion_schema() {
        let dir = tmp();
        let mut w = ParquetWriter::new(dir.path()).unwrap();
        w.write_completions(&[completion_row(0, 24), completion_row(1, 30)]).unwrap();
        w.finish().unwrap();

        let file = std::fs::File::open(dir.path().join("completions.parquet")).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        let schema = builder.schema().clone();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, COMPLETION_COLUMNS);
        assert_eq!(
            *schema.field_with_name("tolerance_exceeded").unwrap().data_type(),
            DataType::Boolean
        );
        assert_eq!(rows_in(dir.path().join("completions.parquet")), 2);
    }

    #[test]
    fn parquet_snapshots_written_on_finish() {
        let dir = tmp();
        let mut w = ParquetWriter::new(dir.path()).unwrap();
        for t in 0..10 {
            w.write_snapshot(&snapshot_row(t)).unwrap();
        }
        w.finish().unwrap();
        w.finish().unwrap();
        assert_eq!(rows_in(dir.path().join("depot_snapshots.parquet")), 10);
    }

    #[test]
    fn parquet_finish_required() {
        let dir = tmp();
        {
            let mut w = ParquetWriter::new(dir.path()).unwrap();
            w.write_completions(&[completion_row(0, 24)]).unwrap();
            // Dropped without finish(): no footer.
        }
        let file = std::fs::File::open(dir.path().join("completions.parquet")).unwrap();
        assert!(ParquetRecordBatchReaderBuilder::try_new(file).is_err());
    }
}
