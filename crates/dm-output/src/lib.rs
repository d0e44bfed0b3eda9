//! `dm-output` — depot run output writers.
//!
//! Three backends are provided behind Cargo features:
//!
//! | Feature   | Backend     | Files created                                        |
//! |-----------|-------------|------------------------------------------------------|
//! | *(none)*  | CSV         | `completions.csv`, `depot_snapshots.csv`             |
//! | `sqlite`  | SQLite      | `output.db`                                          |
//! | `parquet` | Parquet     | `completions.parquet`, `depot_snapshots.parquet`     |
//!
//! All backends implement [`OutputWriter`] and are driven by
//! [`DepotOutputObserver`], which implements `dm_depot::DepotObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dm_output::{CsvWriter, DepotOutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut obs = DepotOutputObserver::new(writer);
//! depot.run(&mut obs)?;
//! if let Some(e) = obs.take_error() { eprintln!("output error: {e}"); }
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "parquet")]
pub mod parquet;

#[cfg(test)]
mod tests;

pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::DepotOutputObserver;
pub use row::{CompletionRow, SnapshotRow, COMPLETION_COLUMNS, SNAPSHOT_COLUMNS};
pub use writer::OutputWriter;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteWriter;

#[cfg(feature = "parquet")]
pub use parquet::ParquetWriter;
