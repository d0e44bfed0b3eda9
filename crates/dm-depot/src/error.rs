use dm_core::{Tick, UnitId};
use dm_kernel::KernelError;
use dm_timetable::TimetableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DepotError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("activity {activity:?}: unrecognized interval unit {unit:?}")]
    UnrecognizedIntervalUnit { activity: String, unit: String },

    #[error("activity {activity:?}: unknown road {road:?}")]
    UnknownRoad { activity: String, road: String },

    #[error("{unit} / {activity:?} at {tick}: {detail}")]
    Invariant {
        unit:     UnitId,
        activity: String,
        tick:     Tick,
        detail:   String,
    },

    #[error("timetable error: {0}")]
    Timetable(#[from] TimetableError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DepotResult<T> = Result<T, DepotError>;
