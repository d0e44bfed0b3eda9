use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimetableError {
    #[error("{what} must contain at least one slot")]
    Empty { what: &'static str },

    #[error("timetable has {demand} slots but the injection window has {window}")]
    PeriodMismatch { demand: usize, window: usize },

    #[error("injection window never clears; maintenance could never start")]
    NeverClear,

    #[error("invalid hour range [{start}, {end})")]
    InvalidHours { start: f64, end: f64 },
}

pub type TimetableResult<T> = Result<T, TimetableError>;
