//! Framework error type.
//!
//! Sub-crates define their own error enums and wrap `DmError` as one variant
//! where they need to surface a core failure.

use thiserror::Error;

/// The top-level error type for `dm-core`.
#[derive(Debug, Error)]
pub enum DmError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Shorthand result type for `dm-core`.
pub type DmResult<T> = Result<T, DmError>;
