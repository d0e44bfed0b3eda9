use dm_kernel::KernelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkshopError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WorkshopResult<T> = Result<T, WorkshopError>;
