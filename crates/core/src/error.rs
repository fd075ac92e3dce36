use thiserror::Error;

/// Construction-time validation errors for the primitive value types.
///
/// These fail fast while events are being materialized; the engine assumes
/// it never receives an invalid primitive.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("location city must be non-empty")]
    EmptyCity,

    #[error("time window ordering violated: {0}")]
    InvalidWindow(String),

    #[error("event amount must be non-negative, got {0}")]
    NegativeAmount(f64),
}
