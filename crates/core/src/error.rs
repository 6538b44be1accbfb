/// Errors raised by the pure domain logic in this crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A caller-supplied value is out of range.
    #[error("Validation failed: {0}")]
    Validation(String),
}
