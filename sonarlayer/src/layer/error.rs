use thiserror::Error;

/// Errors raised while assembling a layer.
///
/// Once a layer runs, cache and fill failures are handled internally and
/// never surface here.
#[derive(Debug, Error)]
pub enum LayerError {
    /// The layer configuration cannot be used.
    #[error("Invalid layer configuration: {0}")]
    InvalidConfig(String),
}
