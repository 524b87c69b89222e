use thiserror::Error;

/// Errors surfaced by the persistence and configuration edges of the crate.
///
/// The control loop itself never returns these; see `LaunchContext` for the
/// boundary where they are logged and dropped.
#[derive(Debug, Error)]
pub enum GuidanceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parameter file could not be decoded: {0}")]
    ParameterDecode(#[from] toml::de::Error),
    #[error("parameter file could not be encoded: {0}")]
    ParameterEncode(#[from] toml::ser::Error),
    #[error("launch history error: {0}")]
    History(#[from] serde_json::Error),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, GuidanceError>;
