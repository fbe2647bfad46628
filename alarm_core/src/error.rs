use thiserror::Error;

/// Failures the session can end up in. Each one surfaces as a status
/// transition; none of them escape the session actor as a panic or `Err`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlarmError {
    #[error("authorization denied")]
    AuthorizationDenied,
    #[error("health data source unavailable on this device")]
    DataSourceUnavailable,
    #[error("motion sensor unavailable")]
    SensorUnavailable,
    #[error("sensing session acquisition failed: {0}")]
    SessionAcquisition(String),
    #[error("sensing provider failed: {0}")]
    ProviderRuntime(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

impl AlarmError {
    /// Whether an explicit retry from the host can recover from this error.
    /// Missing hardware never recovers.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AlarmError::AuthorizationDenied
                | AlarmError::SessionAcquisition(_)
                | AlarmError::ProviderRuntime(_)
        )
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing authorization provider")]
    MissingAuthorization,
    #[error("missing data source")]
    MissingDataSource,
    #[error("missing sensing session factory")]
    MissingSensing,
    #[error("missing sample source")]
    MissingSampleSource,
    #[error("missing haptics output")]
    MissingHaptics,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
