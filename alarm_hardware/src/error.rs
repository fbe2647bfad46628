use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("workout session refused by the simulated platform")]
    SessionRefused,
}
