use thiserror::Error;

use super::opstate::OpCategory;

/// Engine-level failures surfaced to the command layer.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} is already running")]
    Busy(OpCategory),

    #[error("another operation is running, workflow cannot start")]
    NotIdle,

    #[error("no data available for prediction")]
    NoData,

    #[error("demo script is already running")]
    DemoRunning,

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}
