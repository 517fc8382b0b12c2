use thiserror::Error;

use crate::RouterId;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("unknown router {0}")]
    UnknownRouter(RouterId),

    #[error("no route from {src} to {dst}")]
    UnreachableDestination { src: RouterId, dst: RouterId },

    #[error("invalid traffic demand: {0}")]
    InvalidTraffic(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("monitor task failed: {0}")]
    Monitor(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, SimError>;
