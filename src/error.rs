use crate::types::Rank;

pub type Result<T> = std::result::Result<T, NwayError>;

#[derive(Debug, thiserror::Error)]
pub enum NwayError {
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error("protocol violation at rank {rank}: {reason}")]
    ProtocolViolation { rank: Rank, reason: String },

    #[error("transfer to rank {rank} failed: {message}")]
    TransferFailure {
        rank: Rank,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("queue {queue} is full ({depth} pending writes)")]
    QueueFull { queue: u32, depth: usize },

    #[error("invalid rank {rank}: world size is {world_size}")]
    InvalidRank { rank: Rank, world_size: u32 },

    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("region {region} is not registered on rank {rank}")]
    UnknownRegion { rank: Rank, region: u32 },

    #[error("barrier timed out after {timeout_ms}ms at rank {rank}")]
    BarrierTimeout { rank: Rank, timeout_ms: u64 },
}

impl NwayError {
    /// Create a `Config` error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create a `ProtocolViolation` error.
    pub fn protocol(rank: Rank, reason: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            rank,
            reason: reason.into(),
        }
    }

    /// Create a `TransferFailure` with just a message.
    pub fn transfer(rank: Rank, msg: impl Into<String>) -> Self {
        Self::TransferFailure {
            rank,
            message: msg.into(),
            source: None,
        }
    }

    /// Create a `TransferFailure` with a message and a source error.
    pub fn transfer_with_source(
        rank: Rank,
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::TransferFailure {
            rank,
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// True for errors that abort the collective on every rank.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, NwayError::QueueFull { .. })
    }
}
