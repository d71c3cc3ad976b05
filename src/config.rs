//! Runtime-configurable tuning parameters for nway.
//!
//! All values have sensible defaults. Override via environment variables
//! (prefixed `NWAY_`) or by constructing the structs directly.

use std::time::Duration;

/// Tuning parameters for the reduce collective itself.
#[derive(Debug, Clone)]
pub struct ReduceConfig {
    /// Requested fan-in of the reduction tree. The effective fan-in may be
    /// lower, see [`crate::collective::restrict_fan_in`].
    pub fan_in: u32,

    /// Largest block, in elements, moved by a single forwarding write.
    pub max_block_len: usize,

    /// Largest number of pipelined blocks per vector.
    pub max_blocks: usize,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            fan_in: 2,
            max_block_len: 4096,
            max_blocks: 511,
        }
    }
}

impl ReduceConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `NWAY_FAN_IN`
    /// - `NWAY_MAX_BLOCK_LEN`
    /// - `NWAY_MAX_BLOCKS`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(n) = env_parse::<u32>("NWAY_FAN_IN") {
            cfg.fan_in = n;
        }
        if let Some(n) = env_parse::<usize>("NWAY_MAX_BLOCK_LEN") {
            cfg.max_block_len = n;
        }
        if let Some(n) = env_parse::<usize>("NWAY_MAX_BLOCKS") {
            cfg.max_blocks = n;
        }

        cfg
    }

    /// Builder-style fan-in override.
    pub fn with_fan_in(mut self, fan_in: u32) -> Self {
        self.fan_in = fan_in;
        self
    }

    /// Builder-style block length override.
    pub fn with_max_block_len(mut self, len: usize) -> Self {
        self.max_block_len = len;
        self
    }

    /// Builder-style block count override.
    pub fn with_max_blocks(mut self, blocks: usize) -> Self {
        self.max_blocks = blocks;
        self
    }
}

/// Limits of the one-sided messaging substrate.
#[derive(Debug, Clone)]
pub struct FabricConfig {
    /// Number of outbound transfer queues per rank.
    pub queue_count: u32,

    /// Writes that may be posted on one queue before it must be flushed.
    pub queue_depth: usize,

    /// Notification counters per region.
    pub notification_capacity: u32,

    /// Timeout for barrier operations.
    pub barrier_timeout: Duration,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            queue_count: 8,
            queue_depth: 1024,
            notification_capacity: 65536,
            barrier_timeout: Duration::from_secs(30),
        }
    }
}

impl FabricConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `NWAY_QUEUE_COUNT`
    /// - `NWAY_QUEUE_DEPTH`
    /// - `NWAY_NOTIFICATION_CAPACITY`
    /// - `NWAY_BARRIER_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(n) = env_parse::<u32>("NWAY_QUEUE_COUNT") {
            cfg.queue_count = n;
        }
        if let Some(n) = env_parse::<usize>("NWAY_QUEUE_DEPTH") {
            cfg.queue_depth = n;
        }
        if let Some(n) = env_parse::<u32>("NWAY_NOTIFICATION_CAPACITY") {
            cfg.notification_capacity = n;
        }
        if let Some(s) = env_parse::<u64>("NWAY_BARRIER_TIMEOUT_SECS") {
            cfg.barrier_timeout = Duration::from_secs(s);
        }

        cfg
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.parse().ok()
}
