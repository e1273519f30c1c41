// src/config.rs

use serde::{Deserialize, Serialize};

/// Limits and context defaults applied when compiling and running instances.
///
/// Deserializable from any serde format; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Capacity of an instance's outgoing event queue
    pub event_queue_capacity: usize,

    /// Event deliveries allowed per tick before the rest are dropped
    pub max_event_hops: usize,

    /// Deepest allowed subroutine nesting
    pub max_subroutine_depth: usize,

    /// Sample rate handed to nodes when no explicit context is given
    pub sample_rate: f64,
}

impl RuntimeConfig {
    pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1024;
    pub const DEFAULT_MAX_EVENT_HOPS: usize = 256;
    pub const DEFAULT_MAX_SUBROUTINE_DEPTH: usize = 16;
    pub const DEFAULT_SAMPLE_RATE: f64 = 48_000.0;

    pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }

    pub fn with_max_event_hops(mut self, hops: usize) -> Self {
        self.max_event_hops = hops;
        self
    }

    pub fn with_max_subroutine_depth(mut self, depth: usize) -> Self {
        self.max_subroutine_depth = depth;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_queue_capacity: Self::DEFAULT_EVENT_QUEUE_CAPACITY,
            max_event_hops: Self::DEFAULT_MAX_EVENT_HOPS,
            max_subroutine_depth: Self::DEFAULT_MAX_SUBROUTINE_DEPTH,
            sample_rate: Self::DEFAULT_SAMPLE_RATE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.event_queue_capacity, 1024);
        assert_eq!(config.max_event_hops, 256);
        assert_eq!(config.max_subroutine_depth, 16);
    }

    #[test]
    fn test_persisted_config_round_trip() {
        let config = RuntimeConfig::default().with_max_event_hops(8);
        let bytes = bincode::serialize(&config).unwrap();
        let decoded: RuntimeConfig = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, config);
    }
}
