//! Construction-time settings for [`BoundedBlockingMap`](crate::BoundedBlockingMap).

use crate::error::ConfigError;

/// Capacity used by `MapConfig::default()`.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Name attached to log events when none is configured.
pub const DEFAULT_NAME: &str = "bounded-blocking-map";

/// Configuration for a bounded map.
///
/// # Example
///
/// ```rust
/// use bounded_blocking_map::{BoundedBlockingMap, MapConfig};
///
/// let config = MapConfig::new(64).with_name("pending-acks");
/// let map: BoundedBlockingMap<u64, String> = BoundedBlockingMap::with_config(config).unwrap();
/// assert_eq!(map.capacity(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapConfig {
    /// Maximum number of entries held at once (default: 1024)
    pub capacity: usize,
    /// Label carried by log events (default: "bounded-blocking-map")
    pub name: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MapConfig {
    /// Creates a configuration with the given capacity and the default name
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            name: DEFAULT_NAME.to_string(),
        }
    }

    /// Sets the label used in log events, useful when a client keeps
    /// several maps (for example one per connection).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Checks the configuration without building a map.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity {
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MapConfig::default();
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.name, DEFAULT_NAME);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern_chaining() {
        let config = MapConfig::new(8).with_name("acks");
        assert_eq!(config.capacity, 8);
        assert_eq!(config.name, "acks");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            MapConfig::new(0).validate(),
            Err(ConfigError::InvalidCapacity { capacity: 0 })
        );
    }
}
