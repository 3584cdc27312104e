//! Limiter configuration

use serde::{Deserialize, Serialize};

/// Rate increase applied after every successful request
pub const NUDGE_UP: f64 = 0.02;

/// Rate decrease applied after every throttled (429) request
pub const NUDGE_DOWN: f64 = -0.2;

/// Lowest refill rate nudging may reach
pub const MIN_RPS: f64 = 1.0;

/// Highest refill rate nudging may reach
pub const MAX_RPS: f64 = 7.0;

const DEFAULT_RPS: f64 = 7.0;
const DEFAULT_BURST: u32 = 7;

/// Initial bucket settings for every space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Refill rate of the read bucket (tokens per second)
    pub read_rps: f64,
    /// Refill rate of the write bucket (tokens per second)
    pub write_rps: f64,
    /// Capacity of both buckets
    pub burst: u32,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            read_rps: DEFAULT_RPS,
            write_rps: DEFAULT_RPS,
            burst: DEFAULT_BURST,
        }
    }
}

impl LimiterConfig {
    /// Recommended limits for a space plan level.
    ///
    /// Free plans (level 0 or below) get a tighter allowance.
    pub fn for_plan(plan_level: i64) -> Self {
        if plan_level <= 0 {
            Self {
                read_rps: 4.0,
                write_rps: 3.0,
                burst: 3,
            }
        } else {
            Self::default()
        }
    }

    /// Replace non-positive values with the defaults
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        Self {
            read_rps: if self.read_rps > 0.0 { self.read_rps } else { defaults.read_rps },
            write_rps: if self.write_rps > 0.0 { self.write_rps } else { defaults.write_rps },
            burst: if self.burst > 0 { self.burst } else { defaults.burst },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_default_is_seven_everywhere() {
        let config = LimiterConfig::default();
        assert_eq!(config.read_rps, 7.0);
        assert_eq!(config.write_rps, 7.0);
        assert_eq!(config.burst, 7);
    }

    #[rstest]
    #[case(-1, 4.0, 3.0, 3)]
    #[case(0, 4.0, 3.0, 3)]
    #[case(1, 7.0, 7.0, 7)]
    #[case(3, 7.0, 7.0, 7)]
    fn test_for_plan(
        #[case] level: i64,
        #[case] read: f64,
        #[case] write: f64,
        #[case] burst: u32,
    ) {
        let config = LimiterConfig::for_plan(level);
        assert_eq!(config, LimiterConfig { read_rps: read, write_rps: write, burst });
    }

    #[test]
    fn test_normalized_replaces_non_positive_values() {
        let config = LimiterConfig {
            read_rps: 0.0,
            write_rps: -2.0,
            burst: 0,
        }
        .normalized();
        assert_eq!(config, LimiterConfig::default());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: LimiterConfig = toml::from_str("burst = 3").unwrap();
        assert_eq!(config.burst, 3);
        assert_eq!(config.read_rps, 7.0);
    }
}
