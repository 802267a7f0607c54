//! Server configuration: listen address, read timeouts and key table.

use crate::error::ConfigError;
use shared::{KeyTable, DEFAULT_PORT};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_RECHARGING_TIMEOUT: Duration = Duration::from_millis(5000);

/// Read limits for one message. The recharging limit applies only while the
/// robot announced it is recharging. Always longer than the normal limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    normal: Duration,
    recharging: Duration,
}

impl Timeouts {
    pub fn new(normal: Duration, recharging: Duration) -> Result<Self, ConfigError> {
        if normal.is_zero() || recharging.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if recharging <= normal {
            return Err(ConfigError::RechargeNotLonger { normal, recharging });
        }
        Ok(Self { normal, recharging })
    }

    pub fn normal(&self) -> Duration {
        self.normal
    }

    pub fn recharging(&self) -> Duration {
        self.recharging
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            normal: DEFAULT_TIMEOUT,
            recharging: DEFAULT_RECHARGING_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub timeouts: Timeouts,
    pub keys: KeyTable,
}

impl ServerConfig {
    pub fn new(address: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            address: address.into(),
            timeouts,
            keys: KeyTable::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(format!("127.0.0.1:{}", DEFAULT_PORT), Timeouts::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.normal(), Duration::from_millis(1000));
        assert_eq!(timeouts.recharging(), Duration::from_millis(5000));
    }

    #[test]
    fn test_recharging_must_be_longer() {
        let equal = Timeouts::new(Duration::from_millis(500), Duration::from_millis(500));
        assert!(matches!(equal, Err(ConfigError::RechargeNotLonger { .. })));

        let shorter = Timeouts::new(Duration::from_millis(500), Duration::from_millis(100));
        assert!(shorter.is_err());

        let ok = Timeouts::new(Duration::from_millis(100), Duration::from_millis(400)).unwrap();
        assert_eq!(ok.normal(), Duration::from_millis(100));
        assert_eq!(ok.recharging(), Duration::from_millis(400));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = Timeouts::new(Duration::ZERO, Duration::from_millis(100));
        assert!(matches!(result, Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.address, "127.0.0.1:1111");
        assert_eq!(config.keys.len(), 5);
    }
}
