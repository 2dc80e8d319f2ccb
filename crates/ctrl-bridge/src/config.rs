//! Bridge configuration

use ctrl_core::{CtrlError, Result, RewardPolicy};
use std::time::Duration;

/// Port agents connect to unless configured otherwise
pub const DEFAULT_PORT: u16 = 7777;

/// Configuration for the agent endpoint and episode rewards
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address to bind (default: 0.0.0.0)
    pub bind_addr: String,
    /// Port for the agent endpoint (default: 7777)
    pub port: u16,
    /// Longest a tick waits for the agent; `None` waits forever
    pub step_timeout: Option<Duration>,
    /// Reward constants
    pub reward: RewardPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            step_timeout: None,
            reward: RewardPolicy::default(),
        }
    }
}

impl BridgeConfig {
    /// Defaults overlaid with `CTRL_BIND_ADDR`, `CTRL_PORT` and `CTRL_STEP_TIMEOUT_MS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("CTRL_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(port) = lookup("CTRL_PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|e| CtrlError::Config(format!("CTRL_PORT={:?}: {}", port, e)))?;
        }
        if let Some(ms) = lookup("CTRL_STEP_TIMEOUT_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .map_err(|e| CtrlError::Config(format!("CTRL_STEP_TIMEOUT_MS={:?}: {}", ms, e)))?;
            config.step_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        Ok(config)
    }

    /// `bind_addr:port`
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.endpoint(), "0.0.0.0:7777");
        assert!(config.step_timeout.is_none());
        assert_eq!(config.reward.idle_limit, 150);
    }

    #[test]
    fn test_overrides() {
        let config = BridgeConfig::from_lookup(lookup(&[
            ("CTRL_BIND_ADDR", "127.0.0.1"),
            ("CTRL_PORT", "9000"),
            ("CTRL_STEP_TIMEOUT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.endpoint(), "127.0.0.1:9000");
        assert_eq!(config.step_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let config = BridgeConfig::from_lookup(lookup(&[("CTRL_STEP_TIMEOUT_MS", "0")])).unwrap();
        assert!(config.step_timeout.is_none());
    }

    #[test]
    fn test_bad_port() {
        let err = BridgeConfig::from_lookup(lookup(&[("CTRL_PORT", "seventy")])).unwrap_err();
        assert!(matches!(err, CtrlError::Config(_)));
    }
}
