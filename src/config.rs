//! Relay configuration
//!
//! Defaults plus environment overrides, read once at startup and passed
//! down to the resolver and room actors.

use std::env;

/// Default bind address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Default maximum chat text length, in characters after trimming
pub const DEFAULT_MAX_TEXT_LEN: usize = 200;

/// Buffer size for room command channels
pub const COMMAND_BUFFER_SIZE: usize = 256;

/// Buffer size for per-connection outbound channels
pub const OUTBOUND_BUFFER_SIZE: usize = 32;

/// Runtime configuration for the relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the TCP listener binds to
    pub bind_addr: String,
    /// Maximum accepted chat text length in characters; longer inbound
    /// text is dropped like any other malformed payload
    pub max_text_len: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            max_text_len: DEFAULT_MAX_TEXT_LEN,
        }
    }
}

impl RelayConfig {
    /// Build a config from the environment
    ///
    /// `RELAY_ADDR` overrides the bind address, `RELAY_MAX_TEXT_LEN` the
    /// text length limit. Unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let bind_addr = env::var("RELAY_ADDR").unwrap_or(defaults.bind_addr);
        let max_text_len = env::var("RELAY_MAX_TEXT_LEN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_text_len);
        Self {
            bind_addr,
            max_text_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.bind_addr, DEFAULT_ADDR);
        assert_eq!(config.max_text_len, DEFAULT_MAX_TEXT_LEN);
    }
}
