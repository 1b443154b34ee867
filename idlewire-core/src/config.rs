//! Pipeline configuration
//!
//! Board-agnostic settings. The firmware compiles a TOML file into postcard
//! binary form at build time and decodes it into these types at boot.

use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::correlator::EchoPolicy;
use crate::framing::{FramingPolicy, ScanPolicy};

/// Maximum keep-alive command length, terminator excluded
pub const MAX_COMMAND_LEN: usize = 32;

/// Default keep-alive interval
pub const DEFAULT_KEEPALIVE_MS: u32 = 10_000;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Fixed-length framing with a zero chunk size
    ZeroChunk,
    /// Keep-alive interval of zero
    ZeroInterval,
    /// Keep-alive command is empty
    EmptyCommand,
    /// Keep-alive command contains CR or LF
    CommandHasTerminator,
    /// Baud rate of zero
    ZeroBaudrate,
}

/// Periodic command sent while the link is otherwise quiet
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeepAliveConfig {
    /// Interval between sends (ms)
    pub interval_ms: u32,
    /// Command text, terminator added on send
    pub command: String<MAX_COMMAND_LEN>,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        let mut command = String::new();
        let _ = command.push_str("AT");
        Self {
            interval_ms: DEFAULT_KEEPALIVE_MS,
            command,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PipelineConfig {
    /// UART baud rate
    pub baudrate: u32,
    /// Receive framing
    pub framing: FramingPolicy,
    /// Span scanning after a completed message
    pub scan: ScanPolicy,
    /// Self-echo suppression rule
    pub echo: EchoPolicy,
    /// Keep-alive command, if any
    pub keepalive: Option<KeepAliveConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            baudrate: 115_200,
            framing: FramingPolicy::IdleLine,
            scan: ScanPolicy::Continue,
            echo: EchoPolicy::Exact,
            keepalive: Some(KeepAliveConfig::default()),
        }
    }
}

impl PipelineConfig {
    /// Check the configuration for values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baudrate == 0 {
            return Err(ConfigError::ZeroBaudrate);
        }

        if self.framing == FramingPolicy::FixedLength(0) {
            return Err(ConfigError::ZeroChunk);
        }

        if let Some(keepalive) = &self.keepalive {
            if keepalive.interval_ms == 0 {
                return Err(ConfigError::ZeroInterval);
            }
            if keepalive.command.is_empty() {
                return Err(ConfigError::EmptyCommand);
            }
            if keepalive.command.bytes().any(|b| b == b'\r' || b == b'\n') {
                return Err(ConfigError::CommandHasTerminator);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(
            config.keepalive.as_ref().map(|k| k.command.as_str()),
            Some("AT")
        );
    }

    #[test]
    fn test_zero_chunk_rejected() {
        let config = PipelineConfig {
            framing: FramingPolicy::FixedLength(0),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroChunk));
    }

    #[test]
    fn test_keepalive_checks() {
        let mut config = PipelineConfig::default();
        config.keepalive = Some(KeepAliveConfig {
            interval_ms: 0,
            ..Default::default()
        });
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));

        let mut command = String::new();
        command.push_str("AT\r\n").unwrap();
        config.keepalive = Some(KeepAliveConfig {
            interval_ms: 1_000,
            command,
        });
        assert_eq!(config.validate(), Err(ConfigError::CommandHasTerminator));

        config.keepalive = Some(KeepAliveConfig {
            interval_ms: 1_000,
            command: String::new(),
        });
        assert_eq!(config.validate(), Err(ConfigError::EmptyCommand));
    }

    #[test]
    fn test_keepalive_optional() {
        let config = PipelineConfig {
            keepalive: None,
            ..Default::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }
}
