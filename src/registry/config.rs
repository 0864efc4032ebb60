//! Registry and stream session configuration

use std::time::Duration;

use crate::error::{Error, Result};
use crate::sink::CloseCode;

/// Stream configuration options
///
/// Shared by the registry and every session it starts.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum wait for one frame before logging a timeout and retrying
    pub retrieve_timeout: Duration,

    /// Fixed pacing delay between broadcasts (~30 fps)
    pub frame_interval: Duration,

    /// JPEG quality (1-100)
    pub jpeg_quality: u8,

    /// Queue depth for sinks created with [`ChannelSink`](crate::sink::ChannelSink)
    pub sink_buffer: usize,

    /// How often the cleanup task reaps sessions that ended on their own
    pub cleanup_interval: Duration,

    /// Close code sent to viewers when a stream dies from a device failure
    pub fatal_close_code: CloseCode,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            retrieve_timeout: Duration::from_millis(2000),
            frame_interval: Duration::from_millis(33),
            jpeg_quality: 75,
            sink_buffer: 2,
            cleanup_interval: Duration::from_secs(5),
            fatal_close_code: CloseCode::STREAM_ERROR,
        }
    }
}

impl RegistryConfig {
    /// Set the per-frame retrieve timeout
    pub fn retrieve_timeout(mut self, timeout: Duration) -> Self {
        self.retrieve_timeout = timeout;
        self
    }

    /// Set the pacing interval
    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Set JPEG quality
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set the channel sink queue depth
    pub fn sink_buffer(mut self, frames: usize) -> Self {
        self.sink_buffer = frames.max(1);
        self
    }

    /// Set the cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Set the close code used for fatal stream termination
    pub fn fatal_close_code(mut self, code: CloseCode) -> Self {
        self.fatal_close_code = code;
        self
    }

    /// Reject values the acquisition loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.retrieve_timeout.is_zero() {
            return Err(Error::Config("retrieve_timeout must be non-zero".into()));
        }
        if self.frame_interval.is_zero() {
            return Err(Error::Config("frame_interval must be non-zero".into()));
        }
        if self.cleanup_interval.is_zero() {
            return Err(Error::Config("cleanup_interval must be non-zero".into()));
        }
        if self.fatal_close_code == CloseCode::NORMAL {
            return Err(Error::Config(
                "fatal_close_code must differ from the normal close code".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.retrieve_timeout, Duration::from_millis(2000));
        assert_eq!(config.frame_interval, Duration::from_millis(33));
        assert_eq!(config.jpeg_quality, 75);
        assert_eq!(config.fatal_close_code, CloseCode::STREAM_ERROR);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .retrieve_timeout(Duration::from_millis(500))
            .frame_interval(Duration::from_millis(10))
            .jpeg_quality(90)
            .sink_buffer(8)
            .cleanup_interval(Duration::from_millis(50))
            .fatal_close_code(CloseCode(4001));

        assert_eq!(config.retrieve_timeout, Duration::from_millis(500));
        assert_eq!(config.frame_interval, Duration::from_millis(10));
        assert_eq!(config.jpeg_quality, 90);
        assert_eq!(config.sink_buffer, 8);
        assert_eq!(config.cleanup_interval, Duration::from_millis(50));
        assert_eq!(config.fatal_close_code, CloseCode(4001));
    }

    #[test]
    fn test_builder_clamps() {
        let config = RegistryConfig::default().jpeg_quality(0).sink_buffer(0);

        assert_eq!(config.jpeg_quality, 1);
        assert_eq!(config.sink_buffer, 1);
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let config = RegistryConfig::default().retrieve_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = RegistryConfig::default().frame_interval(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = RegistryConfig::default().fatal_close_code(CloseCode::NORMAL);
        assert!(config.validate().is_err());
    }
}
