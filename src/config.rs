//! Client connection parameters.
use anyhow::{bail, Result};
use std::ops::RangeInclusive;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_FIRST_SEQ: i32 = 1;
pub const DEFAULT_LAST_SEQ: i32 = 14;

/// Everything the recovery engine needs to talk to the exchange.
///
/// The feed never announces how many packets exist, so the sequence range
/// to reconcile against is configured. Resend requests carry the sequence in
/// one byte; [`ClientConfig::new`] rejects ranges that would not fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    expected_range: RangeInclusive<i32>,
    timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16, expected_range: RangeInclusive<i32>, timeout: Option<Duration>) -> Result<Self> {
        let (first, last) = (*expected_range.start(), *expected_range.end());
        if first > last {
            bail!("expected sequence range {}..={} is empty", first, last);
        }
        if first < 0 || last > i32::from(u8::MAX) {
            bail!("expected sequence range {}..={} must lie within 0..=255 to fit a resend request", first, last);
        }
        if timeout == Some(Duration::ZERO) {
            bail!("timeout must be non-zero; omit it to block indefinitely");
        }
        Ok(Self { host: host.into(), port, expected_range, timeout })
    }

    pub fn expected_range(&self) -> RangeInclusive<i32> {
        self.expected_range.clone()
    }

    /// Per-cycle timeout for connect, write and read. `None` blocks forever.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// `host:port`, suitable for `ToSocketAddrs`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            expected_range: DEFAULT_FIRST_SEQ..=DEFAULT_LAST_SEQ,
            timeout: None,
        }
    }
}
