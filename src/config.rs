use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Process configuration. Read once at startup and shared immutably.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub send: SendConfig,
    pub poll: PollConfig,
    pub pipeline: PipelineConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SendConfig {
    pub rate_limit_per_sec: u32,
    pub timeout_ms: u64,
    pub endpoint: String,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_sec: 100,
            timeout_ms: 5_000,
            endpoint: "mock://payment-provider".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub max_elapsed_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            max_elapsed_ms: 30_000,
        }
    }
}

/// How the pipeline learns that a conversation reached a terminal status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AckMode {
    /// Ask the provider on a fixed interval.
    #[default]
    Poll,
    /// Wait for the provider to push updates.
    Receive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub max_in_flight: usize,
    pub channel_capacity: usize,
    pub blocking_workers: usize,
    /// Rows per blocking read or write job.
    pub batch_size: usize,
    pub ack_mode: AckMode,
    pub auto_persist: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 16,
            channel_capacity: 64,
            blocking_workers: 4,
            batch_size: 256,
            ack_mode: AckMode::Poll,
            auto_persist: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub limit: u32,
    pub wait_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            limit: 3,
            wait_ms: 200,
            max_backoff_ms: 2_000,
        }
    }
}

impl Config {
    /// Loads a JSON configuration file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, message: &str) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(PipelineError::Config(message.to_string()))
            }
        }

        check(self.send.rate_limit_per_sec > 0, "send.rate_limit_per_sec must be positive")?;
        check(self.send.timeout_ms > 0, "send.timeout_ms must be positive")?;
        check(!self.send.endpoint.trim().is_empty(), "send.endpoint must not be empty")?;
        check(self.poll.interval_ms > 0, "poll.interval_ms must be positive")?;
        check(
            self.poll.max_elapsed_ms >= self.poll.interval_ms,
            "poll.max_elapsed_ms must be at least poll.interval_ms",
        )?;
        check(self.pipeline.max_in_flight > 0, "pipeline.max_in_flight must be positive")?;
        check(self.pipeline.channel_capacity > 0, "pipeline.channel_capacity must be positive")?;
        check(self.pipeline.blocking_workers > 0, "pipeline.blocking_workers must be positive")?;
        check(self.pipeline.batch_size > 0, "pipeline.batch_size must be positive")?;
        check(
            self.retry.max_backoff_ms >= self.retry.wait_ms,
            "retry.max_backoff_ms must be at least retry.wait_ms",
        )
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }

    pub fn poll_max_elapsed(&self) -> Duration {
        Duration::from_millis(self.poll.max_elapsed_ms)
    }
}
