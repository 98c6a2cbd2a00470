use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Runtime settings, all environment-derived so the binaries run unchanged
/// on a dev box and in the fleet. Bucket names and the queue URL have no
/// sensible defaults; each entry point asks only for the pieces it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source_bucket: Option<String>,
    pub output_bucket: String,
    pub queue_url: Option<String>,
    pub max_batch: usize,
    pub wait: Duration,
    pub idle_sleep: Duration,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            source_bucket: optional("SALES_SOURCE_BUCKET"),
            output_bucket: require("SALES_OUTPUT_BUCKET")?,
            queue_url: optional("SALES_QUEUE_URL"),
            max_batch: parse_or("SALES_POLL_MAX_BATCH", 10)?,
            wait: Duration::from_secs(parse_or("SALES_POLL_WAIT_SECONDS", 20)?),
            idle_sleep: Duration::from_secs(parse_or("SALES_IDLE_SLEEP_SECONDS", 10)?),
        })
    }

    pub fn source_bucket(&self) -> Result<&str, ConfigError> {
        self.source_bucket
            .as_deref()
            .ok_or(ConfigError::Missing("SALES_SOURCE_BUCKET"))
    }

    pub fn queue_url(&self) -> Result<&str, ConfigError> {
        self.queue_url
            .as_deref()
            .ok_or(ConfigError::Missing("SALES_QUEUE_URL"))
    }
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test for the whole env round trip: the variables are process
    // globals, so splitting this up would race under the parallel runner.
    #[test]
    fn from_env_reads_and_defaults() {
        env::set_var("SALES_OUTPUT_BUCKET", "summaries");
        env::set_var("SALES_SOURCE_BUCKET", "raw-sales");
        env::remove_var("SALES_QUEUE_URL");
        env::set_var("SALES_POLL_MAX_BATCH", "5");
        env::remove_var("SALES_POLL_WAIT_SECONDS");
        env::remove_var("SALES_IDLE_SLEEP_SECONDS");

        let config = Config::from_env().unwrap();
        assert_eq!(config.output_bucket, "summaries");
        assert_eq!(config.source_bucket().unwrap(), "raw-sales");
        assert_eq!(config.queue_url(), Err(ConfigError::Missing("SALES_QUEUE_URL")));
        assert_eq!(config.max_batch, 5);
        assert_eq!(config.wait, Duration::from_secs(20));
        assert_eq!(config.idle_sleep, Duration::from_secs(10));

        env::set_var("SALES_POLL_MAX_BATCH", "lots");
        assert_eq!(
            Config::from_env(),
            Err(ConfigError::Invalid {
                name: "SALES_POLL_MAX_BATCH",
                value: "lots".to_owned()
            })
        );
        env::remove_var("SALES_POLL_MAX_BATCH");
    }
}
