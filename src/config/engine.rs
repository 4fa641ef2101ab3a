//! Engine configuration structures.

use serde::{Deserialize, Serialize};

use crate::rwlock::DEFAULT_READER_CAPACITY;

/// Environment variable selecting pooled mode and its consumer count (`auto` uses
/// one consumer per CPU).
pub const ENV_CONSUMERS: &str = "FEED_DISPATCH_CONSUMERS";
/// Environment variable overriding the feed lock's reader capacity.
pub const ENV_READER_CAPACITY: &str = "FEED_DISPATCH_READER_CAPACITY";
/// Environment variable overriding the consumer thread stack size in bytes.
pub const ENV_STACK_SIZE: &str = "FEED_DISPATCH_STACK_SIZE";

const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;

/// How requests are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ExecutionMode {
    /// One thread decodes, applies and answers each request in turn.
    Direct,
    /// One producer feeds a lock-free queue drained by `consumers` worker threads.
    Pooled {
        /// Number of consumer threads.
        consumers: usize,
    },
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Dispatch mode.
    pub mode: ExecutionMode,
    /// Maximum concurrent readers admitted by the feed lock.
    #[serde(default = "default_reader_capacity")]
    pub reader_capacity: usize,
    /// Stack size for consumer threads, in bytes.
    #[serde(default = "default_stack_size")]
    pub thread_stack_size: usize,
}

const fn default_reader_capacity() -> usize {
    DEFAULT_READER_CAPACITY
}

const fn default_stack_size() -> usize {
    DEFAULT_STACK_SIZE
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Direct mode with default lock capacity and stack size.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: ExecutionMode::Direct,
            reader_capacity: DEFAULT_READER_CAPACITY,
            thread_stack_size: DEFAULT_STACK_SIZE,
        }
    }

    /// Switch to pooled mode with `consumers` worker threads.
    #[must_use]
    pub const fn with_consumers(mut self, consumers: usize) -> Self {
        self.mode = ExecutionMode::Pooled { consumers };
        self
    }

    /// Switch to direct mode.
    #[must_use]
    pub const fn direct(mut self) -> Self {
        self.mode = ExecutionMode::Direct;
        self
    }

    /// Set the feed lock's reader capacity.
    #[must_use]
    pub const fn with_reader_capacity(mut self, capacity: usize) -> Self {
        self.reader_capacity = capacity;
        self
    }

    /// Set the consumer thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Consumer count in pooled mode, `None` in direct mode.
    #[must_use]
    pub const fn consumers(&self) -> Option<usize> {
        match self.mode {
            ExecutionMode::Direct => None,
            ExecutionMode::Pooled { consumers } => Some(consumers),
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.consumers() == Some(0) {
            return Err("consumers must be greater than 0".into());
        }
        if self.reader_capacity == 0 {
            return Err("reader_capacity must be greater than 0".into());
        }
        if self.thread_stack_size < 64 * 1024 {
            return Err("thread_stack_size must be at least 64 KiB".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from the process environment, loading a `.env` file first
    /// if one is present.
    ///
    /// # Errors
    ///
    /// Returns a description of the first malformed variable or validation failure.
    pub fn from_env() -> Result<Self, String> {
        Self::from_vars(|key| dotenvy::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns a description of the first malformed variable or validation failure.
    pub fn from_vars<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::new();

        if let Some(raw) = lookup(ENV_CONSUMERS) {
            let raw = raw.trim();
            let consumers = if raw.eq_ignore_ascii_case("auto") {
                num_cpus::get()
            } else {
                parse_count(ENV_CONSUMERS, raw)?
            };
            cfg = cfg.with_consumers(consumers);
        }
        if let Some(raw) = lookup(ENV_READER_CAPACITY) {
            cfg.reader_capacity = parse_count(ENV_READER_CAPACITY, raw.trim())?;
        }
        if let Some(raw) = lookup(ENV_STACK_SIZE) {
            cfg.thread_stack_size = parse_count(ENV_STACK_SIZE, raw.trim())?;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_count(key: &str, raw: &str) -> Result<usize, String> {
    raw.parse()
        .map_err(|e| format!("`{key}` must be a non-negative integer, got `{raw}`: {e}"))
}
