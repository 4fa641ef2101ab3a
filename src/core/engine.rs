//! Engine entry point: validates configuration and runs one command stream to
//! completion in the configured mode.

use std::io::{Read, Write};
use std::time::Instant;

use tracing::{info, info_span};
use uuid::Uuid;

use crate::config::{EngineConfig, ExecutionMode};
use crate::core::dispatch::{run_direct, run_pooled, RunReport};
use crate::core::EngineError;

/// Runs command streams against a fresh feed.
///
/// Each call to [`Engine::run`] builds its own queue, feed and lock, so independent
/// runs never share state.
///
/// # Example
///
/// ```
/// use feed_dispatch::{Engine, EngineConfig};
///
/// let input = r#"
///     {"command":"ADD","id":1,"timestamp":2,"body":"second"}
///     {"command":"ADD","id":2,"timestamp":1,"body":"first"}
///     {"command":"FEED","id":3}
///     {"command":"DONE"}
/// "#;
/// let mut output = Vec::new();
///
/// let engine = Engine::new(EngineConfig::new().with_consumers(2))?;
/// let report = engine.run(input.as_bytes(), &mut output)?;
///
/// assert_eq!(report.responses, 3);
/// # Ok::<(), feed_dispatch::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Create an engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        Ok(Self { config })
    }

    /// The engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process `input` until `DONE` (or end of input), writing responses to `output`.
    ///
    /// Returns only once every worker has observed `DONE` and all responses have
    /// been flushed.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Decode`] if a record is malformed; requests decoded before it
    ///   are still applied and answered.
    /// - [`EngineError::Io`] / [`EngineError::Encode`] if the output fails.
    /// - [`EngineError::WorkerPanicked`] if a worker thread panicked.
    pub fn run<R, W>(&self, input: R, output: W) -> Result<RunReport, EngineError>
    where
        R: Read,
        W: Write + Send,
    {
        let run_id = Uuid::new_v4();
        let mode = self.config.mode;
        let span = info_span!("engine_run", %run_id);
        let _guard = span.enter();

        info!(?mode, reader_capacity = self.config.reader_capacity, "engine run starting");
        let started = Instant::now();

        let outcome = match mode {
            ExecutionMode::Direct => run_direct(&self.config, input, output)?,
            ExecutionMode::Pooled { consumers } => {
                run_pooled(&self.config, consumers, input, output)?
            }
        };

        info!(
            requests = outcome.requests.total(),
            responses = outcome.responses,
            elapsed_ms = started.elapsed().as_millis(),
            "engine run complete"
        );

        Ok(RunReport {
            run_id,
            mode,
            requests: outcome.requests,
            responses: outcome.responses,
            implicit_done: outcome.implicit_done,
        })
    }
}
