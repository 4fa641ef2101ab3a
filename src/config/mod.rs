//! Configuration models for the dispatch engine.

pub mod engine;

pub use engine::{EngineConfig, ExecutionMode};
