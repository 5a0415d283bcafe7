#[cfg(feature = "logger")]
/// This module provides a logger item writer, useful for debugging pipelines.
pub mod logger;
