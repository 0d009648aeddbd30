//! Metrics collection and export for chorus.
//!
//! Crates record through the `metrics` facade macros using the names in
//! [`definitions`]. When the `prometheus` feature is enabled the binary can
//! install a Prometheus recorder and render the current values.
//!
//! ```rust,ignore
//! use chorus_metrics::{channels, counter};
//!
//! counter!(channels::POLLS_TOTAL).increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
