use rand::distr::{Alphanumeric, SampleString};

/// Item writer contract used by steps to hand off produced records.
pub mod item;

/// Per-step mutable context shared between the host and a task.
pub mod state;

/// Step driver for iterable tasks.
pub mod step;

/// Task, iterable task and transformer contracts.
pub mod task;

/// Generates a random name consisting of alphanumeric characters.
///
/// # Returns
///
/// A `String` containing the generated random name.
fn build_name() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 8)
}
