//! Internal constants for diagram rendering.

use std::time::Duration;

/// Interval between child-process status polls while waiting for a renderer.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Base name of the scratch files handed to a renderer.
pub const SCRATCH_STEM: &str = "diagram";
