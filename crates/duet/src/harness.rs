// Host-side collaborator implementations for the CLI harness

use duet_core::{
    carriage::{CarriageMode, DualCarriage},
    gantry::{ActuatorVector, GantryAdjuster},
};

/// Dual-carriage stub pinned to a single mode for the whole run.
pub struct StaticCarriage(pub CarriageMode);

impl DualCarriage for StaticCarriage {
    fn secondary_mode(&self) -> CarriageMode {
        self.0
    }
}

/// Gantry that logs corrections instead of driving hardware.
pub struct LoggingGantry;

impl GantryAdjuster for LoggingGantry {
    fn adjust(&self, vector: ActuatorVector, speed: f64) {
        tracing::info!(
            "Gantry correction {:?} at {:.1} mm/s",
            vector.as_array(),
            speed
        );
    }
}
