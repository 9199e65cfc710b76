// Dual-carriage modes and secondary toolhead mapping

/// Operating mode of the secondary carriage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarriageMode {
    /// Carriages move independently; no linked compensation applies.
    Independent,
    /// Secondary duplicates the primary's motion at a fixed X offset.
    Copy,
    /// Secondary mirrors the primary's motion across the X axis.
    Mirror,
}

impl CarriageMode {
    /// Map a raw status string to a mode (case-insensitive). Anything other
    /// than COPY or MIRROR counts as independent operation.
    pub fn from_status(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "COPY" => CarriageMode::Copy,
            "MIRROR" => CarriageMode::Mirror,
            _ => CarriageMode::Independent,
        }
    }

    /// Whether the carriages are linked (COPY or MIRROR).
    pub fn is_linked(&self) -> bool {
        matches!(self, CarriageMode::Copy | CarriageMode::Mirror)
    }
}

/// Status interface of the dual-carriage module.
pub trait DualCarriage {
    /// Mode of the secondary carriage, derived fresh on every call.
    fn secondary_mode(&self) -> CarriageMode;
}

/// Resolve the mode for a move. A printer without a dual-carriage module
/// always runs independent.
pub fn resolve_mode(dc: Option<&dyn DualCarriage>) -> CarriageMode {
    match dc {
        Some(dc) => dc.secondary_mode(),
        None => CarriageMode::Independent,
    }
}

/// Derive the secondary toolhead's XY from the primary's XY, the configured
/// carriage offset, and the mode. Y is shared between the carriages.
pub fn secondary_position(primary: (f64, f64), offset_x: f64, mode: CarriageMode) -> (f64, f64) {
    let (x, y) = primary;
    match mode {
        CarriageMode::Copy => (x + offset_x, y),
        CarriageMode::Mirror => (x - offset_x, y),
        CarriageMode::Independent => (x, y),
    }
}
