// Two-point gantry tilt solver

/// Line fitted through two (X, Z) samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    /// Fit a line through two points. A pair sharing the same X degenerates
    /// to a flat line at the first sample's height.
    pub fn fit(p0: (f64, f64), p1: (f64, f64)) -> Self {
        if p0.0 == p1.0 {
            return Line {
                slope: 0.0,
                intercept: p0.1,
            };
        }
        let slope = (p1.1 - p0.1) / (p1.0 - p0.0);
        let intercept = p0.1 - slope * p0.0;
        Line { slope, intercept }
    }

    /// Height of the line at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Symmetric left/right gantry correction. `left + right` is always zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltAdjustment {
    pub left: f64,
    pub right: f64,
}

/// Solve the gantry tilt for two sampled columns, splitting the measured
/// height difference evenly across the two gantry sides.
///
/// The fitted line is evaluated back at both X positions to recover the
/// required heights. With exactly two samples that evaluation reproduces
/// the inputs; it is kept so the required heights always come from the fit.
pub fn solve_tilt(p0: (f64, f64), p1: (f64, f64)) -> TiltAdjustment {
    let line = Line::fit(p0, p1);
    let required_z0 = line.eval(p0.0);
    let required_z1 = line.eval(p1.0);

    // Positive means the right side sits lower than the left and must come up.
    let z_difference = required_z1 - required_z0;

    if p0.0 < p1.0 {
        // Primary toolhead on the left.
        TiltAdjustment {
            left: -z_difference / 2.0,
            right: z_difference / 2.0,
        }
    } else {
        TiltAdjustment {
            left: z_difference / 2.0,
            right: -z_difference / 2.0,
        }
    }
}
