// Stored bed mesh profiles

use anyhow::{Context, Result};
use duet_core::mesh::HeightMesh;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// A saved rectangular probe grid, as persisted by mesh calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshProfile {
    pub name: String,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    /// Probed heights, row-major: `probed_matrix[row][col]` with rows along
    /// Y and columns along X.
    pub probed_matrix: Vec<Vec<f64>>,
}

impl MeshProfile {
    /// Load and validate a profile from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read mesh profile {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Parse and validate a profile from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let profile: MeshProfile =
            serde_json::from_str(content).context("failed to parse mesh profile as JSON")?;
        profile.validate()?;
        Ok(profile)
    }

    /// Validate the grid geometry
    pub fn validate(&self) -> Result<()> {
        let rows = self.probed_matrix.len();
        if rows < 2 {
            anyhow::bail!("mesh profile needs at least 2 probed rows, got {rows}");
        }
        let cols = self.probed_matrix[0].len();
        if cols < 2 {
            anyhow::bail!("mesh profile needs at least 2 probed columns, got {cols}");
        }
        for (i, row) in self.probed_matrix.iter().enumerate() {
            if row.len() != cols {
                anyhow::bail!("mesh profile row {i} has {} points, expected {cols}", row.len());
            }
            if row.iter().any(|z| !z.is_finite()) {
                anyhow::bail!("mesh profile row {i} contains a non-finite height");
            }
        }
        for (name, min, max) in [
            ("x", self.min_x, self.max_x),
            ("y", self.min_y, self.max_y),
        ] {
            if !min.is_finite() || !max.is_finite() || min >= max {
                anyhow::bail!("mesh profile {name} bounds are invalid: [{min}, {max}]");
            }
        }
        Ok(())
    }

    /// Bilinear interpolation over the grid, with the query clamped to the
    /// probed bounds.
    pub fn interpolate(&self, x: f64, y: f64) -> f64 {
        let rows = self.probed_matrix.len();
        let cols = self.probed_matrix[0].len();
        let (col, fx) = axis_cell(x, self.min_x, self.max_x, cols);
        let (row, fy) = axis_cell(y, self.min_y, self.max_y, rows);

        let m = &self.probed_matrix;
        let z00 = m[row][col];
        let z01 = m[row][col + 1];
        let z10 = m[row + 1][col];
        let z11 = m[row + 1][col + 1];

        let bottom = z00 + (z01 - z00) * fx;
        let top = z10 + (z11 - z10) * fx;
        bottom + (top - bottom) * fy
    }
}

/// Locate the grid cell containing `v` along one axis, returning the lower
/// point index and the fractional position inside the cell.
fn axis_cell(v: f64, min: f64, max: f64, points: usize) -> (usize, f64) {
    let t = ((v - min) / (max - min)).clamp(0.0, 1.0) * (points - 1) as f64;
    let i = (t.floor() as usize).min(points - 2);
    (i, t - i as f64)
}

/// Height lookup over an optional stored profile.
///
/// Constructed unloaded when no profile has been saved yet; lookups then
/// report an unloaded mesh rather than guessing.
pub struct StoredMesh {
    profile: Option<MeshProfile>,
}

impl StoredMesh {
    pub fn unloaded() -> Self {
        StoredMesh { profile: None }
    }

    pub fn new(profile: MeshProfile) -> Self {
        StoredMesh {
            profile: Some(profile),
        }
    }
}

impl HeightMesh for StoredMesh {
    fn height_at(&self, x: f64, y: f64) -> Option<f64> {
        let profile = self.profile.as_ref()?;
        Some(profile.interpolate(x, y))
    }
}
