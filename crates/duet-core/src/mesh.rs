// Bed mesh sampling contracts

use thiserror::Error;

/// Interpolated bed-height lookup provided by the mesh module.
pub trait HeightMesh {
    /// Mesh height under the given XY, or `None` when no mesh is loaded.
    fn height_at(&self, x: f64, y: f64) -> Option<f64>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("no height mesh module configured")]
    NoCollaborator,

    #[error("no height mesh loaded")]
    Unloaded,
}

/// Sample for the live move path. An absent module or unloaded mesh degrades
/// to a flat bed; motion must not halt over a missing mesh.
pub fn sample_or_flat(mesh: Option<&dyn HeightMesh>, x: f64, y: f64) -> f64 {
    mesh.and_then(|m| m.height_at(x, y)).unwrap_or(0.0)
}

/// Sample for the diagnostic path, where a silent zero would misreport the
/// bed state.
pub fn sample_strict(mesh: Option<&dyn HeightMesh>, x: f64, y: f64) -> Result<f64, SampleError> {
    match mesh {
        None => Err(SampleError::NoCollaborator),
        Some(m) => m.height_at(x, y).ok_or(SampleError::Unloaded),
    }
}
