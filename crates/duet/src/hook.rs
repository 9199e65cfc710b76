// Dual-toolhead mesh compensation hook

use crate::{
    config::Config,
    transform::{Move, MoveTransform},
};
use anyhow::Result;
use duet_core::{
    carriage::{self, DualCarriage},
    gantry::{ActuatorVector, GantryAdjuster, LiftSpeedSource},
    mesh::{self, HeightMesh},
    tilt::{self, TiltAdjustment},
};
use std::{fmt, sync::Arc};

/// Name under which the hook registers in the transform chain.
pub const TRANSFORM_NAME: &str = "idex_mesh";

/// Collaborator handles, resolved once at startup.
#[derive(Default, Clone)]
pub struct Collaborators {
    pub mesh: Option<Arc<dyn HeightMesh>>,
    pub dual_carriage: Option<Arc<dyn DualCarriage>>,
    pub gantry: Option<Arc<dyn GantryAdjuster>>,
    pub lift_speed: Option<Arc<dyn LiftSpeedSource>>,
}

/// Dual-toolhead mesh compensation with symmetric gantry tilt.
///
/// Installed as a move transform. While the carriages run linked it samples
/// the mesh under both toolheads, dispatches a gantry correction, and lifts
/// the move by the primary sample; otherwise it delegates to the wrapped
/// single-toolhead transform.
pub struct IdexMeshTransform {
    offset_x: f64,
    lift_speed: f64,
    mesh: Option<Arc<dyn HeightMesh>>,
    dual_carriage: Option<Arc<dyn DualCarriage>>,
    gantry: Arc<dyn GantryAdjuster>,
    lift_speed_source: Option<Arc<dyn LiftSpeedSource>>,
    prev: Box<dyn MoveTransform>,
}

impl IdexMeshTransform {
    /// Build the hook from validated configuration and resolved
    /// collaborators. The gantry module is required; compensation cannot
    /// run on a printer without quad-gantry leveling.
    pub fn new(
        config: &Config,
        collaborators: Collaborators,
        prev: Box<dyn MoveTransform>,
    ) -> Result<Self> {
        let Some(gantry) = collaborators.gantry else {
            anyhow::bail!("idex mesh compensation requires a quad-gantry leveling module");
        };
        Ok(IdexMeshTransform {
            offset_x: config.idex.offset_x,
            lift_speed: config.gantry.lift_speed,
            mesh: collaborators.mesh,
            dual_carriage: collaborators.dual_carriage,
            gantry,
            lift_speed_source: collaborators.lift_speed,
            prev,
        })
    }

    /// Issue a correction to the gantry. The adjuster contract orders the
    /// correction ahead of motion queued after this call returns.
    fn dispatch(&self, tilt: TiltAdjustment) {
        let vector = ActuatorVector::from_tilt(tilt);
        let speed = self
            .lift_speed_source
            .as_ref()
            .map(|probe| probe.lift_speed())
            .unwrap_or(self.lift_speed);
        tracing::debug!(
            "Dispatching gantry correction: left={:.4} right={:.4} speed={:.1}",
            tilt.left,
            tilt.right,
            speed
        );
        self.gantry.adjust(vector, speed);
    }

    /// Manual check of the compensation math for two explicit toolhead
    /// positions. Samples strictly and performs no actuation.
    pub fn diagnose(&self, t0: (f64, f64), t1: (f64, f64)) -> Result<DiagReport> {
        if self.dual_carriage.is_none() {
            anyhow::bail!("a dual-carriage module is required for this check");
        }
        let z0 = mesh::sample_strict(self.mesh.as_deref(), t0.0, t0.1)?;
        let z1 = mesh::sample_strict(self.mesh.as_deref(), t1.0, t1.1)?;
        let tilt = tilt::solve_tilt((t0.0, z0), (t1.0, z1));
        Ok(DiagReport { t0, t1, z0, z1, tilt })
    }
}

impl MoveTransform for IdexMeshTransform {
    fn transform(&self, mv: Move) -> Move {
        let mode = carriage::resolve_mode(self.dual_carriage.as_deref());
        if !mode.is_linked() {
            return self.prev.transform(mv);
        }

        let primary = (mv.x(), mv.y());
        let secondary = carriage::secondary_position(primary, self.offset_x, mode);

        let z0 = mesh::sample_or_flat(self.mesh.as_deref(), primary.0, primary.1);
        let z1 = mesh::sample_or_flat(self.mesh.as_deref(), secondary.0, secondary.1);

        let tilt = tilt::solve_tilt((primary.0, z0), (secondary.0, z1));
        self.dispatch(tilt);

        // The primary sample is applied here directly; the wrapped transform
        // stays bypassed while the carriages are linked.
        let z = mv.z() + z0;
        mv.with_z(z)
    }
}

/// Result of a manual compensation check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagReport {
    pub t0: (f64, f64),
    pub t1: (f64, f64),
    pub z0: f64,
    pub z1: f64,
    pub tilt: TiltAdjustment,
}

impl fmt::Display for DiagReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Toolhead 0: X={:.4} Y={:.4} mesh Z={:.4}",
            self.t0.0, self.t0.1, self.z0
        )?;
        writeln!(
            f,
            "Toolhead 1: X={:.4} Y={:.4} mesh Z={:.4}",
            self.t1.0, self.t1.1, self.z1
        )?;
        write!(
            f,
            "Gantry adjustment: left={:.4} right={:.4}",
            self.tilt.left, self.tilt.right
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Identity;
    use duet_core::carriage::CarriageMode;
    use std::sync::Mutex;

    struct StaticCarriage(CarriageMode);

    impl DualCarriage for StaticCarriage {
        fn secondary_mode(&self) -> CarriageMode {
            self.0
        }
    }

    /// Step mesh: 1.0 under the left half of the bed, 1.5 under the right.
    struct ScenarioMesh;

    impl HeightMesh for ScenarioMesh {
        fn height_at(&self, x: f64, _y: f64) -> Option<f64> {
            Some(if x < 35.0 { 1.0 } else { 1.5 })
        }
    }

    #[derive(Default)]
    struct RecordingGantry {
        calls: Mutex<Vec<([f64; 4], f64)>>,
    }

    impl GantryAdjuster for RecordingGantry {
        fn adjust(&self, vector: ActuatorVector, speed: f64) {
            self.calls.lock().unwrap().push((vector.as_array(), speed));
        }
    }

    struct PriorTransform(f64);

    impl MoveTransform for PriorTransform {
        fn transform(&self, mv: Move) -> Move {
            let z = mv.z() + self.0;
            mv.with_z(z)
        }
    }

    fn test_config() -> Config {
        Config::from_toml("[idex]\noffset_x = 50.0\n").unwrap()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    fn hook_with(
        mesh: Option<Arc<dyn HeightMesh>>,
        mode: Option<CarriageMode>,
        gantry: Arc<RecordingGantry>,
    ) -> IdexMeshTransform {
        let collaborators = Collaborators {
            mesh,
            dual_carriage: mode.map(|m| Arc::new(StaticCarriage(m)) as Arc<dyn DualCarriage>),
            gantry: Some(gantry),
            lift_speed: None,
        };
        IdexMeshTransform::new(&test_config(), collaborators, Box::new(PriorTransform(0.5)))
            .unwrap()
    }

    #[test]
    fn missing_gantry_is_fatal() {
        let result = IdexMeshTransform::new(
            &test_config(),
            Collaborators::default(),
            Box::new(Identity),
        );
        assert!(result.is_err());
    }

    #[test]
    fn passthrough_without_dual_carriage() {
        let gantry = Arc::new(RecordingGantry::default());
        let hook = hook_with(Some(Arc::new(ScenarioMesh)), None, gantry.clone());

        let mv = Move::new(vec![10.0, 10.0, 0.2, 3.0], 120.0);
        let expected = PriorTransform(0.5).transform(mv.clone());
        assert_eq!(hook.transform(mv), expected);
        assert!(gantry.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn passthrough_in_independent_mode() {
        let gantry = Arc::new(RecordingGantry::default());
        let hook = hook_with(
            Some(Arc::new(ScenarioMesh)),
            Some(CarriageMode::Independent),
            gantry.clone(),
        );

        let mv = Move::new(vec![10.0, 10.0, 0.2], 120.0);
        let expected = PriorTransform(0.5).transform(mv.clone());
        assert_eq!(hook.transform(mv), expected);
        assert!(gantry.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn copy_mode_lifts_move_and_dispatches_correction() {
        let gantry = Arc::new(RecordingGantry::default());
        let hook = hook_with(
            Some(Arc::new(ScenarioMesh)),
            Some(CarriageMode::Copy),
            gantry.clone(),
        );

        let out = hook.transform(Move::new(vec![10.0, 10.0, 0.25, 8.0], 120.0));

        // Primary sample applied directly; everything else untouched.
        assert_close(out.z(), 1.25);
        assert_eq!(out.x(), 10.0);
        assert_eq!(out.pos[3], 8.0);
        assert_eq!(out.speed, 120.0);

        let calls = gantry.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (vector, speed) = calls[0];
        assert_close(vector[0], -0.25);
        assert_close(vector[1], 0.25);
        assert_close(vector[2], 0.25);
        assert_close(vector[3], -0.25);
        assert_eq!(speed, 5.0);
    }

    #[test]
    fn mirror_mode_samples_to_the_left() {
        let gantry = Arc::new(RecordingGantry::default());
        let hook = hook_with(
            Some(Arc::new(ScenarioMesh)),
            Some(CarriageMode::Mirror),
            gantry.clone(),
        );

        // Primary at X=60 (z=1.5), secondary mirrored to X=10 (z=1.0).
        let out = hook.transform(Move::new(vec![60.0, 10.0, 0.0], 90.0));
        assert_close(out.z(), 1.5);

        let calls = gantry.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (vector, _) = calls[0];
        assert_close(vector[0], -0.25);
        assert_close(vector[1], 0.25);
    }

    #[test]
    fn linked_mode_without_mesh_degrades_to_flat() {
        let gantry = Arc::new(RecordingGantry::default());
        let hook = hook_with(None, Some(CarriageMode::Copy), gantry.clone());

        let mv = Move::new(vec![10.0, 10.0, 0.25], 120.0);
        let out = hook.transform(mv.clone());

        // Flat substitute: no height change, a zero correction still goes out.
        assert_eq!(out, mv);
        let calls = gantry.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, [0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn probe_helper_overrides_lift_speed() {
        struct Probe(f64);
        impl LiftSpeedSource for Probe {
            fn lift_speed(&self) -> f64 {
                self.0
            }
        }

        let gantry = Arc::new(RecordingGantry::default());
        let collaborators = Collaborators {
            mesh: Some(Arc::new(ScenarioMesh)),
            dual_carriage: Some(Arc::new(StaticCarriage(CarriageMode::Copy))),
            gantry: Some(gantry.clone()),
            lift_speed: Some(Arc::new(Probe(12.5))),
        };
        let hook =
            IdexMeshTransform::new(&test_config(), collaborators, Box::new(Identity)).unwrap();

        hook.transform(Move::new(vec![10.0, 10.0, 0.0], 60.0));
        assert_eq!(gantry.calls.lock().unwrap()[0].1, 12.5);
    }

    #[test]
    fn diagnose_reports_without_actuation() {
        let gantry = Arc::new(RecordingGantry::default());
        let hook = hook_with(
            Some(Arc::new(ScenarioMesh)),
            Some(CarriageMode::Independent),
            gantry.clone(),
        );

        let report = hook.diagnose((10.0, 10.0), (60.0, 10.0)).unwrap();
        assert_eq!(report.z0, 1.0);
        assert_eq!(report.z1, 1.5);
        assert_close(report.tilt.left, -0.25);
        assert_close(report.tilt.right, 0.25);
        assert!(gantry.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn diagnose_renders_fixed_precision() {
        let gantry = Arc::new(RecordingGantry::default());
        let hook = hook_with(
            Some(Arc::new(ScenarioMesh)),
            Some(CarriageMode::Independent),
            gantry,
        );

        let report = hook.diagnose((10.0, 10.0), (60.0, 10.0)).unwrap();
        insta::assert_snapshot!(report.to_string(), @r"
        Toolhead 0: X=10.0000 Y=10.0000 mesh Z=1.0000
        Toolhead 1: X=60.0000 Y=10.0000 mesh Z=1.5000
        Gantry adjustment: left=-0.2500 right=0.2500
        ");
    }

    #[test]
    fn diagnose_requires_a_loaded_mesh() {
        struct UnloadedMesh;
        impl HeightMesh for UnloadedMesh {
            fn height_at(&self, _x: f64, _y: f64) -> Option<f64> {
                None
            }
        }

        let gantry = Arc::new(RecordingGantry::default());
        let hook = hook_with(
            Some(Arc::new(UnloadedMesh)),
            Some(CarriageMode::Independent),
            gantry.clone(),
        );

        let err = hook.diagnose((10.0, 10.0), (60.0, 10.0)).unwrap_err();
        assert!(err.to_string().contains("no height mesh loaded"));
        assert!(gantry.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn diagnose_requires_collaborators() {
        let gantry = Arc::new(RecordingGantry::default());

        // No mesh module at all.
        let hook = hook_with(None, Some(CarriageMode::Independent), gantry.clone());
        assert!(hook.diagnose((0.0, 0.0), (1.0, 1.0)).is_err());

        // No dual-carriage module.
        let hook = hook_with(Some(Arc::new(ScenarioMesh)), None, gantry);
        assert!(hook.diagnose((0.0, 0.0), (1.0, 1.0)).is_err());
    }
}
