// Move transform chain

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::mem;

/// A commanded toolhead move: target position plus feedrate.
///
/// The position carries X, Y, Z and then any trailing axes (extruders).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub pos: Vec<f64>,
    pub speed: f64,
}

impl Move {
    pub fn new(pos: Vec<f64>, speed: f64) -> Self {
        debug_assert!(pos.len() >= 3, "a move carries at least X, Y and Z");
        Move { pos, speed }
    }

    pub fn x(&self) -> f64 {
        self.pos[0]
    }

    pub fn y(&self) -> f64 {
        self.pos[1]
    }

    pub fn z(&self) -> f64 {
        self.pos[2]
    }

    /// Copy of this move with its height replaced. Trailing axes and the
    /// feedrate carry over unchanged.
    pub fn with_z(&self, z: f64) -> Self {
        let mut pos = self.pos.clone();
        pos[2] = z;
        Move {
            pos,
            speed: self.speed,
        }
    }
}

/// A node in the move transform chain.
pub trait MoveTransform {
    /// Adjust a commanded move before motion planning. Runs synchronously on
    /// the motion path; implementations must not block or yield.
    fn transform(&self, mv: Move) -> Move;
}

/// Chain terminator that passes moves through untouched.
pub struct Identity;

impl MoveTransform for Identity {
    fn transform(&self, mv: Move) -> Move {
        mv
    }
}

/// Ordered chain of move transforms, applied head-first.
///
/// Installation wraps the current head: the new node receives ownership of
/// the previous head and delegates to it for the moves it does not handle.
pub struct MotionPipeline {
    head: Box<dyn MoveTransform>,
    installed: Vec<&'static str>,
}

impl Default for MotionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionPipeline {
    pub fn new() -> Self {
        MotionPipeline {
            head: Box::new(Identity),
            installed: Vec::new(),
        }
    }

    /// Install a transform under `name`, wrapping the current head. Each
    /// name may be installed once; a second installation is a startup
    /// conflict. If `wrap` fails the chain is left at its terminator, which
    /// is acceptable only because installation errors abort startup.
    pub fn install<F>(&mut self, name: &'static str, wrap: F) -> Result<()>
    where
        F: FnOnce(Box<dyn MoveTransform>) -> Result<Box<dyn MoveTransform>>,
    {
        if self.installed.contains(&name) {
            anyhow::bail!("move transform {name} is already installed");
        }
        let prev = mem::replace(&mut self.head, Box::new(Identity));
        match wrap(prev) {
            Ok(node) => {
                self.head = node;
                self.installed.push(name);
                Ok(())
            }
            Err(err) => Err(err.context(format!("failed to install move transform {name}"))),
        }
    }

    /// Run a move through the active chain.
    pub fn transform(&self, mv: Move) -> Move {
        self.head.transform(mv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ChainedOffset {
        delta: f64,
        prev: Box<dyn MoveTransform>,
    }

    impl MoveTransform for ChainedOffset {
        fn transform(&self, mv: Move) -> Move {
            let mv = self.prev.transform(mv);
            let z = mv.z() + self.delta;
            mv.with_z(z)
        }
    }

    #[test]
    fn with_z_preserves_trailing_axes_and_speed() {
        let mv = Move::new(vec![1.0, 2.0, 3.0, 4.0, 5.0], 120.0);
        let out = mv.with_z(9.0);
        assert_eq!(out.pos, vec![1.0, 2.0, 9.0, 4.0, 5.0]);
        assert_eq!(out.speed, 120.0);
    }

    #[test]
    fn empty_pipeline_is_identity() {
        let pipeline = MotionPipeline::new();
        let mv = Move::new(vec![1.0, 2.0, 3.0], 60.0);
        assert_eq!(pipeline.transform(mv.clone()), mv);
    }

    #[test]
    fn installed_nodes_wrap_in_order() {
        let mut pipeline = MotionPipeline::new();
        pipeline
            .install("first", |prev| Ok(Box::new(ChainedOffset { delta: 1.0, prev })))
            .unwrap();
        pipeline
            .install("second", |prev| Ok(Box::new(ChainedOffset { delta: 2.0, prev })))
            .unwrap();
        let out = pipeline.transform(Move::new(vec![0.0, 0.0, 0.5], 1.0));
        assert_eq!(out.z(), 3.5);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut pipeline = MotionPipeline::new();
        pipeline.install("mesh", |prev| Ok(prev)).unwrap();
        let err = pipeline.install("mesh", |prev| Ok(prev)).unwrap_err();
        assert!(err.to_string().contains("already installed"));
    }
}
