use anyhow::Result;
use clap::Args;
use duet::{
    config::Config,
    harness::{LoggingGantry, StaticCarriage},
    hook::{Collaborators, IdexMeshTransform},
    profile::{MeshProfile, StoredMesh},
    transform::Identity,
};
use duet_core::carriage::CarriageMode;
use std::{path::PathBuf, sync::Arc};

#[derive(Args)]
pub struct CheckArgs {
    /// Path to the configuration file (TOML or JSON).
    #[arg(long)]
    pub config: PathBuf,

    /// Path to a saved mesh profile (JSON).
    #[arg(long)]
    pub mesh: Option<PathBuf>,

    /// X coordinate of toolhead 0.
    pub x0: f64,

    /// Y coordinate of toolhead 0.
    pub y0: f64,

    /// X coordinate of toolhead 1.
    pub x1: f64,

    /// Y coordinate of toolhead 1.
    pub y1: f64,
}

impl CheckArgs {
    pub fn run(&self) -> Result<()> {
        let config = Config::from_file(&self.config)?;
        config.validate()?;

        let mesh = match &self.mesh {
            Some(path) => StoredMesh::new(MeshProfile::from_file(path)?),
            None => StoredMesh::unloaded(),
        };

        let collaborators = Collaborators {
            mesh: Some(Arc::new(mesh)),
            dual_carriage: Some(Arc::new(StaticCarriage(CarriageMode::Independent))),
            gantry: Some(Arc::new(LoggingGantry)),
            lift_speed: None,
        };
        let hook = IdexMeshTransform::new(&config, collaborators, Box::new(Identity))?;

        let report = hook.diagnose((self.x0, self.y0), (self.x1, self.y1))?;
        println!("{report}");
        Ok(())
    }
}
