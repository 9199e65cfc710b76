use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use duet::{
    config::Config,
    harness::{LoggingGantry, StaticCarriage},
    hook::{self, Collaborators, IdexMeshTransform},
    profile::{MeshProfile, StoredMesh},
    transform::{MotionPipeline, Move},
};
use duet_core::carriage::CarriageMode;
use std::{fs, path::PathBuf, sync::Arc};

#[derive(Args)]
pub struct SimulateArgs {
    /// Path to the configuration file (TOML or JSON).
    #[arg(long)]
    pub config: PathBuf,

    /// Path to a saved mesh profile (JSON).
    #[arg(long)]
    pub mesh: Option<PathBuf>,

    /// Dual-carriage mode pinned for the whole run.
    #[arg(long, value_enum, default_value = "independent")]
    pub mode: ModeArg,

    /// Moves to feed through the pipeline, one JSON move per line.
    pub moves: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Independent,
    Copy,
    Mirror,
}

impl From<ModeArg> for CarriageMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Independent => CarriageMode::Independent,
            ModeArg::Copy => CarriageMode::Copy,
            ModeArg::Mirror => CarriageMode::Mirror,
        }
    }
}

impl SimulateArgs {
    pub fn run(&self) -> Result<()> {
        // Initialize tracing
        tracing_subscriber::fmt::init();

        let config = Config::from_file(&self.config)?;
        config.validate()?;

        let mesh = match &self.mesh {
            Some(path) => StoredMesh::new(MeshProfile::from_file(path)?),
            None => StoredMesh::unloaded(),
        };

        let collaborators = Collaborators {
            mesh: Some(Arc::new(mesh)),
            dual_carriage: Some(Arc::new(StaticCarriage(self.mode.into()))),
            gantry: Some(Arc::new(LoggingGantry)),
            lift_speed: None,
        };

        let mut pipeline = MotionPipeline::new();
        pipeline.install(hook::TRANSFORM_NAME, |prev| {
            let hook = IdexMeshTransform::new(&config, collaborators, prev)?;
            Ok(Box::new(hook))
        })?;

        let content = fs::read_to_string(&self.moves)
            .with_context(|| format!("failed to read moves file {}", self.moves.display()))?;

        let mut count = 0usize;
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mv: Move = serde_json::from_str(line)
                .with_context(|| format!("invalid move on line {}", index + 1))?;
            anyhow::ensure!(
                mv.pos.len() >= 3,
                "move on line {} needs at least X, Y and Z",
                index + 1
            );
            let out = pipeline.transform(mv);
            println!("{}", serde_json::to_string(&out)?);
            count += 1;
        }

        tracing::info!("Transformed {} moves in {:?} mode", count, self.mode);
        Ok(())
    }
}
