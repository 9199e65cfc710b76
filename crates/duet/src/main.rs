use anyhow::Result;
use clap::{Parser, Subcommand};

mod cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Check(args) => args.run(),
        Command::Simulate(args) => args.run(),
    }
}

#[derive(Parser)]
#[command(name = "duet", about = "IDEX mesh and gantry-tilt compensation tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the compensation math for two explicit toolhead positions.
    Check(cli::check::CheckArgs),
    /// Feed a move list through the full compensation pipeline.
    Simulate(cli::simulate::SimulateArgs),
}
