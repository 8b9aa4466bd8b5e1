//! AEROSYNC command line.
//!
//! `aerosync run` starts a simulation; `aerosync physics` is the child side
//! of a two-process run and is not meant to be invoked by hand.

use std::path::PathBuf;

use aerosync::launcher::{self, RunSummary};
use aerosync::{FrameSink, RenderFrame, SimulationConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "aerosync", about = "Flight simulator physics/render core", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation
    Run {
        /// Simulation config file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Run physics on a thread instead of a child process
        #[arg(long)]
        in_process: bool,

        /// Channel file for the two-process run
        #[arg(long)]
        channel: Option<PathBuf>,
    },

    /// Physics side of a two-process run
    #[command(hide = true)]
    Physics {
        /// Simulation config file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Channel file created by the render side
        #[arg(long)]
        channel: PathBuf,
    },
}

/// Prints the overlay values every `every` frames.
struct ConsoleSink {
    every: u64,
    frames: u64,
}

impl ConsoleSink {
    fn new(target_framerate: u32) -> Self {
        Self {
            every: u64::from(target_framerate.max(1)),
            frames: 0,
        }
    }
}

impl FrameSink for ConsoleSink {
    fn present(&mut self, frame: &RenderFrame) {
        self.frames += 1;
        if self.frames % self.every != 1 {
            return;
        }
        let data = &frame.flight_data;
        if frame.physics_error {
            println!("t={:8.2}  PHYSICS ERROR", data.time);
            return;
        }
        if !frame.data_overlay {
            return;
        }
        println!(
            "t={:8.2}  alt={:8.1} m  V={:6.1} m/s  hdg={:6.1}  bank={:6.1}  elev={:6.1}  \
             climb={:6.1} m/s  thr={:4.2}  view={}",
            data.time,
            data.altitude,
            data.airspeed,
            data.heading,
            data.bank,
            data.elevation,
            data.climb_rate,
            data.controls.throttle,
            frame.view_index,
        );
    }

    fn game_over(&mut self) {
        println!("GAME OVER");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, in_process, channel } => {
            let sim = SimulationConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let sink = ConsoleSink::new(sim.simulation.target_framerate);

            let summary = if in_process {
                launcher::run_in_process(&sim, sink, None).context("in-process run failed")?
            } else {
                let channel = channel
                    .or_else(|| sim.channel.path.clone())
                    .unwrap_or_else(launcher::default_channel_path);
                let summary = launcher::run_two_process(&sim, &config, &channel, sink, None)
                    .context("two-process run failed");
                if let Err(err) = std::fs::remove_file(&channel) {
                    tracing::debug!(error = %err, path = %channel.display(), "channel file not removed");
                }
                summary?
            };
            print_summary(&summary);
        }
        Commands::Physics { config, channel } => {
            let sim = SimulationConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let stats = launcher::run_physics_process(&sim, &channel).context("physics failed")?;
            tracing::info!(steps = stats.steps, published = stats.published, "physics process done");
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    if let Some(physics) = &summary.physics {
        println!(
            "physics: {} steps, {} published, {} stalled, max dt {:.4} s",
            physics.steps, physics.published, physics.stalled_steps, physics.max_dt_seen
        );
        if let Some(t) = physics.diverged_at {
            println!("physics: state diverged at t = {t:.3}");
        }
    }
    if let Some(render) = &summary.render {
        println!(
            "render: {} frames, {} waiting, {} torn{}",
            render.frames_rendered,
            render.frames_waiting,
            render.torn_frames,
            if render.crashed { ", ended in ground contact" } else { "" }
        );
    }
}
