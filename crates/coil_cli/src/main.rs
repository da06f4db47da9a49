//! Coil CLI - spring animations from the terminal
//!
//! - `coil trace`: run one spring to rest and print every frame
//! - `coil convert`: translate between Origami, bounciness/speed and raw values
//! - `coil play`: animate a spring in real time
//! - `coil scenario`: replay a scripted scenario and report each frame

mod config;
mod report;
mod scenario;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use coil_animation::{
    AnimationLooper, BouncyConversion, FrameSource, Spring, SpringConfig, SpringListener,
    SpringPreset, SpringSystem, SteppingLooper, SystemSettings,
};
use report::{ConversionReport, OutputFormat, Sample, SpringTrace};
use scenario::{Scenario, DEFAULT_MAX_FRAMES};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coil")]
#[command(about = "Damped spring animations from the terminal", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to ./coil.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a spring to rest and print its trajectory
    Trace {
        #[command(flatten)]
        spring: SpringArgs,

        #[command(flatten)]
        motion: MotionArgs,

        /// Virtual frame length in milliseconds
        #[arg(long)]
        timestep: Option<f64>,

        /// Give up after this many frames
        #[arg(long, default_value_t = DEFAULT_MAX_FRAMES)]
        max_frames: usize,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Print a spring configuration in every parameterization
    Convert {
        #[command(flatten)]
        spring: SpringArgs,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Animate a spring in real time
    Play {
        #[command(flatten)]
        spring: SpringArgs,

        #[command(flatten)]
        motion: MotionArgs,

        /// Frames per second
        #[arg(long, default_value = "60")]
        fps: u32,

        /// Give up after this many frames
        #[arg(long, default_value_t = DEFAULT_MAX_FRAMES)]
        max_frames: usize,
    },

    /// Replay a TOML or JSON scenario file
    Scenario {
        /// Scenario file
        path: PathBuf,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Print the effective settings
    Settings,
}

/// Spring parameters, in any one parameterization
#[derive(Args, Debug, Default)]
struct SpringArgs {
    /// Raw tension
    #[arg(long, requires = "friction")]
    tension: Option<f64>,

    /// Raw friction
    #[arg(long, requires = "tension")]
    friction: Option<f64>,

    /// Origami tension
    #[arg(long, requires = "origami_friction", conflicts_with_all = ["tension", "bounciness"])]
    origami_tension: Option<f64>,

    /// Origami friction
    #[arg(long, requires = "origami_tension")]
    origami_friction: Option<f64>,

    /// Bounciness (Origami PopAnimation)
    #[arg(long, requires = "speed", conflicts_with_all = ["tension", "origami_tension"])]
    bounciness: Option<f64>,

    /// Speed (Origami PopAnimation)
    #[arg(long, requires = "bounciness")]
    speed: Option<f64>,
}

impl SpringArgs {
    fn preset(&self) -> Option<SpringPreset> {
        if let (Some(tension), Some(friction)) = (self.tension, self.friction) {
            return Some(SpringPreset::Raw { tension, friction });
        }
        if let (Some(origami_tension), Some(origami_friction)) =
            (self.origami_tension, self.origami_friction)
        {
            return Some(SpringPreset::Origami {
                origami_tension,
                origami_friction,
            });
        }
        if let (Some(bounciness), Some(speed)) = (self.bounciness, self.speed) {
            return Some(SpringPreset::Bouncy { bounciness, speed });
        }
        None
    }

    /// Resolve to a spring configuration, falling back to the settings
    fn resolve(&self, settings: &SystemSettings) -> Result<SpringConfig> {
        let preset = self.preset().unwrap_or(settings.default_spring);
        preset.to_config().context("Invalid spring parameters")
    }
}

/// Where the spring starts and where it goes
#[derive(Args, Debug)]
struct MotionArgs {
    /// Starting value
    #[arg(long, default_value = "0")]
    from: f64,

    /// End value
    #[arg(long, default_value = "1")]
    to: f64,

    /// Initial velocity
    #[arg(long)]
    velocity: Option<f64>,

    /// Stop at the end value instead of oscillating around it
    #[arg(long)]
    clamp: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = config::load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Trace {
            spring,
            motion,
            timestep,
            max_frames,
            format,
        } => cmd_trace(&settings, &spring, &motion, timestep, max_frames, format),
        Commands::Convert { spring, format } => cmd_convert(&settings, &spring, format),
        Commands::Play {
            spring,
            motion,
            fps,
            max_frames,
        } => cmd_play(&settings, &spring, &motion, fps, max_frames),
        Commands::Scenario { path, format } => cmd_scenario(settings, &path, format),
        Commands::Settings => {
            print!("{}", config::to_toml(&settings)?);
            Ok(())
        }
    }
}

fn cmd_trace(
    settings: &SystemSettings,
    args: &SpringArgs,
    motion: &MotionArgs,
    timestep: Option<f64>,
    max_frames: usize,
    format: OutputFormat,
) -> Result<()> {
    let config = args.resolve(settings)?;
    let timestep = timestep.unwrap_or(settings.simulation_timestep_ms);
    if !timestep.is_finite() || timestep <= 0.0 {
        anyhow::bail!("--timestep must be positive, got {}", timestep);
    }

    info!(
        "tracing spring {:.3}/{:.3} from {} to {}",
        config.tension, config.friction, motion.from, motion.to
    );
    trace_spring(settings, config, motion, timestep, max_frames).print(format)
}

/// Step a spring until it rests or `max_frames` ticks have passed
fn trace_spring(
    settings: &SystemSettings,
    config: SpringConfig,
    motion: &MotionArgs,
    timestep: f64,
    max_frames: usize,
) -> SpringTrace {
    let looper = Rc::new(SteppingLooper::new());
    let system = SpringSystem::with_settings(looper.clone(), settings.clone());
    let spring = system.create_spring(config);
    let start_value = stage(&spring, motion);

    let samples = Rc::new(RefCell::new(Vec::new()));
    let sink = samples.clone();
    let clock = looper.clone();
    spring.add_listener(SpringListener::new().on_update(move |s| {
        let mut samples = sink.borrow_mut();
        let frame = samples.len();
        samples.push(Sample {
            frame,
            time_ms: clock.time(),
            position: s.current_value(),
            velocity: s.velocity(),
        });
    }));

    let mut frames = 0;
    while !system.is_idle() && frames < max_frames {
        looper.step(timestep);
        frames += 1;
    }
    let settled = system.is_idle();
    if !settled {
        warn!("spring still moving after {} frames", frames);
    }

    let trace = SpringTrace {
        config,
        origami_tension: config.origami_tension(),
        origami_friction: config.origami_friction(),
        start_value,
        end_value: spring.end_value(),
        settled,
        samples: samples.take(),
    };
    spring.remove_all_listeners();
    system.destroy();
    trace
}

fn cmd_convert(settings: &SystemSettings, args: &SpringArgs, format: OutputFormat) -> Result<()> {
    let config = args.resolve(settings)?;
    let bouncy = match (args.bounciness, args.speed) {
        (Some(bounciness), Some(speed)) => Some(BouncyConversion::new(bounciness, speed)),
        _ => None,
    };
    ConversionReport::new(config, bouncy).print(format)
}

/// Frame source backed by the wall clock
///
/// Frames are produced by sleeping until the next frame boundary.
struct WallClock {
    start: Instant,
    interval: Duration,
    armed: Cell<bool>,
}

impl WallClock {
    fn new(fps: u32) -> Self {
        Self {
            start: Instant::now(),
            interval: Duration::from_secs_f64(1.0 / f64::from(fps.max(1))),
            armed: Cell::new(false),
        }
    }

    /// Sleep for one frame and return the timestamp in milliseconds
    fn wait_for_frame(&self) -> f64 {
        std::thread::sleep(self.interval);
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl FrameSource for WallClock {
    fn arm(&self) {
        self.armed.set(true);
        tracing::debug!("wall clock armed");
    }

    fn disarm(&self) {
        self.armed.set(false);
        tracing::debug!("wall clock disarmed");
    }
}

fn cmd_play(
    settings: &SystemSettings,
    args: &SpringArgs,
    motion: &MotionArgs,
    fps: u32,
    max_frames: usize,
) -> Result<()> {
    let config = args.resolve(settings)?;
    let looper = Rc::new(AnimationLooper::new(WallClock::new(fps)));
    let system = SpringSystem::with_settings(looper.clone(), settings.clone());
    let spring = system.create_spring(config);

    let low = motion.from.min(motion.to);
    let span = (motion.to - motion.from).abs().max(f64::EPSILON);
    let start = Instant::now();
    spring.add_listener(
        SpringListener::new()
            .on_update(move |s| {
                // Leave headroom for overshoot on either side
                let column = ((s.current_value() - low) / span * 40.0 + 10.0).round();
                let column = column.clamp(0.0, 60.0) as usize;
                println!(
                    "{:>8.1} ms {:>12.4} |{}*",
                    start.elapsed().as_secs_f64() * 1000.0,
                    s.current_value(),
                    " ".repeat(column)
                );
            })
            .on_rest(|s| info!("at rest at {}", s.current_value())),
    );

    stage(&spring, motion);
    drive_frames(&looper, max_frames, WallClock::wait_for_frame);

    system.destroy();
    Ok(())
}

/// Feed frames to the looper until its source disarms or `max_frames` pass
///
/// Returns whether the system came to rest.
fn drive_frames<S: FrameSource>(
    looper: &AnimationLooper<S>,
    max_frames: usize,
    mut next_frame: impl FnMut(&S) -> f64,
) -> bool {
    let mut frames = 0;
    while looper.is_armed() {
        if frames == max_frames {
            warn!("spring still moving after {} frames", frames);
            return false;
        }
        let timestamp = next_frame(looper.source());
        looper.on_frame(timestamp);
        frames += 1;
    }
    true
}

fn cmd_scenario(settings: SystemSettings, path: &Path, format: OutputFormat) -> Result<()> {
    let scenario = Scenario::load(path)?;
    info!(
        "running {} with {} springs and {} steps",
        path.display(),
        scenario.springs.len(),
        scenario.steps.len()
    );
    let report = scenario.run(settings)?;
    report.print(format)
}

/// Apply the starting state and target to a fresh spring
fn stage(spring: &Spring, motion: &MotionArgs) -> f64 {
    if motion.clamp {
        spring.set_overshoot_clamping(true);
    }
    spring.set_current_value(motion.from);
    if let Some(velocity) = motion.velocity {
        spring.set_velocity(velocity);
    }
    spring.set_end_value(motion.to);
    motion.from
}
