//! Output for traces, conversions, and scenario runs

use anyhow::{Context, Result};
use clap::ValueEnum;
use coil_animation::{BouncyConversion, Spring, SpringConfig};
use serde::Serialize;

/// How results are printed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Position and velocity after one tick
#[derive(Clone, Debug, Serialize)]
pub struct Sample {
    pub frame: usize,
    pub time_ms: f64,
    pub position: f64,
    pub velocity: f64,
}

/// Motion of one spring from its first tick until rest
#[derive(Debug, Serialize)]
pub struct SpringTrace {
    pub config: SpringConfig,
    pub origami_tension: f64,
    pub origami_friction: f64,
    pub start_value: f64,
    pub end_value: f64,
    pub settled: bool,
    pub samples: Vec<Sample>,
}

impl SpringTrace {
    pub fn print(&self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Json => println!("{}", to_json(self)?),
            OutputFormat::Table => {
                println!(
                    "tension {:.3} friction {:.3} (origami {:.3} / {:.3})",
                    self.config.tension,
                    self.config.friction,
                    self.origami_tension,
                    self.origami_friction
                );
                println!("{:>6} {:>12} {:>14} {:>14}", "frame", "time_ms", "position", "velocity");
                for sample in &self.samples {
                    println!(
                        "{:>6} {:>12.3} {:>14.9} {:>14.9}",
                        sample.frame, sample.time_ms, sample.position, sample.velocity
                    );
                }
                let state = if self.settled { "settled" } else { "still moving" };
                println!("{} after {} frames", state, self.samples.len());
            }
        }
        Ok(())
    }
}

/// Both parameterizations of a spring configuration
#[derive(Debug, Serialize)]
pub struct ConversionReport {
    pub tension: f64,
    pub friction: f64,
    pub origami_tension: f64,
    pub origami_friction: f64,
    pub critical_friction: f64,
    pub underdamped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bouncy: Option<BouncyReport>,
}

/// Intermediate Origami values of a bounciness/speed conversion
#[derive(Debug, Serialize)]
pub struct BouncyReport {
    pub bounciness: f64,
    pub speed: f64,
    pub bouncy_tension: f64,
    pub bouncy_friction: f64,
}

impl From<BouncyConversion> for BouncyReport {
    fn from(conversion: BouncyConversion) -> Self {
        Self {
            bounciness: conversion.bounciness,
            speed: conversion.speed,
            bouncy_tension: conversion.bouncy_tension,
            bouncy_friction: conversion.bouncy_friction,
        }
    }
}

impl ConversionReport {
    pub fn new(config: SpringConfig, bouncy: Option<BouncyConversion>) -> Self {
        Self {
            tension: config.tension,
            friction: config.friction,
            origami_tension: config.origami_tension(),
            origami_friction: config.origami_friction(),
            critical_friction: config.critical_friction(),
            underdamped: config.is_underdamped(),
            bouncy: bouncy.map(BouncyReport::from),
        }
    }

    pub fn print(&self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Json => println!("{}", to_json(self)?),
            OutputFormat::Table => {
                if let Some(bouncy) = &self.bouncy {
                    println!(
                        "bounciness {} speed {} -> origami tension {:.6} friction {:.6}",
                        bouncy.bounciness,
                        bouncy.speed,
                        bouncy.bouncy_tension,
                        bouncy.bouncy_friction
                    );
                }
                println!("tension          {:.6}", self.tension);
                println!("friction         {:.6}", self.friction);
                println!("origami tension  {:.6}", self.origami_tension);
                println!("origami friction {:.6}", self.origami_friction);
                println!(
                    "critical friction {:.6} ({})",
                    self.critical_friction,
                    if self.underdamped {
                        "oscillates"
                    } else {
                        "no oscillation"
                    }
                );
            }
        }
        Ok(())
    }
}

/// State of a named spring at one point of a scenario
#[derive(Clone, Debug, Serialize)]
pub struct SpringSnapshot {
    pub name: String,
    pub position: f64,
    pub velocity: f64,
    pub end_value: f64,
    pub at_rest: bool,
}

impl SpringSnapshot {
    pub fn capture(name: &str, spring: &Spring) -> Self {
        Self {
            name: name.to_string(),
            position: spring.current_value(),
            velocity: spring.velocity(),
            end_value: spring.end_value(),
            at_rest: spring.is_at_rest(),
        }
    }
}

/// Every spring after one tick of a scenario
#[derive(Debug, Serialize)]
pub struct Frame {
    pub time_ms: f64,
    pub springs: Vec<SpringSnapshot>,
}

/// Result of running a scenario
#[derive(Debug, Default, Serialize)]
pub struct ScenarioReport {
    pub idle: bool,
    pub frames: Vec<Frame>,
    pub final_state: Vec<SpringSnapshot>,
}

impl ScenarioReport {
    pub fn print(&self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Json => println!("{}", to_json(self)?),
            OutputFormat::Table => {
                for frame in &self.frames {
                    let values: Vec<String> = frame
                        .springs
                        .iter()
                        .map(|s| format!("{}={:.6}", s.name, s.position))
                        .collect();
                    println!("{:>12.3}  {}", frame.time_ms, values.join("  "));
                }
                println!(
                    "{} frames, {}",
                    self.frames.len(),
                    if self.idle { "idle" } else { "still moving" }
                );
            }
        }
        Ok(())
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize report")
}
