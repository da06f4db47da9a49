//! Scripted spring scenarios
//!
//! A scenario names a set of springs and a list of steps applied to them
//! with a stepping looper, so every frame is reproducible:
//!
//! ```toml
//! timestep_ms = 16.667
//!
//! [[springs]]
//! name = "x"
//! config = { origami_tension = 40.0, origami_friction = 7.0 }
//!
//! [[steps]]
//! type = "set_end_value"
//! spring = "x"
//! value = 100.0
//!
//! [[steps]]
//! type = "run"
//! ```

use crate::report::{Frame, ScenarioReport, SpringSnapshot};
use anyhow::{Context, Result};
use coil_animation::{Spring, SpringPreset, SpringSystem, SteppingLooper, SystemSettings};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// Frame cap for running springs to rest
pub const DEFAULT_MAX_FRAMES: usize = 10_000;

/// A spring declared by a scenario
#[derive(Debug, Deserialize)]
pub struct SpringSpec {
    pub name: String,
    /// Falls back to the settings' default spring
    #[serde(default)]
    pub config: Option<SpringPreset>,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub overshoot_clamping: Option<bool>,
}

/// One scripted action
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    SetEndValue { spring: String, value: f64 },
    SetVelocity { spring: String, value: f64 },
    SetCurrentValue { spring: String, value: f64 },
    /// Advance a fixed number of frames
    Step {
        #[serde(default = "default_frames")]
        frames: usize,
    },
    /// Advance until every spring is at rest
    Run {
        #[serde(default = "default_max_frames")]
        max_frames: usize,
    },
}

fn default_frames() -> usize {
    1
}

fn default_max_frames() -> usize {
    DEFAULT_MAX_FRAMES
}

/// A scenario file (TOML or JSON)
#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// Frame length; defaults to the settings' simulation timestep
    #[serde(default)]
    pub timestep_ms: Option<f64>,
    #[serde(default)]
    pub springs: Vec<SpringSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Load a scenario, choosing the format from the file extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let is_json = path.extension().is_some_and(|extension| extension == "json");
        let scenario = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        };
        scenario.with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Play every step and record the springs after each frame
    pub fn run(&self, settings: SystemSettings) -> Result<ScenarioReport> {
        let timestep = self.timestep_ms.unwrap_or(settings.simulation_timestep_ms);
        if !timestep.is_finite() || timestep <= 0.0 {
            anyhow::bail!("timestep_ms must be positive, got {}", timestep);
        }

        let looper = Rc::new(SteppingLooper::new());
        let system = SpringSystem::with_settings(looper.clone(), settings);
        let springs = self.create_springs(&system)?;

        let mut report = ScenarioReport::default();
        let tick = |report: &mut ScenarioReport| {
            looper.step(timestep);
            report.frames.push(Frame {
                time_ms: looper.time(),
                springs: snapshot(&springs),
            });
        };

        for (index, step) in self.steps.iter().enumerate() {
            match step {
                Step::SetEndValue { spring, value } => {
                    find(&springs, spring, index)?.set_end_value(*value);
                }
                Step::SetVelocity { spring, value } => {
                    find(&springs, spring, index)?.set_velocity(*value);
                }
                Step::SetCurrentValue { spring, value } => {
                    find(&springs, spring, index)?.set_current_value(*value);
                }
                Step::Step { frames } => {
                    for _ in 0..*frames {
                        tick(&mut report);
                    }
                }
                Step::Run { max_frames } => {
                    let mut frames = 0;
                    while !system.is_idle() && frames < *max_frames {
                        tick(&mut report);
                        frames += 1;
                    }
                    if !system.is_idle() {
                        tracing::warn!(
                            "step {}: springs still moving after {} frames",
                            index,
                            frames
                        );
                    }
                }
            }
        }

        report.idle = system.is_idle();
        report.final_state = snapshot(&springs);
        system.destroy();
        Ok(report)
    }

    fn create_springs(&self, system: &SpringSystem) -> Result<Vec<(String, Spring)>> {
        let mut springs: Vec<(String, Spring)> = Vec::with_capacity(self.springs.len());
        for spec in &self.springs {
            if springs.iter().any(|(name, _)| *name == spec.name) {
                anyhow::bail!("Duplicate spring name '{}'", spec.name);
            }

            let spring = match &spec.config {
                Some(preset) => {
                    let config = preset
                        .to_config()
                        .with_context(|| format!("Invalid config for spring '{}'", spec.name))?;
                    system.create_spring(config)
                }
                None => system.create_default_spring(),
            };
            if let Some(clamping) = spec.overshoot_clamping {
                spring.set_overshoot_clamping(clamping);
            }
            if spec.value != 0.0 {
                spring.set_current_value(spec.value);
            }
            springs.push((spec.name.clone(), spring));
        }
        Ok(springs)
    }
}

fn find<'a>(springs: &'a [(String, Spring)], name: &str, step: usize) -> Result<&'a Spring> {
    springs
        .iter()
        .find(|(spring_name, _)| spring_name == name)
        .map(|(_, spring)| spring)
        .with_context(|| format!("step {}: unknown spring '{}'", step, name))
}

fn snapshot(springs: &[(String, Spring)]) -> Vec<SpringSnapshot> {
    springs
        .iter()
        .map(|(name, spring)| SpringSnapshot::capture(name, spring))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOLLOW: &str = r#"
[[springs]]
name = "leader"
config = { origami_tension = 40.0, origami_friction = 7.0 }

[[springs]]
name = "clamped"
config = { bounciness = 5.0, speed = 10.0 }
overshoot_clamping = true
value = 10.0

[[steps]]
type = "set_end_value"
spring = "leader"
value = 1.0

[[steps]]
type = "step"
frames = 3

[[steps]]
type = "set_end_value"
spring = "clamped"
value = 0.0

[[steps]]
type = "run"
"#;

    #[test]
    fn test_parse_toml_scenario() {
        let scenario = Scenario::from_toml_str(FOLLOW).unwrap();
        assert_eq!(scenario.springs.len(), 2);
        assert_eq!(scenario.steps.len(), 4);
        assert!(matches!(scenario.steps[1], Step::Step { frames: 3 }));
        assert!(matches!(
            scenario.steps[3],
            Step::Run {
                max_frames: DEFAULT_MAX_FRAMES
            }
        ));
    }

    #[test]
    fn test_run_to_rest() {
        let scenario = Scenario::from_toml_str(FOLLOW).unwrap();
        let report = scenario.run(SystemSettings::default()).unwrap();

        assert!(report.idle);
        assert!(report.frames.len() > 3);
        assert_eq!(report.frames[0].springs[1].position, 10.0);

        let leader = &report.final_state[0];
        let clamped = &report.final_state[1];
        assert_eq!(leader.position, 1.0);
        assert_eq!(clamped.position, 0.0);
        assert!(leader.at_rest && clamped.at_rest);
    }

    #[test]
    fn test_json_scenario() {
        let scenario = Scenario::from_json_str(
            r#"{
                "timestep_ms": 10.0,
                "springs": [{ "name": "a" }],
                "steps": [
                    { "type": "set_velocity", "spring": "a", "value": 50.0 },
                    { "type": "step" }
                ]
            }"#,
        )
        .unwrap();
        let report = scenario.run(SystemSettings::default()).unwrap();
        assert_eq!(report.frames.len(), 1);
        assert_eq!(report.frames[0].time_ms, 10.0);
        assert!(report.final_state[0].position > 0.0);
        assert!(!report.idle);
    }

    #[test]
    fn test_unknown_spring_is_an_error() {
        let scenario = Scenario::from_toml_str(
            "[[steps]]\ntype = \"set_end_value\"\nspring = \"missing\"\nvalue = 1.0\n",
        )
        .unwrap();
        let err = scenario.run(SystemSettings::default()).unwrap_err();
        assert!(err.to_string().contains("unknown spring 'missing'"));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let scenario = Scenario::from_toml_str(
            "[[springs]]\nname = \"a\"\n\n[[springs]]\nname = \"a\"\n",
        )
        .unwrap();
        assert!(scenario.run(SystemSettings::default()).is_err());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let scenario = Scenario::from_toml_str(
            "[[springs]]\nname = \"a\"\nconfig = { tension = -1.0, friction = 1.0 }\n",
        )
        .unwrap();
        assert!(scenario.run(SystemSettings::default()).is_err());
    }
}
