//! Spring system settings
//!
//! Defaults a [`SpringSystem`](crate::SpringSystem) applies to the springs
//! it creates, loadable from TOML or JSON.
//!
//! ```toml
//! simulation_timestep_ms = 16.667
//! rest_speed_threshold = 0.001
//! displacement_from_rest_threshold = 0.001
//! overshoot_clamping = false
//!
//! [default_spring]
//! origami_tension = 40.0
//! origami_friction = 7.0
//! ```

use crate::config::SpringConfig;
use crate::error::{ConfigError, Result, SettingsError};
use serde::{Deserialize, Serialize};

/// Default timestep of a simulation looper, in milliseconds
pub const DEFAULT_SIMULATION_TIMESTEP_MS: f64 = 16.667;

/// Default speed below which a spring may come to rest
pub const DEFAULT_REST_SPEED_THRESHOLD: f64 = 0.001;

/// Default distance from the end value within which a spring may come to rest
pub const DEFAULT_DISPLACEMENT_FROM_REST_THRESHOLD: f64 = 0.001;

/// A spring configuration in any of the supported parameterizations
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpringPreset {
    /// Raw tension and friction
    Raw { tension: f64, friction: f64 },
    /// Origami tension and friction
    Origami {
        origami_tension: f64,
        origami_friction: f64,
    },
    /// Bounciness and speed
    Bouncy { bounciness: f64, speed: f64 },
    /// Zero tension, friction in Origami units
    Coasting { coasting_friction: f64 },
}

impl SpringPreset {
    /// Resolve to raw tension and friction, rejecting unusable values
    pub fn to_config(&self) -> std::result::Result<SpringConfig, ConfigError> {
        let config = match *self {
            SpringPreset::Raw { tension, friction } => SpringConfig::new(tension, friction),
            SpringPreset::Origami {
                origami_tension,
                origami_friction,
            } => SpringConfig::from_origami(origami_tension, origami_friction),
            SpringPreset::Bouncy { bounciness, speed } => {
                SpringConfig::from_bounciness_and_speed(bounciness, speed)
            }
            SpringPreset::Coasting { coasting_friction } => {
                SpringConfig::coasting_with_origami_friction(coasting_friction)
            }
        };
        SpringConfig::checked(config.tension, config.friction)
    }
}

impl Default for SpringPreset {
    fn default() -> Self {
        SpringPreset::Origami {
            origami_tension: 40.0,
            origami_friction: 7.0,
        }
    }
}

/// Settings for a spring system and the springs it creates
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    /// Virtual frame length used by simulation loopers (milliseconds)
    pub simulation_timestep_ms: f64,
    /// Initial rest speed threshold for new springs
    pub rest_speed_threshold: f64,
    /// Initial displacement threshold for new springs
    pub displacement_from_rest_threshold: f64,
    /// Whether new springs start with overshoot clamping enabled
    pub overshoot_clamping: bool,
    /// Configuration used by `create_default_spring`
    pub default_spring: SpringPreset,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            simulation_timestep_ms: DEFAULT_SIMULATION_TIMESTEP_MS,
            rest_speed_threshold: DEFAULT_REST_SPEED_THRESHOLD,
            displacement_from_rest_threshold: DEFAULT_DISPLACEMENT_FROM_REST_THRESHOLD,
            overshoot_clamping: false,
            default_spring: SpringPreset::default(),
        }
    }
}

impl SystemSettings {
    /// Parse and validate settings from TOML text
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let settings: SystemSettings = toml::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse and validate settings from JSON text
    pub fn from_json_str(input: &str) -> Result<Self> {
        let settings: SystemSettings = serde_json::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        if !self.simulation_timestep_ms.is_finite() || self.simulation_timestep_ms <= 0.0 {
            return Err(SettingsError::InvalidTimestep(self.simulation_timestep_ms));
        }
        check_threshold("rest_speed_threshold", self.rest_speed_threshold)?;
        check_threshold(
            "displacement_from_rest_threshold",
            self.displacement_from_rest_threshold,
        )?;
        self.default_spring.to_config()?;
        Ok(())
    }

    /// The resolved default spring configuration
    pub fn default_spring_config(&self) -> SpringConfig {
        self.default_spring.to_config().unwrap_or_else(|err| {
            tracing::warn!("falling back to the default Origami spring: {}", err);
            SpringConfig::default_origami()
        })
    }
}

fn check_threshold(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SettingsError::InvalidThreshold { name, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = SystemSettings::default();
        assert_eq!(settings.simulation_timestep_ms, 16.667);
        assert_eq!(settings.rest_speed_threshold, 0.001);
        assert_eq!(settings.displacement_from_rest_threshold, 0.001);
        assert!(!settings.overshoot_clamping);
        assert_eq!(settings.default_spring_config(), SpringConfig::default_origami());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = SystemSettings::from_toml_str("overshoot_clamping = true\n").unwrap();
        assert!(settings.overshoot_clamping);
        assert_eq!(settings.simulation_timestep_ms, 16.667);
    }

    #[test]
    fn test_presets_from_toml() {
        let raw = SystemSettings::from_toml_str(
            "[default_spring]\ntension = 120.0\nfriction = 14.0\n",
        )
        .unwrap();
        assert_eq!(raw.default_spring_config(), SpringConfig::new(120.0, 14.0));

        let bouncy =
            SystemSettings::from_toml_str("[default_spring]\nbounciness = 5.0\nspeed = 10.0\n")
                .unwrap();
        assert_eq!(
            bouncy.default_spring_config(),
            SpringConfig::from_bounciness_and_speed(5.0, 10.0)
        );

        let coasting =
            SystemSettings::from_toml_str("[default_spring]\ncoasting_friction = 7.0\n").unwrap();
        assert!(coasting.default_spring_config().is_coasting());
    }

    #[test]
    fn test_json_settings() {
        let settings = SystemSettings::from_json_str(
            r#"{"simulation_timestep_ms": 8.0, "default_spring": {"origami_tension": 50.0, "origami_friction": 5.0}}"#,
        )
        .unwrap();
        assert_eq!(settings.simulation_timestep_ms, 8.0);
        assert_eq!(
            settings.default_spring_config(),
            SpringConfig::from_origami(50.0, 5.0)
        );
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            SystemSettings::from_toml_str("simulation_timestep_ms = 0.0\n"),
            Err(SettingsError::InvalidTimestep(_))
        ));
        assert!(matches!(
            SystemSettings::from_toml_str("rest_speed_threshold = -1.0\n"),
            Err(SettingsError::InvalidThreshold {
                name: "rest_speed_threshold",
                ..
            })
        ));
        assert!(matches!(
            SystemSettings::from_toml_str("[default_spring]\ntension = -1.0\nfriction = 1.0\n"),
            Err(SettingsError::Config(ConfigError::InvalidTension(_)))
        ));
        assert!(matches!(
            SystemSettings::from_json_str("{"),
            Err(SettingsError::Json(_))
        ));
    }
}
