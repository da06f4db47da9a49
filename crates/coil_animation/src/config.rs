//! Spring configuration
//!
//! Tension and friction for a damped spring, with constructors for the
//! Origami and bounciness/speed parameterizations.

use crate::conversion::{self, BouncyConversion};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Configuration for a spring
///
/// A tension of zero describes a coasting spring: it has no target to
/// return to and only slows down under friction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpringConfig {
    pub tension: f64,
    pub friction: f64,
}

impl SpringConfig {
    /// Create a spring configuration from raw tension and friction
    ///
    /// Values are taken as-is. Negative values produce whatever motion the
    /// equations imply; use [`SpringConfig::checked`] to reject them.
    pub fn new(tension: f64, friction: f64) -> Self {
        Self { tension, friction }
    }

    /// Create a spring configuration, rejecting negative or non-finite values
    pub fn checked(tension: f64, friction: f64) -> Result<Self, ConfigError> {
        if !tension.is_finite() || tension < 0.0 {
            return Err(ConfigError::InvalidTension(tension));
        }
        if !friction.is_finite() || friction < 0.0 {
            return Err(ConfigError::InvalidFriction(friction));
        }
        Ok(Self { tension, friction })
    }

    /// The default spring: Origami tension 40, friction 7
    pub fn default_origami() -> Self {
        Self::from_origami(40.0, 7.0)
    }

    /// Create a spring configuration from Origami tension and friction
    pub fn from_origami(tension: f64, friction: f64) -> Self {
        Self {
            tension: conversion::tension_from_origami(tension),
            friction: conversion::friction_from_origami(friction),
        }
    }

    /// Create a spring configuration from bounciness and speed
    ///
    /// Matches springs built from Origami PopAnimation patches.
    pub fn from_bounciness_and_speed(bounciness: f64, speed: f64) -> Self {
        let bouncy = BouncyConversion::new(bounciness, speed);
        Self::from_origami(bouncy.bouncy_tension, bouncy.bouncy_friction)
    }

    /// A zero-tension spring with friction given in Origami units
    pub fn coasting_with_origami_friction(friction: f64) -> Self {
        Self {
            tension: 0.0,
            friction: conversion::friction_from_origami(friction),
        }
    }

    /// Tension expressed in Origami units
    pub fn origami_tension(&self) -> f64 {
        conversion::origami_from_tension(self.tension)
    }

    /// Friction expressed in Origami units
    pub fn origami_friction(&self) -> f64 {
        conversion::origami_from_friction(self.friction)
    }

    /// Whether this spring coasts instead of returning to a target
    pub fn is_coasting(&self) -> bool {
        self.tension == 0.0
    }

    /// Friction at which this spring's tension is critically damped
    pub fn critical_friction(&self) -> f64 {
        2.0 * self.tension.sqrt()
    }

    /// Check if the spring is underdamped (will oscillate)
    pub fn is_underdamped(&self) -> bool {
        self.friction < self.critical_friction()
    }

    /// Check if the spring is overdamped (slow settling, no oscillation)
    pub fn is_overdamped(&self) -> bool {
        self.friction > self.critical_friction()
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::default_origami()
    }
}
