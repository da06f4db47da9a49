//! Coil Animation System
//!
//! Damped spring physics driven by a shared spring system.
//!
//! # Features
//!
//! - **Spring Physics**: fixed-step RK4 springs with rest detection and
//!   optional overshoot clamping
//! - **Spring Systems**: advance only the springs that are displaced and go
//!   idle when everything has settled
//! - **Loopers**: real frames, synchronous simulation or manual stepping
//! - **Origami Units**: tension/friction and bounciness/speed conversions
//!
//! # Example
//!
//! ```rust
//! use coil_animation::{SimulationLooper, SpringListener, SpringSystem};
//! use std::rc::Rc;
//!
//! let system = SpringSystem::new(Rc::new(SimulationLooper::new()));
//! let spring = system.create_spring_with_origami(40.0, 7.0);
//! spring.add_listener(SpringListener::new().on_rest(|s| {
//!     assert_eq!(s.current_value(), 1.0);
//! }));
//!
//! // The simulation looper runs to rest before returning
//! spring.set_end_value(1.0);
//! assert!(system.is_idle());
//! ```

pub mod config;
pub mod conversion;
pub mod error;
pub mod looper;
pub mod settings;
pub mod spring;
pub mod system;

pub use config::SpringConfig;
pub use conversion::BouncyConversion;
pub use error::{ConfigError, SettingsError};
pub use looper::{AnimationLooper, FrameSource, SimulationLooper, SpringLooper, SteppingLooper};
pub use settings::{SpringPreset, SystemSettings};
pub use spring::{PhysicsState, Spring, SpringEvent, SpringListener};
pub use system::{SpringId, SpringSystem, SystemEvent, SystemListener, WeakSpringSystem};
