//! Spring physics
//!
//! A damped harmonic oscillator integrated with fixed 1ms RK4 sub-steps.
//! Springs are created by a [`SpringSystem`], which advances them on its
//! shared clock while they are displaced from rest.
//!
//! A common pattern is to move a spring without animation while a gesture
//! is in progress and hand over to the physics when it ends:
//!
//! ```rust
//! use coil_animation::{SpringConfig, SpringSystem, SteppingLooper};
//! use std::rc::Rc;
//!
//! let looper = Rc::new(SteppingLooper::new());
//! let system = SpringSystem::new(looper.clone());
//! let spring = system.create_spring(SpringConfig::default());
//!
//! // While dragging: follow the finger, no animation
//! spring.set_current_value(120.0);
//!
//! // On release: keep the gesture's velocity and settle on the target
//! spring.set_velocity(-800.0).set_end_value(0.0);
//! while !system.is_idle() {
//!     looper.step(16.667);
//! }
//! assert_eq!(spring.current_value(), 0.0);
//! ```

use crate::config::SpringConfig;
use crate::settings::SystemSettings;
use crate::system::{SpringId, WeakSpringSystem};
use coil_core::{ListenerRegistry, RemovalToken};
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Largest frame delta a spring integrates, in seconds
pub const MAX_DELTA_TIME_SEC: f64 = 0.064;

/// Fixed integration sub-step, in seconds
pub const SOLVER_TIMESTEP_SEC: f64 = 0.001;

/// Position and velocity of a spring at one instant
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhysicsState {
    pub position: f64,
    pub velocity: f64,
}

/// Notification emitted by a spring
#[derive(Clone, Copy)]
pub enum SpringEvent<'a> {
    /// The spring left rest
    Activate(&'a Spring),
    /// The spring's position changed
    Update(&'a Spring),
    /// The spring came to rest
    Rest(&'a Spring),
    /// The spring's end value was changed
    EndValueChange(&'a Spring),
}

/// Callback invoked with the spring that fired an event
pub type SpringCallback = Box<dyn Fn(&Spring)>;

/// A set of optional callbacks subscribed to one spring
///
/// ```rust
/// use coil_animation::SpringListener;
///
/// let listener = SpringListener::new()
///     .on_update(|spring| println!("value: {}", spring.current_value()))
///     .on_rest(|_| println!("done"));
/// ```
#[derive(Default)]
pub struct SpringListener {
    activate: Option<SpringCallback>,
    update: Option<SpringCallback>,
    rest: Option<SpringCallback>,
    end_value_change: Option<SpringCallback>,
}

impl SpringListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when the spring leaves rest
    pub fn on_activate<F: Fn(&Spring) + 'static>(mut self, callback: F) -> Self {
        self.activate = Some(Box::new(callback));
        self
    }

    /// Called on every position update
    pub fn on_update<F: Fn(&Spring) + 'static>(mut self, callback: F) -> Self {
        self.update = Some(Box::new(callback));
        self
    }

    /// Called when the spring comes to rest
    pub fn on_rest<F: Fn(&Spring) + 'static>(mut self, callback: F) -> Self {
        self.rest = Some(Box::new(callback));
        self
    }

    /// Called synchronously when the end value changes
    pub fn on_end_value_change<F: Fn(&Spring) + 'static>(mut self, callback: F) -> Self {
        self.end_value_change = Some(Box::new(callback));
        self
    }

    /// Route an event to the matching callback, if any
    pub fn dispatch(&self, event: SpringEvent<'_>) {
        let (callback, spring) = match event {
            SpringEvent::Activate(spring) => (&self.activate, spring),
            SpringEvent::Update(spring) => (&self.update, spring),
            SpringEvent::Rest(spring) => (&self.rest, spring),
            SpringEvent::EndValueChange(spring) => (&self.end_value_change, spring),
        };
        if let Some(callback) = callback {
            callback(spring);
        }
    }
}

struct SpringState {
    config: SpringConfig,
    current: PhysicsState,
    previous: PhysicsState,
    temp: PhysicsState,
    start_value: f64,
    end_value: f64,
    overshoot_clamping_enabled: bool,
    rest_speed_threshold: f64,
    displacement_from_rest_threshold: f64,
    was_at_rest: bool,
    time_accumulator: f64,
    destroyed: bool,
}

impl SpringState {
    fn displacement_distance_for_state(&self, state: &PhysicsState) -> f64 {
        (self.end_value - state.position).abs()
    }

    fn is_at_rest(&self) -> bool {
        self.current.velocity.abs() < self.rest_speed_threshold
            && (self.displacement_distance_for_state(&self.current)
                <= self.displacement_from_rest_threshold
                || self.config.tension == 0.0)
    }

    fn is_overshooting(&self) -> bool {
        let position = self.current.position;
        self.config.tension > 0.0
            && ((self.start_value < self.end_value && position > self.end_value)
                || (self.start_value > self.end_value && position < self.end_value))
    }

    fn set_at_rest(&mut self) {
        self.end_value = self.current.position;
        self.temp.position = self.current.position;
        self.current.velocity = 0.0;
    }

    /// Drain the time accumulator in fixed sub-steps
    ///
    /// The stage layout (first acceleration sampled at the scratch position,
    /// every stage at half a step) is what existing animation curves were
    /// tuned against; keep it bit-for-bit.
    fn integrate(&mut self, delta: f64) {
        self.time_accumulator += delta;

        let tension = self.config.tension;
        let friction = self.config.friction;
        let end_value = self.end_value;
        let acceleration = |position: f64, velocity: f64| {
            (tension * (end_value - position)) - friction * velocity
        };

        let h = SOLVER_TIMESTEP_SEC;
        let mut position = self.current.position;
        let mut velocity = self.current.velocity;
        let mut temp = self.temp;

        while self.time_accumulator >= h {
            self.time_accumulator -= h;

            if self.time_accumulator < h {
                self.previous = PhysicsState { position, velocity };
            }

            let a_velocity = velocity;
            let a_acceleration = acceleration(temp.position, velocity);

            temp.position = position + a_velocity * h * 0.5;
            temp.velocity = velocity + a_acceleration * h * 0.5;
            let b_velocity = temp.velocity;
            let b_acceleration = acceleration(temp.position, temp.velocity);

            temp.position = position + b_velocity * h * 0.5;
            temp.velocity = velocity + b_acceleration * h * 0.5;
            let c_velocity = temp.velocity;
            let c_acceleration = acceleration(temp.position, temp.velocity);

            temp.position = position + c_velocity * h * 0.5;
            temp.velocity = velocity + c_acceleration * h * 0.5;
            let d_velocity = temp.velocity;
            let d_acceleration = acceleration(temp.position, temp.velocity);

            let dxdt = 1.0 / 6.0 * (a_velocity + 2.0 * (b_velocity + c_velocity) + d_velocity);
            let dvdt = 1.0 / 6.0
                * (a_acceleration + 2.0 * (b_acceleration + c_acceleration) + d_acceleration);

            position += dxdt * h;
            velocity += dvdt * h;
        }

        self.temp = temp;
        self.current = PhysicsState { position, velocity };

        if self.time_accumulator > 0.0 {
            self.interpolate(self.time_accumulator / h);
        }
    }

    /// Blend toward the previous sub-step by the leftover fraction
    fn interpolate(&mut self, alpha: f64) {
        self.current.position =
            self.current.position * alpha + self.previous.position * (1.0 - alpha);
        self.current.velocity =
            self.current.velocity * alpha + self.previous.velocity * (1.0 - alpha);
    }

    /// Pin the spring to its resting position
    fn snap_to_rest(&mut self) {
        if self.config.tension > 0.0 {
            self.start_value = self.end_value;
            self.current.position = self.end_value;
        } else {
            // Coasting springs rest wherever friction stopped them
            self.end_value = self.current.position;
            self.start_value = self.end_value;
        }
        self.current.velocity = 0.0;
    }
}

struct SpringInner {
    id: SpringId,
    state: RefCell<SpringState>,
    listeners: RefCell<ListenerRegistry<Rc<SpringListener>>>,
    system: WeakSpringSystem,
}

/// A handle to a spring owned by a [`SpringSystem`](crate::SpringSystem)
///
/// Cloning the handle does not clone the spring. Two handles are equal
/// when they refer to the same spring.
#[derive(Clone)]
pub struct Spring {
    inner: Rc<SpringInner>,
}

impl Spring {
    pub(crate) fn new(
        id: SpringId,
        config: SpringConfig,
        system: WeakSpringSystem,
        settings: &SystemSettings,
    ) -> Self {
        let state = SpringState {
            config,
            current: PhysicsState::default(),
            previous: PhysicsState::default(),
            temp: PhysicsState::default(),
            start_value: 0.0,
            end_value: 0.0,
            overshoot_clamping_enabled: settings.overshoot_clamping,
            rest_speed_threshold: settings.rest_speed_threshold,
            displacement_from_rest_threshold: settings.displacement_from_rest_threshold,
            was_at_rest: true,
            time_accumulator: 0.0,
            destroyed: false,
        };

        Self {
            inner: Rc::new(SpringInner {
                id,
                state: RefCell::new(state),
                listeners: RefCell::new(ListenerRegistry::new()),
                system,
            }),
        }
    }

    /// Create a spring that is already destroyed and belongs to no system
    pub(crate) fn detached(id: SpringId, config: SpringConfig) -> Self {
        let spring = Self::new(
            id,
            config,
            WeakSpringSystem::new(),
            &SystemSettings::default(),
        );
        spring.inner.state.borrow_mut().destroyed = true;
        spring
    }

    pub fn id(&self) -> SpringId {
        self.inner.id
    }

    pub(crate) fn belongs_to(&self, system: &WeakSpringSystem) -> bool {
        self.inner.system.ptr_eq(system)
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub fn config(&self) -> SpringConfig {
        self.inner.state.borrow().config
    }

    /// Swap tension and friction; takes effect on the next advance
    pub fn set_config(&self, config: SpringConfig) -> &Self {
        self.inner.state.borrow_mut().config = config;
        self
    }

    pub fn overshoot_clamping_enabled(&self) -> bool {
        self.inner.state.borrow().overshoot_clamping_enabled
    }

    /// Stop the spring as soon as it passes its end value instead of
    /// oscillating around it. Useful for scaling down to 0 or alpha fades.
    pub fn set_overshoot_clamping(&self, enabled: bool) -> &Self {
        self.inner.state.borrow_mut().overshoot_clamping_enabled = enabled;
        self
    }

    pub fn rest_speed_threshold(&self) -> f64 {
        self.inner.state.borrow().rest_speed_threshold
    }

    pub fn set_rest_speed_threshold(&self, threshold: f64) -> &Self {
        self.inner.state.borrow_mut().rest_speed_threshold = threshold;
        self
    }

    pub fn displacement_from_rest_threshold(&self) -> f64 {
        self.inner.state.borrow().displacement_from_rest_threshold
    }

    pub fn set_displacement_from_rest_threshold(&self, threshold: f64) -> &Self {
        self.inner.state.borrow_mut().displacement_from_rest_threshold = threshold;
        self
    }

    // =========================================================================
    // Values
    // =========================================================================

    pub fn current_value(&self) -> f64 {
        self.inner.state.borrow().current.position
    }

    pub fn velocity(&self) -> f64 {
        self.inner.state.borrow().current.velocity
    }

    /// Position the most recent excursion started from
    pub fn start_value(&self) -> f64 {
        self.inner.state.borrow().start_value
    }

    /// Resting position the spring is heading toward
    pub fn end_value(&self) -> f64 {
        self.inner.state.borrow().end_value
    }

    /// Absolute distance from the end value
    pub fn current_displacement_distance(&self) -> f64 {
        let state = self.inner.state.borrow();
        state.displacement_distance_for_state(&state.current)
    }

    /// Absolute distance of an arbitrary state from the end value
    pub fn displacement_distance_for_state(&self, physics: &PhysicsState) -> f64 {
        self.inner
            .state
            .borrow()
            .displacement_distance_for_state(physics)
    }

    /// Whether the current value is within the displacement threshold of `value`
    pub fn current_value_is_approximately(&self, value: f64) -> bool {
        let state = self.inner.state.borrow();
        (state.current.position - value).abs() <= state.displacement_from_rest_threshold
    }

    /// Move the spring to `value` and put it at rest there
    ///
    /// Listeners receive an update immediately. Use
    /// [`set_current_value_without_rest`](Self::set_current_value_without_rest)
    /// to keep the end value and velocity, leaving the spring displaced.
    pub fn set_current_value(&self, value: f64) -> &Self {
        self.update_current_value(value, false)
    }

    /// Move the spring to `value` without touching its end value or velocity
    pub fn set_current_value_without_rest(&self, value: f64) -> &Self {
        self.update_current_value(value, true)
    }

    fn update_current_value(&self, value: f64, skip_set_at_rest: bool) -> &Self {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                tracing::trace!("set_current_value on destroyed spring {:?}", self.id());
                return self;
            }
            state.start_value = value;
            state.current.position = value;
            if !skip_set_at_rest {
                state.set_at_rest();
            }
        }
        self.notify_position_updated(false, false);
        self
    }

    /// Set the resting position the spring should settle on
    ///
    /// If this changes anything, end-value-change listeners are notified
    /// synchronously and the owning system starts advancing the spring.
    pub fn set_end_value(&self, value: f64) -> &Self {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                tracing::trace!("set_end_value on destroyed spring {:?}", self.id());
                return self;
            }
            if state.end_value == value && state.is_at_rest() {
                return self;
            }
            state.start_value = state.current.position;
            state.end_value = value;
        }

        self.notify(SpringEvent::EndValueChange(self));
        self.activate();
        self
    }

    /// Set the velocity, e.g. to continue a released gesture
    pub fn set_velocity(&self, velocity: f64) -> &Self {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed || velocity == state.current.velocity {
                return self;
            }
            state.current.velocity = velocity;
        }

        self.activate();
        self
    }

    // =========================================================================
    // Rest
    // =========================================================================

    /// Whether velocity and displacement are both within their thresholds
    ///
    /// A zero-tension spring only needs to have slowed down.
    pub fn is_at_rest(&self) -> bool {
        self.inner.state.borrow().is_at_rest()
    }

    /// Whether the spring was at rest after its last advance
    pub fn was_at_rest(&self) -> bool {
        self.inner.state.borrow().was_at_rest
    }

    /// Whether the spring has passed its end value relative to where the
    /// current excursion started
    pub fn is_overshooting(&self) -> bool {
        self.inner.state.borrow().is_overshooting()
    }

    /// Put the spring at rest at its current position
    pub fn set_at_rest(&self) -> &Self {
        {
            let mut state = self.inner.state.borrow_mut();
            if !state.destroyed {
                state.set_at_rest();
            }
        }
        self
    }

    /// Whether the system should advance this spring on the next tick
    ///
    /// Springs get one extra advance after reaching rest so their value
    /// lands exactly on the end value.
    pub fn system_should_advance(&self) -> bool {
        let state = self.inner.state.borrow();
        !state.is_at_rest() || !state.was_at_rest
    }

    // =========================================================================
    // Advance
    // =========================================================================

    /// Integrate the spring forward by `real_delta_time` seconds
    ///
    /// Deltas above [`MAX_DELTA_TIME_SEC`] are clamped so a long pause does
    /// not destabilize the solver.
    pub fn advance(&self, _time: f64, real_delta_time: f64) {
        let (notify_activate, notify_rest) = {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                return;
            }

            let mut is_at_rest = state.is_at_rest();
            if is_at_rest && state.was_at_rest {
                return;
            }

            let adjusted_delta_time = if real_delta_time > MAX_DELTA_TIME_SEC {
                MAX_DELTA_TIME_SEC
            } else {
                real_delta_time
            };
            state.integrate(adjusted_delta_time);

            if state.is_at_rest() || (state.overshoot_clamping_enabled && state.is_overshooting())
            {
                state.snap_to_rest();
                is_at_rest = true;
            }

            let notify_activate = state.was_at_rest;
            state.was_at_rest = is_at_rest;
            (notify_activate, is_at_rest)
        };

        self.notify_position_updated(notify_activate, notify_rest);
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    pub fn add_listener(&self, listener: SpringListener) -> RemovalToken {
        self.inner
            .listeners
            .borrow_mut()
            .insert(Rc::new(listener))
    }

    /// Remove a listener; removing twice is a no-op
    pub fn remove_listener(&self, token: &RemovalToken) {
        self.inner.listeners.borrow_mut().remove(token);
    }

    pub fn remove_all_listeners(&self) {
        self.inner.listeners.borrow_mut().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Remove the spring from its system and clear its listeners
    ///
    /// Further calls on a destroyed spring do nothing.
    pub fn destroy(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
        }
        self.inner.listeners.borrow_mut().clear();
        if let Some(system) = self.inner.system.upgrade() {
            system.release_spring(self);
        }
        tracing::trace!("spring {:?} destroyed", self.id());
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.state.borrow().destroyed
    }

    fn activate(&self) {
        if let Some(system) = self.inner.system.upgrade() {
            system.activate_spring(self);
        }
    }

    fn notify(&self, event: SpringEvent<'_>) {
        let listeners = self.inner.listeners.borrow().snapshot();
        for listener in &listeners {
            listener.dispatch(event);
        }
    }

    fn notify_position_updated(&self, notify_activate: bool, notify_rest: bool) {
        let listeners = self.inner.listeners.borrow().snapshot();
        for listener in &listeners {
            if notify_activate {
                listener.dispatch(SpringEvent::Activate(self));
            }
            listener.dispatch(SpringEvent::Update(self));
            if notify_rest {
                listener.dispatch(SpringEvent::Rest(self));
            }
        }
    }
}

impl PartialEq for Spring {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Spring {}

impl Hash for Spring {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Spring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Spring")
            .field("id", &self.inner.id)
            .field("config", &state.config)
            .field("position", &state.current.position)
            .field("velocity", &state.current.velocity)
            .field("end_value", &state.end_value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::looper::{SimulationLooper, SteppingLooper};
    use crate::system::SpringSystem;
    use std::cell::{Cell, RefCell};

    fn simulated() -> (SpringSystem, Spring) {
        let system = SpringSystem::new(Rc::new(SimulationLooper::new()));
        let spring = system.create_default_spring();
        (system, spring)
    }

    fn collect_values(spring: &Spring) -> Rc<RefCell<Vec<f64>>> {
        let values = Rc::new(RefCell::new(Vec::new()));
        let sink = values.clone();
        spring.add_listener(SpringListener::new().on_update(move |s| {
            sink.borrow_mut().push(s.current_value());
        }));
        values
    }

    fn is_monotonic(values: &[f64]) -> bool {
        values.windows(2).all(|pair| pair[1] >= pair[0])
    }

    #[test]
    fn test_created_at_rest() {
        let (_system, spring) = simulated();
        assert!(spring.is_at_rest());
        assert_eq!(spring.current_value(), 0.0);
        assert_eq!(spring.end_value(), 0.0);
        assert_eq!(spring.velocity(), 0.0);
    }

    #[test]
    fn test_listener_counting() {
        let (_system, spring) = simulated();
        let token = spring.add_listener(SpringListener::new());
        assert_eq!(spring.listener_count(), 1);
        spring.remove_listener(&token);
        assert_eq!(spring.listener_count(), 0);

        for _ in 0..4 {
            spring.add_listener(SpringListener::new());
        }
        assert_eq!(spring.listener_count(), 4);
        spring.remove_all_listeners();
        assert_eq!(spring.listener_count(), 0);

        // Stale token after clearing
        spring.remove_listener(&token);
        assert_eq!(spring.listener_count(), 0);
    }

    #[test]
    fn test_settles_exactly_on_target() {
        let (_system, spring) = simulated();
        spring.set_end_value(100.0);
        assert!(spring.is_at_rest());
        assert_eq!(spring.current_value(), 100.0);
        assert_eq!(spring.velocity(), 0.0);
        assert_eq!(spring.start_value(), 100.0);
    }

    #[test]
    fn test_overshoot_clamping_prevents_oscillation() {
        let (_system, spring) = simulated();
        let values = collect_values(&spring);
        spring.set_overshoot_clamping(true);
        spring.set_end_value(1.0);

        let values = values.borrow();
        assert!(!values.is_empty());
        assert!(is_monotonic(&values));
        assert_eq!(*values.last().unwrap(), 1.0);
    }

    #[test]
    fn test_zero_tension_does_not_oscillate() {
        let (_system, spring) = simulated();
        let values = collect_values(&spring);
        spring.set_config(SpringConfig::coasting_with_origami_friction(7.0));
        spring.set_velocity(1000.0);

        let values = values.borrow();
        assert!(values.len() > 1);
        assert!(is_monotonic(&values));
        // A coasting spring rests wherever it stopped
        assert!(spring.is_at_rest());
        assert_eq!(spring.end_value(), spring.current_value());
        assert!(spring.current_value() > 0.0);
    }

    #[test]
    fn test_set_current_value_puts_at_rest() {
        let system = SpringSystem::new(Rc::new(SteppingLooper::new()));
        let spring = system.create_default_spring();
        spring.set_end_value(1.0);
        spring.set_current_value(-1.0);
        assert!(spring.is_at_rest());
        assert_eq!(spring.current_value(), -1.0);
        assert_eq!(spring.end_value(), -1.0);
    }

    #[test]
    fn test_set_current_value_without_rest_stays_displaced() {
        let system = SpringSystem::new(Rc::new(SteppingLooper::new()));
        let spring = system.create_default_spring();
        spring.set_end_value(1.0);
        spring.set_current_value_without_rest(-1.0);
        assert!(!spring.is_at_rest());
        assert_eq!(spring.current_value(), -1.0);
        assert_eq!(spring.end_value(), 1.0);
    }

    #[test]
    fn test_set_current_value_notifies_update_only() {
        let system = SpringSystem::new(Rc::new(SteppingLooper::new()));
        let spring = system.create_default_spring();
        let events = Rc::new(RefCell::new(Vec::new()));
        let (a, u, r) = (events.clone(), events.clone(), events.clone());
        spring.add_listener(
            SpringListener::new()
                .on_activate(move |_| a.borrow_mut().push("activate"))
                .on_update(move |_| u.borrow_mut().push("update"))
                .on_rest(move |_| r.borrow_mut().push("rest")),
        );

        spring.set_current_value(5.0);
        assert_eq!(*events.borrow(), vec!["update"]);
    }

    #[test]
    fn test_event_order_within_a_pass() {
        let looper = Rc::new(SteppingLooper::new());
        let system = SpringSystem::new(looper.clone());
        let spring = system.create_default_spring();
        let events = Rc::new(RefCell::new(Vec::new()));
        let (a, u, r) = (events.clone(), events.clone(), events.clone());
        spring.add_listener(
            SpringListener::new()
                .on_activate(move |_| a.borrow_mut().push("activate"))
                .on_update(move |_| u.borrow_mut().push("update"))
                .on_rest(move |_| r.borrow_mut().push("rest")),
        );

        spring.set_end_value(1.0);
        looper.step(16.667);
        assert_eq!(*events.borrow(), vec!["activate", "update"]);

        while !system.is_idle() {
            looper.step(16.667);
        }
        let events = events.borrow();
        assert_eq!(events.iter().filter(|e| **e == "activate").count(), 1);
        assert_eq!(events.iter().filter(|e| **e == "rest").count(), 1);
        assert_eq!(events[events.len() - 2..], ["update", "rest"]);
    }

    #[test]
    fn test_end_value_change_fires_once_synchronously() {
        let system = SpringSystem::new(Rc::new(SteppingLooper::new()));
        let spring = system.create_default_spring();
        let changes = Rc::new(Cell::new(0));
        let sink = changes.clone();
        spring.add_listener(
            SpringListener::new().on_end_value_change(move |_| sink.set(sink.get() + 1)),
        );

        spring.set_end_value(1.0);
        assert_eq!(changes.get(), 1);
        assert!(!system.is_idle());

        // Same target while moving still counts as a change request
        spring.set_end_value(1.0);
        assert_eq!(changes.get(), 2);
    }

    #[test]
    fn test_set_end_value_noop_when_resting_on_it() {
        let (system, spring) = simulated();
        let changes = Rc::new(Cell::new(0));
        let sink = changes.clone();
        spring.add_listener(
            SpringListener::new().on_end_value_change(move |_| sink.set(sink.get() + 1)),
        );

        spring.set_end_value(0.0);
        assert_eq!(changes.get(), 0);
        assert!(system.is_idle());
    }

    #[test]
    fn test_set_velocity_same_value_is_noop() {
        let system = SpringSystem::new(Rc::new(SteppingLooper::new()));
        let spring = system.create_default_spring();
        spring.set_velocity(0.0);
        assert!(system.is_idle());
        spring.set_velocity(10.0);
        assert!(!system.is_idle());
        assert_eq!(spring.velocity(), 10.0);
    }

    #[test]
    fn test_set_at_rest_keeps_start_value() {
        let looper = Rc::new(SteppingLooper::new());
        let system = SpringSystem::new(looper.clone());
        let spring = system.create_default_spring();
        spring.set_end_value(10.0);
        looper.step(16.667);
        looper.step(16.667);

        let position = spring.current_value();
        spring.set_at_rest();
        assert_eq!(spring.end_value(), position);
        assert_eq!(spring.velocity(), 0.0);
        assert_eq!(spring.start_value(), 0.0);
        assert!(spring.is_at_rest());
    }

    #[test]
    fn test_overshooting_uses_excursion_start() {
        let looper = Rc::new(SteppingLooper::new());
        let system = SpringSystem::new(looper.clone());
        let spring = system.create_default_spring();
        spring.set_end_value(1.0);
        for _ in 0..20 {
            looper.step(16.667);
        }
        // The default spring peaks above 1.0 around here
        assert!(spring.current_value() > 1.0);
        assert!(spring.is_overshooting());

        // Retargeting mid-flight re-bases the excursion at the current value
        spring.set_end_value(2.0);
        assert_eq!(spring.start_value(), spring.current_value());
        assert!(!spring.is_overshooting());
    }

    #[test]
    fn test_large_delta_is_clamped() {
        let system = SpringSystem::new(Rc::new(SteppingLooper::new()));
        let clamped = system.create_default_spring();
        let reference = system.create_default_spring();
        clamped.set_end_value(1.0);
        reference.set_end_value(1.0);

        clamped.advance(0.0, 5.0);
        reference.advance(0.0, MAX_DELTA_TIME_SEC);
        assert_eq!(clamped.current_value(), reference.current_value());
        assert_eq!(clamped.velocity(), reference.velocity());
    }

    #[test]
    fn test_advance_at_rest_is_silent() {
        let system = SpringSystem::new(Rc::new(SteppingLooper::new()));
        let spring = system.create_default_spring();
        let values = collect_values(&spring);
        spring.advance(0.0, 0.016);
        assert!(values.borrow().is_empty());
    }

    #[test]
    fn test_destroyed_spring_ignores_calls() {
        let (system, spring) = simulated();
        spring.add_listener(SpringListener::new());
        spring.destroy();
        assert!(spring.is_destroyed());
        assert_eq!(spring.listener_count(), 0);

        spring.set_end_value(5.0);
        spring.set_velocity(5.0);
        spring.set_current_value(5.0);
        spring.destroy();
        assert_eq!(spring.end_value(), 0.0);
        assert_eq!(spring.current_value(), 0.0);
        assert!(system.is_idle());
        assert_eq!(system.spring_count(), 0);
    }

    #[test]
    fn test_equality_is_identity() {
        let (system, spring) = simulated();
        let other = system.create_default_spring();
        assert_eq!(spring, spring.clone());
        assert_ne!(spring, other);
    }
}
