//! Spring system
//!
//! Owns a set of springs and advances the displaced ones on a shared clock.
//! Ticks are delivered by a [`SpringLooper`]; each tick notifies
//! before-integrate listeners, advances every active spring, drops springs
//! that came to rest, notifies after-integrate listeners and asks the
//! looper for another tick while anything is still moving.

use crate::config::SpringConfig;
use crate::looper::SpringLooper;
use crate::settings::SystemSettings;
use crate::spring::Spring;
use coil_core::{ListenerRegistry, RemovalToken};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxBuildHasher;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

new_key_type! {
    /// Unique identifier for a spring within its system
    pub struct SpringId;
}

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;
type FxIndexSet<K> = IndexSet<K, FxBuildHasher>;

/// Notification emitted by a spring system
#[derive(Clone, Copy)]
pub enum SystemEvent<'a> {
    /// About to advance the active springs
    BeforeIntegrate(&'a SpringSystem),
    /// Finished advancing the active springs
    AfterIntegrate(&'a SpringSystem),
}

/// Callback invoked with the system that fired an event
pub type SystemCallback = Box<dyn Fn(&SpringSystem)>;

/// A set of optional callbacks subscribed to a spring system
///
/// Before-integrate listeners can apply constraints to springs ahead of
/// each pass; after-integrate listeners see the settled frame.
#[derive(Default)]
pub struct SystemListener {
    before_integrate: Option<SystemCallback>,
    after_integrate: Option<SystemCallback>,
}

impl SystemListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before_integrate<F: Fn(&SpringSystem) + 'static>(mut self, callback: F) -> Self {
        self.before_integrate = Some(Box::new(callback));
        self
    }

    pub fn on_after_integrate<F: Fn(&SpringSystem) + 'static>(mut self, callback: F) -> Self {
        self.after_integrate = Some(Box::new(callback));
        self
    }

    /// Route an event to the matching callback, if any
    pub fn dispatch(&self, event: SystemEvent<'_>) {
        let (callback, system) = match event {
            SystemEvent::BeforeIntegrate(system) => (&self.before_integrate, system),
            SystemEvent::AfterIntegrate(system) => (&self.after_integrate, system),
        };
        if let Some(callback) = callback {
            callback(system);
        }
    }
}

struct SystemState {
    ids: SlotMap<SpringId, ()>,
    springs: FxIndexMap<SpringId, Spring>,
    active: FxIndexSet<SpringId>,
    idle: bool,
    /// Timestamp of the previous tick, unset while idle
    last_time: Option<f64>,
    settings: SystemSettings,
    destroyed: bool,
}

struct SystemInner {
    state: RefCell<SystemState>,
    listeners: RefCell<ListenerRegistry<Rc<SystemListener>>>,
    looper: RefCell<Option<Rc<dyn SpringLooper>>>,
}

/// A handle to a spring system
///
/// Cloning the handle does not clone the system. Systems are
/// single-threaded; independent systems share nothing.
#[derive(Clone)]
pub struct SpringSystem {
    inner: Rc<SystemInner>,
}

/// A non-owning reference to a spring system, held by its springs and
/// its looper
#[derive(Clone, Default)]
pub struct WeakSpringSystem {
    inner: Weak<SystemInner>,
}

impl WeakSpringSystem {
    /// A reference that never upgrades
    pub fn new() -> Self {
        Self { inner: Weak::new() }
    }

    pub fn upgrade(&self) -> Option<SpringSystem> {
        self.inner.upgrade().map(|inner| SpringSystem { inner })
    }

    pub fn ptr_eq(&self, other: &WeakSpringSystem) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl fmt::Debug for WeakSpringSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSpringSystem")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl SpringSystem {
    /// Create a spring system driven by `looper`
    pub fn new(looper: Rc<dyn SpringLooper>) -> Self {
        Self::with_settings(looper, SystemSettings::default())
    }

    /// Create a spring system whose springs start from `settings`
    pub fn with_settings(looper: Rc<dyn SpringLooper>, settings: SystemSettings) -> Self {
        let system = Self {
            inner: Rc::new(SystemInner {
                state: RefCell::new(SystemState {
                    ids: SlotMap::with_key(),
                    springs: FxIndexMap::default(),
                    active: FxIndexSet::default(),
                    idle: true,
                    last_time: None,
                    settings,
                    destroyed: false,
                }),
                listeners: RefCell::new(ListenerRegistry::new()),
                looper: RefCell::new(None),
            }),
        };
        system.set_looper(looper);
        system
    }

    pub fn downgrade(&self) -> WeakSpringSystem {
        WeakSpringSystem {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Replace the looper that delivers ticks to this system
    pub fn set_looper(&self, looper: Rc<dyn SpringLooper>) {
        if self.inner.state.borrow().destroyed {
            tracing::trace!("set_looper on destroyed spring system");
            return;
        }
        looper.bind(self.downgrade());
        *self.inner.looper.borrow_mut() = Some(looper);
    }

    pub fn settings(&self) -> SystemSettings {
        self.inner.state.borrow().settings.clone()
    }

    // =========================================================================
    // Springs
    // =========================================================================

    /// Create a spring with the configured default spring
    pub fn create_default_spring(&self) -> Spring {
        let config = self.inner.state.borrow().settings.default_spring_config();
        self.create_spring(config)
    }

    /// Create a spring from Origami tension and friction
    pub fn create_spring_with_origami(&self, tension: f64, friction: f64) -> Spring {
        self.create_spring(SpringConfig::from_origami(tension, friction))
    }

    /// Create a spring from bounciness and speed
    pub fn create_spring_with_bounciness_and_speed(&self, bounciness: f64, speed: f64) -> Spring {
        self.create_spring(SpringConfig::from_bounciness_and_speed(bounciness, speed))
    }

    /// Create a spring and register it with this system
    ///
    /// On a destroyed system the returned spring is already destroyed.
    pub fn create_spring(&self, config: SpringConfig) -> Spring {
        let mut state = self.inner.state.borrow_mut();
        let id = state.ids.insert(());

        if state.destroyed {
            state.ids.remove(id);
            tracing::trace!("create_spring on destroyed spring system");
            return Spring::detached(id, config);
        }

        let spring = Spring::new(id, config, self.downgrade(), &state.settings);
        state.springs.insert(id, spring.clone());
        tracing::trace!("spring {:?} created", id);
        spring
    }

    /// Add a spring to the solver loop again after it was deregistered
    ///
    /// Registering a spring that is already registered, destroyed, or owned
    /// by another system does nothing.
    pub fn register_spring(&self, spring: &Spring) {
        let mut state = self.inner.state.borrow_mut();
        if state.destroyed || spring.is_destroyed() || !spring.belongs_to(&self.downgrade()) {
            return;
        }
        let id = spring.id();
        if state.ids.contains_key(id) && !state.springs.contains_key(&id) {
            state.springs.insert(id, spring.clone());
        }
    }

    /// Stop considering a spring in the solver loop
    pub fn deregister_spring(&self, spring: &Spring) {
        let mut state = self.inner.state.borrow_mut();
        let id = spring.id();
        if let Some(existing) = state.springs.get(&id) {
            if existing != spring {
                return;
            }
        }
        state.springs.shift_remove(&id);
        state.active.shift_remove(&id);
    }

    /// Deregister a destroyed spring and retire its id
    pub(crate) fn release_spring(&self, spring: &Spring) {
        self.deregister_spring(spring);
        let mut state = self.inner.state.borrow_mut();
        if !state.springs.contains_key(&spring.id()) {
            state.ids.remove(spring.id());
        }
    }

    /// Mark a displaced spring as active, waking the looper if idle
    pub fn activate_spring(&self, spring: &Spring) {
        let wake = {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                return;
            }
            let id = spring.id();
            match state.springs.get(&id) {
                Some(existing) if existing == spring => {}
                _ => return,
            }
            state.active.insert(id);
            if state.idle {
                state.idle = false;
                true
            } else {
                false
            }
        };

        if wake {
            tracing::trace!("spring system active");
            self.request_tick();
        }
    }

    /// Look up a registered spring by id
    pub fn spring(&self, id: SpringId) -> Option<Spring> {
        self.inner.state.borrow().springs.get(&id).cloned()
    }

    /// Registered springs in creation order
    pub fn springs(&self) -> Vec<Spring> {
        self.inner.state.borrow().springs.values().cloned().collect()
    }

    pub fn spring_count(&self) -> usize {
        self.inner.state.borrow().springs.len()
    }

    pub fn active_count(&self) -> usize {
        self.inner.state.borrow().active.len()
    }

    pub fn is_active(&self, spring: &Spring) -> bool {
        self.inner.state.borrow().active.contains(&spring.id())
    }

    /// Whether every spring has reached equilibrium
    pub fn is_idle(&self) -> bool {
        self.inner.state.borrow().idle
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.state.borrow().destroyed
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Advance the simulation to `time` (milliseconds)
    ///
    /// Called by the looper. The first tick after the system goes idle is
    /// treated as one millisecond long.
    pub fn advance_tick(&self, time: f64) {
        let elapsed = {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                return;
            }
            let last_time = state.last_time.unwrap_or(time - 1.0);
            state.last_time = Some(time);
            time - last_time
        };

        self.notify(SystemEvent::BeforeIntegrate(self));

        // Springs activated during the pass are picked up on the next tick
        let active: SmallVec<[Spring; 8]> = {
            let state = self.inner.state.borrow();
            state
                .active
                .iter()
                .filter_map(|id| state.springs.get(id).cloned())
                .collect()
        };

        let mut idle_springs: SmallVec<[&Spring; 8]> = SmallVec::new();
        for spring in &active {
            if !self.is_active(spring) {
                continue;
            }
            if spring.system_should_advance() {
                spring.advance(time / 1000.0, elapsed / 1000.0);
            } else {
                idle_springs.push(spring);
            }
        }

        let idle = {
            let mut state = self.inner.state.borrow_mut();
            for spring in &idle_springs {
                // A listener later in the pass may have displaced it again
                if !spring.system_should_advance() {
                    state.active.shift_remove(&spring.id());
                }
            }
            if state.active.is_empty() {
                state.idle = true;
                state.last_time = None;
            }
            state.idle
        };
        if idle && !idle_springs.is_empty() {
            tracing::trace!("spring system idle");
        }

        self.notify(SystemEvent::AfterIntegrate(self));

        if !self.is_idle() {
            self.request_tick();
        }
    }

    fn request_tick(&self) {
        let looper = self.inner.looper.borrow().clone();
        if let Some(looper) = looper {
            looper.request_tick();
        }
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    pub fn add_listener(&self, listener: SystemListener) -> RemovalToken {
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

    fn notify(&self, event: SystemEvent<'_>) {
        let listeners = self.inner.listeners.borrow().snapshot();
        for listener in &listeners {
            listener.dispatch(event);
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Detach the looper, clear listeners and destroy every spring
    ///
    /// Irreversible. Later calls on the system do nothing.
    pub fn destroy(&self) {
        let springs: Vec<Spring> = {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.springs.values().cloned().collect()
        };

        self.inner.looper.borrow_mut().take();
        self.inner.listeners.borrow_mut().clear();

        for spring in &springs {
            spring.destroy();
        }

        let mut state = self.inner.state.borrow_mut();
        state.active.clear();
        state.idle = true;
        state.last_time = None;
        tracing::debug!("spring system destroyed with {} springs", springs.len());
    }
}

impl PartialEq for SpringSystem {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for SpringSystem {}

impl fmt::Debug for SpringSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("SpringSystem")
            .field("springs", &state.springs.len())
            .field("active", &state.active.len())
            .field("idle", &state.idle)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}
