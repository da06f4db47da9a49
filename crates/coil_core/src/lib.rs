//! Coil Core
//!
//! Foundational primitives shared by the Coil animation crates:
//!
//! - **Listener Registry**: an unordered bag of observers with removal
//!   tokens that stay valid across identifier reassignment
//!
//! # Example
//!
//! ```rust
//! use coil_core::ListenerRegistry;
//!
//! let mut listeners = ListenerRegistry::new();
//! let token = listeners.insert("on_update");
//! assert_eq!(listeners.len(), 1);
//!
//! listeners.remove(&token);
//! // Removing again is a no-op
//! listeners.remove(&token);
//! assert!(listeners.is_empty());
//! ```

pub mod listeners;

pub use listeners::{ListenerRegistry, RemovalToken};
