//! Listener registry
//!
//! An unordered bag of listeners with stable removal tokens. Springs and
//! spring systems keep their observers here so that neither has to know
//! about the concrete UI types listening to them.
//!
//! Removal tokens share their identifier with the stored entry, so
//! reassigning identifiers after the counter wraps never invalidates a
//! live token.

use smallvec::SmallVec;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Identifier slot shared between a stored entry and its token
type SharedIdentifier = Rc<Cell<Option<u64>>>;

/// Token for removing a listener that was inserted into a [`ListenerRegistry`]
///
/// Removing through a token is idempotent: once the listener is gone the
/// token no longer refers to anything.
#[derive(Clone)]
pub struct RemovalToken {
    identifier: SharedIdentifier,
}

impl RemovalToken {
    /// The identifier this token currently refers to, or `None` once the
    /// listener is gone
    pub fn identifier(&self) -> Option<u64> {
        self.identifier.get()
    }

    /// Whether the listener was removed or the registry cleared
    pub fn is_spent(&self) -> bool {
        self.identifier.get().is_none()
    }
}

impl fmt::Debug for RemovalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemovalToken")
            .field("identifier", &self.identifier.get())
            .finish()
    }
}

struct Entry<T> {
    value: T,
    identifier: SharedIdentifier,
}

/// An unordered, non-unique collection of listeners
pub struct ListenerRegistry<T> {
    entries: SmallVec<[Entry<T>; 4]>,
    next_identifier: u64,
}

impl<T> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: SmallVec::new(),
            next_identifier: 0,
        }
    }

    /// Insert a listener and return the token that removes it
    pub fn insert(&mut self, value: T) -> RemovalToken {
        if self.next_identifier.checked_add(1).is_none() {
            self.reindex();
        }

        let identifier = Rc::new(Cell::new(Some(self.next_identifier)));
        self.next_identifier += 1;

        self.entries.push(Entry {
            value,
            identifier: identifier.clone(),
        });

        RemovalToken { identifier }
    }

    /// Remove the listener a token refers to
    ///
    /// Returns `true` if a listener was removed. Removing twice, or after
    /// [`clear`](Self::clear), does nothing.
    pub fn remove(&mut self, token: &RemovalToken) -> bool {
        let Some(identifier) = token.identifier.get() else {
            return false;
        };

        // Recently inserted listeners are the likeliest to be removed.
        let Some(index) = self
            .entries
            .iter()
            .rposition(|entry| entry.identifier.get() == Some(identifier))
        else {
            return false;
        };

        self.entries.remove(index);
        token.identifier.set(None);
        true
    }

    /// Remove every listener. Outstanding tokens become stale.
    pub fn clear(&mut self) {
        for entry in self.entries.drain(..) {
            entry.identifier.set(None);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate listeners in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|entry| &entry.value)
    }

    /// Reassign identifiers `0..n` in storage order and continue from `n`
    fn reindex(&mut self) {
        for (index, entry) in self.entries.iter().enumerate() {
            entry.identifier.set(Some(index as u64));
        }
        self.next_identifier = self.entries.len() as u64;
        tracing::trace!(
            "listener identifiers wrapped, reindexed {} entries",
            self.entries.len()
        );
    }
}

impl<T: Clone> ListenerRegistry<T> {
    /// Clone the current listeners out of the registry
    ///
    /// Emitters dispatch over a snapshot so listeners may add or remove
    /// listeners while being notified.
    pub fn snapshot(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ListenerRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.entries.len())
            .field("next_identifier", &self.next_identifier)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_near_wrap(remaining: u64) -> ListenerRegistry<&'static str> {
        ListenerRegistry {
            entries: SmallVec::new(),
            next_identifier: u64::MAX - remaining,
        }
    }

    #[test]
    fn test_insert_and_remove() {
        let mut registry = ListenerRegistry::new();
        let token = registry.insert("a");
        assert_eq!(registry.len(), 1);
        assert_eq!(token.identifier(), Some(0));

        assert!(registry.remove(&token));
        assert!(registry.is_empty());
        assert!(token.is_spent());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = ListenerRegistry::new();
        let a = registry.insert("a");
        let _b = registry.insert("b");

        assert!(registry.remove(&a));
        assert!(!registry.remove(&a));
        assert_eq!(registry.iter().copied().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_stale_token_after_clear() {
        let mut registry = ListenerRegistry::new();
        let a = registry.insert("a");
        registry.clear();

        assert!(a.is_spent());
        let _b = registry.insert("b");
        assert!(!registry.remove(&a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_iteration_keeps_insertion_order() {
        let mut registry = ListenerRegistry::new();
        registry.insert(1);
        let two = registry.insert(2);
        registry.insert(3);
        registry.insert(4);
        registry.remove(&two);

        assert_eq!(registry.snapshot(), vec![1, 3, 4]);
    }

    #[test]
    fn test_duplicate_values_remove_by_token() {
        let mut registry = ListenerRegistry::new();
        let first = registry.insert("same");
        let second = registry.insert("same");

        registry.remove(&first);
        assert_eq!(registry.len(), 1);
        assert_eq!(second.identifier(), Some(1));
        assert!(registry.remove(&second));
    }

    #[test]
    fn test_reindex_on_wraparound() {
        let mut registry = registry_near_wrap(2);
        let a = registry.insert("a");
        let b = registry.insert("b");
        assert_eq!(a.identifier(), Some(u64::MAX - 2));
        assert_eq!(b.identifier(), Some(u64::MAX - 1));

        let c = registry.insert("c");
        assert_eq!(a.identifier(), Some(0));
        assert_eq!(b.identifier(), Some(1));
        assert_eq!(c.identifier(), Some(2));

        // Tokens still remove the right entries after the reindex
        assert!(registry.remove(&b));
        assert_eq!(registry.snapshot(), vec!["a", "c"]);
        assert!(registry.remove(&a));
        assert!(registry.remove(&c));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reindex_skips_removed_entries() {
        let mut registry = registry_near_wrap(3);
        let a = registry.insert("a");
        let b = registry.insert("b");
        let c = registry.insert("c");
        registry.remove(&b);

        let d = registry.insert("d");
        assert_eq!(a.identifier(), Some(0));
        assert_eq!(c.identifier(), Some(1));
        assert_eq!(d.identifier(), Some(2));
        assert!(b.is_spent());
    }
}
