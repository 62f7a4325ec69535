//! Per-instance memo slots.
//!
//! A [`MemoSlot`] holds at most one value of one attribute for one
//! instance. The host type owns it as a field, so the slot lives and dies
//! with the instance:
//!
//! ```rust
//! use cachet::MemoSlot;
//!
//! struct Order {
//!     id: u64,
//!     total: MemoSlot<u64>,
//! }
//! ```
//!
//! Concurrent writers are not coordinated: the last write wins. The
//! cached attribute never clears a slot; only the host can, via
//! [`MemoSlot::clear`].

use std::sync::{PoisonError, RwLock};

/// Process-local result slot for one `(instance, attribute)` pair.
pub struct MemoSlot<T> {
    value: RwLock<Option<T>>,
}

impl<T> MemoSlot<T> {
    /// Create an empty slot.
    pub const fn new() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }

    /// Whether the slot holds a value.
    pub fn is_populated(&self) -> bool {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Empty the slot; the next zero-argument call goes to the store again.
    pub fn clear(&self) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Overwrite the slot.
    pub(crate) fn put(&self, value: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
    }
}

impl<T: Clone> MemoSlot<T> {
    /// Current value, if any.
    pub fn get(&self) -> Option<T> {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<T> Default for MemoSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for MemoSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self.value.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("MemoSlot").field("value", &*value).finish()
    }
}
