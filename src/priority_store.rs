//! In-memory priority store
//!
//! A [`PriorityStore`] backed by a bounded map behind a blocking mutex. Useful on
//! targets without a settings database, and as the reference for the key format
//! persisted stores use.

use core::{cell::RefCell, fmt::Write};

use embassy_sync::blocking_mutex::{Mutex, raw::CriticalSectionRawMutex};
use heapless::{FnvIndexMap, String};

use crate::{
    BluetoothAddress, PriorityStore, SinkPriority,
    constants::{MAX_PRIORITY_KEY_LENGTH, MAX_STORED_PRIORITIES, PRIORITY_KEY_PREFIX},
};

/// Settings key under which the priority of `address` is persisted
pub type PriorityKey = String<MAX_PRIORITY_KEY_LENGTH>;

/// Build the [`PriorityKey`] of `address`
#[must_use]
pub fn priority_key(address: BluetoothAddress) -> PriorityKey {
    let mut key = String::new();
    // Prefix plus a 17 character address always fits
    write!(key, "{PRIORITY_KEY_PREFIX}{address}").ok();
    key
}

/// Bounded, thread-safe in-memory priority store
///
/// Entries are keyed by [`priority_key`], as a settings database would store them.
pub struct MemoryPriorityStore {
    priorities: Mutex<
        CriticalSectionRawMutex,
        RefCell<FnvIndexMap<PriorityKey, SinkPriority, MAX_STORED_PRIORITIES>>,
    >,
}

impl MemoryPriorityStore {
    /// Create an empty store
    #[must_use]
    pub const fn new() -> Self {
        Self {
            priorities: Mutex::new(RefCell::new(FnvIndexMap::new())),
        }
    }

    /// Number of devices with a stored priority
    #[must_use]
    pub fn len(&self) -> usize {
        self.priorities.lock(|priorities| priorities.borrow().len())
    }

    /// No priority stored yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryPriorityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PriorityStore for MemoryPriorityStore {
    fn priority(&self, address: BluetoothAddress) -> Option<SinkPriority> {
        let key = priority_key(address);
        self.priorities
            .lock(|priorities| priorities.borrow().get(&key).copied())
    }

    fn set_priority(&self, address: BluetoothAddress, priority: SinkPriority) -> bool {
        let key = priority_key(address);
        self.priorities
            .lock(|priorities| priorities.borrow_mut().insert(key, priority).is_ok())
    }
}
