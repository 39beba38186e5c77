//! Needs-save tracking for a credential store.
//!
//! Three states held in one atomic:
//!
//! ```text
//!   Clean --mark_dirty--> Dirty --begin_save--> Saving --finish_save--> Clean
//!                           ^                     |
//!                           +------fail_save------+
//!                           +------mark_dirty-----+
//! ```
//!
//! A mutation that lands while a save is running moves `Saving` back to
//! `Dirty`, so `finish_save` leaves it armed and the next save picks it up.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SaveState {
    Clean = 0,
    Dirty = 1,
    Saving = 2,
}

impl SaveState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Dirty,
            2 => Self::Saving,
            _ => Self::Clean,
        }
    }
}

#[derive(Debug)]
pub struct SaveTracker {
    state: AtomicU8,
}

impl SaveTracker {
    pub fn new(initial: SaveState) -> Self {
        Self {
            state: AtomicU8::new(initial as u8),
        }
    }

    pub fn get(&self) -> SaveState {
        SaveState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_dirty(&self) -> bool {
        self.get() == SaveState::Dirty
    }

    pub fn mark_dirty(&self) {
        self.state.store(SaveState::Dirty as u8, Ordering::Release);
    }

    /// Overwrite the state with `dirty`, e.g. after a clear.
    pub fn set_dirty(&self, dirty: bool) {
        let state = if dirty {
            SaveState::Dirty
        } else {
            SaveState::Clean
        };
        self.state.store(state as u8, Ordering::Release);
    }

    /// Move to `Saving`.  Returns `true` if the store was `Dirty`.
    pub fn begin_save(&self) -> bool {
        self.state.swap(SaveState::Saving as u8, Ordering::AcqRel) == SaveState::Dirty as u8
    }

    /// `Saving` -> `Clean`.  A mutation during the save keeps `Dirty`.
    pub fn finish_save(&self) {
        let _ = self.state.compare_exchange(
            SaveState::Saving as u8,
            SaveState::Clean as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn fail_save(&self) {
        self.mark_dirty();
    }
}
