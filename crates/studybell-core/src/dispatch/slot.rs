use std::sync::{Arc, Mutex, PoisonError};

use crate::reminder::AlertEvent;

/// The single active-alert slot. Clones share the slot; last write wins.
#[derive(Debug, Clone, Default)]
pub struct AlertSlot {
    active: Arc<Mutex<Option<AlertEvent>>>,
}

impl AlertSlot {
    pub fn show(&self, event: AlertEvent) {
        *self.lock() = Some(event);
    }

    pub fn dismiss(&self) {
        *self.lock() = None;
    }

    /// Clear and return the active alert.
    pub fn take(&self) -> Option<AlertEvent> {
        self.lock().take()
    }

    pub fn current(&self) -> Option<AlertEvent> {
        self.lock().clone()
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<AlertEvent>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
