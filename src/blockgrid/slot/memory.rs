use super::SlotBackend;
use crate::error::{BlockError, Result};
use std::cell::RefCell;
use std::collections::HashMap;

/// In-memory slot storage for testing.
///
/// Uses `RefCell` for interior mutability since the store is single-threaded.
#[derive(Default)]
pub struct MemSlot {
    slots: RefCell<HashMap<String, String>>,
    simulate_read_error: RefCell<bool>,
    simulate_write_error: RefCell<bool>,
}

impl MemSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose `key` already holds `value`.
    pub fn with_value(key: &str, value: impl Into<String>) -> Self {
        let slot = Self::new();
        slot.slots
            .borrow_mut()
            .insert(key.to_string(), value.into());
        slot
    }

    pub fn set_simulate_read_error(&self, simulate: bool) {
        *self.simulate_read_error.borrow_mut() = simulate;
    }

    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    /// Raw stored value, bypassing error simulation.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.slots.borrow().get(key).cloned()
    }
}

impl SlotBackend for MemSlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        if *self.simulate_read_error.borrow() {
            return Err(BlockError::PersistenceUnavailable(
                "Simulated read error".to_string(),
            ));
        }
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        if *self.simulate_write_error.borrow() {
            return Err(BlockError::PersistenceUnavailable(
                "Simulated write error".to_string(),
            ));
        }
        self.slots
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        if *self.simulate_write_error.borrow() {
            return Err(BlockError::PersistenceUnavailable(
                "Simulated write error".to_string(),
            ));
        }
        self.slots.borrow_mut().remove(key);
        Ok(())
    }

    fn describe(&self, key: &str) -> String {
        format!("memory://{}", key)
    }
}
