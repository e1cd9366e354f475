//! Courier capacity record.

use super::{DeliveryDomainError, PersonId};
use serde::{Deserialize, Serialize};

/// A courier and the single-active-task capacity flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Courier {
    id: PersonId,
    name: String,
    has_active_task: bool,
}

impl Courier {
    /// Registers an idle courier.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::EmptyCourierName`] when the name is
    /// blank after trimming.
    pub fn new(name: impl Into<String>) -> Result<Self, DeliveryDomainError> {
        let raw = name.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DeliveryDomainError::EmptyCourierName);
        }
        Ok(Self {
            id: PersonId::new(),
            name: trimmed.to_owned(),
            has_active_task: false,
        })
    }

    /// Reconstructs a courier from persisted storage.
    #[must_use]
    pub const fn from_persisted(id: PersonId, name: String, has_active_task: bool) -> Self {
        Self {
            id,
            name,
            has_active_task,
        }
    }

    /// Returns the courier's person identifier.
    #[must_use]
    pub const fn id(&self) -> PersonId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` while the courier owns an active task.
    #[must_use]
    pub const fn has_active_task(&self) -> bool {
        self.has_active_task
    }

    /// Takes up the courier's only task slot.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::CourierBusy`] when the slot is taken.
    pub const fn occupy(&mut self) -> Result<(), DeliveryDomainError> {
        if self.has_active_task {
            return Err(DeliveryDomainError::CourierBusy(self.id));
        }
        self.has_active_task = true;
        Ok(())
    }

    /// Frees the task slot.
    pub const fn release(&mut self) {
        self.has_active_task = false;
    }
}
