//! Resolved caller identity and role capabilities.
//!
//! Authentication happens outside this crate. Services receive a [`Caller`]
//! that already carries the person identifier and the role granted to it,
//! and ask capability questions instead of inspecting person subtypes.

use super::{DeliveryDomainError, PersonId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role granted to an authenticated person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Back-office administrator.
    Admin,
    /// Courier executing delivery tasks.
    Courier,
    /// Customer placing orders.
    Customer,
}

impl Role {
    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Courier => "courier",
            Self::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The person on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Caller {
    person_id: PersonId,
    role: Role,
}

impl Caller {
    /// Creates a caller with an explicit role.
    #[must_use]
    pub const fn new(person_id: PersonId, role: Role) -> Self {
        Self { person_id, role }
    }

    /// Creates an administrator caller.
    #[must_use]
    pub const fn admin(person_id: PersonId) -> Self {
        Self::new(person_id, Role::Admin)
    }

    /// Creates a courier caller.
    #[must_use]
    pub const fn courier(person_id: PersonId) -> Self {
        Self::new(person_id, Role::Courier)
    }

    /// Creates a customer caller.
    #[must_use]
    pub const fn customer(person_id: PersonId) -> Self {
        Self::new(person_id, Role::Customer)
    }

    /// Returns the caller's person identifier.
    #[must_use]
    pub const fn person_id(&self) -> PersonId {
        self.person_id
    }

    /// Returns the caller's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns `true` when the caller holds admin privileges.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Returns the caller's identifier when acting as a courier.
    #[must_use]
    pub const fn courier_id(&self) -> Option<PersonId> {
        match self.role {
            Role::Courier => Some(self.person_id),
            Role::Admin | Role::Customer => None,
        }
    }

    /// Returns the caller's identifier when it holds admin privileges.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::AdminRequired`] for any other role.
    pub const fn require_admin(&self) -> Result<PersonId, DeliveryDomainError> {
        if self.is_admin() {
            Ok(self.person_id)
        } else {
            Err(DeliveryDomainError::AdminRequired(self.person_id))
        }
    }

    /// Returns the caller's courier identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::CourierRequired`] for any other role.
    pub const fn require_courier(&self) -> Result<PersonId, DeliveryDomainError> {
        match self.courier_id() {
            Some(courier_id) => Ok(courier_id),
            None => Err(DeliveryDomainError::CourierRequired(self.person_id)),
        }
    }
}
