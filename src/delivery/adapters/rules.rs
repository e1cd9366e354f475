//! Configuration-driven implementation of the [`StatusRules`] port.

use crate::delivery::{
    domain::{ParcelStatus, TaskStatus},
    ports::{StatusRules, StatusRulesConfig},
};

/// Status rules backed by a [`StatusRulesConfig`] table.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredStatusRules {
    config: StatusRulesConfig,
}

impl ConfiguredStatusRules {
    /// Creates rules with the default tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates rules with custom tables.
    #[must_use]
    pub const fn with_config(config: StatusRulesConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &StatusRulesConfig {
        &self.config
    }
}

impl StatusRules for ConfiguredStatusRules {
    fn courier_may_transition(&self, from: ParcelStatus, to: ParcelStatus) -> bool {
        !from.is_final() && self.config.allows_transition(from, to)
    }

    fn admin_may_set(&self, status: TaskStatus) -> bool {
        self.config.admin_updatable.contains(&status)
    }
}
