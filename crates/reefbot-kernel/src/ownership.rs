//! [`OwnershipTable`] – which command holds which actuator.
//!
//! The table is the arbiter's single source of truth for exclusive access.
//! It is a plain map from [`ActuatorId`] to [`CommandHandle`], so by
//! construction no actuator can have two owners.  Claims are all-or-nothing:
//! a command either owns every actuator it requires or none of them.

use std::collections::{BTreeMap, BTreeSet};

use reefbot_types::ActuatorId;

use crate::command::CommandHandle;

/// Exclusive actuator → command map.
///
/// # Example
///
/// ```
/// use std::collections::BTreeSet;
/// use reefbot_kernel::ownership::OwnershipTable;
/// use reefbot_kernel::CommandHandle;
/// use reefbot_types::ActuatorId;
///
/// let drive = CommandHandle::from_index(0);
/// let mut table = OwnershipTable::new();
/// table.claim(drive, &BTreeSet::from([ActuatorId::Drivetrain]));
///
/// assert_eq!(table.owner(ActuatorId::Drivetrain), Some(drive));
/// assert_eq!(table.owner(ActuatorId::Roller), None);
/// ```
#[derive(Debug, Default)]
pub struct OwnershipTable {
    owners: BTreeMap<ActuatorId, CommandHandle>,
}

impl OwnershipTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current owner of `actuator`.
    pub fn owner(&self, actuator: ActuatorId) -> Option<CommandHandle> {
        self.owners.get(&actuator).copied()
    }

    /// Distinct commands other than `claimant` that currently hold any of
    /// `requirements`, in actuator order.
    pub fn conflicts(
        &self,
        claimant: CommandHandle,
        requirements: &BTreeSet<ActuatorId>,
    ) -> Vec<CommandHandle> {
        let mut found = Vec::new();
        for actuator in requirements {
            if let Some(&owner) = self.owners.get(actuator)
                && owner != claimant
                && !found.contains(&owner)
            {
                found.push(owner);
            }
        }
        found
    }

    /// `true` when none of `requirements` is held by anyone.
    pub fn all_free(&self, requirements: &BTreeSet<ActuatorId>) -> bool {
        requirements.iter().all(|a| !self.owners.contains_key(a))
    }

    /// Install `claimant` as owner of every actuator in `requirements`.
    ///
    /// The caller must have released every conflicting owner first; a claim
    /// over a foreign owner silently replaces it.
    pub fn claim(&mut self, claimant: CommandHandle, requirements: &BTreeSet<ActuatorId>) {
        for actuator in requirements {
            self.owners.insert(*actuator, claimant);
        }
    }

    /// Drop every actuator held by `holder`.  No-ops when it holds nothing.
    pub fn release(&mut self, holder: CommandHandle) {
        self.owners.retain(|_, owner| *owner != holder);
    }

    /// Actuators currently held by `holder`.
    pub fn held_by(&self, holder: CommandHandle) -> Vec<ActuatorId> {
        self.owners
            .iter()
            .filter(|(_, owner)| **owner == holder)
            .map(|(actuator, _)| *actuator)
            .collect()
    }

    /// Snapshot of every claimed actuator, in actuator order.
    pub fn iter(&self) -> impl Iterator<Item = (ActuatorId, CommandHandle)> + '_ {
        self.owners.iter().map(|(a, h)| (*a, *h))
    }
}
