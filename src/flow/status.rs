//! Side effects of a status change.

use crate::storage::ProjectStatus;

/// Work the caller must perform after a status change is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEffect {
    /// Start (or restart) the reminder chain for the task.
    ArmReminder,
    /// Stop any pending reminder for the task.
    CancelReminder,
    /// Tell the counterparts about the new status.
    NotifyPartners {
        from: ProjectStatus,
        to: ProjectStatus,
    },
}

/// Effects of moving a task from `from` to `to`.
///
/// Only the initial status keeps a reminder alive. Counterparts hear about
/// every operator selection, including re-selecting the current status.
#[must_use]
pub fn transition(from: ProjectStatus, to: ProjectStatus) -> Vec<StatusEffect> {
    let reminder = if to == ProjectStatus::INITIAL {
        StatusEffect::ArmReminder
    } else {
        StatusEffect::CancelReminder
    };
    vec![reminder, StatusEffect::NotifyPartners { from, to }]
}
