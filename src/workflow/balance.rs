use chrono::NaiveDate;

use super::engine::{ApprovalWorkflowEngine, Transition};
use super::status::{DerivedStatus, Tracks};

/// Inclusive number of calendar days between `start` and `end`.
pub fn leave_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Allotment and usage of one employee for one leave type.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BalanceSnapshot {
    pub balance: f64,
    pub used: f64,
}

impl BalanceSnapshot {
    pub fn remaining(&self) -> f64 {
        self.balance - self.used
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BalanceError {
    #[error("no leave balance is set up for this employee and leave type")]
    Missing,
    #[error("not enough leave days: {remaining} remaining, {requested} requested")]
    Insufficient { remaining: f64, requested: i64 },
}

/// Whether storing `transition` completes the approval of a request that
/// was not approved before. Only that step consumes balance.
pub fn completes_approval(tracks: Tracks, transition: &Transition) -> bool {
    ApprovalWorkflowEngine::derive_status(tracks) != DerivedStatus::Approved
        && ApprovalWorkflowEngine::derive_status(transition.apply(tracks))
            == DerivedStatus::Approved
}

/// Checks that `days` fit into the remaining allotment.
pub fn ensure_covered(snapshot: Option<BalanceSnapshot>, days: i64) -> Result<(), BalanceError> {
    let snapshot = snapshot.ok_or(BalanceError::Missing)?;
    let remaining = snapshot.remaining();
    if remaining < days as f64 {
        return Err(BalanceError::Insufficient {
            remaining,
            requested: days,
        });
    }
    Ok(())
}
