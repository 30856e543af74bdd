//! Two-track leave approval rules.
//!
//! A request carries a team-lead track and an HR track. Each track starts
//! `pending`, moves once to `approved` or `denied` and may afterwards be
//! flipped between the two terminal values, but never back to `pending`.
//! Denial on either track dominates; approval needs both tracks.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::status::{DerivedStatus, Track, TrackStatus, Tracks};
use crate::model::role::Role;

/// The user viewing or acting on a request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Actor {
    pub id: u64,
    pub role: Role,
}

impl Actor {
    pub fn new(id: u64, role: Role) -> Self {
        Self { id, role }
    }
}

/// A decision an actor can take on their own track.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Deny,
    ChangeToApproved,
    ChangeToDenied,
}

impl Decision {
    /// Track value the decision moves to.
    pub fn target(self) -> TrackStatus {
        match self {
            Decision::Approve | Decision::ChangeToApproved => TrackStatus::Approved,
            Decision::Deny | Decision::ChangeToDenied => TrackStatus::Denied,
        }
    }

    /// Decision that reverses a terminal track value to `target`.
    pub fn change_to(target: TrackStatus) -> Option<Self> {
        match target {
            TrackStatus::Approved => Some(Decision::ChangeToApproved),
            TrackStatus::Denied => Some(Decision::ChangeToDenied),
            TrackStatus::Pending => None,
        }
    }
}

/// Validated change of one track, ready to be written by a repository.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Transition {
    pub track: Track,
    pub from: TrackStatus,
    pub to: TrackStatus,
}

impl Transition {
    /// Tracks as they will read once the transition is stored.
    pub fn apply(&self, tracks: Tracks) -> Tracks {
        tracks.with(self.track, self.to)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum WorkflowError {
    #[error("you are not allowed to decide on this leave request")]
    Unauthorized,
    #[error("leave request is already {0}")]
    NotOpen(DerivedStatus),
    #[error("cannot {decision:?} on the {track} track while it is {current}")]
    IllegalTransition {
        track: Track,
        current: TrackStatus,
        decision: Decision,
    },
}

/// Read-only view of a request as the engine needs it.
///
/// `department_leads` is the lead list of the requesting employee's
/// department, read together with the request.
#[derive(Debug, Copy, Clone)]
pub struct ApprovalSubject<'a> {
    pub tracks: Tracks,
    pub department_leads: &'a [u64],
}

impl<'a> ApprovalSubject<'a> {
    pub fn new(tracks: Tracks, department_leads: &'a [u64]) -> Self {
        Self {
            tracks,
            department_leads,
        }
    }
}

/// Stateless evaluator for the approval rules.
pub struct ApprovalWorkflowEngine;

impl ApprovalWorkflowEngine {
    pub fn derive_status(tracks: Tracks) -> DerivedStatus {
        if tracks.team_lead == TrackStatus::Denied || tracks.hr == TrackStatus::Denied {
            DerivedStatus::Denied
        } else if tracks.team_lead == TrackStatus::Approved && tracks.hr == TrackStatus::Approved {
            DerivedStatus::Approved
        } else {
            DerivedStatus::Pending
        }
    }

    pub fn is_open(tracks: Tracks) -> bool {
        !Self::derive_status(tracks).is_terminal()
    }

    /// Track the actor decides on for this request, if any.
    pub fn owned_track(subject: &ApprovalSubject<'_>, actor: &Actor) -> Option<Track> {
        match actor.role {
            Role::Hr => Some(Track::Hr),
            Role::TeamLead if subject.department_leads.contains(&actor.id) => Some(Track::TeamLead),
            Role::TeamLead | Role::Employee => None,
        }
    }

    pub fn can_act(subject: &ApprovalSubject<'_>, actor: &Actor) -> bool {
        Self::owned_track(subject, actor).is_some()
    }

    pub fn legal_actions(subject: &ApprovalSubject<'_>, actor: &Actor) -> BTreeSet<Decision> {
        let Some(track) = Self::owned_track(subject, actor) else {
            return BTreeSet::new();
        };
        if !Self::is_open(subject.tracks) {
            return BTreeSet::new();
        }
        Self::actions_from(subject.tracks.get(track))
    }

    /// Checks `decision` against the actor's own track and returns the
    /// transition to store. Nothing is mutated here.
    pub fn apply_decision(
        subject: &ApprovalSubject<'_>,
        actor: &Actor,
        decision: Decision,
    ) -> Result<Transition, WorkflowError> {
        let track = Self::owned_track(subject, actor).ok_or(WorkflowError::Unauthorized)?;

        let status = Self::derive_status(subject.tracks);
        if status.is_terminal() {
            return Err(WorkflowError::NotOpen(status));
        }

        let current = subject.tracks.get(track);
        if !Self::actions_from(current).contains(&decision) {
            return Err(WorkflowError::IllegalTransition {
                track,
                current,
                decision,
            });
        }

        Ok(Transition {
            track,
            from: current,
            to: decision.target(),
        })
    }

    fn actions_from(current: TrackStatus) -> BTreeSet<Decision> {
        match current {
            TrackStatus::Pending => BTreeSet::from([Decision::Approve, Decision::Deny]),
            TrackStatus::Denied => BTreeSet::from([Decision::ChangeToApproved]),
            TrackStatus::Approved => BTreeSet::from([Decision::ChangeToDenied]),
        }
    }
}
