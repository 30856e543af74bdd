use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Value of a single approval track.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrackStatus {
    Pending,
    Approved,
    Denied,
}

impl TrackStatus {
    #[cfg(test)]
    pub const ALL: [TrackStatus; 3] = [Self::Pending, Self::Approved, Self::Denied];
}

/// The two independent approval pipelines of a leave request.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Track {
    TeamLead,
    Hr,
}

/// Both track values of one request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Tracks {
    pub team_lead: TrackStatus,
    pub hr: TrackStatus,
}

impl Tracks {
    pub fn new(team_lead: TrackStatus, hr: TrackStatus) -> Self {
        Self { team_lead, hr }
    }

    pub fn get(&self, track: Track) -> TrackStatus {
        match track {
            Track::TeamLead => self.team_lead,
            Track::Hr => self.hr,
        }
    }

    /// Returns a copy with `track` set to `status`.
    pub fn with(self, track: Track, status: TrackStatus) -> Self {
        match track {
            Track::TeamLead => Self {
                team_lead: status,
                ..self
            },
            Track::Hr => Self { hr: status, ..self },
        }
    }
}

impl Default for Tracks {
    fn default() -> Self {
        Self::new(TrackStatus::Pending, TrackStatus::Pending)
    }
}

/// Human-facing status computed from both tracks.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DerivedStatus {
    Pending,
    Approved,
    Denied,
}

impl DerivedStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Denied => "Denied",
        }
    }

    /// Badge color used by the console.
    pub fn color(self) -> &'static str {
        match self {
            Self::Pending => "#ffc107",
            Self::Approved => "#28a745",
            Self::Denied => "#dc3545",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}
