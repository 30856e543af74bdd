use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::workflow::{
    ApprovalSubject, ApprovalWorkflowEngine, DerivedStatus, TrackStatus, Tracks,
    balance::leave_days,
};

/// A leave request as read from storage, together with the lead list of
/// the requesting employee's department.
#[derive(Debug, Clone)]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub employee_name: Option<String>,
    pub leave_type_id: u64,
    pub leave_type_name: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub team_lead_status: TrackStatus,
    pub hr_status: TrackStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub department_leads: Vec<u64>,
}

impl LeaveRequest {
    pub fn tracks(&self) -> Tracks {
        Tracks::new(self.team_lead_status, self.hr_status)
    }

    pub fn subject(&self) -> ApprovalSubject<'_> {
        ApprovalSubject::new(self.tracks(), &self.department_leads)
    }

    pub fn status(&self) -> DerivedStatus {
        ApprovalWorkflowEngine::derive_status(self.tracks())
    }

    pub fn duration(&self) -> i64 {
        leave_days(self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewLeaveRequest {
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family trip")]
    #[serde(default)]
    pub reason: String,
}
