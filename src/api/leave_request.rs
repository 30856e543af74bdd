use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::leave_request::{LeaveRequest, NewLeaveRequest},
    store::{AppState, LeaveQuery, Scope},
    workflow::{
        Actor, ApprovalWorkflowEngine, Decision, DerivedStatus, TrackStatus,
        balance::completes_approval,
    },
};

const DEFAULT_PER_PAGE: u64 = 10;
const MAX_PER_PAGE: u64 = 100;
// keeps `(page - 1) * per_page` inside u64
const MAX_PAGE: u64 = u64::MAX / MAX_PER_PAGE;

#[derive(Deserialize, IntoParams)]
pub struct LeaveFilter {
    /// Filter by employee ID
    #[param(example = 123)]
    pub employee_id: Option<u64>,
    /// Filter by overall status: pending, approved or denied
    #[param(value_type = Option<String>, example = "pending")]
    pub status: Option<DerivedStatus>,
    /// Pagination page number (start with 1)
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page, at most 100
    #[param(example = 10)]
    pub per_page: Option<u64>,
}

impl LeaveFilter {
    fn to_query(&self) -> LeaveQuery {
        LeaveQuery {
            employee_id: self.employee_id,
            status: self.status,
            page: self.page.unwrap_or(1).clamp(1, MAX_PAGE),
            per_page: self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }
}

/// A leave request as seen by the caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaveResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "Jane Doe", nullable = true)]
    pub employee_name: Option<String>,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "Annual", nullable = true)]
    pub leave_type_name: Option<String>,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// inclusive number of days
    #[schema(example = 3)]
    pub duration: i64,
    pub reason: String,
    pub team_lead_status: TrackStatus,
    pub hr_status: TrackStatus,
    /// overall status derived from both tracks
    pub status: DerivedStatus,
    #[schema(example = "Pending")]
    pub status_label: String,
    #[schema(example = "#ffc107")]
    pub status_color: String,
    pub is_open: bool,
    /// whether the caller owns a track on this request
    pub can_act: bool,
    /// decisions the caller may take right now
    pub available_actions: Vec<Decision>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl LeaveResponse {
    pub fn for_actor(leave: LeaveRequest, actor: &Actor) -> Self {
        let status = leave.status();
        let subject = leave.subject();
        let can_act = ApprovalWorkflowEngine::can_act(&subject, actor);
        let available_actions = ApprovalWorkflowEngine::legal_actions(&subject, actor)
            .into_iter()
            .collect();
        let duration = leave.duration();

        Self {
            id: leave.id,
            employee_id: leave.employee_id,
            employee_name: leave.employee_name,
            leave_type_id: leave.leave_type_id,
            leave_type_name: leave.leave_type_name,
            start_date: leave.start_date,
            end_date: leave.end_date,
            duration,
            reason: leave.reason,
            team_lead_status: leave.team_lead_status,
            hr_status: leave.hr_status,
            status,
            status_label: status.label().to_string(),
            status_color: status.color().to_string(),
            is_open: !status.is_terminal(),
            can_act,
            available_actions,
            created_at: leave.created_at,
            updated_at: leave.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveResponse>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

/// Body of `change-decision`.
#[derive(Deserialize, ToSchema)]
pub struct ChangeDecision {
    /// new value for the caller's own track: approved or denied
    pub status: TrackStatus,
}

async fn find_visible(
    state: &AppState,
    actor: &Actor,
    leave_id: u64,
) -> Result<LeaveRequest, AppError> {
    state
        .leaves
        .find(leave_id)
        .await?
        .filter(|leave| Scope::for_actor(actor).includes(leave.employee_id, &leave.department_leads))
        .ok_or_else(|| AppError::not_found("Leave request"))
}

/// Runs one decision through the workflow and stores it.
async fn decide(
    auth: &AuthUser,
    state: &AppState,
    leave_id: u64,
    decision: Decision,
) -> Result<LeaveResponse, AppError> {
    let actor = auth.actor();

    let leave = state
        .leaves
        .find(leave_id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave request"))?;

    let transition = ApprovalWorkflowEngine::apply_decision(&leave.subject(), &actor, decision)
        .inspect_err(|e| {
            info!(leave_id, actor_id = actor.id, ?decision, error = %e, "Decision rejected")
        })?;

    // only the decision completing approval draws on the balance
    let stored = if completes_approval(leave.tracks(), &transition) {
        state
            .leaves
            .set_track_covered(leave_id, &transition, leave.duration())
            .await
            .inspect_err(|e| info!(leave_id, actor_id = actor.id, error = %e, "Approval not covered"))?
    } else {
        state.leaves.set_track(leave_id, &transition).await?
    };

    if !stored {
        warn!(leave_id, track = %transition.track, "Concurrent decision detected");
        return Err(AppError::Conflict(
            "Leave request was changed by another decision, reload and retry".to_string(),
        ));
    }

    info!(
        leave_id,
        actor_id = actor.id,
        actor = %auth.username,
        track = %transition.track,
        from = %transition.from,
        to = %transition.to,
        "Leave decision stored"
    );

    let updated = state
        .leaves
        .find(leave_id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave request"))?;
    Ok(LeaveResponse::for_actor(updated, &actor))
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-requests",
    request_body(
        content = NewLeaveRequest,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveResponse),
        (status = 400, description = "Invalid dates or unknown leave type"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<NewLeaveRequest>,
) -> Result<HttpResponse, AppError> {
    if payload.start_date > payload.end_date {
        return Err(AppError::BadRequest(
            "start_date cannot be after end_date".to_string(),
        ));
    }
    if payload.start_date < Utc::now().date_naive() {
        return Err(AppError::BadRequest(
            "start_date cannot be in the past".to_string(),
        ));
    }
    if state.leave_types.find(payload.leave_type_id).await?.is_none() {
        return Err(AppError::BadRequest("Unknown leave type".to_string()));
    }

    let id = state.leaves.create(auth.user_id, &payload).await?;
    info!(leave_id = id, employee_id = auth.user_id, "Leave request submitted");

    let leave = state
        .leaves
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave request"))?;
    Ok(HttpResponse::Created().json(LeaveResponse::for_actor(leave, &auth.actor())))
}

/* =========================
Decisions
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-requests/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "ID of the leave request")),
    responses(
        (status = 200, description = "Own track approved", body = LeaveResponse),
        (status = 400, description = "Illegal transition or insufficient balance"),
        (status = 403, description = "Caller does not own a track on this request"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request already closed or changed concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let leave = decide(&auth, &state, path.into_inner(), Decision::Approve).await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    post,
    path = "/api/leave-requests/{leave_id}/deny",
    params(("leave_id" = u64, Path, description = "ID of the leave request")),
    responses(
        (status = 200, description = "Own track denied", body = LeaveResponse),
        (status = 400, description = "Illegal transition"),
        (status = 403, description = "Caller does not own a track on this request"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request already closed or changed concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn deny_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let leave = decide(&auth, &state, path.into_inner(), Decision::Deny).await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    post,
    path = "/api/leave-requests/{leave_id}/change-decision",
    params(("leave_id" = u64, Path, description = "ID of the leave request")),
    request_body = ChangeDecision,
    responses(
        (status = 200, description = "Own decision reversed", body = LeaveResponse),
        (status = 400, description = "Illegal transition or insufficient balance"),
        (status = 403, description = "Caller does not own a track on this request"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request already closed or changed concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn change_decision(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<ChangeDecision>,
) -> Result<HttpResponse, AppError> {
    let decision = Decision::change_to(payload.status).ok_or_else(|| {
        AppError::BadRequest("status must be approved or denied".to_string())
    })?;
    let leave = decide(&auth, &state, path.into_inner(), decision).await?;
    Ok(HttpResponse::Ok().json(leave))
}

/* =========================
Read
========================= */
#[utoipa::path(
    get,
    path = "/api/leave-requests/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to fetch")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let actor = auth.actor();
    let leave = find_visible(&state, &actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(LeaveResponse::for_actor(leave, &actor)))
}

/// HR sees every request, team leads their own and their department's,
/// employees only their own.
#[utoipa::path(
    get,
    path = "/api/leave-requests",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, AppError> {
    let actor = auth.actor();
    let query = query.to_query();

    let (rows, total) = state.leaves.list(Scope::for_actor(&actor), &query).await?;
    let data = rows
        .into_iter()
        .map(|leave| LeaveResponse::for_actor(leave, &actor))
        .collect();

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page: query.page,
        per_page: query.per_page,
        total,
    }))
}
