use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::{leave_balance::LeaveBalance, role::Role},
    store::{AppState, Scope},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
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
    /// allotted days
    #[schema(example = 12.0)]
    pub balance: f64,
    /// days taken by approved requests
    #[schema(example = 3)]
    pub used: i64,
    #[schema(example = 9.0)]
    pub remaining: f64,
}

impl From<LeaveBalance> for BalanceResponse {
    fn from(b: LeaveBalance) -> Self {
        let remaining = b.snapshot().remaining();
        Self {
            id: b.id,
            employee_id: b.employee_id,
            employee_name: b.employee_name,
            leave_type_id: b.leave_type_id,
            leave_type_name: b.leave_type_name,
            balance: b.balance,
            used: b.used,
            remaining,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct BalanceInput {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = 12.0)]
    pub balance: f64,
}

/// HR may set any allotment, a team lead only those of employees in a
/// department they lead.
async fn ensure_may_allot(
    auth: &AuthUser,
    state: &AppState,
    employee_id: u64,
) -> Result<(), AppError> {
    match auth.role {
        Role::Hr => Ok(()),
        Role::Employee => Err(AppError::Forbidden(
            "Employees cannot set leave balances".to_string(),
        )),
        Role::TeamLead => {
            let employee = state
                .users
                .find(employee_id)
                .await?
                .ok_or_else(|| AppError::not_found("Employee"))?;

            let leads = match employee.department_id {
                Some(id) => state
                    .departments
                    .find(id)
                    .await?
                    .map(|d| d.leads)
                    .unwrap_or_default(),
                None => Vec::new(),
            };

            if leads.contains(&auth.user_id) {
                Ok(())
            } else {
                Err(AppError::Forbidden(
                    "Employee is not in a department you lead".to_string(),
                ))
            }
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/leave-balances",
    responses(
        (status = 200, description = "Balances visible to the caller", body = [BalanceResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Balance"
)]
pub async fn list_balances(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let scope = Scope::for_actor(&auth.actor());
    let balances: Vec<BalanceResponse> = state
        .balances
        .list(scope)
        .await?
        .into_iter()
        .map(BalanceResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(balances))
}

#[utoipa::path(
    post,
    path = "/api/leave-balances",
    request_body = BalanceInput,
    responses(
        (status = 200, description = "Allotment stored", body = BalanceResponse),
        (status = 400, description = "Negative balance"),
        (status = 403, description = "Caller may not set this allotment"),
        (status = 409, description = "Unknown employee or leave type")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Balance"
)]
pub async fn upsert_balance(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<BalanceInput>,
) -> Result<HttpResponse, AppError> {
    if !payload.balance.is_finite() || payload.balance < 0.0 {
        return Err(AppError::BadRequest(
            "balance must be a non-negative number".to_string(),
        ));
    }
    ensure_may_allot(&auth, &state, payload.employee_id).await?;

    state
        .balances
        .upsert(payload.employee_id, payload.leave_type_id, payload.balance)
        .await?;
    info!(
        employee_id = payload.employee_id,
        leave_type_id = payload.leave_type_id,
        balance = payload.balance,
        by = auth.user_id,
        "Leave balance set"
    );

    let stored = state
        .balances
        .find(payload.employee_id, payload.leave_type_id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave balance"))?;
    Ok(HttpResponse::Ok().json(BalanceResponse::from(stored)))
}
