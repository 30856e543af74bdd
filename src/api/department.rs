use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::{
        department::{Department, DepartmentInput, NewDepartment},
        role::Role,
    },
    store::{AppState, Scope},
};

#[derive(Deserialize, ToSchema)]
pub struct AssignLead {
    #[schema(example = 7)]
    pub user_id: u64,
}

/// Leads are promoted to team lead, which HR users must never be.
async fn ensure_assignable(state: &AppState, user_id: u64) -> Result<(), AppError> {
    let user = state
        .users
        .find(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    if user.role == Role::Hr {
        return Err(AppError::BadRequest(
            "HR users cannot lead a department".to_string(),
        ));
    }
    Ok(())
}

async fn fetch(state: &AppState, id: u64) -> Result<Department, AppError> {
    state
        .departments
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found("Department"))
}

#[utoipa::path(
    get,
    path = "/api/departments",
    responses(
        (status = 200, description = "Departments visible to the caller", body = [Department]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn list_departments(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let scope = Scope::for_actor(&auth.actor());
    Ok(HttpResponse::Ok().json(state.departments.list(scope).await?))
}

#[utoipa::path(
    get,
    path = "/api/departments/{id}",
    params(("id" = u64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department found", body = Department),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn get_department(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let scope = Scope::for_actor(&auth.actor());

    // non-HR callers only see departments in their listing
    if scope != Scope::All
        && !state
            .departments
            .list(scope)
            .await?
            .iter()
            .any(|d| d.id == id)
    {
        return Err(AppError::not_found("Department"));
    }

    Ok(HttpResponse::Ok().json(fetch(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = NewDepartment,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Missing name"),
        (status = 403, description = "HR only"),
        (status = 409, description = "Name already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn create_department(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<NewDepartment>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr()?;
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    if let Some(lead_id) = payload.lead_id {
        ensure_assignable(&state, lead_id).await?;
    }

    let id = state.departments.create(&payload).await?;
    info!(department_id = id, name = %payload.name, "Department created");

    Ok(HttpResponse::Created().json(fetch(&state, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/departments/{id}",
    params(("id" = u64, Path, description = "Department ID")),
    request_body = DepartmentInput,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 400, description = "Missing name"),
        (status = 403, description = "HR only"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Name already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn update_department(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<DepartmentInput>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr()?;
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    let id = path.into_inner();

    if !state.departments.update(id, &payload).await? {
        return Err(AppError::not_found("Department"));
    }
    info!(department_id = id, name = %payload.name, "Department updated");

    Ok(HttpResponse::Ok().json(fetch(&state, id).await?))
}

/// Members stay in the system without a department. Their open requests
/// lose the team lead decider until they join another one.
#[utoipa::path(
    delete,
    path = "/api/departments/{id}",
    params(("id" = u64, Path, description = "Department ID")),
    responses(
        (status = 204, description = "Department deleted"),
        (status = 403, description = "HR only"),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn delete_department(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr()?;
    let id = path.into_inner();

    if !state.departments.delete(id).await? {
        return Err(AppError::not_found("Department"));
    }
    info!(department_id = id, by = %auth.username, "Department deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// Makes the user a team lead of this department. A user leads at most one
/// department, so any other lead assignment of theirs is dropped.
#[utoipa::path(
    post,
    path = "/api/departments/{id}/assign-lead",
    params(("id" = u64, Path, description = "Department ID")),
    request_body = AssignLead,
    responses(
        (status = 200, description = "Lead assigned", body = Department),
        (status = 400, description = "User is an HR user"),
        (status = 403, description = "HR only"),
        (status = 404, description = "Department or user not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn assign_lead(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<AssignLead>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr()?;
    let id = path.into_inner();
    ensure_assignable(&state, payload.user_id).await?;

    if !state.departments.assign_lead(id, payload.user_id).await? {
        return Err(AppError::not_found("Department"));
    }
    info!(department_id = id, user_id = payload.user_id, "Department lead assigned");

    Ok(HttpResponse::Ok().json(fetch(&state, id).await?))
}
