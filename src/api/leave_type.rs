use actix_web::{HttpResponse, web};
use tracing::info;

use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::leave_type::LeaveTypeInput,
    store::AppState,
};

fn validate(input: &LeaveTypeInput) -> Result<(), AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/leave-types",
    responses(
        (status = 200, description = "All leave types", body = [crate::model::leave_type::LeaveType]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Type"
)]
pub async fn list_leave_types(
    _auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.leave_types.list().await?))
}

#[utoipa::path(
    post,
    path = "/api/leave-types",
    request_body = LeaveTypeInput,
    responses(
        (status = 201, description = "Leave type created", body = crate::model::leave_type::LeaveType),
        (status = 400, description = "Missing name"),
        (status = 403, description = "HR only"),
        (status = 409, description = "Name already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Type"
)]
pub async fn create_leave_type(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<LeaveTypeInput>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr()?;
    validate(&payload)?;

    let id = state.leave_types.create(&payload).await?;
    info!(leave_type_id = id, name = %payload.name, "Leave type created");

    let created = state
        .leave_types
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave type"))?;
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    put,
    path = "/api/leave-types/{id}",
    params(("id" = u64, Path, description = "Leave type ID")),
    request_body = LeaveTypeInput,
    responses(
        (status = 200, description = "Leave type updated", body = crate::model::leave_type::LeaveType),
        (status = 403, description = "HR only"),
        (status = 404, description = "Leave type not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Type"
)]
pub async fn update_leave_type(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<LeaveTypeInput>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr()?;
    validate(&payload)?;
    let id = path.into_inner();

    if !state.leave_types.update(id, &payload).await? {
        return Err(AppError::not_found("Leave type"));
    }

    let updated = state
        .leave_types
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave type"))?;
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/leave-types/{id}",
    params(("id" = u64, Path, description = "Leave type ID")),
    responses(
        (status = 204, description = "Leave type deleted"),
        (status = 403, description = "HR only"),
        (status = 404, description = "Leave type not found"),
        (status = 409, description = "Leave type is referenced by requests or balances")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Type"
)]
pub async fn delete_leave_type(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr()?;
    let id = path.into_inner();

    if !state.leave_types.delete(id).await? {
        return Err(AppError::not_found("Leave type"));
    }
    info!(leave_type_id = id, "Leave type deleted");
    Ok(HttpResponse::NoContent().finish())
}
