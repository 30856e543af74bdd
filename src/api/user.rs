use actix_web::{HttpResponse, web};
use tracing::{error, info};

use crate::{
    auth::{auth::AuthUser, password::hash_password},
    error::AppError,
    model::{
        role::Role,
        user::{NewUser, Profile, UpdateUser},
    },
    store::{AppState, Scope},
};

fn hash(password: &str) -> Result<String, AppError> {
    hash_password(password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        AppError::Internal(anyhow::anyhow!("password hashing failed"))
    })
}

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

async fn ensure_department(state: &AppState, department_id: Option<u64>) -> Result<(), AppError> {
    if let Some(id) = department_id {
        if state.departments.find(id).await?.is_none() {
            return Err(AppError::BadRequest("Unknown department".to_string()));
        }
    }
    Ok(())
}

/// HR sees everyone, team leads themselves and the members of the
/// department they lead.
fn user_scope(auth: &AuthUser) -> Result<Scope, AppError> {
    if auth.role == Role::Employee {
        return Err(AppError::Forbidden(
            "Employees cannot browse users".to_string(),
        ));
    }
    Ok(Scope::for_actor(&auth.actor()))
}

async fn fetch(state: &AppState, id: u64) -> Result<Profile, AppError> {
    state
        .users
        .find(id)
        .await?
        .map(Profile::from)
        .ok_or_else(|| AppError::not_found("User"))
}

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Users visible to the caller", body = [Profile]),
        (status = 403, description = "Employees cannot browse users")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn list_users(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let scope = user_scope(&auth)?;
    let users: Vec<Profile> = state
        .users
        .list(scope)
        .await?
        .into_iter()
        .map(Profile::from)
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = Profile),
        (status = 403, description = "Employees cannot browse users"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn get_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let scope = user_scope(&auth)?;
    let id = path.into_inner();

    let user = state
        .users
        .list(scope)
        .await?
        .into_iter()
        .find(|u| u.id == id)
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(HttpResponse::Ok().json(Profile::from(user)))
}

/// A team lead created into a department becomes one of its leads.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = Profile),
        (status = 400, description = "Missing field or unknown department"),
        (status = 403, description = "HR only"),
        (status = 409, description = "Username or email already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn create_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<NewUser>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr()?;
    require_text(&payload.username, "username")?;
    require_text(&payload.full_name, "full_name")?;
    require_text(&payload.email, "email")?;
    if payload.password.is_empty() {
        return Err(AppError::BadRequest("password is required".to_string()));
    }
    ensure_department(&state, payload.department_id).await?;

    let id = state.users.create(&payload, &hash(&payload.password)?).await?;
    info!(user_id = id, username = %payload.username, role = %payload.role, by = %auth.username, "User created");

    Ok(HttpResponse::Created().json(fetch(&state, id).await?))
}

/// Changing the role away from team lead also drops the user's lead
/// assignment.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = u64, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = Profile),
        (status = 400, description = "Blank field or unknown department"),
        (status = 403, description = "HR only"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn update_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<UpdateUser>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr()?;
    let id = path.into_inner();
    if let Some(full_name) = &payload.full_name {
        require_text(full_name, "full_name")?;
    }
    if let Some(email) = &payload.email {
        require_text(email, "email")?;
    }
    ensure_department(&state, payload.department_id).await?;

    let password_hash = match payload.password.as_deref() {
        Some("") => return Err(AppError::BadRequest("password cannot be empty".to_string())),
        Some(password) => Some(hash(password)?),
        None => None,
    };

    if !state
        .users
        .update(id, &payload, password_hash.as_deref())
        .await?
    {
        return Err(AppError::not_found("User"));
    }
    info!(user_id = id, by = %auth.username, "User updated");

    Ok(HttpResponse::Ok().json(fetch(&state, id).await?))
}
