use crate::api::department::AssignLead;
use crate::api::leave_balance::{BalanceInput, BalanceResponse};
use crate::api::leave_request::{ChangeDecision, LeaveListResponse, LeaveResponse};
use crate::auth::handlers::TokenPair;
use crate::model::department::{Department, DepartmentInput, NewDepartment};
use crate::model::leave_request::NewLeaveRequest;
use crate::model::leave_type::{LeaveType, LeaveTypeInput};
use crate::model::role::Role;
use crate::model::user::{NewUser, Profile, UpdateUser};
use crate::models::LoginReqDto;
use crate::workflow::{Decision, DerivedStatus, TrackStatus};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Leave API",
        version = "1.0.0",
        description = r#"
## Leave approval service

Employees submit leave requests. Each request runs through two independent
approval tracks:

- **Team lead track**, decided by a lead of the employee's department
- **HR track**, decided by any HR user

A denial on either track denies the request. It is approved once both
tracks approve. While a request is still pending, either decider may
reverse their own decision with `change-decision`.

Every leave response carries the derived `status` together with the
actions the caller may take right now (`available_actions`).

### 🔐 Security
All `/api` endpoints expect a **JWT Bearer** access token from `/auth/login`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::deny_leave,
        crate::api::leave_request::change_decision,

        crate::api::leave_type::list_leave_types,
        crate::api::leave_type::create_leave_type,
        crate::api::leave_type::update_leave_type,
        crate::api::leave_type::delete_leave_type,

        crate::api::leave_balance::list_balances,
        crate::api::leave_balance::upsert_balance,

        crate::api::department::list_departments,
        crate::api::department::get_department,
        crate::api::department::create_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,
        crate::api::department::assign_lead,

        crate::api::user::list_users,
        crate::api::user::get_user,
        crate::api::user::create_user,
        crate::api::user::update_user
    ),
    components(
        schemas(
            LoginReqDto,
            TokenPair,
            Profile,
            Role,
            NewLeaveRequest,
            LeaveResponse,
            LeaveListResponse,
            ChangeDecision,
            Decision,
            TrackStatus,
            DerivedStatus,
            LeaveType,
            LeaveTypeInput,
            BalanceInput,
            BalanceResponse,
            Department,
            NewDepartment,
            DepartmentInput,
            AssignLead,
            NewUser,
            UpdateUser
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token APIs"),
        (name = "Leave", description = "Leave requests and approval decisions"),
        (name = "Leave Type", description = "Leave type catalogue"),
        (name = "Leave Balance", description = "Leave allotments per employee"),
        (name = "Department", description = "Departments and their leads"),
        (name = "User", description = "User accounts, managed by HR"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
