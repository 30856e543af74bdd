//! Persistence seams.
//!
//! Handlers only see these traits. `MySqlStore` implements them on top of
//! the sqlx pool; the in-memory store backs the handler tests.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::AppError;
use crate::model::{
    department::{Department, DepartmentInput, NewDepartment},
    leave_balance::LeaveBalance,
    leave_request::{LeaveRequest, NewLeaveRequest},
    leave_type::{LeaveType, LeaveTypeInput},
    role::Role,
    user::{NewUser, UpdateUser, User},
};
use crate::workflow::{Actor, DerivedStatus, Transition};

#[cfg(test)]
pub mod memory;
pub mod mysql;

pub type StoreResult<T> = Result<T, AppError>;

/// Records an actor may see, derived from its role.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Scope {
    /// Everything.
    All,
    /// Own records plus those of employees in departments the user leads.
    Lead { user_id: u64 },
    /// Own records only.
    Own { user_id: u64 },
}

impl Scope {
    pub fn for_actor(actor: &Actor) -> Self {
        match actor.role {
            Role::Hr => Scope::All,
            Role::TeamLead => Scope::Lead { user_id: actor.id },
            Role::Employee => Scope::Own { user_id: actor.id },
        }
    }

    /// Whether a record of `employee_id`, whose department is led by
    /// `department_leads`, falls inside the scope.
    pub fn includes(&self, employee_id: u64, department_leads: &[u64]) -> bool {
        match *self {
            Scope::All => true,
            Scope::Own { user_id } => employee_id == user_id,
            Scope::Lead { user_id } => {
                employee_id == user_id || department_leads.contains(&user_id)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeaveQuery {
    pub employee_id: Option<u64>,
    pub status: Option<DerivedStatus>,
    pub page: u64,
    pub per_page: u64,
}

impl LeaveQuery {
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

#[async_trait]
pub trait LeaveRepository: Send + Sync {
    async fn list(&self, scope: Scope, query: &LeaveQuery) -> StoreResult<(Vec<LeaveRequest>, i64)>;

    async fn find(&self, id: u64) -> StoreResult<Option<LeaveRequest>>;

    async fn create(&self, employee_id: u64, new: &NewLeaveRequest) -> StoreResult<u64>;

    /// Writes `transition` only if the track still holds `transition.from`.
    /// Returns `false` when another decision got there first.
    async fn set_track(&self, id: u64, transition: &Transition) -> StoreResult<bool>;

    /// `set_track` for a decision that completes approval. The employee's
    /// remaining allotment for the request's leave type must still cover
    /// `days` when the write happens, checked under the same lock, otherwise
    /// nothing is written and the balance error is returned.
    async fn set_track_covered(
        &self,
        id: u64,
        transition: &Transition,
        days: i64,
    ) -> StoreResult<bool>;
}

#[async_trait]
pub trait LeaveTypeRepository: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<LeaveType>>;

    async fn find(&self, id: u64) -> StoreResult<Option<LeaveType>>;

    async fn create(&self, input: &LeaveTypeInput) -> StoreResult<u64>;

    async fn update(&self, id: u64, input: &LeaveTypeInput) -> StoreResult<bool>;

    async fn delete(&self, id: u64) -> StoreResult<bool>;
}

#[async_trait]
pub trait BalanceRepository: Send + Sync {
    async fn list(&self, scope: Scope) -> StoreResult<Vec<LeaveBalance>>;

    async fn find(&self, employee_id: u64, leave_type_id: u64) -> StoreResult<Option<LeaveBalance>>;

    /// Creates or overwrites the allotment; returns the row id.
    async fn upsert(&self, employee_id: u64, leave_type_id: u64, balance: f64) -> StoreResult<u64>;
}

#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    async fn list(&self, scope: Scope) -> StoreResult<Vec<Department>>;

    async fn find(&self, id: u64) -> StoreResult<Option<Department>>;

    async fn create(&self, new: &NewDepartment) -> StoreResult<u64>;

    async fn update(&self, id: u64, input: &DepartmentInput) -> StoreResult<bool>;

    /// Members are detached and lead assignments dropped.
    async fn delete(&self, id: u64) -> StoreResult<bool>;

    /// Makes `user_id` a team lead of this department only and moves the
    /// user into it. Returns `false` if the department does not exist.
    async fn assign_lead(&self, department_id: u64, user_id: u64) -> StoreResult<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn find(&self, id: u64) -> StoreResult<Option<User>>;

    async fn list(&self, scope: Scope) -> StoreResult<Vec<User>>;

    /// Inserts the user with an already hashed password. A team lead
    /// created into a department becomes its lead.
    async fn create(&self, new: &NewUser, password_hash: &str) -> StoreResult<u64>;

    /// Applies the set fields. Afterwards a team lead with a department
    /// leads exactly that one and any other role leads none.
    async fn update(
        &self,
        id: u64,
        changes: &UpdateUser,
        password_hash: Option<&str>,
    ) -> StoreResult<bool>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn store_refresh(&self, user_id: u64, jti: &str, expires_at: usize) -> StoreResult<()>;

    /// Revokes an unrevoked refresh token. Returns `false` if it was
    /// unknown or already revoked.
    async fn consume_refresh(&self, jti: &str) -> StoreResult<bool>;

    async fn revoke(&self, jti: &str) -> StoreResult<()>;
}

/// Repositories shared with every handler through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub leaves: Arc<dyn LeaveRepository>,
    pub leave_types: Arc<dyn LeaveTypeRepository>,
    pub balances: Arc<dyn BalanceRepository>,
    pub departments: Arc<dyn DepartmentRepository>,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenRepository>,
}

impl AppState {
    /// Builds the state from one store implementing every repository.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: LeaveRepository
            + LeaveTypeRepository
            + BalanceRepository
            + DepartmentRepository
            + UserRepository
            + TokenRepository
            + 'static,
    {
        Self {
            leaves: store.clone(),
            leave_types: store.clone(),
            balances: store.clone(),
            departments: store.clone(),
            users: store.clone(),
            tokens: store,
        }
    }
}
