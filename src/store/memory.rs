use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use super::{
    BalanceRepository, DepartmentRepository, LeaveQuery, LeaveRepository, LeaveTypeRepository,
    Scope, StoreResult, TokenRepository, UserRepository,
};
use crate::error::AppError;
use crate::model::{
    department::{Department, DepartmentInput, NewDepartment},
    leave_balance::LeaveBalance,
    leave_request::{LeaveRequest, NewLeaveRequest},
    leave_type::{LeaveType, LeaveTypeInput},
    role::Role,
    user::{NewUser, UpdateUser, User},
};
use crate::workflow::{
    DerivedStatus, TrackStatus, Transition,
    balance::{BalanceSnapshot, ensure_covered, leave_days},
};

#[derive(Default)]
struct Inner {
    users: BTreeMap<u64, User>,
    departments: BTreeMap<u64, Department>,
    leave_types: BTreeMap<u64, LeaveType>,
    leaves: BTreeMap<u64, LeaveRequest>,
    balances: BTreeMap<u64, (u64, u64, f64)>,
    refresh_tokens: HashMap<String, bool>,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn leads_of(&self, employee_id: u64) -> Vec<u64> {
        self.users
            .get(&employee_id)
            .and_then(|u| u.department_id)
            .and_then(|d| self.departments.get(&d))
            .map(|d| d.leads.clone())
            .unwrap_or_default()
    }

    fn in_scope(&self, scope: Scope, employee_id: u64) -> bool {
        scope.includes(employee_id, &self.leads_of(employee_id))
    }

    /// Leave request with its lead list refreshed from the departments.
    fn hydrate(&self, leave: &LeaveRequest) -> LeaveRequest {
        LeaveRequest {
            employee_name: self.users.get(&leave.employee_id).map(|u| u.full_name.clone()),
            leave_type_name: self.leave_types.get(&leave.leave_type_id).map(|t| t.name.clone()),
            department_leads: self.leads_of(leave.employee_id),
            ..leave.clone()
        }
    }

    fn used_days(&self, employee_id: u64, leave_type_id: u64) -> i64 {
        self.leaves
            .values()
            .filter(|l| l.employee_id == employee_id && l.leave_type_id == leave_type_id)
            .filter(|l| l.status() == DerivedStatus::Approved)
            .map(|l| leave_days(l.start_date, l.end_date))
            .sum()
    }

    /// Compare-and-set of one track.
    fn apply_track(&mut self, id: u64, transition: &Transition) -> bool {
        let Some(leave) = self.leaves.get_mut(&id) else {
            return false;
        };
        let tracks = leave.tracks();
        if tracks.get(transition.track) != transition.from {
            return false;
        }
        let next = transition.apply(tracks);
        leave.team_lead_status = next.team_lead;
        leave.hr_status = next.hr;
        leave.updated_at = Utc::now();
        true
    }

    fn balance_snapshot(&self, employee_id: u64, leave_type_id: u64) -> Option<BalanceSnapshot> {
        self.balances
            .values()
            .find(|(e, t, _)| *e == employee_id && *t == leave_type_id)
            .map(|(_, _, balance)| BalanceSnapshot {
                balance: *balance,
                used: self.used_days(employee_id, leave_type_id) as f64,
            })
    }

    fn username_or_email_taken(&self, username: &str, email: &str, except: Option<u64>) -> bool {
        self.users
            .values()
            .filter(|u| Some(u.id) != except)
            .any(|u| u.username == username || u.email == email)
    }

    /// A team lead with a department leads exactly that one, anyone else
    /// leads nothing.
    fn sync_leads(&mut self, user_id: u64) {
        let Some(user) = self.users.get(&user_id) else {
            return;
        };
        let leads = (user.role == Role::TeamLead)
            .then_some(user.department_id)
            .flatten();
        for department in self.departments.values_mut() {
            if Some(department.id) == leads {
                if !department.leads.contains(&user_id) {
                    department.leads.push(user_id);
                }
            } else {
                department.leads.retain(|id| *id != user_id);
            }
        }
    }

    fn balance_view(&self, id: u64, (employee_id, leave_type_id, balance): (u64, u64, f64)) -> LeaveBalance {
        LeaveBalance {
            id,
            employee_id,
            employee_name: self.users.get(&employee_id).map(|u| u.full_name.clone()),
            leave_type_id,
            leave_type_name: self.leave_types.get(&leave_type_id).map(|t| t.name.clone()),
            balance,
            used: self.used_days(employee_id, leave_type_id),
        }
    }
}

/// Repositories held in process memory, for handler tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("memory store poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("memory store poisoned")
    }

    pub fn add_user(&self, username: &str, password_hash: &str, role: Role, department_id: Option<u64>) -> u64 {
        let mut inner = self.write();
        let id = inner.next_id();
        inner.users.insert(
            id,
            User {
                id,
                username: username.to_string(),
                password: password_hash.to_string(),
                role,
                full_name: username.to_string(),
                email: format!("{username}@company.test"),
                department_id,
            },
        );
        id
    }

    pub fn add_department(&self, name: &str, leads: Vec<u64>) -> u64 {
        let mut inner = self.write();
        let id = inner.next_id();
        inner.departments.insert(
            id,
            Department {
                id,
                name: name.to_string(),
                description: String::new(),
                leads,
            },
        );
        id
    }

    pub fn set_department(&self, user_id: u64, department_id: u64) {
        if let Some(user) = self.write().users.get_mut(&user_id) {
            user.department_id = Some(department_id);
        }
    }

    /// Overwrites both tracks, bypassing the workflow.
    pub fn force_tracks(&self, leave_id: u64, team_lead: TrackStatus, hr: TrackStatus) {
        if let Some(leave) = self.write().leaves.get_mut(&leave_id) {
            leave.team_lead_status = team_lead;
            leave.hr_status = hr;
        }
    }
}

#[async_trait]
impl LeaveRepository for MemoryStore {
    async fn list(&self, scope: Scope, query: &LeaveQuery) -> StoreResult<(Vec<LeaveRequest>, i64)> {
        let inner = self.read();
        let mut matching: Vec<LeaveRequest> = inner
            .leaves
            .values()
            .filter(|l| inner.in_scope(scope, l.employee_id))
            .filter(|l| query.employee_id.is_none_or(|id| l.employee_id == id))
            .filter(|l| query.status.is_none_or(|s| l.status() == s))
            .map(|l| inner.hydrate(l))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .collect();
        Ok((page, total))
    }

    async fn find(&self, id: u64) -> StoreResult<Option<LeaveRequest>> {
        let inner = self.read();
        Ok(inner.leaves.get(&id).map(|l| inner.hydrate(l)))
    }

    async fn create(&self, employee_id: u64, new: &NewLeaveRequest) -> StoreResult<u64> {
        let mut inner = self.write();
        if !inner.leave_types.contains_key(&new.leave_type_id) {
            return Err(AppError::Conflict("Unknown leave type or employee".to_string()));
        }
        let id = inner.next_id();
        let now = Utc::now();
        inner.leaves.insert(
            id,
            LeaveRequest {
                id,
                employee_id,
                employee_name: None,
                leave_type_id: new.leave_type_id,
                leave_type_name: None,
                start_date: new.start_date,
                end_date: new.end_date,
                reason: new.reason.clone(),
                team_lead_status: TrackStatus::Pending,
                hr_status: TrackStatus::Pending,
                created_at: now,
                updated_at: now,
                department_leads: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn set_track(&self, id: u64, transition: &Transition) -> StoreResult<bool> {
        Ok(self.write().apply_track(id, transition))
    }

    async fn set_track_covered(
        &self,
        id: u64,
        transition: &Transition,
        days: i64,
    ) -> StoreResult<bool> {
        let mut inner = self.write();
        let Some(leave) = inner.leaves.get(&id) else {
            return Ok(false);
        };
        if leave.tracks().get(transition.track) != transition.from {
            return Ok(false);
        }
        ensure_covered(
            inner.balance_snapshot(leave.employee_id, leave.leave_type_id),
            days,
        )?;
        Ok(inner.apply_track(id, transition))
    }
}

#[async_trait]
impl LeaveTypeRepository for MemoryStore {
    async fn list(&self) -> StoreResult<Vec<LeaveType>> {
        let mut types: Vec<_> = self.read().leave_types.values().cloned().collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    async fn find(&self, id: u64) -> StoreResult<Option<LeaveType>> {
        Ok(self.read().leave_types.get(&id).cloned())
    }

    async fn create(&self, input: &LeaveTypeInput) -> StoreResult<u64> {
        let mut inner = self.write();
        if inner.leave_types.values().any(|t| t.name == input.name) {
            return Err(AppError::Conflict("Leave type name already exists".to_string()));
        }
        let id = inner.next_id();
        inner.leave_types.insert(
            id,
            LeaveType {
                id,
                name: input.name.clone(),
                description: input.description.clone(),
                max_days_per_year: input.max_days_per_year,
            },
        );
        Ok(id)
    }

    async fn update(&self, id: u64, input: &LeaveTypeInput) -> StoreResult<bool> {
        let mut inner = self.write();
        let Some(leave_type) = inner.leave_types.get_mut(&id) else {
            return Ok(false);
        };
        leave_type.name = input.name.clone();
        leave_type.description = input.description.clone();
        leave_type.max_days_per_year = input.max_days_per_year;
        Ok(true)
    }

    async fn delete(&self, id: u64) -> StoreResult<bool> {
        let mut inner = self.write();
        if inner.leaves.values().any(|l| l.leave_type_id == id)
            || inner.balances.values().any(|(_, t, _)| *t == id)
        {
            return Err(AppError::Conflict("Leave type is still in use".to_string()));
        }
        Ok(inner.leave_types.remove(&id).is_some())
    }
}

#[async_trait]
impl BalanceRepository for MemoryStore {
    async fn list(&self, scope: Scope) -> StoreResult<Vec<LeaveBalance>> {
        let inner = self.read();
        Ok(inner
            .balances
            .iter()
            .filter(|(_, (employee_id, _, _))| inner.in_scope(scope, *employee_id))
            .map(|(id, row)| inner.balance_view(*id, *row))
            .collect())
    }

    async fn find(&self, employee_id: u64, leave_type_id: u64) -> StoreResult<Option<LeaveBalance>> {
        let inner = self.read();
        Ok(inner
            .balances
            .iter()
            .find(|(_, (e, t, _))| *e == employee_id && *t == leave_type_id)
            .map(|(id, row)| inner.balance_view(*id, *row)))
    }

    async fn upsert(&self, employee_id: u64, leave_type_id: u64, balance: f64) -> StoreResult<u64> {
        let mut inner = self.write();
        if !inner.users.contains_key(&employee_id) || !inner.leave_types.contains_key(&leave_type_id) {
            return Err(AppError::Conflict("Unknown employee or leave type".to_string()));
        }
        let existing = inner
            .balances
            .iter()
            .find(|(_, (e, t, _))| *e == employee_id && *t == leave_type_id)
            .map(|(id, _)| *id);
        let id = match existing {
            Some(id) => id,
            None => inner.next_id(),
        };
        inner.balances.insert(id, (employee_id, leave_type_id, balance));
        Ok(id)
    }
}

#[async_trait]
impl DepartmentRepository for MemoryStore {
    async fn list(&self, scope: Scope) -> StoreResult<Vec<Department>> {
        let inner = self.read();
        let own_department = |user_id: u64| inner.users.get(&user_id).and_then(|u| u.department_id);
        Ok(inner
            .departments
            .values()
            .filter(|d| match scope {
                Scope::All => true,
                Scope::Lead { user_id } => d.leads.contains(&user_id),
                Scope::Own { user_id } => own_department(user_id) == Some(d.id),
            })
            .cloned()
            .collect())
    }

    async fn find(&self, id: u64) -> StoreResult<Option<Department>> {
        Ok(self.read().departments.get(&id).cloned())
    }

    async fn create(&self, new: &NewDepartment) -> StoreResult<u64> {
        if self.read().departments.values().any(|d| d.name == new.name) {
            return Err(AppError::Conflict("Department name already exists".to_string()));
        }
        let id = self.add_department(&new.name, Vec::new());
        if let Some(department) = self.write().departments.get_mut(&id) {
            department.description = new.description.clone();
        }
        if let Some(lead_id) = new.lead_id {
            self.assign_lead(id, lead_id).await?;
        }
        Ok(id)
    }

    async fn update(&self, id: u64, input: &DepartmentInput) -> StoreResult<bool> {
        let mut inner = self.write();
        if inner
            .departments
            .values()
            .any(|d| d.id != id && d.name == input.name)
        {
            return Err(AppError::Conflict("Department name already exists".to_string()));
        }
        let Some(department) = inner.departments.get_mut(&id) else {
            return Ok(false);
        };
        department.name = input.name.clone();
        department.description = input.description.clone();
        Ok(true)
    }

    async fn delete(&self, id: u64) -> StoreResult<bool> {
        let mut inner = self.write();
        if inner.departments.remove(&id).is_none() {
            return Ok(false);
        }
        for user in inner.users.values_mut() {
            if user.department_id == Some(id) {
                user.department_id = None;
            }
        }
        Ok(true)
    }

    async fn assign_lead(&self, department_id: u64, user_id: u64) -> StoreResult<bool> {
        let mut inner = self.write();
        if !inner.departments.contains_key(&department_id) {
            return Ok(false);
        }
        let Some(user) = inner.users.get_mut(&user_id) else {
            return Err(AppError::not_found("User"));
        };
        user.role = Role::TeamLead;
        user.department_id = Some(department_id);

        for department in inner.departments.values_mut() {
            if department.id == department_id {
                if !department.leads.contains(&user_id) {
                    department.leads.push(user_id);
                }
            } else {
                department.leads.retain(|id| *id != user_id);
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.read().users.values().find(|u| u.username == username).cloned())
    }

    async fn find(&self, id: u64) -> StoreResult<Option<User>> {
        Ok(self.read().users.get(&id).cloned())
    }

    async fn list(&self, scope: Scope) -> StoreResult<Vec<User>> {
        let inner = self.read();
        Ok(inner
            .users
            .values()
            .filter(|u| inner.in_scope(scope, u.id))
            .cloned()
            .collect())
    }

    async fn create(&self, new: &NewUser, password_hash: &str) -> StoreResult<u64> {
        let mut inner = self.write();
        if inner.username_or_email_taken(&new.username, &new.email, None) {
            return Err(AppError::Conflict("Username or email already exists".to_string()));
        }
        if new.department_id.is_some_and(|d| !inner.departments.contains_key(&d)) {
            return Err(AppError::Conflict("Unknown department".to_string()));
        }
        let id = inner.next_id();
        inner.users.insert(
            id,
            User {
                id,
                username: new.username.clone(),
                password: password_hash.to_string(),
                role: new.role,
                full_name: new.full_name.clone(),
                email: new.email.clone(),
                department_id: new.department_id,
            },
        );
        inner.sync_leads(id);
        Ok(id)
    }

    async fn update(
        &self,
        id: u64,
        changes: &UpdateUser,
        password_hash: Option<&str>,
    ) -> StoreResult<bool> {
        let mut inner = self.write();
        let Some(mut user) = inner.users.get(&id).cloned() else {
            return Ok(false);
        };
        changes.apply_to(&mut user);
        if let Some(hash) = password_hash {
            user.password = hash.to_string();
        }
        if inner.username_or_email_taken(&user.username, &user.email, Some(id)) {
            return Err(AppError::Conflict("Username or email already exists".to_string()));
        }
        if user.department_id.is_some_and(|d| !inner.departments.contains_key(&d)) {
            return Err(AppError::Conflict("Unknown department".to_string()));
        }
        inner.users.insert(id, user);
        inner.sync_leads(id);
        Ok(true)
    }
}

#[async_trait]
impl TokenRepository for MemoryStore {
    async fn store_refresh(&self, _user_id: u64, jti: &str, _expires_at: usize) -> StoreResult<()> {
        self.write().refresh_tokens.insert(jti.to_string(), false);
        Ok(())
    }

    async fn consume_refresh(&self, jti: &str) -> StoreResult<bool> {
        let mut inner = self.write();
        match inner.refresh_tokens.get_mut(jti) {
            Some(revoked) if !*revoked => {
                *revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke(&self, jti: &str) -> StoreResult<()> {
        if let Some(revoked) = self.write().refresh_tokens.get_mut(jti) {
            *revoked = true;
        }
        Ok(())
    }
}
