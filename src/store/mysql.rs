use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySql, MySqlPool, Transaction};

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
    DerivedStatus, Track, TrackStatus, Transition,
    balance::{BalanceSnapshot, ensure_covered},
};

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
}

/// `AND ...` clause restricting `column` (an employee id) to the scope.
fn scope_clause(scope: Scope, column: &str, args: &mut Vec<FilterValue>) -> String {
    match scope {
        Scope::All => String::new(),
        Scope::Own { user_id } => {
            args.push(FilterValue::U64(user_id));
            format!(" AND {column} = ?")
        }
        Scope::Lead { user_id } => {
            args.push(FilterValue::U64(user_id));
            args.push(FilterValue::U64(user_id));
            format!(
                " AND ({column} = ? OR {column} IN (
                    SELECT m.id FROM users m
                    JOIN department_leads dl ON dl.department_id = m.department_id
                    WHERE dl.user_id = ?))"
            )
        }
    }
}

// Track values are stored as their lowercase names.
fn status_clause(status: DerivedStatus) -> &'static str {
    match status {
        DerivedStatus::Denied => {
            " AND (lr.team_lead_status = 'denied' OR lr.hr_status = 'denied')"
        }
        DerivedStatus::Approved => {
            " AND lr.team_lead_status = 'approved' AND lr.hr_status = 'approved'"
        }
        DerivedStatus::Pending => {
            " AND lr.team_lead_status <> 'denied' AND lr.hr_status <> 'denied'
              AND NOT (lr.team_lead_status = 'approved' AND lr.hr_status = 'approved')"
        }
    }
}

fn track_column(track: Track) -> &'static str {
    match track {
        Track::TeamLead => "team_lead_status",
        Track::Hr => "hr_status",
    }
}

fn parse_ids(raw: Option<String>) -> Vec<u64> {
    raw.map(|s| s.split(',').filter_map(|id| id.trim().parse().ok()).collect())
        .unwrap_or_default()
}

/// Maps MySQL integrity violations (SQLSTATE 23000) to a conflict.
fn conflict_on_constraint(e: sqlx::Error, message: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("23000") {
            return AppError::Conflict(message.to_string());
        }
    }
    AppError::Database(e)
}

const LEAVE_SELECT: &str = r#"
    SELECT
        lr.id,
        lr.employee_id,
        u.full_name AS employee_name,
        lr.leave_type_id,
        lt.name AS leave_type_name,
        lr.start_date,
        lr.end_date,
        lr.reason,
        lr.team_lead_status,
        lr.hr_status,
        lr.created_at,
        lr.updated_at,
        (SELECT GROUP_CONCAT(CAST(dl.user_id AS CHAR))
           FROM department_leads dl
          WHERE dl.department_id = u.department_id) AS lead_ids
    FROM leave_requests lr
    JOIN users u ON u.id = lr.employee_id
    LEFT JOIN leave_types lt ON lt.id = lr.leave_type_id
"#;

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    employee_name: Option<String>,
    leave_type_id: u64,
    leave_type_name: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: String,
    team_lead_status: String,
    hr_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    lead_ids: Option<String>,
}

fn parse_track(raw: &str, id: u64) -> StoreResult<TrackStatus> {
    raw.parse()
        .map_err(|_| AppError::Internal(anyhow!("leave request {id} has unknown track value {raw:?}")))
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = AppError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        Ok(LeaveRequest {
            team_lead_status: parse_track(&row.team_lead_status, row.id)?,
            hr_status: parse_track(&row.hr_status, row.id)?,
            id: row.id,
            employee_id: row.employee_id,
            employee_name: row.employee_name,
            leave_type_id: row.leave_type_id,
            leave_type_name: row.leave_type_name,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
            department_leads: parse_ids(row.lead_ids),
        })
    }
}

#[async_trait]
impl LeaveRepository for MySqlStore {
    async fn list(&self, scope: Scope, query: &LeaveQuery) -> StoreResult<(Vec<LeaveRequest>, i64)> {
        let mut args: Vec<FilterValue> = Vec::new();
        let mut where_sql = String::from(" WHERE 1=1");
        where_sql.push_str(&scope_clause(scope, "lr.employee_id", &mut args));

        if let Some(emp_id) = query.employee_id {
            where_sql.push_str(" AND lr.employee_id = ?");
            args.push(FilterValue::U64(emp_id));
        }
        if let Some(status) = query.status {
            where_sql.push_str(status_clause(status));
        }

        let count_sql = format!("SELECT COUNT(*) FROM leave_requests lr{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "{LEAVE_SELECT}{where_sql} ORDER BY lr.created_at DESC, lr.id DESC LIMIT ? OFFSET ?"
        );
        let mut data_q = sqlx::query_as::<_, LeaveRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
            };
        }
        let rows = data_q
            .bind(query.per_page)
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await?;

        let leaves = rows
            .into_iter()
            .map(LeaveRequest::try_from)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((leaves, total))
    }

    async fn find(&self, id: u64) -> StoreResult<Option<LeaveRequest>> {
        let sql = format!("{LEAVE_SELECT} WHERE lr.id = ?");
        sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn create(&self, employee_id: u64, new: &NewLeaveRequest) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, leave_type_id, start_date, end_date, reason)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(new.leave_type_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(&new.reason)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "Unknown leave type or employee"))?;

        Ok(result.last_insert_id())
    }

    async fn set_track(&self, id: u64, transition: &Transition) -> StoreResult<bool> {
        let column = track_column(transition.track);
        let sql = format!("UPDATE leave_requests SET {column} = ? WHERE id = ? AND {column} = ?");
        let result = sqlx::query(&sql)
            .bind(transition.to.as_ref())
            .bind(id)
            .bind(transition.from.as_ref())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_track_covered(
        &self,
        id: u64,
        transition: &Transition,
        days: i64,
    ) -> StoreResult<bool> {
        let column = track_column(transition.track);
        let mut tx = self.pool.begin().await?;

        // employee and leave type never change after creation
        let Some((employee_id, leave_type_id)) = sqlx::query_as::<_, (u64, u64)>(
            "SELECT employee_id, leave_type_id FROM leave_requests WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(false);
        };

        // Taken first: every approval drawing on this allotment queues here
        // before it locks any request row.
        let balance = sqlx::query_scalar::<_, f64>(
            "SELECT balance FROM leave_balances WHERE employee_id = ? AND leave_type_id = ? FOR UPDATE",
        )
        .bind(employee_id)
        .bind(leave_type_id)
        .fetch_optional(&mut *tx)
        .await?;

        let sql = format!("SELECT {column} FROM leave_requests WHERE id = ? FOR UPDATE");
        let current = sqlx::query_scalar::<_, String>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if current != transition.from.as_ref() {
            return Ok(false);
        }

        // locking read, so approvals committed while we waited are counted
        let used = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT CAST(COALESCE(SUM(DATEDIFF(end_date, start_date) + 1), 0) AS SIGNED)
              FROM leave_requests
             WHERE employee_id = ?
               AND leave_type_id = ?
               AND team_lead_status = 'approved'
               AND hr_status = 'approved'
             LOCK IN SHARE MODE
            "#,
        )
        .bind(employee_id)
        .bind(leave_type_id)
        .fetch_one(&mut *tx)
        .await?;

        ensure_covered(
            balance.map(|balance| BalanceSnapshot {
                balance,
                used: used as f64,
            }),
            days,
        )?;

        let update = format!("UPDATE leave_requests SET {column} = ? WHERE id = ?");
        sqlx::query(&update)
            .bind(transition.to.as_ref())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl LeaveTypeRepository for MySqlStore {
    async fn list(&self) -> StoreResult<Vec<LeaveType>> {
        let types = sqlx::query_as::<_, LeaveType>(
            "SELECT id, name, description, max_days_per_year FROM leave_types ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(types)
    }

    async fn find(&self, id: u64) -> StoreResult<Option<LeaveType>> {
        let leave_type = sqlx::query_as::<_, LeaveType>(
            "SELECT id, name, description, max_days_per_year FROM leave_types WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(leave_type)
    }

    async fn create(&self, input: &LeaveTypeInput) -> StoreResult<u64> {
        let result = sqlx::query(
            "INSERT INTO leave_types (name, description, max_days_per_year) VALUES (?, ?, ?)",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.max_days_per_year)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "Leave type name already exists"))?;
        Ok(result.last_insert_id())
    }

    async fn update(&self, id: u64, input: &LeaveTypeInput) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE leave_types SET name = ?, description = ?, max_days_per_year = ? WHERE id = ?",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.max_days_per_year)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "Leave type name already exists"))?;
        // MySQL reports 0 affected rows for an unchanged row, so fall back to existence
        if result.rows_affected() == 1 {
            return Ok(true);
        }
        Ok(LeaveTypeRepository::find(self, id).await?.is_some())
    }

    async fn delete(&self, id: u64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM leave_types WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_constraint(e, "Leave type is still in use"))?;
        Ok(result.rows_affected() == 1)
    }
}

const BALANCE_SELECT: &str = r#"
    SELECT
        lb.id,
        lb.employee_id,
        u.full_name AS employee_name,
        lb.leave_type_id,
        lt.name AS leave_type_name,
        lb.balance,
        CAST(COALESCE((
            SELECT SUM(DATEDIFF(lr.end_date, lr.start_date) + 1)
              FROM leave_requests lr
             WHERE lr.employee_id = lb.employee_id
               AND lr.leave_type_id = lb.leave_type_id
               AND lr.team_lead_status = 'approved'
               AND lr.hr_status = 'approved'
        ), 0) AS SIGNED) AS used
    FROM leave_balances lb
    JOIN users u ON u.id = lb.employee_id
    LEFT JOIN leave_types lt ON lt.id = lb.leave_type_id
"#;

#[async_trait]
impl BalanceRepository for MySqlStore {
    async fn list(&self, scope: Scope) -> StoreResult<Vec<LeaveBalance>> {
        let mut args = Vec::new();
        let scope_sql = scope_clause(scope, "lb.employee_id", &mut args);
        let sql = format!("{BALANCE_SELECT} WHERE 1=1{scope_sql} ORDER BY u.full_name, lt.name");

        let mut q = sqlx::query_as::<_, LeaveBalance>(&sql);
        for arg in args {
            q = match arg {
                FilterValue::U64(v) => q.bind(v),
            };
        }
        Ok(q.fetch_all(&self.pool).await?)
    }

    async fn find(&self, employee_id: u64, leave_type_id: u64) -> StoreResult<Option<LeaveBalance>> {
        let sql = format!("{BALANCE_SELECT} WHERE lb.employee_id = ? AND lb.leave_type_id = ?");
        let balance = sqlx::query_as::<_, LeaveBalance>(&sql)
            .bind(employee_id)
            .bind(leave_type_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(balance)
    }

    async fn upsert(&self, employee_id: u64, leave_type_id: u64, balance: f64) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_balances (employee_id, leave_type_id, balance)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE balance = VALUES(balance), id = LAST_INSERT_ID(id)
            "#,
        )
        .bind(employee_id)
        .bind(leave_type_id)
        .bind(balance)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "Unknown employee or leave type"))?;
        Ok(result.last_insert_id())
    }
}

#[derive(FromRow)]
struct DepartmentRow {
    id: u64,
    name: String,
    description: String,
    lead_ids: Option<String>,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        Department {
            id: row.id,
            name: row.name,
            description: row.description,
            leads: parse_ids(row.lead_ids),
        }
    }
}

const DEPARTMENT_SELECT: &str = r#"
    SELECT
        d.id,
        d.name,
        d.description,
        (SELECT GROUP_CONCAT(CAST(dl.user_id AS CHAR))
           FROM department_leads dl
          WHERE dl.department_id = d.id) AS lead_ids
    FROM departments d
"#;

/// Promotes the user, detaches them from other departments they lead and
/// attaches them to this one.
async fn assign_lead_tx(
    tx: &mut Transaction<'_, MySql>,
    department_id: u64,
    user_id: u64,
) -> StoreResult<bool> {
    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS(SELECT 1 FROM departments WHERE id = ?)",
    )
    .bind(department_id)
    .fetch_one(&mut **tx)
    .await?;
    if exists == 0 {
        return Ok(false);
    }

    let moved = sqlx::query("UPDATE users SET role = ?, department_id = ? WHERE id = ?")
        .bind(Role::TeamLead.as_ref())
        .bind(department_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    if moved.rows_affected() == 0 {
        let user_exists =
            sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
                .bind(user_id)
                .fetch_one(&mut **tx)
                .await?;
        if user_exists == 0 {
            return Err(AppError::not_found("User"));
        }
    }

    sqlx::query("DELETE FROM department_leads WHERE user_id = ? AND department_id <> ?")
        .bind(user_id)
        .bind(department_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query("INSERT IGNORE INTO department_leads (department_id, user_id) VALUES (?, ?)")
        .bind(department_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    Ok(true)
}

#[async_trait]
impl DepartmentRepository for MySqlStore {
    async fn list(&self, scope: Scope) -> StoreResult<Vec<Department>> {
        let (clause, user_id) = match scope {
            Scope::All => ("", None),
            Scope::Lead { user_id } => (
                " WHERE d.id IN (SELECT department_id FROM department_leads WHERE user_id = ?)",
                Some(user_id),
            ),
            Scope::Own { user_id } => (
                " WHERE d.id = (SELECT department_id FROM users WHERE id = ?)",
                Some(user_id),
            ),
        };
        let sql = format!("{DEPARTMENT_SELECT}{clause} ORDER BY d.name");

        let mut q = sqlx::query_as::<_, DepartmentRow>(&sql);
        if let Some(user_id) = user_id {
            q = q.bind(user_id);
        }
        let rows = q.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Department::from).collect())
    }

    async fn find(&self, id: u64) -> StoreResult<Option<Department>> {
        let sql = format!("{DEPARTMENT_SELECT} WHERE d.id = ?");
        let row = sqlx::query_as::<_, DepartmentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Department::from))
    }

    async fn create(&self, new: &NewDepartment) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query("INSERT INTO departments (name, description) VALUES (?, ?)")
            .bind(&new.name)
            .bind(&new.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_on_constraint(e, "Department name already exists"))?
            .last_insert_id();

        if let Some(lead_id) = new.lead_id {
            assign_lead_tx(&mut tx, id, lead_id).await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    async fn update(&self, id: u64, input: &DepartmentInput) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE departments SET name = ?, description = ? WHERE id = ?")
            .bind(&input.name)
            .bind(&input.description)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_constraint(e, "Department name already exists"))?;
        if result.rows_affected() == 1 {
            return Ok(true);
        }
        Ok(DepartmentRepository::find(self, id).await?.is_some())
    }

    async fn delete(&self, id: u64) -> StoreResult<bool> {
        // users.department_id is SET NULL, department_leads cascades
        let result = sqlx::query("DELETE FROM departments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn assign_lead(&self, department_id: u64, user_id: u64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let assigned = assign_lead_tx(&mut tx, department_id, user_id).await?;
        tx.commit().await?;
        Ok(assigned)
    }
}

#[derive(FromRow)]
struct UserRow {
    id: u64,
    username: String,
    password: String,
    role: String,
    full_name: String,
    email: String,
    department_id: Option<u64>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_db(&row.role).ok_or_else(|| {
            AppError::Internal(anyhow!("user {} has unknown role {:?}", row.id, row.role))
        })?;
        Ok(User {
            id: row.id,
            username: row.username,
            password: row.password,
            role,
            full_name: row.full_name,
            email: row.email,
            department_id: row.department_id,
        })
    }
}

const USER_SELECT: &str =
    "SELECT id, username, password, role, full_name, email, department_id FROM users";

const USER_CONFLICT: &str = "Username or email already exists, or unknown department";

/// A team lead with a department leads exactly that one, anyone else
/// leads nothing.
async fn sync_leads_tx(
    tx: &mut Transaction<'_, MySql>,
    user_id: u64,
    role: Role,
    department_id: Option<u64>,
) -> StoreResult<()> {
    let leads = if role == Role::TeamLead { department_id } else { None };

    sqlx::query("DELETE FROM department_leads WHERE user_id = ? AND department_id <> ?")
        .bind(user_id)
        .bind(leads.unwrap_or(0))
        .execute(&mut **tx)
        .await?;

    if let Some(department_id) = leads {
        sqlx::query("INSERT IGNORE INTO department_leads (department_id, user_id) VALUES (?, ?)")
            .bind(department_id)
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl UserRepository for MySqlStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE username = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find(&self, id: u64) -> StoreResult<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE id = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn list(&self, scope: Scope) -> StoreResult<Vec<User>> {
        let mut args = Vec::new();
        let scope_sql = scope_clause(scope, "id", &mut args);
        let sql = format!("{USER_SELECT} WHERE 1=1{scope_sql} ORDER BY full_name, id");

        let mut q = sqlx::query_as::<_, UserRow>(&sql);
        for arg in args {
            q = match arg {
                FilterValue::U64(v) => q.bind(v),
            };
        }
        q.fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn create(&self, new: &NewUser, password_hash: &str) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO users (username, password, role, full_name, email, department_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.username)
        .bind(password_hash)
        .bind(new.role.as_ref())
        .bind(&new.full_name)
        .bind(&new.email)
        .bind(new.department_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_constraint(e, USER_CONFLICT))?
        .last_insert_id();

        sync_leads_tx(&mut tx, id, new.role, new.department_id).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn update(
        &self,
        id: u64,
        changes: &UpdateUser,
        password_hash: Option<&str>,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("{USER_SELECT} WHERE id = ? FOR UPDATE");
        let Some(row) = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(false);
        };
        let mut user = User::try_from(row)?;
        changes.apply_to(&mut user);
        if let Some(hash) = password_hash {
            user.password = hash.to_string();
        }

        sqlx::query(
            r#"
            UPDATE users
               SET password = ?, role = ?, full_name = ?, email = ?, department_id = ?
             WHERE id = ?
            "#,
        )
        .bind(&user.password)
        .bind(user.role.as_ref())
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(user.department_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_constraint(e, USER_CONFLICT))?;

        sync_leads_tx(&mut tx, id, user.role, user.department_id).await?;
        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl TokenRepository for MySqlStore {
    async fn store_refresh(&self, user_id: u64, jti: &str, expires_at: usize) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, jti, expires_at)
            VALUES (?, ?, FROM_UNIXTIME(?))
            "#,
        )
        .bind(user_id)
        .bind(jti)
        .bind(expires_at as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_refresh(&self, jti: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = 1 WHERE jti = ? AND revoked = 0 AND expires_at > NOW()",
        )
        .bind(jti)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke(&self, jti: &str) -> StoreResult<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
