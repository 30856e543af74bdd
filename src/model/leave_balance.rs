use serde::Serialize;
use utoipa::ToSchema;

use crate::workflow::balance::BalanceSnapshot;

/// Allotted days of one employee for one leave type, with the days taken
/// by approved requests.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct LeaveBalance {
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
    #[schema(example = 12.0)]
    pub balance: f64,
    #[schema(example = 3)]
    pub used: i64,
}

impl LeaveBalance {
    pub fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            balance: self.balance,
            used: self.used as f64,
        }
    }
}
