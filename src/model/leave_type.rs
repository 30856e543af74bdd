use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveType {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Annual")]
    pub name: String,
    #[schema(example = "Paid annual leave")]
    pub description: String,
    #[schema(example = 12)]
    pub max_days_per_year: u32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LeaveTypeInput {
    #[schema(example = "Annual")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = 12)]
    #[serde(default = "default_max_days")]
    pub max_days_per_year: u32,
}

fn default_max_days() -> u32 {
    12
}
