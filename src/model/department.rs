use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Department {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = "Product engineering")]
    pub description: String,
    /// user ids of the department leads
    #[schema(example = json!([7]))]
    pub leads: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewDepartment {
    #[schema(example = "Engineering")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// optional first lead, assigned as with `assign-lead`
    #[schema(example = 7, nullable = true)]
    pub lead_id: Option<u64>,
}

/// Body of a department update.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DepartmentInput {
    #[schema(example = "Engineering")]
    pub name: String,
    #[serde(default)]
    pub description: String,
}
