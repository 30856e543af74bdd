use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Role of an authenticated user. Stored as text in `users.role`.
#[derive(
    Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString,
    AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Hr,
    TeamLead,
    #[default]
    Employee,
}

impl Role {
    pub fn from_db(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_text() {
        assert_eq!(Role::from_db("team_lead"), Some(Role::TeamLead));
        assert_eq!(Role::from_db("hr"), Some(Role::Hr));
        assert_eq!(Role::TeamLead.as_ref(), "team_lead");
        assert_eq!(Role::Employee.to_string(), "employee");
        assert_eq!(Role::from_db("admin"), None);
    }
}
