use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    ClinicalStaff,
    Doctor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::ClinicalStaff => "clinical_staff",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated actor performing an operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl ActorContext {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn patient(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Patient)
    }

    pub fn doctor(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Doctor)
    }

    pub fn staff(user_id: Uuid) -> Self {
        Self::new(user_id, Role::ClinicalStaff)
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_staff_or_admin(&self) -> bool {
        matches!(self.role, Role::ClinicalStaff | Role::Admin)
    }
}
