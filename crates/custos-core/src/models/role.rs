//! Role domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed role categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoleType {
    Admin,
    Developer,
    User,
    Custom,
}

/// A named bundle of permissions.
///
/// `is_system_role` is a protective flag set at creation: system roles
/// cannot have their permission set mutated and cannot be deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub role_type: RoleType,
    pub is_system_role: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    pub tenant_id: Uuid,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub role_type: RoleType,
    pub is_system_role: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRole {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub role_type: Option<RoleType>,
}
