//! Audit trail domain model: the action taxonomy and the append-only
//! evidentiary record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CustosError;

/// Closed taxonomy of auditable actions.
///
/// Wire labels (`as_str`) are stable; adding a variant requires a new
/// label and, where relevant, an entry in the audit rule tables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ActionType {
    // Authentication
    Login,
    Logout,
    LoginFailed,
    TokenRefresh,
    PasswordChange,
    // User management
    UserCreate,
    UserUpdate,
    UserDelete,
    UserSuspend,
    // Role / permission management
    RoleCreate,
    RoleUpdate,
    RoleDelete,
    RoleAssign,
    RoleUnassign,
    PermissionCreate,
    PermissionUpdate,
    PermissionDelete,
    PermissionGrant,
    PermissionRevoke,
    // Platform CRUD
    ProviderCreate,
    ProviderUpdate,
    ProviderDelete,
    ModelConfigCreate,
    ModelConfigUpdate,
    ModelConfigDelete,
    ChatSessionCreate,
    ChatSessionDelete,
    // System
    SystemSettingsChange,
    DataExport,
}

impl ActionType {
    pub const ALL: &'static [ActionType] = &[
        ActionType::Login,
        ActionType::Logout,
        ActionType::LoginFailed,
        ActionType::TokenRefresh,
        ActionType::PasswordChange,
        ActionType::UserCreate,
        ActionType::UserUpdate,
        ActionType::UserDelete,
        ActionType::UserSuspend,
        ActionType::RoleCreate,
        ActionType::RoleUpdate,
        ActionType::RoleDelete,
        ActionType::RoleAssign,
        ActionType::RoleUnassign,
        ActionType::PermissionCreate,
        ActionType::PermissionUpdate,
        ActionType::PermissionDelete,
        ActionType::PermissionGrant,
        ActionType::PermissionRevoke,
        ActionType::ProviderCreate,
        ActionType::ProviderUpdate,
        ActionType::ProviderDelete,
        ActionType::ModelConfigCreate,
        ActionType::ModelConfigUpdate,
        ActionType::ModelConfigDelete,
        ActionType::ChatSessionCreate,
        ActionType::ChatSessionDelete,
        ActionType::SystemSettingsChange,
        ActionType::DataExport,
    ];

    /// Stable wire label, stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Login => "login",
            ActionType::Logout => "logout",
            ActionType::LoginFailed => "login_failed",
            ActionType::TokenRefresh => "token_refresh",
            ActionType::PasswordChange => "password_change",
            ActionType::UserCreate => "user_create",
            ActionType::UserUpdate => "user_update",
            ActionType::UserDelete => "user_delete",
            ActionType::UserSuspend => "user_suspend",
            ActionType::RoleCreate => "role_create",
            ActionType::RoleUpdate => "role_update",
            ActionType::RoleDelete => "role_delete",
            ActionType::RoleAssign => "role_assign",
            ActionType::RoleUnassign => "role_unassign",
            ActionType::PermissionCreate => "permission_create",
            ActionType::PermissionUpdate => "permission_update",
            ActionType::PermissionDelete => "permission_delete",
            ActionType::PermissionGrant => "permission_grant",
            ActionType::PermissionRevoke => "permission_revoke",
            ActionType::ProviderCreate => "provider_create",
            ActionType::ProviderUpdate => "provider_update",
            ActionType::ProviderDelete => "provider_delete",
            ActionType::ModelConfigCreate => "model_config_create",
            ActionType::ModelConfigUpdate => "model_config_update",
            ActionType::ModelConfigDelete => "model_config_delete",
            ActionType::ChatSessionCreate => "chat_session_create",
            ActionType::ChatSessionDelete => "chat_session_delete",
            ActionType::SystemSettingsChange => "system_settings_change",
            ActionType::DataExport => "data_export",
        }
    }

    /// Parse a wire label; unknown labels yield `None`.
    pub fn parse(label: &str) -> Option<ActionType> {
        ActionType::ALL.iter().copied().find(|a| a.as_str() == label)
    }

    /// Human-readable description for display and audit review.
    pub fn description(&self) -> &'static str {
        match self {
            ActionType::Login => "User signed in",
            ActionType::Logout => "User signed out",
            ActionType::LoginFailed => "Sign-in attempt failed",
            ActionType::TokenRefresh => "Access token refreshed",
            ActionType::PasswordChange => "Password changed",
            ActionType::UserCreate => "User account created",
            ActionType::UserUpdate => "User account updated",
            ActionType::UserDelete => "User account deleted",
            ActionType::UserSuspend => "User account suspended",
            ActionType::RoleCreate => "Role created",
            ActionType::RoleUpdate => "Role updated",
            ActionType::RoleDelete => "Role deleted",
            ActionType::RoleAssign => "Role assigned to user",
            ActionType::RoleUnassign => "Role removed from user",
            ActionType::PermissionCreate => "Permission created",
            ActionType::PermissionUpdate => "Permission updated",
            ActionType::PermissionDelete => "Permission deleted",
            ActionType::PermissionGrant => "Permission granted to role",
            ActionType::PermissionRevoke => "Permission revoked from role",
            ActionType::ProviderCreate => "Model provider created",
            ActionType::ProviderUpdate => "Model provider updated",
            ActionType::ProviderDelete => "Model provider deleted",
            ActionType::ModelConfigCreate => "Model configuration created",
            ActionType::ModelConfigUpdate => "Model configuration updated",
            ActionType::ModelConfigDelete => "Model configuration deleted",
            ActionType::ChatSessionCreate => "Chat session created",
            ActionType::ChatSessionDelete => "Chat session deleted",
            ActionType::SystemSettingsChange => "System settings changed",
            ActionType::DataExport => "Data exported",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditOutcome {
    Success,
    Failure,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "success",
            AuditOutcome::Failure => "failure",
        }
    }
}

/// Snapshot of the acting principal at the time of the action.
///
/// The username is copied into the record so the trail stays readable
/// after the account is renamed or deleted. Absent for system actions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub username: String,
}

/// Typed request context, populated once per request at the transport
/// boundary and passed down by value.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ClientContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
}

/// An immutable evidentiary record. Never mutated after creation; the
/// only lifecycle transitions are storage-tier reclassification
/// (external to the record) and eventual deletion past retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub actor: Option<Actor>,
    pub action: ActionType,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub description: String,
    pub outcome: AuditOutcome,
    pub error_message: Option<String>,
    pub context: ClientContext,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditRecord {
    pub tenant_id: Uuid,
    pub actor: Option<Actor>,
    pub action: ActionType,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub description: String,
    pub outcome: AuditOutcome,
    pub error_message: Option<String>,
    pub context: ClientContext,
    pub metadata: serde_json::Value,
}

impl CreateAuditRecord {
    /// Invariant check: a failure outcome requires a non-empty error
    /// message.
    pub fn validate(&self) -> Result<(), CustosError> {
        if self.outcome == AuditOutcome::Failure
            && self
                .error_message
                .as_deref()
                .is_none_or(|m| m.trim().is_empty())
        {
            return Err(CustosError::Validation {
                message: "audit record with failure outcome requires an error message".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(outcome: AuditOutcome, error_message: Option<&str>) -> CreateAuditRecord {
        CreateAuditRecord {
            tenant_id: Uuid::new_v4(),
            actor: None,
            action: ActionType::Login,
            resource_type: None,
            resource_id: None,
            description: "test".into(),
            outcome,
            error_message: error_message.map(Into::into),
            context: ClientContext::default(),
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn failure_requires_error_message() {
        assert!(base(AuditOutcome::Failure, None).validate().is_err());
        assert!(base(AuditOutcome::Failure, Some("")).validate().is_err());
        assert!(base(AuditOutcome::Failure, Some("  ")).validate().is_err());
        assert!(
            base(AuditOutcome::Failure, Some("bad credentials"))
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn success_needs_no_error_message() {
        assert!(base(AuditOutcome::Success, None).validate().is_ok());
    }

    #[test]
    fn labels_roundtrip() {
        for action in ActionType::ALL {
            assert_eq!(ActionType::parse(action.as_str()), Some(*action));
        }
        assert_eq!(ActionType::parse("no_such_action"), None);
    }
}
