//! Audit rule engine — static classification of the action taxonomy
//! into audit level, capture policy, retention, required metadata, and
//! anonymization.
//!
//! All functions are pure; the tables are fixed at compile time.

use custos_core::models::audit::{ActionType, AuditOutcome};

/// Depth of detail captured for an action class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Basic,
    Detailed,
    Security,
}

/// Risk partition of the action taxonomy. The three named classes are
/// disjoint; everything else is routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskClass {
    HighRisk,
    Authentication,
    PermissionManagement,
    Routine,
}

impl RiskClass {
    pub const ALL: &'static [RiskClass] = &[
        RiskClass::HighRisk,
        RiskClass::Authentication,
        RiskClass::PermissionManagement,
        RiskClass::Routine,
    ];
}

/// Classify an action into its risk class.
pub fn risk_class(action: ActionType) -> RiskClass {
    use ActionType::*;
    match action {
        UserDelete | UserSuspend | ProviderDelete | SystemSettingsChange | DataExport => {
            RiskClass::HighRisk
        }
        Login | Logout | LoginFailed | TokenRefresh | PasswordChange => RiskClass::Authentication,
        RoleCreate | RoleUpdate | RoleDelete | RoleAssign | RoleUnassign | PermissionCreate
        | PermissionUpdate | PermissionDelete | PermissionGrant | PermissionRevoke => {
            RiskClass::PermissionManagement
        }
        UserCreate | UserUpdate | ProviderCreate | ProviderUpdate | ModelConfigCreate
        | ModelConfigUpdate | ModelConfigDelete | ChatSessionCreate | ChatSessionDelete => {
            RiskClass::Routine
        }
    }
}

/// Audit level: DETAILED for high-risk and permission management,
/// SECURITY for authentication, BASIC otherwise.
pub fn classify(action: ActionType) -> AuditLevel {
    match risk_class(action) {
        RiskClass::HighRisk | RiskClass::PermissionManagement => AuditLevel::Detailed,
        RiskClass::Authentication => AuditLevel::Security,
        RiskClass::Routine => AuditLevel::Basic,
    }
}

/// Request bodies are captured for high-risk and permission-management
/// actions.
pub fn should_capture_request_body(action: ActionType) -> bool {
    matches!(
        risk_class(action),
        RiskClass::HighRisk | RiskClass::PermissionManagement
    )
}

/// Response bodies are captured for every failure (to aid diagnosis)
/// and for all high-risk actions regardless of outcome.
pub fn should_capture_response_body(action: ActionType, outcome: AuditOutcome) -> bool {
    outcome == AuditOutcome::Failure || risk_class(action) == RiskClass::HighRisk
}

/// Retention for a risk class, in days.
pub fn class_retention_days(class: RiskClass) -> i64 {
    match class {
        RiskClass::HighRisk => 2555,
        RiskClass::Authentication | RiskClass::PermissionManagement => 1095,
        RiskClass::Routine => 365,
    }
}

/// Retention for an action, in days.
pub fn retention_days(action: ActionType) -> i64 {
    class_retention_days(risk_class(action))
}

/// Metadata fields that must accompany a record of this action.
pub fn required_metadata_fields(action: ActionType) -> Vec<&'static str> {
    let mut fields = vec!["user_agent", "ip_address"];
    match risk_class(action) {
        RiskClass::Authentication => fields.extend(["login_method", "session_id"]),
        RiskClass::PermissionManagement => fields.extend(["affected_users", "permission_changes"]),
        RiskClass::HighRisk => fields.extend(["reason", "approval_id"]),
        RiskClass::Routine => {}
    }
    fields
}

/// Substrings marking a field as secret material — always anonymized.
const SECRET_SUBSTRINGS: &[&str] = &["password", "token", "api_key", "secret"];

/// Substrings marking a field as personal data — anonymized unless the
/// action is high-risk (high-risk records retain PII for investigatory
/// completeness).
const PERSONAL_SUBSTRINGS: &[&str] = &["email", "phone", "address", "id_card"];

/// Whether a metadata field must be anonymized before storage.
pub fn should_anonymize(action: ActionType, field_name: &str) -> bool {
    let lower = field_name.to_ascii_lowercase();
    if SECRET_SUBSTRINGS.iter().any(|s| lower.contains(s)) {
        return true;
    }
    risk_class(action) != RiskClass::HighRisk
        && PERSONAL_SUBSTRINGS.iter().any(|s| lower.contains(s))
}

/// Aggregated static rule entry for an action.
#[derive(Debug, Clone)]
pub struct AuditRule {
    pub level: AuditLevel,
    pub capture_request_body: bool,
    /// Outcome-independent part of the response capture policy;
    /// failures are additionally captured at runtime via
    /// [`should_capture_response_body`].
    pub capture_response_body: bool,
    pub retention_days: i64,
    pub required_metadata_fields: Vec<&'static str>,
}

pub fn rule_for(action: ActionType) -> AuditRule {
    AuditRule {
        level: classify(action),
        capture_request_body: should_capture_request_body(action),
        capture_response_body: risk_class(action) == RiskClass::HighRisk,
        retention_days: retention_days(action),
        required_metadata_fields: required_metadata_fields(action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_delete_is_detailed_long_retention() {
        assert_eq!(classify(ActionType::UserDelete), AuditLevel::Detailed);
        assert_eq!(retention_days(ActionType::UserDelete), 2555);
        assert!(should_capture_request_body(ActionType::UserDelete));
    }

    #[test]
    fn authentication_actions_are_security_level() {
        for action in [
            ActionType::Login,
            ActionType::Logout,
            ActionType::LoginFailed,
            ActionType::TokenRefresh,
            ActionType::PasswordChange,
        ] {
            assert_eq!(classify(action), AuditLevel::Security);
            assert_eq!(retention_days(action), 1095);
        }
    }

    #[test]
    fn permission_management_is_detailed() {
        assert_eq!(classify(ActionType::PermissionGrant), AuditLevel::Detailed);
        assert!(should_capture_request_body(ActionType::RoleAssign));
        assert_eq!(retention_days(ActionType::RoleDelete), 1095);
    }

    #[test]
    fn routine_actions_default_to_basic() {
        assert_eq!(classify(ActionType::ChatSessionCreate), AuditLevel::Basic);
        assert!(!should_capture_request_body(ActionType::UserUpdate));
        assert_eq!(retention_days(ActionType::ModelConfigUpdate), 365);
    }

    #[test]
    fn risk_classes_are_disjoint_and_total() {
        for action in ActionType::ALL {
            // risk_class is a total match; this just pins a few knowns.
            let _ = risk_class(*action);
        }
        assert_eq!(risk_class(ActionType::UserDelete), RiskClass::HighRisk);
        assert_eq!(risk_class(ActionType::Login), RiskClass::Authentication);
        assert_eq!(
            risk_class(ActionType::PermissionGrant),
            RiskClass::PermissionManagement
        );
        assert_eq!(risk_class(ActionType::UserCreate), RiskClass::Routine);
    }

    #[test]
    fn failures_always_capture_response() {
        assert!(should_capture_response_body(
            ActionType::ChatSessionCreate,
            AuditOutcome::Failure
        ));
        assert!(!should_capture_response_body(
            ActionType::ChatSessionCreate,
            AuditOutcome::Success
        ));
        assert!(should_capture_response_body(
            ActionType::UserDelete,
            AuditOutcome::Success
        ));
    }

    #[test]
    fn required_fields_by_class() {
        let auth = required_metadata_fields(ActionType::Login);
        assert!(auth.contains(&"login_method") && auth.contains(&"session_id"));

        let perm = required_metadata_fields(ActionType::PermissionGrant);
        assert!(perm.contains(&"affected_users") && perm.contains(&"permission_changes"));

        let high = required_metadata_fields(ActionType::UserDelete);
        assert!(high.contains(&"reason") && high.contains(&"approval_id"));

        for fields in [&auth, &perm, &high] {
            assert!(fields.contains(&"user_agent") && fields.contains(&"ip_address"));
        }
    }

    #[test]
    fn secret_fields_always_anonymized() {
        for field in ["password", "old_password", "api_key", "refresh_token", "client_secret"] {
            assert!(should_anonymize(ActionType::UserDelete, field));
            assert!(should_anonymize(ActionType::Login, field));
        }
    }

    #[test]
    fn personal_fields_kept_for_high_risk_only() {
        assert!(should_anonymize(ActionType::Login, "email"));
        assert!(should_anonymize(ActionType::UserUpdate, "phone_number"));
        // High-risk operations retain PII.
        assert!(!should_anonymize(ActionType::UserDelete, "email"));
        assert!(!should_anonymize(ActionType::DataExport, "id_card"));
    }
}
