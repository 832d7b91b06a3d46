//! Permission domain model and the wildcard name/coverage algebra.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::CustosError;

/// Wildcard segment, valid in any of the three positions.
pub const WILDCARD: &str = "*";

/// Errors from parsing a permission name string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionNameError {
    #[error("expected exactly three dot-separated segments, got {found} in `{raw}`")]
    SegmentCount { raw: String, found: usize },

    #[error("invalid segment `{segment}` in `{raw}`")]
    InvalidSegment { raw: String, segment: String },
}

impl From<PermissionNameError> for CustosError {
    fn from(err: PermissionNameError) -> Self {
        CustosError::InvalidPermissionName {
            reason: err.to_string(),
        }
    }
}

/// A three-part hierarchical permission identifier:
/// `module.resource.action`.
///
/// Each segment is either the wildcard `*` or a lowercase identifier
/// (`[a-z][a-z0-9_]*`). The string form always has exactly three
/// dot-separated segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionName {
    module: String,
    resource: String,
    action: String,
}

/// A segment is `*` or a lowercase identifier starting with a letter.
fn valid_segment(segment: &str) -> bool {
    if segment == WILDCARD {
        return true;
    }
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Equal, or the covering side is a wildcard.
fn segment_covers(covering: &str, covered: &str) -> bool {
    covering == WILDCARD || covering == covered
}

/// The fixed two-level action hierarchy. Actions outside this table
/// only match by equality or wildcard.
fn action_implies(covering: &str, covered: &str) -> bool {
    match covering {
        "admin" => matches!(covered, "create" | "read" | "update" | "delete" | "manage"),
        "manage" => matches!(covered, "create" | "read" | "update" | "delete"),
        "write" => matches!(covered, "create" | "update"),
        _ => false,
    }
}

impl PermissionName {
    /// Parse a `module.resource.action` string.
    pub fn parse(raw: &str) -> Result<Self, PermissionNameError> {
        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() != 3 {
            return Err(PermissionNameError::SegmentCount {
                raw: raw.into(),
                found: segments.len(),
            });
        }
        for segment in &segments {
            if !valid_segment(segment) {
                return Err(PermissionNameError::InvalidSegment {
                    raw: raw.into(),
                    segment: (*segment).into(),
                });
            }
        }
        Ok(Self {
            module: segments[0].into(),
            resource: segments[1].into(),
            action: segments[2].into(),
        })
    }

    /// The global wildcard `*.*.*`, granted synthetically to super admins.
    pub fn global_wildcard() -> Self {
        Self {
            module: WILDCARD.into(),
            resource: WILDCARD.into(),
            action: WILDCARD.into(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// One-directional coverage: does this name's scope fully subsume
    /// `other`?
    ///
    /// Module and resource match by equality or a wildcard on this
    /// side; the action matches by equality, wildcard, or the fixed
    /// action hierarchy (`admin` ⊇ {create, read, update, delete,
    /// manage}; `manage` ⊇ {create, read, update, delete}; `write` ⊇
    /// {create, update}). Not symmetric, and not transitive beyond the
    /// hierarchy table.
    pub fn covers(&self, other: &PermissionName) -> bool {
        segment_covers(&self.module, &other.module)
            && segment_covers(&self.resource, &other.resource)
            && (segment_covers(&self.action, &other.action)
                || action_implies(&self.action, &other.action))
    }
}

impl fmt::Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.module, self.resource, self.action)
    }
}

impl FromStr for PermissionName {
    type Err = PermissionNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PermissionName {
    type Error = PermissionNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PermissionName> for String {
    fn from(name: PermissionName) -> Self {
        name.to_string()
    }
}

impl PartialEq for PermissionName {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module
            && self.resource == other.resource
            && self.action == other.action
    }
}

impl Eq for PermissionName {}

impl Hash for PermissionName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.module.hash(state);
        self.resource.hash(state);
        self.action.hash(state);
    }
}

/// A grantable permission. Identity (equality, hashing) is by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: PermissionName,
    pub display_name: String,
    pub description: String,
    /// Optional display-module override; the name's module segment is
    /// authoritative for matching.
    pub module: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    /// The synthetic `*.*.*` permission returned for super admins.
    /// Never persisted; carries the nil UUID.
    pub fn synthetic_wildcard(tenant_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            tenant_id,
            name: PermissionName::global_wildcard(),
            display_name: "Super administrator".into(),
            description: "Synthetic global wildcard".into(),
            module: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl PartialEq for Permission {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Permission {}

impl Hash for Permission {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub tenant_id: Uuid,
    /// `module.resource.action` string; validated before storage.
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub module: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePermission {
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub module: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> PermissionName {
        PermissionName::parse(s).unwrap()
    }

    #[test]
    fn parse_roundtrip() {
        for s in ["user.users.read", "*.*.*", "model.models.*", "a.b2_c.write"] {
            let parsed = name(s);
            assert_eq!(PermissionName::parse(&parsed.to_string()).unwrap(), parsed);
        }
    }

    #[test]
    fn parse_rejects_wrong_segment_count() {
        assert!(matches!(
            PermissionName::parse("user.users"),
            Err(PermissionNameError::SegmentCount { found: 2, .. })
        ));
        assert!(matches!(
            PermissionName::parse("a.b.c.d"),
            Err(PermissionNameError::SegmentCount { found: 4, .. })
        ));
    }

    #[test]
    fn parse_rejects_bad_segments() {
        for s in [
            "User.users.read",
            "user..read",
            "user.users.Read",
            "1user.users.read",
            "user.us-ers.read",
            "user.users.**",
        ] {
            assert!(
                matches!(
                    PermissionName::parse(s),
                    Err(PermissionNameError::InvalidSegment { .. })
                ),
                "expected rejection for {s}"
            );
        }
    }

    #[test]
    fn global_wildcard_covers_everything() {
        let all = name("*.*.*");
        for s in ["user.users.read", "model.models.delete", "*.*.*", "user.*.*"] {
            assert!(all.covers(&name(s)), "*.*.* should cover {s}");
        }
    }

    #[test]
    fn module_wildcard_scopes_by_module() {
        let user_all = name("user.*.*");
        assert!(user_all.covers(&name("user.roles.create")));
        assert!(!user_all.covers(&name("model.models.view")));
    }

    #[test]
    fn action_hierarchy_covering() {
        assert!(name("user.users.admin").covers(&name("user.users.delete")));
        assert!(name("user.users.admin").covers(&name("user.users.manage")));
        assert!(name("user.users.manage").covers(&name("user.users.create")));
        assert!(name("user.users.write").covers(&name("user.users.update")));
        assert!(!name("user.users.read").covers(&name("user.users.delete")));
        // manage does not reach back up to admin.
        assert!(!name("user.users.manage").covers(&name("user.users.admin")));
        // write does not cover delete.
        assert!(!name("user.users.write").covers(&name("user.users.delete")));
    }

    #[test]
    fn hierarchy_is_not_transitive_through_unknown_actions() {
        // Actions outside the table only match by equality or wildcard.
        assert!(!name("user.users.export").covers(&name("user.users.read")));
        assert!(name("user.users.export").covers(&name("user.users.export")));
        assert!(name("user.users.*").covers(&name("user.users.export")));
    }

    #[test]
    fn coverage_is_not_symmetric() {
        let broad = name("user.users.*");
        let narrow = name("user.users.read");
        assert!(broad.covers(&narrow));
        assert!(!narrow.covers(&broad));
    }

    #[test]
    fn permission_equality_is_by_name() {
        let tenant = Uuid::new_v4();
        let mut a = Permission::synthetic_wildcard(tenant);
        let mut b = Permission::synthetic_wildcard(tenant);
        a.id = Uuid::new_v4();
        b.id = Uuid::new_v4();
        b.display_name = "other".into();
        assert_eq!(a, b);
    }
}
