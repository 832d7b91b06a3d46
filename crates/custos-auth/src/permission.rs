//! Effective-permission computation and the request-time authorization
//! check.
//!
//! The calculation functions are pure and side-effect free; they
//! operate on data already loaded for the request and are safe to run
//! concurrently. Coverage is enforced again at check time, so the
//! reduction here is an optimization, not the authorization path
//! itself.

use std::collections::{BTreeMap, HashSet};

use custos_core::error::CustosResult;
use custos_core::models::permission::{Permission, WILDCARD};
use custos_core::models::user::User;
use custos_core::repository::{PermissionRepository, UserRepository};
use tracing::warn;
use uuid::Uuid;

/// Compute the effective permission set for a principal.
///
/// Super admins short-circuit to the singleton synthetic `*.*.*`
/// regardless of assigned roles; inactive principals get the empty
/// set. Otherwise the union of role grants is deduplicated by name and
/// reduced by coverage.
pub fn effective_permissions(user: &User, granted: Vec<Permission>) -> Vec<Permission> {
    if user.is_super_admin {
        return vec![Permission::synthetic_wildcard(user.tenant_id)];
    }
    if !user.is_active() {
        return Vec::new();
    }
    resolve_hierarchy(granted)
}

/// Drop every permission made redundant by a broader one in the same
/// set.
///
/// Exact-name duplicates are deduplicated by equality first; a
/// permission is then dropped only when some *other* name in the set
/// covers it. Mutually non-covering pairs are both kept — coverage is
/// not a total order, so the reduced set is minimal with respect to
/// the documented relation, not guaranteed minimal in size.
pub fn resolve_hierarchy(perms: Vec<Permission>) -> Vec<Permission> {
    let mut seen = HashSet::new();
    let deduped: Vec<Permission> = perms
        .into_iter()
        .filter(|p| seen.insert(p.name.clone()))
        .collect();

    deduped
        .iter()
        .filter(|p| {
            !deduped
                .iter()
                .any(|q| q.name != p.name && q.name.covers(&p.name))
        })
        .cloned()
        .collect()
}

/// Group permissions as module → resource → actions, for display and
/// audit review. Carries no independent authorization weight.
pub fn permission_matrix(perms: &[Permission]) -> BTreeMap<String, BTreeMap<String, Vec<String>>> {
    let mut matrix: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
    for perm in perms {
        matrix
            .entry(perm.name.module().to_string())
            .or_default()
            .entry(perm.name.resource().to_string())
            .or_default()
            .push(perm.name.action().to_string());
    }
    for resources in matrix.values_mut() {
        for actions in resources.values_mut() {
            actions.sort();
            actions.dedup();
        }
    }
    matrix
}

/// Flatten permissions into `resource:action` strings for caching on
/// the request context. Wildcards are preserved (`*.*.*` → `*:*`).
pub fn flatten_permissions(perms: &[Permission]) -> HashSet<String> {
    perms
        .iter()
        .map(|p| format!("{}:{}", p.name.resource(), p.name.action()))
        .collect()
}

/// Request-time check against precomputed permission strings: exact
/// match, then resource-level wildcard, then global wildcard.
///
/// Never errors — the caller's access-control gate converts `false`
/// into a denial and is responsible for auditing it where the action
/// is security-relevant.
pub fn has_permission(flattened: &HashSet<String>, resource: &str, action: &str) -> bool {
    flattened.contains(&format!("{resource}:{action}"))
        || flattened.contains(&format!("{resource}:{WILDCARD}"))
        || flattened.contains(&format!("{WILDCARD}:{WILDCARD}"))
}

/// Loads principals and their grants from the repositories and runs
/// the calculation engine.
///
/// Generic over repository implementations so that the auth layer has
/// no dependency on the database crate.
pub struct PermissionService<U: UserRepository, P: PermissionRepository> {
    user_repo: U,
    perm_repo: P,
}

impl<U: UserRepository, P: PermissionRepository> PermissionService<U, P> {
    pub fn new(user_repo: U, perm_repo: P) -> Self {
        Self {
            user_repo,
            perm_repo,
        }
    }

    /// Effective, coverage-reduced permission set for a principal.
    pub async fn effective_permissions(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> CustosResult<Vec<Permission>> {
        let user = self.user_repo.get_by_id(tenant_id, user_id).await?;
        if user.is_super_admin || !user.is_active() {
            // No grant lookup needed for either short-circuit.
            return Ok(effective_permissions(&user, Vec::new()));
        }
        let granted = self.perm_repo.get_user_permissions(tenant_id, user_id).await?;
        Ok(effective_permissions(&user, granted))
    }

    /// Module → resource → actions view of the effective set.
    pub async fn permission_matrix(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> CustosResult<BTreeMap<String, BTreeMap<String, Vec<String>>>> {
        let perms = self.effective_permissions(tenant_id, user_id).await?;
        Ok(permission_matrix(&perms))
    }

    /// Non-throwing authorization predicate. Repository failures are
    /// logged and reported as a denial rather than surfaced.
    pub async fn check(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        resource: &str,
        action: &str,
    ) -> bool {
        match self.effective_permissions(tenant_id, user_id).await {
            Ok(perms) => has_permission(&flatten_permissions(&perms), resource, action),
            Err(err) => {
                warn!(
                    %tenant_id,
                    %user_id,
                    resource,
                    action,
                    error = %err,
                    "permission check failed to load grants; denying"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use custos_core::models::permission::PermissionName;
    use custos_core::models::user::UserStatus;

    fn perm(name: &str) -> Permission {
        let now = Utc::now();
        Permission {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            name: PermissionName::parse(name).unwrap(),
            display_name: name.into(),
            description: String::new(),
            module: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(status: UserStatus, is_super_admin: bool) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: String::new(),
            status,
            is_super_admin,
            key_version: 1,
            metadata: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    fn names(perms: &[Permission]) -> Vec<String> {
        let mut out: Vec<String> = perms.iter().map(|p| p.name.to_string()).collect();
        out.sort();
        out
    }

    #[test]
    fn super_admin_gets_singleton_wildcard() {
        let u = user(UserStatus::Active, true);
        let result = effective_permissions(&u, vec![perm("user.users.read")]);
        assert_eq!(names(&result), vec!["*.*.*"]);
    }

    #[test]
    fn inactive_principal_gets_empty_set() {
        for status in [UserStatus::Suspended, UserStatus::Disabled] {
            let u = user(status, false);
            let result = effective_permissions(&u, vec![perm("user.users.read")]);
            assert!(result.is_empty());
        }
    }

    #[test]
    fn covered_permission_is_dropped() {
        let reduced = resolve_hierarchy(vec![perm("user.users.read"), perm("user.users.*")]);
        assert_eq!(names(&reduced), vec!["user.users.*"]);
    }

    #[test]
    fn mutually_non_covering_pair_both_kept() {
        let reduced = resolve_hierarchy(vec![perm("user.users.read"), perm("model.models.read")]);
        assert_eq!(names(&reduced), vec!["model.models.read", "user.users.read"]);
    }

    #[test]
    fn exact_duplicates_dedupe_without_self_covering() {
        let reduced = resolve_hierarchy(vec![perm("user.users.read"), perm("user.users.read")]);
        assert_eq!(names(&reduced), vec!["user.users.read"]);
    }

    #[test]
    fn action_hierarchy_reduces() {
        let reduced = resolve_hierarchy(vec![
            perm("user.users.admin"),
            perm("user.users.delete"),
            perm("user.users.manage"),
        ]);
        assert_eq!(names(&reduced), vec!["user.users.admin"]);
    }

    #[test]
    fn role_union_reduction_end_to_end() {
        // R1 grants user.users.read, R2 grants user.users.* — the
        // union reduces to the broader grant only.
        let u = user(UserStatus::Active, false);
        let result =
            effective_permissions(&u, vec![perm("user.users.read"), perm("user.users.*")]);
        assert_eq!(names(&result), vec!["user.users.*"]);
    }

    #[test]
    fn matrix_groups_by_module_and_resource() {
        let matrix = permission_matrix(&[
            perm("user.users.read"),
            perm("user.users.create"),
            perm("user.roles.read"),
            perm("model.models.view"),
        ]);
        assert_eq!(matrix["user"]["users"], vec!["create", "read"]);
        assert_eq!(matrix["user"]["roles"], vec!["read"]);
        assert_eq!(matrix["model"]["models"], vec!["view"]);
    }

    #[test]
    fn flattened_check_rules_in_order() {
        let flattened = flatten_permissions(&[perm("user.users.read"), perm("chat.sessions.*")]);
        assert!(has_permission(&flattened, "users", "read"));
        assert!(!has_permission(&flattened, "users", "delete"));
        assert!(has_permission(&flattened, "sessions", "delete"));

        let all = flatten_permissions(&[Permission::synthetic_wildcard(Uuid::nil())]);
        assert!(has_permission(&all, "anything", "at_all"));
    }
}
