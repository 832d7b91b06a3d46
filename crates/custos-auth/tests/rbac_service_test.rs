//! Integration tests for RBAC management guards, key-version
//! revocation propagation, and the permission service.

use custos_auth::permission::PermissionService;
use custos_auth::rbac::RbacService;
use custos_core::error::CustosError;
use custos_core::models::permission::CreatePermission;
use custos_core::models::role::{CreateRole, RoleType};
use custos_core::models::user::{CreateUser, UserStatus};
use custos_core::repository::{RoleRepository, UserRepository};
use custos_db::repository::{
    SurrealPermissionRepository, SurrealRoleRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;

struct Harness {
    db: Surreal<Db>,
    tenant_id: Uuid,
}

impl Harness {
    async fn new() -> Self {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        custos_db::run_migrations(&db).await.unwrap();
        Self {
            db,
            tenant_id: Uuid::new_v4(),
        }
    }

    fn users(&self) -> SurrealUserRepository<Db> {
        SurrealUserRepository::new(self.db.clone())
    }

    fn roles(&self) -> SurrealRoleRepository<Db> {
        SurrealRoleRepository::new(self.db.clone())
    }

    fn perms(&self) -> SurrealPermissionRepository<Db> {
        SurrealPermissionRepository::new(self.db.clone())
    }

    fn rbac(&self) -> RbacService<SurrealUserRepository<Db>, SurrealRoleRepository<Db>, SurrealPermissionRepository<Db>> {
        RbacService::new(self.users(), self.roles(), self.perms())
    }

    fn permission_service(&self) -> PermissionService<SurrealUserRepository<Db>, SurrealPermissionRepository<Db>> {
        PermissionService::new(self.users(), self.perms())
    }

    async fn user(&self, username: &str, is_super_admin: bool) -> Uuid {
        self.users()
            .create(CreateUser {
                tenant_id: self.tenant_id,
                username: username.into(),
                email: format!("{username}@example.com"),
                password: "correct-horse-battery".into(),
                is_super_admin,
                metadata: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn role(&self, name: &str, is_system_role: bool) -> Uuid {
        self.roles()
            .create(CreateRole {
                tenant_id: self.tenant_id,
                name: name.into(),
                display_name: name.into(),
                description: String::new(),
                role_type: RoleType::Custom,
                is_system_role,
            })
            .await
            .unwrap()
            .id
    }

    async fn permission(&self, name: &str) -> Uuid {
        self.rbac()
            .create_permission(CreatePermission {
                tenant_id: self.tenant_id,
                name: name.into(),
                display_name: name.into(),
                description: String::new(),
                module: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn key_version(&self, user_id: Uuid) -> u32 {
        self.users()
            .get_by_id(self.tenant_id, user_id)
            .await
            .unwrap()
            .key_version
    }
}

#[tokio::test]
async fn malformed_permission_name_is_rejected() {
    let h = Harness::new().await;
    let result = h
        .rbac()
        .create_permission(CreatePermission {
            tenant_id: h.tenant_id,
            name: "not-a-permission".into(),
            display_name: "bad".into(),
            description: String::new(),
            module: None,
        })
        .await;
    assert!(matches!(
        result,
        Err(CustosError::InvalidPermissionName { .. })
    ));
}

#[tokio::test]
async fn system_role_cannot_be_deleted_or_mutated() {
    let h = Harness::new().await;
    let rbac = h.rbac();
    let role_id = h.role("platform_admin", true).await;
    let perm_id = h.permission("user.users.admin").await;

    assert!(matches!(
        rbac.delete_role(h.tenant_id, role_id).await,
        Err(CustosError::BusinessRule { .. })
    ));
    assert!(matches!(
        rbac.grant_permission(h.tenant_id, role_id, perm_id).await,
        Err(CustosError::BusinessRule { .. })
    ));
    assert!(matches!(
        rbac.revoke_permission(h.tenant_id, role_id, perm_id).await,
        Err(CustosError::BusinessRule { .. })
    ));
}

#[tokio::test]
async fn role_in_use_cannot_be_deleted() {
    let h = Harness::new().await;
    let rbac = h.rbac();
    let user_id = h.user("alice", false).await;
    let role_id = h.role("reader", false).await;

    rbac.assign_role(h.tenant_id, user_id, role_id)
        .await
        .unwrap();
    assert!(matches!(
        rbac.delete_role(h.tenant_id, role_id).await,
        Err(CustosError::BusinessRule { .. })
    ));

    rbac.unassign_role(h.tenant_id, user_id, role_id)
        .await
        .unwrap();
    assert!(rbac.delete_role(h.tenant_id, role_id).await.is_ok());
}

#[tokio::test]
async fn referenced_permission_cannot_be_deleted() {
    let h = Harness::new().await;
    let rbac = h.rbac();
    let role_id = h.role("reader", false).await;
    let perm_id = h.permission("user.users.read").await;

    rbac.grant_permission(h.tenant_id, role_id, perm_id)
        .await
        .unwrap();
    assert!(matches!(
        rbac.delete_permission(h.tenant_id, perm_id).await,
        Err(CustosError::BusinessRule { .. })
    ));

    rbac.revoke_permission(h.tenant_id, role_id, perm_id)
        .await
        .unwrap();
    assert!(rbac.delete_permission(h.tenant_id, perm_id).await.is_ok());
}

#[tokio::test]
async fn privilege_changes_bump_key_version() {
    let h = Harness::new().await;
    let rbac = h.rbac();
    let alice = h.user("alice", false).await;
    let bob = h.user("bob", false).await;
    let role_id = h.role("reader", false).await;
    let perm_id = h.permission("user.users.read").await;

    assert_eq!(h.key_version(alice).await, 1);

    rbac.assign_role(h.tenant_id, alice, role_id).await.unwrap();
    assert_eq!(h.key_version(alice).await, 2);

    rbac.assign_role(h.tenant_id, bob, role_id).await.unwrap();

    // Granting to the role revokes every holder.
    let alice_before = h.key_version(alice).await;
    let bob_before = h.key_version(bob).await;
    rbac.grant_permission(h.tenant_id, role_id, perm_id)
        .await
        .unwrap();
    assert_eq!(h.key_version(alice).await, alice_before + 1);
    assert_eq!(h.key_version(bob).await, bob_before + 1);

    let alice_before = h.key_version(alice).await;
    rbac.unassign_role(h.tenant_id, alice, role_id)
        .await
        .unwrap();
    assert_eq!(h.key_version(alice).await, alice_before + 1);

    // Revoking the permission now only touches bob.
    let alice_before = h.key_version(alice).await;
    let bob_before = h.key_version(bob).await;
    rbac.revoke_permission(h.tenant_id, role_id, perm_id)
        .await
        .unwrap();
    assert_eq!(h.key_version(alice).await, alice_before);
    assert_eq!(h.key_version(bob).await, bob_before + 1);
}

#[tokio::test]
async fn suspend_and_delete_revoke_tokens() {
    let h = Harness::new().await;
    let rbac = h.rbac();
    let alice = h.user("alice", false).await;

    let suspended = rbac.suspend_user(h.tenant_id, alice).await.unwrap();
    assert_eq!(suspended.status, UserStatus::Suspended);
    assert_eq!(h.key_version(alice).await, 2);

    rbac.delete_user(h.tenant_id, alice).await.unwrap();
    assert_eq!(h.key_version(alice).await, 3);
    let user = h.users().get_by_id(h.tenant_id, alice).await.unwrap();
    assert_eq!(user.status, UserStatus::Disabled);
}

#[tokio::test]
async fn effective_permissions_reduce_across_roles() {
    let h = Harness::new().await;
    let rbac = h.rbac();
    let alice = h.user("alice", false).await;
    let r1 = h.role("reader", false).await;
    let r2 = h.role("user_admin", false).await;
    let read = h.permission("user.users.read").await;
    let all = h.permission("user.users.*").await;

    rbac.grant_permission(h.tenant_id, r1, read).await.unwrap();
    rbac.grant_permission(h.tenant_id, r2, all).await.unwrap();
    rbac.assign_role(h.tenant_id, alice, r1).await.unwrap();
    rbac.assign_role(h.tenant_id, alice, r2).await.unwrap();

    let svc = h.permission_service();
    let effective = svc
        .effective_permissions(h.tenant_id, alice)
        .await
        .unwrap();
    let names: Vec<String> = effective.iter().map(|p| p.name.to_string()).collect();
    assert_eq!(names, vec!["user.users.*"]);

    assert!(svc.check(h.tenant_id, alice, "users", "delete").await);
    assert!(svc.check(h.tenant_id, alice, "users", "read").await);
    assert!(!svc.check(h.tenant_id, alice, "models", "view").await);

    let matrix = svc.permission_matrix(h.tenant_id, alice).await.unwrap();
    assert_eq!(matrix["user"]["users"], vec!["*"]);
}

#[tokio::test]
async fn super_admin_and_inactive_short_circuits() {
    let h = Harness::new().await;
    let rbac = h.rbac();
    let root = h.user("root", true).await;
    let alice = h.user("alice", false).await;
    let role_id = h.role("reader", false).await;
    let read = h.permission("user.users.read").await;

    rbac.grant_permission(h.tenant_id, role_id, read)
        .await
        .unwrap();
    rbac.assign_role(h.tenant_id, alice, role_id).await.unwrap();

    let svc = h.permission_service();

    // Super admin gets the singleton wildcard regardless of roles.
    let effective = svc.effective_permissions(h.tenant_id, root).await.unwrap();
    let names: Vec<String> = effective.iter().map(|p| p.name.to_string()).collect();
    assert_eq!(names, vec!["*.*.*"]);
    assert!(svc.check(h.tenant_id, root, "anything", "whatever").await);

    // Suspension empties the effective set and denies checks.
    rbac.suspend_user(h.tenant_id, alice).await.unwrap();
    let effective = svc.effective_permissions(h.tenant_id, alice).await.unwrap();
    assert!(effective.is_empty());
    assert!(!svc.check(h.tenant_id, alice, "users", "read").await);
}

#[tokio::test]
async fn check_denies_on_missing_user() {
    let h = Harness::new().await;
    let svc = h.permission_service();
    assert!(!svc.check(h.tenant_id, Uuid::new_v4(), "users", "read").await);
}
