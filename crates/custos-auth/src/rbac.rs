//! Role and permission management — lifecycle guards and key-version
//! revocation propagation.
//!
//! Every privilege-affecting mutation here advances the key version of
//! the affected principals, invalidating their outstanding access
//! tokens. Forgetting that bump would silently leave stale tokens
//! valid until natural expiry, so all mutation paths go through this
//! service.

use custos_core::error::{CustosError, CustosResult};
use custos_core::models::permission::{CreatePermission, Permission, PermissionName, UpdatePermission};
use custos_core::models::role::{CreateRole, Role, UpdateRole};
use custos_core::models::user::{UpdateUser, User, UserStatus};
use custos_core::repository::{PermissionRepository, RoleRepository, UserRepository};
use tracing::info;
use uuid::Uuid;

/// Role/permission management service.
pub struct RbacService<U, R, P>
where
    U: UserRepository,
    R: RoleRepository,
    P: PermissionRepository,
{
    user_repo: U,
    role_repo: R,
    perm_repo: P,
}

impl<U, R, P> RbacService<U, R, P>
where
    U: UserRepository,
    R: RoleRepository,
    P: PermissionRepository,
{
    pub fn new(user_repo: U, role_repo: R, perm_repo: P) -> Self {
        Self {
            user_repo,
            role_repo,
            perm_repo,
        }
    }

    /// Bump the key version of every user currently holding the role.
    async fn revoke_role_holders(&self, tenant_id: Uuid, role_id: Uuid) -> CustosResult<()> {
        let holders = self.role_repo.find_users_with_role(tenant_id, role_id).await?;
        for user_id in holders {
            self.user_repo
                .increment_key_version(tenant_id, user_id)
                .await?;
        }
        Ok(())
    }

    // -- Roles --------------------------------------------------------

    pub async fn create_role(&self, input: CreateRole) -> CustosResult<Role> {
        self.role_repo.create(input).await
    }

    /// Update display metadata. The permission set and the
    /// `is_system_role` flag are not touched here.
    pub async fn update_role(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        input: UpdateRole,
    ) -> CustosResult<Role> {
        self.role_repo.update(tenant_id, role_id, input).await
    }

    /// Delete a role. Blocked for system roles and for roles still
    /// held by any user.
    pub async fn delete_role(&self, tenant_id: Uuid, role_id: Uuid) -> CustosResult<()> {
        let role = self.role_repo.get_by_id(tenant_id, role_id).await?;
        if role.is_system_role {
            return Err(CustosError::BusinessRule {
                message: format!("system role `{}` cannot be deleted", role.name),
            });
        }
        let holders = self.role_repo.find_users_with_role(tenant_id, role_id).await?;
        if !holders.is_empty() {
            return Err(CustosError::BusinessRule {
                message: format!(
                    "role `{}` is still assigned to {} user(s)",
                    role.name,
                    holders.len()
                ),
            });
        }
        self.role_repo.delete(tenant_id, role_id).await
    }

    /// Assign a role to a user and revoke their outstanding tokens.
    pub async fn assign_role(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> CustosResult<()> {
        // Surface NotFound before touching the edge.
        self.role_repo.get_by_id(tenant_id, role_id).await?;
        self.user_repo.get_by_id(tenant_id, user_id).await?;

        self.role_repo
            .assign_to_user(tenant_id, user_id, role_id)
            .await?;
        let version = self
            .user_repo
            .increment_key_version(tenant_id, user_id)
            .await?;
        info!(%tenant_id, %user_id, %role_id, key_version = version, "role assigned");
        Ok(())
    }

    /// Remove a role from a user and revoke their outstanding tokens.
    pub async fn unassign_role(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> CustosResult<()> {
        self.role_repo
            .unassign_from_user(tenant_id, user_id, role_id)
            .await?;
        let version = self
            .user_repo
            .increment_key_version(tenant_id, user_id)
            .await?;
        info!(%tenant_id, %user_id, %role_id, key_version = version, "role unassigned");
        Ok(())
    }

    // -- Permissions --------------------------------------------------

    /// Create a permission. The name must parse as a valid
    /// `module.resource.action` identifier.
    pub async fn create_permission(&self, input: CreatePermission) -> CustosResult<Permission> {
        PermissionName::parse(&input.name)?;
        self.perm_repo.create(input).await
    }

    pub async fn update_permission(
        &self,
        tenant_id: Uuid,
        permission_id: Uuid,
        input: UpdatePermission,
    ) -> CustosResult<Permission> {
        self.perm_repo.update(tenant_id, permission_id, input).await
    }

    /// Delete a permission. Blocked while any role still references it.
    pub async fn delete_permission(
        &self,
        tenant_id: Uuid,
        permission_id: Uuid,
    ) -> CustosResult<()> {
        let referencing = self
            .perm_repo
            .find_roles_referencing(tenant_id, permission_id)
            .await?;
        if !referencing.is_empty() {
            return Err(CustosError::BusinessRule {
                message: format!(
                    "permission is still referenced by {} role(s)",
                    referencing.len()
                ),
            });
        }
        self.perm_repo.delete(tenant_id, permission_id).await
    }

    /// Grant a permission to a role. Blocked for system roles; revokes
    /// outstanding tokens of every role holder.
    pub async fn grant_permission(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> CustosResult<()> {
        let role = self.role_repo.get_by_id(tenant_id, role_id).await?;
        if role.is_system_role {
            return Err(CustosError::BusinessRule {
                message: format!("system role `{}` permissions cannot be changed", role.name),
            });
        }
        self.perm_repo
            .grant_to_role(tenant_id, role_id, permission_id)
            .await?;
        self.revoke_role_holders(tenant_id, role_id).await?;
        info!(%tenant_id, %role_id, %permission_id, "permission granted");
        Ok(())
    }

    /// Revoke a permission from a role. Blocked for system roles;
    /// revokes outstanding tokens of every role holder.
    pub async fn revoke_permission(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> CustosResult<()> {
        let role = self.role_repo.get_by_id(tenant_id, role_id).await?;
        if role.is_system_role {
            return Err(CustosError::BusinessRule {
                message: format!("system role `{}` permissions cannot be changed", role.name),
            });
        }
        self.perm_repo
            .revoke_from_role(tenant_id, role_id, permission_id)
            .await?;
        self.revoke_role_holders(tenant_id, role_id).await?;
        info!(%tenant_id, %role_id, %permission_id, "permission revoked");
        Ok(())
    }

    // -- Users --------------------------------------------------------

    /// Suspend a user and revoke their outstanding tokens.
    pub async fn suspend_user(&self, tenant_id: Uuid, user_id: Uuid) -> CustosResult<User> {
        let user = self
            .user_repo
            .update(
                tenant_id,
                user_id,
                UpdateUser {
                    status: Some(UserStatus::Suspended),
                    ..Default::default()
                },
            )
            .await?;
        self.user_repo
            .increment_key_version(tenant_id, user_id)
            .await?;
        info!(%tenant_id, %user_id, "user suspended");
        Ok(user)
    }

    /// Soft-delete a user and revoke their outstanding tokens.
    pub async fn delete_user(&self, tenant_id: Uuid, user_id: Uuid) -> CustosResult<()> {
        self.user_repo.delete(tenant_id, user_id).await?;
        self.user_repo
            .increment_key_version(tenant_id, user_id)
            .await?;
        info!(%tenant_id, %user_id, "user deleted");
        Ok(())
    }
}
