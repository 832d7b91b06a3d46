//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Tenant-scoped repositories
//! require a `tenant_id` parameter to enforce data isolation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CustosResult;
use crate::models::{
    audit::{ActionType, AuditOutcome, AuditRecord, CreateAuditRecord},
    chat_session::{ChatSession, CreateChatSession, UpdateChatSession},
    model_config::{CreateModelConfig, ModelConfig, UpdateModelConfig},
    permission::{CreatePermission, Permission, UpdatePermission},
    provider::{CreateProvider, Provider, UpdateProvider},
    role::{CreateRole, Role, UpdateRole},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Users (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = CustosResult<User>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CustosResult<User>> + Send;
    fn get_by_username(
        &self,
        tenant_id: Uuid,
        username: &str,
    ) -> impl Future<Output = CustosResult<User>> + Send;
    fn get_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> impl Future<Output = CustosResult<User>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = CustosResult<User>> + Send;
    /// Soft-delete: sets status to Disabled.
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = CustosResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CustosResult<PaginatedResult<User>>> + Send;

    /// Atomically advance the user's key version and return the new
    /// value.
    ///
    /// Concurrent callers may observe the same returned value only if
    /// both increments still applied (at-least-once-advance); the
    /// counter must never fail to strictly advance past every
    /// previously issued token's version.
    fn increment_key_version(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CustosResult<u32>> + Send;
}

// ---------------------------------------------------------------------------
// Roles & Permissions (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = CustosResult<Role>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CustosResult<Role>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = CustosResult<Role>> + Send;
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = CustosResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CustosResult<PaginatedResult<Role>>> + Send;

    /// Assign a role to a user (creates a `has_role` edge).
    fn assign_to_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;

    /// Remove a role assignment from a user.
    fn unassign_from_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;

    /// Get all roles assigned to a user.
    fn get_user_roles(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CustosResult<Vec<Role>>> + Send;

    /// IDs of all users currently holding the role. Used by the
    /// deletion guard and by key-version revocation propagation.
    fn find_users_with_role(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CustosResult<Vec<Uuid>>> + Send;
}

pub trait PermissionRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = CustosResult<Permission>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CustosResult<Permission>> + Send;
    fn get_by_name(
        &self,
        tenant_id: Uuid,
        name: &str,
    ) -> impl Future<Output = CustosResult<Permission>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdatePermission,
    ) -> impl Future<Output = CustosResult<Permission>> + Send;
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = CustosResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CustosResult<PaginatedResult<Permission>>> + Send;

    /// Grant a permission to a role (creates a `grants` edge).
    fn grant_to_role(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;

    /// Revoke a permission from a role.
    fn revoke_from_role(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;

    /// Get all permissions granted to a role.
    fn get_role_permissions(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CustosResult<Vec<Permission>>> + Send;

    /// Get the union of permissions granted to a user through all of
    /// their roles (duplicates collapsed by name).
    fn get_user_permissions(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CustosResult<Vec<Permission>>> + Send;

    /// IDs of all roles referencing the permission. Used by the
    /// deletion guard.
    fn find_roles_referencing(
        &self,
        tenant_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = CustosResult<Vec<Uuid>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit records (append-only, tenant-scoped)
// ---------------------------------------------------------------------------

/// Query filters for audit records.
#[derive(Debug, Clone, Default)]
pub struct AuditRecordFilter {
    pub actor_id: Option<Uuid>,
    pub action: Option<ActionType>,
    pub outcome: Option<AuditOutcome>,
    pub resource_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Aggregate counts for administrative review.
#[derive(Debug, Clone, Default)]
pub struct AuditStats {
    pub total: u64,
    pub successes: u64,
    pub failures: u64,
    pub by_action: BTreeMap<String, u64>,
}

pub trait AuditRecordRepository: Send + Sync {
    /// Append a new audit record. No update operation exists.
    fn append(
        &self,
        input: CreateAuditRecord,
    ) -> impl Future<Output = CustosResult<AuditRecord>> + Send;

    /// Filtered page of records plus the total match count, newest
    /// first.
    fn find_with_count(
        &self,
        tenant_id: Uuid,
        filter: AuditRecordFilter,
        pagination: Pagination,
    ) -> impl Future<Output = CustosResult<PaginatedResult<AuditRecord>>> + Send;

    /// Aggregate counts for records created at or after `since`.
    fn stats(
        &self,
        tenant_id: Uuid,
        since: DateTime<Utc>,
    ) -> impl Future<Output = CustosResult<AuditStats>> + Send;

    /// Delete at most `batch_size` records created before `cutoff`,
    /// optionally restricted to the given action labels; returns the
    /// number deleted. Callers loop over this to sweep with bounded
    /// batches.
    fn delete_before(
        &self,
        tenant_id: Uuid,
        cutoff: DateTime<Utc>,
        actions: Option<Vec<String>>,
        batch_size: u64,
    ) -> impl Future<Output = CustosResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Platform CRUD (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait ProviderRepository: Send + Sync {
    fn create(&self, input: CreateProvider) -> impl Future<Output = CustosResult<Provider>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CustosResult<Provider>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateProvider,
    ) -> impl Future<Output = CustosResult<Provider>> + Send;
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = CustosResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CustosResult<PaginatedResult<Provider>>> + Send;
}

pub trait ModelConfigRepository: Send + Sync {
    fn create(
        &self,
        input: CreateModelConfig,
    ) -> impl Future<Output = CustosResult<ModelConfig>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CustosResult<ModelConfig>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateModelConfig,
    ) -> impl Future<Output = CustosResult<ModelConfig>> + Send;
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = CustosResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CustosResult<PaginatedResult<ModelConfig>>> + Send;
}

pub trait ChatSessionRepository: Send + Sync {
    fn create(
        &self,
        input: CreateChatSession,
    ) -> impl Future<Output = CustosResult<ChatSession>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CustosResult<ChatSession>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateChatSession,
    ) -> impl Future<Output = CustosResult<ChatSession>> + Send;
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = CustosResult<()>> + Send;
    fn list_by_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CustosResult<PaginatedResult<ChatSession>>> + Send;
}
