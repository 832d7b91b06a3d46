//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users (tenant scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE user TYPE string;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD status ON TABLE user TYPE string \
    ASSERT $value IN ['Active', 'Suspended', 'Disabled'];
DEFINE FIELD is_super_admin ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD key_version ON TABLE user TYPE int DEFAULT 1 \
    ASSERT $value >= 1;
DEFINE FIELD metadata ON TABLE user TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_tenant_username ON TABLE user \
    COLUMNS tenant_id, username UNIQUE;
DEFINE INDEX idx_user_tenant_email ON TABLE user \
    COLUMNS tenant_id, email UNIQUE;

-- =======================================================================
-- Roles (tenant scope)
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE role TYPE string;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD display_name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE string;
DEFINE FIELD role_type ON TABLE role TYPE string \
    ASSERT $value IN ['Admin', 'Developer', 'User', 'Custom'];
DEFINE FIELD is_system_role ON TABLE role TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_tenant_name ON TABLE role \
    COLUMNS tenant_id, name UNIQUE;

-- =======================================================================
-- Permissions (tenant scope)
-- =======================================================================
DEFINE TABLE permission SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE permission TYPE string;
DEFINE FIELD name ON TABLE permission TYPE string;
DEFINE FIELD display_name ON TABLE permission TYPE string;
DEFINE FIELD description ON TABLE permission TYPE string;
DEFINE FIELD module ON TABLE permission TYPE option<string>;
DEFINE FIELD created_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_permission_tenant_name ON TABLE permission \
    COLUMNS tenant_id, name UNIQUE;

-- =======================================================================
-- Audit records (tenant scope, append-only)
-- =======================================================================
DEFINE TABLE audit_record SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete FULL;
DEFINE FIELD tenant_id ON TABLE audit_record TYPE string;
DEFINE FIELD actor_id ON TABLE audit_record TYPE option<string>;
DEFINE FIELD actor_username ON TABLE audit_record TYPE option<string>;
DEFINE FIELD action ON TABLE audit_record TYPE string;
DEFINE FIELD resource_type ON TABLE audit_record TYPE option<string>;
DEFINE FIELD resource_id ON TABLE audit_record TYPE option<string>;
DEFINE FIELD description ON TABLE audit_record TYPE string;
DEFINE FIELD outcome ON TABLE audit_record TYPE string \
    ASSERT $value IN ['Success', 'Failure'];
DEFINE FIELD error_message ON TABLE audit_record TYPE option<string>;
DEFINE FIELD ip_address ON TABLE audit_record TYPE option<string>;
DEFINE FIELD user_agent ON TABLE audit_record TYPE option<string>;
DEFINE FIELD request_id ON TABLE audit_record TYPE option<string>;
DEFINE FIELD metadata ON TABLE audit_record TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE audit_record TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_tenant_time ON TABLE audit_record \
    COLUMNS tenant_id, created_at;
DEFINE INDEX idx_audit_tenant_action ON TABLE audit_record \
    COLUMNS tenant_id, action;

-- =======================================================================
-- Model providers (tenant scope)
-- =======================================================================
DEFINE TABLE provider SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE provider TYPE string;
DEFINE FIELD name ON TABLE provider TYPE string;
DEFINE FIELD kind ON TABLE provider TYPE string \
    ASSERT $value IN ['OpenAi', 'Anthropic', 'AzureOpenAi', 'Custom'];
DEFINE FIELD base_url ON TABLE provider TYPE string;
DEFINE FIELD api_key ON TABLE provider TYPE string;
DEFINE FIELD enabled ON TABLE provider TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE provider TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE provider TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_provider_tenant_name ON TABLE provider \
    COLUMNS tenant_id, name UNIQUE;

-- =======================================================================
-- Model configurations (tenant scope)
-- =======================================================================
DEFINE TABLE model_config SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE model_config TYPE string;
DEFINE FIELD provider_id ON TABLE model_config TYPE string;
DEFINE FIELD name ON TABLE model_config TYPE string;
DEFINE FIELD model ON TABLE model_config TYPE string;
DEFINE FIELD params ON TABLE model_config TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD enabled ON TABLE model_config TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE model_config TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE model_config TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_model_config_tenant_name ON TABLE model_config \
    COLUMNS tenant_id, name UNIQUE;

-- =======================================================================
-- Chat sessions (tenant scope)
-- =======================================================================
DEFINE TABLE chat_session SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE chat_session TYPE string;
DEFINE FIELD user_id ON TABLE chat_session TYPE string;
DEFINE FIELD title ON TABLE chat_session TYPE string;
DEFINE FIELD model_config_id ON TABLE chat_session TYPE string;
DEFINE FIELD message_count ON TABLE chat_session TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE chat_session TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE chat_session TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_chat_session_tenant_user ON TABLE chat_session \
    COLUMNS tenant_id, user_id;

-- =======================================================================
-- Graph Edge Tables (relations)
-- =======================================================================

-- User -> Role assignment
DEFINE TABLE has_role TYPE RELATION SCHEMAFULL;

-- Role -> Permission grants
DEFINE TABLE grants TYPE RELATION SCHEMAFULL;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_is_nonempty() {
        assert!(!SCHEMA_V1.is_empty());
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
