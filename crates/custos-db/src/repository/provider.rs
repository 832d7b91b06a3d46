//! SurrealDB implementation of [`ProviderRepository`].

use chrono::{DateTime, Utc};
use custos_core::error::CustosResult;
use custos_core::models::provider::{CreateProvider, Provider, ProviderKind, UpdateProvider};
use custos_core::repository::{PaginatedResult, Pagination, ProviderRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ProviderRow {
    tenant_id: String,
    name: String,
    kind: String,
    base_url: String,
    api_key: String,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ProviderRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    kind: String,
    base_url: String,
    api_key: String,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_kind(s: &str) -> Result<ProviderKind, DbError> {
    match s {
        "OpenAi" => Ok(ProviderKind::OpenAi),
        "Anthropic" => Ok(ProviderKind::Anthropic),
        "AzureOpenAi" => Ok(ProviderKind::AzureOpenAi),
        "Custom" => Ok(ProviderKind::Custom),
        other => Err(DbError::Migration(format!("unknown provider kind: {other}"))),
    }
}

fn kind_to_string(k: &ProviderKind) -> &'static str {
    match k {
        ProviderKind::OpenAi => "OpenAi",
        ProviderKind::Anthropic => "Anthropic",
        ProviderKind::AzureOpenAi => "AzureOpenAi",
        ProviderKind::Custom => "Custom",
    }
}

impl ProviderRow {
    fn into_provider(self, id: Uuid) -> Result<Provider, DbError> {
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Migration(format!("invalid tenant UUID: {e}")))?;
        Ok(Provider {
            id,
            tenant_id,
            name: self.name,
            kind: parse_kind(&self.kind)?,
            base_url: self.base_url,
            api_key: self.api_key,
            enabled: self.enabled,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ProviderRowWithId {
    fn try_into_provider(self) -> Result<Provider, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Migration(format!("invalid tenant UUID: {e}")))?;
        Ok(Provider {
            id,
            tenant_id,
            name: self.name,
            kind: parse_kind(&self.kind)?,
            base_url: self.base_url,
            api_key: self.api_key,
            enabled: self.enabled,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Provider repository.
#[derive(Clone)]
pub struct SurrealProviderRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProviderRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ProviderRepository for SurrealProviderRepository<C> {
    async fn create(&self, input: CreateProvider) -> CustosResult<Provider> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('provider', $id) SET \
                 tenant_id = $tenant_id, \
                 name = $name, kind = $kind, \
                 base_url = $base_url, api_key = $api_key, \
                 enabled = true",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("kind", kind_to_string(&input.kind).to_string()))
            .bind(("base_url", input.base_url))
            .bind(("api_key", input.api_key))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ProviderRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "provider".into(),
            id: id_str,
        })?;

        Ok(row.into_provider(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> CustosResult<Provider> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('provider', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProviderRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "provider".into(),
            id: id_str,
        })?;

        Ok(row.into_provider(id)?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateProvider,
    ) -> CustosResult<Provider> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.base_url.is_some() {
            sets.push("base_url = $base_url");
        }
        if input.api_key.is_some() {
            sets.push("api_key = $api_key");
        }
        if input.enabled.is_some() {
            sets.push("enabled = $enabled");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('provider', $id) SET {} \
             WHERE tenant_id = $tenant_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(base_url) = input.base_url {
            builder = builder.bind(("base_url", base_url));
        }
        if let Some(api_key) = input.api_key {
            builder = builder.bind(("api_key", api_key));
        }
        if let Some(enabled) = input.enabled {
            builder = builder.bind(("enabled", enabled));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ProviderRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "provider".into(),
            id: id_str,
        })?;

        Ok(row.into_provider(id)?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> CustosResult<()> {
        self.db
            .query(
                "DELETE type::record('provider', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> CustosResult<PaginatedResult<Provider>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM provider \
                 WHERE tenant_id = $tenant_id GROUP ALL",
            )
            .bind(("tenant_id", tenant_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM provider \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProviderRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_provider())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
