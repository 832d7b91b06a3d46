//! SurrealDB implementation of [`ModelConfigRepository`].

use chrono::{DateTime, Utc};
use custos_core::error::CustosResult;
use custos_core::models::model_config::{CreateModelConfig, ModelConfig, UpdateModelConfig};
use custos_core::repository::{ModelConfigRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ModelConfigRow {
    tenant_id: String,
    provider_id: String,
    name: String,
    model: String,
    params: serde_json::Value,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ModelConfigRowWithId {
    record_id: String,
    tenant_id: String,
    provider_id: String,
    name: String,
    model: String,
    params: serde_json::Value,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ModelConfigRow {
    fn into_model_config(self, id: Uuid) -> Result<ModelConfig, DbError> {
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Migration(format!("invalid tenant UUID: {e}")))?;
        let provider_id = Uuid::parse_str(&self.provider_id)
            .map_err(|e| DbError::Migration(format!("invalid provider UUID: {e}")))?;
        Ok(ModelConfig {
            id,
            tenant_id,
            provider_id,
            name: self.name,
            model: self.model,
            params: self.params,
            enabled: self.enabled,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ModelConfigRowWithId {
    fn try_into_model_config(self) -> Result<ModelConfig, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Migration(format!("invalid tenant UUID: {e}")))?;
        let provider_id = Uuid::parse_str(&self.provider_id)
            .map_err(|e| DbError::Migration(format!("invalid provider UUID: {e}")))?;
        Ok(ModelConfig {
            id,
            tenant_id,
            provider_id,
            name: self.name,
            model: self.model,
            params: self.params,
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

/// SurrealDB implementation of the ModelConfig repository.
#[derive(Clone)]
pub struct SurrealModelConfigRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealModelConfigRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ModelConfigRepository for SurrealModelConfigRepository<C> {
    async fn create(&self, input: CreateModelConfig) -> CustosResult<ModelConfig> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let params = input
            .params
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('model_config', $id) SET \
                 tenant_id = $tenant_id, \
                 provider_id = $provider_id, \
                 name = $name, model = $model, \
                 params = $params, enabled = true",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("provider_id", input.provider_id.to_string()))
            .bind(("name", input.name))
            .bind(("model", input.model))
            .bind(("params", params))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ModelConfigRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "model_config".into(),
            id: id_str,
        })?;

        Ok(row.into_model_config(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> CustosResult<ModelConfig> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('model_config', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ModelConfigRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "model_config".into(),
            id: id_str,
        })?;

        Ok(row.into_model_config(id)?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateModelConfig,
    ) -> CustosResult<ModelConfig> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.model.is_some() {
            sets.push("model = $model");
        }
        if input.params.is_some() {
            sets.push("params = $params");
        }
        if input.enabled.is_some() {
            sets.push("enabled = $enabled");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('model_config', $id) SET {} \
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
        if let Some(model) = input.model {
            builder = builder.bind(("model", model));
        }
        if let Some(params) = input.params {
            builder = builder.bind(("params", params));
        }
        if let Some(enabled) = input.enabled {
            builder = builder.bind(("enabled", enabled));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ModelConfigRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "model_config".into(),
            id: id_str,
        })?;

        Ok(row.into_model_config(id)?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> CustosResult<()> {
        self.db
            .query(
                "DELETE type::record('model_config', $id) \
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
    ) -> CustosResult<PaginatedResult<ModelConfig>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM model_config \
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
                "SELECT meta::id(id) AS record_id, * FROM model_config \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ModelConfigRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_model_config())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
