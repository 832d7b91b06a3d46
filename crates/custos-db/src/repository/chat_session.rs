//! SurrealDB implementation of [`ChatSessionRepository`].

use chrono::{DateTime, Utc};
use custos_core::error::CustosResult;
use custos_core::models::chat_session::{ChatSession, CreateChatSession, UpdateChatSession};
use custos_core::repository::{ChatSessionRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ChatSessionRow {
    tenant_id: String,
    user_id: String,
    title: String,
    model_config_id: String,
    message_count: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ChatSessionRowWithId {
    record_id: String,
    tenant_id: String,
    user_id: String,
    title: String,
    model_config_id: String,
    message_count: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChatSessionRow {
    fn into_chat_session(self, id: Uuid) -> Result<ChatSession, DbError> {
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Migration(format!("invalid tenant UUID: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Migration(format!("invalid user UUID: {e}")))?;
        let model_config_id = Uuid::parse_str(&self.model_config_id)
            .map_err(|e| DbError::Migration(format!("invalid model config UUID: {e}")))?;
        Ok(ChatSession {
            id,
            tenant_id,
            user_id,
            title: self.title,
            model_config_id,
            message_count: self.message_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ChatSessionRowWithId {
    fn try_into_chat_session(self) -> Result<ChatSession, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Migration(format!("invalid tenant UUID: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Migration(format!("invalid user UUID: {e}")))?;
        let model_config_id = Uuid::parse_str(&self.model_config_id)
            .map_err(|e| DbError::Migration(format!("invalid model config UUID: {e}")))?;
        Ok(ChatSession {
            id,
            tenant_id,
            user_id,
            title: self.title,
            model_config_id,
            message_count: self.message_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the ChatSession repository.
#[derive(Clone)]
pub struct SurrealChatSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealChatSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ChatSessionRepository for SurrealChatSessionRepository<C> {
    async fn create(&self, input: CreateChatSession) -> CustosResult<ChatSession> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('chat_session', $id) SET \
                 tenant_id = $tenant_id, \
                 user_id = $user_id, \
                 title = $title, \
                 model_config_id = $model_config_id, \
                 message_count = 0",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("title", input.title))
            .bind(("model_config_id", input.model_config_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ChatSessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "chat_session".into(),
            id: id_str,
        })?;

        Ok(row.into_chat_session(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> CustosResult<ChatSession> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('chat_session', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChatSessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "chat_session".into(),
            id: id_str,
        })?;

        Ok(row.into_chat_session(id)?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateChatSession,
    ) -> CustosResult<ChatSession> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.title.is_some() {
            sets.push("title = $title");
        }
        if input.model_config_id.is_some() {
            sets.push("model_config_id = $model_config_id");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('chat_session', $id) SET {} \
             WHERE tenant_id = $tenant_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(title) = input.title {
            builder = builder.bind(("title", title));
        }
        if let Some(model_config_id) = input.model_config_id {
            builder = builder.bind(("model_config_id", model_config_id.to_string()));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ChatSessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "chat_session".into(),
            id: id_str,
        })?;

        Ok(row.into_chat_session(id)?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> CustosResult<()> {
        self.db
            .query(
                "DELETE type::record('chat_session', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list_by_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        pagination: Pagination,
    ) -> CustosResult<PaginatedResult<ChatSession>> {
        let tenant_id_str = tenant_id.to_string();
        let user_id_str = user_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM chat_session \
                 WHERE tenant_id = $tenant_id AND user_id = $user_id \
                 GROUP ALL",
            )
            .bind(("tenant_id", tenant_id_str.clone()))
            .bind(("user_id", user_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM chat_session \
                 WHERE tenant_id = $tenant_id AND user_id = $user_id \
                 ORDER BY updated_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("user_id", user_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChatSessionRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_chat_session())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
