//! SurrealDB implementation of [`AuditRecordRepository`].
//!
//! Records are append-only: the schema forbids updates, and the only
//! delete path is the bounded `delete_before` batch used by retention
//! sweeps.

use chrono::{DateTime, Utc};
use custos_core::error::CustosResult;
use custos_core::models::audit::{
    ActionType, Actor, AuditOutcome, AuditRecord, ClientContext, CreateAuditRecord,
};
use custos_core::repository::{
    AuditRecordFilter, AuditRecordRepository, AuditStats, PaginatedResult, Pagination,
};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AuditRecordRow {
    tenant_id: String,
    actor_id: Option<String>,
    actor_username: Option<String>,
    action: String,
    resource_type: Option<String>,
    resource_id: Option<String>,
    description: String,
    outcome: String,
    error_message: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    request_id: Option<String>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AuditRecordRowWithId {
    record_id: String,
    tenant_id: String,
    actor_id: Option<String>,
    actor_username: Option<String>,
    action: String,
    resource_type: Option<String>,
    resource_id: Option<String>,
    description: String,
    outcome: String,
    error_message: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    request_id: Option<String>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

fn parse_action(s: &str) -> Result<ActionType, DbError> {
    ActionType::parse(s).ok_or_else(|| DbError::Migration(format!("unknown audit action: {s}")))
}

fn parse_outcome(s: &str) -> Result<AuditOutcome, DbError> {
    match s {
        "Success" => Ok(AuditOutcome::Success),
        "Failure" => Ok(AuditOutcome::Failure),
        other => Err(DbError::Migration(format!("unknown audit outcome: {other}"))),
    }
}

fn outcome_to_string(o: &AuditOutcome) -> &'static str {
    match o {
        AuditOutcome::Success => "Success",
        AuditOutcome::Failure => "Failure",
    }
}

fn parse_actor(
    actor_id: Option<String>,
    actor_username: Option<String>,
) -> Result<Option<Actor>, DbError> {
    match (actor_id, actor_username) {
        (Some(id), Some(username)) => {
            let id = Uuid::parse_str(&id)
                .map_err(|e| DbError::Migration(format!("invalid actor UUID: {e}")))?;
            Ok(Some(Actor { id, username }))
        }
        _ => Ok(None),
    }
}

impl AuditRecordRow {
    fn into_record(self, id: Uuid) -> Result<AuditRecord, DbError> {
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Migration(format!("invalid tenant UUID: {e}")))?;
        Ok(AuditRecord {
            id,
            tenant_id,
            actor: parse_actor(self.actor_id, self.actor_username)?,
            action: parse_action(&self.action)?,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            description: self.description,
            outcome: parse_outcome(&self.outcome)?,
            error_message: self.error_message,
            context: ClientContext {
                ip_address: self.ip_address,
                user_agent: self.user_agent,
                request_id: self.request_id,
            },
            metadata: self.metadata,
            created_at: self.created_at,
        })
    }
}

impl AuditRecordRowWithId {
    fn try_into_record(self) -> Result<AuditRecord, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Migration(format!("invalid tenant UUID: {e}")))?;
        Ok(AuditRecord {
            id,
            tenant_id,
            actor: parse_actor(self.actor_id, self.actor_username)?,
            action: parse_action(&self.action)?,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            description: self.description,
            outcome: parse_outcome(&self.outcome)?,
            error_message: self.error_message,
            context: ClientContext {
                ip_address: self.ip_address,
                user_agent: self.user_agent,
                request_id: self.request_id,
            },
            metadata: self.metadata,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

#[derive(Debug, SurrealValue)]
struct ActionCountRow {
    action: String,
    total: u64,
}

#[derive(Debug, SurrealValue)]
struct OutcomeCountRow {
    outcome: String,
    total: u64,
}

#[derive(Debug, SurrealValue)]
struct IdRow {
    record_id: String,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

/// SurrealDB implementation of the audit record repository.
#[derive(Clone)]
pub struct SurrealAuditRecordRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditRecordRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditRecordRepository for SurrealAuditRecordRepository<C> {
    async fn append(&self, input: CreateAuditRecord) -> CustosResult<AuditRecord> {
        input.validate()?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let (actor_id, actor_username) = match input.actor {
            Some(actor) => (Some(actor.id.to_string()), Some(actor.username)),
            None => (None, None),
        };

        let result = self
            .db
            .query(
                "CREATE type::record('audit_record', $id) SET \
                 tenant_id = $tenant_id, \
                 actor_id = $actor_id, \
                 actor_username = $actor_username, \
                 action = $action, \
                 resource_type = $resource_type, \
                 resource_id = $resource_id, \
                 description = $description, \
                 outcome = $outcome, \
                 error_message = $error_message, \
                 ip_address = $ip_address, \
                 user_agent = $user_agent, \
                 request_id = $request_id, \
                 metadata = $metadata",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("actor_id", actor_id))
            .bind(("actor_username", actor_username))
            .bind(("action", input.action.as_str().to_string()))
            .bind(("resource_type", input.resource_type))
            .bind(("resource_id", input.resource_id))
            .bind(("description", input.description))
            .bind(("outcome", outcome_to_string(&input.outcome).to_string()))
            .bind(("error_message", input.error_message))
            .bind(("ip_address", input.context.ip_address))
            .bind(("user_agent", input.context.user_agent))
            .bind(("request_id", input.context.request_id))
            .bind(("metadata", input.metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<AuditRecordRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit_record".into(),
            id: id_str,
        })?;

        Ok(row.into_record(id)?)
    }

    async fn find_with_count(
        &self,
        tenant_id: Uuid,
        filter: AuditRecordFilter,
        pagination: Pagination,
    ) -> CustosResult<PaginatedResult<AuditRecord>> {
        let tenant_id_str = tenant_id.to_string();

        let mut conditions = vec!["tenant_id = $tenant_id"];
        if filter.actor_id.is_some() {
            conditions.push("actor_id = $actor_id");
        }
        if filter.action.is_some() {
            conditions.push("action = $action");
        }
        if filter.outcome.is_some() {
            conditions.push("outcome = $outcome");
        }
        if filter.resource_type.is_some() {
            conditions.push("resource_type = $resource_type");
        }
        if filter.from.is_some() {
            conditions.push("created_at >= $from");
        }
        if filter.to.is_some() {
            conditions.push("created_at <= $to");
        }
        let where_clause = conditions.join(" AND ");

        let count_query =
            format!("SELECT count() AS total FROM audit_record WHERE {where_clause} GROUP ALL");
        let page_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM audit_record \
             WHERE {where_clause} \
             ORDER BY created_at DESC \
             LIMIT $limit START $offset"
        );

        let mut builder = self
            .db
            .query(&count_query)
            .query(&page_query)
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));

        if let Some(actor_id) = filter.actor_id {
            builder = builder.bind(("actor_id", actor_id.to_string()));
        }
        if let Some(action) = filter.action {
            builder = builder.bind(("action", action.as_str().to_string()));
        }
        if let Some(ref outcome) = filter.outcome {
            builder = builder.bind(("outcome", outcome_to_string(outcome).to_string()));
        }
        if let Some(resource_type) = filter.resource_type {
            builder = builder.bind(("resource_type", resource_type));
        }
        if let Some(from) = filter.from {
            builder = builder.bind(("from", from));
        }
        if let Some(to) = filter.to {
            builder = builder.bind(("to", to));
        }

        let mut result = builder.await.map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<AuditRecordRowWithId> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_record())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn stats(&self, tenant_id: Uuid, since: DateTime<Utc>) -> CustosResult<AuditStats> {
        let mut result = self
            .db
            .query(
                "SELECT action, count() AS total FROM audit_record \
                 WHERE tenant_id = $tenant_id AND created_at >= $since \
                 GROUP BY action",
            )
            .query(
                "SELECT outcome, count() AS total FROM audit_record \
                 WHERE tenant_id = $tenant_id AND created_at >= $since \
                 GROUP BY outcome",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("since", since))
            .await
            .map_err(DbError::from)?;

        let action_rows: Vec<ActionCountRow> = result.take(0).map_err(DbError::from)?;
        let outcome_rows: Vec<OutcomeCountRow> = result.take(1).map_err(DbError::from)?;

        let mut stats = AuditStats::default();
        for row in action_rows {
            stats.total += row.total;
            stats.by_action.insert(row.action, row.total);
        }
        for row in outcome_rows {
            match row.outcome.as_str() {
                "Success" => stats.successes = row.total,
                "Failure" => stats.failures = row.total,
                _ => {}
            }
        }

        Ok(stats)
    }

    async fn delete_before(
        &self,
        tenant_id: Uuid,
        cutoff: DateTime<Utc>,
        actions: Option<Vec<String>>,
        batch_size: u64,
    ) -> CustosResult<u64> {
        let tenant_id_str = tenant_id.to_string();

        // Select one bounded batch of candidate ids, then delete
        // exactly those. Each call re-queries against the cutoff, so
        // interrupted sweeps resume without offsets.
        let select_query = if actions.is_some() {
            "SELECT meta::id(id) AS record_id, created_at FROM audit_record \
             WHERE tenant_id = $tenant_id AND created_at < $cutoff \
             AND action IN $actions \
             ORDER BY created_at ASC \
             LIMIT $batch_size"
        } else {
            "SELECT meta::id(id) AS record_id, created_at FROM audit_record \
             WHERE tenant_id = $tenant_id AND created_at < $cutoff \
             ORDER BY created_at ASC \
             LIMIT $batch_size"
        };

        let mut builder = self
            .db
            .query(select_query)
            .bind(("tenant_id", tenant_id_str.clone()))
            .bind(("cutoff", cutoff))
            .bind(("batch_size", batch_size));
        if let Some(actions) = actions {
            builder = builder.bind(("actions", actions));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;

        if rows.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = rows.into_iter().map(|r| r.record_id).collect();
        let count = ids.len() as u64;

        self.db
            .query(
                "DELETE audit_record \
                 WHERE tenant_id = $tenant_id AND meta::id(id) IN $ids",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("ids", ids))
            .await
            .map_err(DbError::from)?;

        Ok(count)
    }
}
