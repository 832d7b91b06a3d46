//! Integration tests for the audit record repository using in-memory
//! SurrealDB.

use chrono::{Duration, Utc};
use custos_core::models::audit::{
    ActionType, Actor, AuditOutcome, ClientContext, CreateAuditRecord,
};
use custos_core::repository::{AuditRecordFilter, AuditRecordRepository, Pagination};
use custos_db::repository::SurrealAuditRecordRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

async fn setup() -> (Surreal<surrealdb::engine::local::Db>, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    custos_db::run_migrations(&db).await.unwrap();
    (db, Uuid::new_v4())
}

fn entry(tenant_id: Uuid, action: ActionType, outcome: AuditOutcome) -> CreateAuditRecord {
    CreateAuditRecord {
        tenant_id,
        actor: Some(Actor {
            id: Uuid::new_v4(),
            username: "alice".into(),
        }),
        action,
        resource_type: Some("user".into()),
        resource_id: Some(Uuid::new_v4().to_string()),
        description: action.description().into(),
        outcome,
        error_message: match outcome {
            AuditOutcome::Failure => Some("boom".into()),
            AuditOutcome::Success => None,
        },
        context: ClientContext {
            ip_address: Some("127.0.0.1".into()),
            user_agent: Some("TestAgent".into()),
            request_id: Some(Uuid::new_v4().to_string()),
        },
        metadata: serde_json::json!({"reason": "test"}),
    }
}

/// Backdate a stored record. Tests run as root, so the append-only
/// table permissions do not apply.
async fn backdate(
    db: &Surreal<surrealdb::engine::local::Db>,
    record_id: Uuid,
    days: i64,
) {
    db.query("UPDATE type::record('audit_record', $id) SET created_at = $ts")
        .bind(("id", record_id.to_string()))
        .bind(("ts", Utc::now() - Duration::days(days)))
        .await
        .unwrap()
        .check()
        .unwrap();
}

#[tokio::test]
async fn append_and_fetch_roundtrip() {
    let (db, tenant_id) = setup().await;
    let repo = SurrealAuditRecordRepository::new(db);

    let record = repo
        .append(entry(tenant_id, ActionType::Login, AuditOutcome::Success))
        .await
        .unwrap();
    assert_eq!(record.action, ActionType::Login);
    assert_eq!(record.outcome, AuditOutcome::Success);
    assert_eq!(record.actor.as_ref().unwrap().username, "alice");
    assert_eq!(record.context.ip_address.as_deref(), Some("127.0.0.1"));

    let page = repo
        .find_with_count(tenant_id, AuditRecordFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, record.id);
}

#[tokio::test]
async fn failure_without_error_message_is_rejected() {
    let (db, tenant_id) = setup().await;
    let repo = SurrealAuditRecordRepository::new(db);

    let mut input = entry(tenant_id, ActionType::Login, AuditOutcome::Failure);
    input.error_message = None;
    assert!(repo.append(input).await.is_err());
}

#[tokio::test]
async fn filters_narrow_results() {
    let (db, tenant_id) = setup().await;
    let repo = SurrealAuditRecordRepository::new(db);

    repo.append(entry(tenant_id, ActionType::Login, AuditOutcome::Success))
        .await
        .unwrap();
    repo.append(entry(tenant_id, ActionType::Login, AuditOutcome::Failure))
        .await
        .unwrap();
    repo.append(entry(tenant_id, ActionType::UserDelete, AuditOutcome::Success))
        .await
        .unwrap();
    // Another tenant's record must never surface.
    repo.append(entry(
        Uuid::new_v4(),
        ActionType::Login,
        AuditOutcome::Success,
    ))
    .await
    .unwrap();

    let logins = repo
        .find_with_count(
            tenant_id,
            AuditRecordFilter {
                action: Some(ActionType::Login),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(logins.total, 2);

    let failures = repo
        .find_with_count(
            tenant_id,
            AuditRecordFilter {
                outcome: Some(AuditOutcome::Failure),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(failures.total, 1);
    assert_eq!(failures.items[0].error_message.as_deref(), Some("boom"));

    let all = repo
        .find_with_count(tenant_id, AuditRecordFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);
}

#[tokio::test]
async fn newest_first_with_pagination() {
    let (db, tenant_id) = setup().await;
    let repo = SurrealAuditRecordRepository::new(db.clone());

    let old = repo
        .append(entry(tenant_id, ActionType::Login, AuditOutcome::Success))
        .await
        .unwrap();
    backdate(&db, old.id, 10).await;
    let newer = repo
        .append(entry(tenant_id, ActionType::Logout, AuditOutcome::Success))
        .await
        .unwrap();

    let page = repo
        .find_with_count(
            tenant_id,
            AuditRecordFilter::default(),
            Pagination {
                offset: 0,
                limit: 1,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].id, newer.id);
}

#[tokio::test]
async fn stats_aggregate_since() {
    let (db, tenant_id) = setup().await;
    let repo = SurrealAuditRecordRepository::new(db.clone());

    repo.append(entry(tenant_id, ActionType::Login, AuditOutcome::Success))
        .await
        .unwrap();
    repo.append(entry(tenant_id, ActionType::Login, AuditOutcome::Failure))
        .await
        .unwrap();
    repo.append(entry(tenant_id, ActionType::UserDelete, AuditOutcome::Success))
        .await
        .unwrap();
    // An old record outside the window.
    let old = repo
        .append(entry(tenant_id, ActionType::Logout, AuditOutcome::Success))
        .await
        .unwrap();
    backdate(&db, old.id, 30).await;

    let stats = repo
        .stats(tenant_id, Utc::now() - Duration::days(7))
        .await
        .unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.successes, 2);
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.by_action.get("login"), Some(&2));
    assert_eq!(stats.by_action.get("user_delete"), Some(&1));
    assert_eq!(stats.by_action.get("logout"), None);
}

#[tokio::test]
async fn delete_before_is_bounded_and_resumable() {
    let (db, tenant_id) = setup().await;
    let repo = SurrealAuditRecordRepository::new(db.clone());

    for _ in 0..5 {
        let record = repo
            .append(entry(tenant_id, ActionType::Login, AuditOutcome::Success))
            .await
            .unwrap();
        backdate(&db, record.id, 100).await;
    }
    repo.append(entry(tenant_id, ActionType::Login, AuditOutcome::Success))
        .await
        .unwrap();

    let cutoff = Utc::now() - Duration::days(30);

    // First batch deletes exactly batch_size, the loop re-queries.
    assert_eq!(repo.delete_before(tenant_id, cutoff, None, 2).await.unwrap(), 2);
    assert_eq!(repo.delete_before(tenant_id, cutoff, None, 2).await.unwrap(), 2);
    assert_eq!(repo.delete_before(tenant_id, cutoff, None, 2).await.unwrap(), 1);
    assert_eq!(repo.delete_before(tenant_id, cutoff, None, 2).await.unwrap(), 0);

    // The recent record survived.
    let remaining = repo
        .find_with_count(tenant_id, AuditRecordFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(remaining.total, 1);
}

#[tokio::test]
async fn delete_before_respects_action_filter() {
    let (db, tenant_id) = setup().await;
    let repo = SurrealAuditRecordRepository::new(db.clone());

    let login = repo
        .append(entry(tenant_id, ActionType::Login, AuditOutcome::Success))
        .await
        .unwrap();
    let delete = repo
        .append(entry(tenant_id, ActionType::UserDelete, AuditOutcome::Success))
        .await
        .unwrap();
    backdate(&db, login.id, 400).await;
    backdate(&db, delete.id, 400).await;

    let cutoff = Utc::now() - Duration::days(30);
    let count = repo
        .delete_before(
            tenant_id,
            cutoff,
            Some(vec!["login".to_string()]),
            100,
        )
        .await
        .unwrap();
    assert_eq!(count, 1);

    let remaining = repo
        .find_with_count(tenant_id, AuditRecordFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(remaining.total, 1);
    assert_eq!(remaining.items[0].action, ActionType::UserDelete);
}
