//! Integration tests for the audit recorder service using in-memory
//! SurrealDB.

use chrono::{Duration, Utc};
use custos_audit::recorder::AuditService;
use custos_audit::SweepConfig;
use custos_core::error::CustosError;
use custos_core::models::audit::{
    ActionType, Actor, AuditOutcome, ClientContext, CreateAuditRecord,
};
use custos_core::repository::{AuditRecordFilter, AuditRecordRepository, Pagination};
use custos_db::repository::SurrealAuditRecordRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;

async fn setup() -> (Surreal<Db>, AuditService<SurrealAuditRecordRepository<Db>>, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    custos_db::run_migrations(&db).await.unwrap();

    let service = AuditService::new(
        SurrealAuditRecordRepository::new(db.clone()),
        SweepConfig {
            batch_size: 2,
            max_batches: 10,
        },
    );
    (db, service, Uuid::new_v4())
}

fn entry(tenant_id: Uuid, action: ActionType) -> CreateAuditRecord {
    CreateAuditRecord {
        tenant_id,
        actor: Some(Actor {
            id: Uuid::new_v4(),
            username: "alice".into(),
        }),
        action,
        resource_type: None,
        resource_id: None,
        description: action.description().into(),
        outcome: AuditOutcome::Success,
        error_message: None,
        context: ClientContext {
            ip_address: Some("127.0.0.1".into()),
            user_agent: Some("TestAgent".into()),
            request_id: None,
        },
        metadata: serde_json::json!({}),
    }
}

async fn backdate(db: &Surreal<Db>, record_id: Uuid, days: i64) {
    db.query("UPDATE type::record('audit_record', $id) SET created_at = $ts")
        .bind(("id", record_id.to_string()))
        .bind(("ts", Utc::now() - Duration::days(days)))
        .await
        .unwrap()
        .check()
        .unwrap();
}

#[tokio::test]
async fn record_persists_and_is_queryable() {
    let (_db, service, tenant_id) = setup().await;

    service.record(entry(tenant_id, ActionType::UserDelete)).await;

    let page = service
        .query(tenant_id, AuditRecordFilter::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].action, ActionType::UserDelete);
    assert_eq!(page.items[0].actor.as_ref().unwrap().username, "alice");
}

#[tokio::test]
async fn invalid_record_is_swallowed_not_propagated() {
    let (_db, service, tenant_id) = setup().await;

    // Failure without an error message violates the record invariant;
    // the recorder logs and drops it instead of failing the caller.
    let mut bad = entry(tenant_id, ActionType::Login);
    bad.outcome = AuditOutcome::Failure;
    service.record(bad).await;

    let page = service
        .query(tenant_id, AuditRecordFilter::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn metadata_is_anonymized_per_rules() {
    let (_db, service, tenant_id) = setup().await;

    let mut login = entry(tenant_id, ActionType::Login);
    login.metadata = serde_json::json!({
        "login_method": "password",
        "old_password": "hunter2",
        "email": "alice@example.com",
    });
    service.record(login).await;

    let mut user_delete = entry(tenant_id, ActionType::UserDelete);
    user_delete.metadata = serde_json::json!({
        "reason": "gdpr request",
        "email": "alice@example.com",
        "api_key": "sk-live-123",
    });
    service.record(user_delete).await;

    let page = service
        .query(tenant_id, AuditRecordFilter::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(page.total, 2);

    let login_rec = page
        .items
        .iter()
        .find(|r| r.action == ActionType::Login)
        .unwrap();
    assert_eq!(login_rec.metadata["login_method"], "password");
    assert_eq!(login_rec.metadata["old_password"], "[REDACTED]");
    // Personal data is scrubbed for non-high-risk actions.
    assert_eq!(login_rec.metadata["email"], "[REDACTED]");

    let delete_rec = page
        .items
        .iter()
        .find(|r| r.action == ActionType::UserDelete)
        .unwrap();
    assert_eq!(delete_rec.metadata["reason"], "gdpr request");
    // High-risk records retain PII but never secrets.
    assert_eq!(delete_rec.metadata["email"], "alice@example.com");
    assert_eq!(delete_rec.metadata["api_key"], "[REDACTED]");
}

#[tokio::test]
async fn cleanup_enforces_compliance_floor() {
    let (_db, service, tenant_id) = setup().await;

    let result = service.cleanup(tenant_id, 20).await;
    assert!(matches!(result, Err(CustosError::BusinessRule { .. })));
}

#[tokio::test]
async fn cleanup_deletes_only_pre_cutoff_records() {
    let (db, service, tenant_id) = setup().await;
    let repo = SurrealAuditRecordRepository::new(db.clone());

    // Five stale records (batch_size 2 forces multiple batches).
    for _ in 0..5 {
        let record = repo
            .append(entry(tenant_id, ActionType::Login))
            .await
            .unwrap();
        backdate(&db, record.id, 120).await;
    }
    repo.append(entry(tenant_id, ActionType::Login)).await.unwrap();

    let deleted = service.cleanup(tenant_id, 90).await.unwrap();
    assert_eq!(deleted, 5);

    let remaining = repo
        .find_with_count(tenant_id, AuditRecordFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(remaining.total, 1);
}

#[tokio::test]
async fn retention_sweep_applies_per_class_cutoffs() {
    let (db, service, tenant_id) = setup().await;
    let repo = SurrealAuditRecordRepository::new(db.clone());

    // Routine record past its 365-day retention: swept.
    let stale_routine = repo
        .append(entry(tenant_id, ActionType::ChatSessionCreate))
        .await
        .unwrap();
    backdate(&db, stale_routine.id, 400).await;

    // High-risk record of the same age: retained for 2555 days.
    let aged_high_risk = repo
        .append(entry(tenant_id, ActionType::UserDelete))
        .await
        .unwrap();
    backdate(&db, aged_high_risk.id, 400).await;

    // Auth record past its 1095-day retention: swept.
    let stale_auth = repo
        .append(entry(tenant_id, ActionType::Login))
        .await
        .unwrap();
    backdate(&db, stale_auth.id, 1200).await;

    let deleted = service.run_retention_sweep(tenant_id).await;
    assert_eq!(deleted, 2);

    let remaining = service
        .query(tenant_id, AuditRecordFilter::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(remaining.total, 1);
    assert_eq!(remaining.items[0].action, ActionType::UserDelete);
}

#[tokio::test]
async fn stats_reflect_recorded_outcomes() {
    let (_db, service, tenant_id) = setup().await;

    service.record(entry(tenant_id, ActionType::Login)).await;
    let mut failed = entry(tenant_id, ActionType::Login);
    failed.action = ActionType::LoginFailed;
    failed.outcome = AuditOutcome::Failure;
    failed.error_message = Some("bad credentials".into());
    service.record(failed).await;

    let stats = service
        .stats(tenant_id, Utc::now() - Duration::days(1))
        .await
        .unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.successes, 1);
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.by_action.get("login"), Some(&1));
    assert_eq!(stats.by_action.get("login_failed"), Some(&1));
}
