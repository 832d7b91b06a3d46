//! Audit recorder service — best-effort record capture, administrative
//! query/stats, and retention cleanup.

use chrono::{DateTime, Duration, Utc};
use custos_core::error::{CustosError, CustosResult};
use custos_core::models::audit::{ActionType, AuditRecord, CreateAuditRecord};
use custos_core::repository::{
    AuditRecordFilter, AuditRecordRepository, AuditStats, PaginatedResult, Pagination,
};
use tracing::warn;
use uuid::Uuid;

use crate::config::SweepConfig;
use crate::rules::{self, RiskClass};

/// Replacement value for anonymized metadata fields.
const REDACTED: &str = "[REDACTED]";

/// Compliance floor for administrative cleanup.
pub const MIN_RETENTION_DAYS: i64 = 30;

/// Audit recorder service.
///
/// `record` is a best-effort side channel: it must never block or
/// abort the guarded business operation, so persistence failures are
/// logged and swallowed at this boundary.
pub struct AuditService<R: AuditRecordRepository> {
    repo: R,
    sweep: SweepConfig,
}

impl<R: AuditRecordRepository> AuditService<R> {
    pub fn new(repo: R, sweep: SweepConfig) -> Self {
        Self { repo, sweep }
    }

    /// Validate, anonymize, and persist one record.
    async fn try_record(&self, mut input: CreateAuditRecord) -> CustosResult<AuditRecord> {
        input.validate()?;

        if let serde_json::Value::Object(fields) = &mut input.metadata {
            for (name, value) in fields.iter_mut() {
                if rules::should_anonymize(input.action, name) {
                    *value = serde_json::Value::String(REDACTED.into());
                }
            }
        }

        self.repo.append(input).await
    }

    /// Record an action, fire-and-forget.
    ///
    /// A missed audit record is an operational alert, not a caller
    /// error: failures are logged and swallowed, never propagated and
    /// never retried synchronously.
    pub async fn record(&self, input: CreateAuditRecord) {
        let action = input.action;
        let tenant_id = input.tenant_id;
        if let Err(err) = self.try_record(input).await {
            warn!(
                %tenant_id,
                action = action.as_str(),
                error = %err,
                "failed to persist audit record"
            );
        }
    }

    /// Filtered page of records for administrative review, newest
    /// first. `page` is 1-based.
    pub async fn query(
        &self,
        tenant_id: Uuid,
        filter: AuditRecordFilter,
        page: u64,
        page_size: u64,
    ) -> CustosResult<PaginatedResult<AuditRecord>> {
        let pagination = Pagination {
            offset: page.saturating_sub(1) * page_size,
            limit: page_size,
        };
        self.repo.find_with_count(tenant_id, filter, pagination).await
    }

    /// Aggregate counts since a timestamp.
    pub async fn stats(&self, tenant_id: Uuid, since: DateTime<Utc>) -> CustosResult<AuditStats> {
        self.repo.stats(tenant_id, since).await
    }

    /// Delete records older than `cutoff` in bounded batches, capped
    /// by the sweep config's batch size and batch count.
    ///
    /// Each batch re-queries against the cutoff rather than walking a
    /// fixed offset, so an interrupted sweep restarts cleanly. Stops
    /// early once a batch comes back short (no more candidates).
    pub async fn batch_delete_before(
        &self,
        tenant_id: Uuid,
        cutoff: DateTime<Utc>,
        actions: Option<Vec<String>>,
    ) -> CustosResult<u64> {
        let mut deleted = 0;
        for _ in 0..self.sweep.max_batches {
            let count = self
                .repo
                .delete_before(tenant_id, cutoff, actions.clone(), self.sweep.batch_size)
                .await?;
            deleted += count;
            if count < self.sweep.batch_size {
                break;
            }
        }
        Ok(deleted)
    }

    /// Administrative cleanup: delete all records older than
    /// `retention_days`. Rejects anything under the 30-day compliance
    /// floor.
    pub async fn cleanup(&self, tenant_id: Uuid, retention_days: i64) -> CustosResult<u64> {
        if retention_days < MIN_RETENTION_DAYS {
            return Err(CustosError::BusinessRule {
                message: format!(
                    "retention of {retention_days} days is below the {MIN_RETENTION_DAYS}-day compliance floor"
                ),
            });
        }
        let cutoff = Utc::now() - Duration::days(retention_days);
        self.batch_delete_before(tenant_id, cutoff, None).await
    }

    /// Scheduled retention sweep: apply each risk class's retention
    /// cutoff with bounded batches. A failure aborts that class only —
    /// remaining classes still run, and whatever is left is picked up
    /// by the next scheduled sweep.
    pub async fn run_retention_sweep(&self, tenant_id: Uuid) -> u64 {
        let now = Utc::now();
        let mut deleted = 0;

        for class in RiskClass::ALL {
            let actions: Vec<String> = ActionType::ALL
                .iter()
                .filter(|a| rules::risk_class(**a) == *class)
                .map(|a| a.as_str().to_string())
                .collect();
            let cutoff = now - Duration::days(rules::class_retention_days(*class));

            match self
                .batch_delete_before(tenant_id, cutoff, Some(actions))
                .await
            {
                Ok(count) => deleted += count,
                Err(err) => {
                    warn!(
                        %tenant_id,
                        class = ?class,
                        error = %err,
                        "retention sweep batch failed; skipping class until next run"
                    );
                }
            }
        }

        deleted
    }
}
