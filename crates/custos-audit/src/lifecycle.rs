//! Audit record lifecycle engine — storage tiering by age and risk
//! class, and archive planning.

use chrono::{DateTime, Utc};
use custos_core::models::audit::{ActionType, AuditRecord};
use uuid::Uuid;

use crate::rules::{self, RiskClass};

/// Storage tier of an audit record, by increasing age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StorageTier {
    Hot,
    Warm,
    Cold,
    Archive,
}

/// Age thresholds (in days) for a risk class.
///
/// Invariant: `retention_days ≥ cold_days ≥ warm_days ≥ hot_days`, so
/// the archive-plan priorities (delete > compress > archive) partition
/// cleanly.
#[derive(Debug, Clone, Copy)]
pub struct TierPolicy {
    pub hot_days: i64,
    pub warm_days: i64,
    pub cold_days: i64,
    pub retention_days: i64,
}

impl TierPolicy {
    pub fn for_class(class: RiskClass) -> Self {
        let (hot_days, warm_days, cold_days) = match class {
            RiskClass::HighRisk => (90, 365, 1095),
            RiskClass::Authentication | RiskClass::PermissionManagement => (30, 180, 730),
            RiskClass::Routine => (7, 30, 180),
        };
        Self {
            hot_days,
            warm_days,
            cold_days,
            retention_days: rules::class_retention_days(class),
        }
    }
}

/// Thresholds for an action's risk class.
pub fn tier_policy(action: ActionType) -> TierPolicy {
    TierPolicy::for_class(rules::risk_class(action))
}

fn age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days()
}

/// Storage tier for a record of the given action created at
/// `created_at`, evaluated at `now`. Monotonic non-decreasing in age.
pub fn storage_tier(action: ActionType, created_at: DateTime<Utc>, now: DateTime<Utc>) -> StorageTier {
    let age = age_days(created_at, now);
    let policy = tier_policy(action);
    if age < policy.hot_days {
        StorageTier::Hot
    } else if age < policy.warm_days {
        StorageTier::Warm
    } else if age < policy.cold_days {
        StorageTier::Cold
    } else {
        StorageTier::Archive
    }
}

/// Past total retention — eligible for deletion.
pub fn is_past_retention(action: ActionType, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    age_days(created_at, now) >= tier_policy(action).retention_days
}

/// A batch archival plan. Each record lands in at most one bucket:
/// delete (past retention) takes priority over compress (entering the
/// archive tier), which takes priority over archive (leaving warm
/// storage).
#[derive(Debug, Clone, Default)]
pub struct ArchivePlan {
    pub archive: Vec<Uuid>,
    pub compress: Vec<Uuid>,
    pub delete: Vec<Uuid>,
}

impl ArchivePlan {
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty() && self.compress.is_empty() && self.delete.is_empty()
    }
}

/// Plan the next archival batch for the given records.
pub fn generate_archive_plan(records: &[AuditRecord], now: DateTime<Utc>) -> ArchivePlan {
    let mut plan = ArchivePlan::default();
    for record in records {
        let age = age_days(record.created_at, now);
        let policy = tier_policy(record.action);
        if age >= policy.retention_days {
            plan.delete.push(record.id);
        } else if age >= policy.cold_days {
            plan.compress.push(record.id);
        } else if age >= policy.warm_days {
            plan.archive.push(record.id);
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use custos_core::models::audit::{AuditOutcome, ClientContext};

    fn record(action: ActionType, age_days: i64, now: DateTime<Utc>) -> AuditRecord {
        AuditRecord {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            actor: None,
            action,
            resource_type: None,
            resource_id: None,
            description: action.description().into(),
            outcome: AuditOutcome::Success,
            error_message: None,
            context: ClientContext::default(),
            metadata: serde_json::json!({}),
            created_at: now - Duration::days(age_days),
        }
    }

    #[test]
    fn tier_is_monotonic_in_age() {
        let now = Utc::now();
        for action in [
            ActionType::UserDelete,
            ActionType::Login,
            ActionType::PermissionGrant,
            ActionType::ChatSessionCreate,
        ] {
            let mut last = StorageTier::Hot;
            for age in 0..3000 {
                let tier = storage_tier(action, now - Duration::days(age), now);
                assert!(tier >= last, "{action:?} regressed at age {age}");
                last = tier;
            }
        }
    }

    #[test]
    fn routine_thresholds() {
        let now = Utc::now();
        let at = |age| storage_tier(ActionType::ChatSessionCreate, now - Duration::days(age), now);
        assert_eq!(at(0), StorageTier::Hot);
        assert_eq!(at(6), StorageTier::Hot);
        assert_eq!(at(7), StorageTier::Warm);
        assert_eq!(at(29), StorageTier::Warm);
        assert_eq!(at(30), StorageTier::Cold);
        assert_eq!(at(179), StorageTier::Cold);
        assert_eq!(at(180), StorageTier::Archive);
    }

    #[test]
    fn high_risk_thresholds() {
        let now = Utc::now();
        let at = |age| storage_tier(ActionType::UserDelete, now - Duration::days(age), now);
        assert_eq!(at(89), StorageTier::Hot);
        assert_eq!(at(90), StorageTier::Warm);
        assert_eq!(at(365), StorageTier::Cold);
        assert_eq!(at(1095), StorageTier::Archive);
        assert!(!is_past_retention(
            ActionType::UserDelete,
            now - Duration::days(2554),
            now
        ));
        assert!(is_past_retention(
            ActionType::UserDelete,
            now - Duration::days(2555),
            now
        ));
    }

    #[test]
    fn policy_thresholds_are_ordered() {
        for class in RiskClass::ALL {
            let p = TierPolicy::for_class(*class);
            assert!(p.hot_days <= p.warm_days);
            assert!(p.warm_days <= p.cold_days);
            assert!(p.cold_days <= p.retention_days);
        }
    }

    #[test]
    fn plan_buckets_are_disjoint_with_delete_priority() {
        let now = Utc::now();
        let records = vec![
            record(ActionType::ChatSessionCreate, 3, now),    // hot: untouched
            record(ActionType::ChatSessionCreate, 40, now),   // cold: archive bucket
            record(ActionType::ChatSessionCreate, 200, now),  // archive tier: compress
            record(ActionType::ChatSessionCreate, 400, now),  // past retention: delete
            record(ActionType::UserDelete, 400, now),         // high-risk: cold, archive bucket
        ];
        let plan = generate_archive_plan(&records, now);
        assert_eq!(plan.archive, vec![records[1].id, records[4].id]);
        assert_eq!(plan.compress, vec![records[2].id]);
        assert_eq!(plan.delete, vec![records[3].id]);
    }

    #[test]
    fn fresh_records_yield_empty_plan() {
        let now = Utc::now();
        let records = vec![
            record(ActionType::Login, 1, now),
            record(ActionType::UserDelete, 10, now),
        ];
        assert!(generate_archive_plan(&records, now).is_empty());
    }
}
