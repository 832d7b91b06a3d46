//! CUSTOS Audit — action classification rules, record lifecycle
//! tiering, and the best-effort audit recorder.

pub mod config;
pub mod lifecycle;
pub mod recorder;
pub mod rules;

pub use config::SweepConfig;
pub use lifecycle::{ArchivePlan, StorageTier, TierPolicy};
pub use recorder::{AuditService, MIN_RETENTION_DAYS};
pub use rules::{AuditLevel, AuditRule, RiskClass};
