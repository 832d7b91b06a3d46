//! Model configuration domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named, tenant-visible configuration of an upstream model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub provider_id: Uuid,
    pub name: String,
    /// Upstream model identifier (e.g. the provider's model string).
    pub model: String,
    /// Sampling and routing parameters (temperature, max tokens, ...).
    pub params: serde_json::Value,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateModelConfig {
    pub tenant_id: Uuid,
    pub provider_id: Uuid,
    pub name: String,
    pub model: String,
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateModelConfig {
    pub name: Option<String>,
    pub model: Option<String>,
    pub params: Option<serde_json::Value>,
    pub enabled: Option<bool>,
}
