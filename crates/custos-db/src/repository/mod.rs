//! SurrealDB repository implementations.

mod audit;
mod chat_session;
mod model_config;
mod permission;
mod provider;
mod role;
mod user;

pub use audit::SurrealAuditRecordRepository;
pub use chat_session::SurrealChatSessionRepository;
pub use model_config::SurrealModelConfigRepository;
pub use permission::SurrealPermissionRepository;
pub use provider::SurrealProviderRepository;
pub use role::SurrealRoleRepository;
pub use user::SurrealUserRepository;
