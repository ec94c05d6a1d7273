pub mod audit;
pub mod auth;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod metrics;
pub mod queue;
pub mod testing;
pub mod users;

pub use audit::{
    create_audit_system, AuditError, AuditEvent, AuditEventEnvelope, AuditFilter, AuditHandle,
    AuditRecord, AuditStore, AuditWriter, SqliteAuditStore, DEFAULT_AUDIT_LIMIT, MAX_AUDIT_LIMIT,
};
pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use catalog::{display_code, ServiceInfo, ServiceType, SERVICE_CATALOG};
pub use clock::{Clock, SystemClock};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    CounterConfig, SanitizedConfig,
};
pub use queue::{
    Counter, QueueError, QueueOptions, QueueService, QueueState, QueueStats, QueueStore,
    SqliteQueueStore, Ticket, TicketFilter, TicketState, TicketStatus,
};
pub use users::{
    CreateProfileRequest, Profile, ProfileWithRoles, Role, SqliteUserStore, UserError, UserStore,
};
