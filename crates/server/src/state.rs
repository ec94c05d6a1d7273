use std::sync::Arc;

use queue_buddy_core::{
    AuditHandle, AuditStore, Authenticator, Config, Identity, QueueService, Role,
    SanitizedConfig, UserError, UserStore,
};

use crate::api::WsBroadcaster;

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    queue: Arc<QueueService>,
    users: Arc<dyn UserStore>,
    audit: AuditHandle,
    audit_store: Arc<dyn AuditStore>,
    ws_broadcaster: WsBroadcaster,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        queue: Arc<QueueService>,
        users: Arc<dyn UserStore>,
        audit: AuditHandle,
        audit_store: Arc<dyn AuditStore>,
        ws_broadcaster: WsBroadcaster,
    ) -> Self {
        Self {
            config,
            authenticator,
            queue,
            users,
            audit,
            audit_store,
            ws_broadcaster,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn queue(&self) -> &QueueService {
        self.queue.as_ref()
    }

    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    pub fn audit(&self) -> &AuditHandle {
        &self.audit
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }

    /// Whether `identity` may use the admin endpoints.
    ///
    /// With authentication disabled every caller is trusted.
    pub fn is_admin(&self, identity: &Identity) -> Result<bool, UserError> {
        if self.authenticator.is_open() {
            return Ok(true);
        }
        if identity.is_anonymous() {
            return Ok(false);
        }
        self.users.has_role(&identity.user_id, Role::Admin)
    }
}
