use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use queue_buddy_core::{
    create_audit_system, create_authenticator, load_config, validate_config, AuditEvent,
    AuditStore, Authenticator, Config, CreateProfileRequest, QueueOptions, QueueService, Role,
    SqliteAuditStore, SqliteQueueStore, SqliteUserStore, SystemClock, UserStore,
};
use queue_buddy_server::api::{create_router, WsBroadcaster};
use queue_buddy_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for audit event channel
const AUDIT_BUFFER_SIZE: usize = 1000;

const WRITER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("QUEUE_BUDDY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Branch: {}", config.branch.name);
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Compute config hash for audit
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    let audit_store: Arc<dyn AuditStore> = Arc::new(
        SqliteAuditStore::new(&config.database.path).context("Failed to create audit store")?,
    );
    info!("Audit store initialized");

    let users: Arc<dyn UserStore> = Arc::new(
        SqliteUserStore::new(&config.database.path).context("Failed to create user store")?,
    );
    bootstrap_admins(users.as_ref(), &config).context("Failed to bootstrap admins")?;
    info!("User directory initialized");

    let queue_store = Arc::new(
        SqliteQueueStore::new(&config.database.path).context("Failed to create queue store")?,
    );
    let options = QueueOptions::from_config(&config).context("Invalid branch settings")?;
    let queue = Arc::new(
        QueueService::open(queue_store, Arc::new(SystemClock), options)
            .context("Failed to load queue state")?,
    );
    info!(
        waiting = queue.waiting_count(None),
        serving = queue.current_serving().len(),
        "Queue loaded"
    );

    let (audit_handle, audit_writer) =
        create_audit_system(Arc::clone(&audit_store), AUDIT_BUFFER_SIZE);
    let writer_handle = tokio::spawn(audit_writer.run());

    audit_handle
        .emit(AuditEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;
    info!("Emitted ServiceStarted audit event");

    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        Arc::clone(&queue),
        users,
        audit_handle.clone(),
        audit_store,
        WsBroadcaster::default(),
    ));

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if let Err(e) = queue.flush() {
        warn!("Final queue snapshot failed: {}", e);
    }

    audit_handle
        .emit(AuditEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // Dropping the last handle closes the channel so the writer drains and
    // exits. Lingering WebSocket tasks may still hold one, hence the timeout.
    drop(audit_handle);
    match tokio::time::timeout(WRITER_SHUTDOWN_TIMEOUT, writer_handle).await {
        Ok(_) => info!("Audit writer stopped"),
        Err(_) => warn!("Audit writer did not stop in time"),
    }

    Ok(())
}

/// Make sure every configured bootstrap admin has a profile and the admin role.
fn bootstrap_admins(users: &dyn UserStore, config: &Config) -> Result<()> {
    for user_id in &config.auth.bootstrap_admins {
        if users.get_profile(user_id)?.is_none() {
            users.create_profile(&CreateProfileRequest {
                user_id: user_id.clone(),
                email: String::new(),
            })?;
        }
        if users.grant_role(user_id, Role::Admin)? {
            info!(user_id = %user_id, "Granted admin role to bootstrap admin");
        }
    }
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
