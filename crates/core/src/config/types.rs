use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::catalog::ServiceType;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub branch: BranchConfig,
    /// Initial counter configuration, restored on queue reset.
    #[serde(default = "default_counters")]
    pub counters: Vec<CounterConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Accepted API keys (required when method = "api_key").
    #[serde(default)]
    pub api_keys: Vec<ApiKeyEntry>,
    /// Users granted the admin role at startup.
    #[serde(default)]
    pub bootstrap_admins: Vec<String>,
}

/// An API key and the user it authenticates as.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeyEntry {
    pub key: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("queue-buddy.db")
}

/// Branch-level settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BranchConfig {
    #[serde(default = "default_branch_name")]
    pub name: String,
    /// Offset of the branch's local time from UTC, in minutes.
    /// Daily statistics and the hourly histogram use local time.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            name: default_branch_name(),
            utc_offset_minutes: 0,
        }
    }
}

fn default_branch_name() -> String {
    "Bank UCA".to_string()
}

/// A service counter as configured at startup.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CounterConfig {
    pub id: u32,
    pub name: String,
    pub service_type: ServiceType,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// The five counters of a standard branch.
pub fn default_counters() -> Vec<CounterConfig> {
    [
        (1, ServiceType::Teller, true),
        (2, ServiceType::Teller, true),
        (3, ServiceType::CustomerService, true),
        (4, ServiceType::CustomerService, false),
        (5, ServiceType::Loan, true),
    ]
    .into_iter()
    .map(|(id, service_type, active)| CounterConfig {
        id,
        name: format!("Loket {}", id),
        service_type,
        active,
    })
    .collect()
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub branch: BranchConfig,
    pub counters: Vec<CounterConfig>,
}

/// Sanitized auth config (API keys hidden, only their owners shown)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub api_key_users: Vec<String>,
    pub bootstrap_admins: Vec<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
                api_key_users: config
                    .auth
                    .api_keys
                    .iter()
                    .map(|entry| entry.user_id.clone())
                    .collect(),
                bootstrap_admins: config.auth.bootstrap_admins.clone(),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            branch: config.branch.clone(),
            counters: config.counters.clone(),
        }
    }
}
