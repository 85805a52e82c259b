use clap::{Parser, ValueEnum};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::auth::{replay::DEFAULT_RETENTION_SECS, DEFAULT_FRESHNESS_WINDOW_SECS};
use crate::db::store::ConsistencyMode;

/// Key-bound metadata server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "metadata-server", version, about = "Signed key-bound metadata server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "TM_PORT", default_value = "5051")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "TM_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./metadata.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "TM_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for the SQLite database and local blocks
    #[arg(long, env = "TM_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Disable request authentication. Never enable in production.
    #[arg(long, env = "TM_DEBUG")]
    pub debug: bool,

    /// TLS is expected to be terminated in front of this server
    #[arg(long, env = "TM_HTTPS_ENABLED")]
    pub https_enabled: bool,

    /// IPFS HTTP API address
    #[arg(long, env = "TM_IPFS_URL", default_value = "http://localhost:5001")]
    pub ipfs_url: String,

    /// Where stored values are mirrored
    #[arg(long, env = "TM_CONTENT_NETWORK", value_enum, default_value = "ipfs")]
    pub content_network: ContentNetworkKind,

    /// Maximum request body size in KiB
    #[arg(long, env = "TM_MAX_BODY_KB", default_value = "2048")]
    pub max_body_kb: usize,

    /// Authentication windows (loaded from [auth] section in TOML)
    #[arg(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    /// Storage consistency routing (loaded from [store] section in TOML)
    #[arg(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,

    /// IPFS client settings (loaded from [ipfs] section in TOML)
    #[arg(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipfs: Option<IpfsConfig>,
}

#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentNetworkKind {
    /// IPFS node reached over its HTTP API
    Ipfs,
    /// Blocks written under `{data_dir}/blocks`
    Local,
}

/// Replay protection and namespace settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Maximum age of a signed timestamp in seconds (default: 60)
    #[serde(default = "default_freshness_window")]
    pub freshness_window_secs: u64,

    /// How long a seen payload stays in the replay cache (default: 600)
    #[serde(default = "default_replay_retention")]
    pub replay_retention_secs: u64,

    /// Interval between replay cache sweeps (default: 600)
    #[serde(default = "default_replay_cleanup_interval")]
    pub replay_cleanup_interval_secs: u64,

    /// Accept the optional `namespace` request field (default: true)
    #[serde(default = "default_true")]
    pub namespaces_enabled: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            freshness_window_secs: DEFAULT_FRESHNESS_WINDOW_SECS,
            replay_retention_secs: DEFAULT_RETENTION_SECS,
            replay_cleanup_interval_secs: DEFAULT_RETENTION_SECS,
            namespaces_enabled: true,
        }
    }
}

fn default_freshness_window() -> u64 {
    DEFAULT_FRESHNESS_WINDOW_SECS
}

fn default_replay_retention() -> u64 {
    DEFAULT_RETENTION_SECS
}

fn default_replay_cleanup_interval() -> u64 {
    DEFAULT_RETENTION_SECS
}

fn default_true() -> bool {
    true
}

/// Read-your-write routing for the metadata store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "auto", "session" or "synchronous" (default: auto)
    #[serde(default)]
    pub consistency: ConsistencyMode,

    /// Overrides the backend's own write endpoint for routing decisions
    #[serde(default)]
    pub write_endpoint: Option<String>,

    /// Write endpoints known to replicate synchronously (substring match)
    #[serde(default)]
    pub synchronous_endpoints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpfsConfig {
    /// Per-request timeout for the IPFS HTTP API (default: 30)
    #[serde(default = "default_ipfs_timeout")]
    pub timeout_secs: u64,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

fn default_ipfs_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5051,
            bind_address: "0.0.0.0".to_string(),
            config: "./metadata.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            debug: false,
            https_enabled: false,
            ipfs_url: "http://localhost:5001".to_string(),
            content_network: ContentNetworkKind::Ipfs,
            max_body_kb: 2048,
            auth: Some(AuthConfig::default()),
            store: Some(StoreConfig::default()),
            ipfs: Some(IpfsConfig::default()),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (TM_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Self::figment(&config_path)
            .merge(Serialized::defaults(cli))
            .extract()
    }

    /// Defaults, TOML file and environment, without CLI arguments.
    pub fn figment(config_path: &str) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("TM_").split("__"))
    }

    pub fn auth(&self) -> AuthConfig {
        self.auth.clone().unwrap_or_default()
    }

    pub fn store(&self) -> StoreConfig {
        self.store.clone().unwrap_or_default()
    }

    pub fn ipfs(&self) -> IpfsConfig {
        self.ipfs.clone().unwrap_or_default()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Metadata Server Configuration
# Place this file at ./metadata.toml or specify with --config <path>
# All settings can be overridden via environment variables (TM_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 5051)
# port = 5051

# Bind address (default: 0.0.0.0, all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the SQLite database and local blocks
# data_dir = "./data"

# Disable signature, freshness and replay checks. NEVER in production.
# debug = false

# TLS is terminated by the fronting proxy; this flag is informational
# https_enabled = false

# Content network: "ipfs" (HTTP API at ipfs_url) or "local" (data_dir/blocks)
# content_network = "ipfs"
# ipfs_url = "http://localhost:5001"

# Maximum request body size in KiB (default: 2048)
# max_body_kb = 2048

# ---- Authentication ----
# [auth]
# freshness_window_secs = 60          # Max age of a signed timestamp
# replay_retention_secs = 600         # How long a seen payload is remembered
# replay_cleanup_interval_secs = 600  # Sweep interval for expired entries
# namespaces_enabled = true           # Accept the optional namespace field

# ---- Storage ----
# [store]
# consistency = "auto"                # "auto", "session" or "synchronous"
# write_endpoint = ""                 # Overrides the backend's endpoint name
# synchronous_endpoints = []          # Endpoints with synchronous replication

# ---- IPFS ----
# [ipfs]
# timeout_secs = 30
"#
    .to_string()
}
