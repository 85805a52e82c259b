//! Wiring of configuration into application state.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::replay::{spawn_replay_cleanup, ReplayGuard};
use crate::auth::{AuthMode, Authenticator};
use crate::config::{Config, ContentNetworkKind};
use crate::db::store::{ConsistencyRouting, MetadataBackend, MetadataStore, SqliteBackend};
use crate::identity::key::KeyDeriver;
use crate::mirror::ipfs::IpfsClient;
use crate::mirror::local::LocalContentStore;
use crate::mirror::{ContentMirror, ContentNetwork};
use crate::state::AppState;

/// Build the metadata store for `config`, resolving consistency routing
/// against the backend's topology.
pub fn build_store(
    config: &Config,
    backend: Arc<dyn MetadataBackend>,
) -> MetadataStore {
    let store_config = config.store();
    let endpoint = store_config
        .write_endpoint
        .clone()
        .unwrap_or_else(|| backend.write_endpoint());
    let routing = ConsistencyRouting::resolve(
        store_config.consistency,
        backend.topology(),
        &endpoint,
        &store_config.synchronous_endpoints,
    );
    tracing::info!(endpoint = %endpoint, routing = ?routing, "Metadata store ready");
    MetadataStore::new(backend, routing)
}

/// Content network selected by `content_network`.
pub fn build_content_network(
    config: &Config,
) -> Result<Arc<dyn ContentNetwork>, Box<dyn std::error::Error>> {
    let network: Arc<dyn ContentNetwork> = match config.content_network {
        ContentNetworkKind::Ipfs => {
            let timeout = Duration::from_secs(config.ipfs().timeout_secs);
            let client = IpfsClient::new(&config.ipfs_url, timeout)?;
            tracing::info!("Mirroring to IPFS at {}", client.base_url());
            Arc::new(client)
        }
        ContentNetworkKind::Local => {
            tracing::info!("Mirroring to local blocks under {}", config.data_dir);
            Arc::new(LocalContentStore::new(&config.data_dir))
        }
    };
    Ok(network)
}

/// Assemble state from its parts. Does not spawn background tasks.
pub fn assemble_state(
    config: &Config,
    store: MetadataStore,
    network: Arc<dyn ContentNetwork>,
    replay: ReplayGuard,
) -> AppState {
    let auth = config.auth();
    let mode = AuthMode::from_debug(config.debug);
    if mode == AuthMode::Disabled {
        tracing::warn!("DEBUG MODE: request authentication is disabled");
    }

    AppState {
        store,
        authenticator: Authenticator::new(mode, replay, auth.freshness_window_secs),
        keys: KeyDeriver::new(auth.namespaces_enabled),
        mirror: ContentMirror::new(network),
    }
}

/// Open storage, pick the content network and start the replay sweeper.
pub fn build_state(config: &Config) -> Result<AppState, Box<dyn std::error::Error>> {
    let backend = Arc::new(SqliteBackend::open(&config.data_dir)?);
    let store = build_store(config, backend);
    let network = build_content_network(config)?;

    let auth = config.auth();
    let replay = ReplayGuard::new(auth.replay_retention_secs);
    spawn_replay_cleanup(replay.clone(), auth.replay_cleanup_interval_secs);

    Ok(assemble_state(config, store, network, replay))
}
