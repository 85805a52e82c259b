use crate::auth::Authenticator;
use crate::db::store::MetadataStore;
use crate::identity::key::KeyDeriver;
use crate::mirror::ContentMirror;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Metadata rows with consistency routing applied
    pub store: MetadataStore,
    /// Replay cache, freshness window and signature check (or the debug bypass)
    pub authenticator: Authenticator,
    /// Storage key derivation with the namespace flag applied
    pub keys: KeyDeriver,
    /// Content network mirror for stored values
    pub mirror: ContentMirror,
}
