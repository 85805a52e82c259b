//! Storage key derivation.
//!
//! `hex(X) 0x1C hex(Y)`, with `0x1C namespace` appended for a non-empty
//! namespace. The separator is outside the hex alphabet, so the key for an
//! empty namespace can never equal the key for a non-empty one.

use std::fmt;

use super::Identity;

/// ASCII file separator.
pub const KEY_SEPARATOR: char = '\x1c';

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("namespaces are disabled on this server")]
    NamespacesDisabled,
    #[error("namespace must not contain the key separator")]
    SeparatorInNamespace,
}

/// Unique row key in the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Render the separator visibly for logs.
        f.write_str(&self.0.replace(KEY_SEPARATOR, "|"))
    }
}

/// Derive the storage key for `identity` in `namespace`.
///
/// Callers must reject namespaces containing [`KEY_SEPARATOR`] first;
/// [`KeyDeriver::derive`] does.
pub fn storage_key(identity: &Identity, namespace: &str) -> StorageKey {
    let mut key = String::with_capacity(
        identity.x.as_hex().len() + identity.y.as_hex().len() + namespace.len() + 2,
    );
    key.push_str(identity.x.as_hex());
    key.push(KEY_SEPARATOR);
    key.push_str(identity.y.as_hex());
    if !namespace.is_empty() {
        key.push(KEY_SEPARATOR);
        key.push_str(namespace);
    }
    StorageKey(key)
}

/// Key derivation with the namespace feature flag applied.
#[derive(Debug, Clone, Copy)]
pub struct KeyDeriver {
    namespaces_enabled: bool,
}

impl KeyDeriver {
    pub fn new(namespaces_enabled: bool) -> Self {
        Self { namespaces_enabled }
    }

    pub fn derive(&self, identity: &Identity, namespace: &str) -> Result<StorageKey, KeyError> {
        if !namespace.is_empty() {
            if !self.namespaces_enabled {
                return Err(KeyError::NamespacesDisabled);
            }
            if namespace.contains(KEY_SEPARATOR) {
                return Err(KeyError::SeparatorInNamespace);
            }
        }
        Ok(storage_key(identity, namespace))
    }
}
