//! Mirror of stored values into a content-addressable network.
//!
//! Computing the identifier is on the request path because the client keeps
//! it as a receipt. Pinning is not: it runs as a detached task whose failures
//! only reach the log.

pub mod ipfs;
pub mod local;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// CIDv1 version byte.
const CID_V1: u8 = 0x01;
/// Multicodec `raw`.
const CODEC_RAW: u8 = 0x55;
/// Multihash `sha2-256` and its digest length.
const MULTIHASH_SHA2_256: u8 = 0x12;
const SHA2_256_LEN: u8 = 0x20;

/// Content identifier as reported by the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// CIDv1 with the raw codec over a sha2-256 digest, multibase base32
    /// lower (`bafkrei...`). Matches `ipfs add --cid-version 1 --raw-leaves`
    /// for single-chunk inputs.
    pub fn raw_v1(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut bytes = Vec::with_capacity(4 + digest.len());
        bytes.extend_from_slice(&[CID_V1, CODEC_RAW, MULTIHASH_SHA2_256, SHA2_256_LEN]);
        bytes.extend_from_slice(&digest);
        let encoded = base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &bytes);
        Self(format!("b{}", encoded.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("content network request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("content network returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("content network response invalid: {0}")]
    InvalidResponse(String),
    #[error("content store I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// A content-addressable network the server can mirror into.
#[async_trait]
pub trait ContentNetwork: Send + Sync {
    /// Identifier `data` would get, without storing it.
    async fn hash_only(&self, data: &[u8]) -> Result<ContentId, MirrorError>;

    /// Store and pin `data`, returning its identifier.
    async fn add(&self, data: &[u8]) -> Result<ContentId, MirrorError>;
}

#[derive(Clone)]
pub struct ContentMirror {
    network: Arc<dyn ContentNetwork>,
}

impl ContentMirror {
    pub fn new(network: Arc<dyn ContentNetwork>) -> Self {
        Self { network }
    }

    pub async fn hash_only(&self, data: &str) -> Result<ContentId, MirrorError> {
        self.network.hash_only(data.as_bytes()).await
    }

    /// Pin `data` in the background.
    ///
    /// The returned handle may be dropped; the task keeps running and is not
    /// awaited on shutdown.
    pub fn publish(&self, data: String) -> JoinHandle<()> {
        let network = self.network.clone();
        tokio::spawn(async move {
            match network.add(data.as_bytes()).await {
                Ok(cid) => {
                    tracing::debug!(cid = %cid, bytes = data.len(), "Pinned metadata value");
                }
                Err(e) => {
                    tracing::error!(bytes = data.len(), error = %e, "could not add to content network");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingNetwork {
        adds: AtomicUsize,
    }

    #[async_trait]
    impl ContentNetwork for FailingNetwork {
        async fn hash_only(&self, data: &[u8]) -> Result<ContentId, MirrorError> {
            Ok(ContentId::raw_v1(data))
        }

        async fn add(&self, _data: &[u8]) -> Result<ContentId, MirrorError> {
            self.adds.fetch_add(1, Ordering::SeqCst);
            Err(MirrorError::InvalidResponse("node offline".to_string()))
        }
    }

    #[test]
    fn test_raw_v1_format() {
        let cid = ContentId::raw_v1(b"abc");
        assert!(cid.as_str().starts_with("bafkrei"), "{}", cid);
        assert_eq!(cid.as_str().len(), 59);
        assert_eq!(cid, ContentId::raw_v1(b"abc"));
        assert_ne!(cid, ContentId::raw_v1(b"abd"));
    }

    #[test]
    fn test_raw_v1_empty_input_vector() {
        // sha2-256 of the empty string as a raw CIDv1.
        assert_eq!(
            ContentId::raw_v1(b"").as_str(),
            "bafkreihdwdcefgh4dqkjv67uzcmw7ojee6xedzdetojuzjevtenxquvyku"
        );
    }

    #[tokio::test]
    async fn test_publish_failure_is_contained() {
        let network = Arc::new(FailingNetwork {
            adds: AtomicUsize::new(0),
        });
        let mirror = ContentMirror::new(network.clone());

        let cid = mirror.hash_only("value").await.unwrap();
        assert_eq!(cid, ContentId::raw_v1(b"value"));

        // The task completes normally even though the add failed.
        mirror.publish("value".to_string()).await.unwrap();
        assert_eq!(network.adds.load(Ordering::SeqCst), 1);
    }
}
