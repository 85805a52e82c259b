//! Filesystem content store addressed by raw CIDv1.
//!
//! Layout: `{data_dir}/blocks/{cid}`. Useful when no IPFS node is reachable.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{ContentId, ContentNetwork, MirrorError};

pub struct LocalContentStore {
    dir: PathBuf,
}

impl LocalContentStore {
    pub fn new(data_dir: &str) -> Self {
        Self {
            dir: Path::new(data_dir).join("blocks"),
        }
    }

    fn block_path(&self, cid: &ContentId) -> PathBuf {
        self.dir.join(cid.as_str())
    }

    /// Read a stored block back.
    pub async fn get(&self, cid: &ContentId) -> Result<Option<Vec<u8>>, MirrorError> {
        match tokio::fs::read(self.block_path(cid)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ContentNetwork for LocalContentStore {
    async fn hash_only(&self, data: &[u8]) -> Result<ContentId, MirrorError> {
        Ok(ContentId::raw_v1(data))
    }

    async fn add(&self, data: &[u8]) -> Result<ContentId, MirrorError> {
        let cid = ContentId::raw_v1(data);
        let path = self.block_path(&cid);
        if tokio::fs::try_exists(&path).await? {
            tracing::debug!("Block {} already stored, skipping", cid);
            return Ok(cid);
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        // Write then rename so a reader never sees a partial block.
        let tmp = self.dir.join(format!("{}.tmp", cid));
        tokio::fs::write(&tmp, data).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            // A concurrent add of the same value may have won the rename.
            if !tokio::fs::try_exists(&path).await? {
                return Err(e.into());
            }
        }

        tracing::debug!("Stored block {} ({} bytes)", cid, data.len());
        Ok(cid)
    }
}
