//! IPFS HTTP API client (`/api/v0/add`).

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{ContentId, ContentNetwork, MirrorError};

/// Response line of `/api/v0/add`.
#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

pub struct IpfsClient {
    http: reqwest::Client,
    base_url: String,
}

impl IpfsClient {
    /// `base_url` may omit the scheme (`localhost:5001`), as the IPFS CLI
    /// configuration usually does.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MirrorError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_add(&self, data: &[u8], only_hash: bool) -> Result<ContentId, MirrorError> {
        let part = reqwest::multipart::Part::bytes(data.to_vec()).file_name("data");
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(format!("{}/api/v0/add", self.base_url))
            .query(&[
                ("only-hash", only_hash.to_string()),
                ("pin", (!only_hash).to_string()),
            ])
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MirrorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        parse_add_response(&text)
    }
}

#[async_trait]
impl ContentNetwork for IpfsClient {
    async fn hash_only(&self, data: &[u8]) -> Result<ContentId, MirrorError> {
        self.post_add(data, true).await
    }

    async fn add(&self, data: &[u8]) -> Result<ContentId, MirrorError> {
        self.post_add(data, false).await
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// The add endpoint streams one JSON object per line; the last one is the
/// root of what was added.
fn parse_add_response(text: &str) -> Result<ContentId, MirrorError> {
    let last = text
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| MirrorError::InvalidResponse("empty add response".to_string()))?;
    let added: AddResponse = serde_json::from_str(last)
        .map_err(|e| MirrorError::InvalidResponse(format!("{}: {}", e, last)))?;
    if added.hash.is_empty() {
        return Err(MirrorError::InvalidResponse("add response without hash".to_string()));
    }
    Ok(ContentId::new(added.hash))
}
