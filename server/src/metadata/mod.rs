//! Set / Get handlers for key-bound metadata.
//!
//! Bodies are read as raw bytes and parsed here, so any unparsable body is
//! reported as a malformed request rather than an extractor rejection.

pub mod get;
pub mod set;

use serde::{Deserialize, Serialize};

use crate::auth::canonical::SetPayload;
use crate::identity::{Coordinate, Identity};

#[derive(Debug, Deserialize)]
pub struct SetRequest {
    #[serde(default)]
    pub namespace: String,
    #[serde(rename = "pub_key_X")]
    pub pub_key_x: Coordinate,
    #[serde(rename = "pub_key_Y")]
    pub pub_key_y: Coordinate,
    pub set_data: SetPayload,
    /// Base64 `r || s [|| v]`
    #[serde(default)]
    pub signature: Option<String>,
}

impl SetRequest {
    pub fn identity(&self) -> Identity {
        Identity::new(self.pub_key_x.clone(), self.pub_key_y.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct GetRequest {
    #[serde(default)]
    pub namespace: String,
    #[serde(rename = "pub_key_X")]
    pub pub_key_x: Coordinate,
    #[serde(rename = "pub_key_Y")]
    pub pub_key_y: Coordinate,
}

impl GetRequest {
    pub fn identity(&self) -> Identity {
        Identity::new(self.pub_key_x.clone(), self.pub_key_y.clone())
    }
}

/// Response body of both Set (content identifier) and Get (stored value).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}
