use axum::{body::Bytes, extract::State, Json};
use chrono::Utc;

use crate::error::ApiError;
use crate::metadata::{MessageResponse, SetRequest};
use crate::state::AppState;

/// POST /set
///
/// Authenticate the signed payload, answer with the value's content
/// identifier and store it as the latest value for the derived key. The value
/// is pinned into the content network in the background; a pin failure never
/// fails the request.
pub async fn set_metadata(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let req: SetRequest = serde_json::from_slice(&body)?;
    let identity = req.identity();
    let key = state.keys.derive(&identity, &req.namespace)?;

    if let Err(e) = state.authenticator.authenticate(
        &identity,
        &req.set_data,
        req.signature.as_deref(),
        Utc::now(),
    ) {
        tracing::warn!(key = %key, "Rejected set: {}", e);
        return Err(e.into());
    }

    let SetRequest { set_data, .. } = req;
    let cid = state.mirror.hash_only(&set_data.data).await?;

    // Detached: the handle is dropped and the task outlives the request.
    drop(state.mirror.publish(set_data.data.clone()));

    let store = state.store.clone();
    let storage_key = key.clone().into_string();
    tokio::task::spawn_blocking(move || store.upsert(&storage_key, &set_data.data)).await??;

    tracing::info!(key = %key, cid = %cid, "Stored metadata");

    Ok(Json(MessageResponse {
        message: cid.to_string(),
    }))
}
