use axum::{body::Bytes, extract::State, Json};

use crate::error::ApiError;
use crate::metadata::{GetRequest, MessageResponse};
use crate::state::AppState;

/// POST /get
///
/// Latest value stored for the derived key. An identity that never wrote
/// gets an empty message, not an error.
pub async fn get_metadata(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let req: GetRequest = serde_json::from_slice(&body)?;
    let key = state.keys.derive(&req.identity(), &req.namespace)?;

    let store = state.store.clone();
    let storage_key = key.clone().into_string();
    let value = tokio::task::spawn_blocking(move || store.get(&storage_key)).await??;

    tracing::debug!(key = %key, bytes = value.len(), "Served metadata");

    Ok(Json(MessageResponse { message: value }))
}
