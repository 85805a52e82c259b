//! Write authentication: canonical payload, signature check and replay window.

pub mod canonical;
pub mod replay;
pub mod signature;

use base64::Engine;
use chrono::{DateTime, Utc};

use crate::identity::Identity;
use canonical::SetPayload;
use replay::ReplayGuard;

/// Default maximum age of a signed timestamp.
pub const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 60;

/// Which verification protocol a Set request goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Replay cache, freshness window and signature check.
    Enforced,
    /// Debug escape hatch: every write is accepted. Never use in production.
    Disabled,
}

impl AuthMode {
    pub fn from_debug(debug: bool) -> Self {
        if debug {
            AuthMode::Disabled
        } else {
            AuthMode::Enforced
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("message already seen in cache")]
    ReplayDetected,
    #[error("timesigned is more than {window_secs} seconds ago")]
    StaleTimestamp { window_secs: u64 },
    #[error("invalid signature")]
    InvalidSignature,
}

#[derive(Clone)]
pub struct Authenticator {
    mode: AuthMode,
    replay: ReplayGuard,
    freshness_window_secs: u64,
}

impl Authenticator {
    pub fn new(mode: AuthMode, replay: ReplayGuard, freshness_window_secs: u64) -> Self {
        Self {
            mode,
            replay,
            freshness_window_secs,
        }
    }

    pub fn replay_guard(&self) -> &ReplayGuard {
        &self.replay
    }

    /// Decide whether a Set payload may be written for `identity`.
    ///
    /// `signature_b64` is the base64 text from the request, if any.
    pub fn authenticate(
        &self,
        identity: &Identity,
        payload: &SetPayload,
        signature_b64: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        match self.mode {
            AuthMode::Disabled => Ok(()),
            AuthMode::Enforced => self.enforce(identity, payload, signature_b64, now),
        }
    }

    fn enforce(
        &self,
        identity: &Identity,
        payload: &SetPayload,
        signature_b64: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let message = canonical::encode(payload);
        let fingerprint = hex::encode(&message);

        // The slot is taken before the freshness check: a stale payload still
        // occupies the cache so retries of it skip the signature check.
        if !self.replay.check_and_insert(&fingerprint, now) {
            return Err(AuthError::ReplayDetected);
        }

        let age = i128::from(now.timestamp()) - i128::from(payload.timestamp.0);
        if age > i128::from(self.freshness_window_secs) {
            return Err(AuthError::StaleTimestamp {
                window_secs: self.freshness_window_secs,
            });
        }

        let sig_bytes = signature_b64
            .and_then(|s| base64::engine::general_purpose::STANDARD.decode(s).ok())
            .ok_or(AuthError::InvalidSignature)?;

        if !signature::verify(&message, identity, &sig_bytes) {
            return Err(AuthError::InvalidSignature);
        }

        Ok(())
    }
}
