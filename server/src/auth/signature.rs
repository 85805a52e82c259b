//! secp256k1 ECDSA verification of detached signatures.
//!
//! The message is hashed with Keccak-256 and verified as a prehash against the
//! uncompressed point built from the identity's coordinates. Signatures are
//! `r || s` or `r || s || v`; the recovery byte is ignored because the public
//! key is supplied by the caller.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};
use k256::{EncodedPoint, FieldBytes};
use sha3::{Digest, Keccak256};

use crate::identity::Identity;

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Build the verifying key for an identity, or `None` if the point is not on
/// the curve.
pub fn verifying_key(identity: &Identity) -> Option<VerifyingKey> {
    let x = FieldBytes::from(identity.x.to_be_bytes());
    let y = FieldBytes::from(identity.y.to_be_bytes());
    let point = EncodedPoint::from_affine_coordinates(&x, &y, false);
    VerifyingKey::from_encoded_point(&point).ok()
}

/// Verify `signature` over `message` for `identity`.
///
/// Never panics. Malformed signatures, off-curve points and zero or
/// out-of-range scalars all yield `false`. High-S signatures are normalized
/// before verification. Scalar comparison inside `k256` is constant-time.
pub fn verify(message: &[u8], identity: &Identity, signature: &[u8]) -> bool {
    let rs = match signature.len() {
        64 | 65 => &signature[..64],
        _ => return false,
    };
    let Ok(sig) = Signature::from_slice(rs) else {
        return false;
    };
    let sig = sig.normalize_s().unwrap_or(sig);

    let Some(key) = verifying_key(identity) else {
        return false;
    };

    key.verify_prehash(&keccak256(message), &sig).is_ok()
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;
    use crate::identity::Coordinate;
    use k256::ecdsa::SigningKey;
    use rand::Rng;

    /// Signing key from random bytes (avoids the rand_core version split).
    pub fn random_signing_key() -> SigningKey {
        loop {
            let secret: [u8; 32] = rand::rng().random();
            if let Ok(key) = SigningKey::from_slice(&secret) {
                return key;
            }
        }
    }

    pub fn identity_of(key: &SigningKey) -> Identity {
        let point = key.verifying_key().to_encoded_point(false);
        let x = hex::encode(point.x().expect("uncompressed point has x"));
        let y = hex::encode(point.y().expect("uncompressed point has y"));
        Identity::new(Coordinate::parse(&x).unwrap(), Coordinate::parse(&y).unwrap())
    }

    /// 65-byte `r || s || v` signature over keccak256(message).
    pub fn sign(key: &SigningKey, message: &[u8]) -> Vec<u8> {
        let (sig, recid) = key
            .sign_prehash_recoverable(&keccak256(message))
            .expect("signing failed");
        let mut out = sig.to_bytes().to_vec();
        out.push(recid.to_byte() + 27);
        out
    }
}
