//! Opaque bearer token minting and digest computation.
//!
//! Tokens (`bib_sess_…` sessions, `bib_pub_…` share links) are random
//! 256-bit values, base64url-encoded behind a recognizable prefix. Only
//! the SHA-256 hex digest is ever stored; validation is a digest lookup.

use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Prefix for session bearer tokens.
pub const SESSION_TOKEN_PREFIX: &str = "bib_sess_";

/// Prefix for public share-link tokens.
pub const SHARE_TOKEN_PREFIX: &str = "bib_pub_";

/// Mint an opaque token with the given prefix. Returns the plaintext token
/// and the digest to store.
pub fn mint_token(prefix: &str) -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = format!(
        "{}{}",
        prefix,
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    );
    let digest = token_digest(&token);
    (token, digest)
}

/// SHA-256 hex digest of a token, as stored at rest.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
