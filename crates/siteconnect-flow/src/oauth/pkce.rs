//! PKCE (Proof Key for Code Exchange)
//!
//! Implements RFC 7636 for the client-generated authorization payloads.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

/// PKCE code verifier and challenge pair
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// The code verifier (kept secret, persisted with the pending flow)
    pub verifier: String,
    /// The code challenge (sent in authorization request)
    pub challenge: String,
    /// Challenge method (always S256)
    pub method: String,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge
    pub fn generate() -> Self {
        let verifier = random_token(32);
        let challenge = Self::challenge_for(&verifier);

        Self {
            verifier,
            challenge,
            method: "S256".to_string(),
        }
    }

    /// S256 challenge: base64url(SHA256(verifier))
    pub fn challenge_for(verifier: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    /// Verify that a verifier matches a challenge
    pub fn verify(verifier: &str, challenge: &str) -> bool {
        Self::challenge_for(verifier) == challenge
    }
}

impl Default for PkceChallenge {
    fn default() -> Self {
        Self::generate()
    }
}

/// Opaque correlation token for the `state` parameter
pub fn generate_state() -> String {
    random_token(16)
}

fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}
