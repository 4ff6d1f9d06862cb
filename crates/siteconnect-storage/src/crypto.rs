//! Session value encryption.
//!
//! Pending-flow payloads carry the PKCE verifier, so native hosts can seal
//! session values with AES-256-GCM before they reach disk. Sealed values are
//! hex(nonce || ciphertext || tag).

use anyhow::{Context, Result};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Size of the encryption key (32 bytes = 256 bits).
pub const KEY_SIZE: usize = 32;

const NONCE_SIZE: usize = 12;

pub struct SessionCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl SessionCipher {
    pub fn new(key: &[u8; KEY_SIZE]) -> Result<Self> {
        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| anyhow::anyhow!("Failed to create session cipher key"))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Seal a value. The key name is bound as associated data so a sealed
    /// value cannot be replayed under another key.
    pub fn seal(&self, key_name: &str, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| anyhow::anyhow!("Failed to generate nonce"))?;

        let mut in_out = Zeroizing::new(plaintext.as_bytes().to_vec());
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(key_name.as_bytes()),
                &mut *in_out,
            )
            .map_err(|_| anyhow::anyhow!("Encryption failed"))?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend_from_slice(&in_out);
        Ok(hex::encode(sealed))
    }

    pub fn open(&self, key_name: &str, sealed_hex: &str) -> Result<String> {
        let sealed = hex::decode(sealed_hex).context("Invalid hex encoding")?;
        if sealed.len() < NONCE_SIZE + AES_256_GCM.tag_len() {
            anyhow::bail!("Sealed value too short");
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
        let nonce: [u8; NONCE_SIZE] = nonce_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Invalid nonce"))?;

        let mut in_out = Zeroizing::new(ciphertext.to_vec());
        let plaintext = self
            .key
            .open_in_place(
                Nonce::assume_unique_for_key(nonce),
                Aad::from(key_name.as_bytes()),
                &mut *in_out,
            )
            .map_err(|_| anyhow::anyhow!("Decryption failed - wrong key or corrupted data"))?;

        String::from_utf8(plaintext.to_vec()).context("Decrypted value is not valid UTF-8")
    }
}

/// Generate a random session key.
pub fn generate_session_key() -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    SystemRandom::new()
        .fill(&mut *key)
        .map_err(|_| anyhow::anyhow!("Failed to generate random key"))?;
    Ok(key)
}
