//! Client-side sealing of usernames and passwords before they reach the vault.
//!
//! XChaCha20-Poly1305, fresh random 24-byte nonce per value.  Ciphertext and
//! nonce are hex-encoded and handed to the vault as a `(cipher, iv)` pair.

use anyhow::{anyhow, Result};
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use cv_store::CipherPair;
use zeroize::Zeroizing;

use crate::config::ENV_VAULT_KEY;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 24;

pub struct Sealer {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl Sealer {
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            hex::decode(hex_key.trim()).map_err(|e| anyhow!("decode vault key: {e}"))?,
        );
        if bytes.len() != KEY_LEN {
            return Err(anyhow!("vault key must be {KEY_LEN} bytes ({} hex chars)", KEY_LEN * 2));
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(&bytes);
        Ok(Self { key })
    }

    pub fn from_env() -> Result<Self> {
        let raw = Zeroizing::new(
            std::env::var(ENV_VAULT_KEY).map_err(|_| anyhow!("{ENV_VAULT_KEY} is not set"))?,
        );
        Self::from_hex(&raw)
    }

    pub fn seal(&self, plaintext: &str) -> Result<CipherPair> {
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.key[..]));
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| anyhow!("encrypt: {e}"))?;
        Ok(CipherPair::new(hex::encode(ciphertext), hex::encode(nonce)))
    }

    pub fn open(&self, pair: &CipherPair) -> Result<Zeroizing<String>> {
        let nonce = hex::decode(&pair.iv).map_err(|e| anyhow!("decode iv: {e}"))?;
        if nonce.len() != NONCE_LEN {
            return Err(anyhow!("iv must be {NONCE_LEN} bytes"));
        }
        let ciphertext = hex::decode(&pair.cipher).map_err(|e| anyhow!("decode cipher: {e}"))?;
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.key[..]));
        let plaintext = cipher
            .decrypt(XNonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|e| anyhow!("decrypt: {e}"))?;
        let text = String::from_utf8(plaintext).map_err(|e| anyhow!("decrypted value is not utf-8: {e}"))?;
        Ok(Zeroizing::new(text))
    }
}
