//! Key material for fortified files.
//! A `FileKey` is the 32 byte data key that is either split into Shamir key
//! files or derived from a passphrase. The cipher never sees it directly: it
//! is stretched through HKDF with the per-file salt first.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroize;

use super::integrity::hkdf_expand;

pub const KEY_LEN: usize = 32;
pub const SALT_LEN: usize = 16;

const CIPHER_KEY_INFO: &[u8] = b"fortify file key";

/// Argon2id cost, 19 MiB / 3 passes / 1 lane.
const MEMORY_COST_KIB: u32 = 19 * 1024;
const TIME_COST: u32 = 3;
const PARALLELISM: u32 = 1;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid key length; expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("argon2 derivation failed: {0}")]
    DerivationFailed(String),
    #[error("random generator failed: {0}")]
    Random(String),
}

/// Symmetric data key, wiped from memory on drop.
pub struct FileKey {
    bytes: [u8; KEY_LEN],
}

impl FileKey {
    /// Builds a key from raw bytes. The slice must be exactly 32 bytes.
    pub fn from_bytes(key_bytes: &[u8]) -> Result<Self, KeyError> {
        if key_bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidKeyLength(key_bytes.len()));
        }
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(key_bytes);
        Ok(Self { bytes })
    }

    /// Draws a fresh key from the operating system RNG.
    pub fn generate() -> Result<Self, KeyError> {
        let mut bytes = [0u8; KEY_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| KeyError::Random(format!("{e}")))?;
        Ok(Self { bytes })
    }

    /// Derives a key from a passphrase using Argon2id. The salt is stored in
    /// the file header so decryption can repeat the derivation.
    pub fn derive_from_passphrase(passphrase: &str, salt: &[u8]) -> Result<Self, KeyError> {
        let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(KEY_LEN))
            .map_err(|e| KeyError::DerivationFailed(format!("{e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut output = [0u8; KEY_LEN];
        argon2
            .hash_password_into(passphrase.as_bytes(), salt, &mut output)
            .map_err(|e| KeyError::DerivationFailed(format!("{e}")))?;
        let key = Self::from_bytes(&output);
        output.zeroize();
        key
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Expands the data key into the key handed to the AEAD for one file.
    pub fn cipher_key(&self, salt: &[u8]) -> Result<FileKey, KeyError> {
        let okm = hkdf_expand(&self.bytes, salt, CIPHER_KEY_INFO, KEY_LEN)
            .map_err(|e| KeyError::DerivationFailed(format!("{e}")))?;
        Self::from_bytes(&okm)
    }
}

impl Drop for FileKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FileKey(<redacted>)")
    }
}

/// Fresh random salt for a new file header.
pub fn generate_salt() -> Result<[u8; SALT_LEN], KeyError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| KeyError::Random(format!("{e}")))?;
    Ok(salt)
}
