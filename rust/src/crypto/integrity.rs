//! Digests recorded in share parts and the HKDF step between a data key
//! and the cipher key.

use std::fmt::Write as _;

use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("hkdf expansion failed: {0}")]
    HkdfFailed(String),
}

pub fn sha256_digest(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Lowercase hex SHA-256, the form stored in a part's `digest` field.
pub fn sha256_hex(data: &[u8]) -> String {
    sha256_digest(data)
        .iter()
        .fold(String::with_capacity(64), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
}

/// HKDF-SHA256 extract-and-expand into `length` bytes that are wiped on drop.
pub fn hkdf_expand(
    key_material: &[u8],
    salt: &[u8],
    info: &[u8],
    length: usize,
) -> Result<Zeroizing<Vec<u8>>, IntegrityError> {
    let mut okm = Zeroizing::new(vec![0u8; length]);
    Hkdf::<Sha256>::new(Some(salt), key_material)
        .expand(info, &mut okm)
        .map_err(|e| IntegrityError::HkdfFailed(format!("{e}")))?;
    Ok(okm)
}
