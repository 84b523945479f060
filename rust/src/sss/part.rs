//! Self-describing share records.
//!
//! A `Part` is what actually lands on disk: one share, base64 encoded, plus
//! enough bookkeeping (part number, threshold, block position, digest of the
//! secret) for the combiner to detect mixed-up or tampered files.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{combine_shares, split_into_shares, Share, SssError};
use crate::crypto::integrity::sha256_hex;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Part {
    /// Total number of parts the secret was split into.
    pub parts: u8,
    /// 1-based index of this part.
    pub part: u8,
    /// 1-based block index when a file was split; 0 for single secrets.
    #[serde(default)]
    pub block: u64,
    #[serde(default)]
    pub blocks: u64,
    pub threshold: u8,
    /// SHA-256 hex digest of the secret (or of this block of it).
    pub digest: String,
    /// URL-safe base64 of the share bytes.
    pub payload: String,
    pub timestamp: DateTime<Utc>,
}

impl Part {
    pub fn share(&self) -> Result<Share, SssError> {
        URL_SAFE
            .decode(self.payload.as_bytes())
            .map_err(|source| SssError::Payload {
                part: self.part as usize,
                source,
            })
    }

    /// File name used for this part: `<prefix><part>of<parts>.json`.
    pub fn file_name(&self, prefix: &str) -> String {
        part_file_name(prefix, self.part, self.parts)
    }
}

pub fn part_file_name(prefix: &str, part: u8, parts: u8) -> String {
    format!("{prefix}{part}of{parts}.json")
}

/// Splits `secret` into `parts` records sharing one digest and timestamp.
pub fn split(secret: &[u8], parts: u8, threshold: u8) -> Result<Vec<Part>, SssError> {
    let shares = split_into_shares(secret, parts, threshold)?;
    let digest = sha256_hex(secret);
    let timestamp = Utc::now();
    Ok(shares
        .iter()
        .zip(1..=parts)
        .map(|(share, part)| Part {
            parts,
            part,
            block: 0,
            blocks: 0,
            threshold,
            digest: digest.clone(),
            payload: URL_SAFE.encode(share),
            timestamp,
        })
        .collect())
}

/// Recombines records that must all describe the same secret, and checks the
/// result against the recorded digest.
pub fn combine(parts: &[Part]) -> Result<Vec<u8>, SssError> {
    let Some(first) = parts.first() else {
        return Err(SssError::NotEnoughShares);
    };
    let expected = &first.digest;

    let mut shares = Vec::with_capacity(parts.len());
    for (index, part) in parts.iter().enumerate() {
        if &part.digest != expected {
            log::debug!("expected secret digest {expected}, part {} carries {}", index + 1, part.digest);
            return Err(SssError::DigestMismatch { part: index + 1 });
        }
        shares.push(part.share()?);
    }

    let secret = combine_shares(&shares)?;
    let actual = sha256_hex(&secret);
    if &actual != expected {
        return Err(SssError::SecretDigestMismatch {
            expected: expected.clone(),
            actual,
        });
    }
    Ok(secret)
}
