//! Shamir's secret sharing over GF(2^8).
//!
//! A secret of `n` bytes becomes `parts` shares of `n + 1` bytes: byte `j` of
//! every share is a random polynomial for secret byte `j` evaluated at the
//! share's x coordinate, and the coordinate itself is stored as the last
//! byte. Any `threshold` shares recover the secret; fewer reveal nothing.
//!
//! [`part`] wraps shares into self-describing JSON records, [`files`] moves
//! whole files through that format block by block.

pub mod files;
pub mod part;

use std::collections::HashSet;
use std::io;
use std::path::PathBuf;

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use crate::crypto::polynomial::{interpolate, Polynomial};
use crate::files::FileError;

pub use files::{
    combine_files, key_part_paths, read_key_parts, split_file, write_key_parts, CombineSummary,
};
pub use part::{combine, split, Part};

/// One share: evaluated secret bytes followed by the x coordinate.
pub type Share = Vec<u8>;

#[derive(Debug, Error)]
pub enum SssError {
    #[error("threshold must be at least 2")]
    ThresholdTooSmall,
    #[error("threshold cannot be greater than parts")]
    ThresholdExceedsParts,
    #[error("secret is empty")]
    EmptySecret,
    #[error("at least 2 shares are required")]
    NotEnoughShares,
    #[error("first share must be at least 2 bytes long")]
    ShareTooShort,
    #[error("share {index} must be {expected} bytes long")]
    ShareLengthMismatch { index: usize, expected: usize },
    #[error("duplicated share is disallowed")]
    DuplicateShare,
    #[error("random generator failed: {0}")]
    Random(String),
    #[error("part {part} payload is not valid base64: {source}")]
    Payload {
        part: usize,
        source: base64::DecodeError,
    },
    #[error("secret digest mismatch in part {part}")]
    DigestMismatch { part: usize },
    #[error("recovered secret digest {actual} does not match expected {expected}")]
    SecretDigestMismatch { expected: String, actual: String },
    #[error("need {need} part files, got {have}")]
    NotEnoughParts { need: u8, have: usize },
    #[error("block mismatch: expected block {expected}, found {found}")]
    BlockMismatch { expected: u64, found: u64 },
    #[error("part files hold different numbers of blocks")]
    UnevenParts,
    #[error("recovered {found} of {expected} blocks")]
    Incomplete { expected: u64, found: u64 },
    #[error("no input files")]
    NoInputs,
    #[error("{} is not a valid sss part: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    File(#[from] FileError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Splits `secret` into `parts` shares, any `threshold` of which recover it.
pub fn split_into_shares(secret: &[u8], parts: u8, threshold: u8) -> Result<Vec<Share>, SssError> {
    if threshold < 2 {
        return Err(SssError::ThresholdTooSmall);
    }
    if threshold > parts {
        return Err(SssError::ThresholdExceedsParts);
    }
    if secret.is_empty() {
        return Err(SssError::EmptySecret);
    }

    let xs = secure_x_coordinates(parts)?;
    let secret_len = secret.len();
    let mut shares: Vec<Share> = xs
        .iter()
        .map(|&x| {
            let mut share = vec![0u8; secret_len + 1];
            share[secret_len] = x;
            share
        })
        .collect();

    let mut rng = OsRng;
    for (j, &intercept) in secret.iter().enumerate() {
        let p = Polynomial::random(intercept, threshold - 1, &mut rng)
            .map_err(|e| SssError::Random(format!("{e}")))?;
        for share in shares.iter_mut() {
            let x = share[secret_len];
            share[j] = p.evaluate(x);
        }
    }
    Ok(shares)
}

/// Recovers the secret from at least two shares of equal length.
///
/// Combining fewer shares than the original threshold yields garbage rather
/// than an error; callers verify the result against a digest.
pub fn combine_shares(shares: &[Share]) -> Result<Vec<u8>, SssError> {
    if shares.len() < 2 {
        return Err(SssError::NotEnoughShares);
    }
    let share_len = shares[0].len();
    if share_len < 2 {
        return Err(SssError::ShareTooShort);
    }
    if let Some(index) = shares.iter().position(|s| s.len() != share_len) {
        return Err(SssError::ShareLengthMismatch {
            index,
            expected: share_len,
        });
    }

    let xs: Vec<u8> = shares.iter().map(|s| s[share_len - 1]).collect();
    let distinct: HashSet<u8> = xs.iter().copied().collect();
    if distinct.len() != xs.len() {
        return Err(SssError::DuplicateShare);
    }

    let mut ys = vec![0u8; shares.len()];
    let secret = (0..share_len - 1)
        .map(|idx| {
            for (y, share) in ys.iter_mut().zip(shares) {
                *y = share[idx];
            }
            interpolate(&xs, &ys, 0)
        })
        .collect();
    Ok(secret)
}

/// Distinct, non-zero x coordinates; zero is where the secret lives.
fn secure_x_coordinates(count: u8) -> Result<Vec<u8>, SssError> {
    let mut rng = OsRng;
    let mut xs = vec![0u8; count as usize];
    rng.try_fill_bytes(&mut xs)
        .map_err(|e| SssError::Random(format!("{e}")))?;

    let mut used = HashSet::with_capacity(count as usize);
    let mut draw = [0u8; 1];
    for x in xs.iter_mut() {
        while *x == 0 || used.contains(&*x) {
            rng.try_fill_bytes(&mut draw)
                .map_err(|e| SssError::Random(format!("{e}")))?;
            *x = draw[0];
        }
        used.insert(*x);
    }
    Ok(xs)
}
