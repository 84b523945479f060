//! Whole-file encryption.
//!
//! A fortified file starts with a small JSON header naming the cipher mode,
//! the kind of key that unlocks it, and the per-file salt and nonce prefix.
//! The body is the plaintext in fixed-size chunks sealed by
//! [`crate::crypto::stream`]. The data key never touches the file in the
//! clear: it lives in Shamir key files, is derived from a passphrase, or is
//! stored wrapped under an RSA public key.

pub mod layout;

use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::crypto::secrets::{generate_salt, FileKey, KeyError, KEY_LEN};
use crate::crypto::stream::{ChunkOpener, ChunkSealer, StreamError, NONCE_PREFIX_LEN, TAG_SIZE};
use crate::crypto::wrap::{RsaKey, WrapError};
use crate::files::{check_output, open_input, open_output, read_block, FileError};
use crate::sss::{self, Part, SssError};

pub use crate::crypto::stream::CipherMode;
pub use layout::{read_header, Header};

/// Plaintext bytes per sealed chunk unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: u32 = 64 * 1024;
/// Largest chunk a header may announce; bounds the read buffer before the
/// header is authenticated.
pub const MAX_CHUNK_SIZE: u32 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FortifyError {
    #[error("not a fortified file")]
    BadMagic,
    #[error("unsupported fortified file format {0}")]
    UnsupportedVersion(u8),
    #[error("invalid header: {0}")]
    Header(String),
    #[error("unknown cipher mode name: {0}")]
    UnknownMode(String),
    #[error("file is locked with a {file} key, but a {supplied} key was supplied")]
    KeyKindMismatch {
        file: CipherKeyKind,
        supplied: CipherKeyKind,
    },
    #[error("header carries no wrapped key")]
    MissingWrappedKey,
    #[error("fortified file is truncated")]
    Truncated,
    #[error("unexpected data after the final chunk")]
    TrailingData,
    #[error("chunk length out of range")]
    ChunkTooLarge,
    #[error("chunk size must be between 1 and {max} bytes")]
    InvalidChunkSize { max: u32 },
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Wrap(#[from] WrapError),
    #[error(transparent)]
    Sss(#[from] SssError),
    #[error(transparent)]
    File(#[from] FileError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// What unlocks a fortified file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CipherKeyKind {
    /// Random data key split into Shamir key files.
    Sss,
    /// Data key derived from a passphrase with Argon2id.
    Passphrase,
    /// Random data key stored in the header, wrapped with RSA-OAEP.
    Rsa,
}

impl fmt::Display for CipherKeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CipherKeyKind::Sss => "sss",
            CipherKeyKind::Passphrase => "passphrase",
            CipherKeyKind::Rsa => "rsa",
        })
    }
}

/// Header of a fortified file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub version: u8,
    pub mode: String,
    pub key: CipherKeyKind,
    pub chunk_size: u32,
    /// Standard base64 without padding.
    pub salt: String,
    pub nonce_prefix: String,
    /// RSA-OAEP wrapped data key, standard base64 without padding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapped_key: Option<String>,
    pub created: DateTime<Utc>,
}

impl Metadata {
    pub fn new(
        mode: CipherMode,
        key: CipherKeyKind,
        chunk_size: u32,
        salt: &[u8],
        nonce_prefix: [u8; NONCE_PREFIX_LEN],
    ) -> Self {
        Self {
            version: layout::FORMAT_VERSION,
            mode: mode.name().to_string(),
            key,
            chunk_size,
            salt: STANDARD_NO_PAD.encode(salt),
            nonce_prefix: STANDARD_NO_PAD.encode(nonce_prefix),
            wrapped_key: None,
            created: Utc::now(),
        }
    }

    pub fn cipher_mode(&self) -> Result<CipherMode, FortifyError> {
        CipherMode::from_name(&self.mode).ok_or_else(|| FortifyError::UnknownMode(self.mode.clone()))
    }

    /// Rejects modes and chunk sizes this build cannot safely read.
    pub fn check(&self) -> Result<CipherMode, FortifyError> {
        let mode = self.cipher_mode()?;
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(FortifyError::Header(format!(
                "chunk size {} outside 1..={MAX_CHUNK_SIZE}",
                self.chunk_size
            )));
        }
        Ok(mode)
    }

    pub fn wrapped_key_bytes(&self) -> Result<Option<Vec<u8>>, FortifyError> {
        self.wrapped_key
            .as_ref()
            .map(|wrapped| {
                STANDARD_NO_PAD
                    .decode(wrapped.as_bytes())
                    .map_err(|e| FortifyError::Header(format!("wrapped key: {e}")))
            })
            .transpose()
    }

    pub fn salt_bytes(&self) -> Result<Vec<u8>, FortifyError> {
        STANDARD_NO_PAD
            .decode(self.salt.as_bytes())
            .map_err(|e| FortifyError::Header(format!("salt: {e}")))
    }

    pub fn nonce_prefix_bytes(&self) -> Result<[u8; NONCE_PREFIX_LEN], FortifyError> {
        let decoded = STANDARD_NO_PAD
            .decode(self.nonce_prefix.as_bytes())
            .map_err(|e| FortifyError::Header(format!("nonce prefix: {e}")))?;
        decoded
            .try_into()
            .map_err(|_| FortifyError::Header("nonce prefix length mismatch".to_string()))
    }
}

enum KeySource {
    Key(FileKey),
    Passphrase(Zeroizing<String>),
    Rsa(RsaKey),
}

/// Encrypts and decrypts fortified streams with one key source.
pub struct Fortifier {
    source: KeySource,
    mode: CipherMode,
    chunk_size: u32,
}

impl Fortifier {
    fn new(source: KeySource) -> Self {
        Self {
            source,
            mode: CipherMode::ChaCha20Poly1305,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Uses an explicit data key; files are tagged as `sss`.
    pub fn with_key(key: FileKey) -> Self {
        Self::new(KeySource::Key(key))
    }

    /// Recovers the data key from Shamir key parts.
    pub fn with_sss_parts(parts: &[Part]) -> Result<Self, FortifyError> {
        let secret = Zeroizing::new(sss::combine(parts)?);
        Ok(Self::with_key(FileKey::from_bytes(&secret)?))
    }

    pub fn with_passphrase(passphrase: impl Into<String>) -> Self {
        Self::new(KeySource::Passphrase(Zeroizing::new(passphrase.into())))
    }

    /// A public key is enough to encrypt; decrypting needs the private key.
    pub fn with_rsa_key(key: RsaKey) -> Self {
        Self::new(KeySource::Rsa(key))
    }

    /// AEAD used by `encrypt`; `decrypt` follows the header instead.
    pub fn with_mode(mut self, mode: CipherMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u32) -> Result<Self, FortifyError> {
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(FortifyError::InvalidChunkSize { max: MAX_CHUNK_SIZE });
        }
        self.chunk_size = chunk_size;
        Ok(self)
    }

    pub fn key_kind(&self) -> CipherKeyKind {
        match self.source {
            KeySource::Key(_) => CipherKeyKind::Sss,
            KeySource::Passphrase(_) => CipherKeyKind::Passphrase,
            KeySource::Rsa(_) => CipherKeyKind::Rsa,
        }
    }

    /// Data key for a new file, plus its wrapped form when the header must
    /// carry it.
    fn sealing_key(&self, salt: &[u8]) -> Result<(FileKey, Option<Vec<u8>>), FortifyError> {
        match &self.source {
            KeySource::Key(key) => Ok((FileKey::from_bytes(key.as_bytes())?, None)),
            KeySource::Passphrase(passphrase) => {
                Ok((FileKey::derive_from_passphrase(passphrase, salt)?, None))
            }
            KeySource::Rsa(rsa) => {
                let key = FileKey::generate()?;
                let wrapped = rsa.wrap(&key)?;
                Ok((key, Some(wrapped)))
            }
        }
    }

    fn opening_key(&self, metadata: &Metadata, salt: &[u8]) -> Result<FileKey, FortifyError> {
        match &self.source {
            KeySource::Key(key) => Ok(FileKey::from_bytes(key.as_bytes())?),
            KeySource::Passphrase(passphrase) => {
                Ok(FileKey::derive_from_passphrase(passphrase, salt)?)
            }
            KeySource::Rsa(rsa) => {
                let wrapped = metadata
                    .wrapped_key_bytes()?
                    .ok_or(FortifyError::MissingWrappedKey)?;
                Ok(rsa.unwrap_key(&wrapped)?)
            }
        }
    }

    /// Writes a header and the sealed body of `reader` into `writer`.
    /// Returns the number of plaintext bytes consumed.
    pub fn encrypt<R: Read, W: Write>(&self, reader: &mut R, writer: &mut W) -> Result<u64, FortifyError> {
        let salt = generate_salt()?;
        let mut prefix = [0u8; NONCE_PREFIX_LEN];
        OsRng
            .try_fill_bytes(&mut prefix)
            .map_err(|e| KeyError::Random(format!("{e}")))?;

        let (data_key, wrapped) = self.sealing_key(&salt)?;
        let mut metadata = Metadata::new(self.mode, self.key_kind(), self.chunk_size, &salt, prefix);
        metadata.wrapped_key = wrapped.map(|w| STANDARD_NO_PAD.encode(w));
        let raw = layout::write_header(writer, &metadata)?;
        let cipher_key = data_key.cipher_key(&salt)?;
        let mut sealer = ChunkSealer::new(self.mode, &cipher_key, prefix, &raw);

        let size = self.chunk_size as usize;
        let mut current = Zeroizing::new(vec![0u8; size]);
        let mut next = Zeroizing::new(vec![0u8; size]);
        let mut current_len = read_block(reader, &mut current)?;
        let mut total = 0u64;
        let mut chunks = 0u64;
        loop {
            let (next_len, last) = if current_len < size {
                (0, true)
            } else {
                let n = read_block(reader, &mut next)?;
                (n, n == 0)
            };
            let sealed = sealer.seal(&current[..current_len], last)?;
            layout::write_chunk(writer, &sealed, last)?;
            total += current_len as u64;
            chunks += 1;
            if last {
                break;
            }
            std::mem::swap(&mut current, &mut next);
            current_len = next_len;
        }
        writer.flush()?;
        log::debug!("sealed {total} bytes in {chunks} chunks");
        Ok(total)
    }

    /// Decrypts the body that follows an already-read `header`.
    pub fn decrypt<R: Read, W: Write>(
        &self,
        header: &Header,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<u64, FortifyError> {
        let metadata = &header.metadata;
        let mode = metadata.check()?;
        if metadata.key != self.key_kind() {
            return Err(FortifyError::KeyKindMismatch {
                file: metadata.key,
                supplied: self.key_kind(),
            });
        }
        let salt = metadata.salt_bytes()?;
        let prefix = metadata.nonce_prefix_bytes()?;
        let cipher_key = self.opening_key(metadata, &salt)?.cipher_key(&salt)?;
        let mut opener = ChunkOpener::new(mode, &cipher_key, prefix, &header.raw);

        let max_len = metadata.chunk_size as usize + TAG_SIZE;
        let mut total = 0u64;
        while !opener.is_finished() {
            let (sealed, last) = layout::read_chunk(reader, max_len)?;
            let plaintext = Zeroizing::new(opener.open(&sealed, last)?);
            writer.write_all(&plaintext)?;
            total += plaintext.len() as u64;
        }
        let mut extra = [0u8; 1];
        if reader.read(&mut extra)? != 0 {
            return Err(FortifyError::TrailingData);
        }
        writer.flush()?;
        Ok(total)
    }

    /// Reads the header from `reader`, then decrypts the rest.
    pub fn decrypt_stream<R: Read, W: Write>(&self, reader: &mut R, writer: &mut W) -> Result<u64, FortifyError> {
        let header = read_header(reader)?;
        self.decrypt(&header, reader, writer)
    }
}

/// Generates a fresh data key and splits it into `parts` Shamir key parts.
pub fn new_sss_key(parts: u8, threshold: u8) -> Result<(FileKey, Vec<Part>), FortifyError> {
    let key = FileKey::generate()?;
    let key_parts = sss::split(key.as_bytes(), parts, threshold)?;
    debug_assert_eq!(key.as_bytes().len(), KEY_LEN);
    Ok((key, key_parts))
}

/// Encrypts `input` into `output`. A partially written `output` is removed
/// when encryption fails.
pub fn encrypt_file(
    fortifier: &Fortifier,
    input: &Path,
    output: &Path,
    truncate: bool,
) -> Result<u64, FortifyError> {
    let mut reader = std::io::BufReader::new(open_input(input)?);
    let mut writer = std::io::BufWriter::new(open_output(output, truncate)?);
    match fortifier.encrypt(&mut reader, &mut writer) {
        Ok(total) => Ok(total),
        Err(err) => {
            drop(writer);
            remove_partial(output);
            Err(err)
        }
    }
}

/// Encrypts `input` with a key whose Shamir parts are written to
/// `<key_prefix><n>of<parts>.json`.
///
/// Key files are checked up front and written last, so a failed run never
/// replaces the key files of an earlier one. Returns the plaintext size and
/// the key file paths.
pub fn encrypt_file_with_key_parts(
    fortifier: &Fortifier,
    key_parts: &[Part],
    key_prefix: &str,
    input: &Path,
    output: &Path,
    truncate: bool,
) -> Result<(u64, Vec<PathBuf>), FortifyError> {
    for path in sss::key_part_paths(key_parts, key_prefix) {
        check_output(&path, truncate)?;
    }
    let total = encrypt_file(fortifier, input, output, truncate)?;
    match sss::write_key_parts(key_parts, key_prefix, truncate) {
        Ok(paths) => Ok((total, paths)),
        Err(err) => {
            // Without its key parts the output can never be opened.
            remove_partial(output);
            Err(err.into())
        }
    }
}

fn remove_partial(output: &Path) {
    if let Err(err) = std::fs::remove_file(output) {
        log::warn!("cannot remove partial output {}: {err}", output.display());
    }
}

/// Decrypts `input` into `output`, given the header already read from it.
/// Nothing is left behind in `output` when decryption fails.
pub fn decrypt_file<R: Read>(
    fortifier: &Fortifier,
    header: &Header,
    reader: &mut R,
    output: &Path,
    truncate: bool,
) -> Result<u64, FortifyError> {
    let file = open_output(output, truncate)?;
    let mut writer = std::io::BufWriter::new(file);
    match fortifier.decrypt(header, reader, &mut writer) {
        Ok(total) => Ok(total),
        Err(err) => {
            drop(writer);
            remove_partial(output);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(fortifier: &Fortifier, data: &[u8]) -> Vec<u8> {
        let mut sealed = Vec::new();
        let consumed = fortifier
            .encrypt(&mut Cursor::new(data), &mut sealed)
            .expect("encrypt");
        assert_eq!(consumed, data.len() as u64);

        let mut plain = Vec::new();
        fortifier
            .decrypt_stream(&mut Cursor::new(&sealed), &mut plain)
            .expect("decrypt");
        plain
    }

    #[test]
    fn sss_key_unlocks_what_it_sealed() {
        let (key, parts) = new_sss_key(3, 2).expect("key");
        let sealer = Fortifier::with_key(key).with_chunk_size(16).expect("chunk size");
        let data: Vec<u8> = (0..100u8).collect();
        let mut sealed = Vec::new();
        sealer.encrypt(&mut Cursor::new(&data), &mut sealed).expect("encrypt");

        let opener = Fortifier::with_sss_parts(&parts[1..]).expect("combine");
        let mut plain = Vec::new();
        opener.decrypt_stream(&mut Cursor::new(&sealed), &mut plain).expect("decrypt");
        assert_eq!(plain, data);
    }

    #[test]
    fn handles_empty_and_chunk_aligned_inputs() {
        let fortifier = Fortifier::with_key(FileKey::generate().expect("rng"))
            .with_chunk_size(8)
            .expect("chunk size");
        assert!(roundtrip(&fortifier, b"").is_empty());
        assert_eq!(roundtrip(&fortifier, &[3u8; 16]), vec![3u8; 16]);
        assert_eq!(roundtrip(&fortifier, &[4u8; 17]), vec![4u8; 17]);
    }

    #[test]
    fn passphrase_files_record_their_kind() {
        let fortifier = Fortifier::with_passphrase("hunter2");
        let mut sealed = Vec::new();
        fortifier.encrypt(&mut Cursor::new(b"payload"), &mut sealed).expect("encrypt");

        let header = read_header(&mut Cursor::new(&sealed)).expect("header");
        assert_eq!(header.metadata.key, CipherKeyKind::Passphrase);
        assert_eq!(header.metadata.mode, "chacha20poly1305");

        let wrong = Fortifier::with_passphrase("hunter3");
        let err = wrong.decrypt_stream(&mut Cursor::new(&sealed), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, FortifyError::Stream(StreamError::DecryptionFailed(0))));

        let sss = Fortifier::with_key(FileKey::generate().expect("rng"));
        let err = sss.decrypt_stream(&mut Cursor::new(&sealed), &mut Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            FortifyError::KeyKindMismatch {
                file: CipherKeyKind::Passphrase,
                supplied: CipherKeyKind::Sss,
            }
        ));
    }

    #[test]
    fn passphrase_unlocks_what_it_sealed() {
        let sealer = Fortifier::with_passphrase("correct horse").with_chunk_size(5).expect("chunk size");
        let mut sealed = Vec::new();
        sealer
            .encrypt(&mut Cursor::new(b"spans several chunks"), &mut sealed)
            .expect("encrypt");

        let opener = Fortifier::with_passphrase(String::from("correct horse"));
        let mut plain = Vec::new();
        let total = opener.decrypt_stream(&mut Cursor::new(&sealed), &mut plain).expect("decrypt");
        assert_eq!(plain, b"spans several chunks");
        assert_eq!(total, plain.len() as u64);
    }

    #[test]
    fn aes_gcm_files_name_their_mode() {
        let key = || FileKey::from_bytes(&[7u8; 32]).expect("key");
        let sealer = Fortifier::with_key(key()).with_mode(CipherMode::Aes256Gcm);
        let mut sealed = Vec::new();
        sealer.encrypt(&mut Cursor::new(b"gcm body"), &mut sealed).expect("encrypt");

        let header = read_header(&mut Cursor::new(&sealed)).expect("header");
        assert_eq!(header.metadata.mode, "aes256gcm");

        // The opener's own mode is irrelevant; the header decides.
        let mut plain = Vec::new();
        Fortifier::with_key(key())
            .decrypt_stream(&mut Cursor::new(&sealed), &mut plain)
            .expect("decrypt");
        assert_eq!(plain, b"gcm body");
    }

    #[test]
    fn rsa_files_carry_a_wrapped_key() {
        use crate::crypto::wrap::tests::test_key;

        let private = test_key();
        let public = RsaKey::Public(private.to_public_key());
        let sealer = Fortifier::with_rsa_key(public);
        let mut sealed = Vec::new();
        sealer.encrypt(&mut Cursor::new(b"wrapped"), &mut sealed).expect("encrypt");

        let header = read_header(&mut Cursor::new(&sealed)).expect("header");
        assert_eq!(header.metadata.key, CipherKeyKind::Rsa);
        assert!(header.metadata.wrapped_key.is_some());

        let err = sealer.decrypt_stream(&mut Cursor::new(&sealed), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, FortifyError::Wrap(WrapError::PrivateKeyRequired)));

        let opener = Fortifier::with_rsa_key(RsaKey::Private(Box::new(private)));
        let mut plain = Vec::new();
        opener.decrypt_stream(&mut Cursor::new(&sealed), &mut plain).expect("decrypt");
        assert_eq!(plain, b"wrapped");
    }

    #[test]
    fn failed_encrypt_keeps_earlier_key_parts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let prefix = format!("{}/key", dir.path().display());
        let input = dir.path().join("a.txt");
        let sealed = dir.path().join("a.ftfy");
        std::fs::write(&input, b"first file").expect("seed");

        let (key, parts) = new_sss_key(2, 2).expect("key");
        let (_, paths) =
            encrypt_file_with_key_parts(&Fortifier::with_key(key), &parts, &prefix, &input, &sealed, false)
                .expect("encrypt");
        let before: Vec<Vec<u8>> = paths.iter().map(|p| std::fs::read(p).expect("read")).collect();

        // Missing input, truncation allowed: nothing may be replaced.
        let (key, parts) = new_sss_key(2, 2).expect("key");
        let other = dir.path().join("b.ftfy");
        let err = encrypt_file_with_key_parts(
            &Fortifier::with_key(key),
            &parts,
            &prefix,
            &dir.path().join("typo.txt"),
            &other,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, FortifyError::File(FileError::Input { .. })));
        assert!(!other.exists());
        let after: Vec<Vec<u8>> = paths.iter().map(|p| std::fs::read(p).expect("read")).collect();
        assert_eq!(before, after);

        let opener = Fortifier::with_sss_parts(&sss::read_key_parts(&paths).expect("parts")).expect("combine");
        let mut plain = Vec::new();
        opener
            .decrypt_stream(&mut std::fs::File::open(&sealed).expect("open"), &mut plain)
            .expect("decrypt");
        assert_eq!(plain, b"first file");
    }

    #[test]
    fn existing_key_parts_stop_encryption_before_output_is_touched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let prefix = format!("{}/key", dir.path().display());
        let input = dir.path().join("a.txt");
        std::fs::write(&input, b"payload").expect("seed");

        let (key, parts) = new_sss_key(3, 2).expect("key");
        std::fs::write(dir.path().join("key2of3.json"), b"{}").expect("occupy");
        let output = dir.path().join("a.ftfy");
        let err = encrypt_file_with_key_parts(&Fortifier::with_key(key), &parts, &prefix, &input, &output, false)
            .unwrap_err();
        assert!(matches!(err, FortifyError::File(FileError::OutputNotEmpty(_))));
        assert!(!output.exists());
        assert!(!dir.path().join("key1of3.json").exists());
    }

    #[test]
    fn detects_truncation_and_trailing_data() {
        let fortifier = Fortifier::with_key(FileKey::generate().expect("rng"))
            .with_chunk_size(4)
            .expect("chunk size");
        let mut sealed = Vec::new();
        fortifier
            .encrypt(&mut Cursor::new(b"twelve bytes"), &mut sealed)
            .expect("encrypt");

        // Cut the final chunk off entirely, length prefix included.
        let final_chunk = 4 + 4 + TAG_SIZE;
        let cut = &sealed[..sealed.len() - final_chunk];
        let err = fortifier.decrypt_stream(&mut Cursor::new(cut), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, FortifyError::Truncated));

        let mut padded = sealed.clone();
        padded.push(0);
        let err = fortifier.decrypt_stream(&mut Cursor::new(&padded), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, FortifyError::TrailingData));
    }

    #[test]
    fn tampered_header_fails_authentication() {
        let fortifier = Fortifier::with_key(FileKey::generate().expect("rng"));
        let mut sealed = Vec::new();
        fortifier.encrypt(&mut Cursor::new(b"payload"), &mut sealed).expect("encrypt");

        let mut header = read_header(&mut Cursor::new(&sealed)).expect("header");
        let body_start = 9 + header.raw.len();
        header.raw.push(b' ');
        let err = fortifier
            .decrypt(&header, &mut Cursor::new(&sealed[body_start..]), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, FortifyError::Stream(StreamError::DecryptionFailed(0))));
    }

    #[test]
    fn rejects_out_of_range_chunk_sizes() {
        assert!(matches!(
            Fortifier::with_passphrase("x").with_chunk_size(0),
            Err(FortifyError::InvalidChunkSize { .. })
        ));
        assert!(matches!(
            Fortifier::with_passphrase("x").with_chunk_size(MAX_CHUNK_SIZE + 1),
            Err(FortifyError::InvalidChunkSize { max: MAX_CHUNK_SIZE })
        ));
        assert!(Fortifier::with_passphrase("x").with_chunk_size(MAX_CHUNK_SIZE).is_ok());
    }

    #[test]
    fn file_helpers_remove_partial_output_on_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("plain.txt");
        let sealed = dir.path().join("plain.txt.ftfy");
        let restored = dir.path().join("restored.txt");
        std::fs::write(&input, b"file contents").expect("seed");

        let fortifier = Fortifier::with_key(FileKey::from_bytes(&[5u8; 32]).expect("key"));
        encrypt_file(&fortifier, &input, &sealed, false).expect("encrypt");

        let mut reader = std::io::BufReader::new(std::fs::File::open(&sealed).expect("open"));
        let header = read_header(&mut reader).expect("header");
        decrypt_file(&fortifier, &header, &mut reader, &restored, false).expect("decrypt");
        assert_eq!(std::fs::read(&restored).expect("read"), b"file contents");

        let other = Fortifier::with_key(FileKey::from_bytes(&[6u8; 32]).expect("key"));
        let failed = dir.path().join("failed.txt");
        let mut reader = std::io::BufReader::new(std::fs::File::open(&sealed).expect("open"));
        let header = read_header(&mut reader).expect("header");
        assert!(decrypt_file(&other, &header, &mut reader, &failed, false).is_err());
        assert!(!failed.exists());
    }
}
