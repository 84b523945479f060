//! Chunked authenticated encryption.
//!
//! Each chunk is sealed under the nonce `prefix(7) || counter(4, BE) || last(1)`
//! with the file header as associated data, so a chunk cannot be moved,
//! dropped from the end, or paired with a different header. The AEAD is
//! either ChaCha20-Poly1305 or AES-256-GCM; both take 96-bit nonces.

use aes_gcm::Aes256Gcm;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use thiserror::Error;

use super::secrets::FileKey;

pub const NONCE_PREFIX_LEN: usize = 7;
pub const TAG_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("decryption failed for chunk {0}")]
    DecryptionFailed(u32),
    #[error("too many chunks for one stream")]
    CounterExhausted,
}

/// AEAD named in a file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    ChaCha20Poly1305,
    Aes256Gcm,
}

impl CipherMode {
    pub fn name(&self) -> &'static str {
        match self {
            CipherMode::ChaCha20Poly1305 => "chacha20poly1305",
            CipherMode::Aes256Gcm => "aes256gcm",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "chacha20poly1305" => Some(CipherMode::ChaCha20Poly1305),
            "aes256gcm" => Some(CipherMode::Aes256Gcm),
            _ => None,
        }
    }
}

enum Engine {
    ChaCha20Poly1305(ChaCha20Poly1305),
    Aes256Gcm(Box<Aes256Gcm>),
}

impl Engine {
    fn new(mode: CipherMode, key: &FileKey) -> Self {
        let key = Key::from_slice(key.as_bytes());
        match mode {
            CipherMode::ChaCha20Poly1305 => Engine::ChaCha20Poly1305(ChaCha20Poly1305::new(key)),
            CipherMode::Aes256Gcm => Engine::Aes256Gcm(Box::new(Aes256Gcm::new(key))),
        }
    }

    fn encrypt(&self, nonce: &Nonce, payload: Payload<'_, '_>) -> Result<Vec<u8>, aes_gcm::Error> {
        match self {
            Engine::ChaCha20Poly1305(cipher) => cipher.encrypt(nonce, payload),
            Engine::Aes256Gcm(cipher) => cipher.encrypt(nonce, payload),
        }
    }

    fn decrypt(&self, nonce: &Nonce, payload: Payload<'_, '_>) -> Result<Vec<u8>, aes_gcm::Error> {
        match self {
            Engine::ChaCha20Poly1305(cipher) => cipher.decrypt(nonce, payload),
            Engine::Aes256Gcm(cipher) => cipher.decrypt(nonce, payload),
        }
    }
}

struct ChunkCipher {
    engine: Engine,
    prefix: [u8; NONCE_PREFIX_LEN],
    counter: u32,
    aad: Vec<u8>,
    finished: bool,
}

impl ChunkCipher {
    fn new(mode: CipherMode, key: &FileKey, prefix: [u8; NONCE_PREFIX_LEN], aad: &[u8]) -> Self {
        Self {
            engine: Engine::new(mode, key),
            prefix,
            counter: 0,
            aad: aad.to_vec(),
            finished: false,
        }
    }

    fn nonce(&self, last: bool) -> Nonce {
        let mut nonce = Nonce::default();
        nonce[..NONCE_PREFIX_LEN].copy_from_slice(&self.prefix);
        nonce[NONCE_PREFIX_LEN..NONCE_PREFIX_LEN + 4].copy_from_slice(&self.counter.to_be_bytes());
        nonce[NONCE_PREFIX_LEN + 4] = last as u8;
        nonce
    }

    fn advance(&mut self, last: bool) -> Result<(), StreamError> {
        if last {
            self.finished = true;
            return Ok(());
        }
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or(StreamError::CounterExhausted)?;
        Ok(())
    }
}

/// Encrypting half of the stream.
pub struct ChunkSealer(ChunkCipher);

impl ChunkSealer {
    pub fn new(mode: CipherMode, key: &FileKey, prefix: [u8; NONCE_PREFIX_LEN], aad: &[u8]) -> Self {
        Self(ChunkCipher::new(mode, key, prefix, aad))
    }

    /// Seals one chunk. The final chunk must be sealed with `last = true`;
    /// nothing may follow it.
    pub fn seal(&mut self, plaintext: &[u8], last: bool) -> Result<Vec<u8>, StreamError> {
        if self.0.finished {
            return Err(StreamError::EncryptionFailed("stream already finished".to_string()));
        }
        let nonce = self.0.nonce(last);
        let sealed = self
            .0
            .engine
            .encrypt(&nonce, Payload { msg: plaintext, aad: &self.0.aad })
            .map_err(|e| StreamError::EncryptionFailed(format!("{e}")))?;
        self.0.advance(last)?;
        Ok(sealed)
    }
}

/// Decrypting half of the stream.
pub struct ChunkOpener(ChunkCipher);

impl ChunkOpener {
    pub fn new(mode: CipherMode, key: &FileKey, prefix: [u8; NONCE_PREFIX_LEN], aad: &[u8]) -> Self {
        Self(ChunkCipher::new(mode, key, prefix, aad))
    }

    pub fn open(&mut self, sealed: &[u8], last: bool) -> Result<Vec<u8>, StreamError> {
        let index = self.0.counter;
        if self.0.finished {
            return Err(StreamError::DecryptionFailed(index));
        }
        let nonce = self.0.nonce(last);
        let plaintext = self
            .0
            .engine
            .decrypt(&nonce, Payload { msg: sealed, aad: &self.0.aad })
            .map_err(|_| StreamError::DecryptionFailed(index))?;
        self.0.advance(last)?;
        Ok(plaintext)
    }

    pub fn is_finished(&self) -> bool {
        self.0.finished
    }
}
