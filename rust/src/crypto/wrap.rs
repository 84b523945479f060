//! RSA-OAEP (SHA-256) wrapping of a file's data key.
//!
//! Encrypting needs only the public half; either half can be supplied, since a
//! private key carries its public key. Unwrapping needs the private key.

use std::path::Path;

use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

use super::secrets::{FileKey, KeyError};

#[derive(Debug, Error)]
pub enum WrapError {
    #[error("cannot read RSA key {}: {source}", .path.display())]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("not a PEM encoded RSA key (PKCS#1 or PKCS#8)")]
    NotAKey,
    #[error("an RSA private key is required to unwrap the file key")]
    PrivateKeyRequired,
    #[error("rsa: {0}")]
    Rsa(#[from] rsa::Error),
    #[error(transparent)]
    Key(#[from] KeyError),
}

/// One half of an RSA key pair as loaded from a PEM file.
pub enum RsaKey {
    Private(Box<RsaPrivateKey>),
    Public(RsaPublicKey),
}

impl std::fmt::Debug for RsaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RsaKey::Private(_) => f.write_str("RsaKey::Private(<redacted>)"),
            RsaKey::Public(_) => f.write_str("RsaKey::Public"),
        }
    }
}

impl RsaKey {
    /// Accepts PKCS#8 or PKCS#1 PEM, private or public.
    pub fn from_pem(pem: &str) -> Result<Self, WrapError> {
        let pem = pem.trim();
        if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(pem) {
            return Ok(RsaKey::Private(Box::new(key)));
        }
        if let Ok(key) = RsaPrivateKey::from_pkcs1_pem(pem) {
            return Ok(RsaKey::Private(Box::new(key)));
        }
        if let Ok(key) = RsaPublicKey::from_public_key_pem(pem) {
            return Ok(RsaKey::Public(key));
        }
        RsaPublicKey::from_pkcs1_pem(pem)
            .map(RsaKey::Public)
            .map_err(|_| WrapError::NotAKey)
    }

    pub fn load(path: &Path) -> Result<Self, WrapError> {
        let pem = Zeroizing::new(std::fs::read_to_string(path).map_err(|source| WrapError::Read {
            path: path.to_path_buf(),
            source,
        })?);
        Self::from_pem(&pem)
    }

    pub fn public_key(&self) -> RsaPublicKey {
        match self {
            RsaKey::Private(key) => key.to_public_key(),
            RsaKey::Public(key) => key.clone(),
        }
    }

    pub fn wrap(&self, key: &FileKey) -> Result<Vec<u8>, WrapError> {
        Ok(self
            .public_key()
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key.as_bytes())?)
    }

    pub fn unwrap_key(&self, wrapped: &[u8]) -> Result<FileKey, WrapError> {
        let RsaKey::Private(private) = self else {
            return Err(WrapError::PrivateKeyRequired);
        };
        let bytes = Zeroizing::new(private.decrypt(Oaep::new::<Sha256>(), wrapped)?);
        Ok(FileKey::from_bytes(&bytes)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};

    /// Small modulus keeps key generation quick in debug builds; OAEP-SHA256
    /// still fits a 32 byte key.
    pub(crate) fn test_key() -> RsaPrivateKey {
        RsaPrivateKey::new(&mut OsRng, 1024).expect("rsa keygen")
    }

    #[test]
    fn wraps_with_public_and_unwraps_with_private() {
        let private = test_key();
        let public_pem = private.to_public_key().to_public_key_pem(LineEnding::LF).expect("pem");
        let private_pem = private.to_pkcs8_pem(LineEnding::LF).expect("pem");

        let public = RsaKey::from_pem(&public_pem).expect("public");
        let private = RsaKey::from_pem(&private_pem).expect("private");
        assert!(matches!(public, RsaKey::Public(_)));
        assert!(matches!(private, RsaKey::Private(_)));

        let key = FileKey::from_bytes(&[3u8; 32]).expect("key");
        let wrapped = public.wrap(&key).expect("wrap");
        assert_ne!(&wrapped[..32], key.as_bytes());
        assert_eq!(private.unwrap_key(&wrapped).expect("unwrap").as_bytes(), key.as_bytes());
        assert!(matches!(public.unwrap_key(&wrapped), Err(WrapError::PrivateKeyRequired)));
    }

    #[test]
    fn loads_keys_from_disk_and_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("id.pem");
        std::fs::write(&path, test_key().to_pkcs8_pem(LineEnding::LF).expect("pem").as_bytes())
            .expect("seed");
        assert!(matches!(RsaKey::load(&path).expect("load"), RsaKey::Private(_)));

        assert!(matches!(RsaKey::from_pem("hello"), Err(WrapError::NotAKey)));
        assert!(matches!(
            RsaKey::load(&dir.path().join("absent.pem")),
            Err(WrapError::Read { .. })
        ));
    }

    #[test]
    fn foreign_private_key_cannot_unwrap() {
        let ours = RsaKey::Private(Box::new(test_key()));
        let theirs = RsaKey::Private(Box::new(test_key()));
        let wrapped = ours.wrap(&FileKey::from_bytes(&[1u8; 32]).expect("key")).expect("wrap");
        assert!(matches!(theirs.unwrap_key(&wrapped), Err(WrapError::Rsa(_))));
    }
}
