//! Cryptographic building blocks: field arithmetic for secret sharing,
//! digests and key derivation, key material, RSA key wrapping, and the
//! chunked file cipher.

pub mod gf256;
pub mod integrity;
pub mod polynomial;
pub mod secrets;
pub mod stream;
pub mod wrap;
