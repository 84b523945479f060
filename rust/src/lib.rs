//! Fortify: whole-file encryption whose key is protected by Shamir's secret
//! sharing, a passphrase or an RSA key pair, plus the configuration of its handbook site.
//!
//! Key material is zeroized when dropped and plaintext never reaches disk
//! except where the caller asks for it.

pub mod config;
pub mod crypto;
pub mod execute;
pub mod files;
pub mod fortifier;
pub mod site;
pub mod sss;
pub mod version;
