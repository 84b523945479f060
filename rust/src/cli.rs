//! Command-line interface definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use fortify::fortifier::{CipherKeyKind, CipherMode};

pub const DEFAULT_PASSPHRASE_ENV: &str = "FORTIFY_PASSPHRASE";

/// Enhance file security through encryption and Shamir's secret sharing
#[derive(Parser, Debug)]
#[command(name = "fortify", version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// More log output; repeat for debug logs (RUST_LOG overrides)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which key protects a newly encrypted file.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Random key split into Shamir key files
    Sss,
    /// Key derived from a passphrase read from the environment
    Passphrase,
    /// Random key wrapped with an RSA public key (RSA-OAEP)
    Rsa,
}

impl From<KeyKind> for CipherKeyKind {
    fn from(kind: KeyKind) -> Self {
        match kind {
            KeyKind::Sss => CipherKeyKind::Sss,
            KeyKind::Passphrase => CipherKeyKind::Passphrase,
            KeyKind::Rsa => CipherKeyKind::Rsa,
        }
    }
}

/// Authenticated cipher for the file body.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Chacha20poly1305,
    #[value(alias = "aes-gcm")]
    Aes256gcm,
}

impl From<Mode> for CipherMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Chacha20poly1305 => CipherMode::ChaCha20Poly1305,
            Mode::Aes256gcm => CipherMode::Aes256Gcm,
        }
    }
}

/// Shared output arguments
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Overwrite a non-empty output file
    #[arg(long)]
    pub truncate: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PassphraseArgs {
    /// Environment variable holding the passphrase
    #[arg(long = "passphrase-env", value_name = "VAR", default_value = DEFAULT_PASSPHRASE_ENV)]
    pub var: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encrypt a file
    Encrypt {
        /// File to encrypt
        #[arg(short, long)]
        input: PathBuf,

        /// Fortified output file
        #[arg(short, long)]
        output: PathBuf,

        /// How the file key is protected
        #[arg(short, long, value_enum, default_value_t = KeyKind::Sss)]
        key: KeyKind,

        /// Cipher for the file body
        #[arg(short, long, value_enum, default_value_t = Mode::Chacha20poly1305)]
        mode: Mode,

        /// PEM encoded RSA key (public or private) for `--key rsa`
        #[arg(long, value_name = "PEM", required_if_eq("key", "rsa"))]
        rsa_key: Option<PathBuf>,

        /// Number of key parts to create
        #[arg(short = 'n', long, default_value_t = 2)]
        parts: u8,

        /// Key parts needed to decrypt
        #[arg(short, long, default_value_t = 2)]
        threshold: u8,

        /// Prefix of the key part file names
        #[arg(short = 'p', long, default_value = "key")]
        key_prefix: String,

        /// Plaintext bytes per sealed chunk
        #[arg(long, default_value_t = fortify::fortifier::DEFAULT_CHUNK_SIZE)]
        chunk_size: u32,

        #[command(flatten)]
        passphrase: PassphraseArgs,

        #[command(flatten)]
        output_args: OutputArgs,
    },

    /// Decrypt a fortified file
    Decrypt {
        /// Fortified input file
        #[arg(short, long)]
        input: PathBuf,

        /// Restored output file
        #[arg(short, long)]
        output: PathBuf,

        /// Key part files, or the RSA private key for rsa files
        keys: Vec<PathBuf>,

        #[command(flatten)]
        passphrase: PassphraseArgs,

        #[command(flatten)]
        output_args: OutputArgs,
    },

    /// Run a program stored in a fortified file
    Execute {
        /// Fortified program
        #[arg(short, long)]
        input: PathBuf,

        /// Seconds before the decrypted copy is deleted (at least 1)
        #[arg(long, default_value_t = 5)]
        cleanup_delay: u64,

        /// Key part files, or the RSA private key for rsa files
        keys: Vec<PathBuf>,

        #[command(flatten)]
        passphrase: PassphraseArgs,

        /// Arguments passed to the program
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Shamir's secret sharing
    Sss {
        #[command(subcommand)]
        command: SssCommands,
    },

    /// Documentation site configuration
    Docs {
        #[command(subcommand)]
        command: DocsCommands,
    },

    /// Print version of the command
    Version {
        /// Print detailed build information
        #[arg(short, long)]
        detail: bool,

        /// Print JSON encoded build information
        #[arg(short, long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum SssCommands {
    /// Split a file into part files
    Split {
        /// File to split
        #[arg(short, long)]
        input: PathBuf,

        /// Number of part files
        #[arg(short = 'n', long)]
        parts: u8,

        /// Part files needed to recover the input
        #[arg(short, long)]
        threshold: u8,

        /// Prefix of the part file names
        #[arg(short = 'p', long, default_value = "")]
        prefix: String,

        #[command(flatten)]
        output_args: OutputArgs,
    },

    /// Recover a file from part files
    Combine {
        /// Recovered file; parts are only verified when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Part files
        #[arg(required = true)]
        parts: Vec<PathBuf>,

        #[command(flatten)]
        output_args: OutputArgs,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteVariant {
    Minimal,
    Full,
}

impl From<SiteVariant> for fortify::site::Variant {
    fn from(variant: SiteVariant) -> Self {
        match variant {
            SiteVariant::Minimal => fortify::site::Variant::Minimal,
            SiteVariant::Full => fortify::site::Variant::Full,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum DocsCommands {
    /// Print a built-in site configuration as JSON
    Show {
        #[arg(long, value_enum, default_value_t = SiteVariant::Full)]
        variant: SiteVariant,
    },

    /// Check a site configuration against a directory of pages
    Check {
        /// Configuration file to check instead of a built-in variant
        #[arg(short, long, conflicts_with = "variant")]
        config: Option<PathBuf>,

        #[arg(long, value_enum)]
        variant: Option<SiteVariant>,

        /// Directory holding the markdown pages
        #[arg(long)]
        root: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_encrypt_defaults() {
        let cli = Cli::parse_from(["fortify", "encrypt", "-i", "a.txt", "-o", "a.ftfy"]);
        match cli.command {
            Commands::Encrypt { key, mode, rsa_key, parts, threshold, key_prefix, passphrase, output_args, .. } => {
                assert_eq!(key, KeyKind::Sss);
                assert_eq!(mode, Mode::Chacha20poly1305);
                assert!(rsa_key.is_none());
                assert_eq!((parts, threshold), (2, 2));
                assert_eq!(key_prefix, "key");
                assert_eq!(passphrase.var, DEFAULT_PASSPHRASE_ENV);
                assert!(!output_args.truncate);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rsa_encryption_needs_a_key_file() {
        let missing = Cli::try_parse_from(["fortify", "encrypt", "-i", "a", "-o", "b", "--key", "rsa"]);
        assert!(missing.is_err());

        let cli = Cli::parse_from([
            "fortify", "encrypt", "-i", "a", "-o", "b", "--key", "rsa", "--rsa-key", "pub.pem", "--mode", "aes-gcm",
        ]);
        match cli.command {
            Commands::Encrypt { key, mode, rsa_key, .. } => {
                assert_eq!(CipherKeyKind::from(key), CipherKeyKind::Rsa);
                assert_eq!(CipherMode::from(mode), CipherMode::Aes256Gcm);
                assert_eq!(rsa_key, Some(PathBuf::from("pub.pem")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn execute_separates_keys_from_program_args() {
        let cli = Cli::parse_from([
            "fortify", "-vv", "execute", "-i", "tool.ftfy", "k1.json", "k2.json", "--", "--flag", "x",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Execute { keys, args, cleanup_delay, .. } => {
                assert_eq!(keys, vec![PathBuf::from("k1.json"), PathBuf::from("k2.json")]);
                assert_eq!(args, vec!["--flag".to_string(), "x".to_string()]);
                assert_eq!(cleanup_delay, 5);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn docs_check_rejects_config_with_variant() {
        let result = Cli::try_parse_from([
            "fortify", "docs", "check", "--config", "site.json", "--variant", "full", "--root", "docs",
        ]);
        assert!(result.is_err());
    }
}
