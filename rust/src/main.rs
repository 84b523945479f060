use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use fortify::config::load_config;
use fortify::crypto::wrap::RsaKey;
use fortify::execute::{self, ExecuteError};
use fortify::files::open_input;
use fortify::fortifier::{self, read_header, CipherKeyKind, CipherMode, Fortifier, Header};
use fortify::site::{self, Variant};
use fortify::sss;
use fortify::version::{version_string, VersionDetail};

mod cli;

use cli::{Cli, Commands, DocsCommands, PassphraseArgs, SiteVariant, SssCommands};

/// Exit status after an interrupt, as shells report SIGINT.
const INTERRUPTED_EXIT: i32 = 130;

fn main() {
    match main_result() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:?}");
            std::process::exit(1);
        }
    }
}

fn main_result() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Encrypt {
            input,
            output,
            key,
            mode,
            rsa_key,
            parts,
            threshold,
            key_prefix,
            chunk_size,
            passphrase,
            output_args,
        } => {
            let mode = CipherMode::from(mode);
            let truncate = output_args.truncate;
            let bytes = match CipherKeyKind::from(key) {
                CipherKeyKind::Sss => {
                    let (file_key, key_parts) = fortifier::new_sss_key(parts, threshold)?;
                    let fortifier = Fortifier::with_key(file_key).with_mode(mode).with_chunk_size(chunk_size)?;
                    let (bytes, written) = fortifier::encrypt_file_with_key_parts(
                        &fortifier, &key_parts, &key_prefix, &input, &output, truncate,
                    )
                    .with_context(|| format!("encrypting {}", input.display()))?;
                    for path in &written {
                        println!("{}", path.display());
                    }
                    bytes
                }
                kind => {
                    let fortifier = match kind {
                        CipherKeyKind::Rsa => {
                            let Some(path) = rsa_key.as_deref() else {
                                bail!("--key rsa needs --rsa-key");
                            };
                            Fortifier::with_rsa_key(
                                RsaKey::load(path).with_context(|| format!("loading {}", path.display()))?,
                            )
                        }
                        _ => Fortifier::with_passphrase(read_passphrase(&passphrase)?),
                    }
                    .with_mode(mode)
                    .with_chunk_size(chunk_size)?;
                    fortifier::encrypt_file(&fortifier, &input, &output, truncate)
                        .with_context(|| format!("encrypting {}", input.display()))?
                }
            };
            log::info!("encrypted {bytes} bytes into {} ({})", output.display(), mode.name());
            Ok(0)
        }

        Commands::Decrypt {
            input,
            output,
            keys,
            passphrase,
            output_args,
        } => {
            let (mut reader, header) = open_fortified(&input)?;
            let fortifier = fortifier_for(&header, &keys, &passphrase)?;
            let bytes = fortifier::decrypt_file(&fortifier, &header, &mut reader, &output, output_args.truncate)
                .with_context(|| format!("decrypting {}", input.display()))?;
            log::info!("decrypted {bytes} bytes into {}", output.display());
            Ok(0)
        }

        Commands::Execute {
            input,
            cleanup_delay,
            keys,
            passphrase,
            args,
        } => {
            let (mut reader, header) = open_fortified(&input)?;
            let mut all_keys = match execute::key_list_path() {
                Some(list) => execute::read_key_list(&list),
                None => Vec::new(),
            };
            all_keys.extend(keys);
            let fortifier = fortifier_for(&header, &all_keys, &passphrase)?;
            let status = match execute::run(
                &fortifier,
                &header,
                &mut reader,
                &args,
                execute::cleanup_delay(cleanup_delay),
            ) {
                Ok(status) => status,
                Err(ExecuteError::Interrupted) => {
                    eprintln!("{} interrupted", input.display());
                    return Ok(INTERRUPTED_EXIT);
                }
                Err(err) => return Err(err).with_context(|| format!("executing {}", input.display())),
            };
            if !status.success() {
                log::warn!("program exited with {status}");
            }
            Ok(status.code().unwrap_or(1))
        }

        Commands::Sss { command } => run_sss(command),

        Commands::Docs { command } => run_docs(command),

        Commands::Version { detail, json } => {
            if json {
                println!("{}", VersionDetail::current().to_json()?);
            } else if detail {
                print!("{}", VersionDetail::current().to_text());
            } else {
                println!("{}", version_string());
            }
            Ok(0)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn open_fortified(input: &Path) -> Result<(BufReader<File>, Header)> {
    let mut reader = BufReader::new(open_input(input)?);
    let header = read_header(&mut reader).with_context(|| format!("reading header of {}", input.display()))?;
    log::debug!(
        "{}: mode {} key {} chunk size {}",
        input.display(),
        header.metadata.mode,
        header.metadata.key,
        header.metadata.chunk_size
    );
    Ok((reader, header))
}

/// Builds the decrypting side from whatever unlocks `header`.
fn fortifier_for(header: &Header, keys: &[PathBuf], passphrase: &PassphraseArgs) -> Result<Fortifier> {
    match header.metadata.key {
        CipherKeyKind::Sss => {
            if keys.is_empty() {
                bail!("this file is locked with key parts; pass the key part files");
            }
            let parts = sss::read_key_parts(keys).context("reading key parts")?;
            Ok(Fortifier::with_sss_parts(&parts).context("recovering file key")?)
        }
        CipherKeyKind::Passphrase => Ok(Fortifier::with_passphrase(read_passphrase(passphrase)?)),
        CipherKeyKind::Rsa => {
            // Keys named on the command line come after any key list entries.
            let Some(path) = keys.last() else {
                bail!("this file is locked with an RSA key; pass the private key file");
            };
            let key = RsaKey::load(path).with_context(|| format!("loading {}", path.display()))?;
            Ok(Fortifier::with_rsa_key(key))
        }
    }
}

fn read_passphrase(args: &PassphraseArgs) -> Result<String> {
    let passphrase =
        std::env::var(&args.var).with_context(|| format!("passphrase variable {} is not set", args.var))?;
    if passphrase.is_empty() {
        bail!("passphrase variable {} is empty", args.var);
    }
    Ok(passphrase)
}

fn run_sss(command: SssCommands) -> Result<i32> {
    match command {
        SssCommands::Split {
            input,
            parts,
            threshold,
            prefix,
            output_args,
        } => {
            let written = sss::split_file(&input, parts, threshold, &prefix, output_args.truncate)
                .with_context(|| format!("splitting {}", input.display()))?;
            for path in written {
                println!("{}", path.display());
            }
        }
        SssCommands::Combine {
            output,
            parts,
            output_args,
        } => {
            let summary = sss::combine_files(&parts, output.as_deref(), output_args.truncate)
                .context("combining part files")?;
            match output {
                Some(path) => log::info!("recovered {} bytes into {}", summary.bytes, path.display()),
                None => println!("verified {} blocks ({} bytes)", summary.blocks, summary.bytes),
            }
        }
    }
    Ok(0)
}

fn run_docs(command: DocsCommands) -> Result<i32> {
    match command {
        DocsCommands::Show { variant } => {
            println!("{}", Variant::from(variant).config().to_json_pretty()?);
            Ok(0)
        }
        DocsCommands::Check { config, variant, root } => {
            let site_config = match config {
                Some(path) => load_config(&path).with_context(|| format!("loading {}", path.display()))?,
                None => Variant::from(variant.unwrap_or(SiteVariant::Full)).config(),
            };
            let report = site::validate(&site_config, &root);
            if report.is_ok() {
                println!("{report}");
                Ok(0)
            } else {
                eprint!("{report}");
                Ok(1)
            }
        }
    }
}
