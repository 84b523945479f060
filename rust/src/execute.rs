//! Running a program that is stored fortified.
//!
//! The program is decrypted into a private temporary file, started with the
//! caller's arguments and stdio, and the plaintext copy is removed as soon
//! as the cleanup delay has passed or the program has exited, whichever
//! comes first. SIGINT, SIGTERM or SIGHUP sent to fortify removes the copy
//! and stops the program before fortify returns.

use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempPath;
use thiserror::Error;

use crate::fortifier::{Fortifier, FortifyError, Header};

/// Key list mounted into containers by the deployment tooling.
pub const DEFAULT_KEY_LIST: &str = "/dev/shm/keys/k_fortify";
pub const KEY_LIST_ENV: &str = "FORTIFY_KEY_LIST";

const TEMP_PREFIX: &str = ".oO0";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static SIGNAL_HANDLER: OnceLock<Result<(), String>> = OnceLock::new();

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("failed to decrypt program: {0}")]
    Decrypt(#[from] FortifyError),
    #[error("failed to stage program: {0}")]
    Stage(std::io::Error),
    #[error("failed to run program: {0}")]
    Spawn(std::io::Error),
    #[error("cannot install signal handler: {0}")]
    Signals(String),
    #[error("interrupted; program stopped and decrypted copy removed")]
    Interrupted,
}

/// Delay before the decrypted copy is deleted; never below one second.
pub fn cleanup_delay(seconds: u64) -> Duration {
    Duration::from_secs(seconds.max(1))
}

pub fn in_container() -> bool {
    Path::new("/.dockerenv").exists()
}

/// Where extra key paths come from: `$FORTIFY_KEY_LIST`, or the default
/// list when running inside a container.
pub fn key_list_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(KEY_LIST_ENV) {
        return Some(PathBuf::from(path));
    }
    in_container().then(|| PathBuf::from(DEFAULT_KEY_LIST))
}

/// Parses a key list: paths separated by commas and/or newlines. A missing
/// or unreadable list contributes nothing.
pub fn read_key_list(path: &Path) -> Vec<PathBuf> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            log::debug!("no key list at {}: {err}", path.display());
            return Vec::new();
        }
    };
    text.lines()
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Decrypts the program behind `header`/`reader` and runs it with `args`.
pub fn run<R: Read>(
    fortifier: &Fortifier,
    header: &Header,
    reader: &mut R,
    args: &[String],
    delay: Duration,
) -> Result<ExitStatus, ExecuteError> {
    let stop = watch_signals()?;
    stop.store(false, Ordering::SeqCst);
    run_in(&std::env::temp_dir(), fortifier, header, reader, args, delay, stop)
}

/// Installs the process-wide handler once; it only raises a flag that the
/// supervising loop acts on.
fn watch_signals() -> Result<&'static AtomicBool, ExecuteError> {
    SIGNAL_HANDLER
        .get_or_init(|| {
            ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::SeqCst)).map_err(|e| e.to_string())
        })
        .clone()
        .map_err(ExecuteError::Signals)?;
    Ok(&INTERRUPTED)
}

fn run_in<R: Read>(
    dir: &Path,
    fortifier: &Fortifier,
    header: &Header,
    reader: &mut R,
    args: &[String],
    delay: Duration,
    stop: &AtomicBool,
) -> Result<ExitStatus, ExecuteError> {
    let staged = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)
        .map_err(ExecuteError::Stage)?;
    {
        let mut writer = BufWriter::new(staged.as_file());
        fortifier.decrypt(header, reader, &mut writer)?;
        writer.flush().map_err(ExecuteError::Stage)?;
    }
    permit(staged.path()).map_err(ExecuteError::Stage)?;
    // Closing the handle first; executing a file open for writing fails
    // with ETXTBSY on Linux.
    let program = staged.into_temp_path();
    log::debug!("staged program at {}", program.display());

    let child = Command::new(&program)
        .args(args)
        .spawn()
        .map_err(ExecuteError::Spawn)?;
    supervise(child, program, delay, stop)
}

fn supervise(
    mut child: Child,
    program: TempPath,
    delay: Duration,
    stop: &AtomicBool,
) -> Result<ExitStatus, ExecuteError> {
    let deadline = Instant::now() + delay;
    let mut program = Some(program);
    loop {
        if stop.load(Ordering::SeqCst) {
            if let Some(program) = program.take() {
                remove_staged(program);
            }
            log::warn!("interrupted, stopping program {}", child.id());
            if let Err(err) = child.kill() {
                log::debug!("kill: {err}");
            }
            child.wait().map_err(ExecuteError::Spawn)?;
            return Err(ExecuteError::Interrupted);
        }
        if let Some(status) = child.try_wait().map_err(ExecuteError::Spawn)? {
            if let Some(program) = program.take() {
                remove_staged(program);
            }
            return Ok(status);
        }
        if Instant::now() >= deadline {
            if let Some(program) = program.take() {
                remove_staged(program);
            }
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn remove_staged(program: TempPath) {
    if let Err(err) = program.close() {
        log::warn!("failed to remove decrypted program: {err}");
    }
}

#[cfg(unix)]
fn permit(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn permit(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
