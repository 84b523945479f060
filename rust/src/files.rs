//! Opening input and output files with the overwrite rules every command
//! shares: outputs are created if missing and must be empty unless the
//! caller asked to truncate them.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("cannot open input file {}: {source}", .path.display())]
    Input { path: PathBuf, source: io::Error },
    #[error("cannot open output file {}: {source}", .path.display())]
    Output { path: PathBuf, source: io::Error },
    #[error("output file {} is not empty; pass --truncate to overwrite it", .0.display())]
    OutputNotEmpty(PathBuf),
}

pub fn open_input(path: impl AsRef<Path>) -> Result<File, FileError> {
    let path = path.as_ref();
    File::open(path).map_err(|source| FileError::Input {
        path: path.to_path_buf(),
        source,
    })
}

/// Opens `path` for writing. An existing non-empty file is only accepted
/// when `truncate` is set, in which case it is emptied.
pub fn open_output(path: impl AsRef<Path>, truncate: bool) -> Result<File, FileError> {
    let path = path.as_ref();
    let output_err = |source| FileError::Output {
        path: path.to_path_buf(),
        source,
    };
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(output_err)?;
    let len = file.metadata().map_err(output_err)?.len();
    if len > 0 {
        if !truncate {
            return Err(FileError::OutputNotEmpty(path.to_path_buf()));
        }
        file.set_len(0).map_err(output_err)?;
        log::info!("truncated output file {}", path.display());
    }
    Ok(file)
}

/// Fails when `path` holds data that `truncate` does not allow replacing.
/// Nothing is created or modified.
pub fn check_output(path: impl AsRef<Path>, truncate: bool) -> Result<(), FileError> {
    let path = path.as_ref();
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 && !truncate => Err(FileError::OutputNotEmpty(path.to_path_buf())),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(FileError::Output {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Fills `buffer` as far as the input allows; returns the bytes read.
pub fn read_block(reader: &mut impl Read, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
