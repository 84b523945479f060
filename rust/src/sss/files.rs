//! Splitting whole files into part files and putting them back together.
//!
//! A part file is a sequence of JSON `Part` records, one per block of the
//! input, separated by blank lines. Block `k` of every part file belongs to
//! block `k` of the original, so the combiner walks all files in lockstep.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Read, Write};
use std::path::{Path, PathBuf};

use super::part::{combine, part_file_name, split, Part};
use super::SssError;
use crate::files::{check_output, open_input, open_output, read_block};

/// Plaintext bytes per block when splitting a file.
pub const FILE_BLOCK_SIZE: usize = 32 * 1024;

/// Result of [`combine_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineSummary {
    pub blocks: u64,
    pub bytes: u64,
}

/// Splits `input` into `<prefix><n>of<parts>.json` files and returns their
/// paths in part order.
pub fn split_file(
    input: &Path,
    parts: u8,
    threshold: u8,
    prefix: &str,
    truncate: bool,
) -> Result<Vec<PathBuf>, SssError> {
    let file = open_input(input)?;
    let size = file.metadata()?.len();
    if size == 0 {
        return Err(SssError::EmptySecret);
    }
    let blocks = size.div_ceil(FILE_BLOCK_SIZE as u64);
    let width = blocks.to_string().len();

    let paths: Vec<PathBuf> = (1..=parts)
        .map(|part| PathBuf::from(part_file_name(prefix, part, parts)))
        .collect();
    let mut writers = paths
        .iter()
        .map(|path| open_output(path, truncate).map(BufWriter::new))
        .collect::<Result<Vec<_>, _>>()?;

    let mut reader = BufReader::new(file);
    let mut buffer = vec![0u8; FILE_BLOCK_SIZE];
    let mut block = 0u64;
    loop {
        let read = read_block(&mut reader, &mut buffer)?;
        if read == 0 {
            break;
        }
        block += 1;
        let records = split(&buffer[..read], parts, threshold)?;
        for (writer, mut record) in writers.iter_mut().zip(records) {
            record.block = block;
            record.blocks = blocks;
            if block > 1 {
                writer.write_all(b"\n\n")?;
            }
            serde_json::to_writer(&mut *writer, &record).map_err(std::io::Error::from)?;
        }
        log::info!("block {block:>width$}/{blocks} OK");
        if read < FILE_BLOCK_SIZE {
            break;
        }
    }
    for mut writer in writers {
        writer.flush()?;
    }
    Ok(paths)
}

/// Recovers the original file from part files. With `output` unset the parts
/// are only verified.
pub fn combine_files(
    inputs: &[PathBuf],
    output: Option<&Path>,
    truncate: bool,
) -> Result<CombineSummary, SssError> {
    if inputs.is_empty() {
        return Err(SssError::NoInputs);
    }
    let mut readers = inputs
        .iter()
        .map(|path| -> Result<RecordReader, SssError> {
            Ok(RecordReader::new(path.clone(), open_input(path)?))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let mut output = match output {
        Some(path) => Some((path, BufWriter::new(open_output(path, truncate)?))),
        None => None,
    };

    let mut summary = CombineSummary { blocks: 0, bytes: 0 };
    let mut expected_blocks = 0u64;
    loop {
        let mut records = Vec::with_capacity(readers.len());
        for reader in readers.iter_mut() {
            if let Some(record) = reader.next_record()? {
                records.push(record);
            }
        }
        if records.is_empty() {
            break;
        }
        if records.len() != readers.len() {
            return Err(SssError::UnevenParts);
        }

        let first = &records[0];
        if records.len() < first.threshold as usize {
            return Err(SssError::NotEnoughParts {
                need: first.threshold,
                have: records.len(),
            });
        }
        let expected = summary.blocks + 1;
        if let Some(stray) = records.iter().find(|r| r.block != expected) {
            return Err(SssError::BlockMismatch {
                expected,
                found: stray.block,
            });
        }
        expected_blocks = first.blocks;

        let secret = combine(&records)?;
        if let Some((_, writer)) = output.as_mut() {
            writer.write_all(&secret)?;
        }
        summary.blocks += 1;
        summary.bytes += secret.len() as u64;

        let width = expected_blocks.to_string().len();
        match output.as_ref() {
            Some((path, _)) => log::info!(
                "block {expected:>width$}/{expected_blocks} OK -- recovered {:6} bytes into {}",
                secret.len(),
                path.display()
            ),
            None => log::info!(
                "block {expected:>width$}/{expected_blocks} OK -- recovered {:6} bytes",
                secret.len()
            ),
        }
    }

    if summary.blocks != expected_blocks {
        return Err(SssError::Incomplete {
            expected: expected_blocks,
            found: summary.blocks,
        });
    }
    if let Some((_, mut writer)) = output {
        writer.flush()?;
    }
    Ok(summary)
}

/// Paths `write_key_parts` would use for `parts`.
pub fn key_part_paths(parts: &[Part], prefix: &str) -> Vec<PathBuf> {
    parts.iter().map(|part| PathBuf::from(part.file_name(prefix))).collect()
}

/// Writes one pretty-printed key file per part and returns their paths.
///
/// Every part is staged next to its destination first; existing key files
/// are only replaced once all parts were written.
pub fn write_key_parts(parts: &[Part], prefix: &str, truncate: bool) -> Result<Vec<PathBuf>, SssError> {
    let paths = key_part_paths(parts, prefix);
    for path in &paths {
        check_output(path, truncate)?;
    }
    let mut staged = Vec::with_capacity(parts.len());
    for (part, path) in parts.iter().zip(&paths) {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = tempfile::Builder::new().prefix(".key").tempfile_in(dir)?;
        serde_json::to_writer_pretty(&mut file, part).map_err(std::io::Error::from)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        staged.push(file);
    }
    for (file, path) in staged.into_iter().zip(&paths) {
        file.persist(path).map_err(|e| SssError::Io(e.error))?;
    }
    Ok(paths)
}

/// Reads single-record key files, one `Part` per file.
pub fn read_key_parts(paths: &[PathBuf]) -> Result<Vec<Part>, SssError> {
    paths
        .iter()
        .map(|path| -> Result<Part, SssError> {
            let mut text = String::new();
            open_input(path)?.read_to_string(&mut text)?;
            serde_json::from_str(&text).map_err(|source| SssError::Json {
                path: path.clone(),
                source,
            })
        })
        .collect()
}

struct RecordReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
}

impl RecordReader {
    fn new(path: PathBuf, file: File) -> Self {
        Self {
            path,
            lines: BufReader::new(file).lines(),
        }
    }

    /// Next record, skipping the blank separator lines.
    fn next_record(&mut self) -> Result<Option<Part>, SssError> {
        for line in self.lines.by_ref() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            return serde_json::from_str(&line)
                .map(Some)
                .map_err(|source| SssError::Json {
                    path: self.path.clone(),
                    source,
                });
        }
        Ok(None)
    }
}
