// tools/hex2bin/src/error.rs
// Error types for loading, validating and flattening bootloader images

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while decoding Intel HEX text into an [`Image`](crate::image::Image).
///
/// Line numbers are 1-based and count blank lines.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("line {line}: invalid record")]
    Record {
        line: usize,
        #[source]
        source: ihex::ReaderError,
    },
    #[error("line {line}: address {address:#010x} is already set")]
    Overlap { line: usize, address: u32 },
    #[error("line {line}: data record runs past the 32-bit address space")]
    AddressOverflow { line: usize },
    #[error("line {line}: start address record given more than once")]
    DuplicateStartAddress { line: usize },
}

impl LoadError {
    pub fn line(&self) -> usize {
        match self {
            LoadError::Record { line, .. }
            | LoadError::Overlap { line, .. }
            | LoadError::AddressOverflow { line }
            | LoadError::DuplicateStartAddress { line } => *line,
        }
    }
}

/// Content rules a bootloader image has to satisfy before it is released.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The bootloader may not start with byte value {value:#04x}.")]
    LegacyMagic { value: u8 },
}

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed Intel HEX in {}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("image contains no data bytes, nothing to flatten")]
    EmptyImage,
}
