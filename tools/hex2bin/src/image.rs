// tools/hex2bin/src/image.rs
// Sparse memory image backed by Intel HEX records

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ihex::Record;
use tracing::{debug, trace};

use crate::error::{ConvertError, LoadError};

/// Fill value for addresses that no data record sets (erased flash).
pub const DEFAULT_PADDING: u8 = 0xFF;

/// Entry point carried by record type 03 or 05.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAddress {
    Segment { cs: u16, ip: u16 },
    Linear(u32),
}

/// Memory contents keyed by absolute address.
///
/// Only addresses written by a data record are stored. Everything else reads
/// back as the padding byte chosen by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    bytes: BTreeMap<u32, u8>,
    start: Option<StartAddress>,
}

impl Image {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `path` and decode it as Intel HEX.
    pub fn load(path: &Path) -> Result<Self, ConvertError> {
        let text = fs::read_to_string(path).map_err(|source| ConvertError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ihex(&text).map_err(|source| ConvertError::Load {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Decode Intel HEX text.
    ///
    /// Blank lines are skipped and decoding stops at the first end-of-file
    /// record; a missing end-of-file record is accepted. Data addresses are
    /// `base + record offset + index`, where `base` comes from the latest
    /// extended segment (`segment << 4`) or extended linear (`upper << 16`)
    /// record.
    pub fn from_ihex(text: &str) -> Result<Self, LoadError> {
        let mut image = Image::new();
        let mut base: u32 = 0;
        let mut data_records = 0usize;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let record_text = raw.trim();
            if record_text.is_empty() {
                continue;
            }

            let record = Record::from_record_string(record_text)
                .map_err(|source| LoadError::Record { line, source })?;

            match record {
                Record::Data { offset, value } => {
                    let first = base
                        .checked_add(u32::from(offset))
                        .ok_or(LoadError::AddressOverflow { line })?;
                    for (i, byte) in value.into_iter().enumerate() {
                        let address = u32::try_from(i)
                            .ok()
                            .and_then(|i| first.checked_add(i))
                            .ok_or(LoadError::AddressOverflow { line })?;
                        image.place(address, byte, line)?;
                    }
                    data_records += 1;
                }
                Record::EndOfFile => {
                    trace!(line, "end of file record");
                    break;
                }
                Record::ExtendedSegmentAddress(segment) => {
                    base = u32::from(segment) << 4;
                    trace!(line, base = format_args!("{base:#010x}"), "extended segment address");
                }
                Record::ExtendedLinearAddress(upper) => {
                    base = u32::from(upper) << 16;
                    trace!(line, base = format_args!("{base:#010x}"), "extended linear address");
                }
                Record::StartSegmentAddress { cs, ip } => {
                    image.set_start(StartAddress::Segment { cs, ip }, line)?;
                }
                Record::StartLinearAddress(eip) => {
                    image.set_start(StartAddress::Linear(eip), line)?;
                }
            }
        }

        debug!(
            data_records,
            bytes = image.len(),
            segments = image.segments().len(),
            "decoded Intel HEX"
        );
        Ok(image)
    }

    fn place(&mut self, address: u32, value: u8, line: usize) -> Result<(), LoadError> {
        match self.bytes.entry(address) {
            Entry::Occupied(_) => Err(LoadError::Overlap { line, address }),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    fn set_start(&mut self, start: StartAddress, line: usize) -> Result<(), LoadError> {
        if self.start.is_some() {
            return Err(LoadError::DuplicateStartAddress { line });
        }
        self.start = Some(start);
        Ok(())
    }

    /// Set a byte, returning the value it replaced.
    pub fn insert(&mut self, address: u32, value: u8) -> Option<u8> {
        self.bytes.insert(address, value)
    }

    /// Explicitly set value at `address`.
    pub fn get(&self, address: u32) -> Option<u8> {
        self.bytes.get(&address).copied()
    }

    /// Value at `address`, or `padding` when nothing sets it.
    pub fn byte_at(&self, address: u32, padding: u8) -> u8 {
        self.get(address).unwrap_or(padding)
    }

    pub fn start_address(&self) -> Option<StartAddress> {
        self.start
    }

    pub fn min_address(&self) -> Option<u32> {
        self.bytes.keys().next().copied()
    }

    pub fn max_address(&self) -> Option<u32> {
        self.bytes.keys().next_back().copied()
    }

    /// Number of explicitly set bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Contiguous runs of set bytes as `(start, length)`, lowest first.
    pub fn segments(&self) -> Vec<(u32, usize)> {
        let mut segments: Vec<(u32, usize)> = Vec::new();
        let mut next_expected: Option<u32> = None;

        for &address in self.bytes.keys() {
            match segments.last_mut() {
                Some((_, len)) if next_expected == Some(address) => *len += 1,
                _ => segments.push((address, 1)),
            }
            next_expected = address.checked_add(1);
        }
        segments
    }

    /// Flatten to a contiguous buffer covering `min_address..=max_address`.
    ///
    /// Gaps are filled with `padding`. Byte `i` of the result holds the value
    /// at `min_address + i`.
    pub fn to_binary(&self, padding: u8) -> Result<Vec<u8>, ConvertError> {
        let (Some(min), Some(max)) = (self.min_address(), self.max_address()) else {
            return Err(ConvertError::EmptyImage);
        };

        let span = (max - min) as usize + 1;
        let mut buffer = vec![padding; span];
        for (&address, &value) in &self.bytes {
            buffer[(address - min) as usize] = value;
        }
        Ok(buffer)
    }

    /// Flatten and write the result to `path`, returning the byte count.
    pub fn write_binary(&self, path: &Path, padding: u8) -> Result<usize, ConvertError> {
        let buffer = self.to_binary(padding)?;
        fs::write(path, &buffer).map_err(|source| ConvertError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(buffer.len())
    }
}
