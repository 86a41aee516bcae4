// tools/hex2bin/src/convert.rs
// Load → check → write pipeline for the bootloader build step

use std::path::Path;

use tracing::{debug, info};

use crate::error::ConvertError;
use crate::image::{Image, DEFAULT_PADDING};
use crate::validate::check_bootloader_start;

/// Where the bootloader build leaves its HEX image.
pub const DEFAULT_INPUT: &str = "build/bootloader.hex";
/// Where the flattened image is written.
pub const DEFAULT_OUTPUT: &str = "build/bootloader.bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Fill byte for unset addresses, also used for an unset start byte.
    pub padding: u8,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
        }
    }
}

/// What a successful conversion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    pub data_bytes: usize,
    pub output_len: usize,
    pub min_address: u32,
    pub max_address: u32,
    pub segments: usize,
}

/// Validate `image` and flatten it.
///
/// Nothing is produced when the start byte is refused.
pub fn convert_image(
    image: &Image,
    options: &ConvertOptions,
) -> Result<(Vec<u8>, ConvertSummary), ConvertError> {
    check_bootloader_start(image, options.padding)?;

    let binary = image.to_binary(options.padding)?;
    let (Some(min_address), Some(max_address)) = (image.min_address(), image.max_address()) else {
        return Err(ConvertError::EmptyImage);
    };

    let summary = ConvertSummary {
        data_bytes: image.len(),
        output_len: binary.len(),
        min_address,
        max_address,
        segments: image.segments().len(),
    };
    Ok((binary, summary))
}

/// Convert the HEX file at `input` into a raw binary at `output`.
///
/// The output file is only touched once the image has loaded and passed
/// validation.
pub fn convert_file(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<ConvertSummary, ConvertError> {
    debug!(input = %input.display(), "loading bootloader image");
    let image = Image::load(input)?;

    let (binary, summary) = convert_image(&image, options)?;

    std::fs::write(output, &binary).map_err(|source| ConvertError::Write {
        path: output.to_path_buf(),
        source,
    })?;

    info!(
        output = %output.display(),
        bytes = summary.output_len,
        data_bytes = summary.data_bytes,
        segments = summary.segments,
        "wrote {:#010x}..={:#010x}",
        summary.min_address,
        summary.max_address
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use ihex::Record;
    use std::fs;
    use tempfile::tempdir;

    fn write_hex(path: &Path, records: &[Record]) {
        let text = ihex::create_object_file_representation(records).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_convert_file_writes_flattened_image() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bootloader.hex");
        let output = dir.path().join("bootloader.bin");
        write_hex(
            &input,
            &[
                Record::Data {
                    offset: 0x0000,
                    value: vec![0x00, 0x01],
                },
                Record::Data {
                    offset: 0x0004,
                    value: vec![0x04],
                },
                Record::EndOfFile,
            ],
        );

        let summary = convert_file(&input, &output, &ConvertOptions::default()).unwrap();

        assert_eq!(
            fs::read(&output).unwrap(),
            vec![0x00, 0x01, 0xFF, 0xFF, 0x04]
        );
        assert_eq!(
            summary,
            ConvertSummary {
                data_bytes: 3,
                output_len: 5,
                min_address: 0,
                max_address: 4,
                segments: 2,
            }
        );
    }

    #[test]
    fn test_convert_file_refuses_legacy_magic_without_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bootloader.hex");
        let output = dir.path().join("bootloader.bin");
        write_hex(
            &input,
            &[
                Record::Data {
                    offset: 0x0000,
                    value: vec![0x8a, 0xC0],
                },
                Record::EndOfFile,
            ],
        );

        let err = convert_file(&input, &output, &ConvertOptions::default()).unwrap_err();

        assert!(matches!(
            err,
            ConvertError::Validation(ValidationError::LegacyMagic { value: 0x8a })
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_convert_file_leaves_stale_output_alone_on_refusal() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bootloader.hex");
        let output = dir.path().join("bootloader.bin");
        fs::write(&output, b"previous").unwrap();
        write_hex(
            &input,
            &[
                Record::Data {
                    offset: 0x0000,
                    value: vec![0x8a],
                },
                Record::EndOfFile,
            ],
        );

        assert!(convert_file(&input, &output, &ConvertOptions::default()).is_err());
        assert_eq!(fs::read(&output).unwrap(), b"previous");
    }

    #[test]
    fn test_convert_file_reports_missing_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("missing.hex");
        let output = dir.path().join("out.bin");

        let err = convert_file(&input, &output, &ConvertOptions::default()).unwrap_err();

        assert!(matches!(err, ConvertError::Read { ref path, .. } if path == &input));
        assert!(!output.exists());
    }

    #[test]
    fn test_empty_image_passes_check_but_is_not_written() {
        let image = Image::from_ihex(":00000001FF\n").unwrap();

        let err = convert_image(&image, &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::EmptyImage));
    }

    #[test]
    fn test_custom_padding_fills_gaps() {
        let mut image = Image::new();
        image.insert(0, 0x0C);
        image.insert(3, 0x94);
        let options = ConvertOptions { padding: 0x00 };

        let (binary, _) = convert_image(&image, &options).unwrap();
        assert_eq!(binary, vec![0x0C, 0x00, 0x00, 0x94]);
    }
}
