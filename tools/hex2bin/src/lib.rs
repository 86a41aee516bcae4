//! Bootloader HEX-to-binary conversion.
//!
//! Loads the Intel HEX image produced by the bootloader build, refuses images
//! that start with the pre-v3 presence marker, and flattens the rest into the
//! raw binary that gets flashed.

pub mod convert;
pub mod error;
pub mod image;
pub mod validate;

pub use convert::{convert_file, convert_image, ConvertOptions, ConvertSummary};
pub use error::{ConvertError, LoadError, ValidationError};
pub use image::{Image, StartAddress, DEFAULT_PADDING};
pub use validate::{check_bootloader_start, LEGACY_BOOTLOADER_MAGIC};
