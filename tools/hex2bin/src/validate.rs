// tools/hex2bin/src/validate.rs
// Start-of-image rule for bootloader v3 and later

use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::image::Image;

/// Marker older bootloaders (before v3) kept at their first byte.
///
/// From v3 on, the marker and version number sit at the end of flash
/// (`0x1ffe..=0x1fff`) and the image starts with an `rjmp` vector table. An
/// `rjmp` whose low byte is `0x8a` in the first slot would make older
/// applications detect a pre-v3 bootloader, so such a layout is refused.
pub const LEGACY_BOOTLOADER_MAGIC: u8 = 0x8a;

/// Address the bootloader image is linked at.
pub const BOOTLOADER_START: u32 = 0x0000;

/// Reject an image whose first byte is [`LEGACY_BOOTLOADER_MAGIC`].
///
/// An unset start address reads as `padding`, the same byte the flattened
/// output would carry there.
pub fn check_bootloader_start(image: &Image, padding: u8) -> Result<(), ValidationError> {
    let value = match image.get(BOOTLOADER_START) {
        Some(value) => value,
        None => {
            warn!(
                padding = format_args!("{padding:#04x}"),
                "bootloader start address is not set, checking the padding byte"
            );
            padding
        }
    };

    if value == LEGACY_BOOTLOADER_MAGIC {
        return Err(ValidationError::LegacyMagic { value });
    }

    debug!(first_byte = format_args!("{value:#04x}"), "bootloader start accepted");
    Ok(())
}
