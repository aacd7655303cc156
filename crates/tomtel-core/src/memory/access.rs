//! Bounds-checked address translation and immediate byte layouts.

use crate::Fault;

/// Width in bytes of a 32-bit immediate operand.
pub const IMMEDIATE32_BYTES: u8 = 4;

/// Translates a machine address into a buffer index.
///
/// # Errors
///
/// Returns [`Fault::MemoryOutOfBounds`] when `addr` is not below `len`.
pub fn checked_index(addr: u64, len: usize) -> Result<usize, Fault> {
    usize::try_from(addr)
        .ok()
        .filter(|index| *index < len)
        .ok_or(Fault::MemoryOutOfBounds { addr, len })
}

/// Byte order used to assemble 32-bit immediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ImmediateLayout {
    /// Four consecutive bytes, least significant first.
    #[default]
    LittleEndian,
    /// Legacy reader that takes bits 16..23 from the fourth byte instead
    /// of the third.
    ///
    /// Only differs from [`Self::LittleEndian`] when the third and fourth
    /// bytes differ.
    LegacyDuplicatedHighByte,
}

impl ImmediateLayout {
    /// Assembles four raw bytes (in memory order) into a value.
    #[must_use]
    pub const fn assemble(self, raw: [u8; IMMEDIATE32_BYTES as usize]) -> u32 {
        match self {
            Self::LittleEndian => u32::from_le_bytes(raw),
            Self::LegacyDuplicatedHighByte => u32::from_le_bytes([raw[0], raw[1], raw[3], raw[3]]),
        }
    }
}
