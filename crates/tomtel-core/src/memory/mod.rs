//! Flat memory image shared by code and data.

/// Bounds-checked access helpers and immediate layouts.
pub mod access;

pub use access::{checked_index, ImmediateLayout, IMMEDIATE32_BYTES};

use crate::Fault;

/// Single mutable byte buffer holding both the program and its workspace.
///
/// Addresses are zero-based offsets; every access outside the buffer is a
/// [`Fault::MemoryOutOfBounds`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Memory {
    /// Wraps an initial memory image.
    #[must_use]
    pub fn new(image: impl Into<Box<[u8]>>) -> Self {
        Self {
            bytes: image.into(),
        }
    }

    /// Allocates a zeroed image of `len` bytes.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self::new(vec![0; len])
    }

    /// Image length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for an empty image.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrows the raw image.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutably borrows the raw image.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Consumes the wrapper and returns the image.
    #[must_use]
    pub fn into_bytes(self) -> Box<[u8]> {
        self.bytes
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::MemoryOutOfBounds`] when `addr` is outside the image.
    pub fn read_u8(&self, addr: u64) -> Result<u8, Fault> {
        let index = checked_index(addr, self.bytes.len())?;
        Ok(self.bytes[index])
    }

    /// Writes one byte.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::MemoryOutOfBounds`] when `addr` is outside the image.
    pub fn write_u8(&mut self, addr: u64, value: u8) -> Result<(), Fault> {
        let index = checked_index(addr, self.bytes.len())?;
        self.bytes[index] = value;
        Ok(())
    }

    /// Reads a 32-bit immediate starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::MemoryOutOfBounds`] when any of the four bytes is
    /// outside the image.
    pub fn read_u32(&self, addr: u32, layout: ImmediateLayout) -> Result<u32, Fault> {
        let base = u64::from(addr);
        let last = base + u64::from(IMMEDIATE32_BYTES) - 1;
        checked_index(last, self.bytes.len())?;

        let mut raw = [0_u8; IMMEDIATE32_BYTES as usize];
        for (offset, byte) in (0_u64..).zip(raw.iter_mut()) {
            *byte = self.read_u8(base + offset)?;
        }
        Ok(layout.assemble(raw))
    }
}

impl From<Box<[u8]>> for Memory {
    fn from(image: Box<[u8]>) -> Self {
        Self::new(image)
    }
}

impl From<Vec<u8>> for Memory {
    fn from(image: Vec<u8>) -> Self {
        Self::new(image)
    }
}

impl From<&[u8]> for Memory {
    fn from(image: &[u8]) -> Self {
        Self::new(image)
    }
}
