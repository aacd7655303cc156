use thiserror::Error;

use crate::state::RegisterFamily;

/// Fault classes used for host-side reporting and policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Byte at `pc` matched neither the move family nor the fixed opcode table.
    UnsupportedOpcode,
    /// Memory address or register selector outside its valid range.
    OutOfBounds,
}

/// Host-level guard conditions that abort a run.
///
/// The emulated machine has no trap mechanism of its own; every fault is
/// fatal for the current run and latches the machine until reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Fault {
    /// Opcode byte does not resolve to any instruction.
    #[error("unsupported opcode {byte:#04x} at address {addr:#010x}")]
    UnsupportedOpcode {
        /// Address of the offending byte.
        addr: u32,
        /// Raw opcode byte.
        byte: u8,
    },
    /// Fetch, immediate read, or `(ptr+c)` access outside the memory image.
    #[error("memory access at {addr:#x} outside {len}-byte image")]
    MemoryOutOfBounds {
        /// Requested address, widened so `ptr + c` overflow stays visible.
        addr: u64,
        /// Length of the memory image.
        len: usize,
    },
    /// Register selector does not name a register of its family.
    #[error("register selector {selector} is invalid for {family} registers")]
    RegisterOutOfBounds {
        /// Family the selector was resolved against.
        family: RegisterFamily,
        /// Raw 3-bit selector value.
        selector: u8,
    },
}

impl Fault {
    /// Returns the reporting class for this fault.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::UnsupportedOpcode { .. } => FaultClass::UnsupportedOpcode,
            Self::MemoryOutOfBounds { .. } | Self::RegisterOutOfBounds { .. } => {
                FaultClass::OutOfBounds
            }
        }
    }
}
