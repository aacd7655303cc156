use std::fmt;

use crate::Fault;

/// Number of registers in each family.
pub const REGISTER_COUNT: usize = 6;

/// Selector value naming the `(ptr+c)` pseudo-register in the 8-bit family.
pub const PTR_C_SELECTOR: u8 = 7;

/// Register family a selector is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegisterFamily {
    /// `a..f` plus the `(ptr+c)` pseudo-register.
    Byte,
    /// `la..pc`.
    Wide,
}

impl fmt::Display for RegisterFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte => f.write_str("8-bit"),
            Self::Wide => f.write_str("32-bit"),
        }
    }
}

/// 8-bit register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Reg8 {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
    E = 4,
    F = 5,
}

impl Reg8 {
    /// Ordered list of all 8-bit registers.
    pub const ALL: [Self; REGISTER_COUNT] = [Self::A, Self::B, Self::C, Self::D, Self::E, Self::F];

    /// Returns the array index for this register (`0..=5`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the 3-bit selector encoding this register (`1..=6`).
    #[must_use]
    pub const fn selector(self) -> u8 {
        self as u8 + 1
    }

    /// Assembly name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
            Self::C => "c",
            Self::D => "d",
            Self::E => "e",
            Self::F => "f",
        }
    }
}

/// 32-bit register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Reg32 {
    La = 0,
    Lb = 1,
    Lc = 2,
    Ld = 3,
    Ptr = 4,
    Pc = 5,
}

impl Reg32 {
    /// Ordered list of all 32-bit registers.
    pub const ALL: [Self; REGISTER_COUNT] = [
        Self::La,
        Self::Lb,
        Self::Lc,
        Self::Ld,
        Self::Ptr,
        Self::Pc,
    ];

    /// Returns the array index for this register (`0..=5`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the 3-bit selector encoding this register (`1..=6`).
    #[must_use]
    pub const fn selector(self) -> u8 {
        self as u8 + 1
    }

    /// Assembly name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::La => "la",
            Self::Lb => "lb",
            Self::Lc => "lc",
            Self::Ld => "ld",
            Self::Ptr => "ptr",
            Self::Pc => "pc",
        }
    }

    /// Resolves a 3-bit selector from a 32-bit move.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::RegisterOutOfBounds`] for selectors 0 and 7, which
    /// name no 32-bit register.
    pub const fn from_selector(selector: u8) -> Result<Self, Fault> {
        match selector {
            1 => Ok(Self::La),
            2 => Ok(Self::Lb),
            3 => Ok(Self::Lc),
            4 => Ok(Self::Ld),
            5 => Ok(Self::Ptr),
            6 => Ok(Self::Pc),
            _ => Err(Fault::RegisterOutOfBounds {
                family: RegisterFamily::Wide,
                selector,
            }),
        }
    }
}

impl fmt::Display for Reg32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operand of an 8-bit move: a register or the `(ptr+c)` pseudo-register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Operand8 {
    /// Plain 8-bit register.
    Reg(Reg8),
    /// `Memory[ptr + c]`.
    PtrC,
}

impl Operand8 {
    /// Resolves a 3-bit selector from an 8-bit move.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::RegisterOutOfBounds`] for selector 0, which is
    /// reserved for the immediate form and never names an operand.
    pub const fn from_selector(selector: u8) -> Result<Self, Fault> {
        match selector {
            1 => Ok(Self::Reg(Reg8::A)),
            2 => Ok(Self::Reg(Reg8::B)),
            3 => Ok(Self::Reg(Reg8::C)),
            4 => Ok(Self::Reg(Reg8::D)),
            5 => Ok(Self::Reg(Reg8::E)),
            6 => Ok(Self::Reg(Reg8::F)),
            PTR_C_SELECTOR => Ok(Self::PtrC),
            _ => Err(Fault::RegisterOutOfBounds {
                family: RegisterFamily::Byte,
                selector,
            }),
        }
    }

    /// Returns the 3-bit selector encoding this operand.
    #[must_use]
    pub const fn selector(self) -> u8 {
        match self {
            Self::Reg(reg) => reg.selector(),
            Self::PtrC => PTR_C_SELECTOR,
        }
    }
}

impl fmt::Display for Operand8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reg(reg) => f.write_str(reg.name()),
            Self::PtrC => f.write_str("(ptr+c)"),
        }
    }
}

/// Six 8-bit and six 32-bit registers, all zero at power-on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    reg8: [u8; REGISTER_COUNT],
    reg32: [u32; REGISTER_COUNT],
}

impl RegisterFile {
    /// Reads an 8-bit register.
    #[must_use]
    pub const fn get8(&self, reg: Reg8) -> u8 {
        self.reg8[reg.index()]
    }

    /// Writes an 8-bit register.
    pub const fn set8(&mut self, reg: Reg8, value: u8) {
        self.reg8[reg.index()] = value;
    }

    /// Reads a 32-bit register.
    #[must_use]
    pub const fn get32(&self, reg: Reg32) -> u32 {
        self.reg32[reg.index()]
    }

    /// Writes a 32-bit register.
    pub const fn set32(&mut self, reg: Reg32, value: u32) {
        self.reg32[reg.index()] = value;
    }

    /// Reads the `pc` register.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.get32(Reg32::Pc)
    }

    /// Writes the `pc` register.
    pub const fn set_pc(&mut self, value: u32) {
        self.set32(Reg32::Pc, value);
    }

    /// Reads the `ptr` register.
    #[must_use]
    pub const fn ptr(&self) -> u32 {
        self.get32(Reg32::Ptr)
    }

    /// Writes the `ptr` register.
    pub const fn set_ptr(&mut self, value: u32) {
        self.set32(Reg32::Ptr, value);
    }

    /// Address named by the `(ptr+c)` pseudo-register.
    ///
    /// Widened so that `ptr + c` past `u32::MAX` is reported instead of wrapping.
    #[must_use]
    pub fn ptr_c_address(&self) -> u64 {
        u64::from(self.ptr()) + u64::from(self.get8(Reg8::C))
    }
}
