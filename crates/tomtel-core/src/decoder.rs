//! Instruction decoder for the Tomtel ISA.
//!
//! Decoding happens in two stages. [`Decoder::decode`] is a pure function of
//! the opcode byte: it classifies the instruction, resolves the
//! immediate-vs-register ambiguity of the move family, and reports the
//! encoded length. [`DecodedInstruction::resolve`] then turns selector fields
//! and immediates into typed operands, which is where register-range and
//! immediate bounds faults surface.

use std::fmt;

use crate::encoding::{classify_opcode, move_selectors, Opcode};
use crate::memory::{ImmediateLayout, Memory};
use crate::state::{Operand8, Reg32};
use crate::Fault;

/// Opcode byte classified into an instruction with its raw selector fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DecodedInstruction {
    /// Address of the opcode byte.
    pub addr: u32,
    /// Raw opcode byte.
    pub raw: u8,
    /// Symbolic opcode.
    pub opcode: Opcode,
    /// Destination selector (bits 3..=5); meaningful for move-family opcodes.
    pub dest: u8,
    /// Source selector (bits 0..=2); meaningful for move-family opcodes.
    pub src: u8,
}

impl DecodedInstruction {
    /// Total encoded length in bytes.
    #[must_use]
    pub const fn encoded_len(&self) -> u8 {
        self.opcode.encoded_len()
    }

    /// Address of the instruction that sequentially follows this one.
    #[must_use]
    pub const fn next_addr(&self) -> u32 {
        self.addr.wrapping_add(self.opcode.encoded_len() as u32)
    }

    /// Resolves selector fields and reads any immediate operand.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::RegisterOutOfBounds`] when a selector names no
    /// register of its family, or [`Fault::MemoryOutOfBounds`] when an
    /// immediate extends past the end of memory.
    pub fn resolve(&self, memory: &Memory, layout: ImmediateLayout) -> Result<Instruction, Fault> {
        let operand = u64::from(self.addr) + 1;
        let imm32 = || {
            u32::try_from(operand)
                .map_err(|_| Fault::MemoryOutOfBounds {
                    addr: operand,
                    len: memory.len(),
                })
                .and_then(|addr| memory.read_u32(addr, layout))
        };

        let instruction = match self.opcode {
            Opcode::Add => Instruction::Add,
            Opcode::Aptr => Instruction::Aptr {
                imm: memory.read_u8(operand)?,
            },
            Opcode::Cmp => Instruction::Cmp,
            Opcode::Halt => Instruction::Halt,
            Opcode::Jez => Instruction::Jez { target: imm32()? },
            Opcode::Jnz => Instruction::Jnz { target: imm32()? },
            Opcode::Mv => Instruction::Mv {
                dest: Operand8::from_selector(self.dest)?,
                src: Operand8::from_selector(self.src)?,
            },
            Opcode::Mv32 => Instruction::Mv32 {
                dest: Reg32::from_selector(self.dest)?,
                src: Reg32::from_selector(self.src)?,
            },
            Opcode::Mvi => Instruction::Mvi {
                dest: Operand8::from_selector(self.dest)?,
                imm: memory.read_u8(operand)?,
            },
            Opcode::Mvi32 => Instruction::Mvi32 {
                dest: Reg32::from_selector(self.dest)?,
                imm: imm32()?,
            },
            Opcode::Out => Instruction::Out,
            Opcode::Sub => Instruction::Sub,
            Opcode::Xor => Instruction::Xor,
        };
        Ok(instruction)
    }
}

/// Fully resolved instruction, one variant per opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Instruction {
    Add,
    Aptr { imm: u8 },
    Cmp,
    Halt,
    Jez { target: u32 },
    Jnz { target: u32 },
    Mv { dest: Operand8, src: Operand8 },
    Mv32 { dest: Reg32, src: Reg32 },
    Mvi { dest: Operand8, imm: u8 },
    Mvi32 { dest: Reg32, imm: u32 },
    Out,
    Sub,
    Xor,
}

impl Instruction {
    /// Symbolic opcode of this instruction.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Add => Opcode::Add,
            Self::Aptr { .. } => Opcode::Aptr,
            Self::Cmp => Opcode::Cmp,
            Self::Halt => Opcode::Halt,
            Self::Jez { .. } => Opcode::Jez,
            Self::Jnz { .. } => Opcode::Jnz,
            Self::Mv { .. } => Opcode::Mv,
            Self::Mv32 { .. } => Opcode::Mv32,
            Self::Mvi { .. } => Opcode::Mvi,
            Self::Mvi32 { .. } => Opcode::Mvi32,
            Self::Out => Opcode::Out,
            Self::Sub => Opcode::Sub,
            Self::Xor => Opcode::Xor,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.opcode().mnemonic();
        match self {
            Self::Add | Self::Sub | Self::Xor => write!(f, "{mnemonic} a <- b"),
            Self::Cmp | Self::Halt => f.write_str(mnemonic),
            Self::Out => write!(f, "{mnemonic} a"),
            Self::Aptr { imm } => write!(f, "{mnemonic} {imm:#04x}"),
            Self::Jez { target } | Self::Jnz { target } => write!(f, "{mnemonic} {target:#010x}"),
            Self::Mv { dest, src } => write!(f, "{mnemonic} {dest} <- {src}"),
            Self::Mv32 { dest, src } => write!(f, "{mnemonic} {dest} <- {src}"),
            Self::Mvi { dest, imm } => write!(f, "{mnemonic} {dest} <- {imm:#04x}"),
            Self::Mvi32 { dest, imm } => write!(f, "{mnemonic} {dest} <- {imm:#010x}"),
        }
    }
}

/// Instruction decoder for the Tomtel ISA.
///
/// Stateless: decoding is a pure function of the memory image.
pub struct Decoder;

impl Decoder {
    /// Decodes the opcode byte at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::MemoryOutOfBounds`] when `addr` is outside memory and
    /// [`Fault::UnsupportedOpcode`] when the byte matches neither the move
    /// family nor the fixed opcode table.
    pub fn decode(memory: &Memory, addr: u32) -> Result<DecodedInstruction, Fault> {
        let raw = memory.read_u8(u64::from(addr))?;
        Self::decode_byte(addr, raw)
    }

    /// Decodes an opcode byte that was fetched from `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnsupportedOpcode`] when `raw` is not an opcode.
    pub fn decode_byte(addr: u32, raw: u8) -> Result<DecodedInstruction, Fault> {
        let opcode = classify_opcode(raw).ok_or(Fault::UnsupportedOpcode { addr, byte: raw })?;
        let (dest, src) = if opcode.is_move() {
            move_selectors(raw)
        } else {
            (0, 0)
        };

        Ok(DecodedInstruction {
            addr,
            raw,
            opcode,
            dest,
            src,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::{Decoder, Instruction};
    use crate::encoding::{Opcode, MOVE_FAMILY_MASK};
    use crate::memory::{ImmediateLayout, Memory};
    use crate::state::{Operand8, Reg32, Reg8, RegisterFamily};
    use crate::Fault;

    fn decode_at(image: &[u8], addr: u32) -> Result<Instruction, Fault> {
        let memory = Memory::from(image);
        Decoder::decode(&memory, addr)?.resolve(&memory, ImmediateLayout::LittleEndian)
    }

    #[rstest]
    #[case(0xC2, Opcode::Add)]
    #[case(0xE1, Opcode::Aptr)]
    #[case(0xC1, Opcode::Cmp)]
    #[case(0x01, Opcode::Halt)]
    #[case(0x21, Opcode::Jez)]
    #[case(0x22, Opcode::Jnz)]
    #[case(0x02, Opcode::Out)]
    #[case(0xC3, Opcode::Sub)]
    #[case(0xC4, Opcode::Xor)]
    #[case(0b0100_1010, Opcode::Mv)]
    #[case(0b0100_1000, Opcode::Mvi)]
    #[case(0b1010_0001, Opcode::Mv32)]
    #[case(0b1010_0000, Opcode::Mvi32)]
    fn decode_classifies_every_instruction(#[case] raw: u8, #[case] expected: Opcode) {
        let decoded = Decoder::decode_byte(0, raw).expect("should decode");
        assert_eq!(decoded.opcode, expected);
        assert_eq!(decoded.encoded_len(), expected.encoded_len());
    }

    #[test]
    fn zero_byte_is_unsupported() {
        assert_eq!(
            Decoder::decode(&Memory::from(&[0x01, 0x00][..]), 1),
            Err(Fault::UnsupportedOpcode { addr: 1, byte: 0 })
        );
    }

    #[test]
    fn decode_outside_memory_is_out_of_bounds() {
        assert_eq!(
            Decoder::decode(&Memory::zeroed(2), 2),
            Err(Fault::MemoryOutOfBounds { addr: 2, len: 2 })
        );
    }

    #[test]
    fn move_selectors_are_extracted() {
        let decoded = Decoder::decode_byte(0, 0b0111_1001).expect("MV (ptr+c) <- a");
        assert_eq!((decoded.dest, decoded.src), (7, 1));

        let decoded = Decoder::decode_byte(0, 0xC2).expect("ADD");
        assert_eq!((decoded.dest, decoded.src), (0, 0));
    }

    #[test]
    fn resolve_reads_immediates() {
        assert_eq!(
            decode_at(&[0b0100_1000, 0x41], 0),
            Ok(Instruction::Mvi {
                dest: Operand8::Reg(Reg8::A),
                imm: 0x41
            })
        );
        assert_eq!(
            decode_at(&[0b1010_1000, 0x10, 0x20, 0x30, 0x40], 0),
            Ok(Instruction::Mvi32 {
                dest: Reg32::Ptr,
                imm: 0x4030_2010
            })
        );
        assert_eq!(
            decode_at(&[0x00, 0x21, 0x05, 0, 0, 0], 1),
            Ok(Instruction::Jez { target: 5 })
        );
        assert_eq!(
            decode_at(&[0xE1, 0x08], 0),
            Ok(Instruction::Aptr { imm: 8 })
        );
    }

    #[test]
    fn resolve_rejects_truncated_immediates() {
        assert_eq!(
            decode_at(&[0x22, 0x00, 0x00], 0),
            Err(Fault::MemoryOutOfBounds { addr: 4, len: 3 })
        );
        assert_eq!(
            decode_at(&[0b0100_1000], 0),
            Err(Fault::MemoryOutOfBounds { addr: 1, len: 1 })
        );
    }

    #[test]
    fn resolve_rejects_out_of_family_selectors() {
        // MV32 with selector 7 on both sides.
        assert_eq!(
            decode_at(&[0b1011_1111], 0),
            Err(Fault::RegisterOutOfBounds {
                family: RegisterFamily::Wide,
                selector: 7
            })
        );
        // MV with a zero destination.
        assert_eq!(
            decode_at(&[0b0100_0001], 0),
            Err(Fault::RegisterOutOfBounds {
                family: RegisterFamily::Byte,
                selector: 0
            })
        );
    }

    #[test]
    fn display_matches_assembly_syntax() {
        let cases = [
            (
                Instruction::Mv {
                    dest: Operand8::PtrC,
                    src: Operand8::Reg(Reg8::A),
                },
                "MV (ptr+c) <- a",
            ),
            (
                Instruction::Mvi32 {
                    dest: Reg32::Ptr,
                    imm: 0x10,
                },
                "MVI32 ptr <- 0x00000010",
            ),
            (Instruction::Jnz { target: 0x2A }, "JNZ 0x0000002a"),
            (Instruction::Aptr { imm: 8 }, "APTR 0x08"),
            (Instruction::Out, "OUT a"),
            (Instruction::Sub, "SUB a <- b"),
        ];
        for (instruction, text) in cases {
            assert_eq!(instruction.to_string(), text);
        }
    }

    proptest! {
        #[test]
        fn move_family_disambiguation_holds_for_all_bytes(raw in any::<u8>()) {
            let decoded = Decoder::decode_byte(0, raw);
            match (raw & MOVE_FAMILY_MASK, raw & 0b111) {
                (0x40, 0) => prop_assert_eq!(decoded.map(|d| (d.opcode, d.encoded_len())), Ok((Opcode::Mvi, 2))),
                (0x40, _) => prop_assert_eq!(decoded.map(|d| (d.opcode, d.encoded_len())), Ok((Opcode::Mv, 1))),
                (0x80, 0) => prop_assert_eq!(decoded.map(|d| (d.opcode, d.encoded_len())), Ok((Opcode::Mvi32, 5))),
                (0x80, _) => prop_assert_eq!(decoded.map(|d| (d.opcode, d.encoded_len())), Ok((Opcode::Mv32, 1))),
                _ => prop_assert!(decoded.map_or(true, |d| !d.opcode.is_move())),
            }
        }
    }
}
