//! Instruction encoding and a small program builder.
//!
//! Immediates are always emitted little-endian.

use crate::decoder::Instruction;
use crate::encoding::{encode_move, fixed_opcode_byte, Opcode, BYTE_MOVE_PREFIX, WIDE_MOVE_PREFIX};
use crate::state::{Operand8, Reg32};

/// Encodes one instruction into its byte form.
#[must_use]
pub fn encode(instruction: &Instruction) -> Vec<u8> {
    let fixed = |opcode: Opcode| fixed_opcode_byte(opcode).unwrap_or_default();
    let with_imm32 = |first: u8, imm: u32| {
        let mut bytes = Vec::with_capacity(5);
        bytes.push(first);
        bytes.extend_from_slice(&imm.to_le_bytes());
        bytes
    };

    match *instruction {
        Instruction::Add => vec![fixed(Opcode::Add)],
        Instruction::Cmp => vec![fixed(Opcode::Cmp)],
        Instruction::Halt => vec![fixed(Opcode::Halt)],
        Instruction::Out => vec![fixed(Opcode::Out)],
        Instruction::Sub => vec![fixed(Opcode::Sub)],
        Instruction::Xor => vec![fixed(Opcode::Xor)],
        Instruction::Aptr { imm } => vec![fixed(Opcode::Aptr), imm],
        Instruction::Jez { target } => with_imm32(fixed(Opcode::Jez), target),
        Instruction::Jnz { target } => with_imm32(fixed(Opcode::Jnz), target),
        Instruction::Mv { dest, src } => {
            vec![encode_move(BYTE_MOVE_PREFIX, dest.selector(), src.selector())]
        }
        Instruction::Mvi { dest, imm } => {
            vec![encode_move(BYTE_MOVE_PREFIX, dest.selector(), 0), imm]
        }
        Instruction::Mv32 { dest, src } => {
            vec![encode_move(WIDE_MOVE_PREFIX, dest.selector(), src.selector())]
        }
        Instruction::Mvi32 { dest, imm } => {
            with_imm32(encode_move(WIDE_MOVE_PREFIX, dest.selector(), 0), imm)
        }
    }
}

/// Location of a jump whose target is filled in later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JumpPatch {
    operand_offset: usize,
}

/// Appends encoded instructions and raw data into a memory image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramBuilder {
    bytes: Vec<u8>,
}

impl ProgramBuilder {
    /// Starts an empty program at address 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Address the next emitted byte will occupy, saturating at `u32::MAX`.
    #[must_use]
    pub fn here(&self) -> u32 {
        u32::try_from(self.bytes.len()).unwrap_or(u32::MAX)
    }

    /// Appends an instruction.
    pub fn emit(&mut self, instruction: Instruction) -> &mut Self {
        self.bytes.extend(encode(&instruction));
        self
    }

    /// Appends raw bytes (data or hand-encoded instructions).
    pub fn data(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// `ADD a <- b`.
    pub fn add(&mut self) -> &mut Self {
        self.emit(Instruction::Add)
    }

    /// `SUB a <- b`.
    pub fn sub(&mut self) -> &mut Self {
        self.emit(Instruction::Sub)
    }

    /// `XOR a <- b`.
    pub fn xor(&mut self) -> &mut Self {
        self.emit(Instruction::Xor)
    }

    /// `CMP`.
    pub fn cmp(&mut self) -> &mut Self {
        self.emit(Instruction::Cmp)
    }

    /// `OUT a`.
    pub fn out(&mut self) -> &mut Self {
        self.emit(Instruction::Out)
    }

    /// `HALT`.
    pub fn halt(&mut self) -> &mut Self {
        self.emit(Instruction::Halt)
    }

    /// `APTR imm8`.
    pub fn aptr(&mut self, imm: u8) -> &mut Self {
        self.emit(Instruction::Aptr { imm })
    }

    /// `JEZ imm32`.
    pub fn jez(&mut self, target: u32) -> &mut Self {
        self.emit(Instruction::Jez { target })
    }

    /// `JNZ imm32`.
    pub fn jnz(&mut self, target: u32) -> &mut Self {
        self.emit(Instruction::Jnz { target })
    }

    /// `MV dest <- src`.
    pub fn mv(&mut self, dest: Operand8, src: Operand8) -> &mut Self {
        self.emit(Instruction::Mv { dest, src })
    }

    /// `MVI dest <- imm8`.
    pub fn mvi(&mut self, dest: Operand8, imm: u8) -> &mut Self {
        self.emit(Instruction::Mvi { dest, imm })
    }

    /// `MV32 dest <- src`.
    pub fn mv32(&mut self, dest: Reg32, src: Reg32) -> &mut Self {
        self.emit(Instruction::Mv32 { dest, src })
    }

    /// `MVI32 dest <- imm32`.
    pub fn mvi32(&mut self, dest: Reg32, imm: u32) -> &mut Self {
        self.emit(Instruction::Mvi32 { dest, imm })
    }

    /// `JEZ` with a target patched later through [`Self::patch`].
    pub fn jez_forward(&mut self) -> JumpPatch {
        self.jez(0);
        self.last_operand()
    }

    /// `JNZ` with a target patched later through [`Self::patch`].
    pub fn jnz_forward(&mut self) -> JumpPatch {
        self.jnz(0);
        self.last_operand()
    }

    /// Fills in the target of a forward jump.
    pub fn patch(&mut self, patch: JumpPatch, target: u32) -> &mut Self {
        let end = patch.operand_offset + 4;
        self.bytes[patch.operand_offset..end].copy_from_slice(&target.to_le_bytes());
        self
    }

    /// Takes the emitted memory image, leaving the builder empty.
    #[must_use]
    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    fn last_operand(&self) -> JumpPatch {
        JumpPatch {
            operand_offset: self.bytes.len() - 4,
        }
    }
}
