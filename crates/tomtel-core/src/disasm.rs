//! Instruction disassembly for the Tomtel ISA.
//!
//! Converts raw memory into human-readable rows. Bytes that do not form a
//! complete, valid instruction are rendered as `.byte` directives so that a
//! linear sweep over mixed code and data never stops early.

use crate::decoder::Decoder;
use crate::memory::{ImmediateLayout, Memory};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single disassembled instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// The starting address of this instruction.
    pub addr: u32,
    /// Raw bytes covered by this row.
    pub bytes: Vec<u8>,
    /// The instruction mnemonic (e.g., "MVI32", "OUT") or `.byte`.
    pub mnemonic: String,
    /// The formatted operands (e.g., "(ptr+c) <- a").
    pub operands: String,
    /// Whether the bytes failed to decode into a valid instruction.
    pub is_illegal: bool,
}

impl DisassemblyRow {
    /// Number of bytes this row covers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for a row covering no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Renders the row as `addr: bytes  text`.
    #[must_use]
    pub fn render(&self) -> String {
        let hex: Vec<String> = self.bytes.iter().map(|b| format!("{b:02x}")).collect();
        let text = if self.operands.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{} {}", self.mnemonic, self.operands)
        };
        format!("{:08x}: {:<15} {text}", self.addr, hex.join(" "))
    }
}

/// Disassembles the instruction at `addr`.
///
/// Returns `None` only when `addr` is outside memory.
#[must_use]
pub fn disassemble_one(addr: u32, memory: &Memory, layout: ImmediateLayout) -> Option<DisassemblyRow> {
    let raw = memory.read_u8(u64::from(addr)).ok()?;

    let instruction = Decoder::decode_byte(addr, raw)
        .and_then(|decoded| decoded.resolve(memory, layout));

    let Ok(instruction) = instruction else {
        return Some(DisassemblyRow {
            addr,
            bytes: vec![raw],
            mnemonic: ".byte".to_string(),
            operands: format!("{raw:#04x} ; ILLEGAL"),
            is_illegal: true,
        });
    };

    let start = usize::try_from(addr).ok()?;
    let end = start + usize::from(instruction.opcode().encoded_len());
    let text = instruction.to_string();
    let (mnemonic, operands) = text.split_once(' ').unwrap_or((text.as_str(), ""));

    Some(DisassemblyRow {
        addr,
        bytes: memory.as_bytes()[start..end].to_vec(),
        mnemonic: mnemonic.to_string(),
        operands: operands.to_string(),
        is_illegal: false,
    })
}

/// Linear sweep of up to `count` rows starting at `start`.
///
/// Stops early at the end of memory.
#[must_use]
pub fn disassemble_range(
    start: u32,
    count: usize,
    memory: &Memory,
    layout: ImmediateLayout,
) -> Vec<DisassemblyRow> {
    let mut rows = Vec::with_capacity(count.min(memory.len()));
    let mut addr = start;

    while rows.len() < count {
        let Some(row) = disassemble_one(addr, memory, layout) else {
            break;
        };
        let Some(next) = u32::try_from(row.len())
            .ok()
            .and_then(|len| addr.checked_add(len))
        else {
            rows.push(row);
            break;
        };
        rows.push(row);
        addr = next;
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::{disassemble_one, disassemble_range};
    use crate::memory::{ImmediateLayout, Memory};

    const LE: ImmediateLayout = ImmediateLayout::LittleEndian;

    #[test]
    fn single_byte_instruction() {
        let memory = Memory::from(vec![0x02]);
        let row = disassemble_one(0, &memory, LE).expect("row");
        assert_eq!(row.mnemonic, "OUT");
        assert_eq!(row.operands, "a");
        assert_eq!(row.bytes, vec![0x02]);
        assert!(!row.is_illegal);
    }

    #[test]
    fn immediate_operands_are_included_in_row_bytes() {
        let memory = Memory::from(vec![0b1010_1000, 0x10, 0x00, 0x00, 0x00]);
        let row = disassemble_one(0, &memory, LE).expect("row");
        assert_eq!(row.mnemonic, "MVI32");
        assert_eq!(row.operands, "ptr <- 0x00000010");
        assert_eq!(row.len(), 5);
    }

    #[test]
    fn unsupported_byte_is_rendered_as_data() {
        let memory = Memory::from(vec![0x00]);
        let row = disassemble_one(0, &memory, LE).expect("row");
        assert!(row.is_illegal);
        assert_eq!(row.mnemonic, ".byte");
        assert_eq!(row.operands, "0x00 ; ILLEGAL");
    }

    #[test]
    fn truncated_jump_is_rendered_as_data() {
        let memory = Memory::from(vec![0x21, 0x00]);
        let row = disassemble_one(0, &memory, LE).expect("row");
        assert!(row.is_illegal);
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn address_outside_memory_yields_nothing() {
        assert!(disassemble_one(1, &Memory::from(vec![0x01]), LE).is_none());
    }

    #[test]
    fn range_walks_variable_length_instructions() {
        // MVI a <- 'A' ; OUT ; HALT ; <garbage>
        let memory = Memory::from(vec![0b0100_1000, 0x41, 0x02, 0x01, 0xFF]);
        let rows = disassemble_range(0, 10, &memory, LE);
        let addrs: Vec<u32> = rows.iter().map(|row| row.addr).collect();
        assert_eq!(addrs, vec![0, 2, 3, 4]);
        assert_eq!(rows[0].render(), "00000000: 48 41           MVI a <- 0x41");
        assert_eq!(rows[2].render(), "00000003: 01              HALT");
        assert!(rows[3].is_illegal);
    }

    #[test]
    fn oversized_count_stops_at_end_of_memory() {
        let memory = Memory::from(vec![0x01, 0x02]);
        let rows = disassemble_range(0, usize::MAX, &memory, LE);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn range_respects_count() {
        let memory = Memory::from(vec![0x02; 8]);
        assert_eq!(disassemble_range(2, 3, &memory, LE).len(), 3);
    }
}
