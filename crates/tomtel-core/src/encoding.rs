/// Mask selecting the two-bit move-family prefix.
pub const MOVE_FAMILY_MASK: u8 = 0b1100_0000;
/// Prefix shared by `MV` and `MVI`.
pub const BYTE_MOVE_PREFIX: u8 = 0b0100_0000;
/// Prefix shared by `MV32` and `MVI32`.
pub const WIDE_MOVE_PREFIX: u8 = 0b1000_0000;
/// Mask of a 3-bit register selector field.
pub const SELECTOR_MASK: u8 = 0b111;

/// Symbolic instruction identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Opcode {
    Add,
    Aptr,
    Cmp,
    Halt,
    Jez,
    Jnz,
    Mv,
    Mv32,
    Mvi,
    Mvi32,
    Out,
    Sub,
    Xor,
}

impl Opcode {
    /// Total encoded length in bytes, opcode byte included.
    #[must_use]
    pub const fn encoded_len(self) -> u8 {
        match self {
            Self::Add
            | Self::Cmp
            | Self::Halt
            | Self::Mv
            | Self::Mv32
            | Self::Out
            | Self::Sub
            | Self::Xor => 1,
            Self::Aptr | Self::Mvi => 2,
            Self::Jez | Self::Jnz | Self::Mvi32 => 5,
        }
    }

    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Aptr => "APTR",
            Self::Cmp => "CMP",
            Self::Halt => "HALT",
            Self::Jez => "JEZ",
            Self::Jnz => "JNZ",
            Self::Mv => "MV",
            Self::Mv32 => "MV32",
            Self::Mvi => "MVI",
            Self::Mvi32 => "MVI32",
            Self::Out => "OUT",
            Self::Sub => "SUB",
            Self::Xor => "XOR",
        }
    }

    /// Returns `true` for `MV`, `MVI`, `MV32` and `MVI32`.
    #[must_use]
    pub const fn is_move(self) -> bool {
        matches!(self, Self::Mv | Self::Mvi | Self::Mv32 | Self::Mvi32)
    }
}

/// Opcodes that are matched by exact byte value.
///
/// Move-family opcodes are absent: they are recognised by prefix.
pub const FIXED_OPCODE_TABLE: &[(u8, Opcode)] = &[
    (0xC2, Opcode::Add),
    (0xE1, Opcode::Aptr),
    (0xC1, Opcode::Cmp),
    (0x01, Opcode::Halt),
    (0x21, Opcode::Jez),
    (0x22, Opcode::Jnz),
    (0x02, Opcode::Out),
    (0xC3, Opcode::Sub),
    (0xC4, Opcode::Xor),
];

/// Resolves a move-family byte to its canonical code.
///
/// The canonical code keeps the family prefix and sets bit 0 when the
/// source selector names a register; a zero source selector means the
/// operand follows as an immediate. Returns `None` outside the move family.
#[must_use]
pub const fn resolve_move_code(byte: u8) -> Option<u8> {
    let prefix = byte & MOVE_FAMILY_MASK;
    if prefix != BYTE_MOVE_PREFIX && prefix != WIDE_MOVE_PREFIX {
        return None;
    }
    if byte & SELECTOR_MASK == 0 {
        Some(prefix)
    } else {
        Some(prefix | 1)
    }
}

/// Classifies a raw opcode byte.
///
/// `None` means the byte matches neither the move family nor the fixed table.
#[must_use]
pub fn classify_opcode(byte: u8) -> Option<Opcode> {
    match resolve_move_code(byte) {
        Some(0x41) => Some(Opcode::Mv),
        Some(0x40) => Some(Opcode::Mvi),
        Some(0x81) => Some(Opcode::Mv32),
        Some(0x80) => Some(Opcode::Mvi32),
        Some(_) => None,
        None => FIXED_OPCODE_TABLE
            .iter()
            .find_map(|(code, opcode)| (*code == byte).then_some(*opcode)),
    }
}

/// Extracts the `(dest, src)` selector fields of a `0bPPDDDSSS` byte.
#[must_use]
pub const fn move_selectors(byte: u8) -> (u8, u8) {
    ((byte >> 3) & SELECTOR_MASK, byte & SELECTOR_MASK)
}

/// Builds a move-family opcode byte from a prefix and two selectors.
#[must_use]
pub const fn encode_move(prefix: u8, dest: u8, src: u8) -> u8 {
    (prefix & MOVE_FAMILY_MASK) | ((dest & SELECTOR_MASK) << 3) | (src & SELECTOR_MASK)
}

/// Returns the exact byte for an opcode outside the move family.
#[must_use]
pub fn fixed_opcode_byte(opcode: Opcode) -> Option<u8> {
    FIXED_OPCODE_TABLE
        .iter()
        .find_map(|(code, entry)| (*entry == opcode).then_some(*code))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;
    use rstest::rstest;

    use super::{
        classify_opcode, encode_move, fixed_opcode_byte, move_selectors, resolve_move_code,
        Opcode, BYTE_MOVE_PREFIX, FIXED_OPCODE_TABLE, WIDE_MOVE_PREFIX,
    };

    #[test]
    fn table_contains_unique_bytes_and_opcodes() {
        let bytes: HashSet<_> = FIXED_OPCODE_TABLE.iter().map(|(b, _)| *b).collect();
        let opcodes: HashSet<_> = FIXED_OPCODE_TABLE.iter().map(|(_, op)| *op).collect();
        assert_eq!(bytes.len(), FIXED_OPCODE_TABLE.len());
        assert_eq!(opcodes.len(), FIXED_OPCODE_TABLE.len());
    }

    #[test]
    fn fixed_table_never_overlaps_move_family() {
        for (byte, opcode) in FIXED_OPCODE_TABLE {
            assert!(resolve_move_code(*byte).is_none(), "{byte:#04x}");
            assert!(!opcode.is_move());
            assert_eq!(classify_opcode(*byte), Some(*opcode));
            assert_eq!(fixed_opcode_byte(*opcode), Some(*byte));
        }
    }

    #[rstest]
    #[case(Opcode::Add, 1)]
    #[case(Opcode::Aptr, 2)]
    #[case(Opcode::Cmp, 1)]
    #[case(Opcode::Halt, 1)]
    #[case(Opcode::Jez, 5)]
    #[case(Opcode::Jnz, 5)]
    #[case(Opcode::Mv, 1)]
    #[case(Opcode::Mv32, 1)]
    #[case(Opcode::Mvi, 2)]
    #[case(Opcode::Mvi32, 5)]
    #[case(Opcode::Out, 1)]
    #[case(Opcode::Sub, 1)]
    #[case(Opcode::Xor, 1)]
    fn encoded_lengths_match_isa(#[case] opcode: Opcode, #[case] len: u8) {
        assert_eq!(opcode.encoded_len(), len);
    }

    #[test]
    fn unassigned_bytes_are_rejected() {
        for byte in [0x00, 0x03, 0x20, 0x23, 0xC0, 0xC5, 0xE0, 0xE2, 0xFF] {
            assert_eq!(classify_opcode(byte), None, "{byte:#04x}");
        }
    }

    #[test]
    fn selectors_split_dest_and_src_fields() {
        assert_eq!(move_selectors(0b0111_1001), (7, 1));
        assert_eq!(move_selectors(0b1010_1000), (5, 0));
        assert_eq!(encode_move(BYTE_MOVE_PREFIX, 7, 1), 0b0111_1001);
        assert_eq!(encode_move(WIDE_MOVE_PREFIX, 5, 0), 0b1010_1000);
    }

    proptest! {
        #[test]
        fn zero_source_selects_immediate_form(dest in 0_u8..8, src in 0_u8..8) {
            let byte_move = classify_opcode(encode_move(BYTE_MOVE_PREFIX, dest, src));
            let wide_move = classify_opcode(encode_move(WIDE_MOVE_PREFIX, dest, src));
            if src == 0 {
                prop_assert_eq!(byte_move, Some(Opcode::Mvi));
                prop_assert_eq!(wide_move, Some(Opcode::Mvi32));
            } else {
                prop_assert_eq!(byte_move, Some(Opcode::Mv));
                prop_assert_eq!(wide_move, Some(Opcode::Mv32));
            }
        }
    }
}
