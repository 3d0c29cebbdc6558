use crate::data_length::DataLength;

/// A register index in `0..16`, extracted from a 4-bit field.
pub type RegisterIndex = u8;

/// A decoded 32-bit command word.
///
/// Decoding is pure bit masking (see the bit-field layout in the crate's
/// specification): no I/O, no VM state, and it never fails — an unknown
/// opcode byte decodes fine, it is only rejected once the VM tries to
/// dispatch it.
///
/// Register indices are extracted only when their presence flag is set;
/// otherwise they are `None`, not register 0 — an opcode that reads
/// `dest()` when the dest-flag is clear gets a real absence to report as
/// `MalformedInstruction`, not a silent wrong register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    raw: u32,
}

impl Command {
    /// Decodes a little-endian 32-bit command word.
    #[tracing::instrument(level = "trace", name = "decode", skip_all, fields(word = word))]
    pub fn decode(word: u32) -> Self {
        let command = Self { raw: word };
        tracing::trace!(
            opcode = command.opcode(),
            size_words = command.size_words(),
            "decoded command word"
        );
        command
    }

    /// The raw word, for opcodes that read alias bits directly (data-length,
    /// region, unfilled/referenceable/relative flags, repeats).
    pub const fn raw(self) -> u32 {
        self.raw
    }

    /// Total word count of this instruction, including the command word
    /// itself (1..=4).
    pub const fn size_words(self) -> u8 {
        (((self.raw >> 30) & 0b11) + 1) as u8
    }

    /// The raw opcode byte (bits 27..20). Resolving this against a known
    /// [`crate::Opcode`] is the dispatcher's job, not the decoder's.
    pub const fn opcode(self) -> u8 {
        ((self.raw >> 20) & 0xff) as u8
    }

    /// Destination register index (bits 15..12), if the dest-flag (bit 18)
    /// is set.
    pub const fn dest(self) -> Option<RegisterIndex> {
        if self.raw & (1 << 18) != 0 {
            Some(((self.raw >> 12) & 0xf) as RegisterIndex)
        } else {
            None
        }
    }

    /// First source register index (bits 11..8), if the src1-flag (bit 17)
    /// is set.
    pub const fn src1(self) -> Option<RegisterIndex> {
        if self.raw & (1 << 17) != 0 {
            Some(((self.raw >> 8) & 0xf) as RegisterIndex)
        } else {
            None
        }
    }

    /// Second source register index (bits 7..4), if the src2-flag (bit 16)
    /// is set.
    pub const fn src2(self) -> Option<RegisterIndex> {
        if self.raw & (1 << 16) != 0 {
            Some(((self.raw >> 4) & 0xf) as RegisterIndex)
        } else {
            None
        }
    }

    /// Data-length alias (bits 13..12), for data-width opcodes. Shares bits
    /// with `dest`; an opcode using this encoding does not also read `dest`.
    pub const fn data_length(self) -> DataLength {
        DataLength::from_field(((self.raw >> 12) & 0b11) as u8)
    }

    /// Region index alias (bits 4..0), for region-declaring opcodes.
    pub const fn region(self) -> u8 {
        (self.raw & 0x1f) as u8
    }

    /// Unfilled-flag alias (bit 7), for `RESERVE`.
    pub const fn unfilled_flag(self) -> bool {
        self.raw & (1 << 7) != 0
    }

    /// Referenceable-flag alias (bit 6), for `RESERVE`.
    pub const fn referenceable_flag(self) -> bool {
        self.raw & (1 << 6) != 0
    }

    /// Relative-flag alias (bit 0), for `SET_WR_PTR`.
    pub const fn relative_flag(self) -> bool {
        self.raw & 1 != 0
    }

    /// Repeats alias (bits 7..0), for `WRITE` with no src2 register.
    pub const fn repeats_immediate(self) -> u8 {
        (self.raw & 0xff) as u8
    }
}

impl From<u32> for Command {
    fn from(word: u32) -> Self {
        Self::decode(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0b00 << 30, 1)]
    #[case(0b01 << 30, 2)]
    #[case(0b10 << 30, 3)]
    #[case(0b11 << 30, 4)]
    fn decodes_size_field(#[case] word: u32, #[case] expected: u8) {
        assert_eq!(Command::decode(word).size_words(), expected);
    }

    #[test]
    fn decodes_opcode_field() {
        let word = 0x42u32 << 20;
        assert_eq!(Command::decode(word).opcode(), 0x42);
    }

    #[test]
    fn register_absent_when_flag_clear() {
        let word = (0xf << 12) | (0xf << 8) | (0xf << 4);
        let cmd = Command::decode(word);
        assert_eq!(cmd.dest(), None);
        assert_eq!(cmd.src1(), None);
        assert_eq!(cmd.src2(), None);
    }

    #[test]
    fn register_present_when_flag_set() {
        let word = (1 << 18) | (1 << 17) | (1 << 16) | (0xa << 12) | (0xb << 8) | (0xc << 4);
        let cmd = Command::decode(word);
        assert_eq!(cmd.dest(), Some(0xa));
        assert_eq!(cmd.src1(), Some(0xb));
        assert_eq!(cmd.src2(), Some(0xc));
    }

    #[test]
    fn decodes_region_and_reserve_flags() {
        let word = (1 << 7) | (1 << 6) | 0x1f;
        let cmd = Command::decode(word);
        assert!(cmd.unfilled_flag());
        assert!(cmd.referenceable_flag());
        assert_eq!(cmd.region(), 0x1f);
    }

    #[test]
    fn decodes_relative_flag_and_repeats() {
        let word = 0b1010_0101u32 | 1;
        let cmd = Command::decode(word);
        assert!(cmd.relative_flag());
        assert_eq!(cmd.repeats_immediate(), 0b1010_0101);
    }

    #[test]
    fn decodes_data_length_alias() {
        assert_eq!(Command::decode(0 << 12).data_length().as_bytes(), 1);
        assert_eq!(Command::decode(1 << 12).data_length().as_bytes(), 2);
        assert_eq!(Command::decode(2 << 12).data_length().as_bytes(), 4);
        assert_eq!(Command::decode(3 << 12).data_length().as_bytes(), 8);
    }
}
