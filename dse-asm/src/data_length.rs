/// Width, in bytes, of a single data-width operation.
///
/// Encoded in a 2-bit field as `0 -> 1, 1 -> 2, 2 -> 4, 3 -> 8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataLength {
    /// One byte.
    One,
    /// Two bytes.
    Two,
    /// Four bytes.
    Four,
    /// Eight bytes.
    Eight,
}

impl DataLength {
    /// The width in bytes this variant represents.
    pub const fn as_bytes(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
        }
    }

    /// Decodes a raw 2-bit field value (0..=3) into a [`DataLength`].
    pub const fn from_field(raw: u8) -> Self {
        match raw & 0b11 {
            0 => Self::One,
            1 => Self::Two,
            2 => Self::Four,
            _ => Self::Eight,
        }
    }
}

/// The raw byte did not decode to one of the four valid widths (1, 2, 4, 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownTypeLength(pub u8);

impl TryFrom<u8> for DataLength {
    type Error = UnknownTypeLength;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            other => Err(UnknownTypeLength(other)),
        }
    }
}
