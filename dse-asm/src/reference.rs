/// An opaque 32-bit identifier linking a reference region to the real region
/// it aliases.
///
/// Two handles are equal iff their integer payload is equal. A handle has no
/// lifetime relationship to any region; it is purely nominal within a single
/// execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferenceHandle(u32);

impl ReferenceHandle {
    /// Wraps a raw 32-bit value as a reference handle.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// The underlying integer payload.
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for ReferenceHandle {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}
