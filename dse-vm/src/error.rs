//! Execution error taxonomy.

/// The reason a spec's execution stopped before reaching `END_SPEC`.
///
/// This is a closed set: every variant corresponds to one of the failure
/// modes named in the VM's specification. All of them are fatal to the
/// current execution; nothing here is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PanicReason {
    /// The opcode field does not match any opcode this crate knows the name
    /// of at all (not even as "declared but unimplemented").
    #[error("opcode {opcode:#04x} does not match any known command")]
    UnknownOpcode {
        /// The raw opcode byte.
        opcode: u8,
    },

    /// The opcode is a known command but this implementation has no handler
    /// for it.
    #[error("opcode {opcode:#04x} is defined but not implemented")]
    UnimplementedOpcode {
        /// The raw opcode byte.
        opcode: u8,
    },

    /// The encoded size/register-flag combination is not valid for the
    /// opcode, or an immediate has an illegal value.
    #[error("malformed instruction: {0}")]
    MalformedInstruction(&'static str),

    /// `RESERVE`/`REFERENCE` targets a slot that is already filled.
    #[error("region slot {slot} is already in use")]
    RegionInUse {
        /// The region slot index.
        slot: u8,
    },

    /// A write or `SET_WR_PTR` targets a slot that is empty.
    #[error("region slot {slot} has not been allocated")]
    RegionNotAllocated {
        /// The region slot index.
        slot: u8,
    },

    /// A write or `SET_WR_PTR` targets a slot that is a reference, or a real
    /// region marked `unfilled`.
    #[error("region slot {slot} is unfilled or a reference")]
    RegionUnfilled {
        /// The region slot index.
        slot: u8,
    },

    /// A write or write-pointer operation executed before `SWITCH_FOCUS`
    /// selected any region.
    #[error("no region has been selected")]
    NoRegionSelected,

    /// A write exceeds the target region's remaining capacity.
    #[error("out of space in region {slot}: requested {requested} bytes, {remaining} remaining")]
    OutOfSpace {
        /// Bytes the write attempted to append.
        requested: u32,
        /// Bytes actually remaining before the write.
        remaining: u32,
        /// The region slot index.
        slot: u8,
    },

    /// `RESERVE` size is negative (as a signed 32-bit value) or at/above the
    /// per-region memory limit.
    #[error("region size {size} is out of bounds for a per-region limit of {limit}")]
    RegionSizeOutOfBounds {
        /// The requested size, as a signed interpretation of the 32-bit field.
        size: i32,
        /// The per-region memory limit supplied to the VM.
        limit: u32,
    },

    /// The data-length field did not decode to one of 1, 2, 4, or 8 bytes.
    #[error("data length {0} is not one of 1, 2, 4, 8 bytes")]
    UnknownTypeLength(u8),

    /// `BREAK` was executed. Distinguished from other errors because it is
    /// an intentional abort encoded in the spec, not a malformed program.
    #[error("BREAK instruction executed")]
    BreakHit,
}

/// An execution failure, carrying the byte offset of the command word being
/// executed when it occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("execution failed at byte offset {offset}: {reason}")]
pub struct ExecutionError {
    /// Byte offset, within the input spec, of the command word that failed.
    pub offset: u32,
    /// The underlying reason.
    #[source]
    pub reason: PanicReason,
}

impl ExecutionError {
    /// Attaches a byte offset to a [`PanicReason`].
    pub const fn at(offset: u32, reason: PanicReason) -> Self {
        Self { offset, reason }
    }
}
