//! Memory regions and the region table.

use alloc::{vec, vec::Vec};

use dse_asm::ReferenceHandle;

use crate::consts::{NUM_REGIONS, REGION_ALIGNMENT};
use crate::error::PanicReason;

/// Rounds `size` up to the next multiple of [`REGION_ALIGNMENT`].
pub(crate) const fn round_up_to_alignment(size: u32) -> u32 {
    let remainder = size % REGION_ALIGNMENT;
    if remainder == 0 {
        size
    } else {
        size + (REGION_ALIGNMENT - remainder)
    }
}

/// A write would exceed a real region's remaining capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfSpace {
    /// Bytes the write attempted to append.
    pub requested: u32,
    /// Bytes actually remaining before the write.
    pub remaining: u32,
}

/// A region that owns a contiguous, fixed-capacity byte buffer.
///
/// The buffer is allocated (and zeroed) at `RESERVE` time, rounded up to a
/// multiple of 4 bytes, and never resized afterwards.
#[derive(Debug, Clone)]
pub struct RealRegion {
    buffer: Vec<u8>,
    cursor: u32,
    high_water: u32,
    unfilled: bool,
    outbound_reference: Option<ReferenceHandle>,
    base_address: Option<u32>,
}

impl RealRegion {
    /// Allocates a zeroed buffer of `capacity` bytes (already rounded up to a
    /// multiple of [`REGION_ALIGNMENT`] by the caller).
    pub fn new(capacity: u32, unfilled: bool, outbound_reference: Option<ReferenceHandle>) -> Self {
        debug_assert_eq!(capacity % REGION_ALIGNMENT, 0);
        Self {
            buffer: vec![0u8; capacity as usize],
            cursor: 0,
            high_water: 0,
            unfilled,
            outbound_reference,
            base_address: None,
        }
    }

    /// Fixed capacity, in bytes, set at construction.
    pub fn capacity(&self) -> u32 {
        self.buffer.len() as u32
    }

    /// Bytes remaining between the write cursor and the end of the buffer.
    pub fn remaining(&self) -> u32 {
        self.capacity().saturating_sub(self.cursor)
    }

    /// Current write cursor, in bytes.
    pub fn write_pointer(&self) -> u32 {
        self.cursor
    }

    /// The maximum value the write cursor has ever held.
    pub fn max_write_pointer(&self) -> u32 {
        self.high_water
    }

    /// Whether this region is marked `unfilled` (filler zeroes in output;
    /// no writes are permitted through `SET_WR_PTR`/`WRITE`).
    pub fn unfilled(&self) -> bool {
        self.unfilled
    }

    /// The reference handle this region was declared referenceable under, if
    /// any.
    pub fn outbound_reference(&self) -> Option<ReferenceHandle> {
        self.outbound_reference
    }

    /// The base address assigned by the image assembler, if execution has
    /// terminated and base addresses have been assigned.
    pub fn base_address(&self) -> Option<u32> {
        self.base_address
    }

    /// Assigns the base address computed by the image assembler.
    pub fn set_base_address(&mut self, address: u32) {
        self.base_address = Some(address);
    }

    /// Repositions the write cursor. The new cursor is not validated against
    /// capacity here — an out-of-bounds cursor only becomes visible the next
    /// time a write is attempted, which then fails with [`OutOfSpace`].
    pub fn set_write_pointer(&mut self, address: u32) {
        self.cursor = address;
        if address > self.high_water {
            self.high_water = address;
        }
    }

    /// Appends `bytes` at the cursor, advancing it and the high-water mark.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), OutOfSpace> {
        let requested = bytes.len() as u32;
        let remaining = self.remaining();
        if requested > remaining {
            return Err(OutOfSpace { requested, remaining });
        }

        let start = self.cursor as usize;
        let end = start + bytes.len();
        self.buffer[start..end].copy_from_slice(bytes);

        self.cursor += requested;
        if self.cursor > self.high_water {
            self.high_water = self.cursor;
        }

        Ok(())
    }

    /// Returns the first `word_count` little-endian 32-bit words, summed mod
    /// 2^32 — the checksum recorded in the output pointer table.
    pub fn checksum(&self, word_count: u32) -> u32 {
        self.buffer
            .chunks_exact(4)
            .take(word_count as usize)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .fold(0u32, |acc, word| acc.wrapping_add(word))
    }

    /// `ceil(high_water / 4)`, the word count recorded in the output pointer
    /// table.
    pub fn word_count(&self) -> u32 {
        self.high_water.div_ceil(4)
    }

    /// The full capacity-sized buffer, trailing bytes past the high-water
    /// mark are the buffer's default-zero content.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }
}

/// A region that holds no data of its own; it aliases the base address of
/// whichever real region declares the same reference handle.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceRegion {
    inbound_reference: ReferenceHandle,
    base_address: Option<u32>,
}

impl ReferenceRegion {
    /// Creates a reference region aliasing `handle`.
    pub fn new(handle: ReferenceHandle) -> Self {
        Self {
            inbound_reference: handle,
            base_address: None,
        }
    }

    /// The handle naming the real region this reference aliases.
    pub fn inbound_reference(&self) -> ReferenceHandle {
        self.inbound_reference
    }

    /// The resolved base address, if reference resolution has run.
    pub fn base_address(&self) -> Option<u32> {
        self.base_address
    }

    /// Records the resolved base address of the aliased real region.
    pub fn set_base_address(&mut self, address: u32) {
        self.base_address = Some(address);
    }
}

/// A filled region-table slot: either data-bearing or a placeholder resolved
/// to another region's base address.
#[derive(Debug, Clone)]
pub enum Region {
    /// A region with its own byte buffer.
    Real(RealRegion),
    /// A placeholder aliasing another region's base address.
    Reference(ReferenceRegion),
}

impl Region {
    /// The base address assigned to this slot, if any.
    pub fn base_address(&self) -> Option<u32> {
        match self {
            Self::Real(r) => r.base_address(),
            Self::Reference(r) => r.base_address(),
        }
    }

    /// A real region's data, if this slot holds one.
    pub fn as_real(&self) -> Option<&RealRegion> {
        match self {
            Self::Real(r) => Some(r),
            Self::Reference(_) => None,
        }
    }

    /// A real region's data, mutably, if this slot holds one.
    pub fn as_real_mut(&mut self) -> Option<&mut RealRegion> {
        match self {
            Self::Real(r) => Some(r),
            Self::Reference(_) => None,
        }
    }

    /// A reference region's data, if this slot holds one.
    pub fn as_reference(&self) -> Option<&ReferenceRegion> {
        match self {
            Self::Reference(r) => Some(r),
            Self::Real(_) => None,
        }
    }
}

/// The fixed 32-slot region table.
///
/// Each slot is filled at most once per execution, by `RESERVE` (a
/// [`RealRegion`]) or `REFERENCE` (a [`ReferenceRegion`]). Alongside the
/// slots themselves, the table tracks which slots were declared
/// referenceable (outbound) and which reference slots still need resolving
/// (inbound) — the bookkeeping the assembler's reference-resolution pass
/// consumes.
#[derive(Debug, Clone)]
pub struct RegionTable {
    slots: [Option<Region>; NUM_REGIONS],
    referenceable: Vec<u8>,
    to_fill: Vec<u8>,
}

impl RegionTable {
    /// An empty table: every slot unoccupied.
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
            referenceable: Vec::new(),
            to_fill: Vec::new(),
        }
    }

    /// The region occupying `slot`, if any.
    pub fn get(&self, slot: u8) -> Option<&Region> {
        self.slots[slot as usize].as_ref()
    }

    /// The region occupying `slot`, mutably, if any.
    pub fn get_mut(&mut self, slot: u8) -> Option<&mut Region> {
        self.slots[slot as usize].as_mut()
    }

    /// Installs a real region at `slot`. Fails with [`PanicReason::RegionInUse`]
    /// if the slot is already occupied.
    pub fn reserve(&mut self, slot: u8, region: RealRegion) -> Result<(), PanicReason> {
        if self.slots[slot as usize].is_some() {
            return Err(PanicReason::RegionInUse { slot });
        }
        if region.outbound_reference().is_some() {
            self.referenceable.push(slot);
        }
        self.slots[slot as usize] = Some(Region::Real(region));
        Ok(())
    }

    /// Installs a reference region at `slot`, recording it in the
    /// "regions to fill" list. Fails with [`PanicReason::RegionInUse`] if the
    /// slot is already occupied.
    pub fn install_reference(&mut self, slot: u8, handle: ReferenceHandle) -> Result<(), PanicReason> {
        if self.slots[slot as usize].is_some() {
            return Err(PanicReason::RegionInUse { slot });
        }
        self.slots[slot as usize] = Some(Region::Reference(ReferenceRegion::new(handle)));
        self.to_fill.push(slot);
        Ok(())
    }

    /// Slots declared referenceable, in RESERVE order.
    pub fn referenceable_regions(&self) -> impl Iterator<Item = u8> + '_ {
        self.referenceable.iter().copied()
    }

    /// Reference slots awaiting resolution, in REFERENCE order.
    pub fn regions_to_fill(&self) -> impl Iterator<Item = u8> + '_ {
        self.to_fill.iter().copied()
    }

    /// All slots in index order, filled or not.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Option<Region>)> {
        self.slots.iter().enumerate()
    }

    /// Sum of capacities of every real region in the table.
    pub fn total_space_allocated(&self) -> u32 {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref())
            .filter_map(Region::as_real)
            .map(RealRegion::capacity)
            .fold(0u32, |acc, cap| acc.saturating_add(cap))
    }
}

impl Default for RegionTable {
    fn default() -> Self {
        Self::new()
    }
}
