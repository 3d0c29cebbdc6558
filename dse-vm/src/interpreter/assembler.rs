//! Post-execution image assembly: base-address assignment, reference
//! resolution, and header/pointer-table/data emission.

use alloc::vec::Vec;

use dse_asm::ReferenceHandle;

use crate::consts::{NUM_REGIONS, TABLE_REGION_SIZE};
use crate::region::Region;

use super::Vm;

impl Vm {
    /// Assigns base addresses to every real region (in slot order, starting
    /// at `start + 392`) and resolves every reference slot against them.
    /// Idempotent: calling this twice with the same `start` reproduces
    /// identical bases and pointer-table contents.
    #[tracing::instrument(name = "assemble.set_base_address", skip(self))]
    pub fn set_base_address(&mut self, start: u32) {
        let mut offset = TABLE_REGION_SIZE;
        for slot in 0..NUM_REGIONS as u8 {
            if let Some(Region::Real(region)) = self.regions.get_mut(slot) {
                let base = start.wrapping_add(offset);
                tracing::trace!(slot, base, capacity = region.capacity(), "assigned region base address");
                region.set_base_address(base);
                offset = offset.wrapping_add(region.capacity());
            }
        }

        let resolved: Vec<(u8, u32)> = self
            .regions
            .regions_to_fill()
            .filter_map(|slot| {
                let handle = self.regions.get(slot)?.as_reference()?.inbound_reference();
                let base = self.resolve_outbound_base(handle)?;
                Some((slot, base))
            })
            .collect();

        for (slot, base) in resolved {
            tracing::trace!(slot, base, "resolved reference region base address");
            if let Some(Region::Reference(reference)) = self.regions.get_mut(slot) {
                reference.set_base_address(base);
            }
        }
    }

    fn resolve_outbound_base(&self, handle: ReferenceHandle) -> Option<u32> {
        self.regions.iter().find_map(|(_, slot)| {
            let region = slot.as_ref()?.as_real()?;
            if region.outbound_reference() == Some(handle) {
                region.base_address()
            } else {
                None
            }
        })
    }

    /// Sum of capacities of every real region.
    pub fn total_space_allocated(&self) -> u32 {
        self.regions.total_space_allocated()
    }

    /// `392 + total_space_allocated()`: the length of the image `emit_image`
    /// produces.
    pub fn constructed_data_size(&self) -> u32 {
        TABLE_REGION_SIZE.wrapping_add(self.total_space_allocated())
    }

    /// Appends the 8-byte magic+version header.
    #[tracing::instrument(name = "assemble.emit_header", skip_all)]
    pub fn emit_header(&self, buffer: &mut Vec<u8>) {
        tracing::trace!(magic = crate::consts::IMAGE_MAGIC, version = crate::consts::IMAGE_VERSION, "emitting header");
        buffer.extend_from_slice(&crate::consts::IMAGE_MAGIC.to_le_bytes());
        buffer.extend_from_slice(&crate::consts::IMAGE_VERSION.to_le_bytes());
    }

    /// Appends the 32-entry, 12-bytes-per-slot pointer table.
    #[tracing::instrument(name = "assemble.emit_pointer_table", skip_all)]
    pub fn emit_pointer_table(&self, buffer: &mut Vec<u8>) {
        tracing::trace!("emitting pointer table");
        for slot in 0..NUM_REGIONS as u8 {
            let (base, checksum, word_count) = match self.regions.get(slot) {
                None => (0, 0, 0),
                Some(Region::Reference(reference)) => (reference.base_address().unwrap_or(0), 0, 0),
                Some(Region::Real(region)) => {
                    let word_count = region.word_count();
                    (region.base_address().unwrap_or(0), region.checksum(word_count), word_count)
                }
            };

            buffer.extend_from_slice(&base.to_le_bytes());
            buffer.extend_from_slice(&checksum.to_le_bytes());
            buffer.extend_from_slice(&word_count.to_le_bytes());
        }
    }

    /// Header, pointer table, and concatenated region data in one buffer —
    /// the finalized image an uploader writes verbatim to target SDRAM.
    #[tracing::instrument(name = "assemble.emit_image", skip(self))]
    pub fn emit_image(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.constructed_data_size() as usize);
        self.emit_header(&mut buffer);
        self.emit_pointer_table(&mut buffer);

        for slot in 0..NUM_REGIONS as u8 {
            if let Some(Region::Real(region)) = self.regions.get(slot) {
                buffer.extend_from_slice(region.buffer());
            }
        }

        tracing::trace!(image_len = buffer.len(), "assembled final image");
        buffer
    }
}
