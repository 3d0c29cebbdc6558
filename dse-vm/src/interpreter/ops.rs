//! Concrete semantics of each supported opcode.

use alloc::vec;

use dse_asm::{Command, DataLength, ReferenceHandle};

use crate::error::PanicReason;
use crate::region::{round_up_to_alignment, RealRegion, Region};

use super::Vm;

impl Vm {
    pub(super) fn op_reserve(&mut self, command: Command) -> Result<(), PanicReason> {
        let referenceable = command.referenceable_flag();
        let expected_size = if referenceable { 3 } else { 2 };
        if command.size_words() != expected_size {
            return Err(PanicReason::MalformedInstruction(
                "RESERVE size field does not match referenceable flag",
            ));
        }

        let slot = command.region();
        let requested = self.read_u32()?;
        let signed = requested as i32;
        if signed < 0 || requested >= self.per_region_capacity_limit {
            return Err(PanicReason::RegionSizeOutOfBounds {
                size: signed,
                limit: self.per_region_capacity_limit,
            });
        }

        let handle = if referenceable {
            Some(ReferenceHandle::new(self.read_u32()?))
        } else {
            None
        };

        let capacity = round_up_to_alignment(requested);
        let region = RealRegion::new(capacity, command.unfilled_flag(), handle);
        self.regions.reserve(slot, region)
    }

    pub(super) fn op_reference(&mut self, command: Command) -> Result<(), PanicReason> {
        if command.size_words() != 2 {
            return Err(PanicReason::MalformedInstruction("REFERENCE size field must be 2"));
        }

        let slot = command.region();
        let handle = ReferenceHandle::new(self.read_u32()?);
        self.regions.install_reference(slot, handle)
    }

    /// Lenient about `unfilled` (per the spec's own "implementer may be
    /// lenient" allowance): any real region, filled or not, may become the
    /// current region. `SET_WR_PTR`/`WRITE`/`WRITE_ARRAY` are the ones that
    /// reject writes to an unfilled region.
    pub(super) fn op_switch_focus(&mut self, command: Command) -> Result<(), PanicReason> {
        let slot = match command.src1() {
            Some(src1) => self.registers[src1],
            None => (command.raw() >> 8) & 0xf,
        } as u8;

        match self.regions.get(slot) {
            Some(Region::Real(_)) => {
                self.current_region = Some(slot);
                Ok(())
            }
            Some(Region::Reference(_)) => Err(PanicReason::RegionUnfilled { slot }),
            None => Err(PanicReason::RegionNotAllocated { slot }),
        }
    }

    pub(super) fn op_set_wr_ptr(&mut self, command: Command) -> Result<(), PanicReason> {
        let slot = self.current_region.ok_or(PanicReason::NoRegionSelected)?;

        let addr = match command.src1() {
            Some(src1) => self.registers[src1],
            None => self.read_u32()?,
        };

        let region = self.writable_region(slot)?;
        let addr = if command.relative_flag() {
            addr.wrapping_add(region.write_pointer())
        } else {
            addr
        };

        region.set_write_pointer(addr);
        Ok(())
    }

    pub(super) fn op_mv(&mut self, command: Command) -> Result<(), PanicReason> {
        let dest = command
            .dest()
            .ok_or(PanicReason::MalformedInstruction("MV requires a dest register"))?;

        let value = match command.src1() {
            Some(src1) => self.registers[src1],
            None => self.read_u32()?,
        };

        self.registers[dest] = value;
        Ok(())
    }

    pub(super) fn op_write(&mut self, command: Command) -> Result<(), PanicReason> {
        let repeats = match command.src2() {
            Some(src2) => self.registers[src2],
            None => u32::from(command.repeats_immediate()),
        };

        let data_length = command.data_length();
        let width = data_length.as_bytes() as usize;

        let value: u64 = if let Some(src1) = command.src1() {
            u64::from(self.registers[src1])
        } else if command.size_words() == 2 && data_length != DataLength::Eight {
            u64::from(self.read_u32()?)
        } else if command.size_words() == 3 && data_length == DataLength::Eight {
            self.read_u64()?
        } else {
            return Err(PanicReason::MalformedInstruction("WRITE operand/size combination is invalid"));
        };

        let slot = self.current_region.ok_or(PanicReason::NoRegionSelected)?;
        let region = self.writable_region(slot)?;

        let value_bytes = value.to_le_bytes();
        let total = width
            .checked_mul(repeats as usize)
            .ok_or(PanicReason::MalformedInstruction("WRITE size overflow"))?;
        let mut data = vec![0u8; total];
        for chunk in data.chunks_exact_mut(width) {
            chunk.copy_from_slice(&value_bytes[..width]);
        }

        region.write(&data).map_err(|e| PanicReason::OutOfSpace {
            requested: e.requested,
            remaining: e.remaining,
            slot,
        })
    }

    pub(super) fn op_write_array(&mut self, _command: Command) -> Result<(), PanicReason> {
        let count = self.read_u32()?;
        let len = count
            .checked_mul(4)
            .ok_or(PanicReason::MalformedInstruction("WRITE_ARRAY length overflow"))?;
        let bytes = self.read_bytes(len)?.to_vec();

        let slot = self.current_region.ok_or(PanicReason::NoRegionSelected)?;
        let region = self.writable_region(slot)?;

        region.write(&bytes).map_err(|e| PanicReason::OutOfSpace {
            requested: e.requested,
            remaining: e.remaining,
            slot,
        })
    }

    pub(super) fn op_end_spec(&mut self, _command: Command) -> Result<(), PanicReason> {
        let sentinel = self.read_u32()? as i32;
        if sentinel != -1 {
            return Err(PanicReason::MalformedInstruction("END_SPEC sentinel must be -1"));
        }
        Ok(())
    }

    fn writable_region(&mut self, slot: u8) -> Result<&mut RealRegion, PanicReason> {
        match self.regions.get_mut(slot) {
            Some(Region::Real(region)) if !region.unfilled() => Ok(region),
            Some(_) => Err(PanicReason::RegionUnfilled { slot }),
            None => Err(PanicReason::RegionNotAllocated { slot }),
        }
    }
}
