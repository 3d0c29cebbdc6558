//! The virtual machine core: registers, the region table, and the
//! fetch-decode-execute loop.

mod assembler;
mod dispatch;
mod ops;

#[cfg(test)]
mod tests;

use alloc::vec::Vec;

use dse_asm::Command;

use crate::consts::NUM_REGIONS;
use crate::error::{ExecutionError, PanicReason};
use crate::region::{Region, RegionTable};
use crate::registers::Registers;

/// Outcome of dispatching a single decoded command to the fetch loop.
enum ExecuteState {
    /// Keep fetching.
    Continue,
    /// `END_SPEC` ran; stop the loop successfully.
    Terminated,
}

/// The data specification executor.
///
/// Owns the input byte stream, the read cursor into it, the register file,
/// and the region table. `execute` runs the fetch-decode-execute loop to
/// completion; `set_base_address` then assigns real-region base addresses
/// and resolves references, after which the image can be read out with
/// `emit_header`/`emit_pointer_table`/`emit_image`.
pub struct Vm {
    input: Vec<u8>,
    cursor: u32,
    registers: Registers,
    regions: RegionTable,
    current_region: Option<u8>,
    per_region_capacity_limit: u32,
}

impl Vm {
    /// Creates a VM over `input`. `per_region_capacity_limit` bounds every
    /// `RESERVE`'s requested size (exclusive upper bound).
    pub fn new(input: Vec<u8>, per_region_capacity_limit: u32) -> Self {
        Self {
            input,
            cursor: 0,
            registers: Registers::default(),
            regions: RegionTable::new(),
            current_region: None,
            per_region_capacity_limit,
        }
    }

    /// Runs the fetch-decode-execute loop to `END_SPEC` or the first
    /// failure. Partial region writes from a failed execution are left in
    /// place; nothing is rolled back.
    pub fn execute(&mut self) -> Result<(), ExecutionError> {
        loop {
            let offset = self.cursor;

            let state = self
                .step()
                .map_err(|reason| ExecutionError::at(offset, reason))?;

            if let ExecuteState::Terminated = state {
                return Ok(());
            }
        }
    }

    fn step(&mut self) -> Result<ExecuteState, PanicReason> {
        let word = self.read_u32()?;
        let command = Command::decode(word);
        self.dispatch(command)
    }

    /// The region at `slot`, if occupied.
    pub fn region(&self, slot: usize) -> Option<&Region> {
        if slot >= NUM_REGIONS {
            return None;
        }
        self.regions.get(slot as u8)
    }

    /// Every occupied slot, in index order.
    pub fn regions(&self) -> impl Iterator<Item = (usize, &Region)> {
        self.regions.iter().filter_map(|(i, slot)| slot.as_ref().map(|region| (i, region)))
    }

    /// Slots declared referenceable by `RESERVE`.
    pub fn referenceable_regions(&self) -> impl Iterator<Item = usize> + '_ {
        self.regions.referenceable_regions().map(usize::from)
    }

    /// Reference slots installed by `REFERENCE`, resolved or not.
    pub fn regions_to_fill(&self) -> impl Iterator<Item = usize> + '_ {
        self.regions.regions_to_fill().map(usize::from)
    }

    fn read_u32(&mut self) -> Result<u32, PanicReason> {
        let start = self.cursor as usize;
        let end = start
            .checked_add(4)
            .ok_or(PanicReason::MalformedInstruction("read past end of input"))?;
        let bytes = self
            .input
            .get(start..end)
            .ok_or(PanicReason::MalformedInstruction("unexpected end of input"))?;
        self.cursor = self.cursor.wrapping_add(4);
        Ok(u32::from_le_bytes(bytes.try_into().expect("slice of length 4")))
    }

    fn read_u64(&mut self) -> Result<u64, PanicReason> {
        let start = self.cursor as usize;
        let end = start
            .checked_add(8)
            .ok_or(PanicReason::MalformedInstruction("read past end of input"))?;
        let bytes = self
            .input
            .get(start..end)
            .ok_or(PanicReason::MalformedInstruction("unexpected end of input"))?;
        self.cursor = self.cursor.wrapping_add(8);
        Ok(u64::from_le_bytes(bytes.try_into().expect("slice of length 8")))
    }

    fn read_bytes(&mut self, len: u32) -> Result<&[u8], PanicReason> {
        let start = self.cursor as usize;
        let end = start
            .checked_add(len as usize)
            .ok_or(PanicReason::MalformedInstruction("array length overflow"))?;
        if end > self.input.len() {
            return Err(PanicReason::MalformedInstruction("unexpected end of input"));
        }
        self.cursor = self.cursor.wrapping_add(len);
        Ok(&self.input[start..end])
    }
}
