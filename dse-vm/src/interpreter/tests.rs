use alloc::vec::Vec;

use crate::error::PanicReason;
use crate::region::Region;

use super::Vm;

const OP_BREAK: u32 = 0x00;
const OP_NOP: u32 = 0x01;
const OP_RESERVE: u32 = 0x02;
const OP_SWITCH_FOCUS: u32 = 0x50;
const OP_WRITE: u32 = 0x42;
const OP_WRITE_ARRAY: u32 = 0x43;
const OP_MV: u32 = 0x60;
const OP_SET_WR_PTR: u32 = 0x64;
const OP_END_SPEC: u32 = 0xff;

const DEST_FLAG: u32 = 1 << 18;
const SRC1_FLAG: u32 = 1 << 17;
const SRC2_FLAG: u32 = 1 << 16;
const UNFILLED_FLAG: u32 = 1 << 7;

fn command(size_words: u32, opcode: u32, fields: u32) -> u32 {
    ((size_words - 1) << 30) | (opcode << 20) | fields
}

struct Program(Vec<u8>);

impl Program {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn word(mut self, word: u32) -> Self {
        self.0.extend_from_slice(&word.to_le_bytes());
        self
    }

    fn end_spec(self) -> Self {
        self.word(command(2, OP_END_SPEC, 0)).word(0xFFFF_FFFF)
    }

    fn bytes(self) -> Vec<u8> {
        self.0
    }
}

fn reserve(slot: u32, size: u32, fields: u32) -> (u32, u32) {
    (command(2, OP_RESERVE, fields | slot), size)
}

#[test]
fn empty_spec_terminates_cleanly() {
    let mut vm = Vm::new(Program::new().end_spec().bytes(), 0x1_0000);
    vm.execute().unwrap();
    assert_eq!(vm.total_space_allocated(), 0);
}

#[test]
fn nop_has_no_effect_on_registers() {
    let bytes = Program::new().word(command(1, OP_NOP, 0)).end_spec().bytes();
    let mut vm = Vm::new(bytes, 0x1_0000);
    vm.execute().unwrap();
}

#[test]
fn break_fails_with_break_hit() {
    let bytes = Program::new().word(command(1, OP_BREAK, 0)).bytes();
    let mut vm = Vm::new(bytes, 0x1_0000);
    let err = vm.execute().unwrap_err();
    assert_eq!(err.reason, PanicReason::BreakHit);
    assert_eq!(err.offset, 0);
}

#[test]
fn unknown_opcode_fails() {
    let bytes = Program::new().word(command(1, 0x7e, 0)).bytes();
    let mut vm = Vm::new(bytes, 0x1_0000);
    let err = vm.execute().unwrap_err();
    assert_eq!(err.reason, PanicReason::UnknownOpcode { opcode: 0x7e });
}

#[test]
fn declared_but_unimplemented_opcode_fails_distinctly_from_unknown() {
    // 0x04 is one of the upstream format's arithmetic/ALU opcodes: declared,
    // but this VM has no handler for it.
    let bytes = Program::new().word(command(1, 0x04, 0)).bytes();
    let mut vm = Vm::new(bytes, 0x1_0000);
    let err = vm.execute().unwrap_err();
    assert_eq!(err.reason, PanicReason::UnimplementedOpcode { opcode: 0x04 });
}

#[test]
fn reserve_of_zero_bytes_succeeds_but_rejects_any_write() {
    let (header, size) = reserve(0, 0, 0);
    let bytes = Program::new()
        .word(header)
        .word(size)
        .word(command(1, OP_SWITCH_FOCUS, SRC1_FLAG | (0 << 8)))
        .word(command(1, OP_WRITE, SRC1_FLAG | 1))
        .bytes();

    let mut vm = Vm::new(bytes, 0x1_0000);
    let err = vm.execute().unwrap_err();
    assert!(matches!(err.reason, PanicReason::OutOfSpace { requested: 1, remaining: 0, slot: 0 }));
}

#[test]
fn reserve_rounds_size_up_to_multiple_of_four() {
    let (header, size) = reserve(0, 5, 0);
    let bytes = Program::new().word(header).word(size).end_spec().bytes();

    let mut vm = Vm::new(bytes, 0x1_0000);
    vm.execute().unwrap();

    let Some(Region::Real(region)) = vm.region(0) else {
        panic!("slot 0 should be a real region");
    };
    assert_eq!(region.capacity(), 8);
}

#[test]
fn reserve_in_use_slot_fails() {
    let (header, size) = reserve(0, 4, 0);
    let (header2, size2) = reserve(0, 8, 0);
    let bytes = Program::new().word(header).word(size).word(header2).word(size2).bytes();

    let mut vm = Vm::new(bytes, 0x1_0000);
    let err = vm.execute().unwrap_err();
    assert_eq!(err.reason, PanicReason::RegionInUse { slot: 0 });
}

#[test]
fn reserve_size_out_of_bounds_fails() {
    let (header, size) = reserve(0, 0x1_0000, 0);
    let bytes = Program::new().word(header).word(size).bytes();

    let mut vm = Vm::new(bytes, 0x1_0000);
    let err = vm.execute().unwrap_err();
    assert_eq!(err.reason, PanicReason::RegionSizeOutOfBounds { size: 0x1_0000, limit: 0x1_0000 });
}

#[test]
fn switch_focus_to_unoccupied_slot_fails() {
    let bytes = Program::new().word(command(1, OP_SWITCH_FOCUS, SRC1_FLAG | (3 << 8))).bytes();
    let mut vm = Vm::new(bytes, 0x1_0000);
    let err = vm.execute().unwrap_err();
    assert_eq!(err.reason, PanicReason::RegionNotAllocated { slot: 3 });
}

#[test]
fn write_before_switch_focus_fails_with_no_region_selected() {
    let bytes = Program::new().word(command(1, OP_WRITE, SRC1_FLAG | 0)).bytes();
    let mut vm = Vm::new(bytes, 0x1_0000);
    let err = vm.execute().unwrap_err();
    assert_eq!(err.reason, PanicReason::NoRegionSelected);
}

#[test]
fn write_with_zero_repeats_is_a_no_op() {
    let (header, size) = reserve(0, 4, 0);
    let bytes = Program::new()
        .word(header)
        .word(size)
        .word(command(1, OP_SWITCH_FOCUS, SRC1_FLAG | (0 << 8)))
        .word(command(2, OP_WRITE, 0))
        .word(0xDEAD_BEEF)
        .end_spec()
        .bytes();

    // repeats field (no src2 flag, low byte of the command word) is 0.
    let mut vm = Vm::new(bytes, 0x1_0000);
    vm.execute().unwrap();

    let Some(Region::Real(region)) = vm.region(0) else {
        panic!("slot 0 should be a real region");
    };
    assert_eq!(region.max_write_pointer(), 0);
}

#[test]
fn mv_immediate_then_write_uses_register_value() {
    let (header, size) = reserve(0, 4, 0);
    let bytes = Program::new()
        .word(header)
        .word(size)
        .word(command(2, OP_MV, DEST_FLAG | (5 << 12)))
        .word(0x1234_5678)
        .word(command(1, OP_SWITCH_FOCUS, SRC1_FLAG | (0 << 8)))
        .word(command(1, OP_WRITE, SRC1_FLAG | (5 << 8) | (2 << 12) | 1))
        .end_spec()
        .bytes();

    let mut vm = Vm::new(bytes, 0x1_0000);
    vm.execute().unwrap();

    let Some(Region::Real(region)) = vm.region(0) else {
        panic!("slot 0 should be a real region");
    };
    assert_eq!(region.buffer()[..4], 0x1234_5678u32.to_le_bytes());
}

#[test]
fn write_repeats_from_src2_register() {
    let (header, size) = reserve(0, 8, 0);
    let bytes = Program::new()
        .word(header)
        .word(size)
        .word(command(2, OP_MV, DEST_FLAG | (1 << 12)))
        .word(2)
        .word(command(1, OP_SWITCH_FOCUS, SRC1_FLAG | (0 << 8)))
        .word(command(2, OP_WRITE, SRC2_FLAG | (1 << 4)))
        .word(0xAB)
        .end_spec()
        .bytes();

    let mut vm = Vm::new(bytes, 0x1_0000);
    vm.execute().unwrap();

    let Some(Region::Real(region)) = vm.region(0) else {
        panic!("slot 0 should be a real region");
    };
    assert_eq!(region.max_write_pointer(), 2);
    assert_eq!(&region.buffer()[0..2], &[0xAB, 0xAB]);
}

#[test]
fn write_array_appends_verbatim_bytes() {
    let (header, size) = reserve(0, 8, 0);
    let bytes = Program::new()
        .word(header)
        .word(size)
        .word(command(1, OP_SWITCH_FOCUS, SRC1_FLAG | (0 << 8)))
        .word(command(2, OP_WRITE_ARRAY, 0))
        .word(2)
        .word(0x1111_1111)
        .word(0x2222_2222)
        .end_spec()
        .bytes();

    let mut vm = Vm::new(bytes, 0x1_0000);
    vm.execute().unwrap();

    let Some(Region::Real(region)) = vm.region(0) else {
        panic!("slot 0 should be a real region");
    };
    assert_eq!(region.max_write_pointer(), 8);
    assert_eq!(&region.buffer()[0..4], &0x1111_1111u32.to_le_bytes());
    assert_eq!(&region.buffer()[4..8], &0x2222_2222u32.to_le_bytes());
}

#[test]
fn set_wr_ptr_relative_with_no_prior_write_lands_at_addr() {
    let (header, size) = reserve(0, 16, 0);
    let bytes = Program::new()
        .word(header)
        .word(size)
        .word(command(1, OP_SWITCH_FOCUS, SRC1_FLAG | (0 << 8)))
        .word(command(2, OP_SET_WR_PTR, 1))
        .word(3)
        .end_spec()
        .bytes();

    let mut vm = Vm::new(bytes, 0x1_0000);
    vm.execute().unwrap();

    let Some(Region::Real(region)) = vm.region(0) else {
        panic!("slot 0 should be a real region");
    };
    assert_eq!(region.write_pointer(), 3);
}

#[test]
fn switch_focus_accepts_an_unfilled_region_but_set_wr_ptr_rejects_it() {
    let (header, size) = reserve(0, 16, UNFILLED_FLAG);
    let bytes = Program::new()
        .word(header)
        .word(size)
        .word(command(1, OP_SWITCH_FOCUS, SRC1_FLAG | (0 << 8)))
        .word(command(2, OP_SET_WR_PTR, 1))
        .word(3)
        .bytes();

    let mut vm = Vm::new(bytes, 0x1_0000);
    let err = vm.execute().unwrap_err();
    assert_eq!(err.reason, PanicReason::RegionUnfilled { slot: 0 });
}

#[test]
fn end_spec_requires_minus_one_sentinel() {
    let bytes = Program::new().word(command(2, OP_END_SPEC, 0)).word(0).bytes();
    let mut vm = Vm::new(bytes, 0x1_0000);
    let err = vm.execute().unwrap_err();
    assert!(matches!(err.reason, PanicReason::MalformedInstruction(_)));
}
