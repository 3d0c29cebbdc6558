//! VM and image-format parameters.

/// Number of region slots in the region table.
pub const NUM_REGIONS: usize = 32;

/// Number of general-purpose registers.
pub const NUM_REGISTERS: usize = 16;

/// Magic number at the start of an output image.
pub const IMAGE_MAGIC: u32 = 0xAD13_0AD6;

/// Version number at the start of an output image.
pub const IMAGE_VERSION: u32 = 0x0001_0000;

/// Size, in bytes, of the header (magic + version).
pub const HEADER_SIZE: u32 = 8;

/// Size, in bytes, of a single pointer-table entry (base, checksum, word count).
pub const POINTER_TABLE_ENTRY_SIZE: u32 = 12;

/// Size, in bytes, of the full pointer table (one entry per region slot).
pub const POINTER_TABLE_SIZE: u32 = POINTER_TABLE_ENTRY_SIZE * NUM_REGIONS as u32;

/// Size, in bytes, of the header plus pointer table, i.e. the offset at which
/// region data begins.
pub const TABLE_REGION_SIZE: u32 = HEADER_SIZE + POINTER_TABLE_SIZE;

/// Width, in bytes, of a region capacity's required alignment.
pub const REGION_ALIGNMENT: u32 = 4;
