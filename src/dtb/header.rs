// ABOUTME: DTB header structure definitions, parsing and validation
// ABOUTME: Handles the 40-byte device tree blob header format

use super::error::{Block, DtbError};
use core::ops::Range;

/// DTB header structure (40 bytes total)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DtbHeader {
    /// Magic number (should be 0xd00dfeed)
    pub magic: u32,
    /// Total size of the DTB
    pub totalsize: u32,
    /// Offset to structure block
    pub off_dt_struct: u32,
    /// Offset to strings block
    pub off_dt_strings: u32,
    /// Offset to memory reservation block
    pub off_mem_rsvmap: u32,
    /// Version of the DTB format
    pub version: u32,
    /// Last compatible version
    pub last_comp_version: u32,
    /// Boot CPU ID
    pub boot_cpuid_phys: u32,
    /// Size of strings block
    pub size_dt_strings: u32,
    /// Size of structure block
    pub size_dt_struct: u32,
}

/// Read a big-endian u32 at `offset`, if the buffer is long enough
pub(crate) fn read_be_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes(bytes.try_into().ok()?))
}

/// Read a big-endian u64 at `offset`, if the buffer is long enough
pub(crate) fn read_be_u64(data: &[u8], offset: usize) -> Option<u64> {
    let bytes = data.get(offset..offset.checked_add(8)?)?;
    Some(u64::from_be_bytes(bytes.try_into().ok()?))
}

impl DtbHeader {
    /// DTB magic number constant
    pub const MAGIC: u32 = 0xd00d_feed;

    /// Header size in bytes
    pub const SIZE: usize = 40;

    /// Decode the header fields from the start of `input`.
    ///
    /// Only the length and the magic number are checked here; see
    /// [`DtbHeader::validate`] for the block layout checks.
    pub fn parse(input: &[u8]) -> Result<Self, DtbError> {
        if input.len() < Self::SIZE {
            return Err(DtbError::MalformedHeader);
        }

        let field = |index: usize| read_be_u32(input, index * 4).ok_or(DtbError::MalformedHeader);

        let magic = field(0)?;
        if magic != Self::MAGIC {
            return Err(DtbError::InvalidMagic);
        }

        Ok(DtbHeader {
            magic,
            totalsize: field(1)?,
            off_dt_struct: field(2)?,
            off_dt_strings: field(3)?,
            off_mem_rsvmap: field(4)?,
            version: field(5)?,
            last_comp_version: field(6)?,
            boot_cpuid_phys: field(7)?,
            size_dt_strings: field(8)?,
            size_dt_struct: field(9)?,
        })
    }

    /// Check the header against the length of the buffer it was read from.
    ///
    /// The total size must match exactly, the memory reservation block must
    /// start inside the blob, and both the structure and strings blocks must be
    /// fully contained in it.
    pub fn validate(&self, len: usize) -> Result<(), DtbError> {
        if self.totalsize as usize != len {
            return Err(DtbError::SizeMismatch {
                declared: self.totalsize,
                actual: len,
            });
        }

        if self.off_mem_rsvmap >= self.totalsize {
            return Err(DtbError::InvalidBlockRange(Block::MemoryReservation));
        }

        if !self.contains(self.off_dt_struct, self.size_dt_struct) {
            return Err(DtbError::InvalidBlockRange(Block::Structure));
        }

        if !self.contains(self.off_dt_strings, self.size_dt_strings) {
            return Err(DtbError::InvalidBlockRange(Block::Strings));
        }

        Ok(())
    }

    /// Byte range of the structure block
    pub fn structure_range(&self) -> Range<usize> {
        let start = self.off_dt_struct as usize;
        start..start + self.size_dt_struct as usize
    }

    /// Byte range of the strings block
    pub fn strings_range(&self) -> Range<usize> {
        let start = self.off_dt_strings as usize;
        start..start + self.size_dt_strings as usize
    }

    /// Byte range from the memory reservation block to the end of the blob
    pub fn reservations_range(&self) -> Range<usize> {
        self.off_mem_rsvmap as usize..self.totalsize as usize
    }

    fn contains(&self, offset: u32, size: u32) -> bool {
        offset
            .checked_add(size)
            .is_some_and(|end| end <= self.totalsize)
    }
}
