// ABOUTME: Memory reservation block parsing for device tree blobs
// ABOUTME: Lazily decodes (address, size) pairs up to the all-zero terminator

use super::header::read_be_u64;
use core::iter::FusedIterator;
use core::slice::ChunksExact;

/// Memory reservation entry with address and size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReservation {
    /// Physical address of reserved memory region
    pub address: u64,
    /// Size of reserved memory region
    pub size: u64,
}

impl MemoryReservation {
    /// Size of each reservation entry in bytes (address + size)
    pub const SIZE: usize = 16;

    /// First address past the reserved region
    pub fn end(&self) -> u64 {
        self.address.saturating_add(self.size)
    }

    fn is_terminator(&self) -> bool {
        self.address == 0 && self.size == 0
    }
}

/// Iterator over the memory reservation block.
///
/// Stops at the first all-zero entry (which is not yielded) or when the blob
/// ends, whichever comes first.
#[derive(Debug, Clone)]
pub struct MemoryReservations<'a> {
    entries: ChunksExact<'a, u8>,
    done: bool,
}

impl<'a> MemoryReservations<'a> {
    /// Iterate over the entries stored at the start of `input`
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            entries: input.chunks_exact(MemoryReservation::SIZE),
            done: false,
        }
    }
}

impl Iterator for MemoryReservations<'_> {
    type Item = MemoryReservation;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let entry = self.entries.next().and_then(|chunk| {
            Some(MemoryReservation {
                address: read_be_u64(chunk, 0)?,
                size: read_be_u64(chunk, 8)?,
            })
        });

        match entry {
            Some(entry) if !entry.is_terminator() => Some(entry),
            _ => {
                self.done = true;
                None
            }
        }
    }
}

impl FusedIterator for MemoryReservations<'_> {}
