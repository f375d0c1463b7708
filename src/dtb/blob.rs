// ABOUTME: Top-level device tree blob handle: validated header plus borrowed bytes
// ABOUTME: Entry point for root access, reservations and /chosen and /cpus lookups

use super::error::DtbError;
use super::header::{DtbHeader, read_be_u32};
use super::memory::{MemoryReservation, MemoryReservations};
use super::tokens::TokenScanner;
use super::tree::{CompatibleNodes, Node, NodeIterator};
use core::ops::Range;

/// A validated device tree blob.
///
/// Opening checks the header once; everything else is decoded lazily from the
/// borrowed buffer, which must stay unmodified while any view into it lives.
#[derive(Debug, Clone, Copy)]
pub struct DeviceTreeBlob<'a> {
    data: &'a [u8],
    header: DtbHeader,
}

impl<'a> DeviceTreeBlob<'a> {
    /// Validate `data` and wrap it.
    ///
    /// Fails if the buffer is shorter than a header, the magic number is
    /// wrong, the declared total size differs from `data.len()`, or one of the
    /// blocks lies outside the blob.
    pub fn open(data: &'a [u8]) -> Result<Self, DtbError> {
        let header = DtbHeader::parse(data)
            .and_then(|header| header.validate(data.len()).map(|()| header))
            .inspect_err(|err| log::warn!("rejecting device tree blob: {err}"))?;

        log::debug!(
            "opened device tree blob: version {}, {} bytes, struct {:#x}+{:#x}, strings {:#x}+{:#x}",
            header.version,
            header.totalsize,
            header.off_dt_struct,
            header.size_dt_struct,
            header.off_dt_strings,
            header.size_dt_strings,
        );

        Ok(Self { data, header })
    }

    /// Open a blob that starts at `addr`, taking its length from the header.
    ///
    /// Only the magic number is checked before the `totalsize` field is
    /// trusted to size the buffer; the full validation of [`Self::open`]
    /// follows.
    ///
    /// # Safety
    ///
    /// `addr` must point to readable memory holding at least the first 8
    /// header bytes, and, if the magic number matches, to `totalsize` readable
    /// bytes that are not written for the whole lifetime `'a`. This is meant
    /// for firmware handing over a blob address in early boot.
    pub unsafe fn from_addr(addr: *const u8) -> Result<Self, DtbError> {
        // SAFETY: the caller guarantees the first 8 header bytes are readable.
        let prefix = unsafe { core::slice::from_raw_parts(addr, 8) };
        if read_be_u32(prefix, 0) != Some(DtbHeader::MAGIC) {
            log::warn!("no device tree blob magic at {addr:p}");
            return Err(DtbError::InvalidMagic);
        }
        let totalsize = read_be_u32(prefix, 4).ok_or(DtbError::MalformedHeader)?;

        // SAFETY: the caller guarantees `totalsize` bytes at `addr` stay
        // readable and unmodified for `'a`.
        let data = unsafe { core::slice::from_raw_parts(addr, totalsize as usize) };
        Self::open(data)
    }

    /// The validated header
    pub fn header(&self) -> &DtbHeader {
        &self.header
    }

    /// Get the underlying data slice
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Physical ID of the boot CPU
    pub fn boot_cpuid_phys(&self) -> u32 {
        self.header.boot_cpuid_phys
    }

    /// The structure block (token stream)
    pub fn structure_block(&self) -> &'a [u8] {
        &self.data[self.header.structure_range()]
    }

    /// The strings block (property names)
    pub fn strings_block(&self) -> &'a [u8] {
        &self.data[self.header.strings_range()]
    }

    /// Raw token scanner positioned at the start of the structure block
    pub fn tokens(&self) -> TokenScanner<'a> {
        TokenScanner::new(self.structure_block(), self.strings_block())
    }

    /// The root node
    pub fn root(&self) -> Result<Node<'a>, DtbError> {
        Node::at(self.tokens())
    }

    /// Entries of the memory reservation block
    pub fn memory_reservations(&self) -> MemoryReservations<'a> {
        MemoryReservations::new(&self.data[self.header.reservations_range()])
    }

    /// Every node in the tree, depth-first, starting with the root
    pub fn nodes(&self) -> NodeIterator<'a> {
        NodeIterator::new(self.tokens())
    }

    /// Find node by path (e.g., "/cpus/cpu@0").
    ///
    /// Components without a unit address also match on the base name, so
    /// "/cpus/cpu" finds the first CPU.
    pub fn find_node(&self, path: &str) -> Result<Option<Node<'a>>, DtbError> {
        let mut node = self.root()?;
        for component in path.split('/').filter(|c| !c.is_empty()) {
            match node.find_child(component)? {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }
        Ok(Some(node))
    }

    /// Find all nodes with a specific compatible string
    pub fn find_compatible_nodes<'c>(&self, compatible: &'c str) -> CompatibleNodes<'a, 'c> {
        CompatibleNodes::new(self.nodes(), compatible)
    }

    /// Physical range of the initial ramdisk, from `/chosen`.
    ///
    /// `linux,initrd-start` and `linux,initrd-end` may each be stored as a
    /// 32-bit or a 64-bit value.
    pub fn initrd_range(&self) -> Result<Option<Range<u64>>, DtbError> {
        let Some(chosen) = self.find_node("/chosen")? else {
            return Ok(None);
        };

        let address = |name: &str| -> Result<Option<u64>, DtbError> {
            Ok(chosen.property(name)?.and_then(|prop| {
                prop.as_u64().or_else(|| prop.as_u32().map(u64::from))
            }))
        };

        match (address("linux,initrd-start")?, address("linux,initrd-end")?) {
            (Some(start), Some(end)) if start <= end => Ok(Some(start..end)),
            _ => Ok(None),
        }
    }

    /// Kernel command line from `/chosen/bootargs`
    pub fn bootargs(&self) -> Result<Option<&'a str>, DtbError> {
        self.chosen_str("bootargs")
    }

    /// Console path from `/chosen/stdout-path`
    pub fn stdout_path(&self) -> Result<Option<&'a str>, DtbError> {
        self.chosen_str("stdout-path")
    }

    /// Get timebase frequency from the `/cpus` node or the first CPU carrying it
    pub fn timebase_frequency(&self) -> Result<Option<u32>, DtbError> {
        let Some(cpus) = self.find_node("/cpus")? else {
            return Ok(None);
        };

        if let Some(freq) = cpus.prop_u32("timebase-frequency")? {
            return Ok(Some(freq));
        }

        for cpu in cpus.children() {
            if let Some(freq) = cpu?.prop_u32("timebase-frequency")? {
                return Ok(Some(freq));
            }
        }

        Ok(None)
    }

    /// Whether an address falls inside any memory reservation
    pub fn is_reserved(&self, address: u64) -> bool {
        self.memory_reservations()
            .any(|r: MemoryReservation| (r.address..r.end()).contains(&address))
    }

    fn chosen_str(&self, name: &str) -> Result<Option<&'a str>, DtbError> {
        match self.find_node("/chosen")? {
            Some(chosen) => chosen.prop_str(name),
            None => Ok(None),
        }
    }
}
