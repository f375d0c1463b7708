// ABOUTME: Cursor-based Flattened Devicetree reader for early boot environments
// ABOUTME: Validates the DTB header once, then walks nodes and properties lazily in place

//! # fdt_cursor
//!
//! Read Flattened Devicetree (DTB) blobs without allocating. The blob is
//! validated once when opened; nodes and properties are then decoded on demand
//! straight from the borrowed buffer, so the crate works before a heap exists.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # use fdt_cursor::{DeviceTreeBlob, DtbError};
//! # fn main() -> Result<(), DtbError> {
//! let dtb_data = std::fs::read("path/to/your.dtb").unwrap();
//!
//! let blob = DeviceTreeBlob::open(&dtb_data)?;
//! let root = blob.root()?;
//!
//! for child in root.children() {
//!     let child = child?;
//!     println!("Node: {}", child.full_name());
//!
//!     if let Some(reg) = child.property("reg")? {
//!         println!("  {reg}");
//!     }
//! }
//!
//! if let Some(initrd) = blob.initrd_range()? {
//!     println!("initrd at {:#x}..{:#x}", initrd.start, initrd.end);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Main Types
//!
//! - [`DeviceTreeBlob`] - Validated blob, entry point for everything else
//! - [`Node`] - Cursor positioned at a node, iterates properties and children
//! - [`Property`] - Borrowed property with type sniffing and typed accessors
//! - [`TokenScanner`] - Raw structure block token cursor
//! - [`DtbHeader`] - DTB file header information
//! - [`MemoryReservation`] - Memory reservation entries
//!
//! Traversal never caches: each call to [`Node::properties`] or
//! [`Node::children`] re-scans from the node's position. Corrupt tokens are
//! reported as [`DtbError`] items and end the scan in progress.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod dtb;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use dtb::{
    Block, Cells, Children, CompatibleNodes, DeviceTreeBlob, DtbError, DtbHeader, DtbToken,
    MemoryReservation, MemoryReservations, Node, NodeIterator, Properties, Property, PropertyInt,
    PropertyKind, StrIter, TokenScanner,
};

// Re-export utility functions
pub use dtb::tokens::split_node_name;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_empty_buffer() {
        assert_eq!(
            DeviceTreeBlob::open(&[]).unwrap_err(),
            DtbError::MalformedHeader
        );
    }
}
