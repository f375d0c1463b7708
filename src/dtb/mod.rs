// ABOUTME: Device tree blob parsing module built on a copyable token cursor
// ABOUTME: Provides no_std, allocation-free DTB validation and traversal

pub mod blob;
pub mod error;
pub mod header;
pub mod memory;
pub mod property;
pub mod tokens;
pub mod tree;

pub use blob::DeviceTreeBlob;
pub use error::{Block, DtbError};
pub use header::DtbHeader;
pub use memory::{MemoryReservation, MemoryReservations};
pub use property::{Cells, Property, PropertyInt, PropertyKind, StrIter};
pub use tokens::{DtbToken, TokenScanner};
pub use tree::{Children, CompatibleNodes, Node, NodeIterator, Properties};
