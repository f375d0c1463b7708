// ABOUTME: Error types for device tree blob parsing
// ABOUTME: Provides no_std compatible error handling for DTB operations

use core::fmt;

/// Blocks of a DTB whose placement is validated when the blob is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    /// Memory reservation block
    MemoryReservation,
    /// Structure block (token stream)
    Structure,
    /// Strings block (property names)
    Strings,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::MemoryReservation => write!(f, "memory reservation"),
            Block::Structure => write!(f, "structure"),
            Block::Strings => write!(f, "strings"),
        }
    }
}

/// Main error type for DTB parsing operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtbError {
    /// Buffer is too small to hold a DTB header
    MalformedHeader,
    /// Invalid magic number in DTB header
    InvalidMagic,
    /// Declared total size differs from the buffer length
    SizeMismatch {
        /// `totalsize` field of the header
        declared: u32,
        /// Length of the buffer handed to the parser
        actual: usize,
    },
    /// A block lies (partly) outside the blob
    InvalidBlockRange(Block),
    /// Unrecognized token tag in structure block
    InvalidToken {
        /// Offset of the tag, relative to the structure block
        offset: usize,
        /// Raw tag value
        tag: u32,
    },
    /// A token's payload would read past the end of its block
    TruncatedToken {
        /// Offset of the token, relative to the structure block
        offset: usize,
    },
    /// A node or property name is not NUL-terminated or not UTF-8
    InvalidName {
        /// Offset of the name within its block
        offset: usize,
    },
    /// The structure block does not start with a node
    MissingRootNode,
    /// Writing to a dump sink failed
    Format,
}

impl fmt::Display for DtbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DtbError::MalformedHeader => write!(f, "Buffer too small for DTB header"),
            DtbError::InvalidMagic => write!(f, "Invalid magic number in DTB header"),
            DtbError::SizeMismatch { declared, actual } => write!(
                f,
                "DTB total size mismatch: header declares {declared} bytes, buffer holds {actual}"
            ),
            DtbError::InvalidBlockRange(block) => {
                write!(f, "Invalid {block} block range in DTB header")
            }
            DtbError::InvalidToken { offset, tag } => write!(
                f,
                "Invalid token 0x{tag:08x} at structure offset 0x{offset:x}"
            ),
            DtbError::TruncatedToken { offset } => write!(
                f,
                "Token at structure offset 0x{offset:x} runs past the end of its block"
            ),
            DtbError::InvalidName { offset } => {
                write!(f, "Invalid name at offset 0x{offset:x}")
            }
            DtbError::MissingRootNode => write!(f, "Structure block has no root node"),
            DtbError::Format => write!(f, "Failed to write device tree dump"),
        }
    }
}

impl From<fmt::Error> for DtbError {
    fn from(_: fmt::Error) -> Self {
        DtbError::Format
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DtbError {}
