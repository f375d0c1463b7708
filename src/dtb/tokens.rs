// ABOUTME: DTB structure block token definitions and the token scanner cursor
// ABOUTME: Decodes the big-endian token stream with 4-byte alignment, without allocating

use super::error::DtbError;
use super::header::read_be_u32;
use core::ffi::CStr;

/// A single decoded token of the structure block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtbToken<'a> {
    /// Start of a node
    BeginNode {
        /// Node name without the unit address
        name: &'a str,
        /// Unit address following the `@`, if present and hexadecimal
        unit_address: Option<u64>,
        /// Name as stored in the blob, including any `@unit-address` suffix
        full_name: &'a str,
    },
    /// End of the innermost open node
    EndNode,
    /// Property of the innermost open node
    Prop {
        /// Property name, resolved through the strings block
        name: &'a str,
        /// Raw property payload
        value: &'a [u8],
    },
    /// Placeholder, carries nothing
    Nop,
}

impl DtbToken<'_> {
    /// Begin node token constant
    pub const FDT_BEGIN_NODE: u32 = 0x00000001;
    /// End node token constant
    pub const FDT_END_NODE: u32 = 0x00000002;
    /// Property token constant
    pub const FDT_PROP: u32 = 0x00000003;
    /// No-op token constant
    pub const FDT_NOP: u32 = 0x00000004;
    /// End of structure token constant
    pub const FDT_END: u32 = 0x00000009;

    /// Calculate padding needed for 4-byte alignment
    pub fn calculate_padding(offset: usize) -> usize {
        (4 - (offset % 4)) % 4
    }

    /// Round `offset` up to the next token boundary
    pub fn align(offset: usize) -> usize {
        offset + Self::calculate_padding(offset)
    }
}

/// Split a node name into its base name and hexadecimal unit address.
///
/// `cpu@0` gives `("cpu", Some(0))`, `memory` gives `("memory", None)`. A unit
/// address that is not a plain hexadecimal number (`pci@1,0`) keeps the base
/// name but yields no numeric address.
pub fn split_node_name(full_name: &str) -> (&str, Option<u64>) {
    match full_name.split_once('@') {
        Some((name, unit)) => (name, u64::from_str_radix(unit, 16).ok()),
        None => (full_name, None),
    }
}

/// Forward-only cursor over the structure block.
///
/// The scanner is a plain value: copying it and advancing the copy leaves the
/// original where it was, which is how node and property iteration fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenScanner<'a> {
    structure: &'a [u8],
    strings: &'a [u8],
    offset: usize,
}

impl<'a> TokenScanner<'a> {
    /// Create a scanner positioned at the start of `structure`
    pub fn new(structure: &'a [u8], strings: &'a [u8]) -> Self {
        Self {
            structure,
            strings,
            offset: 0,
        }
    }

    /// Current offset within the structure block
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the cursor has run out of tokens
    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.structure.len()
    }

    /// Decode the next token.
    ///
    /// Returns `Ok(None)` once the block is exhausted or an `FDT_END` token is
    /// read. Unknown tags and out-of-bounds payloads are errors; the scanner
    /// never tries to resynchronize past them.
    pub fn next_token(&mut self) -> Result<Option<DtbToken<'a>>, DtbError> {
        if self.is_exhausted() {
            return Ok(None);
        }

        let start = self.offset;
        let tag = read_be_u32(self.structure, start)
            .ok_or(DtbError::TruncatedToken { offset: start })?;
        let mut cursor = start + 4;

        let token = match tag {
            DtbToken::FDT_BEGIN_NODE => {
                let full_name = read_cstr(self.structure, cursor)?;
                cursor = DtbToken::align(cursor + full_name.len() + 1);
                let (name, unit_address) = split_node_name(full_name);
                DtbToken::BeginNode {
                    name,
                    unit_address,
                    full_name,
                }
            }
            DtbToken::FDT_END_NODE => DtbToken::EndNode,
            DtbToken::FDT_PROP => {
                let truncated = DtbError::TruncatedToken { offset: start };
                let len = read_be_u32(self.structure, cursor).ok_or(truncated)? as usize;
                let name_offset = read_be_u32(self.structure, cursor + 4).ok_or(truncated)?;
                cursor += 8;

                let value = cursor
                    .checked_add(len)
                    .and_then(|end| self.structure.get(cursor..end))
                    .ok_or(truncated)?;
                cursor = DtbToken::align(cursor + len);

                let name = read_cstr(self.strings, name_offset as usize)?;
                DtbToken::Prop { name, value }
            }
            DtbToken::FDT_NOP => DtbToken::Nop,
            DtbToken::FDT_END => {
                log::trace!("end of structure block at 0x{start:x}");
                self.offset = self.structure.len();
                return Ok(None);
            }
            _ => {
                log::warn!("invalid token 0x{tag:08x} at structure offset 0x{start:x}");
                return Err(DtbError::InvalidToken { offset: start, tag });
            }
        };

        if cursor > self.structure.len() {
            // Padding after the last payload may be missing at the very end.
            cursor = self.structure.len();
        }
        self.offset = cursor;
        log::trace!("token at 0x{start:x}: {token:?}");
        Ok(Some(token))
    }
}

impl<'a> Iterator for TokenScanner<'a> {
    type Item = Result<DtbToken<'a>, DtbError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(err) => {
                self.offset = self.structure.len();
                Some(Err(err))
            }
        }
    }
}

/// Read a NUL-terminated UTF-8 string starting at `offset`
fn read_cstr(block: &[u8], offset: usize) -> Result<&str, DtbError> {
    let bytes = block
        .get(offset..)
        .ok_or(DtbError::InvalidName { offset })?;
    CStr::from_bytes_until_nul(bytes)
        .ok()
        .and_then(|name| name.to_str().ok())
        .ok_or(DtbError::InvalidName { offset })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn be(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    #[test]
    fn test_token_constants() {
        assert_eq!(DtbToken::FDT_BEGIN_NODE, 0x00000001);
        assert_eq!(DtbToken::FDT_END_NODE, 0x00000002);
        assert_eq!(DtbToken::FDT_PROP, 0x00000003);
        assert_eq!(DtbToken::FDT_NOP, 0x00000004);
        assert_eq!(DtbToken::FDT_END, 0x00000009);
    }

    #[test]
    fn test_calculate_padding() {
        assert_eq!(DtbToken::calculate_padding(0), 0);
        assert_eq!(DtbToken::calculate_padding(1), 3);
        assert_eq!(DtbToken::calculate_padding(2), 2);
        assert_eq!(DtbToken::calculate_padding(3), 1);
        assert_eq!(DtbToken::calculate_padding(4), 0);
        assert_eq!(DtbToken::calculate_padding(5), 3);
        assert_eq!(DtbToken::align(13), 16);
    }

    #[test]
    fn test_split_node_name() {
        assert_eq!(split_node_name("cpu@0"), ("cpu", Some(0)));
        assert_eq!(
            split_node_name("memory@80000000"),
            ("memory", Some(0x8000_0000))
        );
        assert_eq!(split_node_name("chosen"), ("chosen", None));
        assert_eq!(split_node_name("pci@1,0"), ("pci", None));
        assert_eq!(split_node_name(""), ("", None));
    }

    #[test]
    fn test_scan_begin_node_with_unit_address() {
        let mut data = be(&[DtbToken::FDT_BEGIN_NODE]);
        data.extend_from_slice(b"cpu@1f\0\0");
        data.extend(be(&[DtbToken::FDT_END_NODE, DtbToken::FDT_END]));

        let mut scanner = TokenScanner::new(&data, &[]);
        assert_eq!(
            scanner.next_token(),
            Ok(Some(DtbToken::BeginNode {
                name: "cpu",
                unit_address: Some(0x1f),
                full_name: "cpu@1f",
            }))
        );
        assert_eq!(scanner.offset(), 12);
        assert_eq!(scanner.next_token(), Ok(Some(DtbToken::EndNode)));
        assert_eq!(scanner.next_token(), Ok(None));
        assert_eq!(scanner.next_token(), Ok(None));
    }

    #[test]
    fn test_scan_property_resolves_name() {
        let strings = b"reg\0compatible\0";
        let mut data = be(&[DtbToken::FDT_PROP, 5, 4]);
        data.extend_from_slice(b"abcd\0\0\0\0");
        data.extend(be(&[DtbToken::FDT_NOP, DtbToken::FDT_END]));

        let mut scanner = TokenScanner::new(&data, strings);
        assert_eq!(
            scanner.next_token(),
            Ok(Some(DtbToken::Prop {
                name: "compatible",
                value: b"abcd\0",
            }))
        );
        assert_eq!(scanner.next_token(), Ok(Some(DtbToken::Nop)));
        assert_eq!(scanner.next_token(), Ok(None));
    }

    #[test]
    fn test_scan_invalid_tag_is_fatal() {
        let data = be(&[DtbToken::FDT_NOP, 0x12345678, DtbToken::FDT_END]);
        let mut scanner = TokenScanner::new(&data, &[]);

        assert_eq!(scanner.next_token(), Ok(Some(DtbToken::Nop)));
        assert_eq!(
            scanner.next_token(),
            Err(DtbError::InvalidToken {
                offset: 4,
                tag: 0x12345678
            })
        );
    }

    #[test]
    fn test_scan_truncated_property() {
        let mut data = be(&[DtbToken::FDT_PROP, 64, 0]);
        data.extend_from_slice(b"short\0\0\0");

        let mut scanner = TokenScanner::new(&data, b"reg\0");
        assert_eq!(
            scanner.next_token(),
            Err(DtbError::TruncatedToken { offset: 0 })
        );
    }

    #[test]
    fn test_scan_property_name_outside_strings_block() {
        let data = be(&[DtbToken::FDT_PROP, 0, 100]);
        let mut scanner = TokenScanner::new(&data, b"reg\0");
        assert_eq!(
            scanner.next_token(),
            Err(DtbError::InvalidName { offset: 100 })
        );
    }

    #[test]
    fn test_scan_unterminated_node_name() {
        let mut data = be(&[DtbToken::FDT_BEGIN_NODE]);
        data.extend_from_slice(b"node");

        let mut scanner = TokenScanner::new(&data, &[]);
        assert_eq!(
            scanner.next_token(),
            Err(DtbError::InvalidName { offset: 4 })
        );
    }

    #[test]
    fn test_scan_partial_tag() {
        let data = [0u8, 0, 0];
        let mut scanner = TokenScanner::new(&data, &[]);
        assert_eq!(
            scanner.next_token(),
            Err(DtbError::TruncatedToken { offset: 0 })
        );
    }

    #[test]
    fn test_copied_scanner_is_independent() {
        let data = be(&[DtbToken::FDT_NOP, DtbToken::FDT_END_NODE, DtbToken::FDT_END]);
        let mut original = TokenScanner::new(&data, &[]);
        assert_eq!(original.next_token(), Ok(Some(DtbToken::Nop)));

        let mut fork = original;
        assert_eq!(fork.next_token(), Ok(Some(DtbToken::EndNode)));
        assert_eq!(fork.next_token(), Ok(None));

        assert_eq!(original.offset(), 4);
        assert_eq!(original.next_token(), Ok(Some(DtbToken::EndNode)));
    }

    #[test]
    fn test_iterator_fuses_after_error() {
        let data = be(&[DtbToken::FDT_NOP, 0xdead_beef, DtbToken::FDT_NOP]);
        let tokens: Vec<_> = TokenScanner::new(&data, &[]).collect();
        assert_eq!(
            tokens,
            [
                Ok(DtbToken::Nop),
                Err(DtbError::InvalidToken {
                    offset: 4,
                    tag: 0xdead_beef
                })
            ]
        );
    }
}
