// ABOUTME: Device tree property view with type sniffing and typed accessors
// ABOUTME: Borrows the raw payload from the blob; nothing is decoded until asked for

use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::slice::ChunksExact;

/// Kind of payload a property most likely holds, as guessed by [`Property::sniff`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// No payload, or a single NUL byte
    Empty,
    /// One or more NUL-terminated printable strings
    String,
    /// Array of big-endian 32-bit cells
    Regs32,
    /// Array of big-endian 64-bit cells
    Regs64,
    /// Anything else
    Bytes,
}

/// Fixed-width integers that can be read from a big-endian property payload
pub trait PropertyInt: Sized {
    /// Encoded width in bytes
    const SIZE: usize;

    /// Decode from exactly [`Self::SIZE`] big-endian bytes
    fn from_be_slice(bytes: &[u8]) -> Option<Self>;
}

macro_rules! impl_property_int {
    ($($ty:ty),*) => {
        $(
            impl PropertyInt for $ty {
                const SIZE: usize = core::mem::size_of::<$ty>();

                fn from_be_slice(bytes: &[u8]) -> Option<Self> {
                    Some(<$ty>::from_be_bytes(bytes.try_into().ok()?))
                }
            }
        )*
    };
}

impl_property_int!(u8, u16, u32, u64, i32, i64);

/// A single property of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Property<'a> {
    /// Property name, resolved through the strings block
    pub name: &'a str,
    /// Raw payload
    pub value: &'a [u8],
}

impl<'a> Property<'a> {
    /// Guess the payload type.
    ///
    /// Checks run in a fixed order: empty, string, 32-bit cells, 64-bit
    /// cells, bytes. Every length divisible by 8 is divisible by 4 as well,
    /// so in practice [`PropertyKind::Regs64`] is never returned; callers
    /// that know a property holds 64-bit values should use [`Self::as_u64`].
    pub fn sniff(&self) -> PropertyKind {
        let value = self.value;
        if value.is_empty() || value == [0] {
            PropertyKind::Empty
        } else if is_string_list(value) {
            PropertyKind::String
        } else if value.len() % 4 == 0 {
            PropertyKind::Regs32
        } else if value.len() % 8 == 0 {
            PropertyKind::Regs64
        } else {
            PropertyKind::Bytes
        }
    }

    /// Payload as 32-bit cells; empty unless [`Self::sniff`] says `Regs32`
    pub fn regs32(&self) -> Cells<'a, u32> {
        match self.sniff() {
            PropertyKind::Regs32 => Cells::new(self.value),
            _ => Cells::new(&[]),
        }
    }

    /// Payload as 64-bit cells; empty unless [`Self::sniff`] says `Regs64`
    pub fn regs64(&self) -> Cells<'a, u64> {
        match self.sniff() {
            PropertyKind::Regs64 => Cells::new(self.value),
            _ => Cells::new(&[]),
        }
    }

    /// Decode the payload as a single big-endian value of exactly `T`'s width
    pub fn as_value<T: PropertyInt>(&self) -> Option<T> {
        if self.value.len() != T::SIZE {
            return None;
        }
        T::from_be_slice(self.value)
    }

    /// Payload as a single u32
    pub fn as_u32(&self) -> Option<u32> {
        self.as_value()
    }

    /// Payload as a single u64
    pub fn as_u64(&self) -> Option<u64> {
        self.as_value()
    }

    /// Strings of a string-list payload; empty unless [`Self::sniff`] says `String`
    pub fn iter_str(&self) -> StrIter<'a> {
        match self.sniff() {
            // Drop the final NUL so it does not produce a trailing empty entry
            PropertyKind::String => StrIter::new(&self.value[..self.value.len() - 1]),
            _ => StrIter::new(&[]),
        }
    }

    /// First string of a string-list payload
    pub fn as_str(&self) -> Option<&'a str> {
        self.iter_str().next()
    }
}

impl fmt::Display for Property<'_> {
    /// Render in devicetree source syntax, e.g. `reg = <0x1000 0x100>;`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        match self.sniff() {
            PropertyKind::Empty => {}
            PropertyKind::String => {
                write!(f, " = ")?;
                for (i, s) in self.iter_str().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\"", s.escape_default())?;
                }
            }
            PropertyKind::Regs32 => {
                write!(f, " = <")?;
                write_cells(f, self.regs32())?;
                write!(f, ">")?;
            }
            PropertyKind::Regs64 => {
                write!(f, " = /bits/ 64 <")?;
                write_cells(f, self.regs64())?;
                write!(f, ">")?;
            }
            PropertyKind::Bytes => {
                write!(f, " = [")?;
                for (i, byte) in self.value.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{byte:02x}")?;
                }
                write!(f, "]")?;
            }
        }
        write!(f, ";")
    }
}

fn write_cells<T: fmt::LowerHex>(
    f: &mut fmt::Formatter<'_>,
    cells: impl Iterator<Item = T>,
) -> fmt::Result {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{cell:#x}")?;
    }
    Ok(())
}

/// True for payloads made of NUL-terminated printable ASCII runs
fn is_string_list(data: &[u8]) -> bool {
    let Some((&last, body)) = data.split_last() else {
        return false;
    };

    last == 0
        && body.iter().all(|&b| b == 0 || is_printable(b))
        && body.iter().any(|&b| is_printable(b))
}

fn is_printable(byte: u8) -> bool {
    (0x20..=0x7e).contains(&byte)
}

/// Iterator over big-endian cells of a property payload
#[derive(Debug, Clone)]
pub struct Cells<'a, T> {
    chunks: ChunksExact<'a, u8>,
    _marker: PhantomData<T>,
}

impl<'a, T: PropertyInt> Cells<'a, T> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            chunks: data.chunks_exact(T::SIZE),
            _marker: PhantomData,
        }
    }
}

impl<T: PropertyInt> Iterator for Cells<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.chunks.next().and_then(T::from_be_slice)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl<T: PropertyInt> ExactSizeIterator for Cells<'_, T> {}

/// Iterator over the NUL-separated strings of a property payload
#[derive(Debug, Clone)]
pub struct StrIter<'a> {
    rest: Option<&'a [u8]>,
}

impl<'a> StrIter<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            rest: (!data.is_empty()).then_some(data),
        }
    }
}

impl<'a> Iterator for StrIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest?;
        let (head, tail) = match rest.iter().position(|&b| b == 0) {
            Some(nul) => (&rest[..nul], Some(&rest[nul + 1..])),
            None => (rest, None),
        };
        self.rest = tail;
        core::str::from_utf8(head).ok()
    }
}

impl FusedIterator for StrIter<'_> {}
