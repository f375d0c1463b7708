// ABOUTME: Test-only builder that assembles synthetic device tree blobs
// ABOUTME: Lets tests describe trees token by token instead of shipping binary fixtures

use crate::dtb::{DtbHeader, DtbToken, MemoryReservation};

/// Assembles a DTB: header, memory reservation block, structure block and
/// strings block, in that order.
#[derive(Debug, Default)]
pub struct DtbBuilder {
    reservations: Vec<(u64, u64)>,
    structure: Vec<u8>,
    strings: Vec<u8>,
}

impl DtbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A blob holding nothing but an empty root node
    pub fn minimal() -> Vec<u8> {
        let mut b = Self::new();
        b.begin_node("");
        b.end_node();
        b.end();
        b.build()
    }

    pub fn reserve(&mut self, address: u64, size: u64) -> &mut Self {
        self.reservations.push((address, size));
        self
    }

    pub fn raw_token(&mut self, tag: u32) -> &mut Self {
        self.structure.extend_from_slice(&tag.to_be_bytes());
        self
    }

    pub fn begin_node(&mut self, name: &str) -> &mut Self {
        self.raw_token(DtbToken::FDT_BEGIN_NODE);
        self.structure.extend_from_slice(name.as_bytes());
        self.structure.push(0);
        self.pad();
        self
    }

    pub fn end_node(&mut self) -> &mut Self {
        self.raw_token(DtbToken::FDT_END_NODE)
    }

    pub fn nop(&mut self) -> &mut Self {
        self.raw_token(DtbToken::FDT_NOP)
    }

    pub fn end(&mut self) -> &mut Self {
        self.raw_token(DtbToken::FDT_END)
    }

    pub fn prop(&mut self, name: &str, value: &[u8]) -> &mut Self {
        let name_offset = self.string_offset(name);
        self.raw_token(DtbToken::FDT_PROP);
        self.structure
            .extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.structure.extend_from_slice(&name_offset.to_be_bytes());
        self.structure.extend_from_slice(value);
        self.pad();
        self
    }

    pub fn prop_u32(&mut self, name: &str, value: u32) -> &mut Self {
        self.prop(name, &value.to_be_bytes())
    }

    pub fn prop_cells(&mut self, name: &str, cells: &[u32]) -> &mut Self {
        let value: Vec<u8> = cells.iter().flat_map(|c| c.to_be_bytes()).collect();
        self.prop(name, &value)
    }

    pub fn prop_str(&mut self, name: &str, value: &str) -> &mut Self {
        self.prop_str_list(name, &[value])
    }

    pub fn prop_str_list(&mut self, name: &str, values: &[&str]) -> &mut Self {
        let mut value = Vec::new();
        for s in values {
            value.extend_from_slice(s.as_bytes());
            value.push(0);
        }
        self.prop(name, &value)
    }

    /// Just the structure and strings blocks, for scanner-level tests
    pub fn into_blocks(self) -> (Vec<u8>, Vec<u8>) {
        (self.structure, self.strings)
    }

    /// The complete blob, with a header describing the blocks
    pub fn build(&self) -> Vec<u8> {
        let off_mem_rsvmap = DtbHeader::SIZE;
        let rsvmap_len = (self.reservations.len() + 1) * MemoryReservation::SIZE;
        let off_dt_struct = off_mem_rsvmap + rsvmap_len;
        let off_dt_strings = off_dt_struct + self.structure.len();
        let totalsize = off_dt_strings + self.strings.len();

        let fields = [
            DtbHeader::MAGIC,
            totalsize as u32,
            off_dt_struct as u32,
            off_dt_strings as u32,
            off_mem_rsvmap as u32,
            17,
            16,
            0,
            self.strings.len() as u32,
            self.structure.len() as u32,
        ];

        let mut blob: Vec<u8> = fields.iter().flat_map(|f| f.to_be_bytes()).collect();
        for &(address, size) in self.reservations.iter().chain([(0, 0)].iter()) {
            blob.extend_from_slice(&address.to_be_bytes());
            blob.extend_from_slice(&size.to_be_bytes());
        }
        blob.extend_from_slice(&self.structure);
        blob.extend_from_slice(&self.strings);
        blob
    }

    fn pad(&mut self) {
        let padding = DtbToken::calculate_padding(self.structure.len());
        self.structure.extend(core::iter::repeat_n(0, padding));
    }

    fn string_offset(&mut self, name: &str) -> u32 {
        let mut offset = 0;
        for existing in self.strings.split(|&b| b == 0) {
            if existing == name.as_bytes() && offset < self.strings.len() {
                return offset as u32;
            }
            offset += existing.len() + 1;
        }

        let offset = self.strings.len();
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        offset as u32
    }
}
