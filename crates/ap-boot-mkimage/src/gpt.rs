//! GPT header and entry array.

use crate::Image;
use alloc::vec::Vec;

#[derive(Clone, Debug)]
struct Entry {
    typ: [u8; 16],
    guid: [u8; 16],
    first: u64,
    last: u64,
    name: [u16; 36],
}

/// A GPT builder.
#[derive(Clone, Debug)]
pub struct MakeGpt {
    entries: Vec<Option<Entry>>,
    entry_size: u32,
    entry_count: u32,
    table_lba: u64,
    last_usable: Option<u64>,
    revision: u32,
    disk_guid: [u8; 16],
}

impl Default for MakeGpt {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            entry_size: 128,
            entry_count: 128,
            table_lba: 2,
            last_usable: None,
            revision: 0x0001_0000,
            disk_guid: *b"alpico-boot-disk",
        }
    }
}

impl MakeGpt {
    /// Append an entry.  `last` is inclusive, the name is truncated to 36 units.
    pub fn entry(mut self, typ: [u8; 16], guid: [u8; 16], first: u64, last: u64, name: &str) -> Self {
        let mut units = [0u16; 36];
        for (u, c) in units.iter_mut().zip(name.encode_utf16()) {
            *u = c;
        }
        self.entries.push(Some(Entry {
            typ,
            guid,
            first,
            last,
            name: units,
        }));
        self
    }

    /// Append an all-zero entry.
    pub fn empty(mut self) -> Self {
        self.entries.push(None);
        self
    }

    pub fn entry_size(self, v: u32) -> Self {
        Self { entry_size: v, ..self }
    }

    pub fn entry_count(self, v: u32) -> Self {
        Self { entry_count: v, ..self }
    }

    /// Start of the entry array relative to the volume.
    pub fn table_lba(self, v: u64) -> Self {
        Self { table_lba: v, ..self }
    }

    /// Defaults to the last block of the image.
    pub fn last_usable(self, v: u64) -> Self {
        Self { last_usable: Some(v), ..self }
    }

    pub fn revision(self, v: u32) -> Self {
        Self { revision: v, ..self }
    }

    /// Write the header at `base + 1` and the entry array.
    ///
    /// The CRC fields are left zero.
    pub fn write(&self, img: &mut Image, base: u64) {
        let bs = img.block_size() as u64;
        let table_bytes = self.entry_count as u64 * self.entry_size as u64;
        let first_usable = self.table_lba + table_bytes.div_ceil(bs);
        let last = img.blocks().saturating_sub(base + 1);

        let mut hdr = [0u8; 92];
        hdr[0..8].copy_from_slice(b"EFI PART");
        hdr[8..12].copy_from_slice(&self.revision.to_le_bytes());
        hdr[12..16].copy_from_slice(&92u32.to_le_bytes());
        hdr[24..32].copy_from_slice(&1u64.to_le_bytes());
        hdr[32..40].copy_from_slice(&last.to_le_bytes());
        hdr[40..48].copy_from_slice(&first_usable.to_le_bytes());
        hdr[48..56].copy_from_slice(&self.last_usable.unwrap_or(last).to_le_bytes());
        hdr[56..72].copy_from_slice(&self.disk_guid);
        hdr[72..80].copy_from_slice(&self.table_lba.to_le_bytes());
        hdr[80..84].copy_from_slice(&self.entry_count.to_le_bytes());
        hdr[84..88].copy_from_slice(&self.entry_size.to_le_bytes());
        img.write_block(base + 1, &hdr);

        let table = (base + self.table_lba) * bs;
        for (i, e) in self.entries.iter().enumerate() {
            let mut raw = [0u8; 128];
            if let Some(e) = e {
                raw[0..16].copy_from_slice(&e.typ);
                raw[16..32].copy_from_slice(&e.guid);
                raw[32..40].copy_from_slice(&e.first.to_le_bytes());
                raw[40..48].copy_from_slice(&e.last.to_le_bytes());
                for (j, u) in e.name.iter().enumerate() {
                    raw[56 + 2 * j..58 + 2 * j].copy_from_slice(&u.to_le_bytes());
                }
            }
            // fill the padding of larger entries with junk to catch bad strides
            let stride = core::cmp::max(self.entry_size as usize, 128);
            let mut padded = alloc::vec![0xa5u8; stride];
            padded[..128].copy_from_slice(&raw);
            img.write_at(table + (i * stride) as u64, &padded);
        }
    }
}
