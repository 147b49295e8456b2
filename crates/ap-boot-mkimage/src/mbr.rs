//! MBR and EBR sectors.

use crate::Image;

const PART_OFFSET: u64 = 0x1be;
const MAGIC_OFFSET: u64 = 0x1fe;

#[derive(Clone, Copy, Default, Debug)]
struct Record {
    flag: u8,
    typ: u8,
    start: u32,
    size: u32,
}

/// An MBR builder.  Also used for the EBRs of an extended chain.
#[derive(Clone, Default, Debug)]
pub struct MakeMbr {
    records: [Record; 4],
}

impl MakeMbr {
    /// Fill a slot.  The start is relative to the sector the table ends up in.
    pub fn entry(mut self, slot: usize, typ: u8, start: u32, size: u32) -> Self {
        if let Some(r) = self.records.get_mut(slot) {
            *r = Record {
                typ,
                start,
                size,
                ..*r
            };
        }
        self
    }

    /// Set the boot flag of a slot.
    pub fn active(mut self, slot: usize) -> Self {
        if let Some(r) = self.records.get_mut(slot) {
            r.flag = 0x80;
        }
        self
    }

    /// A protective MBR covering the whole image.
    pub fn protective(img: &Image) -> Self {
        let size = core::cmp::min(img.blocks().saturating_sub(1), u32::MAX as u64) as u32;
        Self::default().entry(0, 0xee, 1, size)
    }

    /// Write the table and the signature into the sector at `lba`.
    pub fn write(&self, img: &mut Image, lba: u64) {
        let base = lba * img.block_size() as u64;
        for (i, r) in self.records.iter().enumerate() {
            let mut raw = [0u8; 16];
            raw[0] = r.flag;
            // CHS values are ignored by LBA aware code
            raw[1..4].copy_from_slice(&[0xfe, 0xff, 0xff]);
            raw[4] = r.typ;
            raw[5..8].copy_from_slice(&[0xfe, 0xff, 0xff]);
            raw[8..12].copy_from_slice(&r.start.to_le_bytes());
            raw[12..16].copy_from_slice(&r.size.to_le_bytes());
            img.write_at(base + PART_OFFSET + 16 * i as u64, &raw);
        }
        img.write_at(base + MAGIC_OFFSET, &[0x55, 0xaa]);
    }
}
