//! NetBSD disklabels.

use crate::Image;

const MAGIC: u32 = 0x8256_4557;
const PARTITIONS: usize = 148;

#[derive(Clone, Copy, Default, Debug)]
struct Part {
    offset: u32,
    size: u32,
    fstype: u8,
}

/// A disklabel builder.
#[derive(Clone, Debug)]
pub struct MakeLabel {
    parts: [Part; 16],
    used: usize,
    npartitions: Option<u16>,
    packname: [u8; 16],
    secsize: u32,
    checksum_fixup: u16,
}

impl Default for MakeLabel {
    fn default() -> Self {
        Self {
            parts: [Part::default(); 16],
            used: 0,
            npartitions: None,
            packname: [0; 16],
            secsize: 512,
            checksum_fixup: 0,
        }
    }
}

impl MakeLabel {
    /// Set partition `index` with an offset relative to its volume.
    pub fn partition(mut self, index: usize, offset: u32, size: u32, fstype: u8) -> Self {
        if let Some(p) = self.parts.get_mut(index) {
            *p = Part { offset, size, fstype };
            self.used = core::cmp::max(self.used, index + 1);
        }
        self
    }

    /// Override the partition count.  Defaults to the highest partition set.
    pub fn npartitions(self, v: u16) -> Self {
        Self {
            npartitions: Some(v),
            ..self
        }
    }

    pub fn packname(mut self, v: &str) -> Self {
        let n = core::cmp::min(v.len(), 16);
        self.packname = [0; 16];
        self.packname[..n].copy_from_slice(&v.as_bytes()[..n]);
        self
    }

    /// XOR into the stored checksum to break it.
    pub fn checksum_fixup(self, v: u16) -> Self {
        Self {
            checksum_fixup: v,
            ..self
        }
    }

    /// Write the label for the slice starting at `sector`.
    pub fn write(&self, img: &mut Image, sector: u64) {
        let npartitions = self.npartitions.unwrap_or(self.used as u16);
        let mut buf = [0u8; PARTITIONS + 16 * 16];
        buf[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        buf[8..13].copy_from_slice(b"image");
        buf[24..40].copy_from_slice(&self.packname);
        buf[40..44].copy_from_slice(&self.secsize.to_le_bytes());
        buf[44..48].copy_from_slice(&63u32.to_le_bytes());
        buf[48..52].copy_from_slice(&255u32.to_le_bytes());
        buf[60..64].copy_from_slice(&(img.blocks() as u32).to_le_bytes());
        buf[132..136].copy_from_slice(&MAGIC.to_le_bytes());
        buf[138..140].copy_from_slice(&npartitions.to_le_bytes());
        buf[140..144].copy_from_slice(&8192u32.to_le_bytes());
        buf[144..148].copy_from_slice(&8192u32.to_le_bytes());
        for (i, p) in self.parts.iter().enumerate() {
            let o = PARTITIONS + 16 * i;
            buf[o..o + 4].copy_from_slice(&p.size.to_le_bytes());
            buf[o + 4..o + 8].copy_from_slice(&p.offset.to_le_bytes());
            buf[o + 12] = p.fstype;
        }
        let end = PARTITIONS + 16 * core::cmp::min(npartitions as usize, 16);
        let sum = buf[..end]
            .chunks_exact(2)
            .fold(0u16, |s, w| s ^ u16::from_le_bytes([w[0], w[1]]));
        buf[136..138].copy_from_slice(&(sum ^ self.checksum_fixup).to_le_bytes());
        img.write_at(sector * img.block_size() as u64 + 512, &buf);
    }
}
