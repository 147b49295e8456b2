//! RAIDframe component labels.

use crate::Image;

/// A component label builder.
#[derive(Clone, Debug)]
pub struct MakeRaidLabel {
    version: u32,
    serial: u32,
    last_unit: u32,
    num_blocks: u64,
}

impl Default for MakeRaidLabel {
    fn default() -> Self {
        Self {
            version: 2,
            serial: 1,
            last_unit: 0,
            num_blocks: u32::MAX as u64,
        }
    }
}

impl MakeRaidLabel {
    pub fn version(self, v: u32) -> Self {
        Self { version: v, ..self }
    }

    pub fn serial(self, v: u32) -> Self {
        Self { serial: v, ..self }
    }

    pub fn last_unit(self, v: u32) -> Self {
        Self { last_unit: v, ..self }
    }

    pub fn num_blocks(self, v: u64) -> Self {
        Self { num_blocks: v, ..self }
    }

    /// Write the label of the component starting at `start`.
    pub fn write(&self, img: &mut Image, start: u64) {
        let mut buf = [0u8; 512];
        let mut put = |ofs: usize, v: u32| buf[ofs..ofs + 4].copy_from_slice(&v.to_le_bytes());
        put(0, self.version);
        put(4, self.serial);
        put(8, 1); // mod counter
        put(20, 1); // rows
        put(24, 2); // columns
        put(28, 1); // clean
        put(56, 512);
        put(60, self.num_blocks as u32);
        put(200, 1); // autoconfigure
        put(204, 1); // root partition
        put(208, self.last_unit);
        put(216, (self.num_blocks >> 32) as u32);
        img.write_at(start * img.block_size() as u64 + 16384, &buf);
    }
}
