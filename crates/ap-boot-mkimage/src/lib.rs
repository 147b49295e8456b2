//! Write partition tables into disk images.
//!
//! The builders encode the on-disk formats independently from the
//! parsers so that images made here check the parsers instead of
//! repeating their assumptions.
#![no_std]

extern crate alloc;

mod gpt;
mod label;
mod mbr;
mod raid;

pub use gpt::MakeGpt;
pub use label::MakeLabel;
pub use mbr::MakeMbr;
pub use raid::MakeRaidLabel;

use alloc::vec::Vec;

/// A disk image in memory.
#[derive(Clone)]
pub struct Image {
    data: Vec<u8>,
    block_size: u32,
}

impl Image {
    /// A zeroed image of `blocks` blocks.
    pub fn new(blocks: u64, block_size: u32) -> Self {
        Self {
            data: alloc::vec![0; (blocks * block_size as u64) as usize],
            block_size,
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn blocks(&self) -> u64 {
        self.data.len() as u64 / self.block_size as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Write at a byte offset.  The image grows if needed.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) {
        let start = offset as usize;
        let end = start + data.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(data);
    }

    /// Write at the start of a block.
    pub fn write_block(&mut self, lba: u64, data: &[u8]) {
        self.write_at(lba * self.block_size as u64, data);
    }
}
