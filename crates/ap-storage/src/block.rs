//! Block addressed reading.

use crate::{msg2err, Error, Lba, Offset, Read, ReadExt};
use alloc::vec::Vec;

/// A disk addressed in fixed-size logical blocks.
pub trait BlockRead {
    /// The logical block size in bytes.
    fn block_size(&self) -> u32;

    /// Read `buf.len() / block_size` consecutive blocks starting at `lba`.
    ///
    /// The buffer length has to be a multiple of the block size.
    fn read_blocks(&self, lba: Lba, buf: &mut [u8]) -> Result<(), Error>;
}

/// Extension methods for block readers.
pub trait BlockReadExt {
    /// Read `count` blocks into a fresh buffer.
    fn read_vec(&self, lba: Lba, count: usize) -> Result<Vec<u8>, Error>;

    /// Number of blocks needed to hold `bytes`.
    fn blocks_for(&self, bytes: u64) -> u64;
}

impl<T: BlockRead + ?Sized> BlockReadExt for T {
    fn read_vec(&self, lba: Lba, count: usize) -> Result<Vec<u8>, Error> {
        let len = count
            .checked_mul(self.block_size() as usize)
            .ok_or(msg2err!("block count overflow"))?;
        let mut buf = alloc::vec![0u8; len];
        self.read_blocks(lba, &mut buf)?;
        Ok(buf)
    }

    fn blocks_for(&self, bytes: u64) -> u64 {
        bytes.div_ceil(self.block_size() as u64)
    }
}

/// A block view of a byte addressed disk.
#[derive(Clone, Copy)]
pub struct Blocks<'a> {
    disk: &'a dyn Read,
    block_size: u32,
}

impl<'a> Blocks<'a> {
    /// The block size must be a power of two of at least 512 bytes.
    pub fn new(disk: &'a dyn Read, block_size: u32) -> Result<Self, Error> {
        if block_size < 512 || !block_size.is_power_of_two() {
            return Err(msg2err!("block size must be a power of two and at least 512"));
        }
        Ok(Self { disk, block_size })
    }

    /// The underlying byte reader.
    pub fn disk(&self) -> &'a dyn Read {
        self.disk
    }
}

impl BlockRead for Blocks<'_> {
    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn read_blocks(&self, lba: Lba, buf: &mut [u8]) -> Result<(), Error> {
        if buf.len() % self.block_size as usize != 0 {
            return Err(msg2err!("unaligned block read"));
        }
        let offset = lba
            .checked_mul(self.block_size as Offset)
            .ok_or(msg2err!("lba out of range"))?;
        self.disk.read_exact(offset, buf)
    }
}
