//! Length checked little-endian field access.

use crate::DiskError;

/// A buffer that is known to hold at least the bytes of one structure.
#[derive(Clone, Copy)]
pub(crate) struct Bytes<'a>(&'a [u8]);

impl<'a> Bytes<'a> {
    /// Check that `buf` covers `need` bytes.
    pub fn new(what: &'static str, buf: &'a [u8], need: usize) -> Result<Self, DiskError> {
        if buf.len() < need {
            return Err(DiskError::Truncated {
                what,
                need,
                have: buf.len(),
            });
        }
        Ok(Self(&buf[..need]))
    }

    pub fn array<const N: usize>(&self, ofs: usize) -> [u8; N] {
        let mut res = [0u8; N];
        res.copy_from_slice(&self.0[ofs..ofs + N]);
        res
    }

    pub fn slice(&self, ofs: usize, len: usize) -> &'a [u8] {
        &self.0[ofs..ofs + len]
    }

    pub fn u8(&self, ofs: usize) -> u8 {
        self.0[ofs]
    }

    pub fn u16(&self, ofs: usize) -> u16 {
        u16::from_le_bytes(self.array(ofs))
    }

    pub fn u32(&self, ofs: usize) -> u32 {
        u32::from_le_bytes(self.array(ofs))
    }

    pub fn u64(&self, ofs: usize) -> u64 {
        u64::from_le_bytes(self.array(ofs))
    }
}
