use super::{Error, Offset, Read};

/// Read from a slice of memory.
#[derive(Clone, Copy)]
pub struct ReadSlice<'a>(pub &'a [u8]);

impl ReadSlice<'_> {
    /// The size of the image in bytes.
    pub fn len(&self) -> Offset {
        self.0.len() as Offset
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Read for ReadSlice<'_> {
    fn read_bytes(&self, ofs: Offset, buf: &mut [u8]) -> Result<usize, Error> {
        if ofs >= self.len() {
            return Ok(0);
        }
        let ofs = ofs as usize;
        let n = core::cmp::min(self.0.len() - ofs, buf.len());
        buf[..n].copy_from_slice(&self.0[ofs..ofs + n]);
        Ok(n)
    }
}
