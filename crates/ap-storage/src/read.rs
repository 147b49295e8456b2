//! Traits for reading.
use crate::{msg2err, Error, Offset};

/// Read from a certain offset into a buffer.
pub trait Read {
    /// Read into some byte buffer. Returning zero means EOF.
    fn read_bytes(&self, offset: Offset, buf: &mut [u8]) -> Result<usize, Error>;
}

/// Extension methods to make implementations easier.
pub trait ReadExt {
    /// Fill the buffer.
    fn read_exact(&self, offset: Offset, buf: &mut [u8]) -> Result<(), Error>;

    /// Read a fixed number of bytes.
    fn read_array<const N: usize>(&self, offset: Offset) -> Result<[u8; N], Error>;

    /// Get the size.
    fn detect_size(&self) -> Offset;
}

impl<T: Read + ?Sized> ReadExt for T {
    fn read_exact(&self, offset: Offset, buf: &mut [u8]) -> Result<(), Error> {
        let mut n = 0;
        while n != buf.len() {
            match self.read_bytes(offset + n as Offset, &mut buf[n..])? {
                0 => return Err(msg2err!(PartialReadError { offset, done: n, len: buf.len() })),
                c => n += c,
            }
        }
        Ok(())
    }

    fn read_array<const N: usize>(&self, offset: Offset) -> Result<[u8; N], Error> {
        let mut res = [0u8; N];
        self.read_exact(offset, &mut res)?;
        Ok(res)
    }

    /// Detect the size of a disk by doing binary search.
    ///
    /// Returns the number of readable bytes.  Errors count as unreadable.
    fn detect_size(&self) -> Offset {
        let mut buf = [0u8];
        if !matches!(self.read_bytes(0, &mut buf), Ok(1)) {
            return 0;
        }
        // start is always readable, end never is
        let mut start: Offset = 0;
        let mut end: Offset = Offset::MAX;
        while end - start > 1 {
            let middle = start + (end - start) / 2;
            match self.read_bytes(middle, &mut buf) {
                Ok(1) => start = middle,
                _ => end = middle,
            }
        }
        end
    }
}

/// An exact read could only be partially done.
#[derive(Debug)]
pub struct PartialReadError {
    pub offset: Offset,
    pub done: usize,
    pub len: usize,
}

impl core::fmt::Display for PartialReadError {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        write!(fmt, "short read at {:#x}: {} of {} bytes", self.offset, self.done, self.len)
    }
}
