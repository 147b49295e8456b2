//! A disk that fails in a given byte range.

use super::{Error, Offset, Read};
use ap_storage::msg2err;
use core::cell::Cell;
use core::ops::Range;

/// Wrap a disk and fail every read that touches `bad`.
///
/// Counts the reads so callers can check that nothing was retried.
pub struct FaultyRead<'a> {
    parent: &'a dyn Read,
    bad: Range<Offset>,
    reads: Cell<usize>,
}

impl<'a> FaultyRead<'a> {
    pub fn new(parent: &'a dyn Read, bad: Range<Offset>) -> Self {
        Self {
            parent,
            bad,
            reads: Cell::new(0),
        }
    }

    /// Number of reads issued so far, failed ones included.
    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl Read for FaultyRead<'_> {
    fn read_bytes(&self, ofs: Offset, buf: &mut [u8]) -> Result<usize, Error> {
        self.reads.set(self.reads.get() + 1);
        let end = ofs + buf.len() as Offset;
        if ofs < self.bad.end && self.bad.start < end {
            return Err(msg2err!("media error"));
        }
        self.parent.read_bytes(ofs, buf)
    }
}
