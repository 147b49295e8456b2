//! The alpico storage interfaces.
//!
//! Firmware hands out disks as byte-addressed readers.  Partition code
//! thinks in logical blocks, so [`Blocks`] puts a block view on top of
//! any [`Read`].
#![no_std]

extern crate alloc;

/// Offset in the underlying storage.
pub type Offset = u64;

/// Logical block address.
pub type Lba = u64;

/// Error when reading.
pub type Error = anyhow::Error;

mod block;
mod read;

pub use block::*;
pub use read::*;

/// Check for errors including the location as context.
#[macro_export]
macro_rules! check {
    ($v: expr) => { $v.map_err(|e| e.context($crate::ErrorCtx((file!(), line!()))))? }
}

/// Convert into an error type including the context.
#[macro_export]
macro_rules! msg2err {
    ($v: expr) => { $crate::Error::msg($v).context($crate::ErrorCtx((file!(), line!()))) }
}

/// A container for file! and line! Error context
pub struct ErrorCtx(pub (&'static str, u32));
impl core::fmt::Display for ErrorCtx {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        write!(fmt, "{}:{}", self.0.0, self.0.1)
    }
}
