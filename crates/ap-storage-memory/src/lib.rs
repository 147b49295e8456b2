//! In-memory disks.
//!
//! Disk images held in memory, either to boot from a RAM disk or to feed
//! constructed images to the partition code in tests.
#![no_std]

use ap_storage::{Error, Offset, Read};

mod fault;
mod slice;
pub use fault::*;
pub use slice::*;
