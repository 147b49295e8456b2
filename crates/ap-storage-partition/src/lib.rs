//! Partition tables as found on boot disks.
//!
//! - MBR with extended partition chains
//! - GPT
//! - NetBSD disklabel
//! - RAIDframe component labels
//!
//! All parsers read through a [`BlockRead`](ap_storage::BlockRead) and take
//! the `base` LBA of the volume they look at.  A plain disk has base zero,
//! a nested RAIDframe volume starts behind its protected sectors.  Returned
//! addresses are absolute on the underlying device.
#![no_std]

extern crate alloc;

mod bytes;
pub mod disklabel;
mod entry;
mod fstype;
pub mod gpt;
mod guid;
pub mod mbr;
pub mod raidframe;

pub use disklabel::{parse_disklabel, DiskLabel};
pub use entry::PartitionEntry;
pub use fstype::FsType;
pub use gpt::{parse_gpt, GptHeader};
pub use guid::Guid;
pub use mbr::{parse_mbr, Mbr, MbrKind, PartitionSlot};
pub use raidframe::{probe_raidframe, RaidComponentLabel, RaidVolume};

/// Errors while decoding partition tables.
///
/// The `No*` variants mean the structure is simply not there and callers
/// may try the next format.  The others mean a structure was found but
/// is broken.
#[derive(Debug, thiserror::Error)]
pub enum DiskError {
    #[error("i/o error: {0:#}")]
    Io(anyhow::Error),
    #[error("truncated {what}: need {need} bytes, have {have}")]
    Truncated {
        what: &'static str,
        need: usize,
        have: usize,
    },
    #[error("no MBR")]
    NoMbr,
    #[error("no GPT")]
    NoGpt,
    #[error("no disklabel")]
    NoLabel,
    #[error("invalid GPT header: {0}")]
    InvalidGptHeader(&'static str),
    #[error("corrupt disklabel: {0}")]
    CorruptLabel(&'static str),
    #[error("extended partition chain longer than {0} tables")]
    ExtendedChainTooLong(usize),
    #[error("{0} lies beyond the addressable sectors")]
    OutOfRange(&'static str),
}

impl DiskError {
    /// The format is not present at all.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::NoMbr | Self::NoGpt | Self::NoLabel)
    }
}

impl From<anyhow::Error> for DiskError {
    fn from(e: anyhow::Error) -> Self {
        Self::Io(e)
    }
}
