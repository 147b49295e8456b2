//! Boot device selection.
//!
//! Turns a boot specification like `hd0a:netbsd` into a readable
//! partition on one of the probed disks.
//!
//! ```text
//! DeviceSpec::parse -> Resolver::resolve -> discover -> {GPT, MBR + disklabel, raw}
//!                                                   \-> RAIDframe -> discover ...
//! ```
#![no_std]

extern crate alloc;

pub mod bootinfo;
pub mod device;
pub mod devspec;
pub mod listing;
pub mod resolve;
pub mod table;

pub use device::{BlockDevice, DeviceClass, DeviceList, FirmwareDisk};
pub use devspec::{BootPath, DeviceDefaults, DeviceName, DeviceSpec};
pub use resolve::{BootTarget, NetworkBoot, ResolveOptions, ResolvedBoot, Resolver};
pub use table::{discover, PartitionTable, Volume};

use alloc::string::String;
use ap_storage_partition::DiskError;

/// Why a boot specification could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error(transparent)]
    Disk(#[from] DiskError),
    #[error("invalid device name {0:?}")]
    InvalidDeviceName(String),
    #[error("invalid unit {0:?}")]
    InvalidUnit(String),
    #[error("invalid partition {0:?}")]
    InvalidPartition(char),
    #[error("malformed boot specification {0:?}")]
    MalformedSpec(String),
    #[error("partition {0} not found")]
    PartitionNotFound(String),
    #[error("unsupported device class {0:?}")]
    UnsupportedDeviceClass(String),
    #[error("no such device {0}")]
    NoSuchDevice(String),
    #[error("RAIDframe volumes nested deeper than {0}")]
    NestingTooDeep(usize),
    #[error("bad boot info: {0}")]
    BadBootInfo(&'static str),
}

impl BootError {
    /// Errors in what the user typed, as opposed to what is on the disks.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDeviceName(_) | Self::InvalidUnit(_) | Self::InvalidPartition(_) | Self::MalformedSpec(_)
        )
    }
}

/// The letter of a partition index.
pub fn partition_letter(index: usize) -> char {
    (b'a' + (index % 26) as u8) as char
}
