//! One slot of a partition table.

use crate::{FsType, Guid};
use alloc::string::String;
use ap_storage::Lba;

/// A partition slot from a disklabel or a GPT.
///
/// Sector numbers are absolute on the device that was parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionEntry {
    /// A used disklabel slot.
    Disklabel {
        sector_offset: Lba,
        sector_count: u64,
        fstype: FsType,
        /// The checksum of the label this slot came from.
        raw_label_checksum: u16,
    },
    /// A GPT entry with a non-nil type.
    Gpt {
        lba_start: Lba,
        /// One past the last sector.
        lba_end: Lba,
        fstype: FsType,
        partition_guid: Guid,
        /// `None` when the name field was all zero.
        partition_name: Option<String>,
    },
    /// A disklabel slot that only keeps the letters in place.
    Unused,
}

impl PartitionEntry {
    pub fn fstype(&self) -> FsType {
        match self {
            Self::Disklabel { fstype, .. } | Self::Gpt { fstype, .. } => *fstype,
            Self::Unused => FsType::UNUSED,
        }
    }

    /// First sector and number of sectors.
    pub fn extent(&self) -> Option<(Lba, u64)> {
        match self {
            Self::Disklabel {
                sector_offset,
                sector_count,
                ..
            } => Some((*sector_offset, *sector_count)),
            Self::Gpt { lba_start, lba_end, .. } => Some((*lba_start, lba_end - lba_start)),
            Self::Unused => None,
        }
    }

    /// Can this slot be offered as a boot target?
    pub fn is_bootable(&self) -> bool {
        self.extent().is_some_and(|(_, n)| n > 0)
    }

    /// The GPT name if there is one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Gpt { partition_name, .. } => partition_name.as_deref(),
            _ => None,
        }
    }
}
