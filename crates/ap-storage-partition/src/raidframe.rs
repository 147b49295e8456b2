//! RAIDframe component labels.
//!
//! A component of a RAIDframe set carries its label 16 KiB into the
//! partition.  The volume the set exports starts after the protected
//! sectors and can hold partition tables of its own.

use crate::{bytes::Bytes, DiskError};
use ap_storage::{BlockRead, BlockReadExt, Lba};
use log::debug;

/// Byte offset of the label from the start of the component.
pub const RF_COMPONENT_INFO_OFFSET: u64 = 16384;
/// The only label version that is understood.
pub const RF_COMPONENT_LABEL_VERSION: u32 = 2;
/// Sectors at the start of a component that are not part of the volume.
pub const RF_PROTECTED_SECTORS: u64 = 64;
/// The bytes of the label that are decoded.
pub const RF_LABEL_SIZE: usize = 224;

/// A RAIDframe component label - decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaidComponentLabel {
    pub version: u32,
    pub serial_number: u32,
    pub mod_counter: u32,
    pub row: u32,
    pub column: u32,
    pub num_rows: u32,
    pub num_columns: u32,
    pub clean: u32,
    pub status: u32,
    pub block_size: u32,
    /// Blocks in the whole set, both halves of the 64-bit count.
    pub num_blocks: u64,
    pub partition_size: u64,
    pub autoconfigure: u32,
    pub root_partition: u32,
    /// The unit number of the last configuration, `raidN`.
    pub last_unit: u32,
    pub config_order: u32,
}

impl RaidComponentLabel {
    pub fn decode(buf: &[u8]) -> Result<Self, DiskError> {
        let b = Bytes::new("RAIDframe label", buf, RF_LABEL_SIZE)?;
        Ok(Self {
            version: b.u32(0),
            serial_number: b.u32(4),
            mod_counter: b.u32(8),
            row: b.u32(12),
            column: b.u32(16),
            num_rows: b.u32(20),
            num_columns: b.u32(24),
            clean: b.u32(28),
            status: b.u32(32),
            block_size: b.u32(56),
            num_blocks: (b.u32(216) as u64) << 32 | b.u32(60) as u64,
            partition_size: (b.u32(220) as u64) << 32 | b.u32(64) as u64,
            autoconfigure: b.u32(200),
            root_partition: b.u32(204),
            last_unit: b.u32(208),
            config_order: b.u32(212),
        })
    }

    /// The volume exported by the component starting at `start` with
    /// `sectors` sectors.
    pub fn volume(&self, start: Lba, sectors: u64) -> Result<RaidVolume, DiskError> {
        let avail = sectors.saturating_sub(RF_PROTECTED_SECTORS);
        let base = start
            .checked_add(RF_PROTECTED_SECTORS)
            .ok_or(DiskError::OutOfRange("RAIDframe volume"))?;
        Ok(RaidVolume {
            unit: self.last_unit,
            base,
            sectors: core::cmp::min(self.num_blocks, avail),
        })
    }
}

/// The nested volume behind a RAIDframe component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaidVolume {
    /// The `raidN` unit number.
    pub unit: u32,
    /// Absolute first sector of the volume.
    pub base: Lba,
    pub sectors: u64,
}

/// Read the component label of the partition at `start`.
///
/// A label with another version is not an error, the partition is just
/// not usable as a nested volume.
pub fn probe_raidframe(disk: &dyn BlockRead, start: Lba) -> Result<Option<RaidComponentLabel>, DiskError> {
    let bs = disk.block_size() as u64;
    let lba = start
        .checked_add(RF_COMPONENT_INFO_OFFSET / bs)
        .ok_or(DiskError::OutOfRange("RAIDframe label"))?;
    let within = (RF_COMPONENT_INFO_OFFSET % bs) as usize;
    let count = disk.blocks_for(within as u64 + RF_LABEL_SIZE as u64) as usize;
    let buf = disk.read_vec(lba, count)?;
    let label = RaidComponentLabel::decode(&buf[within..])?;
    if label.version != RF_COMPONENT_LABEL_VERSION {
        debug!("RAIDframe label at {start} has version {}", label.version);
        return Ok(None);
    }
    debug!(
        "RAIDframe component at {start}: raid{} serial {} with {} blocks",
        label.last_unit, label.serial_number, label.num_blocks
    );
    Ok(Some(label))
}
