//! Master boot record and extended partition chains.

use crate::{bytes::Bytes, DiskError};
use alloc::vec::Vec;
use ap_storage::{BlockRead, BlockReadExt, Lba};
use log::{debug, warn};

pub const MBR_PART_OFFSET: usize = 0x1be;
pub const MBR_PART_SIZE: usize = 16;
pub const MBR_PART_COUNT: usize = 4;
pub const MBR_MAGIC_OFFSET: usize = 0x1fe;
pub const MBR_MAGIC: [u8; 2] = [0x55, 0xaa];
pub const MBR_SECSIZE: usize = 512;

pub const MBR_PTYPE_UNUSED: u8 = 0x00;
pub const MBR_PTYPE_EXT: u8 = 0x05;
pub const MBR_PTYPE_EXT_LBA: u8 = 0x0f;
pub const MBR_PTYPE_EXT_LNX: u8 = 0x85;
pub const MBR_PTYPE_386BSD: u8 = 0xa5;
pub const MBR_PTYPE_NETBSD: u8 = 0xa9;
pub const MBR_PTYPE_PMBR: u8 = 0xee;

/// Upper bound on the number of extended boot records that are followed.
pub const MAX_EXTENDED_CHAIN: usize = 32;

/// What a partition type byte means to the boot code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbrKind {
    Empty,
    /// Holds a NetBSD disklabel.
    NetBsd,
    /// The old 386BSD id.  Also holds a disklabel.
    LegacyNetBsd,
    /// Link to an extended chain.
    Extended,
    /// Protective entry of a GPT disk.
    GptProtective,
    Other,
}

impl MbrKind {
    pub fn from_type(typ: u8) -> Self {
        match typ {
            MBR_PTYPE_UNUSED => Self::Empty,
            MBR_PTYPE_NETBSD => Self::NetBsd,
            MBR_PTYPE_386BSD => Self::LegacyNetBsd,
            MBR_PTYPE_EXT | MBR_PTYPE_EXT_LBA | MBR_PTYPE_EXT_LNX => Self::Extended,
            MBR_PTYPE_PMBR => Self::GptProtective,
            _ => Self::Other,
        }
    }
}

/// A single partition record - on-disk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MbrRecord {
    pub flag: u8,
    pub chs_start: [u8; 3],
    pub typ: u8,
    pub chs_end: [u8; 3],
    /// Start sector, relative to the table it is found in.
    pub start: u32,
    pub size: u32,
}

impl MbrRecord {
    pub fn decode(buf: &[u8]) -> Result<Self, DiskError> {
        let b = Bytes::new("MBR record", buf, MBR_PART_SIZE)?;
        Ok(Self {
            flag: b.u8(0),
            chs_start: b.array(1),
            typ: b.u8(4),
            chs_end: b.array(5),
            start: b.u32(8),
            size: b.u32(12),
        })
    }

    pub fn encode(&self) -> [u8; MBR_PART_SIZE] {
        let mut res = [0u8; MBR_PART_SIZE];
        res[0] = self.flag;
        res[1..4].copy_from_slice(&self.chs_start);
        res[4] = self.typ;
        res[5..8].copy_from_slice(&self.chs_end);
        res[8..12].copy_from_slice(&self.start.to_le_bytes());
        res[12..16].copy_from_slice(&self.size.to_le_bytes());
        res
    }

    pub fn kind(&self) -> MbrKind {
        MbrKind::from_type(self.typ)
    }
}

/// Decode the partition records of an MBR or EBR sector.
///
/// Returns `NoMbr` if the boot signature is missing.
pub fn decode_sector(buf: &[u8]) -> Result<[MbrRecord; MBR_PART_COUNT], DiskError> {
    let b = Bytes::new("MBR", buf, MBR_SECSIZE)?;
    if b.array::<2>(MBR_MAGIC_OFFSET) != MBR_MAGIC {
        return Err(DiskError::NoMbr);
    }
    let mut res = [MbrRecord::default(); MBR_PART_COUNT];
    for (i, rec) in res.iter_mut().enumerate() {
        *rec = MbrRecord::decode(b.slice(MBR_PART_OFFSET + i * MBR_PART_SIZE, MBR_PART_SIZE))?;
    }
    Ok(res)
}

/// A used partition, either primary or logical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSlot {
    /// 0..4 for primary partitions, 4.. for logical ones in chain order.
    pub index: usize,
    pub kind: MbrKind,
    pub typ: u8,
    pub active: bool,
    /// Absolute start sector.
    pub start: Lba,
    pub size: u64,
}

/// A decoded MBR including its extended chain.
#[derive(Debug, Clone)]
pub struct Mbr {
    /// The raw primary records, unused ones included.
    pub records: [MbrRecord; MBR_PART_COUNT],
    /// Used primary partitions in slot order.
    pub primary: Vec<PartitionSlot>,
    /// Partitions found in the extended chain.
    pub logical: Vec<PartitionSlot>,
}

impl Mbr {
    /// All used partitions, primary first.
    pub fn slots(&self) -> impl Iterator<Item = &PartitionSlot> {
        self.primary.iter().chain(self.logical.iter())
    }

    /// The slot that should hold the NetBSD disklabel.
    ///
    /// The first NetBSD id wins, the legacy id is only a fallback.
    pub fn netbsd_candidate(&self) -> Option<&PartitionSlot> {
        self.slots()
            .find(|s| s.kind == MbrKind::NetBsd)
            .or_else(|| self.slots().find(|s| s.kind == MbrKind::LegacyNetBsd))
    }
}

fn slot(index: usize, rec: &MbrRecord, table: Lba) -> Option<PartitionSlot> {
    let kind = rec.kind();
    if kind == MbrKind::Empty || rec.size == 0 {
        return None;
    }
    Some(PartitionSlot {
        index,
        kind,
        typ: rec.typ,
        active: rec.flag & 0x80 != 0,
        start: table + rec.start as Lba,
        size: rec.size as u64,
    })
}

fn read_sector(disk: &dyn BlockRead, lba: Lba) -> Result<[MbrRecord; MBR_PART_COUNT], DiskError> {
    let count = disk.blocks_for(MBR_SECSIZE as u64) as usize;
    let buf = disk.read_vec(lba, count)?;
    decode_sector(&buf)
}

/// Parse the MBR at `base` and follow the first extended chain.
pub fn parse_mbr(disk: &dyn BlockRead, base: Lba) -> Result<Mbr, DiskError> {
    let records = read_sector(disk, base)?;
    let primary: Vec<_> = records
        .iter()
        .enumerate()
        .filter_map(|(i, rec)| slot(i, rec, base))
        .collect();

    let mut logical = Vec::new();
    if let Some(ext) = primary.iter().find(|s| s.kind == MbrKind::Extended) {
        walk_extended(disk, ext.start, &mut logical)?;
    }
    Ok(Mbr {
        records,
        primary,
        logical,
    })
}

/// Follow the EBR links starting at `ext_base`.
///
/// Data records are relative to their own EBR, links are relative to the
/// start of the extended partition.
fn walk_extended(disk: &dyn BlockRead, ext_base: Lba, logical: &mut Vec<PartitionSlot>) -> Result<(), DiskError> {
    let mut next: Lba = 0;
    for _ in 0..MAX_EXTENDED_CHAIN {
        let sector = ext_base + next;
        let records = match read_sector(disk, sector) {
            Err(DiskError::NoMbr) => {
                warn!("extended partition table at sector {sector} has no signature");
                return Ok(());
            }
            x => x?,
        };
        next = 0;
        for rec in records.iter() {
            match rec.kind() {
                MbrKind::Empty => {}
                MbrKind::Extended => {
                    if next == 0 {
                        next = rec.start as Lba;
                    }
                }
                _ => {
                    if let Some(s) = slot(MBR_PART_COUNT + logical.len(), rec, sector) {
                        logical.push(s);
                    }
                }
            }
        }
        if next == 0 {
            return Ok(());
        }
        debug!("extended chain continues at sector {}", ext_base + next);
    }
    Err(DiskError::ExtendedChainTooLong(MAX_EXTENDED_CHAIN))
}
