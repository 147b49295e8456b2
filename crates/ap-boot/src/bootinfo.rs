//! BIOS disk geometry handed to the kernel.
//!
//! One record with a fixed-size entry per BIOS hard disk.  The kernel
//! matches the checksums and MBR records against the disks it finds to
//! map BIOS drive numbers to its own devices.

use crate::{
    device::{DeviceClass, DeviceList},
    BootError,
};
use alloc::vec::Vec;
use ap_storage::ReadExt;
use ap_storage_partition::mbr::{decode_sector, MbrRecord, MBR_PART_COUNT, MBR_PART_SIZE, MBR_SECSIZE};
use log::{debug, warn};

/// Record type of the geometry record.
pub const BTINFO_BIOSGEOM: u32 = 7;
/// Entries a record may hold.
pub const MAX_BIOSGEOM_DISKS: usize = 16;

/// Sector 0 could not be read.
pub const BI_GEOM_INVALID: u32 = 0x0001;
/// The drive is addressed with the extended int13 calls.
pub const BI_GEOM_EXTINT13: u32 = 0x0002;
pub const BI_GEOM_REMOVABLE: u32 = 0x0008;

/// First BIOS hard disk number.
pub const BIOS_HARDDISK: u32 = 0x80;
pub const BIOS_HEADS: u32 = 255;
pub const BIOS_SECTORS: u32 = 63;
/// Largest cylinder count of the legacy interface.
pub const BIOS_MAX_CYLINDERS: u64 = 1024;

const HEADER_SIZE: usize = 12;
/// sec, head, cyl, totsec, flags, dev, cksum, 3 reserved, 4 MBR records
pub const ENTRY_SIZE: usize = 44 + MBR_PART_COUNT * MBR_PART_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiosGeomEntry {
    pub sec: u32,
    pub head: u32,
    pub cyl: u32,
    pub totsec: u64,
    pub flags: u32,
    /// BIOS drive number.
    pub dev: u32,
    /// Sum of the 32-bit words of sector 0.
    pub cksum: u32,
    pub mbrparts: [MbrRecord; MBR_PART_COUNT],
}

impl BiosGeomEntry {
    fn encode(&self, out: &mut Vec<u8>) {
        for v in [self.sec, self.head, self.cyl] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&self.totsec.to_le_bytes());
        for v in [self.flags, self.dev, self.cksum, 0, 0, 0] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for r in &self.mbrparts {
            out.extend_from_slice(&r.encode());
        }
    }

    fn decode(buf: &[u8]) -> Result<Self, BootError> {
        let u32_at = |ofs: usize| u32::from_le_bytes([buf[ofs], buf[ofs + 1], buf[ofs + 2], buf[ofs + 3]]);
        let mut mbrparts = [MbrRecord::default(); MBR_PART_COUNT];
        for (i, r) in mbrparts.iter_mut().enumerate() {
            *r = MbrRecord::decode(&buf[44 + i * MBR_PART_SIZE..])?;
        }
        Ok(Self {
            sec: u32_at(0),
            head: u32_at(4),
            cyl: u32_at(8),
            totsec: u32_at(12) as u64 | (u32_at(16) as u64) << 32,
            flags: u32_at(20),
            dev: u32_at(24),
            cksum: u32_at(28),
            mbrparts,
        })
    }
}

/// Wrapping sum of the little-endian 32-bit words of a sector.
pub fn sector_cksum(sector: &[u8]) -> u32 {
    sector
        .chunks_exact(4)
        .fold(0i32, |sum, w| sum.wrapping_add(i32::from_le_bytes([w[0], w[1], w[2], w[3]]))) as u32
}

/// The geometry record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BiosGeom {
    pub disks: Vec<BiosGeomEntry>,
}

impl BiosGeom {
    /// An entry for each probed hard disk.
    pub fn collect(list: &DeviceList) -> Self {
        let mut disks = Vec::new();
        for dev in list.iter().filter(|d| d.class == DeviceClass::HardDisk) {
            if disks.len() == MAX_BIOSGEOM_DISKS {
                warn!("more than {MAX_BIOSGEOM_DISKS} hard disks, ignoring {}", dev.name());
                continue;
            }
            let totsec = dev.block_count;
            let mut flags = BI_GEOM_EXTINT13;
            if dev.removable {
                flags |= BI_GEOM_REMOVABLE;
            }
            let (cksum, mbrparts) = match dev.disk().read_array::<MBR_SECSIZE>(0) {
                Ok(sector) => (
                    sector_cksum(&sector),
                    decode_sector(&sector).unwrap_or_default(),
                ),
                Err(e) => {
                    warn!("{}: {e}", dev.name());
                    flags |= BI_GEOM_INVALID;
                    (0, Default::default())
                }
            };
            let entry = BiosGeomEntry {
                sec: BIOS_SECTORS,
                head: BIOS_HEADS,
                cyl: core::cmp::min(totsec / (BIOS_HEADS * BIOS_SECTORS) as u64, BIOS_MAX_CYLINDERS) as u32,
                totsec,
                flags,
                dev: BIOS_HARDDISK + dev.unit,
                cksum,
                mbrparts,
            };
            debug!("{}: bios {:#x} cksum {:#010x}", dev.name(), entry.dev, entry.cksum);
            disks.push(entry);
        }
        Self { disks }
    }

    /// The record with its length and type words.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = HEADER_SIZE + self.disks.len() * ENTRY_SIZE;
        let mut out = Vec::with_capacity(len);
        out.extend_from_slice(&(len as u32).to_le_bytes());
        out.extend_from_slice(&BTINFO_BIOSGEOM.to_le_bytes());
        out.extend_from_slice(&(self.disks.len() as u32).to_le_bytes());
        for d in &self.disks {
            d.encode(&mut out);
        }
        out
    }

    /// Parse a record.  The count is checked before anything is allocated.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, BootError> {
        if buf.len() < HEADER_SIZE {
            return Err(BootError::BadBootInfo("truncated header"));
        }
        let u32_at = |ofs: usize| u32::from_le_bytes([buf[ofs], buf[ofs + 1], buf[ofs + 2], buf[ofs + 3]]);
        if u32_at(4) != BTINFO_BIOSGEOM {
            return Err(BootError::BadBootInfo("not a geometry record"));
        }
        let num = u32_at(8) as usize;
        if num > MAX_BIOSGEOM_DISKS {
            return Err(BootError::BadBootInfo("too many disks"));
        }
        let need = HEADER_SIZE + num * ENTRY_SIZE;
        if buf.len() < need || (u32_at(0) as usize) < need {
            return Err(BootError::BadBootInfo("truncated entries"));
        }
        let disks = buf[HEADER_SIZE..need]
            .chunks_exact(ENTRY_SIZE)
            .map(BiosGeomEntry::decode)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { disks })
    }
}
