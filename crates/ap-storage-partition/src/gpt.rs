//! GUID partition tables.

use crate::{bytes::Bytes, DiskError, FsType, Guid, PartitionEntry};
use alloc::string::String;
use alloc::vec::Vec;
use ap_storage::{BlockRead, BlockReadExt, Lba};
use log::{debug, trace};

pub const GPT_HDR_SIG: [u8; 8] = *b"EFI PART";
pub const GPT_HDR_REVISION: u32 = 0x0001_0000;
/// The bytes of the header that carry defined fields.
pub const GPT_HDR_SIZE: usize = 92;
/// The size of an entry without padding.
pub const GPT_ENT_SIZE: usize = 128;
/// UTF-16 code units in the name field.
pub const GPT_ENT_NAME_LEN: usize = 36;
/// The header lives in the second sector of the volume.
pub const GPT_HDR_LBA: Lba = 1;
/// Refuse entry arrays larger than this.
pub const GPT_TABLE_MAX_BYTES: u64 = 1 << 20;

pub const GPT_ENT_TYPE_NETBSD_FFS: Guid =
    Guid::from_fields(0x49f48d5a, 0xb10e, 0x11dc, [0xb9, 0x9b, 0x00, 0x19, 0xd1, 0x87, 0x96, 0x48]);
pub const GPT_ENT_TYPE_NETBSD_LFS: Guid =
    Guid::from_fields(0x49f48d82, 0xb10e, 0x11dc, [0xb9, 0x9b, 0x00, 0x19, 0xd1, 0x87, 0x96, 0x48]);
pub const GPT_ENT_TYPE_NETBSD_SWAP: Guid =
    Guid::from_fields(0x49f48d32, 0xb10e, 0x11dc, [0xb9, 0x9b, 0x00, 0x19, 0xd1, 0x87, 0x96, 0x48]);
pub const GPT_ENT_TYPE_NETBSD_RAIDFRAME: Guid =
    Guid::from_fields(0x49f48daa, 0xb10e, 0x11dc, [0xb9, 0x9b, 0x00, 0x19, 0xd1, 0x87, 0x96, 0x48]);
pub const GPT_ENT_TYPE_NETBSD_CCD: Guid =
    Guid::from_fields(0x2db519c4, 0xb10f, 0x11dc, [0xb9, 0x9b, 0x00, 0x19, 0xd1, 0x87, 0x96, 0x48]);
pub const GPT_ENT_TYPE_NETBSD_CGD: Guid =
    Guid::from_fields(0x2db519ec, 0xb10f, 0x11dc, [0xb9, 0x9b, 0x00, 0x19, 0xd1, 0x87, 0x96, 0x48]);
pub const GPT_ENT_TYPE_MS_BASIC_DATA: Guid =
    Guid::from_fields(0xebd0a0a2, 0xb9e5, 0x4433, [0x87, 0xc0, 0x68, 0xb6, 0xb7, 0x26, 0x99, 0xc7]);
pub const GPT_ENT_TYPE_EFI: Guid =
    Guid::from_fields(0xc12a7328, 0xf81f, 0x11d2, [0xba, 0x4b, 0x00, 0xa0, 0xc9, 0x3e, 0xc9, 0x3b]);

/// Known partition types.
///
/// Basic data may be FAT or NTFS, it is reported as MSDOS.
const GPT_FSTYPES: [(Guid, FsType); 8] = [
    (GPT_ENT_TYPE_NETBSD_FFS, FsType::BSDFFS),
    (GPT_ENT_TYPE_NETBSD_LFS, FsType::BSDLFS),
    (GPT_ENT_TYPE_NETBSD_SWAP, FsType::SWAP),
    (GPT_ENT_TYPE_NETBSD_RAIDFRAME, FsType::RAID),
    (GPT_ENT_TYPE_NETBSD_CCD, FsType::CCD),
    (GPT_ENT_TYPE_NETBSD_CGD, FsType::CGD),
    (GPT_ENT_TYPE_MS_BASIC_DATA, FsType::MSDOS),
    (GPT_ENT_TYPE_EFI, FsType::MSDOS),
];

/// Map a type GUID to an fstype.  Unknown types become [`FsType::OTHER`].
pub fn fstype_for(typ: &Guid) -> FsType {
    GPT_FSTYPES
        .iter()
        .find(|(g, _)| g == typ)
        .map(|(_, f)| *f)
        .unwrap_or(FsType::OTHER)
}

/// The GPT header - decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GptHeader {
    pub revision: u32,
    pub header_size: u32,
    pub header_crc: u32,
    pub current_lba: Lba,
    pub backup_lba: Lba,
    pub first_usable: Lba,
    pub last_usable: Lba,
    pub disk_guid: Guid,
    /// Start of the entry array, relative to the volume.
    pub table_lba: Lba,
    pub entry_count: u32,
    pub entry_size: u32,
    pub table_crc: u32,
}

impl GptHeader {
    /// Decode and validate a header sector.
    pub fn decode(buf: &[u8]) -> Result<Self, DiskError> {
        let b = Bytes::new("GPT header", buf, GPT_HDR_SIZE)?;
        if b.array::<8>(0) != GPT_HDR_SIG {
            return Err(DiskError::NoGpt);
        }
        let hdr = Self {
            revision: b.u32(8),
            header_size: b.u32(12),
            header_crc: b.u32(16),
            current_lba: b.u64(24),
            backup_lba: b.u64(32),
            first_usable: b.u64(40),
            last_usable: b.u64(48),
            disk_guid: Guid::from_bytes(b.array(56)),
            table_lba: b.u64(72),
            entry_count: b.u32(80),
            entry_size: b.u32(84),
            table_crc: b.u32(88),
        };
        if hdr.revision != GPT_HDR_REVISION {
            return Err(DiskError::InvalidGptHeader("unsupported revision"));
        }
        if (hdr.header_size as usize) < GPT_HDR_SIZE {
            return Err(DiskError::InvalidGptHeader("header too small"));
        }
        if (hdr.entry_size as usize) < GPT_ENT_SIZE {
            return Err(DiskError::InvalidGptHeader("entry size too small"));
        }
        if hdr.entry_size % 8 != 0 {
            return Err(DiskError::InvalidGptHeader("entry size not aligned"));
        }
        if hdr.table_bytes() > GPT_TABLE_MAX_BYTES {
            return Err(DiskError::InvalidGptHeader("entry array too large"));
        }
        if hdr.table_lba <= GPT_HDR_LBA {
            return Err(DiskError::InvalidGptHeader("entry array overlaps header"));
        }
        Ok(hdr)
    }

    /// The size of the entry array in bytes.
    pub fn table_bytes(&self) -> u64 {
        self.entry_count as u64 * self.entry_size as u64
    }
}

/// A single GPT entry - decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GptEntry {
    pub type_guid: Guid,
    pub partition_guid: Guid,
    pub first_lba: Lba,
    /// Inclusive, as on disk.
    pub last_lba: Lba,
    pub attributes: u64,
    pub name: [u16; GPT_ENT_NAME_LEN],
}

impl GptEntry {
    pub fn decode(buf: &[u8]) -> Result<Self, DiskError> {
        let b = Bytes::new("GPT entry", buf, GPT_ENT_SIZE)?;
        let mut name = [0u16; GPT_ENT_NAME_LEN];
        for (i, c) in name.iter_mut().enumerate() {
            *c = b.u16(56 + 2 * i);
        }
        Ok(Self {
            type_guid: Guid::from_bytes(b.array(0)),
            partition_guid: Guid::from_bytes(b.array(16)),
            first_lba: b.u64(32),
            last_lba: b.u64(40),
            attributes: b.u64(48),
            name,
        })
    }

    pub fn is_unused(&self) -> bool {
        self.type_guid.is_nil()
    }

    /// The name up to the first NUL.  `None` if the field is all zero.
    pub fn name(&self) -> Option<String> {
        if self.name.iter().all(|c| *c == 0) {
            return None;
        }
        let len = self.name.iter().position(|c| *c == 0).unwrap_or(GPT_ENT_NAME_LEN);
        Some(
            char::decode_utf16(self.name[..len].iter().copied())
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect(),
        )
    }
}

/// Read the header at `base + 1` and the entries it describes.
///
/// Unused entries are skipped.  Returned LBAs are absolute.
pub fn read_gpt(disk: &dyn BlockRead, base: Lba) -> Result<(GptHeader, Vec<PartitionEntry>), DiskError> {
    let hdr_lba = base.checked_add(GPT_HDR_LBA).ok_or(DiskError::OutOfRange("GPT header"))?;
    let buf = disk.read_vec(hdr_lba, 1)?;
    let hdr = GptHeader::decode(&buf)?;
    debug!(
        "GPT at {base}: {} entries of {} bytes at lba {}",
        hdr.entry_count, hdr.entry_size, hdr.table_lba
    );

    let count = disk.blocks_for(hdr.table_bytes()) as usize;
    let table_lba = base
        .checked_add(hdr.table_lba)
        .ok_or(DiskError::InvalidGptHeader("entry array out of range"))?;
    let table = disk.read_vec(table_lba, count)?;
    let mut entries = Vec::new();
    for i in 0..hdr.entry_count as usize {
        let ofs = i * hdr.entry_size as usize;
        let ent = GptEntry::decode(&table[ofs..])?;
        if ent.is_unused() {
            continue;
        }
        if ent.last_lba < ent.first_lba {
            return Err(DiskError::InvalidGptHeader("entry ends before it starts"));
        }
        if ent.last_lba > hdr.last_usable {
            return Err(DiskError::InvalidGptHeader("entry beyond last usable sector"));
        }
        let (Some(lba_start), Some(lba_end)) = (
            base.checked_add(ent.first_lba),
            base.checked_add(ent.last_lba).and_then(|x| x.checked_add(1)),
        ) else {
            return Err(DiskError::InvalidGptHeader("entry out of range"));
        };
        let fstype = fstype_for(&ent.type_guid);
        trace!("GPT entry {i}: {} {} {fstype}", ent.type_guid, ent.partition_guid);
        entries.push(PartitionEntry::Gpt {
            lba_start,
            lba_end,
            fstype,
            partition_guid: ent.partition_guid,
            partition_name: ent.name(),
        });
    }
    Ok((hdr, entries))
}

/// The used entries of the GPT at `base`.
pub fn parse_gpt(disk: &dyn BlockRead, base: Lba) -> Result<Vec<PartitionEntry>, DiskError> {
    read_gpt(disk, base).map(|(_, entries)| entries)
}
