//! NetBSD disklabel.

use crate::{bytes::Bytes, DiskError, FsType, PartitionEntry};
use alloc::vec::Vec;
use ap_storage::{BlockRead, BlockReadExt, Lba};
use log::debug;

pub const DISKMAGIC: u32 = 0x8256_4557;
/// The label sits in the second 512-byte sector of its slice.
pub const LABELSECTOR: u64 = 1;
pub const LABELOFFSET: u64 = 0;
pub const MAXPARTITIONS: usize = 16;
/// Unit of `LABELSECTOR`.
pub const DEV_BSIZE: u64 = 512;

const D_MAGIC: usize = 0;
const D_TYPE: usize = 4;
const D_SUBTYPE: usize = 6;
const D_TYPENAME: usize = 8;
const D_PACKNAME: usize = 24;
const D_SECSIZE: usize = 40;
const D_NSECTORS: usize = 44;
const D_NTRACKS: usize = 48;
const D_NCYLINDERS: usize = 52;
const D_SECPERCYL: usize = 56;
const D_SECPERUNIT: usize = 60;
const D_MAGIC2: usize = 132;
const D_CHECKSUM: usize = 136;
const D_NPARTITIONS: usize = 138;
const D_BBSIZE: usize = 140;
const D_SBSIZE: usize = 144;
const D_PARTITIONS: usize = 148;
const PARTITION_SIZE: usize = 16;

/// The size of a label with all partitions.
pub const LABEL_SIZE: usize = D_PARTITIONS + MAXPARTITIONS * PARTITION_SIZE;

/// A decoded disklabel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskLabel {
    pub dtype: u16,
    pub subtype: u16,
    pub typename: [u8; 16],
    pub packname: [u8; 16],
    pub secsize: u32,
    pub nsectors: u32,
    pub ntracks: u32,
    pub ncylinders: u32,
    pub secpercyl: u32,
    pub secperunit: u32,
    pub checksum: u16,
    pub bbsize: u32,
    pub sbsize: u32,
    /// One entry per declared partition, letters are positional.
    pub partitions: Vec<PartitionEntry>,
}

/// XOR of all 16-bit words of the label up to the last declared partition.
///
/// Zero for a label whose checksum field is right.
pub fn dkcksum(buf: &[u8], npartitions: usize) -> u16 {
    let end = core::cmp::min(buf.len(), D_PARTITIONS + npartitions * PARTITION_SIZE);
    buf[..end]
        .chunks_exact(2)
        .fold(0, |sum, w| sum ^ u16::from_le_bytes([w[0], w[1]]))
}

fn text(field: &[u8]) -> &str {
    let len = field.iter().position(|c| *c == 0).unwrap_or(field.len());
    core::str::from_utf8(&field[..len]).unwrap_or("")
}

impl DiskLabel {
    /// Decode a label.  Partition offsets are shifted by `base`.
    pub fn decode(buf: &[u8], base: Lba) -> Result<Self, DiskError> {
        let b = Bytes::new("disklabel", buf, D_PARTITIONS)?;
        if b.u32(D_MAGIC) != DISKMAGIC || b.u32(D_MAGIC2) != DISKMAGIC {
            return Err(DiskError::NoLabel);
        }
        let npartitions = b.u16(D_NPARTITIONS) as usize;
        if npartitions == 0 {
            return Err(DiskError::CorruptLabel("no partitions"));
        }
        if npartitions > MAXPARTITIONS {
            return Err(DiskError::CorruptLabel("too many partitions"));
        }
        let b = Bytes::new("disklabel", buf, D_PARTITIONS + npartitions * PARTITION_SIZE)?;
        if dkcksum(buf, npartitions) != 0 {
            return Err(DiskError::CorruptLabel("bad checksum"));
        }

        let checksum = b.u16(D_CHECKSUM);
        let partitions = (0..npartitions)
            .map(|i| {
                let p = D_PARTITIONS + i * PARTITION_SIZE;
                let size = b.u32(p) as u64;
                let offset = b.u32(p + 4) as u64;
                let fstype = FsType(b.u8(p + 12));
                if fstype == FsType::UNUSED || size == 0 {
                    return Ok(PartitionEntry::Unused);
                }
                let sector_offset = base
                    .checked_add(offset)
                    .ok_or(DiskError::OutOfRange("disklabel partition"))?;
                Ok(PartitionEntry::Disklabel {
                    sector_offset,
                    sector_count: size,
                    fstype,
                    raw_label_checksum: checksum,
                })
            })
            .collect::<Result<_, DiskError>>()?;

        Ok(Self {
            dtype: b.u16(D_TYPE),
            subtype: b.u16(D_SUBTYPE),
            typename: b.array(D_TYPENAME),
            packname: b.array(D_PACKNAME),
            secsize: b.u32(D_SECSIZE),
            nsectors: b.u32(D_NSECTORS),
            ntracks: b.u32(D_NTRACKS),
            ncylinders: b.u32(D_NCYLINDERS),
            secpercyl: b.u32(D_SECPERCYL),
            secperunit: b.u32(D_SECPERUNIT),
            checksum,
            bbsize: b.u32(D_BBSIZE),
            sbsize: b.u32(D_SBSIZE),
            partitions,
        })
    }

    pub fn npartitions(&self) -> usize {
        self.partitions.len()
    }

    /// The slot for a partition index, `Unused` ones included.
    pub fn partition(&self, index: usize) -> Option<&PartitionEntry> {
        self.partitions.get(index)
    }

    pub fn typename(&self) -> &str {
        text(&self.typename)
    }

    pub fn packname(&self) -> &str {
        text(&self.packname)
    }
}

/// Look for a label in the slice starting at `base + candidate`.
pub fn parse_disklabel(disk: &dyn BlockRead, base: Lba, candidate: Lba) -> Result<DiskLabel, DiskError> {
    let bs = disk.block_size() as u64;
    let start = base.checked_add(candidate).ok_or(DiskError::OutOfRange("disklabel"))?;
    let pos = start
        .checked_mul(bs)
        .and_then(|p| p.checked_add(LABELSECTOR * DEV_BSIZE + LABELOFFSET))
        .ok_or(DiskError::OutOfRange("disklabel"))?;
    let within = (pos % bs) as usize;
    let count = disk.blocks_for(within as u64 + LABEL_SIZE as u64) as usize;
    let buf = disk.read_vec(pos / bs, count)?;
    let label = DiskLabel::decode(&buf[within..], base)?;
    debug!(
        "disklabel at {start}: {:?} with {} partitions",
        label.packname(),
        label.npartitions()
    );
    Ok(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_boot_mkimage::{Image, MakeLabel};
    use ap_storage::Blocks;
    use ap_storage_memory::ReadSlice;

    fn parse(img: &Image, candidate: Lba) -> Result<DiskLabel, DiskError> {
        let slice = ReadSlice(img.bytes());
        let disk = Blocks::new(&slice, img.block_size()).unwrap();
        parse_disklabel(&disk, 0, candidate)
    }

    #[test]
    fn partition_counts() {
        for n in 1..=MAXPARTITIONS {
            let mut img = Image::new(256, 512);
            let mut label = MakeLabel::default();
            for i in 0..n {
                label = label.partition(i, 10 + i as u32 * 10, 10, FsType::BSDFFS.0);
            }
            label.write(&mut img, 0);
            let res = parse(&img, 0).unwrap();
            assert_eq!(res.npartitions(), n);
            assert_eq!(
                res.partition(n - 1),
                Some(&PartitionEntry::Disklabel {
                    sector_offset: 10 + (n as u64 - 1) * 10,
                    sector_count: 10,
                    fstype: FsType::BSDFFS,
                    raw_label_checksum: res.checksum,
                })
            );
        }
    }

    #[test]
    fn bad_counts_are_corrupt() {
        for n in [0u16, 17, 0xffff] {
            let mut img = Image::new(64, 512);
            MakeLabel::default().npartitions(n).write(&mut img, 0);
            assert!(matches!(parse(&img, 0), Err(DiskError::CorruptLabel(_))), "{n}");
        }
    }

    #[test]
    fn magic_and_checksum() {
        let img = Image::new(64, 512);
        assert!(matches!(parse(&img, 0), Err(DiskError::NoLabel)));

        // only one magic is not enough
        let mut img = Image::new(64, 512);
        MakeLabel::default().partition(0, 16, 32, 7).write(&mut img, 0);
        img.write_at(512 + 132, &[0; 4]);
        assert!(matches!(parse(&img, 0), Err(DiskError::NoLabel)));

        let mut img = Image::new(64, 512);
        MakeLabel::default().partition(0, 16, 32, 7).checksum_fixup(1).write(&mut img, 0);
        assert!(matches!(parse(&img, 0), Err(DiskError::CorruptLabel(_))));
    }

    #[test]
    fn unused_slots_keep_letters() {
        let mut img = Image::new(512, 512);
        MakeLabel::default()
            .partition(0, 64, 100, FsType::BSDFFS.0)
            .partition(1, 164, 100, FsType::SWAP.0)
            .partition(3, 0, 512, FsType::UNUSED.0)
            .partition(4, 300, 0, FsType::BSDFFS.0)
            .partition(5, 300, 100, FsType::MSDOS.0)
            .packname("fictitious")
            .write(&mut img, 0);
        let label = parse(&img, 0).unwrap();
        assert_eq!(label.npartitions(), 6);
        assert_eq!(label.packname(), "fictitious");
        assert_eq!(label.partition(2), Some(&PartitionEntry::Unused));
        assert_eq!(label.partition(3), Some(&PartitionEntry::Unused));
        assert_eq!(label.partition(4), Some(&PartitionEntry::Unused));
        assert_eq!(label.partition(5).map(|p| p.fstype()), Some(FsType::MSDOS));
        assert!(label.partition(6).is_none());
    }

    #[test]
    fn inside_mbr_slice() {
        let mut img = Image::new(4096, 512);
        MakeLabel::default().partition(0, 2048, 1000, FsType::BSDFFS.0).write(&mut img, 2048);
        assert!(matches!(parse(&img, 0), Err(DiskError::NoLabel)));
        let label = parse(&img, 2048).unwrap();
        // offsets are absolute on the disk
        assert_eq!(label.partition(0).and_then(|p| p.extent()), Some((2048, 1000)));

        // a label inside a nested volume is relative to the volume
        let slice = ReadSlice(img.bytes());
        let disk = Blocks::new(&slice, 512).unwrap();
        let label = parse_disklabel(&disk, 2000, 48).unwrap();
        assert_eq!(label.partition(0).and_then(|p| p.extent()), Some((4048, 1000)));
    }

    #[test]
    fn large_sectors() {
        // the label is at byte 512, inside the first 2048-byte block
        let mut img = Image::new(64, 2048);
        MakeLabel::default().partition(0, 4, 16, FsType::ISO9660.0).write(&mut img, 0);
        let label = parse(&img, 0).unwrap();
        assert_eq!(label.partition(0).map(|p| p.fstype()), Some(FsType::ISO9660));
    }

    #[test]
    fn sector_arithmetic_is_checked() {
        let mut img = Image::new(256, 512);
        MakeLabel::default().partition(0, 16, 100, FsType::BSDFFS.0).write(&mut img, 0);
        let slice = ReadSlice(img.bytes());
        let disk = Blocks::new(&slice, 512).unwrap();
        assert!(matches!(parse_disklabel(&disk, u64::MAX, 1), Err(DiskError::OutOfRange(_))));
        assert!(matches!(parse_disklabel(&disk, u64::MAX / 256, 0), Err(DiskError::OutOfRange(_))));

        // partition offsets are added to the base of the volume
        assert!(DiskLabel::decode(&img.bytes()[512..], u64::MAX - 100).is_ok());
        assert!(matches!(DiskLabel::decode(&img.bytes()[512..], u64::MAX - 10), Err(DiskError::OutOfRange(_))));
    }
}
