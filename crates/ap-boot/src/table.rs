//! Find the partition table of a volume.

use alloc::vec::Vec;
use ap_storage::{BlockRead, Lba};
use ap_storage_partition::{parse_disklabel, parse_gpt, parse_mbr, DiskError, DiskLabel, MbrKind, PartitionEntry};
use log::{debug, trace, warn};

/// A region of a device that can hold partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Volume {
    pub base: Lba,
    pub sectors: u64,
}

impl Volume {
    pub fn new(base: Lba, sectors: u64) -> Self {
        Self { base, sectors }
    }
}

/// What was found on a volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionTable {
    /// The used GPT entries in table order.
    Gpt(Vec<PartitionEntry>),
    Label(DiskLabel),
    /// No partitions.  The region is the NetBSD MBR partition if there
    /// is one, the whole volume otherwise.
    Raw(Volume),
}

impl PartitionTable {
    /// The slot behind a partition index.
    pub fn entry(&self, index: usize) -> Option<&PartitionEntry> {
        match self {
            Self::Gpt(entries) => entries.get(index),
            Self::Label(label) => label.partition(index),
            Self::Raw(_) => None,
        }
    }

    /// All slots, letters are positional.
    pub fn entries(&self) -> &[PartitionEntry] {
        match self {
            Self::Gpt(entries) => entries,
            Self::Label(label) => &label.partitions,
            Self::Raw(_) => &[],
        }
    }
}

/// Look for GPT, then MBR with a disklabel, then a bare disklabel.
///
/// Only missing formats fall through to the next one.
pub fn discover(disk: &dyn BlockRead, vol: Volume) -> Result<PartitionTable, DiskError> {
    match parse_gpt(disk, vol.base) {
        Ok(entries) => {
            debug!("GPT at {} with {} entries", vol.base, entries.len());
            return Ok(PartitionTable::Gpt(entries));
        }
        Err(DiskError::NoGpt) => trace!("no GPT at {}", vol.base),
        Err(e) => return Err(e),
    }

    let slice = match parse_mbr(disk, vol.base) {
        Ok(mbr) => match mbr.netbsd_candidate() {
            Some(slot) => {
                if slot.kind == MbrKind::LegacyNetBsd {
                    warn!("disk appears to use a legacy partition id");
                }
                debug!("NetBSD MBR partition {} at {}", slot.index, slot.start);
                let end = vol.base.saturating_add(vol.sectors);
                Some(Volume::new(slot.start, slot.size.min(end.saturating_sub(slot.start))))
            }
            None => {
                trace!("no NetBSD MBR partition at {}", vol.base);
                None
            }
        },
        Err(DiskError::NoMbr) => {
            trace!("no MBR at {}", vol.base);
            None
        }
        Err(e) => return Err(e),
    };

    let candidate = slice.map_or(0, |s| s.base.saturating_sub(vol.base));
    match parse_disklabel(disk, vol.base, candidate) {
        Ok(label) => Ok(PartitionTable::Label(label)),
        Err(DiskError::NoLabel) => {
            let region = slice.unwrap_or(vol);
            debug!("no partitions at {}, using {} sectors at {}", vol.base, region.sectors, region.base);
            Ok(PartitionTable::Raw(region))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_boot_mkimage::{Image, MakeGpt, MakeLabel, MakeMbr};
    use ap_storage::Blocks;
    use ap_storage_memory::ReadSlice;
    use ap_storage_partition::{gpt::GPT_ENT_TYPE_NETBSD_FFS, FsType};

    fn run(img: &Image, vol: Volume) -> Result<PartitionTable, DiskError> {
        let slice = ReadSlice(img.bytes());
        let disk = Blocks::new(&slice, img.block_size()).unwrap();
        discover(&disk, vol)
    }

    #[test]
    fn empty_disk_is_raw() {
        let img = Image::new(128, 512);
        assert_eq!(run(&img, Volume::new(0, 128)).unwrap(), PartitionTable::Raw(Volume::new(0, 128)));
    }

    #[test]
    fn unlabeled_netbsd_slot_is_the_raw_region() {
        let mut img = Image::new(8192, 512);
        MakeMbr::default().entry(0, 0x0c, 63, 1985).entry(1, 0xa9, 2048, 6144).write(&mut img, 0);
        let table = run(&img, Volume::new(0, 8192)).unwrap();
        assert_eq!(table, PartitionTable::Raw(Volume::new(2048, 6144)));

        // a slot running past the end of the volume is cut short
        let mut img = Image::new(4096, 512);
        MakeMbr::default().entry(0, 0xa9, 2048, 6144).write(&mut img, 0);
        let table = run(&img, Volume::new(0, 4096)).unwrap();
        assert_eq!(table, PartitionTable::Raw(Volume::new(2048, 2048)));
    }

    #[test]
    fn mbr_without_netbsd_and_label_is_the_whole_volume() {
        let mut img = Image::new(256, 512);
        MakeMbr::default().entry(0, 0x83, 63, 100).write(&mut img, 0);
        assert_eq!(run(&img, Volume::new(0, 256)).unwrap(), PartitionTable::Raw(Volume::new(0, 256)));
    }

    #[test]
    fn label_at_the_netbsd_slot() {
        let mut img = Image::new(4096, 512);
        MakeMbr::default().entry(0, 0x0c, 63, 1000).entry(1, 0xa9, 2048, 2048).write(&mut img, 0);
        MakeLabel::default().partition(0, 2048, 1024, FsType::BSDFFS.0).write(&mut img, 2048);
        let table = run(&img, Volume::new(0, 4096)).unwrap();
        assert_eq!(table.entry(0).and_then(|e| e.extent()), Some((2048, 1024)));
        assert!(table.entry(1).is_none());
    }

    #[test]
    fn mbr_without_netbsd_uses_volume_start() {
        let mut img = Image::new(256, 512);
        MakeMbr::default().entry(0, 0x83, 63, 100).write(&mut img, 0);
        MakeLabel::default().partition(0, 0, 256, FsType::BSDFFS.0).write(&mut img, 0);
        let table = run(&img, Volume::new(0, 256)).unwrap();
        assert!(matches!(table, PartitionTable::Label(_)));
    }

    #[test]
    fn gpt_first() {
        let mut img = Image::new(256, 512);
        MakeMbr::protective(&img).write(&mut img, 0);
        MakeGpt::default()
            .entry(GPT_ENT_TYPE_NETBSD_FFS.bytes(), [7; 16], 40, 199, "root")
            .write(&mut img, 0);
        let table = run(&img, Volume::new(0, 256)).unwrap();
        assert_eq!(table.entries().len(), 1);
        assert_eq!(table.entry(0).and_then(|e| e.name()), Some("root"));
    }

    #[test]
    fn broken_formats_are_fatal() {
        let mut img = Image::new(256, 512);
        MakeLabel::default().partition(0, 0, 256, 7).checksum_fixup(3).write(&mut img, 0);
        assert!(matches!(run(&img, Volume::new(0, 256)), Err(DiskError::CorruptLabel(_))));

        let mut img = Image::new(256, 512);
        MakeGpt::default().revision(0x20000).write(&mut img, 0);
        assert!(matches!(run(&img, Volume::new(0, 256)), Err(DiskError::InvalidGptHeader(_))));
    }
}
