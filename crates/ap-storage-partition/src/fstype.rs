//! Filesystem type tags.

/// The fstype byte of a disklabel partition.
///
/// GPT type GUIDs are mapped onto the same values so that a partition
/// looks the same no matter which table described it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FsType(pub u8);

impl FsType {
    pub const UNUSED: Self = Self(0);
    pub const SWAP: Self = Self(1);
    pub const V6: Self = Self(2);
    pub const V7: Self = Self(3);
    pub const SYSV: Self = Self(4);
    pub const V71K: Self = Self(5);
    pub const V8: Self = Self(6);
    pub const BSDFFS: Self = Self(7);
    pub const MSDOS: Self = Self(8);
    pub const BSDLFS: Self = Self(9);
    pub const OTHER: Self = Self(10);
    pub const HPFS: Self = Self(11);
    pub const ISO9660: Self = Self(12);
    pub const BOOT: Self = Self(13);
    pub const ADOS: Self = Self(14);
    pub const HFS: Self = Self(15);
    pub const FILECORE: Self = Self(16);
    pub const EX2FS: Self = Self(17);
    pub const NTFS: Self = Self(18);
    pub const RAID: Self = Self(19);
    pub const CCD: Self = Self(20);
    pub const JFS2: Self = Self(21);
    pub const APPLEUFS: Self = Self(22);
    pub const VINUM: Self = Self(23);
    pub const UDF: Self = Self(24);
    pub const SYSVBFS: Self = Self(25);
    pub const EFS: Self = Self(26);
    pub const NILFS: Self = Self(27);
    pub const CGD: Self = Self(28);
    pub const MINIXFS3: Self = Self(29);
    pub const VMKCORE: Self = Self(30);
    pub const VMFS: Self = Self(31);
    pub const VMWRESV: Self = Self(32);
    pub const ZFS: Self = Self(33);

    /// Human readable name, indexed by the fstype byte.
    pub fn name(self) -> &'static str {
        FSTYPE_NAMES.get(self.0 as usize).copied().unwrap_or("unknown")
    }
}

const FSTYPE_NAMES: [&str; 34] = [
    "unused",
    "swap",
    "Version 6",
    "Version 7",
    "System V",
    "4.1BSD",
    "Eighth Edition",
    "4.2BSD",
    "MSDOS",
    "4.4LFS",
    "unknown",
    "HPFS",
    "ISO9660",
    "boot",
    "ADOS",
    "HFS",
    "FILECORE",
    "Linux Ext2",
    "NTFS",
    "RAID",
    "ccd",
    "jfs",
    "Apple UFS",
    "vinum",
    "UDF",
    "SysVBFS",
    "EFS",
    "NiLFS",
    "cgd",
    "MINIX FSv3",
    "VMware vmkcore",
    "VMware VMFS",
    "VMware Reserved",
    "ZFS",
];

impl core::fmt::Display for FsType {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        fmt.write_str(self.name())
    }
}

impl core::fmt::Debug for FsType {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        write!(fmt, "FsType({}, {:?})", self.0, self.name())
    }
}
