//! The disks the firmware knows about.

use crate::devspec::{DeviceDefaults, DEFAULT_FILENAME};
use alloc::{format, string::String, vec::Vec};
use ap_storage::{BlockRead, Blocks, Error, Lba, Read, ReadExt};
use log::{debug, warn};

/// What kind of device a name prefix refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    HardDisk,
    Floppy,
    Optical,
    /// A RAIDframe volume, numbered by its last configured unit.
    Raid,
    /// Boots over the network, no partitions.
    Network,
}

/// Name prefixes in lookup order.
const DEVICE_CLASSES: [(&str, DeviceClass); 9] = [
    ("hd", DeviceClass::HardDisk),
    ("wd", DeviceClass::HardDisk),
    ("sd", DeviceClass::HardDisk),
    ("fd", DeviceClass::Floppy),
    ("cd", DeviceClass::Optical),
    ("raid", DeviceClass::Raid),
    ("net", DeviceClass::Network),
    ("nfs", DeviceClass::Network),
    ("tftp", DeviceClass::Network),
];

impl DeviceClass {
    pub fn lookup(name: &str) -> Option<Self> {
        DEVICE_CLASSES.iter().find(|(n, _)| *n == name).map(|(_, c)| *c)
    }

    /// The prefix used when naming devices of this class.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::HardDisk => "hd",
            Self::Floppy => "fd",
            Self::Optical => "cd",
            Self::Raid => "raid",
            Self::Network => "net",
        }
    }

    /// Does the class have partitions on a block device?
    pub fn is_block(self) -> bool {
        !matches!(self, Self::Network)
    }
}

/// A disk as reported by the firmware.
pub struct FirmwareDisk<'a> {
    pub disk: &'a dyn Read,
    pub class: DeviceClass,
    pub block_size: u32,
    /// `None` if the firmware does not know the size.
    pub blocks: Option<u64>,
    pub removable: bool,
    /// The firmware booted from this disk.
    pub boot: bool,
}

impl<'a> FirmwareDisk<'a> {
    pub fn new(disk: &'a dyn Read, class: DeviceClass, block_size: u32) -> Self {
        Self {
            disk,
            class,
            block_size,
            blocks: None,
            removable: false,
            boot: false,
        }
    }

    pub fn blocks(self, blocks: u64) -> Self {
        Self {
            blocks: Some(blocks),
            ..self
        }
    }

    pub fn removable(self, removable: bool) -> Self {
        Self { removable, ..self }
    }

    pub fn boot(self, boot: bool) -> Self {
        Self { boot, ..self }
    }
}

/// A probed disk with its unit number.
pub struct BlockDevice<'a> {
    blocks: Blocks<'a>,
    pub class: DeviceClass,
    pub unit: u32,
    /// Sectors on the whole device.
    pub block_count: u64,
    pub removable: bool,
}

impl<'a> BlockDevice<'a> {
    pub fn new(
        disk: &'a dyn Read,
        class: DeviceClass,
        unit: u32,
        block_size: u32,
        block_count: u64,
    ) -> Result<Self, Error> {
        Ok(Self {
            blocks: Blocks::new(disk, block_size)?,
            class,
            unit,
            block_count,
            removable: false,
        })
    }

    /// `hd0` style name.
    pub fn name(&self) -> String {
        format!("{}{}", self.class.prefix(), self.unit)
    }

    pub fn size_bytes(&self) -> u64 {
        self.block_count.saturating_mul(self.blocks.block_size() as u64)
    }

    /// The underlying byte reader.
    pub fn disk(&self) -> &'a dyn Read {
        self.blocks.disk()
    }
}

impl BlockRead for BlockDevice<'_> {
    fn block_size(&self) -> u32 {
        self.blocks.block_size()
    }

    fn read_blocks(&self, lba: Lba, buf: &mut [u8]) -> Result<(), Error> {
        self.blocks.read_blocks(lba, buf)
    }
}

impl core::fmt::Debug for BlockDevice<'_> {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        fmt.debug_struct("BlockDevice")
            .field("name", &self.name())
            .field("block_size", &self.block_size())
            .field("block_count", &self.block_count)
            .field("removable", &self.removable)
            .finish()
    }
}

/// All probed disks.  Built once and only read afterwards.
#[derive(Debug, Default)]
pub struct DeviceList<'a> {
    devices: Vec<BlockDevice<'a>>,
    boot: Option<usize>,
}

impl<'a> DeviceList<'a> {
    /// Number the disks per class in the order given.
    ///
    /// Disks with an unusable block size are skipped.
    pub fn probe(disks: impl IntoIterator<Item = FirmwareDisk<'a>>) -> Self {
        let mut list = Self::default();
        for fw in disks {
            if !fw.class.is_block() {
                warn!("ignoring firmware disk of class {:?}", fw.class);
                continue;
            }
            let unit = list.devices.iter().filter(|d| d.class == fw.class).count() as u32;
            let block_count = match fw.blocks {
                Some(n) => n,
                None => fw.disk.detect_size() / fw.block_size.max(1) as u64,
            };
            let mut dev = match BlockDevice::new(fw.disk, fw.class, unit, fw.block_size, block_count) {
                Ok(dev) => dev,
                Err(e) => {
                    warn!("skipping {}{}: {e}", fw.class.prefix(), unit);
                    continue;
                }
            };
            dev.removable = fw.removable;
            debug!("probed {} with {} blocks of {}", dev.name(), dev.block_count, dev.block_size());
            if fw.boot && list.boot.is_none() {
                list.boot = Some(list.devices.len());
            }
            list.devices.push(dev);
        }
        list
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockDevice<'a>> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// The device of a class and unit.
    pub fn find(&self, class: DeviceClass, unit: u32) -> Option<&BlockDevice<'a>> {
        self.devices.iter().find(|d| d.class == class && d.unit == unit)
    }

    /// The disk the firmware booted from.
    pub fn boot_device(&self) -> Option<&BlockDevice<'a>> {
        self.boot.and_then(|i| self.devices.get(i))
    }
}

impl DeviceDefaults {
    /// Start on the boot device, partition `a`.
    pub fn from_probe(list: &DeviceList) -> Self {
        match list.boot_device() {
            Some(dev) => Self {
                class: dev.class.prefix().into(),
                unit: dev.unit,
                partition: 'a',
                file: DEFAULT_FILENAME.into(),
            },
            None => Self::default(),
        }
    }
}
