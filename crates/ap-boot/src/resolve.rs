//! From a boot specification to a readable partition.

use crate::{
    device::{BlockDevice, DeviceClass, DeviceList},
    devspec::{BootPath, DeviceDefaults, DeviceSpec, DEVNAME_MAX},
    partition_letter,
    table::{discover, PartitionTable, Volume},
    BootError,
};
use alloc::{format, string::String};
use ap_storage::{msg2err, BlockRead, Error, Offset, Read};
use ap_storage_partition::{probe_raidframe, FsType, RaidVolume};
use log::{debug, warn};

/// Limits for the resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// How many RAIDframe volumes may be stacked.
    pub max_nesting: usize,
    /// Longest device part of a specification.
    pub devname_max: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_nesting: 1,
            devname_max: DEVNAME_MAX,
        }
    }
}

/// A partition that was selected for booting.
#[derive(Debug)]
pub struct ResolvedBoot<'a> {
    pub device: &'a BlockDevice<'a>,
    /// The letter that was asked for.
    pub partition: char,
    /// Byte offset of the partition on the device.
    pub offset: Offset,
    /// Length of the partition in bytes.
    pub len: u64,
    pub fstype: FsType,
    /// The innermost RAIDframe volume the partition lives in.
    pub raid: Option<RaidVolume>,
    /// The file to load from the partition.
    pub file: String,
}

impl ResolvedBoot<'_> {
    /// `hd0a` or `raid0a` style name.
    pub fn name(&self) -> String {
        match self.raid {
            Some(vol) => format!("raid{}{}", vol.unit, self.partition),
            None => format!("{}{}", self.device.name(), self.partition),
        }
    }
}

/// Reads are relative to the partition and end with it.
impl Read for ResolvedBoot<'_> {
    fn read_bytes(&self, offset: Offset, buf: &mut [u8]) -> Result<usize, Error> {
        if offset >= self.len {
            return Ok(0);
        }
        let maxlen = core::cmp::min(buf.len() as u64, self.len - offset) as usize;
        let pos = self
            .offset
            .checked_add(offset)
            .ok_or(msg2err!("partition offset overflow"))?;
        self.device.disk().read_bytes(pos, &mut buf[..maxlen])
    }
}

/// A network boot, there is no disk involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkBoot {
    pub unit: u32,
    pub file: String,
}

/// What the loader should boot from.
#[derive(Debug)]
pub enum BootTarget<'a> {
    Disk(ResolvedBoot<'a>),
    Network(NetworkBoot),
}

/// Resolve specifications against the probed devices.
pub struct Resolver<'a> {
    devices: &'a DeviceList<'a>,
    options: ResolveOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(devices: &'a DeviceList<'a>) -> Self {
        Self {
            devices,
            options: ResolveOptions::default(),
        }
    }

    pub fn options(self, options: ResolveOptions) -> Self {
        Self { options, ..self }
    }

    /// Parse and resolve a string as typed at the prompt.
    pub fn resolve_str(&self, input: &str, defaults: &DeviceDefaults) -> Result<BootTarget<'a>, BootError> {
        let spec = DeviceSpec::parse_with_limit(input, self.options.devname_max)?;
        self.resolve(&spec, defaults)
    }

    pub fn resolve(&self, spec: &DeviceSpec, defaults: &DeviceDefaults) -> Result<BootTarget<'a>, BootError> {
        let path = spec.merge(defaults);
        let class = DeviceClass::lookup(&path.class)
            .ok_or_else(|| BootError::UnsupportedDeviceClass(path.class.clone()))?;
        if class == DeviceClass::Network {
            return Ok(BootTarget::Network(NetworkBoot {
                unit: path.unit,
                file: path.file,
            }));
        }
        let index = path.partition_index()?;
        let (device, vol, depth) = match class {
            DeviceClass::Raid => {
                let (device, vol) = self.find_raid(path.unit)?;
                (device, vol, 1)
            }
            _ => {
                let device = self
                    .devices
                    .find(class, path.unit)
                    .ok_or_else(|| BootError::NoSuchDevice(format!("{}{}", path.class, path.unit)))?;
                (device, Volume::new(0, device.block_count), 0)
            }
        };
        let raid = (depth > 0).then_some(RaidVolume {
            unit: path.unit,
            base: vol.base,
            sectors: vol.sectors,
        });
        self.select(device, vol, raid, index, depth, &path).map(BootTarget::Disk)
    }

    /// The device and volume of a configured `raidN`.
    ///
    /// RAID partitions on all devices are looked at in probe order.
    fn find_raid(&self, unit: u32) -> Result<(&'a BlockDevice<'a>, Volume), BootError> {
        for device in self.devices.iter() {
            let table = match discover(device, Volume::new(0, device.block_count)) {
                Ok(table) => table,
                Err(e) => {
                    warn!("{}: {e}", device.name());
                    continue;
                }
            };
            for entry in table.entries() {
                let Some((start, sectors)) = entry.extent() else { continue };
                if entry.fstype() != FsType::RAID {
                    continue;
                }
                match probe_raidframe(device, start) {
                    Ok(Some(label)) if label.last_unit == unit => {
                        let vol = label.volume(start, sectors)?;
                        return Ok((device, Volume::new(vol.base, vol.sectors)));
                    }
                    Ok(_) => {}
                    Err(e) => warn!("{}: {e}", device.name()),
                }
            }
        }
        Err(BootError::NoSuchDevice(format!("raid{unit}")))
    }

    /// Pick the partition at `index` on a volume, descending into RAIDframe.
    fn select(
        &self,
        device: &'a BlockDevice<'a>,
        vol: Volume,
        raid: Option<RaidVolume>,
        index: usize,
        depth: usize,
        path: &BootPath,
    ) -> Result<ResolvedBoot<'a>, BootError> {
        let letter = partition_letter(index);
        let table = discover(device, vol)?;
        let (start, sectors, fstype) = match &table {
            PartitionTable::Raw(region) => (region.base, region.sectors, FsType::OTHER),
            _ => {
                let found = table
                    .entry(index)
                    .and_then(|e| e.extent().filter(|(_, n)| *n > 0).map(|(s, n)| (s, n, e.fstype())));
                let Some(found) = found else {
                    let name = match raid {
                        Some(r) => format!("raid{}{letter}", r.unit),
                        None => format!("{}{letter}", device.name()),
                    };
                    return Err(BootError::PartitionNotFound(name));
                };
                found
            }
        };

        if fstype == FsType::RAID {
            match probe_raidframe(device, start)? {
                Some(label) => {
                    if depth >= self.options.max_nesting {
                        return Err(BootError::NestingTooDeep(self.options.max_nesting));
                    }
                    let nested = label.volume(start, sectors)?;
                    debug!("descending into raid{} at {}", nested.unit, nested.base);
                    return self.select(
                        device,
                        Volume::new(nested.base, nested.sectors),
                        Some(nested),
                        index,
                        depth + 1,
                        path,
                    );
                }
                None => debug!("no usable RAIDframe label at {start}, using the partition"),
            }
        }

        let bs = device.block_size() as u64;
        Ok(ResolvedBoot {
            device,
            partition: letter,
            offset: start.saturating_mul(bs),
            len: sectors.saturating_mul(bs),
            fstype,
            raid,
            file: path.file.clone(),
        })
    }
}
