//! Text listing of devices and their partitions.

use crate::{
    device::{BlockDevice, DeviceList},
    partition_letter,
    resolve::ResolveOptions,
    table::{discover, PartitionTable, Volume},
};
use alloc::{format, string::String, vec::Vec};
use ap_storage::BlockRead;
use ap_storage_partition::{disklabel::MAXPARTITIONS, probe_raidframe, FsType, PartitionEntry};

const UNITS: [&str; 5] = ["bytes", "KB", "MB", "GB", "TB"];

/// Human readable size, scaled while the number has more than four digits.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes;
    let mut unit = 0;
    while value >= 10 * 1024 && unit + 1 < UNITS.len() {
        value /= 1024;
        unit += 1;
    }
    format!("{value} {}", UNITS[unit])
}

/// All partitions of all devices.
pub fn list_devices(list: &DeviceList, options: &ResolveOptions) -> Vec<String> {
    list.iter().flat_map(|dev| list_device_with(dev, options)).collect()
}

/// One header line for the device and one line per partition.
pub fn list_device(dev: &BlockDevice) -> Vec<String> {
    list_device_with(dev, &ResolveOptions::default())
}

pub fn list_device_with(dev: &BlockDevice, options: &ResolveOptions) -> Vec<String> {
    let mut out = Vec::new();
    let mut header = format!(
        "{} ({}, {} bytes/sector)",
        dev.name(),
        format_size(dev.size_bytes()),
        dev.block_size()
    );
    if dev.removable {
        header.push_str(", removable");
    }
    out.push(header);
    let mut lister = Lister {
        dev,
        max_nesting: options.max_nesting,
        out,
    };
    lister.volume(&dev.name(), Volume::new(0, dev.block_count), 0, 1);
    lister.out
}

struct Lister<'a, 'b> {
    dev: &'b BlockDevice<'a>,
    max_nesting: usize,
    out: Vec<String>,
}

impl Lister<'_, '_> {
    fn line(&mut self, indent: usize, text: String) {
        self.out.push(format!("{:width$}{text}", "", width = indent * 2));
    }

    fn bytes(&self, sectors: u64) -> String {
        format_size(sectors.saturating_mul(self.dev.block_size() as u64))
    }

    fn volume(&mut self, name: &str, vol: Volume, depth: usize, indent: usize) {
        let table = match discover(self.dev, vol) {
            Ok(table) => table,
            Err(e) => {
                self.line(indent, format!("{name}: {e}"));
                return;
            }
        };
        if let PartitionTable::Raw(region) = table {
            let size = self.bytes(region.sectors);
            let what = match region == vol {
                true => "whole disk",
                false => "NetBSD MBR partition",
            };
            self.line(indent, format!("{name} ({size}): {what}"));
            return;
        }
        for (index, entry) in table.entries().iter().enumerate() {
            let Some((start, sectors)) = entry.extent().filter(|(_, n)| *n > 0) else {
                continue;
            };
            let part = match index < MAXPARTITIONS {
                true => format!("{name}{}", partition_letter(index)),
                false => format!("{name}[{index}]"),
            };
            let label = match entry {
                PartitionEntry::Gpt { partition_guid, .. } => match entry.name() {
                    Some(n) => format!(" NAME={n}"),
                    None => format!(" NAME={partition_guid}"),
                },
                _ => String::new(),
            };
            let size = self.bytes(sectors);
            self.line(indent, format!("{part}{label} ({size}): {}", entry.fstype()));
            if entry.fstype() == FsType::RAID && depth < self.max_nesting {
                self.raid(start, sectors, depth, indent + 1);
            }
        }
    }

    fn raid(&mut self, start: u64, sectors: u64, depth: usize, indent: usize) {
        let found = probe_raidframe(self.dev, start).and_then(|l| l.map(|l| l.volume(start, sectors)).transpose());
        match found {
            Ok(Some(vol)) => {
                let name = format!("raid{}", vol.unit);
                let size = self.bytes(vol.sectors);
                self.line(indent, format!("{name} ({size})"));
                self.volume(&name, Volume::new(vol.base, vol.sectors), depth + 1, indent + 1);
            }
            Ok(None) => {}
            Err(e) => self.line(indent, format!("RAIDframe: {e}")),
        }
    }
}
