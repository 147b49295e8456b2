//! Boot specifications: `[device:][file]`.
//!
//! The device is `letters digits? letter?`, e.g. `hd0a`, `wd1g`, `cd`.

use crate::BootError;
use alloc::string::{String, ToString};
use core::str::FromStr;

/// Longest device part that is accepted.
pub const DEVNAME_MAX: usize = 16;
/// Loaded when no file is given.
pub const DEFAULT_FILENAME: &str = "netbsd";
/// Partitions are lettered `a` to `p`.
pub const PARTITION_LETTERS: core::ops::RangeInclusive<char> = 'a'..='p';

/// The device part of a specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceName {
    pub class: String,
    pub unit: u32,
    pub partition: Option<char>,
}

/// A parsed boot specification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceSpec {
    /// `None` if there was no `:` in the input.
    pub device: Option<DeviceName>,
    pub file: String,
}

impl DeviceSpec {
    pub fn parse(input: &str) -> Result<Self, BootError> {
        Self::parse_with_limit(input, DEVNAME_MAX)
    }

    /// Parse with a different limit for the device part.
    pub fn parse_with_limit(input: &str, max: usize) -> Result<Self, BootError> {
        let Some((dev, file)) = input.split_once(':') else {
            return Ok(Self {
                device: None,
                file: input.to_string(),
            });
        };
        if dev.len() > max {
            return Err(BootError::InvalidDeviceName(dev.to_string()));
        }
        let bytes = dev.as_bytes();
        let letters = bytes.iter().take_while(|c| c.is_ascii_lowercase()).count();
        if letters == 0 {
            return Err(BootError::InvalidDeviceName(dev.to_string()));
        }
        let digits = bytes[letters..].iter().take_while(|c| c.is_ascii_digit()).count();
        let unit = match digits {
            0 => 0,
            _ => dev[letters..letters + digits]
                .parse()
                .map_err(|_| BootError::InvalidUnit(dev[letters..letters + digits].to_string()))?,
        };
        let mut rest = &dev[letters + digits..];
        let partition = match rest.chars().next() {
            Some(c) if PARTITION_LETTERS.contains(&c) => {
                rest = &rest[1..];
                Some(c)
            }
            Some(c) if c.is_ascii_alphabetic() => return Err(BootError::InvalidPartition(c)),
            _ => None,
        };
        if !rest.is_empty() {
            return Err(BootError::MalformedSpec(dev.to_string()));
        }
        Ok(Self {
            device: Some(DeviceName {
                class: dev[..letters].to_string(),
                unit,
                partition,
            }),
            file: file.to_string(),
        })
    }

    /// Fill in what is missing from the defaults.
    ///
    /// Without a device the whole device comes from the defaults, a device
    /// without a partition only inherits the partition letter.
    pub fn merge(&self, defaults: &DeviceDefaults) -> BootPath {
        let (class, unit, partition) = match &self.device {
            None => (defaults.class.clone(), defaults.unit, defaults.partition),
            Some(d) => (d.class.clone(), d.unit, d.partition.unwrap_or(defaults.partition)),
        };
        let file = match self.file.is_empty() {
            true => defaults.file.clone(),
            false => self.file.clone(),
        };
        BootPath {
            class,
            unit,
            partition,
            file,
        }
    }
}

impl FromStr for DeviceSpec {
    type Err = BootError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The current device as set by the firmware hint or the `dev` command.
///
/// Owned by the command loop and handed to every resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDefaults {
    pub class: String,
    pub unit: u32,
    pub partition: char,
    pub file: String,
}

impl Default for DeviceDefaults {
    fn default() -> Self {
        Self {
            class: "hd".to_string(),
            unit: 0,
            partition: 'a',
            file: DEFAULT_FILENAME.to_string(),
        }
    }
}

impl DeviceDefaults {
    /// Make the device of `path` the current one.  The file stays.
    pub fn update(&mut self, path: &BootPath) {
        self.class.clone_from(&path.class);
        self.unit = path.unit;
        self.partition = path.partition;
    }
}

/// A complete boot path after merging with the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootPath {
    pub class: String,
    pub unit: u32,
    pub partition: char,
    pub file: String,
}

impl BootPath {
    /// Index of the partition letter.
    pub fn partition_index(&self) -> Result<usize, BootError> {
        if !PARTITION_LETTERS.contains(&self.partition) {
            return Err(BootError::InvalidPartition(self.partition));
        }
        Ok(self.partition as usize - 'a' as usize)
    }

    /// `hd0a` style name.
    pub fn device_name(&self) -> String {
        alloc::format!("{}{}{}", self.class, self.unit, self.partition)
    }
}

impl core::fmt::Display for BootPath {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        write!(fmt, "{}{}{}:{}", self.class, self.unit, self.partition, self.file)
    }
}
