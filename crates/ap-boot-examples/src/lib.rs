//! Shared code of the tools.

use ap_boot::{DeviceClass, FirmwareDisk};
use ap_storage::{msg2err, Error};
use ap_storage_linux::LinuxDisk;

/// Log warnings unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
}

/// An image given on the command line as `[class=]path`.
pub struct ImageArg {
    pub class: DeviceClass,
    pub disk: LinuxDisk,
}

impl ImageArg {
    pub fn open(arg: &str) -> Result<Self, Error> {
        let (class, path) = match arg.split_once('=') {
            Some((prefix, path)) => {
                let class = DeviceClass::lookup(prefix).ok_or(msg2err!("unknown device class"))?;
                (class, path)
            }
            None => (DeviceClass::HardDisk, arg),
        };
        let disk = LinuxDisk::new(path, 0).map_err(|e| e.context(path.to_string()))?;
        log::debug!("{path}: {} bytes", disk.len());
        Ok(Self { class, disk })
    }
}

/// Present the images in command line order, like the firmware would.
pub fn firmware_disks<'a>(images: &'a [ImageArg], block_size: u32, boot: Option<usize>) -> Vec<FirmwareDisk<'a>> {
    images
        .iter()
        .enumerate()
        .map(|(i, img)| {
            let bs = match img.class {
                DeviceClass::Optical => 2048,
                _ => block_size,
            };
            FirmwareDisk::new(&img.disk, img.class, bs)
                .blocks(img.disk.len() / bs as u64)
                .removable(img.class != DeviceClass::HardDisk)
                .boot(boot == Some(i))
        })
        .collect()
}
