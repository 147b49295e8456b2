//! List the devices and partitions a boot loader would see.
//!
//! Every image is a disk, e.g. `lsdev disk.img cd=install.iso`.

use ap_boot::{bootinfo::BiosGeom, listing::list_devices, DeviceList, ResolveOptions};
use ap_boot_examples::{firmware_disks, init_logging, ImageArg};
use ap_storage::{check, Error};
use gumdrop::Options;

#[derive(Debug, Options)]
struct CommandOptions {
    /// Print the help message.
    help: bool,

    /// Sector size of the hard disk images.
    #[options(meta = "N", default = "512")]
    block_size: u32,

    /// How many RAIDframe levels to show.
    #[options(meta = "N", default = "1")]
    nesting: usize,

    /// Also print the BIOS geometry record.
    geom: bool,

    /// Disk images as [class=]path.
    #[options(free)]
    images: Vec<String>,
}

fn main() -> Result<(), Error> {
    init_logging();
    let opts = CommandOptions::parse_args_default_or_exit();
    let images = check!(opts.images.iter().map(|arg| ImageArg::open(arg)).collect::<Result<Vec<_>, Error>>());
    let list = DeviceList::probe(firmware_disks(&images, opts.block_size, None));
    let options = ResolveOptions {
        max_nesting: opts.nesting,
        ..Default::default()
    };
    for line in list_devices(&list, &options) {
        println!("{line}");
    }
    if opts.geom {
        for d in BiosGeom::collect(&list).disks {
            println!(
                "bios {:#x}: {}/{}/{} {} sectors flags {:#x} cksum {:#010x}",
                d.dev, d.cyl, d.head, d.sec, d.totsec, d.flags, d.cksum
            );
        }
    }
    Ok(())
}
