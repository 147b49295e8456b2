//! Resolve a boot specification against disk images.
//!
//! `devopen hd0a:netbsd disk.img` prints where the file would be loaded from.

use ap_boot::{BootTarget, DeviceDefaults, DeviceList, DeviceSpec, ResolveOptions, Resolver};
use ap_boot_examples::{firmware_disks, init_logging, ImageArg};
use ap_storage::{check, msg2err, Error};
use gumdrop::Options;

#[derive(Debug, Options)]
struct CommandOptions {
    /// Print the help message.
    help: bool,

    /// Sector size of the hard disk images.
    #[options(meta = "N", default = "512")]
    block_size: u32,

    /// The image the firmware booted from.
    #[options(meta = "N")]
    boot: Option<usize>,

    /// Change the default device first, like the dev command.
    #[options(meta = "SPEC")]
    dev: Option<String>,

    /// How many RAIDframe volumes may be stacked.
    #[options(meta = "N", default = "1")]
    nesting: usize,

    /// The boot specification followed by [class=]path images.
    #[options(free)]
    args: Vec<String>,
}

fn main() -> Result<(), Error> {
    init_logging();
    let opts = CommandOptions::parse_args_default_or_exit();
    let (spec, images) = opts.args.split_first().ok_or(msg2err!("missing boot specification"))?;
    let images = check!(images.iter().map(|arg| ImageArg::open(arg)).collect::<Result<Vec<_>, Error>>());
    let list = DeviceList::probe(firmware_disks(&images, opts.block_size, opts.boot));
    let resolver = Resolver::new(&list).options(ResolveOptions {
        max_nesting: opts.nesting,
        ..Default::default()
    });

    let mut defaults = DeviceDefaults::from_probe(&list);
    if let Some(dev) = &opts.dev {
        let path = DeviceSpec::parse(dev)
            .map_err(|e| msg2err!(format!("{dev}: {e}")))?
            .merge(&defaults);
        defaults.update(&path);
    }

    match resolver.resolve_str(spec, &defaults) {
        Ok(BootTarget::Disk(b)) => println!(
            "{}: {} at byte {} with {} bytes, file {}",
            b.name(),
            b.fstype,
            b.offset,
            b.len,
            b.file
        ),
        Ok(BootTarget::Network(n)) => println!("net{}: file {}", n.unit, n.file),
        Err(e) => return Err(msg2err!(format!("{spec}: {e}"))),
    }
    Ok(())
}
