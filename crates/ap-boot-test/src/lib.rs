//! End-to-end tests for the ap-boot crates.

#[cfg(test)]
mod tests {
    use ap_boot::{
        bootinfo::BiosGeom, listing::list_devices, BootError, BootTarget, DeviceClass, DeviceDefaults, DeviceList,
        DeviceSpec, FirmwareDisk, ResolveOptions, ResolvedBoot, Resolver,
    };
    use ap_boot_mkimage::{Image, MakeGpt, MakeLabel, MakeMbr, MakeRaidLabel};
    use ap_storage::{Read, ReadExt};
    use ap_storage_memory::{FaultyRead, ReadSlice};
    use ap_storage_partition::{
        gpt::{GPT_ENT_TYPE_NETBSD_FFS, GPT_ENT_TYPE_NETBSD_RAIDFRAME, GPT_ENT_TYPE_NETBSD_SWAP},
        DiskError, FsType,
    };

    fn hd(disk: &dyn Read) -> FirmwareDisk<'_> {
        FirmwareDisk::new(disk, DeviceClass::HardDisk, 512)
    }

    fn open<'a>(list: &'a DeviceList<'a>, spec: &str) -> Result<ResolvedBoot<'a>, BootError> {
        match Resolver::new(list).resolve_str(spec, &DeviceDefaults::from_probe(list))? {
            BootTarget::Disk(b) => Ok(b),
            BootTarget::Network(n) => panic!("network boot {n:?}"),
        }
    }

    /// A disk with a GPT, a protective MBR and a stale disklabel.
    fn hybrid() -> Image {
        let mut img = Image::new(16384, 512);
        MakeMbr::protective(&img).entry(1, 0xa9, 16000, 384).write(&mut img, 0);
        MakeGpt::default()
            .entry(GPT_ENT_TYPE_NETBSD_FFS.bytes(), [1; 16], 2048, 10239, "root")
            .entry(GPT_ENT_TYPE_NETBSD_SWAP.bytes(), [2; 16], 10240, 12287, "swap")
            .write(&mut img, 0);
        // the label would start partition a somewhere else
        MakeLabel::default()
            .partition(0, 4096, 100, FsType::BSDFFS.0)
            .write(&mut img, 16000);
        img
    }

    #[test]
    fn gpt_wins() {
        let img = hybrid();
        let slice = ReadSlice(img.bytes());
        let list = DeviceList::probe([hd(&slice)]);
        let b = open(&list, "hd0a:netbsd").unwrap();
        assert_eq!((b.offset, b.len), (2048 * 512, 8192 * 512));
        assert_eq!(b.fstype, FsType::BSDFFS);
        let b = open(&list, "hd0b:").unwrap();
        assert_eq!(b.fstype, FsType::SWAP);
        assert_eq!(b.file, "netbsd");
        assert!(matches!(open(&list, "hd0c:"), Err(BootError::PartitionNotFound(_))));
    }

    #[test]
    fn mbr_with_label() {
        for typ in [0xa9u8, 0xa5] {
            let mut img = Image::new(8192, 512);
            MakeMbr::default()
                .entry(0, 0x0c, 63, 1985)
                .entry(1, typ, 2048, 6144)
                .active(1)
                .write(&mut img, 0);
            MakeLabel::default()
                .partition(0, 2048, 4096, FsType::BSDFFS.0)
                .partition(1, 6144, 2048, FsType::SWAP.0)
                .partition(2, 2048, 6144, FsType::UNUSED.0)
                .partition(3, 0, 8192, FsType::UNUSED.0)
                .write(&mut img, 2048);
            img.write_at(2048 * 512 + 8192, b"superblock");

            let slice = ReadSlice(img.bytes());
            let list = DeviceList::probe([hd(&slice)]);
            let b = open(&list, "netbsd").unwrap();
            assert_eq!(b.offset, 2048 * 512, "{typ:#x}");
            assert_eq!(&b.read_array::<10>(8192).unwrap(), b"superblock");
            assert!(matches!(open(&list, "hd0d:"), Err(BootError::PartitionNotFound(n)) if n == "hd0d"));
        }
    }

    #[test]
    fn logical_netbsd_partition() {
        let mut img = Image::new(8192, 512);
        MakeMbr::default().entry(0, 0x0f, 1000, 7000).write(&mut img, 0);
        // first EBR: a FAT partition and the link to the next one
        MakeMbr::default()
            .entry(0, 0x0c, 63, 937)
            .entry(1, 0x05, 1000, 6000)
            .write(&mut img, 1000);
        // second EBR: the NetBSD partition, relative to this EBR
        MakeMbr::default().entry(0, 0xa9, 63, 4000).write(&mut img, 2000);
        MakeLabel::default().partition(0, 2063, 4000, FsType::BSDFFS.0).write(&mut img, 2063);

        let slice = ReadSlice(img.bytes());
        let list = DeviceList::probe([hd(&slice)]);
        let b = open(&list, "hd0a:").unwrap();
        assert_eq!((b.offset, b.len), (2063 * 512, 4000 * 512));
    }

    #[test]
    fn looping_extended_chain() {
        let mut img = Image::new(8192, 512);
        MakeMbr::default().entry(0, 0x05, 1000, 7000).write(&mut img, 0);
        MakeMbr::default().entry(1, 0x05, 100, 100).write(&mut img, 1000);
        // links back to itself
        MakeMbr::default()
            .entry(0, 0x83, 1, 10)
            .entry(1, 0x05, 100, 100)
            .write(&mut img, 1100);

        let slice = ReadSlice(img.bytes());
        let faulty = FaultyRead::new(&slice, u64::MAX..u64::MAX);
        let list = DeviceList::probe([hd(&faulty).blocks(8192)]);
        assert!(matches!(
            open(&list, "hd0a:"),
            Err(BootError::Disk(DiskError::ExtendedChainTooLong(32)))
        ));
        // GPT header, MBR, 32 EBRs
        assert!(faulty.reads() <= 34, "{}", faulty.reads());
    }

    #[test]
    fn raid_inside_gpt() {
        let mut img = Image::new(32768, 512);
        MakeMbr::protective(&img).write(&mut img, 0);
        MakeGpt::default()
            .entry(GPT_ENT_TYPE_NETBSD_RAIDFRAME.bytes(), [3; 16], 2048, 30719, "raid0-comp")
            .write(&mut img, 0);
        MakeRaidLabel::default().last_unit(0).num_blocks(20000).write(&mut img, 2048);
        MakeLabel::default()
            .partition(0, 0, 16000, FsType::BSDFFS.0)
            .partition(1, 16000, 4000, FsType::SWAP.0)
            .write(&mut img, 2048 + 64);

        let slice = ReadSlice(img.bytes());
        let list = DeviceList::probe([hd(&slice)]);
        let b = open(&list, "hd0a:netbsd").unwrap();
        assert_eq!(b.offset, (2048 + 64) * 512);
        assert_eq!(b.len, 16000 * 512);
        assert_eq!(b.name(), "raid0a");
        let vol = b.raid.unwrap();
        assert_eq!((vol.base, vol.sectors), (2112, 20000));

        let b = open(&list, "raid0b:").unwrap();
        assert_eq!(b.offset, (2112 + 16000) * 512);

        assert_eq!(
            list_devices(&list, &ResolveOptions::default()),
            [
                "hd0 (16 MB, 512 bytes/sector)",
                "  hd0a NAME=raid0-comp (14 MB): RAID",
                "    raid0 (10000 KB)",
                "      raid0a (8000 KB): 4.2BSD",
                "      raid0b (2000 KB): swap",
            ]
        );
    }

    #[test]
    fn raid_component_at_the_end_of_the_lba_range() {
        let mut img = Image::new(256, 512);
        MakeMbr::protective(&img).write(&mut img, 0);
        MakeGpt::default()
            .last_usable(u64::MAX - 1)
            .entry(GPT_ENT_TYPE_NETBSD_RAIDFRAME.bytes(), [5; 16], u64::MAX - 10, u64::MAX - 1, "far")
            .write(&mut img, 0);
        let slice = ReadSlice(img.bytes());
        let list = DeviceList::probe([hd(&slice)]);
        assert!(matches!(open(&list, "hd0a:"), Err(BootError::Disk(DiskError::OutOfRange(_)))));
        assert!(matches!(open(&list, "raid0a:"), Err(BootError::NoSuchDevice(_))));

        let lines = list_devices(&list, &ResolveOptions::default());
        assert_eq!(lines[1], "  hd0a NAME=far (5120 bytes): RAID");
        assert!(lines[2].starts_with("    RAIDframe: "), "{lines:?}");
    }

    #[test]
    fn raid_on_the_second_disk() {
        let plain = Image::new(1024, 512);
        let mut img = Image::new(8192, 512);
        MakeLabel::default().partition(4, 1024, 4096, FsType::RAID.0).write(&mut img, 0);
        MakeRaidLabel::default().last_unit(5).write(&mut img, 1024);
        MakeLabel::default().partition(0, 0, 1000, FsType::BSDFFS.0).write(&mut img, 1088);

        let a = ReadSlice(plain.bytes());
        let b = ReadSlice(img.bytes());
        let list = DeviceList::probe([hd(&a), hd(&b).boot(true)]);
        let defaults = DeviceDefaults::from_probe(&list);
        assert_eq!((defaults.class.as_str(), defaults.unit), ("hd", 1));

        let r = open(&list, "raid5a:").unwrap();
        assert_eq!(r.device.name(), "hd1");
        assert_eq!(r.offset, 1088 * 512);

        // partition e of hd1 descends with the same letter
        assert!(matches!(open(&list, "hd1e:"), Err(BootError::PartitionNotFound(n)) if n == "raid5e"));
        assert!(matches!(open(&list, "raid4a:"), Err(BootError::NoSuchDevice(_))));
    }

    #[test]
    fn large_sectors() {
        let mut img = Image::new(4096, 4096);
        MakeMbr::protective(&img).write(&mut img, 0);
        MakeGpt::default()
            .entry(GPT_ENT_TYPE_NETBSD_FFS.bytes(), [4; 16], 256, 4095, "root")
            .write(&mut img, 0);
        let slice = ReadSlice(img.bytes());
        let list = DeviceList::probe([FirmwareDisk::new(&slice, DeviceClass::HardDisk, 4096)]);
        let b = open(&list, "hd0a:").unwrap();
        assert_eq!((b.offset, b.len), (256 * 4096, 3840 * 4096));
    }

    #[test]
    fn media_errors_are_not_a_missing_label() {
        let mut img = Image::new(1024, 512);
        MakeLabel::default().partition(0, 0, 1024, FsType::BSDFFS.0).write(&mut img, 0);
        let slice = ReadSlice(img.bytes());
        let faulty = FaultyRead::new(&slice, 512..1024);
        let list = DeviceList::probe([hd(&faulty).blocks(1024)]);
        assert!(matches!(open(&list, "hd0a:"), Err(BootError::Disk(DiskError::Io(_)))));

        // the other partitions of the list still print
        let lines = list_devices(&list, &ResolveOptions::default());
        assert_eq!(lines[0], "hd0 (512 KB, 512 bytes/sector)");
        assert!(lines[1].starts_with("  hd0: i/o error"), "{}", lines[1]);
    }

    #[test]
    fn prompt_errors() {
        let img = Image::new(64, 512);
        let slice = ReadSlice(img.bytes());
        let list = DeviceList::probe([hd(&slice)]);
        for (spec, user) in [
            ("hd0q:netbsd", true),
            ("hd0ab:netbsd", true),
            ("0:netbsd", true),
            ("zz0a:netbsd", false),
            ("hd3a:netbsd", false),
        ] {
            let e = open(&list, spec).unwrap_err();
            assert_eq!(e.is_user_error(), user, "{spec}: {e}");
        }
        // the whole disk under every letter
        assert_eq!(open(&list, "hd0p:").unwrap().len, 64 * 512);
    }

    #[test]
    fn dev_command_changes_defaults() {
        let a = Image::new(64, 512);
        let b = Image::new(128, 512);
        let (a, b) = (ReadSlice(a.bytes()), ReadSlice(b.bytes()));
        let list = DeviceList::probe([hd(&a), hd(&b)]);
        let resolver = Resolver::new(&list);

        let mut defaults = DeviceDefaults::from_probe(&list);
        let path = DeviceSpec::parse("hd1:").unwrap().merge(&defaults);
        defaults.update(&path);
        match resolver.resolve_str("netbsd.gz", &defaults).unwrap() {
            BootTarget::Disk(b) => {
                assert_eq!(b.device.name(), "hd1");
                assert_eq!(b.file, "netbsd.gz");
            }
            other => panic!("{other:?}"),
        }
        assert!(matches!(
            resolver.resolve_str("nfs:netbsd", &defaults),
            Ok(BootTarget::Network(n)) if n.unit == 0 && n.file == "netbsd"
        ));
    }

    #[test]
    fn bootinfo_roundtrip() {
        let mut img = hybrid();
        img.write_at(0, &[0xfa, 0x31, 0xc0]);
        let floppy = Image::new(2880, 512);
        let (a, f) = (ReadSlice(img.bytes()), ReadSlice(floppy.bytes()));
        let list = DeviceList::probe([
            FirmwareDisk::new(&f, DeviceClass::Floppy, 512).removable(true),
            hd(&a),
        ]);
        let geom = BiosGeom::collect(&list);
        assert_eq!(geom.disks.len(), 1);
        assert_eq!(geom.disks[0].dev, 0x80);
        assert_eq!(geom.disks[0].mbrparts[0].typ, 0xee);
        assert_eq!(geom.disks[0].totsec, 16384);
        assert_eq!(BiosGeom::from_bytes(&geom.to_bytes()).unwrap(), geom);
    }
}
