// ABOUTME: Example dumping a device tree blob read from disk
// ABOUTME: Shows header fields, memory reservations, /chosen lookups and the full tree

use fdt_cursor::{DeviceTreeBlob, DtbError};
use std::env;
use std::fs;
use std::process;

fn main() {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "dump_dtb".to_string());

    let Some(dtb_path) = args.next() else {
        eprintln!("usage: {program} <file.dtb>");
        process::exit(2);
    };

    if let Err(e) = dump_dtb_file(&dtb_path) {
        eprintln!("Error dumping DTB: {e}");
        process::exit(1);
    }
}

fn dump_dtb_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let dtb_data =
        fs::read(path).map_err(|e| format!("Failed to read DTB file '{path}': {e}"))?;

    let blob = DeviceTreeBlob::open(&dtb_data)?;

    print_header(&blob);
    print_memory_reservations(&blob);
    print_chosen(&blob)?;

    println!("Tree:");
    let mut out = String::new();
    blob.root()?.dump(&mut out)?;
    print!("{out}");

    Ok(())
}

fn print_header(blob: &DeviceTreeBlob) {
    let header = blob.header();
    println!("Magic:           0x{:08x}", header.magic);
    println!("Total size:      {} bytes", header.totalsize);
    println!("Version:         {}", header.version);
    println!("Last compatible: {}", header.last_comp_version);
    println!("Boot CPU ID:     {}", header.boot_cpuid_phys);
    println!();
}

fn print_memory_reservations(blob: &DeviceTreeBlob) {
    println!("Memory reservations:");
    let mut any = false;
    for reservation in blob.memory_reservations() {
        any = true;
        println!(
            "  - 0x{:016x}-0x{:016x}",
            reservation.address,
            reservation.end()
        );
    }
    if !any {
        println!("  (none)");
    }
    println!();
}

fn print_chosen(blob: &DeviceTreeBlob) -> Result<(), DtbError> {
    if let Some(bootargs) = blob.bootargs()? {
        println!("Boot arguments:  {bootargs}");
    }
    if let Some(stdout) = blob.stdout_path()? {
        println!("Console:         {stdout}");
    }
    if let Some(initrd) = blob.initrd_range()? {
        println!("Initrd:          0x{:x}-0x{:x}", initrd.start, initrd.end);
    }
    if let Some(freq) = blob.timebase_frequency()? {
        println!("Timebase:        {freq} Hz");
    }
    println!();
    Ok(())
}
