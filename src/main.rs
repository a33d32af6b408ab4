//! DMG Runner - Entry Point
//!
//! Headless runner for the emulation core. Loads a ROM (and optionally a
//! boot ROM), runs it for a fixed number of steps or cycles and reports
//! what happened.

use anyhow::{bail, Context, Result};
use clap::Parser;
use dmg::emu::Emulator;
use log::info;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to ROM file
    rom: PathBuf,

    /// Path to a 256-byte boot ROM
    #[arg(long)]
    boot_rom: Option<PathBuf>,

    /// Number of steps to run
    #[arg(long, conflicts_with = "cycles")]
    steps: Option<u64>,

    /// Number of clock cycles to run
    #[arg(long)]
    cycles: Option<u64>,

    /// Echo serial port output to stdout
    #[arg(long)]
    serial: bool,

    /// Print a JSON snapshot when the run ends
    #[arg(long)]
    snapshot: bool,

    /// Memory included in the snapshot, as START:LEN in hex (e.g. C000:100)
    #[arg(long, value_parser = parse_window, default_value = "0000:10000")]
    window: (u16, usize),
}

/// Default run length: one second of emulated time
const DEFAULT_CYCLES: u64 = dmg::common::CLOCK_HZ as u64;

fn parse_window(text: &str) -> std::result::Result<(u16, usize), String> {
    let (start, len) = text
        .split_once(':')
        .ok_or_else(|| format!("expected START:LEN, got {text:?}"))?;
    let start = u16::from_str_radix(start, 16).map_err(|e| format!("bad start: {e}"))?;
    let len = usize::from_str_radix(len, 16).map_err(|e| format!("bad length: {e}"))?;
    if len > 0x10000 {
        return Err(format!("length {len:#X} exceeds the address space"));
    }
    Ok((start, len))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rom = std::fs::read(&args.rom)
        .with_context(|| format!("failed to read ROM {}", args.rom.display()))?;

    let mut emu = Emulator::new();
    emu.load_cartridge(rom)
        .with_context(|| format!("failed to load ROM {}", args.rom.display()))?;

    if let Some(path) = &args.boot_rom {
        let image = std::fs::read(path)
            .with_context(|| format!("failed to read boot ROM {}", path.display()))?;
        emu.load_boot_rom(&image)
            .with_context(|| format!("failed to load boot ROM {}", path.display()))?;
    }

    if let Some(header) = emu.cartridge_header() {
        info!(
            "running {:?} ({}, {} KB ROM)",
            header.title,
            header.cart_type_name(),
            header.rom_size_bytes().unwrap_or(0) / 1024
        );
    }

    let outcome = match args.steps {
        Some(steps) => run_steps(&mut emu, steps, args.serial),
        None => run_cycles(&mut emu, args.cycles.unwrap_or(DEFAULT_CYCLES), args.serial),
    };

    info!("{} steps, {} cycles", emu.steps(), emu.ticks());

    if args.snapshot {
        let (start, len) = args.window;
        let snapshot = emu.snapshot_window(start, len);
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    if let Err(err) = outcome {
        bail!("emulation stopped: {err}");
    }
    Ok(())
}

fn run_steps(emu: &mut Emulator, steps: u64, serial: bool) -> dmg::Result<()> {
    for _ in 0..steps {
        emu.step()?;
        if serial {
            echo_serial(emu);
        }
    }
    Ok(())
}

fn run_cycles(emu: &mut Emulator, budget: u64, serial: bool) -> dmg::Result<()> {
    let mut elapsed = 0u64;
    while elapsed < budget {
        elapsed += emu.step()? as u64;
        if serial {
            echo_serial(emu);
        }
    }
    Ok(())
}

fn echo_serial(emu: &mut Emulator) {
    let bytes = emu.take_serial_output();
    if !bytes.is_empty() {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(&bytes);
        let _ = stdout.flush();
    }
}
