// Wasabi64 - A makerom-style ROM image builder for the Nintendo 64
// Copyright (C) 2026  Wasabi64 contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Wasabi64 CLI
//!
//! Builds a Nintendo 64 cartridge ROM image from a declarative spec file.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use wasabi64::error::BuildError;
use wasabi64::pipeline::{build_rom, BuildConfig, PadMode};

/// Wasabi64 - a makerom-style ROM image builder for the Nintendo 64
#[derive(Parser, Debug)]
#[command(name = "wasabi64")]
#[command(version)]
#[command(about = "Build a Nintendo 64 cartridge ROM image from a spec file")]
#[command(long_about = r#"
Wasabi64 builds a cartridge ROM image from a declarative spec file.

The spec file declares segments (objects or raw binary includes) and waves
(ordered groups of segments). For each wave, Wasabi64 wraps raw includes
into linkable objects, assembles an entry stub, links everything, strips
the result to a flat binary, and writes it into the ROM image at the code
offset. The image is then optionally padded and written to disk.

Example usage:
  wasabi64 game.spec -r game.n64
  wasabi64 game.spec -r game.n64 -s 8 -f 0xff
  wasabi64 game.spec --romheader-file header.txt -DVERSION=2 -Iinclude
"#)]
struct Cli {
    /// Spec file to use for making the image
    spec_file: PathBuf,

    /// ROM image filename
    #[arg(short = 'r', long = "rom-name", default_value = "rom.n64")]
    rom_name: PathBuf,

    /// Linked ELF filename
    #[arg(short = 'e', long = "rom-elf-name", default_value = "rom.out")]
    rom_elf_name: PathBuf,

    /// ROM header file (ASCII hex, loaded at the start of the image)
    #[arg(long = "romheader-file")]
    romheader_file: Option<PathBuf>,

    /// Rom size (MBits); enables padding of the output image
    #[arg(short = 's', long = "romsize")]
    romsize: Option<u64>,

    /// Fill byte for ROM regions never written (e.g. 0xff)
    #[arg(short = 'f', long = "filldata-byte", default_value = "0x00", value_parser = parse_byte)]
    filldata_byte: u8,

    /// How to materialize the gap up to the target size
    #[arg(long = "pad-mode", default_value = "sparse", value_parser = parse_pad_mode)]
    pad_mode: PadMode,

    /// Give a verbose account of all actions taken
    #[arg(short = 'd', long = "verbose")]
    verbose: bool,

    /// Print a link editor map for diagnostic purposes
    #[arg(short = 'm', long = "verbose-linking")]
    verbose_linking: bool,

    /// Disable checking of overlapping sections during linking
    #[arg(short = 'o', long = "disable-overlapping-section-checks")]
    disable_overlapping_section_checks: bool,

    /// Defines passed to the preprocessor (repeatable)
    #[arg(short = 'D', long = "define")]
    define: Vec<String>,

    /// Include paths passed to the preprocessor (repeatable)
    #[arg(short = 'I', long = "include")]
    include: Vec<PathBuf>,

    /// Undefines passed to the preprocessor (repeatable)
    #[arg(short = 'U', long = "undefine")]
    undefine: Vec<String>,

    /// ld command to use
    #[arg(long = "ld-command", default_value = "mips64-elf-ld")]
    ld_command: String,

    /// as command to use
    #[arg(long = "as-command", default_value = "mips64-elf-as")]
    as_command: String,

    /// cpp command to use
    #[arg(long = "cpp-command", default_value = "mips64-elf-gcc")]
    cpp_command: String,

    /// objcopy command to use
    #[arg(long = "objcopy-command", default_value = "mips64-elf-objcopy")]
    objcopy_command: String,
}

/// Parse a one-byte value, accepting `0x` hex or decimal.
fn parse_byte(s: &str) -> Result<u8, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|_| format!("'{s}' is not a byte value (0x00 - 0xff)"))
}

fn parse_pad_mode(s: &str) -> Result<PadMode, String> {
    match s {
        "sparse" => Ok(PadMode::Sparse),
        "fill" => Ok(PadMode::Fill),
        other => Err(format!("'{other}' is not a pad mode (sparse, fill)")),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = BuildConfig {
        spec_file: cli.spec_file,
        rom_file: cli.rom_name,
        elf_file: cli.rom_elf_name,
        header_file: cli.romheader_file,
        fill_byte: cli.filldata_byte,
        romsize_mbits: cli.romsize,
        pad_mode: cli.pad_mode,
        verbose: cli.verbose,
        verbose_linking: cli.verbose_linking,
        check_overlapping_sections: !cli.disable_overlapping_section_checks,
        include_paths: cli.include,
        defines: cli.define,
        undefines: cli.undefine,
        ld_command: cli.ld_command,
        as_command: cli.as_command,
        cpp_command: cli.cpp_command,
        objcopy_command: cli.objcopy_command,
    };

    if config.verbose {
        println!("Wasabi64 v{}", wasabi64::VERSION);
        println!("Spec: {}", config.spec_file.display());
        println!("Output: {}", config.rom_file.display());
        if let Some(mbits) = config.romsize_mbits {
            println!("Target size: {mbits} MBits ({:?} padding)", config.pad_mode);
        }
        println!("Fill byte: {:#04x}", config.fill_byte);
        println!();
    }

    match build_rom(&config) {
        Ok(()) => {
            if config.verbose {
                println!("Done!");
            } else {
                println!(
                    "Built {} -> {}",
                    config.spec_file.display(),
                    config.rom_file.display()
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// One exit code per failure class, for scripts wrapping the build.
fn exit_code(error: &BuildError) -> u8 {
    match error {
        BuildError::ReadFile { .. } => 3,
        BuildError::WriteFile { .. } => 4,
        BuildError::Tool(_) => 5,
        BuildError::Header(_) | BuildError::Spec(_) => 1,
    }
}
