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

//! The ROM assembly pipeline.
//!
//! End-to-end sequence: preprocess the spec text, parse it, construct the
//! ROM image (blank or header-seeded), process each wave in spec order,
//! apply optional size padding, and serialize the image. Everything runs
//! sequentially on one thread; a failure at any stage aborts the whole
//! build with no retry and no cleanup of partial output.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{BuildError, Result};
use crate::rom::{Header, RomImage, CODE_START};
use crate::spec::{self, preprocess::preprocess, Spec, Wave};
use crate::toolchain::{wrapped_object_name, CommandToolchain, Runner, Toolchain};

/// How the gap below a configured target size is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadMode {
    /// Write one zero byte at the target offset and let the filesystem
    /// materialize the gap (sparse where supported). The historical
    /// makerom behavior.
    #[default]
    Sparse,
    /// Extend the in-memory image to the target size with the fill byte
    /// before saving.
    Fill,
}

/// Everything the pipeline needs, built once from the command line and
/// passed explicitly; there is no global configuration.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub spec_file: PathBuf,
    pub rom_file: PathBuf,
    pub elf_file: PathBuf,
    pub header_file: Option<PathBuf>,
    pub fill_byte: u8,
    /// Target cartridge size in megabits; `None` disables padding.
    pub romsize_mbits: Option<u64>,
    pub pad_mode: PadMode,
    pub verbose: bool,
    pub verbose_linking: bool,
    pub check_overlapping_sections: bool,
    pub include_paths: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub undefines: Vec<String>,
    pub ld_command: String,
    pub as_command: String,
    pub cpp_command: String,
    pub objcopy_command: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            spec_file: PathBuf::from("spec"),
            rom_file: PathBuf::from("rom.n64"),
            elf_file: PathBuf::from("rom.out"),
            header_file: None,
            fill_byte: 0x00,
            romsize_mbits: None,
            pad_mode: PadMode::Sparse,
            verbose: false,
            verbose_linking: false,
            check_overlapping_sections: true,
            include_paths: Vec::new(),
            defines: Vec::new(),
            undefines: Vec::new(),
            ld_command: "mips64-elf-ld".to_string(),
            as_command: "mips64-elf-as".to_string(),
            cpp_command: "mips64-elf-gcc".to_string(),
            objcopy_command: "mips64-elf-objcopy".to_string(),
        }
    }
}

/// Per-wave state machine. Stages run strictly in order; each is a
/// precondition for the next, and any failure is fatal to the build.
pub struct WaveProcessor<'a> {
    toolchain: &'a dyn Toolchain,
    verbose: bool,
}

impl<'a> WaveProcessor<'a> {
    pub fn new(toolchain: &'a dyn Toolchain) -> Self {
        Self {
            toolchain,
            verbose: false,
        }
    }

    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Run all five stages for one wave, merging the result into `rom`
    /// at [`CODE_START`].
    pub fn process(&self, wave: &Wave, rom: &mut RomImage) -> Result<()> {
        self.wrap_raw_includes(wave)?;

        if self.verbose {
            println!("  entry symbol: {}", wave.entry_symbol());
        }
        let entry = self.toolchain.synthesize_entry(wave)?;
        let linked = self.toolchain.link(wave, &entry)?;
        let binarized = self.toolchain.binarize(&linked)?;

        if self.verbose {
            println!("  {} bytes at {:#x}", binarized.len(), CODE_START);
        }
        rom.write_at(&binarized, CODE_START);
        Ok(())
    }

    /// Stage 1: wrap every raw include of the wave's segments into a
    /// linkable object. Must complete for all segments before entry
    /// synthesis, since entry code may reference wrapped objects.
    fn wrap_raw_includes(&self, wave: &Wave) -> Result<()> {
        for include in wave.raw_includes() {
            let raw = std::fs::read(include).map_err(|e| BuildError::ReadFile {
                path: include.clone(),
                source: e,
            })?;
            self.toolchain
                .wrap_raw_object(&raw, &wrapped_object_name(include))?;
        }
        Ok(())
    }
}

/// Build the in-memory ROM image for a parsed spec.
///
/// All waves write at the same [`CODE_START`] offset, so with more than
/// one wave the last one wins. That matches the historical makerom
/// behavior; multi-wave specs are only meaningful when that is intended.
pub fn assemble_image(
    spec: &Spec,
    fill_byte: u8,
    header: Option<&Header>,
    toolchain: &dyn Toolchain,
    verbose: bool,
) -> Result<RomImage> {
    let mut rom = match header {
        Some(h) => RomImage::with_header(fill_byte, h),
        None => RomImage::blank(fill_byte),
    };

    let processor = WaveProcessor::new(toolchain).verbose(verbose);
    for wave in &spec.waves {
        if verbose {
            println!("Processing wave '{}'...", wave.name);
        }
        processor.process(wave, &mut rom)?;
    }

    Ok(rom)
}

/// Serialize the image to `path`, padding first when a target size is
/// configured. The target offset is `romsize_mbits * 1_000_000 / 8`.
pub fn write_image(
    rom: &RomImage,
    path: &Path,
    romsize_mbits: Option<u64>,
    pad_mode: PadMode,
) -> Result<()> {
    let write_err = |source| BuildError::WriteFile {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::create(path).map_err(write_err)?;

    match (romsize_mbits, pad_mode) {
        (Some(mbits), PadMode::Sparse) => {
            let target = mbits * 1_000_000 / 8;
            file.seek(SeekFrom::Start(target)).map_err(write_err)?;
            file.write_all(&[0]).map_err(write_err)?;
            file.seek(SeekFrom::Start(0)).map_err(write_err)?;
            rom.save(&mut file).map_err(write_err)?;
        }
        (Some(mbits), PadMode::Fill) => {
            let target = (mbits * 1_000_000 / 8) as usize;
            let mut padded = rom.clone();
            padded.pad_to(target);
            padded.save(&mut file).map_err(write_err)?;
        }
        (None, _) => rom.save(&mut file).map_err(write_err)?,
    }

    Ok(())
}

/// Build the collaborators from the configured tool commands.
pub fn toolchain_from_config(config: &BuildConfig) -> Result<CommandToolchain> {
    let ld = Runner::resolve(&config.ld_command)?;
    let assembler = Runner::resolve(&config.as_command)?;
    let objcopy = Runner::resolve(&config.objcopy_command)?;

    Ok(
        CommandToolchain::new(ld, assembler, objcopy, config.elf_file.clone())?
            .verbose_linking(config.verbose_linking)
            .check_sections(config.check_overlapping_sections),
    )
}

/// Run the whole pipeline with the real toolchain.
pub fn build_rom(config: &BuildConfig) -> Result<()> {
    let cpp = Runner::resolve(&config.cpp_command)?;
    let toolchain = toolchain_from_config(config)?;
    build_rom_with(config, &cpp, &toolchain)
}

/// Run the whole pipeline against injected collaborators.
pub fn build_rom_with(
    config: &BuildConfig,
    cpp: &Runner,
    toolchain: &dyn Toolchain,
) -> Result<()> {
    let source = std::fs::read_to_string(&config.spec_file).map_err(|e| BuildError::ReadFile {
        path: config.spec_file.clone(),
        source: e,
    })?;

    let text = preprocess(
        &source,
        cpp,
        &config.include_paths,
        &config.defines,
        &config.undefines,
    )?;
    let spec = spec::parse(&text)?;

    let header = match &config.header_file {
        Some(path) => {
            if config.verbose {
                println!("using custom header: {}", path.display());
            }
            let text = std::fs::read_to_string(path).map_err(|e| BuildError::ReadFile {
                path: path.clone(),
                source: e,
            })?;
            let header = Header::decode(&text)?;
            if config.verbose {
                header.dump();
            }
            Some(header)
        }
        None => None,
    };

    let rom = assemble_image(
        &spec,
        config.fill_byte,
        header.as_ref(),
        toolchain,
        config.verbose,
    )?;
    write_image(&rom, &config.rom_file, config.romsize_mbits, config.pad_mode)?;

    if config.verbose {
        println!(
            "Wrote {} ({} bytes in image)",
            config.rom_file.display(),
            rom.len()
        );
    }
    Ok(())
}
