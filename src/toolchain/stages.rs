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

//! The build collaborators behind the [`Toolchain`] trait.
//!
//! `CommandToolchain` is the real implementation: it stages intermediate
//! artifacts in a scratch directory and invokes the configured assembler,
//! linker, and objcopy. Tests substitute a recording fake.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::{Runner, ToolError};
use crate::spec::Wave;

/// The external build collaborators a wave needs, one method per stage.
///
/// Injectable so the pipeline can run against recording or canned fakes
/// without spawning processes.
pub trait Toolchain {
    /// Wrap a raw binary include into a linkable object written to
    /// `object` (side effect; the path is derived from the include path).
    fn wrap_raw_object(&self, raw: &[u8], object: &Path) -> Result<(), ToolError>;

    /// Assemble the start-up entry stub for a wave, returning the entry
    /// object bytes.
    fn synthesize_entry(&self, wave: &Wave) -> Result<Vec<u8>, ToolError>;

    /// Link the wave's includes and the synthesized entry into one object.
    fn link(&self, wave: &Wave, entry: &[u8]) -> Result<Vec<u8>, ToolError>;

    /// Strip a linked object down to a flat, loadable byte stream.
    fn binarize(&self, linked: &[u8]) -> Result<Vec<u8>, ToolError>;
}

/// Real toolchain backed by external programs.
pub struct CommandToolchain {
    ld: Runner,
    assembler: Runner,
    objcopy: Runner,
    /// Where the linked ELF is kept (the `--rom-elf-name` output).
    elf_path: PathBuf,
    verbose_linking: bool,
    check_sections: bool,
    scratch: TempDir,
}

impl CommandToolchain {
    pub fn new(
        ld: Runner,
        assembler: Runner,
        objcopy: Runner,
        elf_path: PathBuf,
    ) -> Result<Self, ToolError> {
        Ok(Self {
            ld,
            assembler,
            objcopy,
            elf_path,
            verbose_linking: false,
            check_sections: true,
            scratch: TempDir::new().map_err(ToolError::Scratch)?,
        })
    }

    /// Pass a link map request (`-M`) to the linker.
    pub fn verbose_linking(mut self, enabled: bool) -> Self {
        self.verbose_linking = enabled;
        self
    }

    /// Disable the linker's overlapping-section checks
    /// (`--no-check-sections`).
    pub fn check_sections(mut self, enabled: bool) -> Self {
        self.check_sections = enabled;
        self
    }

    fn scratch_path(&self, name: &str) -> PathBuf {
        self.scratch.path().join(name)
    }

    fn write_scratch(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, ToolError> {
        let path = self.scratch_path(name);
        fs::write(&path, bytes).map_err(ToolError::Scratch)?;
        Ok(path)
    }

    fn read_artifact(&self, path: &Path) -> Result<Vec<u8>, ToolError> {
        fs::read(path).map_err(ToolError::Scratch)
    }

    /// The assembly text of the start-up stub: jump to the wave's entry
    /// symbol.
    fn entry_source(wave: &Wave) -> String {
        format!(
            ".set noreorder\n.text\n.globl _start\n_start:\n\tj {entry}\n\tnop\n",
            entry = wave.entry_symbol()
        )
    }
}

impl Toolchain for CommandToolchain {
    fn wrap_raw_object(&self, raw: &[u8], object: &Path) -> Result<(), ToolError> {
        let input = self.write_scratch("raw.bin", raw)?;
        let args: Vec<OsString> = vec![
            "-r".into(),
            "-b".into(),
            "binary".into(),
            "-o".into(),
            object.into(),
            input.into(),
        ];
        self.ld.run(&args, None)?;
        Ok(())
    }

    fn synthesize_entry(&self, wave: &Wave) -> Result<Vec<u8>, ToolError> {
        let source = Self::entry_source(wave);
        let input = self.write_scratch("entry.s", source.as_bytes())?;
        let output = self.scratch_path("entry.o");
        let args: Vec<OsString> = vec![
            "-o".into(),
            output.clone().into(),
            input.into(),
        ];
        self.assembler.run(&args, None)?;
        self.read_artifact(&output)
    }

    fn link(&self, wave: &Wave, entry: &[u8]) -> Result<Vec<u8>, ToolError> {
        let entry_object = self.write_scratch("entry.o", entry)?;

        let mut args: Vec<OsString> = vec![
            "-e".into(),
            "_start".into(),
            "-o".into(),
            self.elf_path.clone().into(),
        ];
        if self.verbose_linking {
            args.push("-M".into());
        }
        if !self.check_sections {
            args.push("--no-check-sections".into());
        }
        args.push(entry_object.into());
        for include in wave.object_includes() {
            args.push(include.into());
        }
        for include in wave.raw_includes() {
            args.push(wrapped_object_name(include).into());
        }

        self.ld.run(&args, None)?;
        self.read_artifact(&self.elf_path)
    }

    fn binarize(&self, linked: &[u8]) -> Result<Vec<u8>, ToolError> {
        let input = self.write_scratch("linked.elf", linked)?;
        let output = self.scratch_path("linked.bin");
        let args: Vec<OsString> = vec![
            "-O".into(),
            "binary".into(),
            input.into(),
            output.clone().into(),
        ];
        self.objcopy.run(&args, None)?;
        self.read_artifact(&output)
    }
}

/// The deterministic object name for a wrapped raw include: the include
/// path with `.o` appended.
pub fn wrapped_object_name(include: &Path) -> PathBuf {
    let mut name = include.as_os_str().to_os_string();
    name.push(".o");
    PathBuf::from(name)
}
