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

//! Wasabi64 library
//!
//! A makerom-style ROM image builder for the Nintendo 64: it sequences an
//! external MIPS toolchain over a declarative spec file and assembles the
//! resulting binaries into a cartridge image.
//!
//! # Modules
//!
//! - [`rom`] - The 64-byte cartridge header codec and the ROM image buffer
//! - [`spec`] - Spec data model, parser, and preprocessor integration
//! - [`toolchain`] - External program runners and the build collaborators
//! - [`pipeline`] - The wave processor and end-to-end build coordinator
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```no_run
//! use wasabi64::pipeline::{build_rom, BuildConfig};
//!
//! let config = BuildConfig {
//!     spec_file: "game.spec".into(),
//!     rom_file: "game.n64".into(),
//!     fill_byte: 0xFF,
//!     ..BuildConfig::default()
//! };
//!
//! if let Err(e) = build_rom(&config) {
//!     eprintln!("build failed: {e}");
//! }
//! ```

pub mod error;
pub mod pipeline;
pub mod rom;
pub mod spec;
pub mod toolchain;

// Re-export commonly used types
pub use error::BuildError;
pub use pipeline::{build_rom, BuildConfig, PadMode};
pub use rom::{Header, RomImage, CODE_START};
pub use spec::Spec;

/// The version of Wasabi64.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of the tool.
pub const NAME: &str = "Wasabi64";
