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

//! Error types for the Wasabi64 build pipeline.
//!
//! Every stage returns a `Result`; nothing recovers locally. The CLI in
//! `main.rs` is the single point that maps a failure to a diagnostic
//! message and a non-zero exit code.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::rom::HeaderError;
use crate::spec::SpecError;
use crate::toolchain::ToolError;

/// Errors that can abort a ROM build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A source file (spec, header, or raw include) could not be read.
    #[error("cannot read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The output image could not be created or written.
    #[error("cannot write {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An external toolchain program failed.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// The ROM header file did not decode.
    #[error("invalid ROM header: {0}")]
    Header(#[from] HeaderError),

    /// The spec file did not parse.
    #[error("invalid spec: {0}")]
    Spec(#[from] SpecError),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;
