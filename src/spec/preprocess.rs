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

//! Spec preprocessing.
//!
//! Spec files may use C preprocessor directives (`#include`, `#define`,
//! conditionals). Before parsing, the spec text is piped through the
//! configured preprocessor with the include paths, defines, and undefines
//! from the command line.

use std::path::PathBuf;

use crate::toolchain::{Runner, ToolError};

/// Run spec text through the external C preprocessor.
///
/// Defines are passed as `-D`, include paths as `-I`, undefines as `-U`.
/// The source is fed on stdin and the expanded text read from stdout;
/// line markers emitted by the preprocessor are left in place (the spec
/// parser skips them).
pub fn preprocess(
    source: &str,
    cpp: &Runner,
    include_paths: &[PathBuf],
    defines: &[String],
    undefines: &[String],
) -> Result<String, ToolError> {
    let args = cpp_args(include_paths, defines, undefines);
    let output = cpp.run(&args, Some(source.as_bytes()))?;
    String::from_utf8(output).map_err(|e| ToolError::MalformedOutput {
        command: cpp.command().display().to_string(),
        message: format!("preprocessor output is not UTF-8: {e}"),
    })
}

/// Assemble the preprocessor argument list.
fn cpp_args(include_paths: &[PathBuf], defines: &[String], undefines: &[String]) -> Vec<String> {
    let mut args: Vec<String> = vec!["-E".to_string(), "-x".to_string(), "c".to_string()];
    for path in include_paths {
        args.push(format!("-I{}", path.display()));
    }
    for define in defines {
        args.push(format!("-D{define}"));
    }
    for undefine in undefines {
        args.push(format!("-U{undefine}"));
    }
    args.push("-".to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpp_args_flag_order() {
        let args = cpp_args(
            &[PathBuf::from("inc")],
            &["VERSION=2".to_string()],
            &["DEBUG".to_string()],
        );
        assert_eq!(args, vec!["-E", "-x", "c", "-Iinc", "-DVERSION=2", "-UDEBUG", "-"]);
    }

    #[test]
    fn test_cpp_args_reads_stdin_last() {
        let args = cpp_args(&[], &[], &[]);
        assert_eq!(args.last().map(String::as_str), Some("-"));
    }
}
