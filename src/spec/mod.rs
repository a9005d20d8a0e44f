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

//! The build spec: data model and parser.
//!
//! A spec is a sequence of makerom-style blocks. `beginseg`/`endseg`
//! declares a segment (name, flags, entry symbol, include paths);
//! `beginwave`/`endwave` groups previously declared segments into a wave.
//! Waves are built in spec order. The text handed to [`parse`] is expected
//! to have been run through the C preprocessor first, so `#`-prefixed
//! lines (comments and cpp line markers) are skipped.

pub mod preprocess;

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while parsing a spec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("line {line}: unknown directive '{directive}'")]
    UnknownDirective { line: usize, directive: String },

    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("line {line}: duplicate segment '{name}'")]
    DuplicateSegment { line: usize, name: String },

    #[error("line {line}: wave references undeclared segment '{name}'")]
    UndeclaredSegment { line: usize, name: String },

    #[error("line {line}: unknown segment flag '{flag}'")]
    UnknownFlag { line: usize, flag: String },

    #[error("unexpected end of spec: unterminated '{0}' block")]
    Unterminated(&'static str),
}

/// How a segment's includes are fed to the linker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentKind {
    /// Includes are relocatable objects, linked as-is.
    #[default]
    Object,
    /// Includes are the boot segment's objects; its `entry` symbol becomes
    /// the wave entry point.
    Boot,
    /// Includes are raw binary files that must be wrapped into linkable
    /// objects before the link stage.
    Raw,
}

/// A named chunk of code or data within a wave.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub kind: SegmentKind,
    pub includes: Vec<PathBuf>,
    pub entry: Option<String>,
}

/// An ordered unit of build work: all of its segments are linked and
/// binarized together and written as one contiguous block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wave {
    pub name: String,
    pub segments: Vec<Segment>,
}

impl Wave {
    /// Include paths of raw segments, in spec order. Each must be wrapped
    /// into an object before linking.
    pub fn raw_includes(&self) -> impl Iterator<Item = &PathBuf> {
        self.segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Raw)
            .flat_map(|s| s.includes.iter())
    }

    /// Include paths that go to the linker directly.
    pub fn object_includes(&self) -> impl Iterator<Item = &PathBuf> {
        self.segments
            .iter()
            .filter(|s| s.kind != SegmentKind::Raw)
            .flat_map(|s| s.includes.iter())
    }

    /// The symbol the synthesized entry stub jumps to: the first declared
    /// `entry`, or `boot` when no segment names one.
    pub fn entry_symbol(&self) -> &str {
        self.segments
            .iter()
            .find_map(|s| s.entry.as_deref())
            .unwrap_or("boot")
    }
}

/// A parsed spec: waves in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spec {
    pub waves: Vec<Wave>,
}

/// Parse preprocessed spec text.
pub fn parse(text: &str) -> Result<Spec, SpecError> {
    Parser::new(text).parse()
}

struct Parser<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    segments: HashMap<String, Segment>,
    spec: Spec,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            segments: HashMap::new(),
            spec: Spec::default(),
        }
    }

    fn parse(mut self) -> Result<Spec, SpecError> {
        while let Some((index, raw)) = self.lines.next() {
            let line = index + 1;
            let Some(fields) = split_directive(raw) else {
                continue;
            };

            match fields[0].as_str() {
                "beginseg" => self.parse_segment(line)?,
                "beginwave" => self.parse_wave(line)?,
                other => {
                    return Err(SpecError::UnknownDirective {
                        line,
                        directive: other.to_string(),
                    })
                }
            }
        }
        Ok(self.spec)
    }

    fn parse_segment(&mut self, begin_line: usize) -> Result<(), SpecError> {
        let mut segment = Segment::default();
        let mut named_at = begin_line;

        while let Some((index, raw)) = self.lines.next() {
            let line = index + 1;
            let Some(fields) = split_directive(raw) else {
                continue;
            };

            match fields[0].as_str() {
                "endseg" => {
                    if segment.name.is_empty() {
                        return Err(SpecError::Malformed {
                            line,
                            message: "segment has no name".to_string(),
                        });
                    }
                    if self.segments.contains_key(&segment.name) {
                        return Err(SpecError::DuplicateSegment {
                            line: named_at,
                            name: segment.name,
                        });
                    }
                    self.segments.insert(segment.name.clone(), segment);
                    return Ok(());
                }
                "name" => {
                    segment.name = expect_one_arg(&fields, line)?;
                    named_at = line;
                }
                "flags" => {
                    for flag in &fields[1..] {
                        segment.kind = match flag.as_str() {
                            "OBJECT" => SegmentKind::Object,
                            "BOOT" => SegmentKind::Boot,
                            "RAW" => SegmentKind::Raw,
                            other => {
                                return Err(SpecError::UnknownFlag {
                                    line,
                                    flag: other.to_string(),
                                })
                            }
                        };
                    }
                }
                "entry" => segment.entry = Some(expect_one_arg(&fields, line)?),
                "include" => segment
                    .includes
                    .push(PathBuf::from(expect_one_arg(&fields, line)?)),
                other => {
                    return Err(SpecError::UnknownDirective {
                        line,
                        directive: other.to_string(),
                    })
                }
            }
        }

        Err(SpecError::Unterminated("beginseg"))
    }

    fn parse_wave(&mut self, _begin_line: usize) -> Result<(), SpecError> {
        let mut wave = Wave::default();

        while let Some((index, raw)) = self.lines.next() {
            let line = index + 1;
            let Some(fields) = split_directive(raw) else {
                continue;
            };

            match fields[0].as_str() {
                "endwave" => {
                    self.spec.waves.push(wave);
                    return Ok(());
                }
                "name" => wave.name = expect_one_arg(&fields, line)?,
                "include" => {
                    let name = expect_one_arg(&fields, line)?;
                    let segment = self.segments.get(&name).ok_or(
                        SpecError::UndeclaredSegment {
                            line,
                            name: name.clone(),
                        },
                    )?;
                    wave.segments.push(segment.clone());
                }
                other => {
                    return Err(SpecError::UnknownDirective {
                        line,
                        directive: other.to_string(),
                    })
                }
            }
        }

        Err(SpecError::Unterminated("beginwave"))
    }
}

/// Split a spec line into directive fields, honoring double quotes.
/// Returns `None` for blank lines and `#`-prefixed lines (comments and
/// preprocessor line markers).
fn split_directive(raw: &str) -> Option<Vec<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in trimmed.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    fields.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        fields.push(current);
    }

    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

fn expect_one_arg(fields: &[String], line: usize) -> Result<String, SpecError> {
    if fields.len() != 2 {
        return Err(SpecError::Malformed {
            line,
            message: format!("'{}' takes exactly one argument", fields[0]),
        });
    }
    Ok(fields[1].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_SPEC: &str = r#"
beginseg
  name "code"
  flags BOOT
  entry bootproc
  include "game.o"
endseg

beginseg
  name "assets"
  flags RAW
  include "assets.bin"
endseg

beginwave
  name "wave0"
  include "code"
  include "assets"
endwave
"#;

    #[test]
    fn test_parse_basic_spec() {
        let spec = parse(BASIC_SPEC).unwrap();
        assert_eq!(spec.waves.len(), 1);

        let wave = &spec.waves[0];
        assert_eq!(wave.name, "wave0");
        assert_eq!(wave.segments.len(), 2);
        assert_eq!(wave.segments[0].kind, SegmentKind::Boot);
        assert_eq!(wave.segments[1].kind, SegmentKind::Raw);
        assert_eq!(wave.entry_symbol(), "bootproc");

        let raw: Vec<_> = wave.raw_includes().collect();
        assert_eq!(raw, vec![&PathBuf::from("assets.bin")]);
        let objects: Vec<_> = wave.object_includes().collect();
        assert_eq!(objects, vec![&PathBuf::from("game.o")]);
    }

    #[test]
    fn test_parse_skips_comments_and_line_markers() {
        let text = "# 1 \"game.spec\"\nbeginseg\nname \"s\"\n# a comment\nendseg\n";
        let spec = parse(text).unwrap();
        assert!(spec.waves.is_empty());
    }

    #[test]
    fn test_entry_symbol_defaults_to_boot() {
        let text = "beginseg\nname \"s\"\ninclude \"a.o\"\nendseg\nbeginwave\nname \"w\"\ninclude \"s\"\nendwave\n";
        let spec = parse(text).unwrap();
        assert_eq!(spec.waves[0].entry_symbol(), "boot");
    }

    #[test]
    fn test_quoted_path_with_spaces() {
        let text = "beginseg\nname \"s\"\ninclude \"dir with space/a.o\"\nendseg\n";
        // No wave uses it, but the segment must parse.
        parse(text).unwrap();
    }

    #[test]
    fn test_unknown_directive_is_error() {
        let err = parse("beginseg\nstack 0x100\nendseg\n").unwrap_err();
        assert_eq!(
            err,
            SpecError::UnknownDirective {
                line: 2,
                directive: "stack".to_string()
            }
        );
    }

    #[test]
    fn test_undeclared_segment_is_error() {
        let err = parse("beginwave\nname \"w\"\ninclude \"ghost\"\nendwave\n").unwrap_err();
        assert_eq!(
            err,
            SpecError::UndeclaredSegment {
                line: 3,
                name: "ghost".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_segment_is_error() {
        let text = "beginseg\nname \"s\"\nendseg\nbeginseg\nname \"s\"\nendseg\n";
        assert!(matches!(
            parse(text).unwrap_err(),
            SpecError::DuplicateSegment { .. }
        ));
    }

    #[test]
    fn test_unterminated_block_is_error() {
        assert_eq!(
            parse("beginseg\nname \"s\"\n").unwrap_err(),
            SpecError::Unterminated("beginseg")
        );
        assert_eq!(
            parse("beginwave\n").unwrap_err(),
            SpecError::Unterminated("beginwave")
        );
    }

    #[test]
    fn test_unknown_flag_is_error() {
        let err = parse("beginseg\nname \"s\"\nflags SPARKLY\nendseg\n").unwrap_err();
        assert_eq!(
            err,
            SpecError::UnknownFlag {
                line: 3,
                flag: "SPARKLY".to_string()
            }
        );
    }

    #[test]
    fn test_waves_keep_spec_order() {
        let text = "\
beginseg\nname \"a\"\nendseg\n\
beginseg\nname \"b\"\nendseg\n\
beginwave\nname \"first\"\ninclude \"a\"\nendwave\n\
beginwave\nname \"second\"\ninclude \"b\"\nendwave\n";
        let spec = parse(text).unwrap();
        let names: Vec<_> = spec.waves.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
