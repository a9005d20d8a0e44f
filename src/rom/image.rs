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

//! In-memory cartridge address space.
//!
//! A `RomImage` is a growable byte buffer in which every byte that was
//! never explicitly written equals the configured fill byte. The image is
//! created once at the start of a build, mutated once per wave, and
//! serialized exactly once at the end.

use std::io::{self, Write};

use super::header::Header;

/// Offset at which executable wave output is written.
///
/// The first 0x1000 bytes of a cartridge hold the header and the IPL3 boot
/// code; game code starts right after.
pub const CODE_START: usize = 0x1000;

/// The ROM image under construction.
#[derive(Debug, Clone)]
pub struct RomImage {
    data: Vec<u8>,
    fill_byte: u8,
}

impl RomImage {
    /// Create an empty image. The buffer has no length until the first
    /// write; every byte a later write skips over gets the fill byte.
    pub fn blank(fill_byte: u8) -> Self {
        Self {
            data: Vec::new(),
            fill_byte,
        }
    }

    /// Create an image seeded with the encoded 64-byte header at offset 0.
    pub fn with_header(fill_byte: u8, header: &Header) -> Self {
        let mut image = Self::blank(fill_byte);
        image.write_at(&header.to_bytes(), 0);
        image
    }

    /// Overwrite the region `[offset, offset + bytes.len())`.
    ///
    /// Grows the buffer when the write extends past the current length;
    /// any gap between the old length and `offset` is filled with the
    /// fill byte, never left at an unrelated default.
    pub fn write_at(&mut self, bytes: &[u8], offset: usize) {
        let end = offset + bytes.len();
        if end > self.data.len() {
            self.data.resize(end, self.fill_byte);
        }
        self.data[offset..end].copy_from_slice(bytes);
    }

    /// Extend the image to at least `len` bytes of fill byte.
    pub fn pad_to(&mut self, len: usize) {
        if len > self.data.len() {
            self.data.resize(len, self.fill_byte);
        }
    }

    /// Serialize the full buffer, in order, starting at offset 0.
    pub fn save<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.data)
    }

    /// Current length of the image in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether anything has been written yet.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The configured fill byte.
    pub fn fill_byte(&self) -> u8 {
        self.fill_byte
    }

    /// The raw image contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_image_is_empty() {
        let image = RomImage::blank(0xFF);
        assert!(image.is_empty());
        assert_eq!(image.len(), 0);
        assert_eq!(image.fill_byte(), 0xFF);
    }

    #[test]
    fn test_write_at_code_start_fills_gap() {
        let mut image = RomImage::blank(0xFF);
        image.write_at(&[1, 2, 3], CODE_START);

        assert_eq!(image.len(), CODE_START + 3);
        assert!(image.as_bytes()[..CODE_START].iter().all(|&b| b == 0xFF));
        assert_eq!(&image.as_bytes()[CODE_START..], &[1, 2, 3]);
    }

    #[test]
    fn test_write_at_grows_and_gap_fills() {
        let mut image = RomImage::blank(0xAA);
        image.write_at(&[7], 0);
        image.write_at(&[9], 5);

        assert_eq!(image.as_bytes(), &[7, 0xAA, 0xAA, 0xAA, 0xAA, 9]);
    }

    #[test]
    fn test_write_at_overwrites_in_place() {
        let mut image = RomImage::blank(0);
        image.write_at(&[1, 2, 3, 4], 0);
        image.write_at(&[9, 9], 1);

        assert_eq!(image.as_bytes(), &[1, 9, 9, 4]);
        assert_eq!(image.len(), 4);
    }

    #[test]
    fn test_with_header_writes_64_bytes() {
        let mut header = Header::default();
        header.x1 = 0x80;
        header.version = 3;

        let image = RomImage::with_header(0xFF, &header);
        assert_eq!(image.len(), 64);
        assert_eq!(image.as_bytes()[0], 0x80);
        assert_eq!(image.as_bytes()[63], 3);
    }

    #[test]
    fn test_pad_to_extends_with_fill_byte() {
        let mut image = RomImage::blank(0xEE);
        image.write_at(&[1], 0);
        image.pad_to(4);

        assert_eq!(image.as_bytes(), &[1, 0xEE, 0xEE, 0xEE]);

        // Never shrinks.
        image.pad_to(2);
        assert_eq!(image.len(), 4);
    }

    #[test]
    fn test_save_writes_everything() {
        let mut image = RomImage::blank(0x11);
        image.write_at(&[5, 6], 3);

        let mut out = Vec::new();
        image.save(&mut out).unwrap();
        assert_eq!(out, &[0x11, 0x11, 0x11, 5, 6]);
    }
}
