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

//! The fixed 64-byte N64 cartridge header.
//!
//! Header files are plain text: one or more lines of hex digits. Line
//! terminators are stripped, the remaining characters hex-decoded, and the
//! resulting bytes mapped onto the header fields below. Short input is
//! valid: a field is populated only when the decoded bytes fully cover it,
//! otherwise it keeps its zero default. All multi-byte fields are
//! big-endian. No semantic validation of field values is performed.

use thiserror::Error;

/// Size of the encoded header in bytes.
pub const HEADER_SIZE: usize = 64;

/// Errors produced while decoding a header file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// A character that is neither a hex digit nor a line terminator.
    #[error("invalid hex character {0:?} in header file")]
    InvalidHex(char),

    /// Hex digits must come in pairs.
    #[error("odd number of hex digits in header file")]
    OddLength,
}

/// The N64 cartridge header, one field per byte range of the 64-byte record.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Header {
    /// PI BSD DOM1 configuration, byte 0.
    pub x1: u8,
    /// PI BSD DOM1 configuration, byte 1.
    pub x2: u8,
    /// PI BSD DOM1 configuration, byte 2.
    pub x3: u8,
    /// PI BSD DOM1 configuration, byte 3.
    pub x4: u8,
    /// Clock rate override, offset 4.
    pub clock_rate: u32,
    /// Boot address, offset 8.
    pub boot_address: u32,
    /// Release/libultra version, offset 12.
    pub release: u32,
    /// First checksum word, offset 16.
    pub crc1: u32,
    /// Second checksum word, offset 20.
    pub crc2: u32,
    /// Reserved, offset 24.
    pub unknown0: u64,
    /// Game title, offset 32, space-padded.
    pub name: [u8; 20],
    /// Reserved, offset 52.
    pub unknown2: u32,
    /// Media format, offset 56.
    pub rom_type: u8,
    /// Game identifier, offset 57.
    pub game_id: u16,
    /// Region/language byte, offset 59.
    pub region_language: u8,
    /// Cartridge identifier, offset 60.
    pub cart_id: u16,
    /// Country code, offset 62.
    pub country_code: u8,
    /// Mask ROM version, offset 63.
    pub version: u8,
}

impl Header {
    /// Decode a header from hex text.
    ///
    /// Accepts multi-line input; `\r` and `\n` are stripped before
    /// decoding, and hex digits may be upper or lower case. Input shorter
    /// than 64 bytes is not an error: fields past the end stay zero.
    pub fn decode(text: &str) -> Result<Header, HeaderError> {
        let bytes = decode_hex(text)?;
        let mut header = Header::default();

        if let Some(&b) = bytes.first() {
            header.x1 = b;
        }
        if let Some(&b) = bytes.get(1) {
            header.x2 = b;
        }
        if let Some(&b) = bytes.get(2) {
            header.x3 = b;
        }
        if let Some(&b) = bytes.get(3) {
            header.x4 = b;
        }
        if let Some(v) = read_u32(&bytes, 4) {
            header.clock_rate = v;
        }
        if let Some(v) = read_u32(&bytes, 8) {
            header.boot_address = v;
        }
        if let Some(v) = read_u32(&bytes, 12) {
            header.release = v;
        }
        if let Some(v) = read_u32(&bytes, 16) {
            header.crc1 = v;
        }
        if let Some(v) = read_u32(&bytes, 20) {
            header.crc2 = v;
        }
        if let Some(v) = read_u64(&bytes, 24) {
            header.unknown0 = v;
        }
        if let Some(slice) = bytes.get(32..52) {
            header.name.copy_from_slice(slice);
        }
        if let Some(v) = read_u32(&bytes, 52) {
            header.unknown2 = v;
        }
        if let Some(&b) = bytes.get(56) {
            header.rom_type = b;
        }
        if let Some(v) = read_u16(&bytes, 57) {
            header.game_id = v;
        }
        if let Some(&b) = bytes.get(59) {
            header.region_language = b;
        }
        if let Some(v) = read_u16(&bytes, 60) {
            header.cart_id = v;
        }
        if let Some(&b) = bytes.get(62) {
            header.country_code = b;
        }
        if let Some(&b) = bytes.get(63) {
            header.version = b;
        }

        Ok(header)
    }

    /// Encode the header into its 64-byte big-endian wire form.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.x1;
        buf[1] = self.x2;
        buf[2] = self.x3;
        buf[3] = self.x4;
        buf[4..8].copy_from_slice(&self.clock_rate.to_be_bytes());
        buf[8..12].copy_from_slice(&self.boot_address.to_be_bytes());
        buf[12..16].copy_from_slice(&self.release.to_be_bytes());
        buf[16..20].copy_from_slice(&self.crc1.to_be_bytes());
        buf[20..24].copy_from_slice(&self.crc2.to_be_bytes());
        buf[24..32].copy_from_slice(&self.unknown0.to_be_bytes());
        buf[32..52].copy_from_slice(&self.name);
        buf[52..56].copy_from_slice(&self.unknown2.to_be_bytes());
        buf[56] = self.rom_type;
        buf[57..59].copy_from_slice(&self.game_id.to_be_bytes());
        buf[59] = self.region_language;
        buf[60..62].copy_from_slice(&self.cart_id.to_be_bytes());
        buf[62] = self.country_code;
        buf[63] = self.version;
        buf
    }

    /// Game title as a printable string, trailing NULs and spaces trimmed.
    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.name)
            .trim_end_matches(['\0', ' '])
            .to_string()
    }

    /// Print every field value to stdout. Diagnostic only, used by the
    /// CLI under `--verbose`.
    pub fn dump(&self) {
        println!("X1: {}", self.x1);
        println!("X2: {}", self.x2);
        println!("X3: {}", self.x3);
        println!("X4: {}", self.x4);
        println!("ClockRate: {}", self.clock_rate);
        println!("BootAddress: {:#010x}", self.boot_address);
        println!("Release: {}", self.release);
        println!("Crc1: {:#010x}", self.crc1);
        println!("Crc2: {:#010x}", self.crc2);
        println!("Unknown0: {}", self.unknown0);
        println!("Name: {}", self.name_str());
        println!("Unknown2: {}", self.unknown2);
        println!("RomType: {}", self.rom_type);
        println!("GameId: {}", self.game_id);
        println!("RegionLanguage: {}", self.region_language);
        println!("CartId: {}", self.cart_id);
        println!("CountryCode: {}", self.country_code);
        println!("Version: {}", self.version);
    }
}

/// Strip line terminators and hex-decode the rest.
fn decode_hex(text: &str) -> Result<Vec<u8>, HeaderError> {
    let mut digits = Vec::new();
    for c in text.chars() {
        match c {
            '\r' | '\n' => continue,
            _ => match c.to_digit(16) {
                Some(d) => digits.push(d as u8),
                None => return Err(HeaderError::InvalidHex(c)),
            },
        }
    }

    if digits.len() % 2 != 0 {
        return Err(HeaderError::OddLength);
    }

    Ok(digits.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
}

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let slice = bytes.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([slice[0], slice[1]]))
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice = bytes.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn read_u64(bytes: &[u8], offset: usize) -> Option<u64> {
    let slice = bytes.get(offset..offset + 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(slice);
    Some(u64::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hex text covering the full 64 bytes with distinct field values.
    fn full_header_hex() -> String {
        let mut header = Header {
            x1: 0x80,
            x2: 0x37,
            x3: 0x12,
            x4: 0x40,
            clock_rate: 0x0000_000F,
            boot_address: 0x8000_0400,
            release: 0x0000_1444,
            crc1: 0xDEAD_BEEF,
            crc2: 0xCAFE_F00D,
            unknown0: 0x0102_0304_0506_0708,
            name: [b' '; 20],
            unknown2: 7,
            rom_type: b'N',
            game_id: 0x534D,
            region_language: b'E',
            cart_id: 0x4A4B,
            country_code: b'E',
            version: 2,
        };
        header.name[..5].copy_from_slice(b"WASAB");
        header
            .to_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    #[test]
    fn test_decode_empty_is_all_zero() {
        let header = Header::decode("").unwrap();
        assert_eq!(header, Header::default());
    }

    #[test]
    fn test_decode_full_roundtrip() {
        let hex = full_header_hex();
        let header = Header::decode(&hex).unwrap();
        assert_eq!(header.x1, 0x80);
        assert_eq!(header.clock_rate, 0x0000_000F);
        assert_eq!(header.boot_address, 0x8000_0400);
        assert_eq!(header.crc1, 0xDEAD_BEEF);
        assert_eq!(header.crc2, 0xCAFE_F00D);
        assert_eq!(header.name_str(), "WASAB");
        assert_eq!(header.game_id, 0x534D);
        assert_eq!(header.version, 2);

        let encoded: String = header
            .to_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        assert_eq!(encoded, hex);
    }

    #[test]
    fn test_decode_multiline_input() {
        let header = Header::decode("8037\r\n1240\n").unwrap();
        assert_eq!(header.x1, 0x80);
        assert_eq!(header.x2, 0x37);
        assert_eq!(header.x3, 0x12);
        assert_eq!(header.x4, 0x40);
    }

    #[test]
    fn test_decode_mixed_case() {
        let header = Header::decode("aB cD".replace(' ', "").as_str()).unwrap();
        assert_eq!(header.x1, 0xAB);
        assert_eq!(header.x2, 0xCD);
    }

    #[test]
    fn test_decode_rejects_non_hex() {
        assert_eq!(Header::decode("zz"), Err(HeaderError::InvalidHex('z')));
        assert_eq!(Header::decode("80 37"), Err(HeaderError::InvalidHex(' ')));
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert_eq!(Header::decode("123"), Err(HeaderError::OddLength));
    }

    #[test]
    fn test_truncated_input_leaves_later_fields_zero() {
        // Six bytes: x1..x4 populated, clock_rate needs bytes 4..8.
        let header = Header::decode("803712400000").unwrap();
        assert_eq!(header.x4, 0x40);
        assert_eq!(header.clock_rate, 0);
        assert_eq!(header.boot_address, 0);
        assert_eq!(header.name, [0u8; 20]);
    }

    #[test]
    fn test_partial_name_stays_zero() {
        // 40 bytes covers offsets [0, 40): the 20-byte name at 32 is only
        // partially covered and must stay at its zero default.
        let hex: String = (0..40).map(|i| format!("{:02x}", i as u8)).collect();
        let header = Header::decode(&hex).unwrap();
        assert_eq!(header.name, [0u8; 20]);
        assert_eq!(header.unknown0, 0x1819_1a1b_1c1d_1e1f);
    }

    #[test]
    fn test_to_bytes_default_is_zero() {
        assert_eq!(Header::default().to_bytes(), [0u8; HEADER_SIZE]);
    }
}
