//! Byte-level helpers shared by the PNG and ZIP passes

use crc32fast::Hasher;

/// Calculate the PNG-style CRC32 checksum for given data
pub fn calculate_crc32(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Field width accepted by [`write_be`] and [`write_le`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    U16,
    U32,
}

impl FieldWidth {
    fn bytes(self) -> usize {
        match self {
            FieldWidth::U16 => 2,
            FieldWidth::U32 => 4,
        }
    }
}

/// Write `value` big-endian into `buf`. `index` addresses the field's FIRST
/// byte; bytes are laid down most-significant first at ascending indices.
pub fn write_be(buf: &mut [u8], index: usize, value: u32, width: FieldWidth) {
    let mut bits = width.bytes() * 8;
    let mut i = index;
    while bits > 0 {
        bits -= 8;
        buf[i] = ((value >> bits) & 0xFF) as u8;
        i += 1;
    }
}

/// Write `value` little-endian into `buf`. `index` addresses the field's LAST
/// byte; bytes are laid down most-significant first at descending indices.
/// Callers working from a ZIP structure offset therefore pass the index of
/// the final byte of the field, not its start.
pub fn write_le(buf: &mut [u8], index: usize, value: u32, width: FieldWidth) {
    let mut bits = width.bytes() * 8;
    let mut i = index;
    while bits > 0 {
        bits -= 8;
        buf[i] = ((value >> bits) & 0xFF) as u8;
        i = i.wrapping_sub(1);
    }
}

/// Read a big-endian u32 from byte slice
pub fn read_u32_be(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(bytes[offset..offset + 4].try_into().expect("slice too short"))
}

/// Read a little-endian u16 from byte slice
pub fn read_u16_le(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(bytes[offset..offset + 2].try_into().expect("slice too short"))
}

/// Find the first occurrence of `sig` in `data` at or after `from`
pub fn find_sig(data: &[u8], sig: &[u8], from: usize) -> Option<usize> {
    if from > data.len() || sig.is_empty() {
        return None;
    }
    data[from..]
        .windows(sig.len())
        .position(|w| w == sig)
        .map(|pos| pos + from)
}

/// Validate PNG signature prefix
pub fn is_png_signature(data: &[u8]) -> bool {
    data.len() >= 4 && data[0..4] == [0x89, 0x50, 0x4E, 0x47]
}
