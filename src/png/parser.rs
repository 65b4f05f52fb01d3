//! Low-level PNG chunk scanning using manual byte slicing

use crate::utils::{calculate_crc32, find_sig, read_u32_be};

/// Byte length of a chunk's length + type + CRC framing
pub const CHUNK_OVERHEAD: usize = 12;

/// Locate a chunk by its 4-byte type name at or after `from`. Returns the
/// index of the chunk's LENGTH field (4 bytes before the type name).
pub fn find_chunk(data: &[u8], chunk_type: &[u8; 4], from: usize) -> Option<usize> {
    let type_index = find_sig(data, chunk_type, from)?;
    if type_index < 4 {
        return None;
    }
    Some(type_index - 4)
}

/// Read a chunk's data length, given the index of its length field
pub fn chunk_data_len(data: &[u8], chunk_index: usize) -> Option<usize> {
    if chunk_index + 4 > data.len() {
        return None;
    }
    let len = read_u32_be(data, chunk_index) as usize;
    if chunk_index + CHUNK_OVERHEAD + len > data.len() {
        return None;
    }
    Some(len)
}

/// Verify the stored CRC of the chunk whose length field sits at
/// `chunk_index`. The CRC covers the type name and the data bytes.
pub fn chunk_crc_matches(data: &[u8], chunk_index: usize) -> bool {
    match chunk_data_len(data, chunk_index) {
        Some(len) => {
            let computed = calculate_crc32(&data[chunk_index + 4..chunk_index + 8 + len]);
            let stored = read_u32_be(data, chunk_index + 8 + len);
            computed == stored
        }
        None => false,
    }
}
