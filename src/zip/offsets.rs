//! ZIP offset rewriting over the assembled polyglot buffer
//!
//! After the archive is spliced into the PNG, every "relative offset of local
//! header" field in the central directory, the end record's central-directory
//! start offset, and the archive comment length must be rewritten so a ZIP
//! reader finds its records at their new absolute positions.

use crate::utils::{find_sig, read_u16_le, write_le, FieldWidth};
use crate::zip::LOCAL_FILE_SIG;
use crate::{PzipError, PzipResult};

const CENTRAL_DIR_SIG: [u8; 4] = [0x50, 0x4B, 0x01, 0x02];
const END_CENTRAL_DIR_SIG: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];

// Field positions relative to a record signature, expressed per the
// little-endian writer contract (index of the field's last byte).
const LOCAL_OFFSET_FIELD_END: usize = 45;
const CD_START_FIELD_END: usize = 19;
const COMMENT_LENGTH_FIELD_END: usize = 21;

const TOTAL_ENTRIES_OFFSET: usize = 10;
const COMMENT_LENGTH_OFFSET: usize = 20;

// Growing the comment by 16 bytes swallows the ZIP CRC placeholder and the
// PNG IEND chunk that trail the end record, so ZIP readers accept the file.
const COMMENT_GROWTH: u16 = 16;

/// Rewrite every ZIP offset in `data` against its new absolute position.
/// `idat_zip_index` is the index of the ZIP-bearing IDAT chunk's type field
/// within the combined buffer.
pub fn fix_offsets(data: &mut [u8], idat_zip_index: usize) -> PzipResult<()> {
    let cd_index = find_sig(data, &CENTRAL_DIR_SIG, idat_zip_index).ok_or_else(|| {
        PzipError::ZipShape("Central directory signature not found".to_string())
    })?;
    let eocd_index = find_sig(data, &END_CENTRAL_DIR_SIG, cd_index).ok_or_else(|| {
        PzipError::ZipShape("End of central directory record not found".to_string())
    })?;
    if eocd_index + 22 > data.len() {
        return Err(PzipError::ZipShape(
            "End of central directory record is truncated".to_string(),
        ));
    }

    let total_entries = read_u16_le(data, eocd_index + TOTAL_ENTRIES_OFFSET);

    let mut local_index = idat_zip_index;
    let mut central_search = cd_index;
    for _ in 0..total_entries {
        local_index = find_sig(data, &LOCAL_FILE_SIG, local_index + 1).ok_or_else(|| {
            PzipError::ZipShape("Local file header not found".to_string())
        })?;
        let entry_index = find_sig(data, &CENTRAL_DIR_SIG, central_search).ok_or_else(|| {
            PzipError::ZipShape("Central directory entry not found".to_string())
        })?;
        if entry_index + 46 > data.len() {
            return Err(PzipError::ZipShape(
                "Central directory entry is truncated".to_string(),
            ));
        }
        write_le(
            data,
            entry_index + LOCAL_OFFSET_FIELD_END,
            local_index as u32,
            FieldWidth::U32,
        );
        central_search = entry_index + 4;
    }

    write_le(
        data,
        eocd_index + CD_START_FIELD_END,
        cd_index as u32,
        FieldWidth::U32,
    );

    let comment_length =
        u32::from(read_u16_le(data, eocd_index + COMMENT_LENGTH_OFFSET)) + u32::from(COMMENT_GROWTH);
    write_le(
        data,
        eocd_index + COMMENT_LENGTH_FIELD_END,
        comment_length,
        FieldWidth::U16,
    );

    Ok(())
}
