//! ZIP archive validation and IDAT framing

pub mod offsets;

use std::fs;
use std::path::Path;

use crate::utils::{write_be, FieldWidth};
use crate::{PzipError, PzipResult, MIN_ZIP_SIZE};

/// Local file header signature `PK\x03\x04`
pub const LOCAL_FILE_SIG: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

// Offsets within the IDAT-framed buffer: the ZIP bytes start at 8, so the
// local header's filename length (header offset 26, low byte) lands at 34
// and the filename itself at 38.
const FRAMED_ZIP_START: usize = 8;
const NAME_LENGTH_INDEX: usize = 34;
const NAME_INDEX: usize = 38;

const MIN_ENTRY_NAME_LENGTH: usize = 4;

/// The user's ZIP archive framed as a PNG IDAT chunk:
/// `length(4) | "IDAT" | zip bytes | crc placeholder(4)`.
/// The CRC stays zeroed until final assembly, when it is computed over the
/// chunk's position in the combined buffer.
#[derive(Debug, Clone)]
pub struct ZipPayload {
    data: Vec<u8>,
}

impl ZipPayload {
    /// Load and frame a ZIP archive from a file path
    pub fn from_file(path: &Path) -> PzipResult<Self> {
        let data =
            fs::read(path).map_err(|_| PzipError::Open("Unable to open ZIP file".to_string()))?;
        Self::new(data)
    }

    /// Frame raw ZIP bytes as an IDAT chunk and validate the archive shape
    pub fn new(zip_bytes: Vec<u8>) -> PzipResult<Self> {
        if zip_bytes.len() < MIN_ZIP_SIZE {
            return Err(PzipError::SizeBounds(
                "Invalid ZIP file. File too small".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(zip_bytes.len() + 12);
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        data.extend_from_slice(b"IDAT");
        data.extend_from_slice(&zip_bytes);
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let chunk_len = (data.len() - 12) as u32;
        write_be(&mut data, 0, chunk_len, FieldWidth::U32);

        if data[FRAMED_ZIP_START..FRAMED_ZIP_START + 4] != LOCAL_FILE_SIG {
            return Err(PzipError::ZipShape(
                "File does not appear to be a valid ZIP archive".to_string(),
            ));
        }

        let name_len = data[NAME_LENGTH_INDEX] as usize;
        if name_len < MIN_ENTRY_NAME_LENGTH || NAME_INDEX + name_len > data.len() {
            return Err(PzipError::ZipShape(
                "Name length of first file within ZIP archive is too short. Increase its \
                 length (minimum 4 characters) and make sure it has a valid extension"
                    .to_string(),
            ));
        }

        Ok(Self { data })
    }

    /// Name of the first archived entry, as raw bytes
    pub fn first_entry_name(&self) -> &[u8] {
        let name_len = self.data[NAME_LENGTH_INDEX] as usize;
        &self.data[NAME_INDEX..NAME_INDEX + name_len]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
