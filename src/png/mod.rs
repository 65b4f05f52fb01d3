//! Cover image validation and pruning

pub mod parser;

use std::fs;
use std::path::Path;

use crate::utils::{find_sig, is_png_signature, read_u32_be};
use crate::{PzipError, PzipResult, FORBIDDEN_BYTES, MIN_IMAGE_SIZE};

const PNG_END_SIG: [u8; 8] = [0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82];

const COLOR_TYPE_TRUECOLOR: u8 = 2;
const COLOR_TYPE_INDEXED: u8 = 3;
const COLOR_TYPE_TRUECOLOR_ALPHA: u8 = 6;

const MIN_DIMS: u32 = 68;
const MAX_TRUECOLOR_DIMS: u32 = 899;
const MAX_INDEXED_DIMS: u32 = 4096;

// IHDR field offsets within the whole file (signature + IHDR framing).
const WIDTH_INDEX: usize = 16;
const HEIGHT_INDEX: usize = 20;
const COLOR_TYPE_INDEX: usize = 25;

// The IHDR width, height, bit depth, color type and CRC bytes all fall in
// this range; a forbidden byte anywhere here would break the shell prefix of
// the extraction script.
const IHDR_SCAN_START: usize = 19;
const IHDR_SCAN_END: usize = 32;

/// Byte length of the PNG signature plus the complete IHDR chunk
pub const HEADER_SIZE: usize = 33;

/// The user's cover PNG, validated and reduced to its critical chunks
#[derive(Debug, Clone)]
pub struct CoverImage {
    data: Vec<u8>,
    color_type: u8,
}

impl CoverImage {
    /// Load and validate a cover image from a file path
    pub fn from_file(path: &Path) -> PzipResult<Self> {
        let data = fs::read(path)
            .map_err(|_| PzipError::Open("Unable to open image file".to_string()))?;
        Self::new(data)
    }

    /// Validate raw PNG bytes: signatures, forbidden IHDR bytes, color type
    /// and dimension windows. Pruning is a separate step (`strip_ancillary`).
    pub fn new(data: Vec<u8>) -> PzipResult<Self> {
        if data.len() < MIN_IMAGE_SIZE {
            return Err(PzipError::SizeBounds(
                "Invalid PNG image. File too small".to_string(),
            ));
        }
        if !is_png_signature(&data) || data[data.len() - 8..] != PNG_END_SIG {
            return Err(PzipError::PngShape(
                "File does not appear to be a valid PNG image".to_string(),
            ));
        }

        if data[IHDR_SCAN_START..=IHDR_SCAN_END]
            .iter()
            .any(|byte| FORBIDDEN_BYTES.contains(byte))
        {
            return Err(PzipError::PngShape(
                "The IHDR chunk of this image contains a character that will break the \
                 extraction script. Try modifying image dimensions (1% increase or decrease) \
                 to resolve the issue"
                    .to_string(),
            ));
        }

        let color_type = data[COLOR_TYPE_INDEX];
        if !matches!(
            color_type,
            COLOR_TYPE_TRUECOLOR | COLOR_TYPE_INDEXED | COLOR_TYPE_TRUECOLOR_ALPHA
        ) {
            return Err(PzipError::PngShape(
                "Color type of PNG image is not supported. PNG-32/24 (Truecolor) or \
                 PNG-8 (Indexed color) only"
                    .to_string(),
            ));
        }

        // Full 32-bit reads; anything above the window is rejected rather
        // than truncated to the low 16 bits.
        let width = read_u32_be(&data, WIDTH_INDEX);
        let height = read_u32_be(&data, HEIGHT_INDEX);
        let max_dims = if color_type == COLOR_TYPE_INDEXED {
            MAX_INDEXED_DIMS
        } else {
            MAX_TRUECOLOR_DIMS
        };
        let dims_ok = (MIN_DIMS..=max_dims).contains(&width) && (MIN_DIMS..=max_dims).contains(&height);
        if !dims_ok {
            return Err(PzipError::PngShape(
                "Dimensions of PNG image are not within the supported range. \
                 PNG-32/24 Truecolor: [68 x 68] to [899 x 899]. \
                 PNG-8 Indexed color: [68 x 68] to [4096 x 4096]"
                    .to_string(),
            ));
        }

        Ok(Self { data, color_type })
    }

    /// Rebuild the image keeping only the critical chunks, in canonical
    /// order: IHDR, PLTE (indexed color only), every IDAT, IEND. The first
    /// IDAT's CRC is verified before anything is copied.
    pub fn strip_ancillary(&mut self) -> PzipResult<()> {
        let first_idat = parser::find_chunk(&self.data, b"IDAT", 0).ok_or_else(|| {
            PzipError::PngShape("File does not appear to be a valid PNG image".to_string())
        })?;

        if !parser::chunk_crc_matches(&self.data, first_idat) {
            return Err(PzipError::PngIntegrity(
                "CRC value for first IDAT chunk is invalid".to_string(),
            ));
        }

        let mut pruned = Vec::with_capacity(self.data.len());
        pruned.extend_from_slice(&self.data[..HEADER_SIZE]);

        if self.color_type == COLOR_TYPE_INDEXED {
            let plte_index = parser::find_chunk(&self.data, b"PLTE", 0)
                .filter(|&index| index < first_idat)
                .ok_or_else(|| {
                    PzipError::PngStructure(
                        "Required PLTE chunk not found for indexed-color image".to_string(),
                    )
                })?;
            let plte_len = parser::chunk_data_len(&self.data, plte_index).ok_or_else(|| {
                PzipError::PngStructure(
                    "Required PLTE chunk not found for indexed-color image".to_string(),
                )
            })?;
            pruned.extend_from_slice(
                &self.data[plte_index..plte_index + plte_len + parser::CHUNK_OVERHEAD],
            );
        }

        let mut idat_index = Some(first_idat);
        while let Some(index) = idat_index {
            let len = parser::chunk_data_len(&self.data, index).ok_or_else(|| {
                PzipError::PngShape("File does not appear to be a valid PNG image".to_string())
            })?;
            let chunk_end = index + len + parser::CHUNK_OVERHEAD;
            pruned.extend_from_slice(&self.data[index..chunk_end]);
            idat_index = parser::find_chunk(&self.data, b"IDAT", chunk_end);
        }

        pruned.extend_from_slice(&self.data[self.data.len() - 12..]);
        self.data = pruned;
        Ok(())
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
