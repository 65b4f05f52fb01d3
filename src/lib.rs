//! # pzip
//!
//! Builds a PNG-ZIP polyglot: one file that is a valid PNG image, a valid ZIP
//! archive, and a self-extracting script. The ZIP archive rides inside a
//! trailing IDAT chunk and a dual shell/batch bootstrap script rides inside an
//! iCCP chunk, so image hosts that preserve those chunks preserve the payload.
//!
//! The pipeline: validate and prune the cover PNG down to its critical
//! chunks, frame the ZIP as an IDAT chunk, compose the extraction script from
//! the first archived filename, splice both into the image, then rewrite the
//! ZIP's internal offsets so both format views stay consistent.

pub mod cli;
pub mod png;
pub mod polyglot;
pub mod script;
pub mod utils;
pub mod zip;

/// Result type alias for polyglot build operations
pub type PzipResult<T> = Result<T, PzipError>;

/// Maximum size of the finished polyglot file (200 MiB)
pub const MAX_FILE_SIZE: usize = 209_715_200;

/// Minimum accepted cover image size in bytes
pub const MIN_IMAGE_SIZE: usize = 68;

/// Minimum accepted ZIP archive size in bytes
pub const MIN_ZIP_SIZE: usize = 40;

/// Bytes that terminate or misparse the POSIX-shell prefix of the extraction
/// script. They must not appear in the IHDR dimension/CRC range or in the
/// high byte of the iCCP length field.
pub const FORBIDDEN_BYTES: [u8; 7] = [0x22, 0x27, 0x28, 0x29, 0x3B, 0x3E, 0x60];

/// Error type for the polyglot builder. Display output follows the
/// `<Category>: <specific cause>` diagnostic pattern.
#[derive(Debug, thiserror::Error)]
pub enum PzipError {
    #[error("InvalidArgs: {0}")]
    InvalidArgs(String),

    #[error("IOOpen: {0}")]
    Open(String),

    #[error("SizeBounds: {0}")]
    SizeBounds(String),

    #[error("PngShape: {0}")]
    PngShape(String),

    #[error("PngIntegrity: {0}")]
    PngIntegrity(String),

    #[error("PngStructure: {0}")]
    PngStructure(String),

    #[error("ZipShape: {0}")]
    ZipShape(String),

    #[error("IOWrite: {0}")]
    Write(String),
}
