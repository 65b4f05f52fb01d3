//! Final polyglot assembly
//!
//! Splices the script chunk and the ZIP-bearing IDAT into the pruned cover
//! image, rewrites the ZIP offsets against their new absolute positions, then
//! seals the last IDAT with a fresh CRC. PNG structure is authoritative
//! throughout; the ZIP view is patched afterwards to agree.

use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::png::{CoverImage, HEADER_SIZE};
use crate::utils::{calculate_crc32, write_be, FieldWidth};
use crate::zip::{offsets, ZipPayload};
use crate::{PzipError, PzipResult, MAX_FILE_SIZE, MIN_IMAGE_SIZE, MIN_ZIP_SIZE};

/// Up-front size screening of the two input files, before any parsing
pub fn check_input_sizes(image_size: usize, zip_size: usize) -> PzipResult<()> {
    if image_size < MIN_IMAGE_SIZE {
        return Err(PzipError::SizeBounds(
            "Invalid PNG image. File too small".to_string(),
        ));
    }
    if zip_size < MIN_ZIP_SIZE {
        return Err(PzipError::SizeBounds(
            "Invalid ZIP file. File too small".to_string(),
        ));
    }
    if image_size + zip_size > MAX_FILE_SIZE {
        return Err(PzipError::SizeBounds(
            "The combined file size of your PNG image and ZIP file exceeds maximum limit"
                .to_string(),
        ));
    }
    Ok(())
}

/// Merge the pruned cover image, the script chunk and the framed archive into
/// one buffer: `IHDR | iCCP(script) | [PLTE] | IDAT+ | IDAT(zip) | IEND`.
pub fn assemble(image: &CoverImage, script: &[u8], zip: &ZipPayload) -> PzipResult<Vec<u8>> {
    let image_size = image.len();
    let script_size = script.len();
    let zip_size = zip.len();

    let total = image_size + script_size + zip_size;
    if total > MAX_FILE_SIZE {
        return Err(PzipError::SizeBounds(
            "The combined file size of your PNG image, ZIP file and extraction script \
             exceeds maximum limit"
                .to_string(),
        ));
    }

    let image_bytes = image.as_bytes();
    let mut data = Vec::with_capacity(total);
    data.extend_from_slice(&image_bytes[..HEADER_SIZE]);
    data.extend_from_slice(script);
    data.extend_from_slice(&image_bytes[HEADER_SIZE..image_size - 12]);
    data.extend_from_slice(zip.as_bytes());
    data.extend_from_slice(&image_bytes[image_size - 12..]);

    // Type field of the ZIP-bearing IDAT within the combined buffer.
    let idat_zip_index = image_size + script_size - 8;
    offsets::fix_offsets(&mut data, idat_zip_index)?;

    // The CRC covers type + data and must follow every offset rewrite.
    let crc = calculate_crc32(&data[idat_zip_index..idat_zip_index + zip_size - 8]);
    let crc_index = data.len() - 16;
    write_be(&mut data, crc_index, crc, FieldWidth::U32);

    Ok(data)
}

fn output_filename() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or(0);
    format!("pzip_{:05}.png", nanos % 100_000)
}

/// Write the finished polyglot under a generated filename, returning the name
pub fn write_to_disk(data: &[u8]) -> PzipResult<String> {
    let filename = output_filename();
    fs::write(&filename, data)
        .map_err(|_| PzipError::Write("Unable to write to file".to_string()))?;
    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{build_script, LaunchArgs, Launcher};
    use crate::utils::{calculate_crc32, read_u16_le, read_u32_be};

    fn chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + data.len());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(chunk_type);
        out.extend_from_slice(data);
        let crc_data = [chunk_type.as_slice(), data].concat();
        out.extend_from_slice(&calculate_crc32(&crc_data).to_be_bytes());
        out
    }

    fn test_png(width: u32, height: u32, color_type: u8) -> Vec<u8> {
        let mut png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let mut ihdr = Vec::with_capacity(13);
        ihdr.extend_from_slice(&width.to_be_bytes());
        ihdr.extend_from_slice(&height.to_be_bytes());
        ihdr.extend_from_slice(&[8, color_type, 0, 0, 0]);
        png.extend_from_slice(&chunk(b"IHDR", &ihdr));
        if color_type == 3 {
            png.extend_from_slice(&chunk(b"PLTE", &[0, 0, 0, 255, 255, 255]));
        }
        png.extend_from_slice(&chunk(
            b"IDAT",
            &[0x78, 0x9C, 0xED, 0xC1, 0x01, 0x01, 0x00, 0x00, 0x00, 0x80, 0x90, 0xFE, 0x37, 0x10],
        ));
        png.extend_from_slice(&chunk(b"IEND", &[]));
        png
    }

    fn test_zip(name: &[u8]) -> Vec<u8> {
        let mut zip = Vec::new();
        zip.extend_from_slice(&[0x50, 0x4B, 0x03, 0x04]);
        zip.extend_from_slice(&[0x0A, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        zip.extend_from_slice(&(name.len() as u16).to_le_bytes());
        zip.extend_from_slice(&[0x00, 0x00]);
        zip.extend_from_slice(name);

        let cd_offset = zip.len();
        zip.extend_from_slice(&[0x50, 0x4B, 0x01, 0x02]);
        zip.extend_from_slice(&[0x0A, 0x00]);
        zip.extend_from_slice(&[0x0A, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        zip.extend_from_slice(&(name.len() as u16).to_le_bytes());
        zip.extend_from_slice(&[0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        zip.extend_from_slice(name);

        let cd_size = zip.len() - cd_offset;
        zip.extend_from_slice(&[0x50, 0x4B, 0x05, 0x06]);
        zip.extend_from_slice(&[0x00, 0x00]);
        zip.extend_from_slice(&[0x00, 0x00]);
        zip.extend_from_slice(&[0x01, 0x00]);
        zip.extend_from_slice(&[0x01, 0x00]);
        zip.extend_from_slice(&(cd_size as u32).to_le_bytes());
        zip.extend_from_slice(&(cd_offset as u32).to_le_bytes());
        zip.extend_from_slice(&[0x00, 0x00]);
        zip
    }

    fn build(png: Vec<u8>, zip_name: &[u8]) -> (Vec<u8>, usize, usize, usize) {
        let mut cover = CoverImage::new(png).unwrap();
        cover.strip_ancillary().unwrap();
        let zip = ZipPayload::new(test_zip(zip_name)).unwrap();
        let launcher = Launcher::for_entry(zip.first_entry_name());
        let script = build_script(zip.first_entry_name(), launcher, &LaunchArgs::default()).unwrap();
        let out = assemble(&cover, &script, &zip).unwrap();
        (out, cover.len(), script.len(), zip.len())
    }

    // Walk the chunk stream, verifying every CRC, and collect type names.
    fn chunk_types(data: &[u8]) -> Vec<[u8; 4]> {
        let mut types = Vec::new();
        let mut offset = 8;
        while offset + 12 <= data.len() {
            let len = read_u32_be(data, offset) as usize;
            let mut chunk_type = [0u8; 4];
            chunk_type.copy_from_slice(&data[offset + 4..offset + 8]);
            let stored = read_u32_be(data, offset + 8 + len);
            let computed = calculate_crc32(&data[offset + 4..offset + 8 + len]);
            assert_eq!(stored, computed, "CRC mismatch in {:?}", chunk_type);
            types.push(chunk_type);
            offset += len + 12;
            if &chunk_type == b"IEND" {
                break;
            }
        }
        types
    }

    fn find(data: &[u8], sig: &[u8]) -> usize {
        data.windows(sig.len()).position(|w| w == sig).unwrap()
    }

    fn read_u32_le(data: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn test_truecolor_chunk_layout() {
        let (out, image_size, script_size, zip_size) = build(test_png(100, 100, 2), b"readme.txt");
        assert_eq!(out.len(), image_size + script_size + zip_size);
        assert_eq!(&out[0..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
        assert_eq!(
            chunk_types(&out),
            vec![*b"IHDR", *b"iCCP", *b"IDAT", *b"IDAT", *b"IEND"]
        );
    }

    #[test]
    fn test_indexed_chunk_layout() {
        let (out, ..) = build(test_png(256, 256, 3), b"a.mp4");
        assert_eq!(
            chunk_types(&out),
            vec![*b"IHDR", *b"iCCP", *b"PLTE", *b"IDAT", *b"IDAT", *b"IEND"]
        );
        // VIDEO_AUDIO launcher commands ride in the iCCP chunk.
        assert!(out.windows(3).any(|w| w == b"vlc"));
        assert!(out.windows(11).any(|w| w == b"start /b \"\""));
    }

    #[test]
    fn test_ihdr_untouched() {
        let png = test_png(100, 100, 2);
        let header = png[..33].to_vec();
        let (out, ..) = build(png, b"readme.txt");
        assert_eq!(&out[..33], header.as_slice());
    }

    #[test]
    fn test_zip_offsets_point_at_new_positions() {
        let (out, ..) = build(test_png(100, 100, 2), b"readme.txt");

        let local = find(&out, &[0x50, 0x4B, 0x03, 0x04]);
        let cd = find(&out, &[0x50, 0x4B, 0x01, 0x02]);
        let eocd = find(&out, &[0x50, 0x4B, 0x05, 0x06]);

        assert_eq!(read_u32_le(&out, cd + 42) as usize, local);
        assert_eq!(read_u32_le(&out, eocd + 16) as usize, cd);
        assert_eq!(read_u16_le(&out, eocd + 20), 16);
    }

    #[test]
    fn test_zip_idat_position() {
        let (out, image_size, script_size, _) = build(test_png(100, 100, 2), b"readme.txt");
        let idat_zip_index = image_size + script_size - 8;
        assert_eq!(&out[idat_zip_index..idat_zip_index + 4], b"IDAT");
        assert_eq!(&out[idat_zip_index + 4..idat_zip_index + 8], &[0x50, 0x4B, 0x03, 0x04]);
    }

    #[test]
    fn test_zip_bytes_survive_intact() {
        let raw_zip = test_zip(b"readme.txt");
        let (out, image_size, script_size, _) = build(test_png(100, 100, 2), b"readme.txt");

        // Everything except the rewritten offset fields must be identical.
        let zip_start = image_size + script_size - 8 + 4;
        let embedded = &out[zip_start..zip_start + raw_zip.len()];
        let cd = find(&out, &[0x50, 0x4B, 0x01, 0x02]) - zip_start;
        let eocd = find(&out, &[0x50, 0x4B, 0x05, 0x06]) - zip_start;
        for (i, (a, b)) in embedded.iter().zip(raw_zip.iter()).enumerate() {
            let rewritten = (cd + 42..cd + 46).contains(&i)
                || (eocd + 16..eocd + 22).contains(&i);
            if !rewritten {
                assert_eq!(a, b, "byte {i} changed");
            }
        }
    }

    #[test]
    fn test_input_size_screening() {
        assert!(check_input_sizes(68, 40).is_ok());
        assert!(matches!(
            check_input_sizes(67, 1000),
            Err(PzipError::SizeBounds(_))
        ));
        assert!(matches!(
            check_input_sizes(1000, 39),
            Err(PzipError::SizeBounds(_))
        ));
        assert!(matches!(
            check_input_sizes(100_000_000, 150_000_000),
            Err(PzipError::SizeBounds(_))
        ));
        assert!(check_input_sizes(100_000_000, 109_715_200).is_ok());
        assert!(matches!(
            check_input_sizes(100_000_000, 109_715_201),
            Err(PzipError::SizeBounds(_))
        ));
    }

    #[test]
    fn test_output_filename_shape() {
        let name = output_filename();
        assert!(name.starts_with("pzip_"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "pzip_00000.png".len());
    }
}
