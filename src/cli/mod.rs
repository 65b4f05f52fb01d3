//! Command-line input validation and the --info help page

use std::sync::OnceLock;

use regex::Regex;

use crate::{PzipError, PzipResult};

fn path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_.\\/\s-]+$").expect("path pattern is a valid regex")
    })
}

/// Check both input paths: the cover image must end in `.png`, the archive in
/// `.zip`, and neither may contain characters outside the permitted set.
pub fn validate_input_paths(image_path: &str, zip_path: &str) -> PzipResult<()> {
    if !image_path.ends_with(".png") || !zip_path.ends_with(".zip") {
        return Err(PzipError::InvalidArgs(
            "Invalid file extension found. Only expecting 'png' followed by 'zip'".to_string(),
        ));
    }
    if !path_pattern().is_match(image_path) || !path_pattern().is_match(zip_path) {
        return Err(PzipError::InvalidArgs(
            "Characters not supported by this program found within file name arguments"
                .to_string(),
        ));
    }
    Ok(())
}

/// Static help page for the `--info` verb
pub fn info_text() -> &'static str {
    r#"
pzip enables you to embed a ZIP file within a shareable and "executable" PNG image.

Hosting sites that preserve iCCP and trailing IDAT chunks will retain the embedded
data within the PNG image. Once embedded, the archive can be shared on such a site
or "executed" whenever you want to access the embedded file(s).

From a Linux terminal: ./pzip_your_image.png (the image file requires executable
permissions). From a Windows terminal: first rename the '.png' extension to '.cmd',
then run .\pzip_your_image.cmd

For common video/audio files, Linux requires 'vlc' (VideoLAN); Windows uses the
default media player. PDF files use 'evince' on Linux and the default viewer on
Windows. Python '.py' files run with 'python3' on both systems. PowerShell '.ps1'
scripts use 'pwsh' on Linux and 'powershell' on Windows. For any other file
extension the operating system's default application is used.

PNG image requirements:

PNG-32/24 (Truecolor, color types 6 & 2): dimensions between 68 x 68 and 899 x 899.
PNG-8 (Indexed color, color type 3): dimensions between 68 x 68 and 4096 x 4096.

The combined size of image, archive and internal extraction script must not exceed
200MB (209,715,200 bytes). Hosting sites impose their own, usually smaller, limits;
the less detailed the image, the more space remains for the archive.

ZIP file requirements:

Use a standard ZIP archive compatible with Linux unzip and Windows Explorer. Give
the first file within the archive a name of at least four characters with a valid
extension; a file without an extension is treated as a Linux executable. Do not
include other ZIP files within the archive.

The archive also remains readable by JAR tooling: rename the '.png' extension to
'.jar', or run 'java -jar image_file_name.png'.
"#
}
