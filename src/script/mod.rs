//! Extraction-script composition
//!
//! Builds the iCCP chunk carried just after IHDR. The chunk's "compressed
//! profile" field holds a plain-text script that is simultaneously a POSIX
//! shell script and a Windows batch file: renamed and executed, it moves the
//! polyglot into `pdvzip_extracted/`, unpacks the embedded archive, then
//! launches the first archived entry with an application chosen from its file
//! extension.

use crate::utils::{calculate_crc32, write_be, FieldWidth};
use crate::{PzipError, PzipResult, FORBIDDEN_BYTES};

/// Maximum size of the complete iCCP chunk, framing included
pub const MAX_SCRIPT_SIZE: usize = 750;

/// The dual shell/batch bootstrap, framed as an iCCP chunk:
/// `length(4) | "iCCP" | "scr\0" | method(0) | script | crc placeholder(4)`.
/// The `\r\n` line endings are load-bearing for Windows batch parsing; the
/// byte sequence is opaque data, not text to be normalized.
const SCRIPT_TEMPLATE: &[u8] =
    b"\x00\x00\x00\xFDiCCPscr\x00\x00\rREM;clear;mkdir ./pdvzip_extracted;mv \"$0\" \
./pdvzip_extracted;cd ./pdvzip_extracted;unzip -qo \"$0\";clear;\"\";exit;\r\n\
#&cls&mkdir .\\pdvzip_extracted&move \"%~dpnx0\" .\\pdvzip_extracted&cd \
.\\pdvzip_extracted&cls&tar -xf \"%~n0%~x0\"& \"\"&ren \"%~n0%~x0\" *.png&exit\r\n\
\x00\x00\x00\x00";

// Insertion points within the pristine template. The POSIX command slot sits
// between `clear;` and the empty quotes; the Windows slot between `&` and its
// empty quotes; names land inside the quotes, argument strings just after.
const POSIX_APP_INDEX: usize = 119;
const POSIX_NAME_INDEX: usize = 120;
const POSIX_ARGS_INDEX: usize = 121;
const WINDOWS_APP_INDEX: usize = 239;
const WINDOWS_NAME_INDEX: usize = 241;
const WINDOWS_ARGS_INDEX: usize = 242;
const WINDOWS_PAUSE_INDEX: usize = 264;

const VLC: &[u8] = b"vlc --play-and-exit --no-video-title-show ";
const EVINCE: &[u8] = b"evince ";
const PYTHON3: &[u8] = b"python3 ";
const PWSH: &[u8] = b"pwsh ";
const EXEC_PREFIX: &[u8] = b"./";
const XDG_OPEN: &[u8] = b"xdg-open ";
const INVOKE_ITEM: &[u8] = b"powershell;Invoke-Item ";
const DEV_NULL: &[u8] = b" &> /dev/null";
const START_B: &[u8] = b"start /b \"\"";
const PAUSE: &[u8] = b"pause&";
const WIN_POWERSHELL: &[u8] = b"powershell";
const CHMOD: &[u8] = b"chmod +x ";
const SHELL_SEP: &[u8] = b";";

/// Extension keys, matched against the last three characters of the first
/// archived filename. Indices 0-14 are audio/video containers.
const EXT_KEYS: [&[u8; 3]; 19] = [
    b"aac", b"mp3", b"mp4", b"avi", b"asf", b"flv", b"ebm", b"mkv", b"peg", b"wav", b"wmv",
    b"wma", b"mov", b"3gp", b"ogg", b"pdf", b".py", b"ps1", b"exe",
];

/// Application launcher class selected from the first archived entry's name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launcher {
    VideoAudio,
    Pdf,
    Python,
    PowerShell,
    Executable,
    Bash,
    Folder,
    Default,
}

impl Launcher {
    /// Pick the launcher for an archived entry name. A trailing `/` selects
    /// the folder launcher; a name with no extension (no `.` past the first
    /// character) is treated as an executable; anything unmatched falls back
    /// to the operating system's default handler.
    pub fn for_entry(name: &[u8]) -> Launcher {
        if name.last() == Some(&b'/') {
            return Launcher::Folder;
        }
        if name.len() >= 3 {
            let ext: &[u8] = &name[name.len() - 3..];
            if ext == b".sh" {
                return Launcher::Bash;
            }
            if let Some(index) = EXT_KEYS.iter().position(|key| key.as_slice() == ext) {
                return match index {
                    0..=14 => Launcher::VideoAudio,
                    15 => Launcher::Pdf,
                    16 => Launcher::Python,
                    17 => Launcher::PowerShell,
                    _ => Launcher::Executable,
                };
            }
        }
        if name.len() < 2 || !name[1..].contains(&b'.') {
            Launcher::Executable
        } else {
            Launcher::Default
        }
    }

    /// Whether the launcher accepts user-supplied command-line arguments
    pub fn wants_args(self) -> bool {
        matches!(
            self,
            Launcher::Python | Launcher::PowerShell | Launcher::Executable | Launcher::Bash
        )
    }
}

/// Optional command-line argument strings for the launched entry
#[derive(Debug, Clone, Default)]
pub struct LaunchArgs {
    pub posix: String,
    pub windows: String,
}

/// One splice into the template: (position, bytes). Positions are expressed
/// against the pristine template and listed in non-increasing order, so each
/// splice leaves the positions of the ones still to come valid.
type InsertPlan = Vec<(usize, Vec<u8>)>;

fn insertion_plan(
    name: &[u8],
    launcher: Launcher,
    posix_args: &[u8],
    windows_args: &[u8],
) -> InsertPlan {
    let name = name.to_vec();
    match launcher {
        Launcher::VideoAudio => vec![
            (WINDOWS_NAME_INDEX, name.clone()),
            (WINDOWS_APP_INDEX, START_B.to_vec()),
            (POSIX_ARGS_INDEX, DEV_NULL.to_vec()),
            (POSIX_NAME_INDEX, name),
            (POSIX_APP_INDEX, VLC.to_vec()),
        ],
        Launcher::Pdf => vec![
            (WINDOWS_NAME_INDEX, name.clone()),
            (WINDOWS_APP_INDEX, START_B.to_vec()),
            (POSIX_NAME_INDEX, name),
            (POSIX_APP_INDEX, EVINCE.to_vec()),
        ],
        Launcher::Folder => vec![
            (WINDOWS_NAME_INDEX, name.clone()),
            (WINDOWS_APP_INDEX, INVOKE_ITEM.to_vec()),
            (POSIX_NAME_INDEX, name),
            (POSIX_APP_INDEX, XDG_OPEN.to_vec()),
        ],
        Launcher::Default => vec![
            (WINDOWS_NAME_INDEX, name.clone()),
            (WINDOWS_APP_INDEX, START_B.to_vec()),
            (POSIX_NAME_INDEX, name),
            (POSIX_APP_INDEX, XDG_OPEN.to_vec()),
        ],
        Launcher::Python => vec![
            (WINDOWS_PAUSE_INDEX, PAUSE.to_vec()),
            (WINDOWS_ARGS_INDEX, windows_args.to_vec()),
            (WINDOWS_NAME_INDEX, name.clone()),
            (WINDOWS_APP_INDEX, PYTHON3.to_vec()),
            (POSIX_ARGS_INDEX, posix_args.to_vec()),
            (POSIX_NAME_INDEX, name),
            (POSIX_APP_INDEX, PYTHON3.to_vec()),
        ],
        Launcher::PowerShell => vec![
            (WINDOWS_PAUSE_INDEX, PAUSE.to_vec()),
            (WINDOWS_ARGS_INDEX, windows_args.to_vec()),
            // PowerShell on Windows wants an explicit relative path.
            (WINDOWS_NAME_INDEX, [b".\\".as_slice(), name.as_slice()].concat()),
            (WINDOWS_APP_INDEX, WIN_POWERSHELL.to_vec()),
            (POSIX_ARGS_INDEX, posix_args.to_vec()),
            (POSIX_NAME_INDEX, name),
            (POSIX_APP_INDEX, PWSH.to_vec()),
        ],
        Launcher::Executable => vec![
            (WINDOWS_PAUSE_INDEX, PAUSE.to_vec()),
            (WINDOWS_ARGS_INDEX, windows_args.to_vec()),
            (WINDOWS_NAME_INDEX, name.clone()),
            (WINDOWS_APP_INDEX, START_B.to_vec()),
            (POSIX_ARGS_INDEX, posix_args.to_vec()),
            (POSIX_NAME_INDEX, name.clone()),
            (POSIX_APP_INDEX, EXEC_PREFIX.to_vec()),
            (POSIX_APP_INDEX, SHELL_SEP.to_vec()),
            (POSIX_APP_INDEX, name),
            (POSIX_APP_INDEX, CHMOD.to_vec()),
        ],
        Launcher::Bash => vec![
            (WINDOWS_ARGS_INDEX, windows_args.to_vec()),
            (WINDOWS_NAME_INDEX, name.clone()),
            (WINDOWS_APP_INDEX, START_B.to_vec()),
            (POSIX_ARGS_INDEX, posix_args.to_vec()),
            (POSIX_NAME_INDEX, name.clone()),
            (POSIX_APP_INDEX, EXEC_PREFIX.to_vec()),
            (POSIX_APP_INDEX, SHELL_SEP.to_vec()),
            (POSIX_APP_INDEX, name),
            (POSIX_APP_INDEX, CHMOD.to_vec()),
        ],
    }
}

/// Compose the complete iCCP script chunk for the given first-entry name.
/// Argument strings are only consulted for launchers that accept them; each
/// is inserted prefixed with a single space.
pub fn build_script(
    first_entry_name: &[u8],
    launcher: Launcher,
    args: &LaunchArgs,
) -> PzipResult<Vec<u8>> {
    let mut script = SCRIPT_TEMPLATE.to_vec();

    let posix_args = format!(" {}", args.posix).into_bytes();
    let windows_args = format!(" {}", args.windows).into_bytes();

    for (position, bytes) in insertion_plan(first_entry_name, launcher, &posix_args, &windows_args)
    {
        script.splice(position..position, bytes);
    }

    // The chunk is small enough that only the low two bytes of the PNG
    // 32-bit length field are ever written.
    let script_len = script.len();
    write_be(&mut script, 2, (script_len - 12) as u32, FieldWidth::U16);

    // A forbidden byte in the length field would break the shell prefix;
    // trailing dots are ignored by both interpreters, so pad past it.
    if FORBIDDEN_BYTES.contains(&script[3]) {
        let pad_index = script.len() - 4;
        script.splice(pad_index..pad_index, *b"..........");
        let script_len = script.len();
        write_be(&mut script, 2, (script_len - 12) as u32, FieldWidth::U16);
    }

    if script.len() > MAX_SCRIPT_SIZE {
        return Err(PzipError::SizeBounds(
            "Extraction script exceeds size limit".to_string(),
        ));
    }

    let crc_index = script.len() - 4;
    let crc = calculate_crc32(&script[4..crc_index]);
    write_be(&mut script, crc_index, crc, FieldWidth::U32);

    Ok(script)
}
