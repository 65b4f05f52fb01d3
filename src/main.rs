use std::io::{self, BufRead, Write};
use std::process;

use clap::Parser;

use pzip::script::{build_script, LaunchArgs, Launcher};
use pzip::{cli, png::CoverImage, polyglot, zip::ZipPayload, PzipError, PzipResult};

#[derive(Parser)]
#[command(name = "pzip")]
#[command(about = "Embed a ZIP archive within a PNG image as a self-extracting polyglot")]
struct Cli {
    /// Display detailed usage information
    #[arg(long)]
    info: bool,

    /// Path to the PNG cover image
    #[arg(required_unless_present = "info")]
    cover_image: Option<String>,

    /// Path to the ZIP file to embed
    #[arg(required_unless_present = "info")]
    zip_file: Option<String>,
}

// Ask for optional launch arguments for script-like payloads. The answers are
// embedded in the extraction script, so this happens before composition.
fn prompt_launch_args() -> PzipResult<LaunchArgs> {
    let read_line = |label: &str| -> PzipResult<String> {
        print!("\n{label}: ");
        io::stdout()
            .flush()
            .map_err(|_| PzipError::Open("Unable to read arguments from standard input".to_string()))?;
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|_| PzipError::Open("Unable to read arguments from standard input".to_string()))?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    };

    println!("\nFor this file type you can provide command-line arguments here, if required.");
    let posix = read_line("Linux")?;
    let windows = read_line("Windows")?;
    Ok(LaunchArgs { posix, windows })
}

fn run(image_name: &str, zip_name: &str) -> PzipResult<()> {
    cli::validate_input_paths(image_name, zip_name)?;

    println!("\nReading files. Please wait...");

    let image_data = std::fs::read(image_name)
        .map_err(|_| PzipError::Open("Unable to open image file".to_string()))?;
    let zip_data = std::fs::read(zip_name)
        .map_err(|_| PzipError::Open("Unable to open ZIP file".to_string()))?;

    polyglot::check_input_sizes(image_data.len(), zip_data.len())?;

    let mut cover = CoverImage::new(image_data)?;
    cover.strip_ancillary()?;

    let zip = ZipPayload::new(zip_data)?;

    let launcher = Launcher::for_entry(zip.first_entry_name());
    let args = if launcher.wants_args() {
        prompt_launch_args()?
    } else {
        LaunchArgs::default()
    };

    println!("\nUpdating extraction script.");
    let script = build_script(zip.first_entry_name(), launcher, &args)?;

    println!("\nEmbedding extraction script and ZIP file within the PNG image.");
    let combined = polyglot::assemble(&cover, &script, &zip)?;

    println!("\nWriting ZIP embedded PNG image out to disk.");
    let filename = polyglot::write_to_disk(&combined)?;

    println!(
        "\nSaved PNG image: {} {} Bytes.\n\nComplete!\n\nYou can now share your PNG-ZIP polyglot image on compatible hosting platforms.",
        filename,
        combined.len()
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if cli.info {
        println!("{}", cli::info_text());
        return;
    }

    let (image_name, zip_name) = match (&cli.cover_image, &cli.zip_file) {
        (Some(image), Some(zip)) => (image.as_str(), zip.as_str()),
        _ => {
            eprintln!("Usage: pzip <cover_image> <zip_file>\n       pzip --info");
            process::exit(1);
        }
    };

    if let Err(err) = run(image_name, zip_name) {
        eprintln!("{err}");
        process::exit(1);
    }
}
