//! crnd-cli - Command-line interface for the CRN transcoder
//!
//! A command-line tool for inspecting, validating, unpacking and splitting
//! CRN compressed texture files.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use crnd::{
    create_segmented_file, level_data, level_info, texture_info, validate_file, TranscodeFormat,
    Unpacker,
};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "crnd-cli")]
#[command(about = "A CLI tool for unpacking CRN compressed textures")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print texture and per-level information
    Info {
        /// CRN file to inspect
        input: PathBuf,
    },

    /// Verify the header, checksums and directories
    Validate {
        /// CRN file to validate
        input: PathBuf,
    },

    /// Unpack every mip level to raw block data
    Unpack {
        /// Input CRN file
        input: PathBuf,

        /// Output directory for .bin level files
        output: PathBuf,

        /// Output layout for ETC1S files
        #[arg(short, long, value_enum, default_value_t = CliTranscodeFormat::Unchanged)]
        format: CliTranscodeFormat,

        /// Force overwrite of existing output files
        #[arg(short = 'F', long)]
        force: bool,
    },

    /// Split a file into a palette-only base and per-level streams
    Split {
        /// Input CRN file
        input: PathBuf,

        /// Output directory for the base and level files
        output: PathBuf,

        /// Force overwrite of existing output files
        #[arg(short = 'F', long)]
        force: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CliTranscodeFormat {
    /// Emit blocks in the file's own format
    Unchanged,
    /// Convert ETC1S blocks to DXT1
    Dxt1,
    /// Convert ETC1S blocks to DXT5A
    Dxt5a,
}

impl From<CliTranscodeFormat> for TranscodeFormat {
    fn from(format: CliTranscodeFormat) -> Self {
        match format {
            CliTranscodeFormat::Unchanged => TranscodeFormat::Unchanged,
            CliTranscodeFormat::Dxt1 => TranscodeFormat::Dxt1,
            CliTranscodeFormat::Dxt5a => TranscodeFormat::Dxt5A,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Info { input } => show_info(&input),
        Commands::Validate { input } => validate(&input, cli.quiet),
        Commands::Unpack {
            input,
            output,
            format,
            force,
        } => unpack(&input, &output, format.into(), force, cli.quiet),
        Commands::Split {
            input,
            output,
            force,
        } => split(&input, &output, force, cli.quiet),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn show_info(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let info = texture_info(&data)?;

    println!("File: {}", input.display());
    println!("  Size:      {} bytes", data.len());
    println!("  Format:    {:?}", info.format);
    println!("  Texture:   {}x{}", info.width, info.height);
    println!("  Levels:    {}", info.levels);
    println!("  Faces:     {}", info.faces);
    println!("  Block:     {} bytes", info.bytes_per_block);
    println!("  Userdata:  {:08X} {:08X}", info.userdata0, info.userdata1);

    for level in 0..info.levels {
        let li = level_info(&data, level)?;
        println!(
            "  Level {:2}: {:4}x{:<4} ({}x{} blocks, {} bytes)",
            level,
            li.width,
            li.height,
            li.blocks_x,
            li.blocks_y,
            li.blocks_x * li.blocks_y * li.bytes_per_block
        );
    }

    Ok(())
}

fn validate(input: &PathBuf, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let start = Instant::now();
    let file_info = validate_file(&data)?;

    if !quiet {
        println!("✓ {} is a valid CRN file", input.display());
        println!("  Header:   {} bytes", file_info.header_size);
        println!("  Palettes: {} bytes", file_info.total_palette_size);
        println!("  Tables:   {} bytes", file_info.tables_size);
        println!(
            "  Palette entries: {} color endpoints, {} color selectors, {} alpha endpoints, {} alpha selectors",
            file_info.color_endpoint_palette_entries,
            file_info.color_selector_palette_entries,
            file_info.alpha_endpoint_palette_entries,
            file_info.alpha_selector_palette_entries
        );
        println!("  Validated in {:.2?}", start.elapsed());
    }

    Ok(())
}

fn check_output_file(path: &PathBuf, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(format!(
            "Output file {} already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }
    Ok(())
}

fn unpack(
    input: &PathBuf,
    output: &PathBuf,
    format: TranscodeFormat,
    force: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let info = texture_info(&data)?;
    fs::create_dir_all(output)?;

    let start = Instant::now();
    let mut unpacker = Unpacker::new(&data)?;

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new((info.levels * info.faces) as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}")
                .expect("static progress template"),
        );
        bar
    };

    // Conversions change the output block size; two dwords fit both targets.
    let block_pitch = if format == TranscodeFormat::Unchanged { 0 } else { 2 };

    let mut total_bytes = 0usize;
    for level in 0..info.levels {
        progress.set_message(format!("level {level}"));
        let faces = unpacker.unpack_level_vec(level, format, block_pitch)?;
        for (face_index, face) in faces.iter().enumerate() {
            let name = if info.faces > 1 {
                format!("level{level:02}_face{face_index}.bin")
            } else {
                format!("level{level:02}.bin")
            };
            let path = output.join(name);
            check_output_file(&path, force)?;
            fs::write(&path, face)?;
            total_bytes += face.len();
            progress.inc(1);
        }
    }
    progress.finish_and_clear();

    if !quiet {
        println!(
            "✓ Unpacked {} levels x {} faces ({} bytes) in {:.2?}",
            info.levels,
            info.faces,
            total_bytes,
            start.elapsed()
        );
    }

    Ok(())
}

fn split(
    input: &PathBuf,
    output: &PathBuf,
    force: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let info = texture_info(&data)?;
    fs::create_dir_all(output)?;

    let base = create_segmented_file(&data)?;
    let base_path = output.join("base.crn");
    check_output_file(&base_path, force)?;
    fs::write(&base_path, &base)?;

    let mut level_bytes = 0usize;
    for level in 0..info.levels {
        let stream = level_data(&data, level)?;
        let path = output.join(format!("level{level:02}.crnseg"));
        check_output_file(&path, force)?;
        fs::write(&path, stream)?;
        level_bytes += stream.len();
    }

    if !quiet {
        println!(
            "✓ Split {} into {} byte base + {} levels ({} bytes)",
            input.display(),
            base.len(),
            info.levels,
            level_bytes
        );
    }

    Ok(())
}
