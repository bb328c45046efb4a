use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use jpegmeta::config::Config;
use jpegmeta::editor::{CopySections, MetadataEditor};
use jpegmeta::iptc::TagDescriptorTable;
use jpegmeta::summary::read_summary;
use jpegmeta::transform::{self, Rotation};

#[derive(Parser, Debug)]
#[command(
    name = "jpegmeta",
    version,
    about = "JPEG metadata editor — read, edit, and rewrite embedded EXIF, IPTC, and XMP blocks"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Preview changes without writing to files
    #[arg(long, global = true)]
    dry_run: bool,

    /// Keep a `.bak` copy of each file before modifying it
    #[arg(long, global = true)]
    backup: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a default config.json and exit
    Init,
    /// Show the merged EXIF/IPTC/XMP metadata of an image
    Show {
        /// Image file to inspect
        path: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set metadata fields on an image
    Set {
        /// Image file to edit
        path: PathBuf,
        /// IPTC ObjectName (2:5)
        #[arg(long)]
        title: Option<String>,
        /// IPTC Caption/Abstract (2:120)
        #[arg(long)]
        caption: Option<String>,
        /// IPTC Keywords (2:25), repeatable
        #[arg(long = "keyword", value_name = "KEYWORD")]
        keywords: Vec<String>,
        /// IPTC By-line (2:80), repeatable
        #[arg(long = "byline", value_name = "NAME")]
        byline: Vec<String>,
        /// IPTC Credit (2:110)
        #[arg(long)]
        credit: Option<String>,
        /// XMP rating (0-5)
        #[arg(long)]
        rating: Option<u8>,
        /// Also mirror title/caption/keywords into the XMP packet
        #[arg(long)]
        xmp: bool,
    },
    /// Copy metadata sections from another JPEG
    Copy {
        /// Image file to edit
        path: PathBuf,
        /// JPEG to copy metadata from
        #[arg(long, value_name = "FILE")]
        from: PathBuf,
        /// Copy the EXIF section
        #[arg(long)]
        exif: bool,
        /// Copy the IPTC (Photoshop) section
        #[arg(long)]
        iptc: bool,
        /// Copy the XMP section
        #[arg(long)]
        xmp: bool,
    },
    /// Remove metadata sections from an image
    Clear {
        /// Image file to edit
        path: PathBuf,
        /// Remove the EXIF section
        #[arg(long)]
        exif: bool,
        /// Remove the IPTC (Photoshop) section
        #[arg(long)]
        iptc: bool,
        /// Remove the XMP section
        #[arg(long)]
        xmp: bool,
    },
    /// Resize so the longest edge fits a maximum, keeping metadata
    Resize {
        /// Image file to transform
        path: PathBuf,
        /// Maximum edge length in pixels
        #[arg(long, value_name = "PIXELS")]
        max_dim: u32,
    },
    /// Crop to a pixel rectangle, keeping metadata
    Crop {
        /// Image file to transform
        path: PathBuf,
        #[arg(long)]
        x: u32,
        #[arg(long)]
        y: u32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
    /// Rotate by a quarter turn, keeping metadata
    Rotate {
        /// Image file to transform
        path: PathBuf,
        /// Degrees clockwise: 90, 180, or 270
        #[arg(long)]
        degrees: u16,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    if matches!(cli.command, Command::Init) {
        let config = Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if cli.backup {
        config.output.backup_originals = true;
    }
    if config.output.dry_run {
        log::info!("DRY RUN — no files will be modified");
    }

    match cli.command {
        Command::Init => unreachable!("handled above"),
        Command::Show { path, json } => show(&path, json),
        Command::Set { path, title, caption, keywords, byline, credit, rating, xmp } => {
            let mut editor = open_editor(&path)?;
            if let Some(ref title) = title {
                editor.set_title(title)?;
            }
            if let Some(ref caption) = caption {
                editor.set_caption(caption)?;
            }
            if !keywords.is_empty() {
                editor.set_keywords(keywords.clone())?;
            }
            if !byline.is_empty() {
                editor.set_byline(byline)?;
            }
            if let Some(ref credit) = credit {
                editor.set_credit(credit)?;
            }
            if let Some(rating) = rating {
                editor.set_xmp_rating(rating)?;
            }
            if xmp {
                if let Some(ref title) = title {
                    editor.set_xmp_title(title);
                }
                if let Some(ref caption) = caption {
                    editor.set_xmp_description(caption);
                }
                if !keywords.is_empty() {
                    editor.set_xmp_keywords(&keywords);
                }
            }
            finish(editor, &path, &config)
        }
        Command::Copy { path, from, exif, iptc, xmp } => {
            let sections = if exif || iptc || xmp {
                CopySections { exif, iptc, xmp }
            } else {
                CopySections::all()
            };
            let source = std::fs::read(&from)
                .with_context(|| format!("Failed to read {}", from.display()))?;
            let mut editor = open_editor(&path)?;
            editor.copy_metadata(&source, sections)?;
            finish(editor, &path, &config)
        }
        Command::Clear { path, exif, iptc, xmp } => {
            let mut editor = open_editor(&path)?;
            if exif || iptc || xmp {
                if exif {
                    editor.drop_exif();
                }
                if iptc {
                    editor.drop_iptc();
                }
                if xmp {
                    editor.drop_xmp();
                }
            } else {
                editor.drop_all();
            }
            finish(editor, &path, &config)
        }
        Command::Resize { path, max_dim } => {
            let bytes = read_image(&path)?;
            let out = transform::resize(&bytes, max_dim, config.jpeg_quality)?;
            write_output(&path, &out, &config)
        }
        Command::Crop { path, x, y, width, height } => {
            let bytes = read_image(&path)?;
            let out = transform::crop(&bytes, x, y, width, height, config.jpeg_quality)?;
            write_output(&path, &out, &config)
        }
        Command::Rotate { path, degrees } => {
            let rotation = match degrees {
                90 => Rotation::Cw90,
                180 => Rotation::Cw180,
                270 => Rotation::Cw270,
                other => anyhow::bail!("Unsupported rotation: {other}° (use 90, 180, or 270)"),
            };
            let bytes = read_image(&path)?;
            let out = transform::rotate(&bytes, rotation, config.jpeg_quality)?;
            write_output(&path, &out, &config)
        }
    }
}

fn show(path: &Path, json: bool) -> Result<()> {
    let summary = read_summary(path, TagDescriptorTable::iim())
        .with_context(|| format!("Failed to read metadata from {}", path.display()))?;

    if json {
        let value = serde_json::json!({
            "path": path.display().to_string(),
            "title": summary.title,
            "description": summary.description,
            "keywords": summary.keywords,
            "byline": summary.byline,
            "city": summary.city,
            "credit": summary.credit,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", path.display());
    println!("  Title:       {}", summary.title.as_deref().unwrap_or("-"));
    println!("  Description: {}", summary.description.as_deref().unwrap_or("-"));
    println!("  Keywords:    {}", join_or_dash(&summary.keywords));
    println!("  By-line:     {}", join_or_dash(&summary.byline));
    println!("  City:        {}", summary.city.as_deref().unwrap_or("-"));
    println!("  Credit:      {}", summary.credit.as_deref().unwrap_or("-"));
    Ok(())
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn open_editor(path: &Path) -> Result<MetadataEditor> {
    let bytes = read_image(path)?;
    MetadataEditor::from_bytes(bytes, TagDescriptorTable::iim())
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn finish(mut editor: MetadataEditor, path: &Path, config: &Config) -> Result<()> {
    let bytes = editor.bytes()?;
    write_output(path, &bytes, config)
}

fn write_output(path: &Path, bytes: &[u8], config: &Config) -> Result<()> {
    if config.output.dry_run {
        log::info!("Would write {} bytes to {}", bytes.len(), path.display());
        return Ok(());
    }
    if config.output.backup_originals {
        let backup = path.with_extension("jpg.bak");
        std::fs::copy(path, &backup)
            .with_context(|| format!("Failed to back up to {}", backup.display()))?;
        log::debug!("Backup written to {}", backup.display());
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}
