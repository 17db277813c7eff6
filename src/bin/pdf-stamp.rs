//! PDF Stamp CLI tool
//!
//! A command-line tool for stamping text watermarks onto selected PDF pages.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

use pdf_stamp::pdf::{extract_metadata, sample_document};
use pdf_stamp::watermark;

/// Stamps used by demo mode, as (page, text)
const DEMO_STAMPS: &[(usize, &str)] = &[
    (1, "CONFIDENTIAL"),
    (2, "DRAFT"),
    (4, "INTERNAL USE ONLY"),
];

/// PDF Stamp - Add diagonal text watermarks to selected PDF pages
#[derive(Parser)]
#[command(name = "pdf-stamp")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "CSV FORMAT:
    page,watermark_text
    1,CONFIDENTIAL
    3,DRAFT

EXAMPLES:
    # Stamp pages listed in a CSV file
    pdf-stamp stamp input.pdf --csv watermarks.csv -o output.pdf

    # Generate a sample document and stamp it
    pdf-stamp demo -o demo.pdf

    # Running without a subcommand also runs the demo
    pdf-stamp")]
struct Cli {
    /// Show debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stamp the pages listed in a CSV file
    Stamp {
        /// Input PDF file
        input: PathBuf,

        /// CSV file with `page,watermark_text` rows
        #[arg(long)]
        csv: PathBuf,

        /// Output PDF file path
        #[arg(short, long, default_value = "output.pdf")]
        output: PathBuf,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Generate a sample PDF in memory and stamp a few of its pages
    Demo {
        /// Output PDF file path
        #[arg(short, long, default_value = "output.pdf")]
        output: PathBuf,

        /// Number of pages in the sample document
        #[arg(long, default_value_t = 5)]
        pages: usize,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = cli.command.unwrap_or(Commands::Demo {
        output: PathBuf::from("output.pdf"),
        pages: 5,
        open: false,
    });

    let result = match command {
        Commands::Stamp { input, csv, output, open } => cmd_stamp(&input, &csv, &output, open),
        Commands::Demo { output, pages, open } => cmd_demo(&output, pages, open),
        Commands::Info { input } => cmd_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Open a file with the system default application
fn open_file(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(path).spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(path).spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

/// Stamp a PDF according to a CSV file
fn cmd_stamp(input: &Path, csv: &Path, output: &Path, open: bool) -> Result<()> {
    let pdf_file = File::open(input)
        .with_context(|| format!("opening PDF {}", input.display()))?;
    let csv_file = File::open(csv)
        .with_context(|| format!("opening CSV {}", csv.display()))?;

    // Render in memory so a failed run never leaves a truncated output file
    let mut stamped = Vec::new();
    watermark(&mut stamped, pdf_file, csv_file).context("watermarking failed")?;

    fs::write(output, &stamped)
        .with_context(|| format!("writing output {}", output.display()))?;

    println!("Done. Watermarked PDF written to {}", output.display());

    if open {
        open_file(output)?;
    }

    Ok(())
}

/// Stamp an in-memory sample document
fn cmd_demo(output: &Path, pages: usize, open: bool) -> Result<()> {
    println!("Running demo mode...");
    println!();

    let pdf = sample_document(pages).context("generating sample PDF")?;
    println!("  Generated a {}-page demo PDF ({} bytes)", pages, pdf.len());

    let stamps: Vec<(usize, &str)> = DEMO_STAMPS
        .iter()
        .copied()
        .filter(|(page, _)| *page <= pages)
        .collect();

    let mut csv = String::from("page,watermark_text\n");
    println!("  CSV watermarks:");
    for (page, text) in &stamps {
        csv.push_str(&format!("{},{}\n", page, text));
        println!("    Page {} -> {}", page, text);
    }
    let unstamped: Vec<String> = (1..=pages)
        .filter(|page| stamps.iter().all(|(stamped, _)| stamped != page))
        .map(|page| page.to_string())
        .collect();
    if !unstamped.is_empty() {
        println!("    Pages {} -> (no watermark)", unstamped.join(", "));
    }
    println!();

    let mut stamped = Vec::new();
    watermark(&mut stamped, pdf.as_slice(), csv.as_bytes()).context("watermarking failed")?;

    fs::write(output, &stamped)
        .with_context(|| format!("writing output {}", output.display()))?;

    println!("Done. Open {} to see the watermarked PDF.", output.display());

    if open {
        open_file(output)?;
    }

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: &Path) -> Result<()> {
    let data = fs::read(input)
        .with_context(|| format!("reading PDF {}", input.display()))?;
    let metadata = extract_metadata(&data)?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }

    Ok(())
}
