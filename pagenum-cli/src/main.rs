//! pagenum CLI - stamp page numbers onto a PDF

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::Parser;
use log::debug;

use pagenum_core::{
    Anchor, Margins, NumberFont, Numberer, NumberingSpec, PageSize,
    PlacementSpec, SourceDocument,
};
use pagenum_core::geometry::CM;

#[derive(Parser)]
#[command(name = "pagenum")]
#[command(version)]
#[command(about = "Add sequential page numbers to a PDF", long_about = None)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file (defaults to <input>_numbered.pdf)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// TrueType font file for the numerals
    #[arg(long, value_name = "FILE")]
    font: PathBuf,

    /// Page margins in cm: top,right,bottom,left
    #[arg(long, value_parser = parse_margins, default_value = "2.5,2.5,2.5,3.0")]
    margins: Margins,

    /// Distance from the anchored edge to the number, in cm
    #[arg(long, value_name = "CM", default_value_t = 1.75)]
    band_height: f64,

    /// Where to place the number: top, bottom, left, right, auto
    #[arg(long, value_parser = Anchor::from_str, default_value = "auto")]
    position: Anchor,

    /// Nominal page size for the number overlay: A0-A4
    #[arg(long, value_parser = PageSize::from_str, default_value = "a4")]
    page_size: PageSize,

    /// First page number
    #[arg(long, value_name = "N", default_value_t = 1)]
    start: u32,

    /// Font size in points
    #[arg(long, value_name = "PT", default_value_t = 10.5)]
    font_size: f64,

    /// Set the output document's title
    #[arg(long, value_name = "TEXT")]
    title: Option<String>,

    /// Write streams uncompressed
    #[arg(long)]
    no_compress: bool,

    /// Overwrite the output file if it already exists
    #[arg(short, long)]
    force: bool,
}

fn parse_margins(s: &str) -> Result<Margins, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err("expected four values: top,right,bottom,left".to_string());
    }
    let mut cm = [0.0f64; 4];
    for (i, part) in parts.iter().enumerate() {
        cm[i] = part
            .parse()
            .map_err(|_| format!("invalid margin '{}'", part))?;
    }
    Ok(Margins::from_cm(cm[0], cm[1], cm[2], cm[3]))
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{}_numbered.pdf", stem))
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output(&cli.input));
    if output.exists() && !cli.force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            output.display()
        )
        .into());
    }

    let font = NumberFont::load(&cli.font)?;
    let source = SourceDocument::open(&cli.input)?;
    debug!(
        "{}: PDF {}, {} pages",
        cli.input.display(),
        source.version(),
        source.page_count()
    );

    let mut numberer = Numberer::new(font)
        .margins(cli.margins)
        .placement(PlacementSpec {
            anchor: cli.position,
            band_height: cli.band_height * CM,
            font_size: cli.font_size,
        })
        .numbering(NumberingSpec {
            start_number: cli.start,
        })
        .page_size(cli.page_size)
        .set_compression(!cli.no_compress);
    if let Some(title) = &cli.title {
        numberer = numberer.set_title(title);
    }

    numberer.write_to_path(&source, &output)?;
    println!(
        "Numbered {} pages -> {}",
        source.page_count(),
        output.display()
    );
    Ok(())
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
