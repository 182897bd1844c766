//! pdfblocks CLI - block classification for PDF text fragments

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use pdfblocks::{
    load_document, load_options, DocumentInput, DocumentLayout, JsonFormat, LayoutEngine, LayoutOptions, PageInput,
};

#[derive(Parser)]
#[command(name = "pdfblocks")]
#[command(version)]
#[command(about = "Classify positioned PDF text fragments into blocks in reading order", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a fragment dump and write the layout as JSON
    Analyze {
        /// Input fragment dump (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Show the typography profile of a fragment dump
    Profile {
        /// Input fragment dump (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show per-page block counts
    Summary {
        /// Input fragment dump (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Show version information
    Version,
}

/// Layout options shared by the analyzing commands.
#[derive(Args, Debug, Default)]
struct LayoutArgs {
    /// Layout options file (JSON); flags below override it
    #[arg(long, value_name = "FILE", env = "PDFBLOCKS_CONFIG")]
    config: Option<PathBuf>,

    /// Minimum font size ratio to body text for headings
    #[arg(long, value_name = "RATIO")]
    heading_ratio: Option<f32>,

    /// Maximum caption distance from its figure or table (points)
    #[arg(long, value_name = "POINTS")]
    caption_proximity: Option<f32>,

    /// Minimum classifier confidence (0-1)
    #[arg(long, value_name = "CONFIDENCE")]
    min_confidence: Option<f32>,

    /// Disable table detection
    #[arg(long)]
    no_tables: bool,

    /// Analyze pages one at a time
    #[arg(long)]
    sequential: bool,
}

impl LayoutArgs {
    fn to_options(&self) -> pdfblocks::Result<LayoutOptions> {
        let mut options = match &self.config {
            Some(path) => load_options(path)?,
            None => LayoutOptions::default(),
        };

        if let Some(ratio) = self.heading_ratio {
            options = options.with_heading_font_ratio(ratio);
        }
        if let Some(points) = self.caption_proximity {
            options = options.with_caption_proximity(points);
        }
        if let Some(confidence) = self.min_confidence {
            options = options.with_min_confidence(confidence);
        }
        if self.no_tables {
            options = options.with_tables(false);
        }
        if self.sequential {
            options = options.sequential();
        }

        options.validate()?;
        Ok(options)
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Analyze {
            input,
            output,
            compact,
            layout,
        }) => cmd_analyze(&input, output.as_deref(), compact, &layout),
        Some(Commands::Profile { input }) => cmd_profile(&input),
        Some(Commands::Summary { input, layout }) => cmd_summary(&input, &layout),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: pdfblocks analyze <FILE>".yellow());
            println!("       pdfblocks --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Analyze every page, reporting progress on stderr.
fn run_layout(doc: &DocumentInput, options: LayoutOptions) -> Result<DocumentLayout, Box<dyn std::error::Error>> {
    let parallel = options.parallel;
    let engine = LayoutEngine::new(options)?;
    let typography = engine.profile(doc);

    let pb = ProgressBar::new(doc.page_count() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("Analyzing pages...");

    let analyze = |page: &PageInput| {
        let layout = engine.analyze_page(page, &typography);
        pb.inc(1);
        layout
    };
    let pages = if parallel {
        doc.pages.par_iter().map(analyze).collect()
    } else {
        doc.pages.iter().map(analyze).collect()
    };

    pb.finish_and_clear();
    log::info!("analyzed {} pages", doc.page_count());
    Ok(DocumentLayout { typography, pages })
}

fn cmd_analyze(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
    args: &LayoutArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.to_options()?;
    let doc = load_document(input)?;
    let layout = run_layout(&doc, options)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let json = pdfblocks::render::to_json(&layout, format)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_profile(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_document(input)?;
    let typography = LayoutEngine::default().profile(&doc);

    println!("{}", "Typography Profile".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Pages".bold(), doc.page_count());
    println!("{}: {}", "Fragments".bold(), typography.fragment_count);
    println!("{}: {}", "Characters".bold(), typography.char_count);
    println!("{}: {:.1}pt", "Body size".bold(), typography.body_font_size);

    println!();
    println!("{}", "Size Clusters".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{:>7.1}pt  {}", typography.body_font_size, "body".dimmed());
    for cluster in &typography.size_clusters {
        println!("{:>7.1}pt  H{}  ({} chars)", cluster.size, cluster.level, cluster.count);
    }

    Ok(())
}

fn cmd_summary(input: &Path, args: &LayoutArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.to_options()?;
    let doc = load_document(input)?;
    let layout = run_layout(&doc, options)?;

    println!("{}", "Layout Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!(
        "{}: {:.1}pt",
        "Body size".bold(),
        layout.typography.body_font_size
    );

    for page in &layout.pages {
        println!();
        println!(
            "{} {} ({} columns, {} blocks)",
            "Page".bold(),
            page.page_index,
            page.columns.len(),
            page.block_count()
        );
        for (kind, count) in kind_counts(&layout, page.page_index) {
            println!("  {} {:<12} {}", "├─".dimmed(), kind, count);
        }
        if !page.warnings.is_empty() {
            println!(
                "  {} {}",
                "└─".dimmed(),
                format!("{} warnings", page.warnings.len()).yellow()
            );
        }
    }

    Ok(())
}

/// Block counts by kind for one page, attachments included.
fn kind_counts(layout: &DocumentLayout, page_index: usize) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    if let Some(page) = layout.pages.iter().find(|p| p.page_index == page_index) {
        for block in page.all_blocks() {
            *counts.entry(block.kind.name()).or_insert(0) += 1;
        }
    }
    counts
}

fn cmd_version() {
    println!("{} {}", "pdfblocks".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Block classification and reading order for PDF text fragments");
    println!();
    println!("License: MIT");
}
