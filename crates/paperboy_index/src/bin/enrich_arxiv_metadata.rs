use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap_verbosity_flag::Verbosity;
use console::style;
use paperboy_index::{enrich_from_dump, DEFAULT_BATCH_SIZE};
use paperboy_manifest::PaperManifest;

/// Backfill arXiv paper metadata (title, authors, categories, ...) from
/// a Kaggle arXiv metadata dump into an existing manifest.
#[derive(Parser)]
#[command(name = "enrich-arxiv-metadata")]
#[command(about = "Backfill paper metadata from a Kaggle arxiv-metadata-oai-snapshot dump")]
struct Args {
    /// Path to `arxiv-metadata-oai-snapshot.json` or its `.zip`.
    metadata_path: PathBuf,

    /// Manifest database to update.
    #[arg(long)]
    db_path: PathBuf,

    /// Rows per transaction.
    #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    #[command(flatten)]
    verbosity: Verbosity,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.verbosity.tracing_level_filter())
        .init();

    if let Err(err) = run(args) {
        eprintln!("{} {err:#}", style("error:").red().bold());
        std::process::exit(1);
    }
    Ok(())
}

fn run(args: Args) -> anyhow::Result<()> {
    let manifest = PaperManifest::open(&args.db_path)
        .with_context(|| format!("opening manifest at {}", args.db_path.display()))?;

    let report = enrich_from_dump(&manifest, &args.metadata_path, args.batch_size, |processed, matched| {
        eprint!("\r  processed {processed} / matched {matched}");
    })?;
    eprintln!();

    println!(
        "{} {} lines read, {} matched, {} malformed",
        style("done:").green().bold(),
        report.total_lines,
        report.matched,
        report.malformed_lines
    );
    println!("\nField coverage:");
    for (column, count) in &report.coverage {
        let total = manifest.stats()?.entry_count;
        let pct = if total > 0 { 100.0 * *count as f64 / total as f64 } else { 0.0 };
        println!("  {column}: {count} / {total} ({pct:.1}%)");
    }

    Ok(())
}
