use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap_verbosity_flag::Verbosity;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use paperboy_config::Config;
use paperboy_index::arxiv::index_arxiv_directory;
use paperboy_manifest::PaperManifest;

/// Index arXiv bulk `.tar` archives into the paper manifest.
#[derive(Parser)]
#[command(name = "index-arxiv")]
#[command(about = "Scan arXiv bulk .tar archives and populate the paper manifest")]
struct Args {
    /// Root directory of year subdirectories (e.g. `/data/arxiv/pdf`).
    root_dir: PathBuf,

    /// Manifest database path. Defaults to `INDEX_DB_PATH` from the
    /// environment.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Index a single `.tar` file instead of the whole tree: either an
    /// absolute path or a bare filename resolved under `<root>/<year>/`.
    #[arg(long)]
    single_file: Option<String>,

    /// Worker thread count. Defaults to `max(1, cpu_count - 1)`.
    #[arg(short, long)]
    workers: Option<usize>,

    #[command(flatten)]
    verbosity: Verbosity,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.verbosity.tracing_level_filter())
        .init();

    match run(args) {
        Ok(summary) => {
            println!(
                "{} {} indexed, {} skipped, {} failed, {} entries added",
                style("done:").green().bold(),
                summary.files_indexed,
                summary.files_skipped,
                summary.files_failed,
                summary.entries_added
            );
            if summary.files_failed > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("{} {err:#}", style("error:").red().bold());
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> anyhow::Result<paperboy_index::IndexSummary> {
    let config = Config::from_env().context("reading configuration from the environment")?;
    let db_path = args
        .db_path
        .or(config.index_db_path)
        .context("no manifest database path given: pass --db-path or set INDEX_DB_PATH")?;

    let manifest = PaperManifest::open(&db_path)
        .with_context(|| format!("opening manifest at {}", db_path.display()))?;
    let workers = args.workers.unwrap_or_else(paperboy_index::default_worker_count);

    if let Some(single_file) = &args.single_file {
        let summary = paperboy_index::arxiv::index_single_file(&manifest, single_file, &args.root_dir)?;
        manifest.checkpoint_wal().ok();
        return Ok(summary);
    }

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} files ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let summary = index_arxiv_directory(&manifest, &args.root_dir, workers, |progress| {
        if bar.length() != Some(progress.files_total as u64) {
            bar.set_length(progress.files_total as u64);
        }
        bar.set_position(progress.files_done as u64);
    })?;
    bar.finish_and_clear();

    manifest.checkpoint_wal().ok();
    Ok(summary)
}
