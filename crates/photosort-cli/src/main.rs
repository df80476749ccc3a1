use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use photosort_core::{sort_media, SortOptions};

#[derive(Parser)]
#[command(
    name = "photosort",
    version,
    about = "Sort unsorted media into a dated, deduplicated archive tree"
)]
struct Cli {
    /// Source directory of unsorted media
    #[arg(default_value = "unsorted_photos")]
    source: PathBuf,

    /// Destination root for the sorted tree
    #[arg(short, long, default_value = "sorted_photos")]
    output: PathBuf,

    /// JPEG quality for HEIC/HEIF re-encodes (1-100)
    #[arg(long, default_value_t = 95)]
    jpeg_quality: u8,

    /// Keep converted HEIC originals under converted_originals/ instead of deleting them
    #[arg(long)]
    keep_originals: bool,

    /// Leave empty directories under the source root in place
    #[arg(long)]
    no_prune: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .context("could not initialize logger")?;

    let options = SortOptions {
        source: cli.source,
        dest: cli.output,
        jpeg_quality: cli.jpeg_quality,
        keep_originals: cli.keep_originals,
        prune_empty_dirs: !cli.no_prune,
    };

    let t_total = std::time::Instant::now();

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} {msg}")
            .context("bad progress template")?,
    );
    let progress_bar = bar.clone();
    let on_progress = move |stage: &str, current: u64, total: u64, message: &str| {
        if progress_bar.length() != Some(total) {
            progress_bar.set_length(total);
        }
        progress_bar.set_position(current + 1);
        progress_bar.set_message(format!("{stage}: {message}"));
    };

    let result = sort_media(&options, &on_progress);
    bar.finish_and_clear();
    let summary = result?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        eprintln!(
            "Done! {} moved, {} converted, {} duplicates deleted, {} non-media deleted, {} errors, {} skipped ({:.2}s)",
            summary.moved,
            summary.converted,
            summary.duplicates_deleted,
            summary.non_media_deleted,
            summary.errors,
            summary.skipped,
            t_total.elapsed().as_secs_f64()
        );
        if summary.left_in_place > 0 {
            eprintln!(
                "WARNING: {} file(s) could not be remediated and remain in the source tree",
                summary.left_in_place
            );
        }
    }

    Ok(())
}
