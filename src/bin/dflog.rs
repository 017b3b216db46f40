use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use dflog::{binary, merger, serializer, text};

/// dflog merges a donor DataFlash log's tables into a base log, reconciling
/// type-IDs and timestamps, and writes the result in canonical sorted text form.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Opts {
    /// Output file path for the merged, serialized log.
    output: PathBuf,

    /// Base (receiver) log file path.
    base: PathBuf,

    /// Additional donor log file paths, merged in order given.
    #[clap(long = "files", num_args = 0..)]
    files: Vec<PathBuf>,

    /// Table names to drop from each donor before merging.
    #[clap(long = "drop", num_args = 0..)]
    drop: Vec<String>,

    /// Fixed time shift in seconds applied instead of GPS-based alignment.
    #[clap(long = "time-shift")]
    time_shift: Option<f64>,

    /// Log file merged first, with its time shift auto-derived from current-draw
    /// spikes; the derived shift is then reused (added to `--time-shift`) for
    /// every subsequent `--files` donor.
    #[clap(long = "auto-shift")]
    auto_shift: Option<PathBuf>,

    /// File listing table names that may be dropped to free a type-ID during merge.
    #[clap(long = "droppable-file")]
    droppable_file: Option<PathBuf>,

    /// Raise the log level from `warn` to `info`.
    #[clap(short, long)]
    verbose: bool,
}

fn open_log(path: &PathBuf) -> Result<dflog::Log, dflog::DflogError> {
    let is_text = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("log"))
        .unwrap_or(false);
    let file = File::open(path)?;
    if is_text {
        text::parse_text_log(file)
    } else {
        binary::parse_binary_log(file)
    }
}

fn main() {
    let opts: Opts = Opts::parse();

    if opts.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::init();
    }

    if let Err(e) = run(opts) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run(opts: Opts) -> Result<(), dflog::DflogError> {
    let mut log = open_log(&opts.base)?;

    if let Some(droppable_path) = &opts.droppable_file {
        let contents = std::fs::read_to_string(droppable_path)?;
        log.load_droppable_tables(&contents);
    }

    let mut ts = opts.time_shift.unwrap_or(0.0);

    if let Some(auto_shift_path) = &opts.auto_shift {
        let auto_donor = open_log(auto_shift_path)?;
        ts += dflog::aligner::find_offset(&log, &auto_donor);
        merger::merge(&mut log, auto_donor, &opts.drop, ts, false);
    }

    for donor_path in &opts.files {
        let donor = open_log(donor_path)?;
        merger::merge(&mut log, donor, &opts.drop, ts, true);
    }

    serializer::write_to_file(&log, &opts.output)?;
    log::info!("wrote merged log to {}", opts.output.display());
    Ok(())
}
