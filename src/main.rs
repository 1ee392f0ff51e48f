//! TreeFind CLI - background directory and file search

use anyhow::{Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use treefind::config::{CliArgs, Commands, DirsArgs, FilesArgs, LogFormat, OutputFormat};
use treefind::progress::SearchProgress;
use treefind::{DirectoryFinderBuilder, Entry, FileFinderBuilder, FindError, SearchStats};

fn main() {
    let args = CliArgs::parse();

    // Initialize logging
    let default_level = match (args.quiet, args.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    match args.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    let progress = Arc::new(if args.progress && !args.quiet {
        SearchProgress::new("searching")
    } else {
        SearchProgress::disabled()
    });

    let summary = match &args.command {
        Commands::Dirs(dirs) => cmd_dirs(dirs, &args, &progress)?,
        Commands::Files(files) => cmd_files(files, &args, &progress)?,
    };
    progress.finish();

    if !args.quiet {
        eprintln!(
            "{} in {} ({} directories read, {} errors)",
            summary.found,
            humantime::format_duration(round_to_millis(progress.elapsed())),
            summary.stats.directories_processed,
            summary.stats.errors
        );
    }

    Ok(())
}

struct Summary {
    found: String,
    stats: SearchStats,
}

fn cmd_dirs(dirs: &DirsArgs, args: &CliArgs, progress: &Arc<SearchProgress>) -> Result<Summary> {
    let config = dirs.apply(load_config(args.config.as_deref())?);
    let errors = Arc::clone(progress);

    let finder = DirectoryFinderBuilder::from_config(config)
        .on_error(move |_: &FindError| errors.increment_errors())
        .start()
        .with_context(|| format!("Cannot search {}", dirs.common.base.display()))?;

    let mut out = Output::new(args.format);
    let mut count = 0u64;
    loop {
        let mut tick = || progress.refresh(finder.progress());
        let Some(dir) = finder.get_next(Some(&mut tick)) else {
            break;
        };
        out.emit(&dir, dir.path())?;
        progress.increment_found();
        count += 1;
    }
    out.flush()?;

    Ok(Summary {
        found: format!("{} directories", count),
        stats: finder.stats(),
    })
}

fn cmd_files(files: &FilesArgs, args: &CliArgs, progress: &Arc<SearchProgress>) -> Result<Summary> {
    let config = files
        .apply(load_config(args.config.as_deref())?)
        .map_err(anyhow::Error::msg)?;
    let errors = Arc::clone(progress);

    let finder = FileFinderBuilder::from_config(config)
        .on_error(move |_: &FindError| errors.increment_errors())
        .start()
        .with_context(|| format!("Cannot search {}", files.common.base.display()))?;

    let mut out = Output::new(args.format);
    let mut count = 0u64;
    let mut total_bytes = 0u64;
    loop {
        let mut tick = || progress.refresh(finder.progress());
        let Some(file) = finder.get_next(Some(&mut tick)) else {
            break;
        };
        out.emit(&file, file.path())?;
        progress.increment_found();
        count += 1;
        total_bytes += file.size;
    }
    out.flush()?;

    Ok(Summary {
        found: format!(
            "{} files ({})",
            count,
            humansize::format_size(total_bytes, humansize::BINARY)
        ),
        stats: finder.stats(),
    })
}

/// Start from a JSON config file when one is given
fn load_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("Cannot read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn round_to_millis(d: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_millis(d.as_millis() as u64)
}

struct Output {
    format: OutputFormat,
    writer: BufWriter<io::Stdout>,
}

impl Output {
    fn new(format: OutputFormat) -> Self {
        Self {
            format,
            writer: BufWriter::new(io::stdout()),
        }
    }

    fn emit<T: Serialize>(&mut self, item: &T, path: &Path) -> Result<()> {
        match self.format {
            OutputFormat::Plain => writeln!(self.writer, "{}", path.display())?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.writer, item)?;
                writeln!(self.writer)?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
