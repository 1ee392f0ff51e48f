//! Configuration settings for TreeFind
//!
//! Search configurations are plain serde values that can be loaded from
//! JSON, built in code, or derived from CLI arguments. They are consumed by
//! the finder builders and frozen when a search starts.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default directory-queue capacity
pub const DEFAULT_DIRECTORY_CAPACITY: usize = 1024;

/// Default file-queue capacity
pub const DEFAULT_FILE_CAPACITY: usize = 4096;

/// Default interval between poll callback invocations
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Order in which a directory walk publishes parents and children
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TraversalOrder {
    /// Publish a directory before visiting its children
    #[default]
    RootFirst,
    /// Publish a directory after all of its children
    DeepestFirst,
}

/// Configuration for a directory-only search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySearchConfig {
    /// Base directory; must exist when the search starts
    pub base: PathBuf,
    /// Directory name mask (glob, `;`-separated), `None` for all
    pub mask: Option<String>,
    /// Publish order
    pub order: TraversalOrder,
    /// Queue capacity (0 = unbounded)
    pub capacity: usize,
    /// Follow symbolic links
    pub follow_links: bool,
    /// Include entries whose name starts with a dot
    pub include_hidden: bool,
    /// Interval between poll callback invocations in `get_next`
    pub poll_interval_ms: u64,
}

impl Default for DirectorySearchConfig {
    fn default() -> Self {
        Self {
            base: PathBuf::from("."),
            mask: None,
            order: TraversalOrder::RootFirst,
            capacity: DEFAULT_DIRECTORY_CAPACITY,
            follow_links: false,
            include_hidden: true,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl DirectorySearchConfig {
    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Configuration for a file search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSearchConfig {
    /// Base directory; must exist when the search starts
    pub base: PathBuf,
    /// File name mask (glob, `;`-separated), `None` for all
    pub file_mask: Option<String>,
    /// Directory name mask; directories it rejects are not descended
    pub directory_mask: Option<String>,
    /// Capacity of the internal directory queue (0 = unbounded)
    pub directory_capacity: usize,
    /// Capacity of the file queue (0 = unbounded)
    pub file_capacity: usize,
    /// Follow symbolic links
    pub follow_links: bool,
    /// Include entries whose name starts with a dot
    pub include_hidden: bool,
    /// Extension allow-list (empty = all)
    pub extensions: Vec<String>,
    /// Minimum file size in bytes
    pub min_size: Option<u64>,
    /// Maximum file size in bytes
    pub max_size: Option<u64>,
    /// Interval between poll callback invocations in `get_next`
    pub poll_interval_ms: u64,
}

impl Default for FileSearchConfig {
    fn default() -> Self {
        Self {
            base: PathBuf::from("."),
            file_mask: None,
            directory_mask: None,
            directory_capacity: DEFAULT_DIRECTORY_CAPACITY,
            file_capacity: DEFAULT_FILE_CAPACITY,
            follow_links: false,
            include_hidden: true,
            extensions: Vec::new(),
            min_size: None,
            max_size: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl FileSearchConfig {
    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// TreeFind - background directory and file finder
#[derive(Parser, Debug, Clone)]
#[command(name = "treefind")]
#[command(author = "TreeFind Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find directories and files on background threads")]
#[command(long_about = r#"
TreeFind walks a directory tree on background threads and streams results
through bounded queues, so output starts before the walk is finished.

Examples:
  treefind dirs /data                          # All subdirectories
  treefind dirs /data --order deepest-first    # Children before parents
  treefind files /src --mask '*.rs;*.toml'     # Matching files
  treefind files /logs --min-size 10M --format json
"#)]
pub struct CliArgs {
    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress the summary line)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// JSON search configuration to start from; flags override it
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "plain", global = true)]
    pub format: OutputFormat,

    /// Show a progress spinner on stderr
    #[arg(short = 'p', long, global = true)]
    pub progress: bool,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List subdirectories
    #[command(name = "dirs")]
    Dirs(DirsArgs),

    /// List files
    #[command(name = "files")]
    Files(FilesArgs),
}

/// Arguments shared by both subcommands
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Base directory
    #[arg(value_name = "BASE")]
    pub base: PathBuf,

    /// Follow symbolic links
    #[arg(short = 'L', long)]
    pub follow_links: bool,

    /// Skip entries whose name starts with a dot
    #[arg(long)]
    pub no_hidden: bool,

    /// How often the progress spinner refreshes while waiting (e.g. 100ms)
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub poll_interval: Option<Duration>,
}

/// Arguments for `treefind dirs`
#[derive(Args, Debug, Clone)]
pub struct DirsArgs {
    /// Common arguments
    #[command(flatten)]
    pub common: CommonArgs,

    /// Directory name mask (e.g. 'src*;lib*')
    #[arg(short = 'm', long, value_name = "GLOB")]
    pub mask: Option<String>,

    /// Publish order
    #[arg(long, value_enum)]
    pub order: Option<TraversalOrder>,

    /// Queue capacity (0 = unbounded)
    #[arg(long, value_name = "NUM")]
    pub capacity: Option<usize>,
}

/// Arguments for `treefind files`
#[derive(Args, Debug, Clone)]
pub struct FilesArgs {
    /// Common arguments
    #[command(flatten)]
    pub common: CommonArgs,

    /// File name mask (e.g. '*.rs;*.toml')
    #[arg(short = 'm', long, value_name = "GLOB")]
    pub mask: Option<String>,

    /// Directory name mask; non-matching directories are not descended
    #[arg(long, value_name = "GLOB")]
    pub dir_mask: Option<String>,

    /// Only files with these extensions (repeatable)
    #[arg(short = 'e', long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Minimum file size (e.g. 1K)
    #[arg(long, value_name = "SIZE")]
    pub min_size: Option<String>,

    /// Maximum file size (e.g. 1G)
    #[arg(long, value_name = "SIZE")]
    pub max_size: Option<String>,

    /// Directory-queue capacity (0 = unbounded)
    #[arg(long, value_name = "NUM")]
    pub dir_capacity: Option<usize>,

    /// File-queue capacity (0 = unbounded)
    #[arg(long, value_name = "NUM")]
    pub capacity: Option<usize>,
}

/// Output format for results
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One path per line
    #[default]
    Plain,
    /// One JSON object per line
    Json,
}

/// Format of log lines written to stderr
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Parse human-readable size string to bytes
pub fn parse_size(size: &str) -> Result<u64, String> {
    let size = size.trim().to_uppercase();

    if size.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (num_str, multiplier) = if size.ends_with("TB") || size.ends_with('T') {
        (size.trim_end_matches(|c| c == 'T' || c == 'B'), 1024u64 * 1024 * 1024 * 1024)
    } else if size.ends_with("GB") || size.ends_with('G') {
        (size.trim_end_matches(|c| c == 'G' || c == 'B'), 1024u64 * 1024 * 1024)
    } else if size.ends_with("MB") || size.ends_with('M') {
        (size.trim_end_matches(|c| c == 'M' || c == 'B'), 1024u64 * 1024)
    } else if size.ends_with("KB") || size.ends_with('K') {
        (size.trim_end_matches(|c| c == 'K' || c == 'B'), 1024u64)
    } else {
        (size.trim_end_matches('B'), 1u64)
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: {}", num_str))?;

    if num < 0.0 {
        return Err(format!("Negative size: {}", num_str));
    }

    Ok((num * multiplier as f64) as u64)
}

impl CommonArgs {
    fn poll_interval_ms(&self) -> Option<u64> {
        self.poll_interval.map(|d| d.as_millis().max(1) as u64)
    }
}

impl DirsArgs {
    /// Apply CLI overrides on top of `config`
    pub fn apply(&self, mut config: DirectorySearchConfig) -> DirectorySearchConfig {
        config.base = self.common.base.clone();
        if self.common.follow_links {
            config.follow_links = true;
        }
        if self.common.no_hidden {
            config.include_hidden = false;
        }
        if let Some(ms) = self.common.poll_interval_ms() {
            config.poll_interval_ms = ms;
        }
        if let Some(mask) = &self.mask {
            config.mask = Some(mask.clone());
        }
        if let Some(order) = self.order {
            config.order = order;
        }
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        config
    }
}

impl FilesArgs {
    /// Apply CLI overrides on top of `config`
    pub fn apply(&self, mut config: FileSearchConfig) -> Result<FileSearchConfig, String> {
        config.base = self.common.base.clone();
        if self.common.follow_links {
            config.follow_links = true;
        }
        if self.common.no_hidden {
            config.include_hidden = false;
        }
        if let Some(ms) = self.common.poll_interval_ms() {
            config.poll_interval_ms = ms;
        }
        if let Some(mask) = &self.mask {
            config.file_mask = Some(mask.clone());
        }
        if let Some(mask) = &self.dir_mask {
            config.directory_mask = Some(mask.clone());
        }
        if !self.extensions.is_empty() {
            config.extensions = self.extensions.clone();
        }
        if let Some(size) = &self.min_size {
            config.min_size = Some(parse_size(size).map_err(|e| format!("Invalid min size: {}", e))?);
        }
        if let Some(size) = &self.max_size {
            config.max_size = Some(parse_size(size).map_err(|e| format!("Invalid max size: {}", e))?);
        }
        if let Some(capacity) = self.dir_capacity {
            config.directory_capacity = capacity;
        }
        if let Some(capacity) = self.capacity {
            config.file_capacity = capacity;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("1K").unwrap(), 1024);
        assert_eq!(parse_size("1KB").unwrap(), 1024);
        assert_eq!(parse_size("1M").unwrap(), 1024 * 1024);
        assert_eq!(parse_size("1.5G").unwrap(), (1.5 * 1024.0 * 1024.0 * 1024.0) as u64);
        assert_eq!(parse_size("12b").unwrap(), 12);
        assert!(parse_size("").is_err());
        assert!(parse_size("lots").is_err());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: FileSearchConfig =
            serde_json::from_str(r#"{"base": "/srv", "file_mask": "*.txt", "file_capacity": 8}"#).unwrap();
        assert_eq!(config.base, PathBuf::from("/srv"));
        assert_eq!(config.file_mask.as_deref(), Some("*.txt"));
        assert_eq!(config.file_capacity, 8);
        assert_eq!(config.directory_capacity, DEFAULT_DIRECTORY_CAPACITY);
    }

    #[test]
    fn test_traversal_order_serde() {
        let config: DirectorySearchConfig = serde_json::from_str(r#"{"order": "deepest-first"}"#).unwrap();
        assert_eq!(config.order, TraversalOrder::DeepestFirst);
        assert!(config.include_hidden);
    }

    #[test]
    fn test_cli_overrides() {
        let args = CliArgs::parse_from([
            "treefind", "files", "/logs", "--mask", "*.log", "--min-size", "1K", "--capacity", "16",
            "--no-hidden", "--poll-interval", "250ms",
        ]);
        let Commands::Files(files) = args.command else {
            panic!("expected files subcommand");
        };
        let config = files.apply(FileSearchConfig::default()).unwrap();
        assert_eq!(config.base, PathBuf::from("/logs"));
        assert_eq!(config.file_mask.as_deref(), Some("*.log"));
        assert_eq!(config.min_size, Some(1024));
        assert_eq!(config.file_capacity, 16);
        assert!(!config.include_hidden);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_dirs_cli_order() {
        let args = CliArgs::parse_from(["treefind", "dirs", "/data", "--order", "deepest-first"]);
        let Commands::Dirs(dirs) = args.command else {
            panic!("expected dirs subcommand");
        };
        let config = dirs.apply(DirectorySearchConfig::default());
        assert_eq!(config.order, TraversalOrder::DeepestFirst);
        assert_eq!(config.capacity, DEFAULT_DIRECTORY_CAPACITY);
    }

    #[test]
    fn test_log_format_flag() {
        let args = CliArgs::parse_from(["treefind", "dirs", "/data"]);
        assert_eq!(args.log_format, LogFormat::Text);

        let args = CliArgs::parse_from(["treefind", "files", "/data", "--log-format", "json"]);
        assert_eq!(args.log_format, LogFormat::Json);
    }
}
