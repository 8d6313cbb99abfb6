use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use reclaim::{DedupPolicy, Kind, RecoveryMode, ScanOptions, ScanProgress};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reclaim")]
#[command(author, version)]
#[command(about = "Find, check, repair and copy recoverable files", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of a table
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Catalog manifest to enumerate (repeatable)
    #[arg(short, long = "catalog")]
    pub catalogs: Vec<PathBuf>,

    /// Directory tree to walk (repeatable)
    #[arg(short, long = "tree")]
    pub trees: Vec<PathBuf>,

    /// Leave trashed records out
    #[arg(long)]
    pub no_trash: bool,

    /// Only keep these kinds (image, video, audio, document, archive, other)
    #[arg(short, long, value_delimiter = ',')]
    pub kinds: Option<Vec<String>>,

    #[arg(long, value_enum, default_value_t = DedupArg::NameSize)]
    pub dedup: DedupArg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DedupArg {
    /// Collapse records with the same display name and size
    NameSize,
    /// Collapse only records with the same handle
    Handle,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    Copy,
    Repair,
}

impl From<ModeArg> for RecoveryMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Copy => RecoveryMode::Copy,
            ModeArg::Repair => RecoveryMode::Repair,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every recoverable item
    Scan {
        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Probe every item for structural damage
    Check {
        #[command(flatten)]
        sources: SourceArgs,

        /// Only print damaged items
        #[arg(long)]
        damaged_only: bool,
    },

    /// Copy or repair items into an output directory
    Recover {
        #[command(flatten)]
        sources: SourceArgs,

        #[arg(short, long, default_value = "./recovered")]
        output: PathBuf,

        #[arg(short, long, value_enum, default_value_t = ModeArg::Copy)]
        mode: ModeArg,

        /// Check first and only recover damaged items
        #[arg(long)]
        damaged_only: bool,

        /// Write the recovery report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Clear the trash flag on catalog records
    Untrash {
        #[arg(short, long)]
        catalog: PathBuf,

        /// Paths of the records to restore
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

pub fn parse_kinds(kinds: Option<&[String]>) -> Vec<Kind> {
    match kinds {
        None => vec![],
        Some(names) => names
            .iter()
            .filter_map(|s| {
                let wanted = s.trim().to_lowercase();
                let kind = Kind::ALL.into_iter().find(|k| k.name() == wanted);
                if kind.is_none() {
                    eprintln!("Warning: Unknown kind '{}'", s);
                }
                kind
            })
            .collect(),
    }
}

impl SourceArgs {
    pub fn scan_options(&self) -> ScanOptions {
        let mut options = ScanOptions::default()
            .with_kinds(parse_kinds(self.kinds.as_deref()))
            .with_dedup(match self.dedup {
                DedupArg::NameSize => DedupPolicy::NameAndSize,
                DedupArg::Handle => DedupPolicy::Handle,
            });
        if self.no_trash {
            options = options.without_trash();
        }
        options
    }
}

pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    fn with_template(total: u64, template: &str, message: &str) -> Self {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar.set_message(message.to_string());
        Self { bar }
    }

    pub fn for_scan() -> Self {
        Self::with_template(
            0,
            "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} records",
            "Enumerating sources...",
        )
    }

    pub fn for_check(total: u64) -> Self {
        Self::with_template(
            total,
            "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} items ({eta})",
            "Checking items...",
        )
    }

    pub fn for_recovery(total: u64) -> Self {
        Self::with_template(
            total,
            "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} files ({eta})",
            "Recovering files...",
        )
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn update_scan(&self, progress: &ScanProgress) {
        self.bar.set_length(progress.expected);
        self.bar.set_position(progress.processed);
        if !progress.exact {
            self.bar.set_message(format!("Enumerating sources... {:.0}% (estimated)", progress.percent()));
        }
    }

    pub fn set_position(&self, position: u64) {
        self.bar.set_position(position);
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}
