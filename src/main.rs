//! treeops - guarded bulk operations on directory trees.
//!
//! Usage:
//!   treeops list [PATH]                 List entries (depth, filters, sorting)
//!   treeops find [PATH]                 Same listing through the OS `find`
//!   treeops delete ROOT                 Delete matching entries
//!   treeops move SOURCE TARGET          Move matching entries
//!   treeops rename SOURCE TARGET        Rename one path
//!   treeops flatten ROOT                Pull every file up into ROOT
//!   treeops clean ROOT                  Remove empty directories
//!   treeops fix-names ROOT              Rename entries to portable names
//!   treeops sanitize NAME...            Print sanitized names
//!
//! Every mutating command accepts `--dry-run`.

mod settings;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use treeops_core::{
    Entry, EntryKind, ExecutionMode, MutationResult, ProtectionPolicy, SortDirection, SortKey,
    TraversalOptions,
};
use treeops_ops::{
    CleanOptions, DeleteOptions, FixNamesOptions, FlattenOptions, MoveOptions, RenameOptions,
    RenameOutcome, RenamePatternMode, TreeOps, sanitize,
};
use treeops_scan::Selection;

use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "treeops",
    version,
    about = "Guarded bulk operations on directory trees",
    long_about = "treeops lists, deletes, moves, renames, flattens and cleans directory \
                  trees.\n\nEvery mutation is checked against a protection policy first \
                  (system directories and a depth range), and can be previewed with \
                  --dry-run."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Report what would change without touching the disk
    #[arg(long, global = true)]
    dry_run: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Settings file (defaults to <config dir>/treeops/settings.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Shallowest path depth that may be mutated
    #[arg(long, global = true)]
    min_depth: Option<usize>,

    /// Deepest path depth that may be mutated
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Allow mutations under protected system directories
    #[arg(long, global = true)]
    allow_protected: bool,

    /// Protect an additional path (repeatable)
    #[arg(long = "protect", global = true, value_name = "PATH")]
    protect: Vec<PathBuf>,

    /// More logging (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// List a directory in-process
    List {
        /// Directory to list
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        listing: ListingArgs,
    },

    /// List a directory using the OS `find` utility (POSIX only)
    Find {
        /// Directory to list
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        listing: ListingArgs,
    },

    /// Delete entries whose names match
    Delete {
        /// Directory to delete from
        root: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Only select files with these extensions (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        ext: Vec<String>,

        /// Delete ROOT itself, with everything in it
        #[arg(long)]
        whole: bool,

        /// Delegate to `find` and `rm` (POSIX only)
        #[arg(long)]
        accelerated: bool,
    },

    /// Move entries whose names match into another directory
    Move {
        /// File or directory to move from
        source: PathBuf,

        /// Directory to move into
        target: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Move SOURCE itself into TARGET
        #[arg(long)]
        rename_only: bool,
    },

    /// Rename a single path
    Rename {
        /// Existing path
        source: PathBuf,

        /// New path
        target: PathBuf,

        /// Regex rewriting the target's file name
        #[arg(short, long)]
        pattern: Option<String>,

        /// Replacement for pattern matches ($1 expands groups)
        #[arg(short = 'R', long, default_value = "")]
        replacement: String,

        /// Apply the pattern to the source's file name instead
        #[arg(long)]
        on_source: bool,
    },

    /// Move every file below ROOT directly into ROOT
    Flatten {
        /// Directory to flatten
        root: PathBuf,
    },

    /// Remove empty directories below ROOT
    Clean {
        /// Directory to clean
        root: PathBuf,

        /// Only consider ROOT's immediate children
        #[arg(long)]
        shallow: bool,
    },

    /// Rename entries to portable names
    FixNames {
        /// Directory whose entries are renamed
        root: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Rename directories instead of files
        #[arg(short, long)]
        dirs: bool,
    },

    /// Print the sanitized form of names
    Sanitize {
        /// Names to sanitize
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Args)]
struct ListingArgs {
    /// Maximum depth (1-9)
    #[arg(short, long, default_value = "1")]
    depth: usize,

    /// Only list files
    #[arg(long, conflicts_with = "dirs_only")]
    files_only: bool,

    /// Only list directories
    #[arg(long)]
    dirs_only: bool,

    /// Hide directories that contain subdirectories
    #[arg(short, long)]
    leaf_only: bool,

    /// Only list files with these extensions (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    ext: Vec<String>,

    /// Keep names matching this regex
    #[arg(short, long)]
    include: Option<String>,

    /// Drop names matching this regex
    #[arg(short = 'x', long)]
    exclude: Option<String>,

    /// Sort key: name, mtime, type, size, depth, path, parent
    #[arg(short, long, default_value = "name")]
    sort: SortKey,

    /// Sort descending
    #[arg(long)]
    desc: bool,

    /// Keep at most this many entries
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Return only the first entry
    #[arg(long)]
    single: bool,
}

#[derive(Args)]
struct SelectionArgs {
    /// Regex matched against entry names (default: everything)
    #[arg(short, long)]
    pattern: Option<String>,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Leave files alone
    #[arg(long)]
    no_files: bool,

    /// Also select directories (taken whole)
    #[arg(long)]
    dirs: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::load(cli.config.as_deref())?;
    let policy = effective_policy(settings.policy, &cli);
    let ops = TreeOps::new(policy).with_mode(ExecutionMode::from_dry_run(cli.dry_run));
    let format = cli.format;

    match cli.command {
        Command::List { path, listing } => {
            let selection = ops
                .list_directory(listing.into_options(path)?)
                .await
                .context("Listing failed")?;
            print_selection(&selection, format)?;
        }
        Command::Find { path, listing } => {
            let selection = ops
                .find_files(listing.into_options(path)?)
                .await
                .context("find listing failed")?;
            print_selection(&selection, format)?;
        }
        Command::Delete {
            root,
            selection,
            ext,
            whole,
            accelerated,
        } => {
            let options = DeleteOptions {
                root,
                pattern: selection.pattern,
                extensions: ext,
                recursive: selection.recursive,
                include_files: !selection.no_files,
                include_subdirectories: selection.dirs,
                delete_root: whole,
            };
            let result = if accelerated {
                ops.delete_files_accelerated(options).await
            } else {
                ops.delete_files(options).await
            }
            .context("Delete failed")?;
            report(&result, "deleted", format)?;
        }
        Command::Move {
            source,
            target,
            selection,
            rename_only,
        } => {
            let options = MoveOptions {
                source,
                target,
                pattern: selection.pattern,
                recursive: selection.recursive,
                include_files: !selection.no_files,
                include_subdirectories: selection.dirs,
                rename_only,
            };
            let result = ops.move_files(options).await.context("Move failed")?;
            report(&result, "moved", format)?;
        }
        Command::Rename {
            source,
            target,
            pattern,
            replacement,
            on_source,
        } => {
            let options = RenameOptions {
                source,
                target,
                pattern,
                replacement,
                pattern_mode: if on_source {
                    RenamePatternMode::SourceName
                } else {
                    RenamePatternMode::TargetName
                },
            };
            let outcome = ops.rename(options).await.context("Rename failed")?;
            print_rename(&outcome, ops.mode, format)?;
        }
        Command::Flatten { root } => {
            let result = ops
                .flatten_directory(FlattenOptions::new(root))
                .await
                .context("Flatten failed")?;
            report(&result, "flattened", format)?;
        }
        Command::Clean { root, shallow } => {
            let options = CleanOptions {
                root,
                recursive: !shallow,
            };
            let result = ops
                .clean_empty_directories(options)
                .await
                .context("Clean failed")?;
            report(&result, "removed", format)?;
        }
        Command::FixNames {
            root,
            recursive,
            dirs,
        } => {
            let options = FixNamesOptions {
                root,
                recursive,
                directories_only: dirs,
            };
            let result = ops
                .fix_file_names(options)
                .await
                .context("Fixing names failed")?;
            report(&result, "renamed", format)?;
        }
        Command::Sanitize { names } => print_sanitized(&names, format)?,
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Settings file first, then command-line overrides.
fn effective_policy(mut policy: ProtectionPolicy, cli: &Cli) -> ProtectionPolicy {
    if let Some(min) = cli.min_depth {
        policy.min_depth = min;
    }
    if let Some(max) = cli.max_depth {
        policy.max_depth = max;
    }
    if cli.allow_protected {
        policy.allow_protected_directories = true;
    }
    for path in &cli.protect {
        policy = policy.protect(path.to_string_lossy());
    }
    policy
}

impl ListingArgs {
    fn into_options(self, root: PathBuf) -> Result<TraversalOptions> {
        TraversalOptions::builder()
            .root(root)
            .max_depth(self.depth)
            .include_files(!self.dirs_only)
            .include_directories(!self.files_only)
            .leaf_only(self.leaf_only)
            .extensions(self.ext)
            .include_pattern(self.include)
            .exclude_pattern(self.exclude)
            .sort_by(self.sort)
            .sort_direction(if self.desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            })
            .max_records(self.limit)
            .single_result(self.single)
            .build()
            .context("Invalid listing options")
    }
}

fn print_selection(selection: &Selection, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(selection)?);
        }
        OutputFormat::Text => {
            let entries: Vec<&Entry> = match selection {
                Selection::Many(entries) => entries.iter().collect(),
                Selection::Single(entry) if entry.is_placeholder() => Vec::new(),
                Selection::Single(entry) => vec![entry],
            };

            for entry in &entries {
                println!("{}", format_entry(entry));
            }
            eprintln!("{} entries", entries.len());
        }
    }
    Ok(())
}

fn format_entry(entry: &Entry) -> String {
    let size = match entry.kind {
        EntryKind::Directory => "-".to_string(),
        EntryKind::File => format_size(entry.size),
    };
    format!(
        "{} {:>10}  {}  {}",
        if entry.is_dir() { 'd' } else { 'f' },
        size,
        entry.mtime.format("%Y-%m-%d %H:%M"),
        entry.path
    )
}

/// Print a mutation result; fails when any entry failed.
fn report(result: &MutationResult, action: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        OutputFormat::Text => {
            for record in &result.records {
                match &record.error {
                    None if record.original_path == record.new_path => {
                        println!("{}", record.original_path.display())
                    }
                    None => println!(
                        "{} -> {}",
                        record.original_path.display(),
                        record.new_path.display()
                    ),
                    Some(err) => println!("FAILED {}: {}", record.original_path.display(), err),
                }
            }
            if result.records.is_empty() {
                for path in &result.affected {
                    println!("{}", path.display());
                }
            }
            eprintln!("{}", result.summary(action));
        }
    }

    if !result.is_success() {
        bail!("{} of {} entries failed", result.failed(), result.records.len());
    }
    Ok(())
}

fn print_rename(outcome: &RenameOutcome, mode: ExecutionMode, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
        OutputFormat::Text => {
            let prefix = if mode.is_dry_run() { "[dry run] " } else { "" };
            match outcome {
                RenameOutcome::Renamed(path) => println!("{prefix}renamed to {}", path.display()),
                RenameOutcome::Unchanged => println!("{prefix}unchanged"),
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct SanitizedName<'a> {
    name: &'a str,
    sanitized: String,
}

fn print_sanitized(names: &[String], format: OutputFormat) -> Result<()> {
    let rows: Vec<_> = names
        .iter()
        .map(|name| SanitizedName {
            name,
            sanitized: sanitize(name),
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => {
            for row in rows {
                println!("{}", row.sanitized);
            }
        }
    }
    Ok(())
}

/// Format bytes as human-readable size.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
