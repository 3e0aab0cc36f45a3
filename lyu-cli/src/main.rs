//! lyu - command line front end for LyricUser lyrics libraries
//!
//! Tidies damaged lyrics files, shows and edits single documents, and prints
//! the library tree with favourite or singable songs highlighted.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lyu_common::config::{self, RootFolderResolver, TomlConfig};
use lyu_common::library::{self, Highlight, HighlightFilter, LyricsLibrary, NodeType};
use lyu_common::schema::LYRICS;
use lyu_common::{reader, tidy, LyricsPresenter, TidyOutcome};

/// Command-line arguments for lyu
#[derive(Parser, Debug)]
#[command(name = "lyu")]
#[command(about = "Lyrics library maintenance for LyricUser")]
#[command(version)]
struct Args {
    /// Lyrics library folder (overrides LYRICUSER_ROOT_FOLDER and the config file)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Configuration file to use instead of the per-user default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Repair lyrics files that no longer parse
    Tidy {
        /// File or folder to tidy; defaults to the library folder
        path: Option<PathBuf>,
    },
    /// Print every field of a lyrics file
    Show {
        file: PathBuf,
        /// Print the fields as a JSON object
        #[arg(long)]
        json: bool,
    },
    /// Print one field of a lyrics file
    Get {
        file: PathBuf,
        key: String,
        /// Type the value must convert to
        #[arg(long = "as", value_enum, default_value_t = ValueKind::String)]
        kind: ValueKind,
    },
    /// Set one field of a lyrics file and save it
    Set {
        file: PathBuf,
        key: String,
        value: String,
    },
    /// Print the library tree, marking songs whose field is true
    Highlight {
        #[arg(long, value_enum, default_value_t = FilterArg::Favourite)]
        field: FilterArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ValueKind {
    Bool,
    Int,
    String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FilterArg {
    Favourite,
    Singable,
}

impl From<FilterArg> for HighlightFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Favourite => HighlightFilter::Favourite,
            FilterArg::Singable => HighlightFilter::Singable,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(config::config_file_path);
    let toml_config = config::load_or_default(config_path.as_deref());

    init_tracing(&toml_config)?;

    info!(
        "Starting lyu v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let resolver = RootFolderResolver::new(toml_config).with_cli_arg(args.root.clone());

    match args.command {
        Command::Tidy { path } => {
            let target = path.unwrap_or_else(|| resolver.resolve());
            if target.is_file() {
                tidy_one(&target)
            } else {
                remember_folder(config_path.as_deref(), &target);
                tidy_folder(&target)
            }
        }
        Command::Show { file, json } => show(&file, json),
        Command::Get { file, key, kind } => get(&file, &key, kind),
        Command::Set { file, key, value } => set(&file, key, value),
        Command::Highlight { field } => {
            let root = resolver.resolve();
            remember_folder(config_path.as_deref(), &root);
            print_highlighted_tree(&root, field.into())
        }
    }
}

fn init_tracing(toml_config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&toml_config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match &toml_config.logging.file {
        Some(log_file) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)
                .with_context(|| format!("Failed to open log file {}", log_file.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn remember_folder(config_path: Option<&Path>, folder: &Path) {
    if let Some(config_path) = config_path {
        if let Err(e) = config::remember_last_opened_folder(config_path, folder) {
            warn!("Could not save last opened folder: {}", e);
        }
    }
}

fn tidy_one(path: &Path) -> Result<()> {
    match tidy::tidy_file(path).with_context(|| format!("Failed to tidy {}", path.display()))? {
        TidyOutcome::AlreadyClean => println!("{}: already clean", path.display()),
        TidyOutcome::Repaired => println!("{}: repaired", path.display()),
    }
    Ok(())
}

fn tidy_folder(root: &Path) -> Result<()> {
    info!("Tidying library at {}", root.display());
    let report = library::tidy_tree(root)
        .with_context(|| format!("Failed to scan {}", root.display()))?;

    for path in &report.repaired {
        println!("repaired  {}", path.display());
    }
    for (path, err) in &report.failed {
        println!("FAILED    {}: {}", path.display(), err);
    }
    println!(
        "{} file(s): {} clean, {} repaired, {} failed",
        report.total(),
        report.clean,
        report.repaired.len(),
        report.failed.len()
    );

    if !report.failed.is_empty() {
        bail!("{} file(s) could not be repaired", report.failed.len());
    }
    Ok(())
}

fn show(file: &Path, json: bool) -> Result<()> {
    let doc = reader::read_all(file).with_context(|| format!("Failed to read {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    for (name, value) in doc.in_display_order().iter() {
        if name == LYRICS {
            println!("{}:", name);
            for line in value.lines() {
                println!("    {}", line);
            }
        } else {
            println!("{}: {}", name, value);
        }
    }
    Ok(())
}

fn get(file: &Path, key: &str, kind: ValueKind) -> Result<()> {
    let context = || format!("Failed to read '{}' from {}", key, file.display());

    match kind {
        ValueKind::Bool => println!("{}", reader::read_value::<bool>(file, key).with_context(context)?),
        ValueKind::Int => println!("{}", reader::read_value::<i32>(file, key).with_context(context)?),
        ValueKind::String => {
            println!("{}", reader::read_value::<String>(file, key).with_context(context)?)
        }
    }
    Ok(())
}

fn set(file: &Path, key: String, value: String) -> Result<()> {
    let mut presenter =
        LyricsPresenter::open(file).with_context(|| format!("Failed to open {}", file.display()))?;

    if key == LYRICS {
        presenter.set_lyrics(value);
    } else {
        presenter.set_metadata(key, value)?;
    }

    if presenter.is_modified() {
        presenter
            .save()
            .with_context(|| format!("Failed to save {}", file.display()))?;
        info!("Saved {}", file.display());
    } else {
        info!("{} unchanged", file.display());
    }
    Ok(())
}

fn print_highlighted_tree(root: &Path, filter: HighlightFilter) -> Result<()> {
    let library = LyricsLibrary::scan(root)
        .with_context(|| format!("Failed to scan {}", root.display()))?;
    let highlights = library.highlight(filter);

    for (id, node) in library.iter() {
        let marker = match highlights.get(id) {
            Highlight::Highlighted => '*',
            Highlight::Unreadable => '!',
            Highlight::Plain => ' ',
        };
        let suffix = if node.node_type == NodeType::Song { "" } else { "/" };
        println!(
            "{} {}{}{}",
            marker,
            "  ".repeat(library.depth(id)),
            node.name,
            suffix
        );
    }

    let unreadable = highlights.unreadable().count();
    if unreadable > 0 {
        warn!("{} file(s) could not be read; run `lyu tidy` to repair them", unreadable);
    }
    Ok(())
}
