use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};

use schemadict::logging;
use schemadict::{Sample, SchemaDictionary, SummaryConfig};

/// Maintain a dictionary of well-labeled datasets
#[derive(Parser, Debug)]
#[command(name = "schema-dict", version)]
#[command(about = "Add, list and inspect schema dictionary entries", long_about = None)]
struct Args {
    /// Directory holding the schema dictionary
    dictionary_dir: PathBuf,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Profile sample documents and add them to the dictionary
    Add {
        /// JSON sample documents
        #[arg(required = true)]
        samples: Vec<PathBuf>,

        /// Label for the new entries (defaults to each file's stem)
        #[arg(short, long)]
        label: Option<String>,

        /// Maximum retained numeric samples per field
        #[arg(long)]
        max_numeric_samples: Option<usize>,
    },
    /// List the dictionary entries
    List,
    /// Print the statistical summary of an entry
    Dump {
        /// Entry label
        label: String,

        /// Also print the entry's schema
        #[arg(short = 'd', long = "debug")]
        verbose: bool,
    },
}

fn default_label(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn add(
    dir: &Path,
    samples: &[PathBuf],
    label: Option<&str>,
    max_numeric_samples: Option<usize>,
) -> anyhow::Result<()> {
    let mut config = SummaryConfig::default();
    if let Some(max) = max_numeric_samples {
        config.max_numeric_samples = max;
    }
    let dictionary = SchemaDictionary::open_with(dir, config)
        .with_context(|| format!("opening dictionary {}", dir.display()))?;

    let mut added = 0;
    for path in samples {
        let label = label.map_or_else(|| default_label(path), str::to_string);
        let result = Sample::from_path(path).and_then(|sample| dictionary.add_dictionary_elt(&sample, &label));
        match result {
            Ok(entry) => {
                added += 1;
                println!("{}\t{}\t{}", entry.id(), entry.label(), path.display());
            }
            Err(e) => warn!("Skipping {:?}: {}", path, e),
        }
    }
    info!("Added {} of {} samples", added, samples.len());

    if added == 0 {
        bail!("no samples were added");
    }
    Ok(())
}

fn list(dir: &Path) -> anyhow::Result<()> {
    let dictionary = SchemaDictionary::open(dir)?;
    println!("id\tlabel\tfields\trecords");
    for entry in dictionary.contents() {
        let summary = entry.summary();
        println!(
            "{}\t{}\t{}\t{}",
            entry.id(),
            entry.label(),
            summary.field_count(),
            summary.root().num_data()
        );
    }
    Ok(())
}

fn dump(dir: &Path, label: &str, verbose: bool) -> anyhow::Result<()> {
    let dictionary = SchemaDictionary::open(dir)?;
    let Some(entry) = dictionary.find(label) else {
        bail!("no dictionary entry labeled '{}'", label);
    };
    if verbose {
        println!("{}", serde_json::to_string_pretty(&entry.schema().to_json())?);
    }
    print!("{}", entry.summary().dump());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(logging::parse_level(&args.log_level, Level::INFO))?;

    match &args.command {
        Command::Add {
            samples,
            label,
            max_numeric_samples,
        } => add(&args.dictionary_dir, samples, label.as_deref(), *max_numeric_samples),
        Command::List => list(&args.dictionary_dir),
        Command::Dump { label, verbose } => dump(&args.dictionary_dir, label, *verbose),
    }
}
