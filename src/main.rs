use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{ArgAction, Parser};
use tracing::{debug, info, Level};

use schemadict::logging;
use schemadict::{SchemaDictionary, SchemaSuggest, SchemaSummary, SuggestConfig, SuggestResponse};

/// Rank the known datasets closest to an anonymous sample
#[derive(Parser, Debug)]
#[command(name = "schema-suggest", version)]
#[command(about = "Suggest labels for an anonymous dataset from a schema dictionary", long_about = None)]
#[command(disable_help_flag = true)]
struct Args {
    /// Directory holding the schema dictionary
    dictionary_dir: PathBuf,

    /// JSON sample document ({"schema": ..., "records": [...]})
    candidate_sample: PathBuf,

    /// Number of suggestions to list
    #[arg(short = 'k', default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    k: u32,

    /// Show field documentation next to each suggestion
    #[arg(short = 'd', long = "debug")]
    verbose: bool,

    /// Also write the ranking as JSON to this file
    #[arg(short = 'f', long = "out-file")]
    out_file: Option<PathBuf>,

    /// JSON file with search settings (buckets, costs, profiling limits)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the number of field-count buckets
    #[arg(long)]
    buckets: Option<usize>,

    /// Match on types and statistics only, ignoring field names
    #[arg(long)]
    ignore_labels: bool,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Print help
    #[arg(short = '?', long = "help", action = ArgAction::Help)]
    help: Option<bool>,
}

impl Args {
    fn suggest_config(&self) -> anyhow::Result<SuggestConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => SuggestConfig::default(),
        };
        if let Some(buckets) = self.buckets {
            config.num_buckets = buckets;
        }
        if self.ignore_labels {
            config.matching.use_attribute_labels = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn sample_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(logging::parse_level(&args.log_level, Level::WARN))?;

    let config = args.suggest_config()?;
    if !args.dictionary_dir.is_dir() {
        bail!("dictionary directory {} does not exist", args.dictionary_dir.display());
    }

    let dictionary = SchemaDictionary::open_with(&args.dictionary_dir, config.summary.clone())
        .with_context(|| format!("opening dictionary {}", args.dictionary_dir.display()))?;
    info!("Dictionary: {:?} ({} entries)", args.dictionary_dir, dictionary.len());

    let sample = schemadict::Sample::from_path(&args.candidate_sample)
        .with_context(|| format!("loading sample {}", args.candidate_sample.display()))?;
    let label = sample_label(&args.candidate_sample);
    let query = SchemaSummary::from_sample_with(&sample, &label, &config.summary)
        .with_context(|| format!("profiling sample {}", args.candidate_sample.display()))?;
    debug!("Query summary:\n{}", query.dump());

    let suggest = SchemaSuggest::with_config(&dictionary, config)?;
    let outcome = suggest.search(Arc::new(query), args.k as usize);
    info!(
        "Examined {} of {} entries in {} buckets (radius {})",
        outcome.stats.entries_examined,
        suggest.num_entries(),
        outcome.stats.buckets_visited,
        outcome.stats.final_radius
    );

    let response = SuggestResponse::from_matches(&outcome.matches);
    print!("{}", response.render(args.verbose));

    if let Some(out_file) = &args.out_file {
        fs::write(out_file, response.to_json()?)
            .with_context(|| format!("writing {}", out_file.display()))?;
        info!("Wrote suggestions to {:?}", out_file);
    }

    Ok(())
}
