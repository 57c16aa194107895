//! Persistent schema dictionary
//!
//! Append-only collection of well-labeled datasets, each stored as two files
//! in the dictionary directory:
//!
//! ```text
//! entry-000000.json      label + schema (serde_json)
//! entry-000000.summary   statistical summary (binary codec)
//! ```
//!
//! The summary is written first and the metadata file last, both through
//! atomic renames, so an entry becomes visible only once it is complete.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use atomicwrites::{AtomicFile, OverwriteBehavior};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use schemadict_core::{Error, Result, Sample, Schema, SchemaSummary, SummaryConfig};

const ENTRY_PREFIX: &str = "entry-";
const METADATA_EXT: &str = "json";
const SUMMARY_EXT: &str = "summary";

/// One known dataset: its label, schema and precomputed summary
#[derive(Debug)]
pub struct DictionaryEntry {
    id: u64,
    label: String,
    schema: Schema,
    summary: Arc<SchemaSummary>,
}

impl DictionaryEntry {
    pub fn new(id: u64, label: impl Into<String>, schema: Schema, summary: SchemaSummary) -> Self {
        Self {
            id,
            label: label.into(),
            schema,
            summary: Arc::new(summary),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn summary(&self) -> &Arc<SchemaSummary> {
        &self.summary
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMetadata {
    id: u64,
    label: String,
    schema: Schema,
}

struct State {
    entries: Arc<Vec<Arc<DictionaryEntry>>>,
    next_id: u64,
}

/// Append-only, persisted collection of dictionary entries
pub struct SchemaDictionary {
    dir: PathBuf,
    config: SummaryConfig,
    state: RwLock<State>,
}

impl SchemaDictionary {
    /// Open (creating if needed) the dictionary stored in `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open_with(dir, SummaryConfig::default())
    }

    /// Open with custom profiling limits for newly added entries.
    pub fn open_with<P: AsRef<Path>>(dir: P, config: SummaryConfig) -> Result<Self> {
        config.validate()?;
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut ids = Vec::new();
        let mut max_id = None;
        for item in fs::read_dir(&dir)? {
            let item = item?;
            let file_name = item.file_name();
            let Some((id, ext)) = file_name.to_str().and_then(parse_entry_name) else {
                continue;
            };
            max_id = max_id.max(Some(id));
            if ext == METADATA_EXT {
                ids.push(id);
            }
        }
        ids.sort_unstable();

        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            match load_entry(&dir, id) {
                Ok(entry) => entries.push(Arc::new(entry)),
                Err(e) => warn!(entry = id, error = %e, "skipping unreadable dictionary entry"),
            }
        }
        debug!(dir = %dir.display(), entries = entries.len(), "schema dictionary loaded");

        Ok(Self {
            dir,
            config,
            state: RwLock::new(State {
                entries: Arc::new(entries),
                next_id: max_id.map_or(0, |id| id + 1),
            }),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Profile `sample`, persist it under `label` and append it.
    pub fn add_dictionary_elt(&self, sample: &Sample, label: &str) -> Result<Arc<DictionaryEntry>> {
        let summary = SchemaSummary::from_sample_with(sample, label, &self.config)?;
        self.insert(label, sample.schema().clone(), summary)
    }

    /// Persist an already built summary and append it.
    pub fn insert(&self, label: &str, schema: Schema, summary: SchemaSummary) -> Result<Arc<DictionaryEntry>> {
        let mut state = self.state.write();
        let id = state.next_id;

        let metadata = EntryMetadata {
            id,
            label: label.to_string(),
            schema,
        };
        let json = serde_json::to_vec_pretty(&metadata)?;
        write_atomic(&entry_path(&self.dir, id, SUMMARY_EXT), &summary.to_bytes())?;
        write_atomic(&entry_path(&self.dir, id, METADATA_EXT), &json)?;

        let entry = Arc::new(DictionaryEntry::new(id, metadata.label, metadata.schema, summary));
        Arc::make_mut(&mut state.entries).push(Arc::clone(&entry));
        state.next_id = id + 1;

        info!(entry = id, label = %entry.label, nodes = entry.summary.len(), "added dictionary entry");
        Ok(entry)
    }

    /// Snapshot of all entries in insertion order. The iterator is `Clone`,
    /// so it can be restarted, and is unaffected by later additions.
    pub fn contents(&self) -> Contents {
        Contents {
            entries: Arc::clone(&self.state.read().entries),
            pos: 0,
        }
    }

    /// Most recently added entry carrying `label`.
    pub fn find(&self, label: &str) -> Option<Arc<DictionaryEntry>> {
        self.state
            .read()
            .entries
            .iter()
            .rev()
            .find(|entry| entry.label == label)
            .cloned()
    }
}

/// Restartable iterator over a dictionary snapshot
#[derive(Clone)]
pub struct Contents {
    entries: Arc<Vec<Arc<DictionaryEntry>>>,
    pos: usize,
}

impl Iterator for Contents {
    type Item = Arc<DictionaryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.get(self.pos).cloned();
        if entry.is_some() {
            self.pos += 1;
        }
        entry
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.entries.len() - self.pos;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Contents {}

fn parse_entry_name(name: &str) -> Option<(u64, &str)> {
    let rest = name.strip_prefix(ENTRY_PREFIX)?;
    let (number, ext) = rest.split_once('.')?;
    Some((number.parse().ok()?, ext))
}

fn entry_path(dir: &Path, id: u64, ext: &str) -> PathBuf {
    dir.join(format!("{}{:06}.{}", ENTRY_PREFIX, id, ext))
}

fn load_entry(dir: &Path, id: u64) -> Result<DictionaryEntry> {
    let metadata: EntryMetadata = serde_json::from_slice(&fs::read(entry_path(dir, id, METADATA_EXT))?)?;
    if metadata.id != id {
        return Err(Error::Storage(format!(
            "entry file {} records id {}",
            id, metadata.id
        )));
    }
    let summary = SchemaSummary::from_bytes(&fs::read(entry_path(dir, id, SUMMARY_EXT))?)?;
    Ok(DictionaryEntry::new(id, metadata.label, metadata.schema, summary))
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| f.write_all(data))
        .map_err(|e| match e {
            atomicwrites::Error::Internal(e) | atomicwrites::Error::User(e) => Error::Io(e),
        })
}
