use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use icu_collator::Collator;
use icu_collator::CollatorPreferences;
use icu_collator::options::CollatorOptions;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::error::TraceLensError;
use crate::trace::TraceRecord;

/// Trace records from the most recent snapshot file, in recorded order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceSnapshot {
    /// File the records were read from; `None` when there was none.
    pub source: Option<PathBuf>,
    pub records: Vec<TraceRecord>,
}

impl TraceSnapshot {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Load the latest snapshot in `traces_dir`.
///
/// A missing or empty directory is the normal "tests never ran" state and
/// yields an empty snapshot. Unreadable JSON in the chosen file is an error.
pub fn load_snapshot(traces_dir: &Path) -> Result<TraceSnapshot> {
    let Some(latest) = latest_snapshot_file(traces_dir)? else {
        debug!("no trace snapshot under {}", traces_dir.display());
        return Ok(TraceSnapshot::default());
    };

    let raw = fs::read_to_string(&latest)?;
    let records = parse_records(&raw, &latest)?;
    debug!("loaded {} trace records from {}", records.len(), latest.display());
    Ok(TraceSnapshot {
        source: Some(latest),
        records,
    })
}

/// The last file in `traces_dir` by locale-aware name order. Symlinks are
/// followed; directories are skipped.
pub fn latest_snapshot_file(traces_dir: &Path) -> Result<Option<PathBuf>> {
    let entries = match fs::read_dir(traces_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    sort_by_locale(&mut names)?;
    Ok(names.pop().map(|name| traces_dir.join(name)))
}

fn parse_records(raw: &str, path: &Path) -> Result<Vec<TraceRecord>> {
    let values: Vec<Value> =
        serde_json::from_str(raw).map_err(|source| TraceLensError::MalformedSnapshot {
            path: path.to_path_buf(),
            source,
        })?;

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            TraceRecord::deserialize(value).map_err(|err| TraceLensError::InvalidTrace {
                path: path.to_path_buf(),
                index,
                reason: err.to_string(),
            })
        })
        .collect()
}

/// Sort with the root-locale collator, the order a JavaScript
/// `localeCompare` sort produces. Code point order breaks collation ties.
fn sort_by_locale<S: AsRef<str>>(names: &mut [S]) -> Result<()> {
    let collator = Collator::try_new(CollatorPreferences::default(), CollatorOptions::default())
        .map_err(|err| TraceLensError::Collation(err.to_string()))?;
    names.sort_by(|a, b| {
        let (a, b): (&str, &str) = (a.as_ref(), b.as_ref());
        collator.compare(a, b).then_with(|| a.cmp(b))
    });
    Ok(())
}
