//! Input discovery
//!
//! Groups the raw recordings of a directory by participant. A file belongs to
//! the first catalog stream (in merge order) whose name occurs in the file
//! name; the text before that occurrence is the participant id.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use contracts::{MergeError, StreamCatalog, StreamDescriptor};
use tracing::{debug, info, instrument, warn};

/// Stems with these suffixes are outputs of a previous run
const OUTPUT_SUFFIXES: [&str; 2] = ["MERGED", "DEBUG"];

/// One raw recording matched to a stream type
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub descriptor: Arc<StreamDescriptor>,
    pub path: PathBuf,
}

/// Participant id → inputs ordered by `merge_order`
pub type ParticipantFiles = BTreeMap<String, Vec<DiscoveredFile>>;

/// Scan `dir` (non-recursive) for `*.csv` inputs.
#[instrument(name = "discover", skip(catalog), fields(dir = %dir.display()))]
pub fn discover(dir: &Path, catalog: &StreamCatalog) -> Result<ParticipantFiles, MergeError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv {
            paths.push(path);
        }
    }
    paths.sort();

    let mut participants = ParticipantFiles::new();
    for path in paths {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            debug!(path = %path.display(), "skipping non-UTF-8 file name");
            continue;
        };
        if is_output_file(&path) {
            debug!(file = file_name, "skipping previous output");
            continue;
        }
        let Some((participant, descriptor)) = classify(file_name, catalog) else {
            debug!(file = file_name, "no stream token in file name, ignoring");
            continue;
        };

        let files = participants.entry(participant.to_string()).or_default();
        if files.iter().any(|f| f.descriptor.name == descriptor.name) {
            warn!(
                participant,
                stream = %descriptor.name,
                file = file_name,
                "duplicate input for stream, skipping"
            );
            continue;
        }
        info!(participant, stream = %descriptor.name, file = file_name, "found input");
        files.push(DiscoveredFile {
            descriptor: Arc::clone(descriptor),
            path,
        });
    }

    for files in participants.values_mut() {
        files.sort_by_key(|f| f.descriptor.merge_order);
    }
    Ok(participants)
}

/// Split a file name into participant id and stream type
pub fn classify<'a, 'c>(
    file_name: &'a str,
    catalog: &'c StreamCatalog,
) -> Option<(&'a str, &'c Arc<StreamDescriptor>)> {
    catalog.iter().find_map(|descriptor| {
        file_name
            .find(descriptor.name.as_str())
            .map(|at| (&file_name[..at], descriptor))
    })
}

fn is_output_file(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| OUTPUT_SUFFIXES.iter().any(|suffix| stem.ends_with(suffix)))
}
