//! StreamDescriptor / StreamCatalog
//!
//! Static, process-wide description of the known stream types. Descriptors are
//! immutable and shared as `Arc`; all per-open state lives in the cursor.

use std::collections::HashSet;
use std::sync::Arc;

use crate::{Frequency, MergeError, StreamName, StreamSpec};

/// Default name of the timestamp column
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "timestamp";

/// Immutable description of one stream type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Type name, also the discovery token (e.g. `HR`)
    pub name: StreamName,
    /// Header name of the timestamp column
    pub timestamp_column: String,
    /// Declared data columns, in output order
    pub columns: Vec<String>,
    /// Native sampling frequency
    pub frequency: Frequency,
    /// Rank in the merged row; unique within a catalog
    pub merge_order: u32,
}

impl StreamDescriptor {
    /// Spacing of the native sampling grid, in microseconds
    #[inline]
    pub fn native_period_micros(&self) -> i64 {
        self.frequency.period_micros()
    }

    /// Grid a cursor snaps to when the merge runs at `target`.
    ///
    /// Streams faster than the output are decimated onto the output grid.
    #[inline]
    pub fn alignment_frequency(&self, target: Frequency) -> Frequency {
        self.frequency.min(target)
    }
}

/// Ordered, validated set of stream descriptors
#[derive(Debug, Clone)]
pub struct StreamCatalog {
    /// Sorted by `merge_order`
    entries: Vec<Arc<StreamDescriptor>>,
}

impl StreamCatalog {
    /// Build from config entries, validating names, ranks and frequencies.
    pub fn from_specs(specs: &[StreamSpec]) -> Result<Self, MergeError> {
        let mut entries = Vec::with_capacity(specs.len());
        for spec in specs {
            let frequency = Frequency::new(spec.frequency_hz).map_err(|_| {
                MergeError::config_validation(
                    format!("streams[name={}].frequency_hz", spec.name),
                    format!(
                        "{} Hz must be > 0 and divide 1000000 exactly",
                        spec.frequency_hz
                    ),
                )
            })?;
            entries.push(StreamDescriptor {
                name: StreamName::from(spec.name.as_str()),
                timestamp_column: spec.timestamp_column.clone(),
                columns: spec.columns.clone(),
                frequency,
                merge_order: spec.merge_order,
            });
        }
        Self::new(entries)
    }

    /// Build from descriptors, validating the catalog invariants.
    pub fn new(descriptors: Vec<StreamDescriptor>) -> Result<Self, MergeError> {
        if descriptors.is_empty() {
            return Err(MergeError::config_validation(
                "streams",
                "catalog must declare at least one stream",
            ));
        }

        let mut ranks = HashSet::new();
        let mut names = HashSet::new();
        for descriptor in &descriptors {
            let field = format!("streams[name={}]", descriptor.name);
            if descriptor.name.is_empty() {
                return Err(MergeError::config_validation(
                    "streams[].name",
                    "stream name cannot be empty",
                ));
            }
            if !names.insert(descriptor.name.clone()) {
                return Err(MergeError::config_validation(field, "duplicate stream name"));
            }
            if !ranks.insert(descriptor.merge_order) {
                return Err(MergeError::config_validation(
                    format!("{field}.merge_order"),
                    format!("duplicate merge_order {}", descriptor.merge_order),
                ));
            }
            if descriptor.columns.is_empty() {
                return Err(MergeError::config_validation(
                    format!("{field}.columns"),
                    "at least one data column must be declared",
                ));
            }
            if descriptor.timestamp_column.is_empty() {
                return Err(MergeError::config_validation(
                    format!("{field}.timestamp_column"),
                    "timestamp column name cannot be empty",
                ));
            }
        }

        // Discovery matches names as filename substrings
        for a in &descriptors {
            for b in &descriptors {
                if a.name != b.name && b.name.contains(a.name.as_str()) {
                    return Err(MergeError::config_validation(
                        format!("streams[name={}]", b.name),
                        format!("name contains another stream name '{}'", a.name),
                    ));
                }
            }
        }

        let mut entries: Vec<_> = descriptors.into_iter().map(Arc::new).collect();
        entries.sort_by_key(|d| d.merge_order);
        Ok(Self { entries })
    }

    /// Descriptors in ascending `merge_order`
    pub fn iter(&self) -> impl Iterator<Item = &Arc<StreamDescriptor>> {
        self.entries.iter()
    }

    /// Look up by stream name
    pub fn get(&self, name: &str) -> Option<&Arc<StreamDescriptor>> {
        self.entries.iter().find(|d| d.name == name)
    }

    /// Position of a stream in `merge_order`
    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Verify every stream can be aligned against the output frequency
    pub fn check_target(&self, target: Frequency) -> Result<(), MergeError> {
        for descriptor in &self.entries {
            if !descriptor.frequency.commensurate_with(target) {
                return Err(MergeError::config_validation(
                    format!("streams[name={}].frequency_hz", descriptor.name),
                    format!(
                        "{} is not commensurate with target {}",
                        descriptor.frequency, target
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl Default for StreamCatalog {
    /// Empatica-style catalog: HR, ACC, TEMP, BVP, EDA
    fn default() -> Self {
        let entry = |name: &str, columns: &[&str], hz: u32, merge_order: u32| {
            Arc::new(StreamDescriptor {
                name: name.into(),
                timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
                columns: columns.iter().map(|c| c.to_string()).collect(),
                frequency: Frequency::known(hz),
                merge_order,
            })
        };

        Self {
            entries: vec![
                entry("HR", &["HR"], 1, 1),
                entry("ACC", &["X", "Y", "Z"], 32, 2),
                entry("TEMP", &["TEMP"], 4, 3),
                entry("BVP", &["BVP"], 64, 4),
                entry("EDA", &["EDA", "event", "code"], 4, 5),
            ],
        }
    }
}

/// Config entries equivalent to [`StreamCatalog::default`]
pub fn default_stream_specs() -> Vec<StreamSpec> {
    StreamCatalog::default()
        .iter()
        .map(|d| StreamSpec {
            name: d.name.to_string(),
            timestamp_column: d.timestamp_column.clone(),
            columns: d.columns.clone(),
            frequency_hz: d.frequency.hz(),
            merge_order: d.merge_order,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, hz: u32, merge_order: u32) -> StreamSpec {
        StreamSpec {
            name: name.to_string(),
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
            columns: vec![name.to_string()],
            frequency_hz: hz,
            merge_order,
        }
    }

    #[test]
    fn test_default_catalog_passes_validation() {
        let rebuilt = StreamCatalog::from_specs(&default_stream_specs()).unwrap();
        let names: Vec<_> = rebuilt.iter().map(|d| d.name.to_string()).collect();
        assert_eq!(names, ["HR", "ACC", "TEMP", "BVP", "EDA"]);
        rebuilt.check_target(Frequency::new(4).unwrap()).unwrap();
    }

    #[test]
    fn test_sorted_by_merge_order_not_position() {
        let catalog =
            StreamCatalog::from_specs(&[spec("B", 4, 2), spec("A", 4, 9), spec("C", 1, 1)])
                .unwrap();
        let names: Vec<_> = catalog.iter().map(|d| d.name.to_string()).collect();
        assert_eq!(names, ["C", "B", "A"]);
        assert_eq!(catalog.slot_of("A"), Some(2));
    }

    #[test]
    fn test_duplicate_merge_order_rejected() {
        let err = StreamCatalog::from_specs(&[spec("A", 4, 1), spec("B", 4, 1)]).unwrap_err();
        assert!(err.to_string().contains("duplicate merge_order"));
    }

    #[test]
    fn test_unrepresentable_frequency_rejected() {
        let err = StreamCatalog::from_specs(&[spec("A", 3, 1)]).unwrap_err();
        assert!(matches!(err, MergeError::ConfigValidation { .. }));
    }

    #[test]
    fn test_substring_names_rejected() {
        let err = StreamCatalog::from_specs(&[spec("HR", 1, 1), spec("HRV", 1, 2)]).unwrap_err();
        assert!(err.to_string().contains("HRV"));
    }

    #[test]
    fn test_incommensurate_target() {
        let catalog = StreamCatalog::from_specs(&[spec("A", 8, 1)]).unwrap();
        assert!(catalog.check_target(Frequency::new(5).unwrap()).is_err());
        assert!(catalog.check_target(Frequency::new(4).unwrap()).is_ok());
    }

    #[test]
    fn test_alignment_frequency_caps_at_target() {
        let catalog = StreamCatalog::default();
        let target = Frequency::new(4).unwrap();
        assert_eq!(catalog.get("BVP").unwrap().alignment_frequency(target).hz(), 4);
        assert_eq!(catalog.get("HR").unwrap().alignment_frequency(target).hz(), 1);
    }
}
