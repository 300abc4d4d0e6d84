//! # Integration Tests
//!
//! End-to-end tests across crates.
//!
//! Covers:
//! - config file to catalog
//! - discovery, presort, cursors, engine and CSV sink on a scratch directory
//! - batch aggregation of merge reports

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{AlignmentMode, MergeConfig};

    #[test]
    fn test_config_file_to_catalog() {
        let config = ConfigLoader::load_from_str(
            r#"
target_frequency_hz = 2
alignment = "coincident"

[[streams]]
name = "PPG"
columns = ["PPG"]
frequency_hz = 32
merge_order = 2

[[streams]]
name = "RESP"
timestamp_column = "time"
columns = ["RESP"]
frequency_hz = 2
merge_order = 1
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(config.alignment, AlignmentMode::Coincident);
        let catalog = config.catalog().unwrap();
        let names: Vec<_> = catalog.iter().map(|d| d.name.to_string()).collect();
        assert_eq!(names, ["RESP", "PPG"]);
        assert_eq!(catalog.get("RESP").unwrap().timestamp_column, "time");
    }

    #[test]
    fn test_defaults_survive_serialization() {
        let config = MergeConfig::default();
        let toml = ConfigLoader::to_toml(&config).unwrap();
        let back = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(back, config);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fmt::Write as _;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Instant;

    use contracts::{AlignedSource, AlignmentMode, MergeConfig, MergeReport, StreamName};
    use ingestion::{discover, sort_file, CursorOptions, DiscoveredFile, StreamCursor};
    use observability::MergeMetricsAggregator;
    use sinks::{debug_path, merged_path, CsvSink};
    use sync_engine::{EngineConfig, MergeEngine};

    const T0: i64 = 1_600_000_000;

    /// Epoch-seconds text for `T0 + micros`
    fn at(micros: i64) -> String {
        format!("{}.{:06}", T0 + micros / 1_000_000, micros % 1_000_000)
    }

    /// One row every `1/hz` s over `[0, seconds]`
    fn write_stream(
        path: &Path,
        header: &str,
        hz: i64,
        seconds: i64,
        values: impl Fn(i64) -> String,
    ) {
        let mut content = format!("{header}\n");
        let period = 1_000_000 / hz;
        for i in 0..=seconds * hz {
            writeln!(content, "{},{}", at(i * period), values(i)).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// HR 1 Hz, ACC 32 Hz, EDA 4 Hz for participant `P1_`
    fn recordings(dir: &Path, hr_seconds: i64) {
        write_stream(&dir.join("P1_HR.csv"), "timestamp,HR", 1, hr_seconds, |i| {
            (70 + i).to_string()
        });
        write_stream(&dir.join("P1_ACC.csv"), "timestamp,X,Y,Z", 32, 2, |i| {
            format!("{i},{},64", -i)
        });
        write_stream(&dir.join("P1_EDA.csv"), "timestamp,EDA,event,code", 4, 2, |i| {
            format!("0.{i},,{}", i % 2)
        });
    }

    /// The per-participant job the CLI runs, without the worker pool
    fn merge_dir(dir: &Path, config: &MergeConfig) -> Vec<(String, MergeReport)> {
        let catalog = Arc::new(config.catalog().unwrap());
        let mut reports = Vec::new();
        for (participant, files) in discover(dir, &catalog).unwrap() {
            reports.push((participant.clone(), merge_one(dir, &participant, &files, config)));
        }
        reports
    }

    fn merge_one(
        dir: &Path,
        participant: &str,
        files: &[DiscoveredFile],
        config: &MergeConfig,
    ) -> MergeReport {
        let catalog = Arc::new(config.catalog().unwrap());
        if config.sort_inputs {
            for file in files {
                sort_file(&file.path, &file.descriptor).unwrap();
            }
        }
        let engine_config = EngineConfig::from_merge_config(config, Instant::now()).unwrap();
        let options = CursorOptions::new(engine_config.target).strict(config.strict_columns);
        let sources: Vec<Box<dyn AlignedSource>> = files
            .iter()
            .map(|f| {
                Box::new(
                    StreamCursor::open_path(&f.path, Arc::clone(&f.descriptor), &options).unwrap(),
                ) as Box<dyn AlignedSource>
            })
            .collect();
        let engine = MergeEngine::new(catalog, sources, engine_config).unwrap();
        let mut sink = CsvSink::create(dir, participant).unwrap();
        engine.run(&mut sink).unwrap()
    }

    fn config_for(dir: &Path) -> MergeConfig {
        MergeConfig {
            input_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_tolerance_merge_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        recordings(dir.path(), 2);

        let reports = merge_dir(dir.path(), &config_for(dir.path()));
        assert_eq!(reports.len(), 1);
        let (participant, report) = &reports[0];
        assert_eq!(participant, "P1_");
        // 0, 0.25, ..., 2.0
        assert_eq!(report.rows_written, 9);
        assert_eq!(report.rows_dropped(), 0);
        assert_eq!(report.stopped_by, None);

        let merged = fs::read_to_string(merged_path(dir.path(), "P1_")).unwrap();
        let lines: Vec<_> = merged.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "timer,timestamp,HR,X,Y,Z,EDA,event,code");
        assert_eq!(lines[1], "0.25,2020-09-13 12:26:40.000000,70,0,0,64,0.0,,0");
        // HR's next sample is within its 1 s period of 0.25
        assert_eq!(lines[2], "0.5,2020-09-13 12:26:40.250000,71,8,-8,64,0.1,,1");

        let debug = fs::read_to_string(debug_path(dir.path(), "P1_")).unwrap();
        let lines: Vec<_> = debug.lines().collect();
        assert_eq!(
            lines[0],
            "timer,timestamp,HR,X,Y,Z,EDA,event,code,\
             HR line #,ACC line #,TEMP line #,BVP line #,EDA line #"
        );
        assert!(lines[1].ends_with(",2,2,,,2"));
        assert!(lines[2].ends_with(",3,10,,,3"));
    }

    #[test]
    fn test_coincident_merge_keeps_shared_instants() {
        let dir = tempfile::tempdir().unwrap();
        recordings(dir.path(), 2);
        let config = MergeConfig {
            alignment: AlignmentMode::Coincident,
            ..config_for(dir.path())
        };

        let (_, report) = merge_dir(dir.path(), &config).remove(0);
        assert_eq!(report.rows_written, 3);
        assert_eq!(report.rows_dropped_misaligned, 6);

        let merged = fs::read_to_string(merged_path(dir.path(), "P1_")).unwrap();
        let timestamps: Vec<_> = merged
            .lines()
            .skip(1)
            .map(|l| l.split(',').nth(1).unwrap().to_string())
            .collect();
        assert_eq!(
            timestamps,
            [
                "2020-09-13 12:26:40.000000",
                "2020-09-13 12:26:41.000000",
                "2020-09-13 12:26:42.000000"
            ]
        );
    }

    #[test]
    fn test_short_stream_stops_merge() {
        let dir = tempfile::tempdir().unwrap();
        recordings(dir.path(), 1);

        let (_, report) = merge_dir(dir.path(), &config_for(dir.path())).remove(0);
        assert_eq!(report.stopped_by, Some(StreamName::new("HR")));
        // 0 .. 1.0 inclusive
        assert_eq!(report.rows_written, 5);
        let hr = report.streams.iter().find(|s| s.stream == "HR").unwrap();
        assert_eq!(hr.lines_consumed, 3);
    }

    #[test]
    fn test_unsorted_input_presorted_and_rerun_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        recordings(dir.path(), 2);
        // shuffle EDA rows, keeping the header first
        let eda = dir.path().join("P1_EDA.csv");
        let content = fs::read_to_string(&eda).unwrap();
        let mut lines: Vec<_> = content.lines().collect();
        lines[1..].reverse();
        fs::write(&eda, lines.join("\n") + "\n").unwrap();

        let config = config_for(dir.path());
        let first = merge_dir(dir.path(), &config);
        let merged_once = fs::read_to_string(merged_path(dir.path(), "P1_")).unwrap();

        // the previous tables sit in the input directory and are not rediscovered
        let second = merge_dir(dir.path(), &config);
        let merged_twice = fs::read_to_string(merged_path(dir.path(), "P1_")).unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].1.rows_written, 9);
        assert_eq!(merged_once, merged_twice);
    }

    #[test]
    fn test_reports_aggregate() {
        let dir = tempfile::tempdir().unwrap();
        recordings(dir.path(), 2);
        let config = MergeConfig {
            alignment: AlignmentMode::Coincident,
            ..config_for(dir.path())
        };

        let mut aggregator = MergeMetricsAggregator::new();
        for (_, report) in merge_dir(dir.path(), &config) {
            aggregator.update(&report, std::time::Duration::from_millis(5));
        }
        aggregator.record_failure("P2_", "stream 'HR' ran dry");

        let summary = aggregator.summary();
        assert_eq!(summary.participants_ok, 1);
        assert_eq!(summary.participants_failed, 1);
        assert_eq!(summary.rows_written, 3);
        assert_eq!(summary.rows_dropped, 6);
        assert!(summary.to_string().contains("P2_: stream 'HR' ran dry"));
    }
}
