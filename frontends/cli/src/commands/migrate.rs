// Batch migration of stored documents to the canonical version

use anyhow::{Context, Result};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use canvas_format::{migrate_str, serialize, MigrationStats};

use crate::config::CanvasConfig;

#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    pub write: bool,
    pub stats: MigrationStats,
    pub failures: Vec<String>,
    /// Files rewritten (only with `write`)
    pub written: Vec<PathBuf>,
}

impl MigrationReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.write { "WRITE" } else { "DRY-RUN" };
        writeln!(f, "Document migration summary ({})", mode)?;
        write!(f, "{}", self.stats)?;
        if !self.failures.is_empty() {
            writeln!(f, "\nFailures:")?;
            for failure in &self.failures {
                writeln!(f, "  - {}", failure)?;
            }
        }
        Ok(())
    }
}

/// Migrate every document under `paths`. Directories contribute their
/// `*.json` files, in name order.
///
/// # Arguments
/// * `paths` - Files or directories to scan
/// * `write` - Replace migrated files in place; otherwise nothing is written
/// * `config` - Limits applied while validating, and the canvas given to
///   documents that store none
pub fn run(paths: &[PathBuf], write: bool, config: &CanvasConfig) -> Result<MigrationReport> {
    config.validate()?;
    let mut report = MigrationReport {
        write,
        ..Default::default()
    };

    for path in collect_files(paths)? {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let result = migrate_str(&text, &config.limits);
        report.stats.record(&result);

        if let Some(reason) = &result.failure {
            report.failures.push(format!("{}: {}", path.display(), reason));
            continue;
        }
        if !(write && result.needs_write()) {
            continue;
        }
        let Some(mut doc) = result.document else {
            continue;
        };
        if !has_canvas(&text) {
            doc = doc.with_canvas(config.canvas.clone());
        }
        let output = serialize(&doc)?;
        fs::write(&path, output).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Rewrote {}", path.display());
        report.written.push(path);
    }

    Ok(report)
}

fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries = json_files_in(path)?;
            entries.sort();
            files.extend(entries);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn json_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    Ok(files)
}

fn has_canvas(text: &str) -> bool {
    serde_json::from_str::<Value>(text)
        .ok()
        .is_some_and(|raw| raw.get("canvas").is_some_and(Value::is_object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn test_dry_run_leaves_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = json!({"version": 4, "nodes": []});
        let path = write_json(dir.path(), "a.json", &legacy);

        let report = run(&[dir.path().to_path_buf()], false, &CanvasConfig::default()).unwrap();
        assert_eq!(report.stats.migrated, 1);
        assert!(report.written.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), legacy.to_string());
        assert!(report.to_string().starts_with("Document migration summary (DRY-RUN)"));
    }

    #[test]
    fn test_write_rewrites_only_migrated_documents() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = write_json(dir.path(), "legacy.json", &json!({"version": 4, "nodes": []}));
        let canonical_text = r#"{"version":6,"nodes":[]}"#;
        let canonical = dir.path().join("canonical.json");
        fs::write(&canonical, canonical_text).unwrap();
        write_json(dir.path(), "future.json", &json!({"version": 9}));
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut config = CanvasConfig::default();
        config.canvas.min_height_px = 1000;
        let report = run(&[dir.path().to_path_buf()], true, &config).unwrap();

        assert_eq!(report.stats.scanned, 3);
        assert_eq!(report.written, vec![legacy.clone()]);
        assert!(report.has_failures());
        assert!(report.failures[0].contains("future.json"));

        let rewritten = fs::read_to_string(&legacy).unwrap();
        assert!(rewritten.starts_with(r#"{"version":6,"nodes":[]"#));
        assert!(rewritten.contains(r#""minHeightPx":1000"#));
        assert_eq!(fs::read_to_string(&canonical).unwrap(), canonical_text);
    }

    #[test]
    fn test_written_canvas_reads_back_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(dir.path(), "legacy.json", &json!({"version": 4, "nodes": []}));

        let mut config = CanvasConfig::default();
        config.canvas.snap_px = 8;
        config.canvas.min_height_px = 1000;
        run(&[path.clone()], true, &config).unwrap();

        let outcome = canvas_format::parse_str_with_report(
            &fs::read_to_string(&path).unwrap(),
            &config.limits,
        );
        assert!(outcome.dropped.is_empty());
        assert_eq!(outcome.document.canvas, config.canvas);
    }

    #[test]
    fn test_out_of_range_canvas_is_refused_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = json!({"version": 4, "nodes": []});
        let path = write_json(dir.path(), "legacy.json", &legacy);

        let mut config = CanvasConfig::default();
        config.canvas.snap_px = 0;
        config.canvas.min_height_px = 10;
        let err = run(&[path.clone()], true, &config).unwrap_err();
        assert!(format!("{:#}", err).contains("snapPx"));
        assert_eq!(fs::read_to_string(&path).unwrap(), legacy.to_string());
    }
}
