//! Batch migration of stored documents to the canonical version.
//!
//! Unlike [`parse`](crate::parse), migration is strict: a document that
//! would lose nodes on upgrade is reported as failed instead of being
//! silently repaired.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info};

use canvas_api::{Document, EngineError, EngineLimits, CANONICAL_VERSION};

use crate::reader::{parse_with_report, LEGACY_ROWS_VERSION};

/// Versions `migrate_document` knows how to bring up to date.
pub const UPGRADABLE_VERSIONS: [u32; 2] = [LEGACY_ROWS_VERSION, 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    AlreadyCanonical,
    Migrated,
    UnsupportedVersion,
    InvalidJson,
    InvalidShape,
    ValidationFailed,
}

impl MigrationStatus {
    pub fn is_failure(&self) -> bool {
        !matches!(self, MigrationStatus::AlreadyCanonical | MigrationStatus::Migrated)
    }
}

#[derive(Debug, Clone)]
pub struct MigrationResult {
    pub status: MigrationStatus,
    pub source_version: Option<u32>,
    /// Canonical document for `AlreadyCanonical` and `Migrated`
    pub document: Option<Document>,
    /// Why the document could not be migrated
    pub failure: Option<String>,
    /// Style values discarded during an otherwise successful migration
    pub dropped: Vec<EngineError>,
}

impl MigrationResult {
    fn failed(status: MigrationStatus, source_version: Option<u32>, failure: String) -> Self {
        debug!("Migration failed ({:?}): {}", status, failure);
        Self {
            status,
            source_version,
            document: None,
            failure: Some(failure),
            dropped: Vec::new(),
        }
    }

    /// Whether the stored text should be replaced.
    pub fn needs_write(&self) -> bool {
        self.status == MigrationStatus::Migrated
    }
}

/// Classify and, where possible, upgrade one stored document.
pub fn migrate_document(raw: &Value, limits: &EngineLimits) -> MigrationResult {
    let Some(root) = raw.as_object() else {
        return MigrationResult::failed(
            MigrationStatus::InvalidShape,
            None,
            "root must be an object".to_string(),
        );
    };

    let raw_version = root.get("version").unwrap_or(&Value::Null);
    let version = raw_version.as_u64().and_then(|v| u32::try_from(v).ok());

    if version == Some(CANONICAL_VERSION) {
        let outcome = parse_with_report(raw, limits);
        return MigrationResult {
            status: MigrationStatus::AlreadyCanonical,
            source_version: version,
            document: Some(outcome.document),
            failure: None,
            dropped: outcome.dropped,
        };
    }

    let Some(version) = version.filter(|v| UPGRADABLE_VERSIONS.contains(v)) else {
        return MigrationResult::failed(
            MigrationStatus::UnsupportedVersion,
            version,
            format!("unsupported version: {}", raw_version),
        );
    };

    let outcome = parse_with_report(raw, limits);
    let structural = outcome.dropped.iter().find(|err| {
        matches!(
            err,
            EngineError::InvalidNode { .. } | EngineError::InvalidDocument { .. }
        )
    });
    if let Some(err) = structural {
        return MigrationResult::failed(
            MigrationStatus::ValidationFailed,
            Some(version),
            err.to_string(),
        );
    }

    info!(
        "Migrated version {} document with {} nodes",
        version,
        outcome.document.node_count()
    );
    MigrationResult {
        status: MigrationStatus::Migrated,
        source_version: Some(version),
        document: Some(outcome.document),
        failure: None,
        dropped: outcome.dropped,
    }
}

/// [`migrate_document`] for stored text.
pub fn migrate_str(text: &str, limits: &EngineLimits) -> MigrationResult {
    if text.trim().is_empty() {
        return MigrationResult::failed(MigrationStatus::InvalidJson, None, "empty document".to_string());
    }
    match serde_json::from_str::<Value>(text) {
        Ok(raw) => migrate_document(&raw, limits),
        Err(err) => MigrationResult::failed(MigrationStatus::InvalidJson, None, err.to_string()),
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Per-status counters over a batch of documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationStats {
    pub scanned: usize,
    pub migrated: usize,
    pub already_canonical: usize,
    pub unsupported_version: usize,
    pub invalid_json: usize,
    pub invalid_shape: usize,
    pub validation_failed: usize,
}

impl MigrationStats {
    pub fn record(&mut self, result: &MigrationResult) {
        self.scanned += 1;
        let counter = match result.status {
            MigrationStatus::AlreadyCanonical => &mut self.already_canonical,
            MigrationStatus::Migrated => &mut self.migrated,
            MigrationStatus::UnsupportedVersion => &mut self.unsupported_version,
            MigrationStatus::InvalidJson => &mut self.invalid_json,
            MigrationStatus::InvalidShape => &mut self.invalid_shape,
            MigrationStatus::ValidationFailed => &mut self.validation_failed,
        };
        *counter += 1;
    }

    pub fn failures(&self) -> usize {
        self.unsupported_version + self.invalid_json + self.invalid_shape + self.validation_failed
    }

    pub fn merge(&mut self, other: &MigrationStats) {
        self.scanned += other.scanned;
        self.migrated += other.migrated;
        self.already_canonical += other.already_canonical;
        self.unsupported_version += other.unsupported_version;
        self.invalid_json += other.invalid_json;
        self.invalid_shape += other.invalid_shape;
        self.validation_failed += other.validation_failed;
    }
}

impl fmt::Display for MigrationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("scanned", self.scanned),
            ("migrated", self.migrated),
            ("already_canonical", self.already_canonical),
            ("unsupported_version", self.unsupported_version),
            ("invalid_json", self.invalid_json),
            ("invalid_shape", self.invalid_shape),
            ("validation_failed", self.validation_failed),
        ];
        for (name, count) in rows {
            writeln!(f, "  {:<20}: {}", name, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn limits() -> EngineLimits {
        EngineLimits::default()
    }

    fn frames() -> Value {
        json!({
            "mobile": {"x": 0, "y": 0, "w": 390, "h": 50},
            "tablet": {"x": 0, "y": 0, "w": 820, "h": 50},
            "desktop": {"x": 0, "y": 0, "w": 1200, "h": 50}
        })
    }

    #[test]
    fn test_classification() {
        let canonical = json!({"version": 6, "nodes": []});
        assert_eq!(
            migrate_document(&canonical, &limits()).status,
            MigrationStatus::AlreadyCanonical
        );

        let v4 = json!({"version": 4, "layout": {"nodes": [
            {"id": "a", "type": "typography", "data": {"text": "x"}, "frames": frames()}
        ]}});
        let result = migrate_document(&v4, &limits());
        assert_eq!(result.status, MigrationStatus::Migrated);
        assert!(result.needs_write());
        assert_eq!(result.document.unwrap().find("a").unwrap().type_tag(), "text");

        let v3 = json!({"version": 3, "layout": {"rows": [{"columns": [{"blocks": []}]}]}});
        assert_eq!(migrate_document(&v3, &limits()).status, MigrationStatus::Migrated);

        for raw in [json!({"version": 5}), json!({"rows": []}), json!({"version": "6"})] {
            let result = migrate_document(&raw, &limits());
            assert_eq!(result.status, MigrationStatus::UnsupportedVersion);
            assert!(result.failure.unwrap().starts_with("unsupported version"));
        }

        assert_eq!(
            migrate_document(&json!([]), &limits()).status,
            MigrationStatus::InvalidShape
        );
        assert_eq!(migrate_str("{oops", &limits()).status, MigrationStatus::InvalidJson);
        assert_eq!(migrate_str("  ", &limits()).status, MigrationStatus::InvalidJson);
    }

    #[test]
    fn test_dropped_nodes_fail_validation() {
        let raw = json!({"version": 4, "nodes": [
            {"id": "a", "type": "image", "data": "broken", "frames": frames()}
        ]});
        let result = migrate_document(&raw, &limits());
        assert_eq!(result.status, MigrationStatus::ValidationFailed);
        assert!(result.document.is_none());
        assert!(result.failure.unwrap().contains("data must be an object"));
    }

    #[test]
    fn test_rejected_style_values_do_not_fail_migration() {
        let raw = json!({"version": 4, "nodes": [{
            "id": "a",
            "type": "text",
            "frames": frames(),
            "style": {"base": {"color": "javascript:alert(1)"}}
        }]});
        let result = migrate_document(&raw, &limits());
        assert_eq!(result.status, MigrationStatus::Migrated);
        assert_eq!(result.dropped.len(), 1);
    }

    #[test]
    fn test_stats() {
        let mut stats = MigrationStats::default();
        for text in [
            r#"{"version": 6}"#,
            r#"{"version": 4}"#,
            r#"{"version": 2}"#,
            "nope",
            "[1]",
        ] {
            stats.record(&migrate_str(text, &limits()));
        }
        assert_eq!(
            stats,
            MigrationStats {
                scanned: 5,
                migrated: 1,
                already_canonical: 1,
                unsupported_version: 1,
                invalid_json: 1,
                invalid_shape: 1,
                validation_failed: 0,
            }
        );
        assert_eq!(stats.failures(), 3);

        let mut total = MigrationStats::default();
        total.merge(&stats);
        total.merge(&stats);
        assert_eq!(total.scanned, 10);
        assert!(total.to_string().contains("  invalid_shape       : 2"));
    }
}
