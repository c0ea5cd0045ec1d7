//! Stored form of canvas documents
//!
//! Reading is total: [`parse`] turns any JSON value into a valid
//! [`Document`](canvas_api::Document), upgrading row/column documents and
//! dropping what cannot be admitted. [`serialize`] writes the canonical
//! form, and [`migrate_document`] classifies stored documents for batch
//! migration.

pub mod error;
pub mod migrate;
pub mod reader;
pub mod upgrade;
pub mod writer;

pub use error::{FormatError, Result};
pub use migrate::{migrate_document, migrate_str, MigrationResult, MigrationStats, MigrationStatus};
pub use reader::{parse, parse_str, parse_str_with_report, parse_with_report, ParseOutcome};
pub use writer::{is_dirty, serialize, serialize_pretty, to_value};
