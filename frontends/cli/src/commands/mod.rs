pub mod compose;
pub mod inspect;
pub mod migrate;
pub mod outline;
pub mod render;
pub mod sanitize;
pub mod template;

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::Path;

use canvas_api::Document;
use canvas_format::{parse_with_report, ParseOutcome};

use crate::config::CanvasConfig;

/// Read a JSON file, or stdin for `-`.
pub fn read_json(path: &Path) -> Result<Value> {
    let text = if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        text
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    };
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Read a stored document, applying the configured limits and canvas.
pub fn load_document(path: &Path, config: &CanvasConfig) -> Result<ParseOutcome> {
    config.validate()?;
    let raw = read_json(path)?;
    let mut outcome = parse_with_report(&raw, &config.limits);
    if !has_canvas(&raw) {
        outcome.document = outcome.document.with_canvas(config.canvas.clone());
    }
    for dropped in &outcome.dropped {
        tracing::warn!("{}: {}", path.display(), dropped);
    }
    Ok(outcome)
}

pub fn load(path: &Path, config: &CanvasConfig) -> Result<Document> {
    Ok(load_document(path, config)?.document)
}

fn has_canvas(raw: &Value) -> bool {
    raw.get("canvas").is_some_and(Value::is_object)
}

pub(crate) fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output")
}
