// Style sanitization as a standalone check

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use canvas_api::StyleCascade;
use canvas_style::StyleSanitizer;

use super::{read_json, to_pretty_json};
use crate::config::CanvasConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitizeReport {
    /// What survived, `None` when nothing did
    pub style: Option<StyleCascade>,
    pub rejected: Vec<String>,
}

pub fn run(path: &Path, config: &CanvasConfig) -> Result<String> {
    let raw = read_json(path)?;
    let mut sanitizer = StyleSanitizer::new(&config.limits);
    let style = sanitizer.sanitize(&raw);
    let rejected: Vec<String> = sanitizer
        .into_rejected()
        .iter()
        .map(ToString::to_string)
        .collect();
    for reason in &rejected {
        tracing::warn!("{}", reason);
    }
    to_pretty_json(&SanitizeReport { style, rejected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_reports_kept_and_rejected_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("style.json");
        let raw = json!({
            "base": {"width": "100px", "color": "javascript:alert(1)", "opacity": 1.5},
            "advanced": {"--brand-color": "#1a2b3c"}
        });
        std::fs::write(&path, raw.to_string()).unwrap();

        let out: Value = serde_json::from_str(&run(&path, &CanvasConfig::default()).unwrap()).unwrap();
        assert_eq!(out["style"]["base"], json!({"width": "100px"}));
        assert_eq!(out["style"]["advanced"], json!({"--brand-color": "#1a2b3c"}));
        assert_eq!(out["rejected"].as_array().unwrap().len(), 2);
    }
}
