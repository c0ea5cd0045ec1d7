// Page composed into a template at one breakpoint

use anyhow::Result;
use serde_json::{json, Value};
use std::path::Path;

use canvas_api::Breakpoint;
use canvas_core::{compose_template, Composition};

use super::{load, to_pretty_json};
use crate::config::CanvasConfig;

pub fn run(
    template_path: &Path,
    page_path: &Path,
    breakpoint: Breakpoint,
    config: &CanvasConfig,
) -> Result<String> {
    let template = load(template_path, config)?;
    let page = load(page_path, config)?;
    let composition = compose_template(&template, &page, breakpoint);
    to_pretty_json(&composition_json(&composition)?)
}

pub fn composition_json(composition: &Composition) -> Result<Value> {
    let nodes = composition
        .nodes
        .iter()
        .map(|node| serde_json::to_value(node.as_ref()))
        .collect::<serde_json::Result<Vec<_>>>()?;
    Ok(json!({
        "breakpoint": composition.breakpoint,
        "height": composition.height,
        "slot": composition.slot,
        "nodes": nodes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(y: u32, h: u32) -> Value {
        let f = json!({"x": 0, "y": y, "w": 1200, "h": h});
        json!({"mobile": f, "tablet": f, "desktop": f})
    }

    #[test]
    fn test_slot_is_sized_to_page() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.json");
        let page = dir.path().join("page.json");
        std::fs::write(
            &template,
            json!({"nodes": [
                {"id": "header", "type": "frame", "frames": frames(0, 100)},
                {"id": "slot", "type": "slot", "frames": frames(100, 200)},
                {"id": "footer", "type": "frame", "frames": frames(300, 80)}
            ]})
            .to_string(),
        )
        .unwrap();
        std::fs::write(
            &page,
            json!({"nodes": [{"id": "body", "type": "text", "frames": frames(0, 500)}]}).to_string(),
        )
        .unwrap();

        let out: Value = serde_json::from_str(
            &run(&template, &page, Breakpoint::Desktop, &CanvasConfig::default()).unwrap(),
        )
        .unwrap();
        assert_eq!(out["slot"]["slot_id"], "slot");
        assert_eq!(out["slot"]["page_height"], json!(500.0));
        assert_eq!(out["nodes"][1]["frames"]["desktop"]["h"], json!(500));
        assert_eq!(out["nodes"][2]["frames"]["desktop"]["y"], json!(600));
        assert_eq!(out["height"], json!(800.0));
    }
}
