// Layer panel view of a document

use anyhow::Result;
use std::fmt::Write;
use std::path::Path;

use canvas_api::Breakpoint;
use canvas_core::{outline, OutlineRow};

use super::{load, to_pretty_json};
use crate::config::CanvasConfig;

pub fn run(
    path: &Path,
    breakpoint: Breakpoint,
    query: Option<&str>,
    json: bool,
    config: &CanvasConfig,
) -> Result<String> {
    let doc = load(path, config)?;
    let rows = outline(&doc, breakpoint, query);
    if json {
        to_pretty_json(&rows)
    } else {
        Ok(format_rows(&rows))
    }
}

/// One line per row, indented by depth.
///
/// `+` marks a collapsed node with hidden children, `-` an expanded one,
/// `*` a search hit.
pub fn format_rows(rows: &[OutlineRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let marker = match (row.has_children, row.collapsed) {
            (true, true) => '+',
            (true, false) => '-',
            (false, _) => ' ',
        };
        let _ = write!(
            out,
            "{}{} {} ({}, z={})",
            "  ".repeat(row.depth),
            marker,
            row.label,
            row.id,
            row.z
        );
        if row.hidden {
            out.push_str(" hidden");
        }
        if row.matched {
            out.push_str(" *");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_outline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.json");
        let frame = |z: i32| json!({"x": 0, "y": 0, "w": 10, "h": 10, "z": z});
        let frames = |z: i32| json!({"mobile": frame(z), "tablet": frame(z), "desktop": frame(z)});
        let raw = json!({"nodes": [{
            "id": "hero",
            "type": "frame",
            "data": {"layout": "section"},
            "frames": frames(0),
            "meta": {"name": "Hero"},
            "nodes": [
                {"id": "t", "type": "text", "data": {"text": "Welcome"}, "frames": frames(1), "meta": {"hidden": true}},
                {"id": "i", "type": "image", "data": {"alt": "Logo"}, "frames": frames(2)}
            ]
        }]});
        std::fs::write(&path, raw.to_string()).unwrap();

        let text = run(&path, Breakpoint::Desktop, None, false, &CanvasConfig::default()).unwrap();
        assert_eq!(
            text,
            "- Hero (hero, z=0)\n    Logo (i, z=2)\n    Welcome (t, z=1) hidden\n"
        );

        let text = run(&path, Breakpoint::Desktop, Some("welc"), false, &CanvasConfig::default())
            .unwrap();
        assert_eq!(text, "- Hero (hero, z=0)\n    Welcome (t, z=1) hidden *\n");
    }
}
