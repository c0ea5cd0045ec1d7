//! Canonical output.
//!
//! `Document`'s `Serialize` impl fixes the field order; maps are sorted and
//! absent optionals omitted, so equal documents always produce equal text.

use serde_json::Value;
use tracing::debug;

use canvas_api::Document;

use crate::reader::parse_str;
use crate::Result;

/// Canonical compact JSON.
pub fn serialize(doc: &Document) -> Result<String> {
    Ok(serde_json::to_string(doc)?)
}

/// Canonical JSON, indented for people.
pub fn serialize_pretty(doc: &Document) -> Result<String> {
    Ok(serde_json::to_string_pretty(doc)?)
}

pub fn to_value(doc: &Document) -> Result<Value> {
    Ok(serde_json::to_value(doc)?)
}

/// Whether `doc` differs from the `saved` text once both are canonical.
///
/// Formatting, key order and legacy encodings in `saved` do not count as
/// changes.
pub fn is_dirty(saved: &str, doc: &Document) -> bool {
    match (serialize(&parse_str(saved)), serialize(doc)) {
        (Ok(saved), Ok(current)) => saved != current,
        (Err(err), _) | (_, Err(err)) => {
            debug!("Treating document as dirty: {}", err);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use canvas_api::{Breakpoint, Frame, Node, NodeKind};
    use serde_json::json;

    fn sample() -> Document {
        parse(&json!({
            "version": 6,
            "nodes": [{
                "id": "hero",
                "type": "frame",
                "data": {"layout": "section"},
                "frames": {
                    "mobile": {"x": 0, "y": 0, "w": 390, "h": 300},
                    "tablet": {"x": 0, "y": 0, "w": 820, "h": 300},
                    "desktop": {"x": 0, "y": 0, "w": 1200, "h": 400.5, "z": 2}
                },
                "meta": {"name": "Hero"},
                "nodes": [{
                    "id": "title",
                    "type": "typography",
                    "data": {"text": "Hello", "variant": "h1"},
                    "frames": {
                        "mobile": {"x": 10, "y": 10, "w": 300, "h": 40},
                        "tablet": {"x": 10, "y": 10, "w": 300, "h": 40},
                        "desktop": {"x": 10, "y": 10, "w": 300, "h": 40}
                    },
                    "style": {"base": {"color": "#333", "fontSize": "24px", "width": 100}}
                }]
            }],
            "canvas": {"snapPx": 4},
            "template": {"id": "main"}
        }))
    }

    #[test]
    fn test_canonical_text() {
        let text = serialize(&sample()).unwrap();
        let expected = concat!(
            r#"{"version":6,"nodes":[{"id":"hero","type":"frame","data":{"layout":"section"},"#,
            r#""frames":{"mobile":{"x":0,"y":0,"w":390,"h":300},"tablet":{"x":0,"y":0,"w":820,"h":300},"#,
            r#""desktop":{"x":0,"y":0,"w":1200,"h":400.5,"z":2}},"meta":{"name":"Hero"},"#,
            r#""nodes":[{"id":"title","type":"text","data":{"text":"Hello","variant":"h1"},"#,
            r#""frames":{"mobile":{"x":10,"y":10,"w":300,"h":40},"tablet":{"x":10,"y":10,"w":300,"h":40},"#,
            r##""desktop":{"x":10,"y":10,"w":300,"h":40}},"style":{"base":{"color":"#333","fontSize":"24px"}}}]}],"##,
            r#""canvas":{"snapPx":4,"widths":{"mobile":390,"tablet":820,"desktop":1200},"minHeightPx":800},"#,
            r#""template":{"id":"main"}}"#
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let once = serialize(&sample()).unwrap();
        let twice = serialize(&parse_str(&once)).unwrap();
        assert_eq!(once, twice);
        assert_eq!(parse_str(&once), sample());
    }

    #[test]
    fn test_dirty_ignores_formatting() {
        let doc = sample();
        let pretty = serialize_pretty(&doc).unwrap();
        assert!(!is_dirty(&pretty, &doc));

        let moved = doc
            .update_node("title", |node| {
                node.frames.set(Breakpoint::Mobile, Frame::new(20.0, 10.0, 300.0, 40.0));
            })
            .unwrap();
        assert!(is_dirty(&pretty, &moved));
    }

    #[test]
    fn test_unsaved_document_is_dirty_once_it_has_content() {
        let empty = Document::default();
        assert!(!is_dirty("", &empty));

        let doc = Document::from_nodes(
            vec![Node::new("a", NodeKind::text("a"), Frame::new(0.0, 0.0, 1.0, 1.0))],
            Default::default(),
            Default::default(),
            &Default::default(),
        )
        .unwrap();
        assert!(is_dirty("", &doc));
    }
}
