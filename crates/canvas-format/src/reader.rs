//! Lenient, total parsing of stored documents.
//!
//! Parsing never fails. Anything that cannot be admitted is dropped and
//! recorded in [`ParseOutcome::dropped`]: an invalid node takes its subtree
//! with it but never its siblings, an invalid canvas field falls back to
//! its default, and unrecognized input yields the default document.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use canvas_api::validate::validate_shallow;
use canvas_api::{
    Breakpoint, CanvasSettings, Document, EngineError, EngineLimits, Frame, Meta, Node, NodeKind,
    PerBreakpoint, TemplateRef, UnknownData, CANONICAL_VERSION, MIN_CANVAS_DIMENSION,
    SNAP_PX_RANGE,
};
use canvas_style::StyleSanitizer;

use crate::upgrade::{is_legacy_rows, upgrade_rows};

/// Versions whose node graph is read as-is.
pub const COMPATIBLE_VERSIONS: [u32; 2] = [4, CANONICAL_VERSION];
/// Row/column documents upgraded on read.
pub const LEGACY_ROWS_VERSION: u32 = 3;

/// Result of [`parse_with_report`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub document: Document,
    /// `version` found in the input, if it had one
    pub source_version: Option<u32>,
    /// The input was a legacy row/column document
    pub upgraded: bool,
    /// Everything that was discarded, in input order
    pub dropped: Vec<EngineError>,
}

impl ParseOutcome {
    fn fallback(source_version: Option<u32>, reason: impl Into<String>) -> Self {
        let err = EngineError::InvalidDocument {
            reason: reason.into(),
        };
        debug!("Falling back to the default document: {}", err);
        Self {
            document: Document::default(),
            source_version,
            upgraded: false,
            dropped: vec![err],
        }
    }

    /// Nodes dropped while parsing.
    pub fn dropped_nodes(&self) -> impl Iterator<Item = &EngineError> {
        self.dropped
            .iter()
            .filter(|e| matches!(e, EngineError::InvalidNode { .. }))
    }
}

/// Parse stored JSON into a document with the default limits.
pub fn parse(raw: &Value) -> Document {
    parse_with_report(raw, &EngineLimits::default()).document
}

/// Parse stored text. Text that is not JSON yields the default document.
pub fn parse_str(text: &str) -> Document {
    parse_str_with_report(text, &EngineLimits::default()).document
}

pub fn parse_str_with_report(text: &str, limits: &EngineLimits) -> ParseOutcome {
    if text.trim().is_empty() {
        return ParseOutcome {
            document: Document::default(),
            source_version: None,
            upgraded: false,
            dropped: Vec::new(),
        };
    }
    match serde_json::from_str::<Value>(text) {
        Ok(raw) => parse_with_report(&raw, limits),
        Err(err) => ParseOutcome::fallback(None, format!("invalid JSON: {}", err)),
    }
}

/// Parse stored JSON and report what was upgraded or dropped.
pub fn parse_with_report(raw: &Value, limits: &EngineLimits) -> ParseOutcome {
    let root = match raw {
        Value::Null => {
            return ParseOutcome {
                document: Document::default(),
                source_version: None,
                upgraded: false,
                dropped: Vec::new(),
            }
        }
        Value::Object(root) => root,
        _ => return ParseOutcome::fallback(None, "root must be an object"),
    };

    let version = match root.get("version") {
        None | Some(Value::Null) => None,
        Some(v) => match v.as_u64().and_then(|v| u32::try_from(v).ok()) {
            Some(v) => Some(v),
            None => return ParseOutcome::fallback(None, format!("unsupported version {}", v)),
        },
    };

    let legacy = match version {
        Some(LEGACY_ROWS_VERSION) => true,
        Some(v) if COMPATIBLE_VERSIONS.contains(&v) => false,
        Some(v) => return ParseOutcome::fallback(version, format!("unsupported version {}", v)),
        None => is_legacy_rows(root),
    };

    let mut reader = DocumentReader::new(limits);
    let document = if legacy {
        debug!("Upgrading row/column document (version {:?})", version);
        match upgrade_rows(root) {
            Value::Object(upgraded) => reader.read(&upgraded),
            _ => Document::default(),
        }
    } else {
        reader.read(root)
    };

    ParseOutcome {
        document,
        source_version: version,
        upgraded: legacy,
        dropped: reader.dropped,
    }
}

// =============================================================================
// Reader
// =============================================================================

struct DocumentReader<'l> {
    limits: &'l EngineLimits,
    seen: HashSet<String>,
    count: usize,
    dropped: Vec<EngineError>,
}

impl<'l> DocumentReader<'l> {
    fn new(limits: &'l EngineLimits) -> Self {
        Self {
            limits,
            seen: HashSet::new(),
            count: 0,
            dropped: Vec::new(),
        }
    }

    fn read(&mut self, root: &Map<String, Value>) -> Document {
        let canvas = self.read_canvas(root.get("canvas"));
        let template = self.read_template(root.get("template"));

        let raw_nodes = root
            .get("layout")
            .and_then(Value::as_object)
            .and_then(|layout| layout.get("nodes"))
            .or_else(|| root.get("nodes"));
        let nodes = match raw_nodes {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => self.read_list(items, 0, "nodes"),
            Some(_) => {
                self.drop_document("nodes must be an array");
                Vec::new()
            }
        };

        let nodes: Vec<Node> = nodes.into_iter().map(Arc::unwrap_or_clone).collect();
        match Document::from_nodes(nodes, canvas.clone(), template.clone(), self.limits) {
            Ok(doc) => doc,
            Err(err) => {
                warn!("Admitted nodes failed document validation: {}", err);
                self.dropped.push(err);
                Document::new(canvas, template)
            }
        }
    }

    fn read_list(&mut self, items: &[Value], depth: usize, path: &str) -> Vec<Arc<Node>> {
        let mut out = Vec::with_capacity(items.len());
        for (i, raw) in items.iter().enumerate() {
            let node_path = format!("{}[{}]", path, i);
            match self.read_node(raw, depth, &node_path) {
                Ok(node) => out.push(Arc::new(node)),
                Err(err) => {
                    debug!("Dropping node at {}: {}", node_path, err);
                    self.dropped.push(err);
                }
            }
        }
        out
    }

    /// Read one node. The node's own fields are fully checked before its id
    /// is claimed; children are read afterwards and fail individually.
    fn read_node(&mut self, raw: &Value, depth: usize, path: &str) -> canvas_api::Result<Node> {
        let obj = raw
            .as_object()
            .ok_or_else(|| EngineError::invalid_node(path, "node must be an object"))?;

        let id = match obj.get("id").and_then(Value::as_str).map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(EngineError::invalid_node(path, "id must be a non-empty string")),
        };
        if self.seen.contains(&id) {
            return Err(EngineError::invalid_node(&id, "duplicate id"));
        }
        if self.count >= self.limits.max_nodes {
            return Err(EngineError::invalid_node(
                &id,
                format!("exceeds max node count {}", self.limits.max_nodes),
            ));
        }

        let type_tag = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::invalid_node(&id, "type must be a string"))?;
        let data = obj.get("data").cloned().unwrap_or(Value::Null);
        let mut kind =
            NodeKind::from_parts(type_tag, data).map_err(|reason| EngineError::invalid_node(&id, reason))?;

        let frames = read_frames(obj.get("frames")).map_err(|reason| EngineError::invalid_node(&id, reason))?;

        let meta = match obj.get("meta") {
            None | Some(Value::Null) => Meta::default(),
            Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
                .map_err(|e| EngineError::invalid_node(&id, format!("meta: {}", e)))?,
            Some(_) => return Err(EngineError::invalid_node(&id, "meta must be an object")),
        };

        let mut raw_children = &[][..];
        if let NodeKind::Unknown(UnknownData { nodes, .. }) = &mut kind {
            *nodes = obj.get("nodes").filter(|v| !v.is_null()).cloned();
        } else {
            raw_children = match obj.get("nodes") {
                None | Some(Value::Null) => &[][..],
                Some(Value::Array(items)) => items.as_slice(),
                Some(_) => return Err(EngineError::invalid_node(&id, "nodes must be an array")),
            };
        }
        if !kind.is_container() && !raw_children.is_empty() {
            return Err(EngineError::invalid_node(
                &id,
                format!("'{}' nodes cannot have children", kind.type_tag()),
            ));
        }

        let mut node = Node::new(id.clone(), kind, Frame::new(0.0, 0.0, 0.0, 0.0))
            .with_frames(frames)
            .with_meta(meta);
        validate_shallow(&node, depth, self.limits)?;

        if let Some(raw_style) = obj.get("style") {
            let mut sanitizer = StyleSanitizer::new(self.limits);
            node.style = sanitizer.sanitize(raw_style);
            self.dropped.extend(sanitizer.into_rejected());
        }

        self.seen.insert(id);
        self.count += 1;

        if node.is_container() {
            node.nodes = self.read_list(raw_children, depth + 1, &format!("{}.nodes", path));
        }
        Ok(node)
    }

    fn read_canvas(&mut self, raw: Option<&Value>) -> CanvasSettings {
        let mut canvas = CanvasSettings::default();
        let obj = match raw {
            None | Some(Value::Null) => return canvas,
            Some(Value::Object(obj)) => obj,
            Some(_) => {
                self.drop_document("canvas must be an object");
                return canvas;
            }
        };

        if let Some(value) = obj.get("snapPx") {
            let (min_snap, max_snap) = SNAP_PX_RANGE;
            match bounded(value, min_snap.into(), max_snap.into()) {
                Some(snap) => canvas.snap_px = snap,
                None => self.drop_document(format!(
                    "canvas.snapPx must be between {} and {}",
                    min_snap, max_snap
                )),
            }
        }
        if let Some(widths) = obj.get("widths") {
            match widths.as_object() {
                Some(widths) => {
                    for bp in Breakpoint::ALL {
                        let Some(value) = widths.get(bp.as_str()) else {
                            continue;
                        };
                        match bounded(value, MIN_CANVAS_DIMENSION.into(), self.limits.max_coord) {
                            Some(w) => canvas.widths.set(bp, w),
                            None => self.drop_document(format!(
                                "canvas.widths.{} must be between {} and {}",
                                bp, MIN_CANVAS_DIMENSION, self.limits.max_coord
                            )),
                        }
                    }
                }
                None => self.drop_document("canvas.widths must be an object"),
            }
        }
        if let Some(value) = obj.get("minHeightPx") {
            match bounded(value, MIN_CANVAS_DIMENSION.into(), self.limits.max_coord) {
                Some(h) => canvas.min_height_px = h,
                None => self.drop_document(format!(
                    "canvas.minHeightPx must be between {} and {}",
                    MIN_CANVAS_DIMENSION, self.limits.max_coord
                )),
            }
        }
        canvas
    }

    fn read_template(&mut self, raw: Option<&Value>) -> TemplateRef {
        let obj = match raw {
            None | Some(Value::Null) => return TemplateRef::default(),
            Some(Value::Object(obj)) => obj,
            Some(_) => {
                self.drop_document("template must be an object");
                return TemplateRef::default();
            }
        };

        let mut template = TemplateRef::default();
        for (key, value) in obj {
            let slot = match key.as_str() {
                "id" => &mut template.id,
                "menu" => &mut template.menu,
                "footer" => &mut template.footer,
                _ => {
                    template.extra.insert(key.clone(), value.clone());
                    continue;
                }
            };
            *slot = match value {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                Value::Null => None,
                Value::String(_) => None,
                _ => {
                    self.drop_document(format!("template.{} must be a string", key));
                    None
                }
            };
        }
        template
    }

    fn drop_document(&mut self, reason: impl Into<String>) {
        let err = EngineError::InvalidDocument {
            reason: reason.into(),
        };
        debug!("{}", err);
        self.dropped.push(err);
    }
}

/// Whole number in `[min, max]`; fractional values are rounded.
fn bounded(value: &Value, min: f64, max: f64) -> Option<u32> {
    let n = value.as_f64().filter(|n| n.is_finite())?.round();
    (min..=max).contains(&n).then_some(n as u32)
}

fn read_frames(raw: Option<&Value>) -> std::result::Result<PerBreakpoint<Frame>, String> {
    let obj = raw
        .and_then(Value::as_object)
        .ok_or_else(|| "frames must be an object".to_string())?;
    let frame = |bp: Breakpoint| -> std::result::Result<Frame, String> {
        let value = obj
            .get(bp.as_str())
            .ok_or_else(|| format!("frames.{} is missing", bp))?;
        serde_json::from_value(value.clone()).map_err(|e| format!("frames.{}: {}", bp, e))
    };
    Ok(PerBreakpoint::new(
        frame(Breakpoint::Mobile)?,
        frame(Breakpoint::Tablet)?,
        frame(Breakpoint::Desktop)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frames(y: f64, h: f64) -> Value {
        json!({
            "mobile": {"x": 0, "y": y, "w": 390, "h": h},
            "tablet": {"x": 0, "y": y, "w": 820, "h": h},
            "desktop": {"x": 0, "y": y, "w": 1200, "h": h}
        })
    }

    fn text(id: &str) -> Value {
        json!({"id": id, "type": "text", "data": {"text": id}, "frames": frames(0.0, 20.0)})
    }

    #[test]
    fn test_missing_or_garbage_input_yields_default() {
        assert_eq!(parse(&Value::Null), Document::default());
        assert_eq!(parse(&json!([1, 2])), Document::default());
        assert_eq!(parse(&json!({"version": 99, "nodes": [text("a")]})), Document::default());
        assert_eq!(parse_str("not json"), Document::default());
        assert_eq!(parse_str(""), Document::default());
    }

    #[test]
    fn test_invalid_node_does_not_take_siblings() {
        let raw = json!({
            "version": 6,
            "nodes": [
                text("a"),
                {"id": "bad", "type": "text", "frames": frames(0.0, -5.0)},
                {"id": "t", "type": "text", "frames": frames(0.0, 5.0), "nodes": [text("child")]},
                text("b")
            ]
        });
        let outcome = parse_with_report(&raw, &EngineLimits::default());
        let ids: Vec<&str> = outcome.document.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(outcome.dropped_nodes().count(), 2);
        assert!(!outcome.document.contains("child"));
    }

    #[test]
    fn test_invalid_child_keeps_parent() {
        let raw = json!({
            "version": 4,
            "layout": {"nodes": [{
                "id": "box",
                "type": "frame",
                "data": {"layout": "grid"},
                "frames": frames(0.0, 300.0),
                "nodes": [text("ok"), {"id": "nope", "type": "image", "data": "x", "frames": frames(0.0, 1.0)}]
            }]}
        });
        let doc = parse(&raw);
        assert!(doc.contains("box"));
        assert!(doc.contains("ok"));
        assert!(!doc.contains("nope"));
    }

    #[test]
    fn test_shape_keeps_nested_nodes() {
        let raw = json!({"version": 4, "nodes": [{
            "id": "badge",
            "type": "shape",
            "data": {"shape": "circle"},
            "frames": frames(0.0, 200.0),
            "nodes": [text("badge-label")]
        }]});
        let outcome = parse_with_report(&raw, &EngineLimits::default());
        assert!(outcome.dropped.is_empty());
        assert_eq!(
            outcome.document.parent_of("badge-label").map(|n| n.id.as_str()),
            Some("badge")
        );
    }

    #[test]
    fn test_later_duplicate_ids_are_dropped() {
        let raw = json!({"nodes": [text("a"), text(" a "), text("b")]});
        let doc = parse(&raw);
        assert_eq!(doc.node_count(), 2);
        assert_eq!(doc.find("a").map(|n| n.type_tag()), Some("text"));
    }

    #[test]
    fn test_missing_breakpoint_frame_is_rejected() {
        let raw = json!({"nodes": [{
            "id": "a",
            "type": "text",
            "frames": {"mobile": {"x": 0, "y": 0, "w": 1, "h": 1}}
        }]});
        assert!(parse(&raw).is_empty());
    }

    #[test]
    fn test_limits_apply() {
        let limits = EngineLimits {
            max_nodes: 2,
            max_depth: 1,
            ..Default::default()
        };
        let nested = json!({
            "id": "l0", "type": "frame", "frames": frames(0.0, 10.0),
            "nodes": [{
                "id": "l1", "type": "frame", "frames": frames(0.0, 10.0),
                "nodes": [text("l2")]
            }]
        });
        let outcome = parse_with_report(&json!({"nodes": [nested, text("extra")]}), &limits);
        assert!(outcome.document.contains("l1"));
        assert!(!outcome.document.contains("l2"));
        assert!(!outcome.document.contains("extra"));
    }

    #[test]
    fn test_unknown_nodes_keep_raw_payload_and_children() {
        let raw = json!({"nodes": [{
            "id": "x",
            "type": "carousel",
            "data": {"slides": [1, 2]},
            "frames": frames(0.0, 10.0),
            "nodes": [{"whatever": true}]
        }]});
        let doc = parse(&raw);
        match &doc.find("x").unwrap().kind {
            NodeKind::Unknown(u) => {
                assert_eq!(u.original_type, "carousel");
                assert_eq!(u.nodes, Some(json!([{"whatever": true}])));
            }
            other => panic!("expected unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_canvas_fields_are_bounded() {
        let raw = json!({
            "canvas": {"snapPx": 8, "widths": {"mobile": 100, "tablet": 900}, "minHeightPx": 1200.4},
            "template": {"id": 12, "menu": "main", "theme": "dark"}
        });
        let outcome = parse_with_report(&raw, &EngineLimits::default());
        let canvas = &outcome.document.canvas;
        assert_eq!(canvas.snap_px, 8);
        assert_eq!(canvas.widths, PerBreakpoint::new(390, 900, 1200));
        assert_eq!(canvas.min_height_px, 1200);
        assert_eq!(outcome.dropped.len(), 1);
        assert!(canvas.validate(&EngineLimits::default()).is_ok());

        let template = &outcome.document.template;
        assert_eq!(template.id.as_deref(), Some("12"));
        assert_eq!(template.menu.as_deref(), Some("main"));
        assert_eq!(template.extra.get("theme"), Some(&json!("dark")));
    }

    #[test]
    fn test_style_is_sanitized_on_read() {
        let raw = json!({"nodes": [{
            "id": "a",
            "type": "text",
            "frames": frames(0.0, 10.0),
            "style": {"color": "red", "width": "expression(alert(1))"}
        }]});
        let outcome = parse_with_report(&raw, &EngineLimits::default());
        let style = outcome.document.find("a").unwrap().style.clone().unwrap();
        assert_eq!(style.base.len(), 1);
        assert!(matches!(
            outcome.dropped[0],
            EngineError::SanitizationRejected { .. }
        ));
    }

    #[test]
    fn test_legacy_rows_are_upgraded() {
        let raw = json!({"version": 3, "layout": {"rows": [
            {"columns": [{"blocks": [{"id": "p", "type": "paragraph", "data": {"text": "Hi"}}]}]}
        ]}});
        let outcome = parse_with_report(&raw, &EngineLimits::default());
        assert!(outcome.upgraded);
        assert_eq!(outcome.source_version, Some(3));
        assert!(outcome.dropped.is_empty());
        assert_eq!(outcome.document.parent_of("p").map(|n| n.id.as_str()), Some("col_0_0"));
        assert_eq!(outcome.document.find("p").unwrap().kind, NodeKind::text("Hi"));
    }
}
