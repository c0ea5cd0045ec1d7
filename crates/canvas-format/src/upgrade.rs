//! Upgrade of row/column/block documents to the free-canvas graph.
//!
//! Legacy documents stack rows vertically; each row lays its columns out
//! side by side (stacked on mobile) and each column stacks its blocks.
//! The output uses canvas-absolute coordinates like every current node.

use serde_json::{json, Map, Value};

use canvas_api::{Breakpoint, CanvasSettings, PerBreakpoint, CANONICAL_VERSION};

const MIN_COLUMN_WIDTH: f64 = 80.0;
const MIN_SECTION_HEIGHT: f64 = 160.0;
const BLOCK_GAP: f64 = 12.0;
const COLUMN_GAP_MOBILE: f64 = 12.0;
const ROW_GAP: f64 = 24.0;

/// Whether `raw` looks like a row/column document.
pub fn is_legacy_rows(raw: &Map<String, Value>) -> bool {
    legacy_rows(raw).is_some()
}

fn legacy_rows(raw: &Map<String, Value>) -> Option<&Vec<Value>> {
    raw.get("layout")
        .and_then(Value::as_object)
        .and_then(|layout| layout.get("rows"))
        .or_else(|| raw.get("rows"))
        .and_then(Value::as_array)
}

/// Default block height by (upgraded) block type.
fn block_height(node_type: &str) -> f64 {
    match node_type {
        "image" => 220.0,
        "editor" | "tiptap" => 180.0,
        "button" => 56.0,
        "separator" => 24.0,
        _ => 96.0,
    }
}

fn block_type(raw_type: &str) -> String {
    match raw_type {
        "text" | "typography" | "paragraph" | "heading" => "typography".to_string(),
        "tiptap" | "editor" => "editor".to_string(),
        other => other.to_string(),
    }
}

fn safe_id(raw: Option<&Value>, fallback: String) -> String {
    match raw.and_then(Value::as_str).map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => fallback,
    }
}

fn object_field<'a>(raw: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    raw.get(key).and_then(Value::as_object)
}

fn array_field<'a>(raw: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    raw.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn frames_json(frames: PerBreakpoint<[f64; 4]>) -> Value {
    let mut out = Map::new();
    for (bp, [x, y, w, h]) in frames.iter() {
        out.insert(bp.as_str().to_string(), json!({"x": x, "y": y, "w": w, "h": h}));
    }
    Value::Object(out)
}

/// Column widths as percentages summing to 100.
fn normalized_sizes(settings: Option<&Map<String, Value>>, columns: usize) -> Vec<f64> {
    let even = 100.0 / columns.max(1) as f64;
    let sizes = settings.map(|s| array_field(s, "sizes")).unwrap_or(&[]);
    let raw: Vec<f64> = (0..columns)
        .map(|i| match sizes.get(i).and_then(Value::as_f64) {
            Some(size) if size > 0.0 && size.is_finite() => size,
            _ => even,
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    if sum <= 0.0 {
        return vec![even; columns];
    }
    raw.into_iter().map(|size| size / sum * 100.0).collect()
}

/// Rewrite a row/column document into a current-version document value.
///
/// Canvas settings are reset to the defaults the legacy widths assumed;
/// a `template` reference is carried over.
pub fn upgrade_rows(raw: &Map<String, Value>) -> Value {
    let widths = CanvasSettings::default().widths.map(|_, w| f64::from(*w));
    let mut page_y = PerBreakpoint::splat(0.0_f64);
    let mut rows_out = Vec::new();

    for (row_index, row) in legacy_rows(raw).map(Vec::as_slice).unwrap_or(&[]).iter().enumerate() {
        let Some(row) = row.as_object() else { continue };
        let columns = array_field(row, "columns");
        if columns.is_empty() {
            continue;
        }
        let sizes = normalized_sizes(object_field(row, "settings"), columns.len());

        let mut col_x = PerBreakpoint::splat(0.0_f64);
        let mut stack_y_mobile = 0.0;
        let mut row_h = PerBreakpoint::splat(0.0_f64);
        let mut columns_out = Vec::new();

        for (col_index, column) in columns.iter().enumerate() {
            let Some(column) = column.as_object() else { continue };
            let pct = sizes[col_index];
            let col_w = PerBreakpoint::new(
                widths.mobile,
                (widths.tablet * pct / 100.0).round().max(MIN_COLUMN_WIDTH),
                (widths.desktop * pct / 100.0).round().max(MIN_COLUMN_WIDTH),
            );
            let col_origin = PerBreakpoint::new(
                (0.0, page_y.mobile + stack_y_mobile),
                (col_x.tablet, page_y.tablet),
                (col_x.desktop, page_y.desktop),
            );

            let mut block_y = 0.0;
            let mut blocks_out = Vec::new();
            for (block_index, block) in array_field(column, "blocks").iter().enumerate() {
                let Some(block) = block.as_object() else { continue };
                let raw_type = block
                    .get("type")
                    .and_then(Value::as_str)
                    .map(|t| t.trim().to_ascii_lowercase())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "unknown".to_string());
                let node_type = block_type(&raw_type);
                let h = block_height(&node_type);
                let data = block
                    .get("data")
                    .filter(|d| d.is_object())
                    .cloned()
                    .unwrap_or_else(|| json!({}));

                let frames = PerBreakpoint::new(
                    [col_origin.mobile.0, col_origin.mobile.1 + block_y, col_w.mobile, h],
                    [col_origin.tablet.0, col_origin.tablet.1 + block_y, col_w.tablet, h],
                    [col_origin.desktop.0, col_origin.desktop.1 + block_y, col_w.desktop, h],
                );
                blocks_out.push(json!({
                    "id": safe_id(block.get("id"), format!("blk_{}_{}_{}", row_index, col_index, block_index)),
                    "type": node_type,
                    "data": data,
                    "frames": frames_json(frames),
                }));
                block_y += h + BLOCK_GAP;
            }

            let col_h = if blocks_out.is_empty() {
                MIN_SECTION_HEIGHT
            } else {
                block_y.max(MIN_SECTION_HEIGHT)
            };
            row_h.tablet = row_h.tablet.max(col_h);
            row_h.desktop = row_h.desktop.max(col_h);

            let frames = PerBreakpoint::new(
                [col_origin.mobile.0, col_origin.mobile.1, col_w.mobile, col_h],
                [col_origin.tablet.0, col_origin.tablet.1, col_w.tablet, col_h],
                [col_origin.desktop.0, col_origin.desktop.1, col_w.desktop, col_h],
            );
            columns_out.push(json!({
                "id": safe_id(column.get("id"), format!("col_{}_{}", row_index, col_index)),
                "type": "frame",
                "data": {"layout": "box", "label": format!("Column {}", col_index + 1)},
                "frames": frames_json(frames),
                "nodes": blocks_out,
            }));

            col_x.tablet += col_w.tablet;
            col_x.desktop += col_w.desktop;
            stack_y_mobile += col_h + COLUMN_GAP_MOBILE;
        }

        row_h.mobile = if stack_y_mobile > 0.0 {
            (stack_y_mobile - COLUMN_GAP_MOBILE).max(MIN_SECTION_HEIGHT)
        } else {
            MIN_SECTION_HEIGHT
        };
        row_h.tablet = row_h.tablet.max(MIN_SECTION_HEIGHT);
        row_h.desktop = row_h.desktop.max(MIN_SECTION_HEIGHT);

        let frames = row_h.map(|bp, h| [0.0, *page_y.get(bp), *widths.get(bp), *h]);
        rows_out.push(json!({
            "id": safe_id(row.get("id"), format!("row_{}", row_index)),
            "type": "frame",
            "data": {"layout": "flex", "label": format!("Row {}", row_index + 1)},
            "frames": frames_json(frames),
            "nodes": columns_out,
        }));

        for bp in Breakpoint::ALL {
            *page_y.get_mut(bp) += *row_h.get(bp) + ROW_GAP;
        }
    }

    let mut out = Map::new();
    out.insert("version".to_string(), json!(CANONICAL_VERSION));
    out.insert("nodes".to_string(), Value::Array(rows_out));
    if let Some(template) = raw.get("template") {
        out.insert("template".to_string(), template.clone());
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_of<'a>(node: &'a Value, bp: &str) -> &'a Value {
        &node["frames"][bp]
    }

    #[test]
    fn test_detects_row_documents() {
        let raw = json!({"version": 3, "layout": {"rows": []}});
        assert!(is_legacy_rows(raw.as_object().unwrap()));
        let raw = json!({"rows": []});
        assert!(is_legacy_rows(raw.as_object().unwrap()));
        let raw = json!({"nodes": []});
        assert!(!is_legacy_rows(raw.as_object().unwrap()));
    }

    #[test]
    fn test_columns_split_by_sizes_and_stack_on_mobile() {
        let raw = json!({
            "version": 3,
            "layout": {"rows": [{
                "id": "r1",
                "settings": {"sizes": [25, 75]},
                "columns": [
                    {"id": "c1", "blocks": [{"id": "b1", "type": "image", "data": {"url": "/a.png"}}]},
                    {"blocks": [{"type": "heading"}, {"type": "button"}]}
                ]
            }]}
        });
        let out = upgrade_rows(raw.as_object().unwrap());
        let row = &out["nodes"][0];
        assert_eq!(row["id"], "r1");
        assert_eq!(row["data"]["layout"], "flex");

        let c1 = &row["nodes"][0];
        let c2 = &row["nodes"][1];
        assert_eq!(frame_of(c1, "desktop")["w"], json!(300.0));
        assert_eq!(frame_of(c2, "desktop")["x"], json!(300.0));
        assert_eq!(frame_of(c2, "desktop")["w"], json!(900.0));
        assert_eq!(c2["id"], "col_0_1");

        // column 1 holds one image (220 + 12); mobile stacks column 2 below it
        assert_eq!(frame_of(c1, "mobile")["h"], json!(232.0));
        assert_eq!(frame_of(c2, "mobile")["y"], json!(244.0));
        assert_eq!(frame_of(c2, "mobile")["w"], json!(390.0));

        let button = &c2["nodes"][1];
        assert_eq!(button["type"], "button");
        assert_eq!(frame_of(button, "desktop")["y"], json!(108.0));
        assert_eq!(frame_of(button, "mobile")["y"], json!(244.0 + 108.0));
        assert_eq!(c2["nodes"][0]["type"], "typography");
    }

    #[test]
    fn test_rows_stack_with_gap_and_min_height() {
        let raw = json!({"rows": [
            {"columns": [{"blocks": []}]},
            {"columns": [{"blocks": [{"type": "separator"}]}]},
            {"columns": []}
        ]});
        let out = upgrade_rows(raw.as_object().unwrap());
        let rows = out["nodes"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(frame_of(&rows[0], "desktop")["h"], json!(160.0));
        assert_eq!(frame_of(&rows[1], "desktop")["y"], json!(184.0));
        assert_eq!(frame_of(&rows[1], "tablet")["w"], json!(820.0));
        assert_eq!(rows[1]["id"], "row_1");
        assert_eq!(out["version"], json!(6));
    }

    #[test]
    fn test_unknown_block_types_keep_their_tag() {
        let raw = json!({"rows": [{"columns": [{"blocks": [{"type": "Carousel", "data": {"n": 3}}]}]}]});
        let out = upgrade_rows(raw.as_object().unwrap());
        let block = &out["nodes"][0]["nodes"][0]["nodes"][0];
        assert_eq!(block["type"], "carousel");
        assert_eq!(block["data"], json!({"n": 3}));
        assert_eq!(frame_of(block, "desktop")["h"], json!(96.0));
    }
}
