//! Outline projection: the layer panel's view of a document.
//!
//! Read-only. Rows come out in display order, which sorts siblings by
//! descending z at the active breakpoint; storage order is untouched.

use canvas_api::walk::find_first;
use canvas_api::{Breakpoint, Document, Node, NodeKind};
use serde::Serialize;
use std::sync::Arc;

/// Icon shown next to an outline row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconKind {
    Frame,
    Shape,
    Text,
    Editor,
    Image,
    Menu,
    Slot,
    CollectionList,
    Button,
    Separator,
    Unknown,
}

impl IconKind {
    pub fn for_kind(kind: &NodeKind) -> Self {
        match kind {
            NodeKind::Frame(_) => IconKind::Frame,
            NodeKind::Shape(_) => IconKind::Shape,
            NodeKind::Text(_) => IconKind::Text,
            NodeKind::Editor(_) => IconKind::Editor,
            NodeKind::Image(_) => IconKind::Image,
            NodeKind::Menu(_) => IconKind::Menu,
            NodeKind::Slot(_) => IconKind::Slot,
            NodeKind::CollectionList(_) => IconKind::CollectionList,
            NodeKind::Button(_) => IconKind::Button,
            NodeKind::Separator(_) => IconKind::Separator,
            NodeKind::Unknown(_) => IconKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineRow {
    pub id: String,
    pub parent_id: Option<String>,
    pub depth: usize,
    pub label: String,
    pub icon: IconKind,
    /// Effective z at the breakpoint; missing z is 0
    pub z: f64,
    pub hidden: bool,
    pub collapsed: bool,
    pub has_children: bool,
    /// The node itself matched the search query
    pub matched: bool,
}

/// Project `doc` into outline rows at `breakpoint`.
///
/// Without a query, children of collapsed nodes are omitted. With a
/// non-blank query, a node is shown when it or a descendant matches
/// (case-insensitive substring of label, type or id); collapsed ancestors
/// are expanded to reveal matches.
pub fn outline(doc: &Document, breakpoint: Breakpoint, query: Option<&str>) -> Vec<OutlineRow> {
    let query = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);
    let mut rows = Vec::new();
    project(doc.nodes(), None, 0, breakpoint, query.as_deref(), &mut rows);
    rows
}

fn project(
    nodes: &[Arc<Node>],
    parent: Option<&Node>,
    depth: usize,
    breakpoint: Breakpoint,
    query: Option<&str>,
    rows: &mut Vec<OutlineRow>,
) {
    for node in display_order(nodes, breakpoint) {
        let matched = query.is_some_and(|q| matches_query(node, q));
        if let Some(q) = query {
            if !matched && !subtree_matches(&node.nodes, q) {
                continue;
            }
        }

        rows.push(OutlineRow {
            id: node.id.clone(),
            parent_id: parent.map(|p| p.id.clone()),
            depth,
            label: node.label(),
            icon: IconKind::for_kind(&node.kind),
            z: node.frame(breakpoint).z_or_default(),
            hidden: node.meta.hidden,
            collapsed: node.meta.collapsed,
            has_children: !node.nodes.is_empty(),
            matched,
        });

        if query.is_some() || !node.meta.collapsed {
            project(&node.nodes, Some(node), depth + 1, breakpoint, query, rows);
        }
    }
}

/// Siblings by descending z; on ties the later-stored node comes first.
pub fn display_order(nodes: &[Arc<Node>], breakpoint: Breakpoint) -> Vec<&Node> {
    let mut order: Vec<(usize, &Node)> = nodes.iter().map(|n| n.as_ref()).enumerate().collect();
    order.sort_by(|(ia, a), (ib, b)| {
        let za = a.frame(breakpoint).z_or_default();
        let zb = b.frame(breakpoint).z_or_default();
        zb.total_cmp(&za).then_with(|| ib.cmp(ia))
    });
    order.into_iter().map(|(_, node)| node).collect()
}

fn matches_query(node: &Node, query: &str) -> bool {
    node.label().to_lowercase().contains(query)
        || node.type_tag().to_lowercase().contains(query)
        || node.id.to_lowercase().contains(query)
}

fn subtree_matches(nodes: &[Arc<Node>], query: &str) -> bool {
    find_first(nodes, |node| matches_query(node, query)).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_api::{CanvasSettings, EngineLimits, Frame, FrameLayout, Meta, TemplateRef};
    use serde_json::json;

    fn text(id: &str, content: &str, z: Option<f64>) -> Node {
        let mut frame = Frame::new(0.0, 0.0, 100.0, 20.0);
        frame.z = z;
        Node::new(id, NodeKind::text(content), frame)
    }

    fn sample(collapsed: bool) -> Document {
        let hero = Node::new(
            "hero",
            NodeKind::frame(FrameLayout::Section),
            Frame::new(0.0, 0.0, 1200.0, 400.0),
        )
        .with_meta(Meta {
            collapsed,
            ..Meta::named("Hero")
        })
        .with_children(vec![
            text("t1", "Welcome to the shop", Some(1.0)),
            text("t2", "Free shipping", Some(5.0)),
            Node::new("logo", NodeKind::image("/logo.png", "Logo"), Frame::new(0.0, 0.0, 10.0, 10.0)),
        ]);
        let menu = Node::new(
            "nav",
            NodeKind::from_parts("menu", json!({"menu": "main"})).unwrap(),
            Frame::new(0.0, 0.0, 1200.0, 60.0),
        );
        Document::from_nodes(
            vec![hero, menu],
            CanvasSettings::default(),
            TemplateRef::default(),
            &EngineLimits::default(),
        )
        .unwrap()
    }

    fn ids(rows: &[OutlineRow]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_rows_sorted_by_descending_z_then_later_first() {
        let rows = outline(&sample(false), Breakpoint::Desktop, None);
        // hero and nav both z 0: nav was stored later
        assert_eq!(ids(&rows), vec!["nav", "hero", "t2", "t1", "logo"]);

        let t2 = &rows[2];
        assert_eq!(t2.parent_id.as_deref(), Some("hero"));
        assert_eq!(t2.depth, 1);
        assert_eq!(t2.z, 5.0);
        assert_eq!(t2.icon, IconKind::Text);
    }

    #[test]
    fn test_labels() {
        let rows = outline(&sample(false), Breakpoint::Desktop, None);
        let label = |id: &str| rows.iter().find(|r| r.id == id).unwrap().label.clone();
        assert_eq!(label("hero"), "Hero");
        assert_eq!(label("nav"), "menu:main");
        assert_eq!(label("logo"), "Logo");
        assert_eq!(label("t1"), "Welcome to the shop");
    }

    #[test]
    fn test_collapsed_children_hidden_without_query() {
        let rows = outline(&sample(true), Breakpoint::Desktop, None);
        assert_eq!(ids(&rows), vec!["nav", "hero"]);
        assert!(rows[1].collapsed);
        assert!(rows[1].has_children);
    }

    #[test]
    fn test_search_keeps_ancestors_and_expands_collapsed() {
        let rows = outline(&sample(true), Breakpoint::Desktop, Some("  SHIPPING "));
        assert_eq!(ids(&rows), vec!["hero", "t2"]);
        assert!(!rows[0].matched);
        assert!(rows[1].matched);

        let rows = outline(&sample(false), Breakpoint::Desktop, Some("image"));
        assert_eq!(ids(&rows), vec!["hero", "logo"]);

        assert!(outline(&sample(false), Breakpoint::Desktop, Some("zzz")).is_empty());
    }

    #[test]
    fn test_blank_query_is_no_query() {
        let doc = sample(false);
        assert_eq!(
            outline(&doc, Breakpoint::Mobile, Some("   ")),
            outline(&doc, Breakpoint::Mobile, None)
        );
    }
}
