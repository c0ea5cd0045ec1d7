//! Render path: positioned, styled output for one breakpoint.
//!
//! The engine never calls media, menu or collection services itself. Each
//! rendered node carries the [`Reference`]s those services need, and
//! [`resolve_references`] runs them through a caller-supplied
//! [`ReferenceResolver`], turning failures into placeholders.

use canvas_api::{Breakpoint, Document, EngineError, Frame, InteractionState, Node, NodeKind, StyleMap};
use canvas_style::resolve_style;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::geometry::{compose_template, effective_height};

/// Identifier a collaborator resolves at render time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Reference {
    Media {
        url: String,
    },
    Menu {
        name: String,
    },
    Collection {
        type_slug: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sort: Option<String>,
    },
}

impl Reference {
    /// References carried by a node's payload.
    pub fn of(kind: &NodeKind) -> Vec<Reference> {
        let present = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        match kind {
            NodeKind::Image(data) => present(&data.url)
                .map(|url| Reference::Media { url })
                .into_iter()
                .collect(),
            NodeKind::Menu(data) => present(&data.menu)
                .map(|name| Reference::Menu { name })
                .into_iter()
                .collect(),
            NodeKind::CollectionList(data) => present(&data.type_slug)
                .map(|type_slug| Reference::Collection {
                    type_slug,
                    limit: data.limit,
                    sort: data.sort.clone(),
                })
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Short display form, e.g. `menu:main`.
    pub fn key(&self) -> String {
        match self {
            Reference::Media { url } => format!("media:{}", url),
            Reference::Menu { name } => format!("menu:{}", name),
            Reference::Collection { type_slug, .. } => format!("collection:{}", type_slug),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedNode {
    pub id: String,
    /// The node's `type` tag
    pub kind: String,
    pub frame: Frame,
    pub style: StyleMap,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderedNode>,
}

impl RenderedNode {
    fn translate(&mut self, dx: f64, dy: f64) {
        self.frame = self.frame.translate(dx, dy);
        for child in &mut self.children {
            child.translate(dx, dy);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedCanvas {
    pub breakpoint: Breakpoint,
    pub width: u32,
    pub height: f64,
    pub nodes: Vec<RenderedNode>,
}

impl RenderedCanvas {
    /// Every rendered node, pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &RenderedNode> {
        let mut stack: Vec<&RenderedNode> = self.nodes.iter().rev().collect();
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

/// Render a document at one breakpoint and interaction state.
///
/// Siblings come out in paint order: ascending z, stored order on ties.
pub fn render(doc: &Document, breakpoint: Breakpoint, state: InteractionState) -> RenderedCanvas {
    RenderedCanvas {
        breakpoint,
        width: doc.canvas.width(breakpoint),
        height: effective_height(doc, breakpoint),
        nodes: render_list(doc.nodes(), breakpoint, state),
    }
}

/// Render `page` inside `template`'s slot.
///
/// The slot is sized to the page, nodes below it move down, and the
/// page's nodes become the slot's children, offset by the slot origin.
/// Without a slot only the template is rendered.
pub fn render_composed(
    template: &Document,
    page: &Document,
    breakpoint: Breakpoint,
    state: InteractionState,
) -> RenderedCanvas {
    let composition = compose_template(template, page, breakpoint);
    let mut nodes = render_list(&composition.nodes, breakpoint, state);

    if let Some(placement) = &composition.slot {
        let mut page_nodes = render_list(page.nodes(), breakpoint, state);
        for node in &mut page_nodes {
            node.translate(placement.origin_x, placement.origin_y);
        }
        match find_rendered_mut(&mut nodes, &placement.slot_id) {
            Some(slot) => slot.children = page_nodes,
            None => debug!("Slot {} vanished from the render tree", placement.slot_id),
        }
    }

    RenderedCanvas {
        breakpoint,
        width: template.canvas.width(breakpoint),
        height: composition.height,
        nodes,
    }
}

fn render_list(nodes: &[Arc<Node>], breakpoint: Breakpoint, state: InteractionState) -> Vec<RenderedNode> {
    let mut ordered: Vec<&Arc<Node>> = nodes.iter().collect();
    ordered.sort_by(|a, b| {
        a.frame(breakpoint)
            .z_or_default()
            .total_cmp(&b.frame(breakpoint).z_or_default())
    });
    ordered
        .into_iter()
        .map(|node| render_node(node, breakpoint, state))
        .collect()
}

fn render_node(node: &Node, breakpoint: Breakpoint, state: InteractionState) -> RenderedNode {
    RenderedNode {
        id: node.id.clone(),
        kind: node.type_tag().to_string(),
        frame: *node.frame(breakpoint),
        style: resolve_style(node.style.as_ref(), breakpoint, state),
        hidden: node.meta.hidden,
        references: Reference::of(&node.kind),
        children: render_list(&node.nodes, breakpoint, state),
    }
}

fn find_rendered_mut<'a>(nodes: &'a mut [RenderedNode], id: &str) -> Option<&'a mut RenderedNode> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_rendered_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

// =============================================================================
// Reference resolution
// =============================================================================

/// Collaborator that turns a [`Reference`] into displayable data.
pub trait ReferenceResolver {
    /// Resolve one reference. Failures should use
    /// [`EngineError::UnresolvedReference`].
    fn resolve(&self, reference: &Reference) -> canvas_api::Result<Value>;
}

impl<F> ReferenceResolver for F
where
    F: Fn(&Reference) -> canvas_api::Result<Value>,
{
    fn resolve(&self, reference: &Reference) -> canvas_api::Result<Value> {
        self(reference)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Resolution {
    Resolved { value: Value },
    /// Render a placeholder in place of the referenced content
    Placeholder { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedReference {
    pub node_id: String,
    pub reference: Reference,
    pub resolution: Resolution,
}

/// Resolve every reference of a rendered canvas, in pre-order.
///
/// Never fails: a resolver error becomes a placeholder and is logged.
pub fn resolve_references(
    canvas: &RenderedCanvas,
    resolver: &dyn ReferenceResolver,
) -> Vec<ResolvedReference> {
    canvas
        .iter()
        .flat_map(|node| node.references.iter().map(move |r| (node, r)))
        .map(|(node, reference)| {
            let resolution = match resolver.resolve(reference) {
                Ok(value) => Resolution::Resolved { value },
                Err(err) => {
                    let err = match err {
                        EngineError::UnresolvedReference { .. } => err,
                        other => EngineError::unresolved(reference.key(), other.to_string()),
                    };
                    debug!("Placeholder for {} on {}: {}", reference.key(), node.id, err);
                    Resolution::Placeholder {
                        reason: err.to_string(),
                    }
                }
            };
            ResolvedReference {
                node_id: node.id.clone(),
                reference: reference.clone(),
                resolution,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_api::{CanvasSettings, EngineLimits, FrameLayout, StyleCascade, TemplateRef};
    use serde_json::json;

    fn doc(nodes: Vec<Node>) -> Document {
        Document::from_nodes(
            nodes,
            CanvasSettings::default(),
            TemplateRef::default(),
            &EngineLimits::default(),
        )
        .unwrap()
    }

    fn styled_text(id: &str, y: f64, z: Option<f64>) -> Node {
        let mut frame = Frame::new(0.0, y, 100.0, 20.0);
        frame.z = z;
        let mut style = StyleCascade::from_base([("color".to_string(), "red".to_string())].into());
        style
            .breakpoints
            .insert(Breakpoint::Mobile, [("color".to_string(), "green".to_string())].into());
        Node::new(id, NodeKind::text(id), frame).with_style(style)
    }

    #[test]
    fn test_render_resolves_style_and_paint_order() {
        let d = doc(vec![styled_text("top", 0.0, Some(3.0)), styled_text("bottom", 40.0, None)]);
        let canvas = render(&d, Breakpoint::Mobile, InteractionState::Default);

        assert_eq!(canvas.width, 390);
        assert_eq!(canvas.height, 800.0);
        assert_eq!(canvas.nodes[0].id, "bottom");
        assert_eq!(canvas.nodes[1].id, "top");
        assert_eq!(canvas.nodes[1].style.get("color").map(String::as_str), Some("green"));

        let desktop = render(&d, Breakpoint::Desktop, InteractionState::Default);
        assert_eq!(desktop.nodes[0].style.get("color").map(String::as_str), Some("red"));
    }

    #[test]
    fn test_render_composed_injects_page_under_slot() {
        let template = doc(vec![
            Node::new("header", NodeKind::text("Header"), Frame::new(0.0, 0.0, 1200.0, 100.0)),
            Node::new("main", NodeKind::slot(), Frame::new(0.0, 100.0, 1200.0, 200.0)),
            Node::new("footer", NodeKind::text("Footer"), Frame::new(0.0, 300.0, 1200.0, 100.0)),
        ]);
        let page = doc(vec![Node::new(
            "hero",
            NodeKind::frame(FrameLayout::Box),
            Frame::new(0.0, 0.0, 1200.0, 900.0),
        )
        .with_children(vec![Node::new(
            "headline",
            NodeKind::text("Hi"),
            Frame::new(20.0, 40.0, 400.0, 60.0),
        )])]);

        let canvas = render_composed(&template, &page, Breakpoint::Desktop, InteractionState::Default);
        let slot = canvas.iter().find(|n| n.id == "main").unwrap();
        assert_eq!(slot.frame.h, 900.0);
        assert_eq!(slot.children[0].frame.y, 100.0);
        assert_eq!(slot.children[0].children[0].frame, Frame::new(20.0, 140.0, 400.0, 60.0));

        let footer = canvas.iter().find(|n| n.id == "footer").unwrap();
        assert_eq!(footer.frame.y, 1000.0);
        assert_eq!(canvas.height, 1100.0);
    }

    #[test]
    fn test_references_and_placeholders() {
        let d = doc(vec![
            Node::new("img", NodeKind::image("/media/1.png", "One"), Frame::new(0.0, 0.0, 10.0, 10.0)),
            Node::new(
                "nav",
                NodeKind::from_parts("menu", json!({"menu": "main"})).unwrap(),
                Frame::new(0.0, 20.0, 10.0, 10.0),
            ),
            Node::new(
                "list",
                NodeKind::from_parts("collection-list", json!({"type_slug": "posts", "limit": 3}))
                    .unwrap(),
                Frame::new(0.0, 40.0, 10.0, 10.0),
            ),
        ]);
        let canvas = render(&d, Breakpoint::Desktop, InteractionState::Default);

        let resolver = |reference: &Reference| match reference {
            Reference::Menu { name } => Ok(json!({"menu": name, "items": []})),
            other => Err(EngineError::unresolved(other.key(), "service unavailable")),
        };
        let resolved = resolve_references(&canvas, &resolver);

        assert_eq!(resolved.len(), 3);
        let by_id = |id: &str| resolved.iter().find(|r| r.node_id == id).unwrap();
        assert!(matches!(by_id("nav").resolution, Resolution::Resolved { .. }));
        assert!(matches!(by_id("img").resolution, Resolution::Placeholder { .. }));
        assert_eq!(
            by_id("list").reference,
            Reference::Collection {
                type_slug: "posts".into(),
                limit: Some(3),
                sort: None
            }
        );
    }
}
