//! Canvas height and template slot composition
//!
//! All coordinates are canvas-absolute. Parentage never offsets a child,
//! so every computation here reads one breakpoint's frames and writes only
//! that breakpoint's frames.

use canvas_api::walk::{find_first, rewrite, walk};
use canvas_api::{Breakpoint, Document, Frame, Node, NodeKind};
use serde::Serialize;
use std::sync::Arc;
use tracing::trace;

/// Minimum canvas height that keeps every node in view.
///
/// For each node this is `y + max(h, canvas_height(children))`, maximised
/// over the list. An empty list has height 0.
pub fn canvas_height(nodes: &[Arc<Node>], breakpoint: Breakpoint) -> f64 {
    // Unrolled, every node reaches down to the sum of its ancestors' `y`
    // plus its own `y + h`
    let mut tops: Vec<f64> = Vec::new();
    let mut height = 0.0_f64;
    walk(nodes, |node, ctx| {
        tops.truncate(ctx.depth);
        let frame = node.frame(breakpoint);
        let top = tops.last().copied().unwrap_or(0.0) + frame.y;
        height = height.max(top + frame.h);
        tops.push(top);
    });
    height
}

/// Height the canvas renders at: never below `canvas.min_height_px`.
pub fn effective_height(doc: &Document, breakpoint: Breakpoint) -> f64 {
    f64::from(doc.canvas.min_height_px).max(canvas_height(doc.nodes(), breakpoint))
}

/// First slot node in walk order.
pub fn find_slot(nodes: &[Arc<Node>]) -> Option<&Node> {
    find_first(nodes, |node| matches!(node.kind, NodeKind::Slot(_)))
}

/// Union of a node's frame and the frames of its whole subtree.
pub fn bounding_box(node: &Node, breakpoint: Breakpoint) -> Frame {
    let mut bounds = *node.frame(breakpoint);
    walk(&node.nodes, |child, _| {
        bounds = bounds.union(child.frame(breakpoint));
    });
    bounds
}

/// Resize the template's slot to `page_height` at one breakpoint and push
/// down everything that started at or below the slot's original bottom.
///
/// With `delta = page_height - slot.h`:
/// * the slot's height becomes `page_height`,
/// * every other node (at any depth) with `y >= slot.y + slot.h` moves by `delta`,
/// * nodes above the slot bottom and all other breakpoints stay untouched.
///
/// Returns the list unchanged when there is no slot or `delta` is 0.
pub fn compose_slot(
    template_nodes: &[Arc<Node>],
    page_height: f64,
    breakpoint: Breakpoint,
) -> Vec<Arc<Node>> {
    let Some(slot) = find_slot(template_nodes) else {
        return template_nodes.to_vec();
    };
    let slot_frame = *slot.frame(breakpoint);
    let delta = page_height - slot_frame.h;
    if delta == 0.0 {
        return template_nodes.to_vec();
    }

    let shift = SlotShift {
        slot_id: &slot.id,
        boundary: slot_frame.bottom(),
        page_height,
        delta,
        breakpoint,
    };
    trace!(
        "Composing slot {} at {}: boundary {} delta {}",
        slot.id,
        breakpoint,
        shift.boundary,
        delta
    );
    shift.apply(template_nodes)
}

struct SlotShift<'a> {
    slot_id: &'a str,
    boundary: f64,
    page_height: f64,
    delta: f64,
    breakpoint: Breakpoint,
}

impl SlotShift<'_> {
    fn apply(&self, nodes: &[Arc<Node>]) -> Vec<Arc<Node>> {
        rewrite(nodes, |node, children| self.apply_node(node, children))
    }

    fn apply_node(&self, node: &Arc<Node>, children: Vec<Arc<Node>>) -> Arc<Node> {
        let frame = node.frame(self.breakpoint);
        let resized = node.id == self.slot_id;
        let shifted = !resized && frame.y >= self.boundary;
        let children_changed = children
            .iter()
            .zip(&node.nodes)
            .any(|(new, old)| !Arc::ptr_eq(new, old));

        if !resized && !shifted && !children_changed {
            return Arc::clone(node);
        }

        let mut next = Node::clone(node);
        let frame = next.frames.get_mut(self.breakpoint);
        if resized {
            frame.h = self.page_height;
        } else if shifted {
            frame.y += self.delta;
        }
        next.nodes = children;
        Arc::new(next)
    }
}

/// Where a page was injected into a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotPlacement {
    pub slot_id: String,
    /// Offset added to page coordinates to place them in the template
    pub origin_x: f64,
    pub origin_y: f64,
    pub page_height: f64,
}

/// A template with its slot sized to a page, at one breakpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub breakpoint: Breakpoint,
    pub nodes: Vec<Arc<Node>>,
    /// `None` when the template has no slot; the page is not injected then
    pub slot: Option<SlotPlacement>,
    /// Effective height of the composed template
    pub height: f64,
}

/// Compose `page` into `template` at one breakpoint.
///
/// The slot grows or shrinks to the page's own content height
/// ([`canvas_height`]), not to the page's minimum canvas height.
pub fn compose_template(template: &Document, page: &Document, breakpoint: Breakpoint) -> Composition {
    let min_height = f64::from(template.canvas.min_height_px);
    let Some(slot) = find_slot(template.nodes()) else {
        trace!("Template has no slot at {}, page not injected", breakpoint);
        return Composition {
            breakpoint,
            nodes: template.nodes().to_vec(),
            slot: None,
            height: effective_height(template, breakpoint),
        };
    };

    let page_height = canvas_height(page.nodes(), breakpoint);
    let slot_frame = *slot.frame(breakpoint);
    let nodes = compose_slot(template.nodes(), page_height, breakpoint);
    let height = min_height.max(canvas_height(&nodes, breakpoint));

    Composition {
        breakpoint,
        slot: Some(SlotPlacement {
            slot_id: slot.id.clone(),
            origin_x: slot_frame.x,
            origin_y: slot_frame.y,
            page_height,
        }),
        nodes,
        height,
    }
}
