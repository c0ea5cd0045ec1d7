//! Tree mutation operations
//!
//! Every operation takes a document by reference and returns a new one.
//! Operations are total: an unknown id, a refused edit or an invalid
//! argument is a no-op that returns a document equal to the input, logged
//! at debug level. A stale id from a concurrent render is expected, so it
//! is never an error.
//!
//! Only the path from the root to the edited node is copied; every other
//! subtree is shared with the input document.

use canvas_api::validate::validate_at_depth;
use canvas_api::walk::{rewrite, walk};
use canvas_api::{Breakpoint, Document, EngineLimits, Frame, MetaPatch, Node, NodeKind};
use canvas_style::sanitize_style_with;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

/// How a frame edit at one breakpoint reaches the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramePropagation {
    /// Only the given breakpoint changes
    #[default]
    ThisBreakpoint,
    /// The frame is copied to every breakpoint
    AllBreakpoints,
}

fn unchanged(doc: &Document, op: &str, id: &str, reason: &str) -> Document {
    debug!("{} on {} is a no-op: {}", op, id, reason);
    doc.clone()
}

/// Apply an in-place edit to one node, or return the document unchanged.
fn edit_node<F>(doc: &Document, op: &str, id: &str, edit: F) -> Document
where
    F: FnOnce(&mut Node),
{
    match doc.update_node(id, edit) {
        Some(next) => {
            trace!("{} applied to {}", op, id);
            next
        }
        None => unchanged(doc, op, id, "unknown id or refused edit"),
    }
}

fn parent_id(doc: &Document, id: &str) -> Option<String> {
    doc.index().parent_id(id).map(str::to_string)
}

/// Position of `id` in its sibling list.
fn position_of(doc: &Document, id: &str) -> Option<usize> {
    doc.path_of(id)?.last().copied()
}

fn subtree_size(node: &Node) -> usize {
    let mut count = 1;
    walk(&node.nodes, |_, _| count += 1);
    count
}

// =============================================================================
// Ordering
// =============================================================================

/// Move `active_id` to the position of `over_id` within their shared
/// sibling list.
///
/// Array-move semantics: the node is removed from its index and inserted
/// at `over_id`'s index. No-op when either id is unknown, the ids are equal
/// or the nodes are not siblings. Moving across containers is
/// [`move_node`]'s job.
pub fn reorder(doc: &Document, active_id: &str, over_id: &str) -> Document {
    if active_id == over_id {
        return doc.clone();
    }
    let (Some(active_path), Some(over_path)) = (doc.path_of(active_id), doc.path_of(over_id)) else {
        return unchanged(doc, "reorder", active_id, "unknown id");
    };
    let (Some((&from, active_parent)), Some((&to, over_parent))) =
        (active_path.split_last(), over_path.split_last())
    else {
        return doc.clone();
    };
    if active_parent != over_parent {
        return unchanged(doc, "reorder", active_id, "nodes are not siblings");
    }

    let parent = parent_id(doc, active_id);
    doc.edit_children(parent.as_deref(), |list| {
        let node = list.remove(from);
        list.insert(to, node);
    })
    .unwrap_or_else(|| unchanged(doc, "reorder", active_id, "sibling list refused the move"))
}

// =============================================================================
// Meta
// =============================================================================

/// Merge the set fields of `patch` into the node's meta.
pub fn patch_meta(doc: &Document, id: &str, patch: &MetaPatch) -> Document {
    edit_node(doc, "patch_meta", id, |node| node.meta.apply(patch))
}

pub fn toggle_hidden(doc: &Document, id: &str) -> Document {
    match doc.find(id) {
        Some(node) => patch_meta(doc, id, &MetaPatch::hidden(!node.meta.hidden)),
        None => unchanged(doc, "toggle_hidden", id, "unknown id"),
    }
}

pub fn toggle_collapsed(doc: &Document, id: &str) -> Document {
    match doc.find(id) {
        Some(node) => patch_meta(doc, id, &MetaPatch::collapsed(!node.meta.collapsed)),
        None => unchanged(doc, "toggle_collapsed", id, "unknown id"),
    }
}

/// Set the display name to the trimmed `name`; an empty name clears it so
/// the label falls back to the type-derived default.
pub fn rename(doc: &Document, id: &str, name: &str) -> Document {
    let trimmed = name.trim();
    let name = (!trimmed.is_empty()).then(|| trimmed.to_string());
    patch_meta(doc, id, &MetaPatch::name(name))
}

// =============================================================================
// Structure
// =============================================================================

/// Insert a validated node under `parent_id` (top level when `None`).
///
/// # Arguments
/// * `index` - Position in the sibling list, clamped to its length
///
/// No-op when the node fails validation at its new depth, reuses an id
/// already in the document, would exceed the node limit, or when the
/// parent is unknown or not a container.
pub fn insert_node(doc: &Document, parent_id: Option<&str>, index: usize, node: Node) -> Document {
    insert_node_with_limits(doc, parent_id, index, node, &EngineLimits::default())
}

pub fn insert_node_with_limits(
    doc: &Document,
    parent_id: Option<&str>,
    index: usize,
    node: Node,
    limits: &EngineLimits,
) -> Document {
    let id = node.id.clone();
    let depth = match parent_id {
        None => 0,
        Some(parent) => match doc.path_of(parent) {
            Some(path) => path.len(),
            None => return unchanged(doc, "insert_node", &id, "unknown parent"),
        },
    };
    if let Err(err) = validate_at_depth(&node, depth, limits) {
        return unchanged(doc, "insert_node", &id, &err.to_string());
    }
    if doc.node_count() + subtree_size(&node) > limits.max_nodes {
        return unchanged(doc, "insert_node", &id, "node limit reached");
    }

    let node = Arc::new(node);
    doc.edit_children(parent_id, |list| {
        let at = index.min(list.len());
        list.insert(at, node);
    })
    .unwrap_or_else(|| unchanged(doc, "insert_node", &id, "parent refused the node"))
}

/// Remove a node together with its whole subtree.
pub fn remove_node(doc: &Document, id: &str) -> Document {
    let Some(index) = position_of(doc, id) else {
        return unchanged(doc, "remove_node", id, "unknown id");
    };
    let parent = parent_id(doc, id);
    doc.edit_children(parent.as_deref(), |list| {
        list.remove(index);
    })
    .unwrap_or_else(|| unchanged(doc, "remove_node", id, "sibling list refused the removal"))
}

/// Reparent a node: remove it, then insert it under `new_parent` at `index`.
///
/// `index` addresses the destination list after the removal. Refuses to
/// move a node into itself or one of its descendants, and into a parent
/// that is not a container or would push the subtree past the depth limit.
pub fn move_node(doc: &Document, id: &str, new_parent: Option<&str>, index: usize) -> Document {
    move_node_with_limits(doc, id, new_parent, index, &EngineLimits::default())
}

pub fn move_node_with_limits(
    doc: &Document,
    id: &str,
    new_parent: Option<&str>,
    index: usize,
    limits: &EngineLimits,
) -> Document {
    let Some(node) = doc.find(id) else {
        return unchanged(doc, "move_node", id, "unknown id");
    };
    let depth = match new_parent {
        None => 0,
        Some(parent) => {
            if doc.is_descendant_or_self(parent, id) {
                return unchanged(doc, "move_node", id, "cannot move a node into its own subtree");
            }
            match doc.find(parent) {
                Some(p) if p.is_container() => doc.path_of(parent).map_or(0, |path| path.len()),
                Some(_) => return unchanged(doc, "move_node", id, "target is not a container"),
                None => return unchanged(doc, "move_node", id, "unknown target"),
            }
        }
    };
    if let Err(err) = validate_at_depth(node, depth, limits) {
        return unchanged(doc, "move_node", id, &err.to_string());
    }

    let Some(moved) = doc
        .siblings_of(id)
        .zip(position_of(doc, id))
        .and_then(|(siblings, i)| siblings.get(i).cloned())
    else {
        return unchanged(doc, "move_node", id, "unknown id");
    };

    let removed = remove_node(doc, id);
    removed
        .edit_children(new_parent, |list| {
            let at = index.min(list.len());
            list.insert(at, moved);
        })
        .unwrap_or_else(|| unchanged(doc, "move_node", id, "target refused the node"))
}

/// Deep copy of a node with fresh ids, inserted right after the original.
pub fn duplicate_node(doc: &Document, id: &str) -> Document {
    duplicate_node_with_limits(doc, id, &EngineLimits::default())
}

pub fn duplicate_node_with_limits(doc: &Document, id: &str, limits: &EngineLimits) -> Document {
    let (Some(node), Some(index)) = (doc.find(id), position_of(doc, id)) else {
        return unchanged(doc, "duplicate_node", id, "unknown id");
    };
    if doc.node_count() + subtree_size(node) > limits.max_nodes {
        return unchanged(doc, "duplicate_node", id, "node limit reached");
    }

    let copy = Arc::new(with_fresh_ids(node));
    debug!("Duplicating {} as {}", id, copy.id);
    let parent = parent_id(doc, id);
    doc.edit_children(parent.as_deref(), |list| list.insert(index + 1, copy))
        .unwrap_or_else(|| unchanged(doc, "duplicate_node", id, "sibling list refused the copy"))
}

fn with_fresh_ids(node: &Node) -> Node {
    let mut copy = node.clone();
    copy.id = Uuid::new_v4().to_string();
    copy.nodes = rewrite(&node.nodes, |original, children| {
        let mut child = Node::clone(original);
        child.id = Uuid::new_v4().to_string();
        child.nodes = children;
        Arc::new(child)
    });
    copy
}

// =============================================================================
// Geometry
// =============================================================================

/// Replace a node's frame at `breakpoint`, or at every breakpoint.
///
/// Frames that fail the geometry checks are refused.
pub fn set_frame(
    doc: &Document,
    id: &str,
    breakpoint: Breakpoint,
    frame: Frame,
    propagation: FramePropagation,
) -> Document {
    if let Err(reason) = frame.check(EngineLimits::default().max_coord) {
        return unchanged(doc, "set_frame", id, &reason);
    }
    edit_node(doc, "set_frame", id, |node| match propagation {
        FramePropagation::ThisBreakpoint => node.frames.set(breakpoint, frame),
        FramePropagation::AllBreakpoints => {
            for bp in Breakpoint::ALL {
                node.frames.set(bp, frame);
            }
        }
    })
}

/// Set (or clear) the z value at one breakpoint.
pub fn set_z(doc: &Document, id: &str, breakpoint: Breakpoint, z: Option<f64>) -> Document {
    if z.is_some_and(|z| !z.is_finite()) {
        return unchanged(doc, "set_z", id, "z must be finite");
    }
    edit_node(doc, "set_z", id, |node| node.frames.get_mut(breakpoint).z = z)
}

/// Raise a node above all of its siblings at one breakpoint.
pub fn bring_to_front(doc: &Document, id: &str, breakpoint: Breakpoint) -> Document {
    restack(doc, id, breakpoint, Stack::Front)
}

/// Lower a node below all of its siblings at one breakpoint.
pub fn send_to_back(doc: &Document, id: &str, breakpoint: Breakpoint) -> Document {
    restack(doc, id, breakpoint, Stack::Back)
}

#[derive(Clone, Copy)]
enum Stack {
    Front,
    Back,
}

fn restack(doc: &Document, id: &str, breakpoint: Breakpoint, stack: Stack) -> Document {
    let (Some(node), Some(siblings)) = (doc.find(id), doc.siblings_of(id)) else {
        return unchanged(doc, "restack", id, "unknown id");
    };
    let current = node.frame(breakpoint).z_or_default();
    let others = siblings
        .iter()
        .filter(|sibling| sibling.id != id)
        .map(|sibling| sibling.frame(breakpoint).z_or_default());

    let target = match stack {
        Stack::Front => match others.fold(None, |acc: Option<f64>, z| Some(acc.map_or(z, |a| a.max(z)))) {
            Some(top) if current > top => return doc.clone(),
            Some(top) => top + 1.0,
            None => return doc.clone(),
        },
        Stack::Back => match others.fold(None, |acc: Option<f64>, z| Some(acc.map_or(z, |a| a.min(z)))) {
            Some(bottom) if current < bottom => return doc.clone(),
            Some(bottom) => bottom - 1.0,
            None => return doc.clone(),
        },
    };
    set_z(doc, id, breakpoint, Some(target))
}

// =============================================================================
// Payload
// =============================================================================

/// Replace a node's style with the sanitized form of `raw`.
///
/// A style where nothing survives sanitization clears the node's style.
pub fn set_style(doc: &Document, id: &str, raw: &Value) -> Document {
    let style = sanitize_style_with(raw, &EngineLimits::default());
    edit_node(doc, "set_style", id, |node| node.style = style)
}

/// Replace a node's payload. The new kind must be the same variant.
pub fn set_data(doc: &Document, id: &str, kind: NodeKind) -> Document {
    match doc.find(id) {
        Some(node) if node.kind.same_variant(&kind) => {
            edit_node(doc, "set_data", id, |node| node.kind = kind)
        }
        Some(node) => unchanged(
            doc,
            "set_data",
            id,
            &format!("cannot change '{}' into '{}'", node.type_tag(), kind.type_tag()),
        ),
        None => unchanged(doc, "set_data", id, "unknown id"),
    }
}
