use std::collections::HashSet;

use crate::walk::{walk_with, WalkControl};
use crate::{EngineError, EngineLimits, Node, Result};

/// Check a candidate node (and its subtree) against the document invariants
/// before it is accepted into a tree.
///
/// Rejects empty or overlong ids, ids repeated inside the subtree, bad
/// frames (non-finite, negative size, out of bounds), children on a
/// non-container and nesting deeper than `limits.max_depth`.
pub fn validate_node(node: &Node, limits: &EngineLimits) -> Result<()> {
    validate_at_depth(node, 0, limits)
}

/// Same as [`validate_node`] for a node that will live at `depth`.
pub fn validate_at_depth(node: &Node, depth: usize, limits: &EngineLimits) -> Result<()> {
    validate_shallow(node, depth, limits)?;

    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(node.id.as_str());

    let mut failure = None;
    walk_with(&node.nodes, |child, ctx| {
        let outcome = validate_shallow(child, depth + 1 + ctx.depth, limits).and_then(|_| {
            if seen.insert(child.id.as_str()) {
                Ok(())
            } else {
                Err(EngineError::invalid_node(&child.id, "duplicate id in subtree"))
            }
        });
        match outcome {
            Ok(()) => WalkControl::Continue,
            Err(err) => {
                failure = Some(err);
                WalkControl::Stop
            }
        }
    });

    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Checks on the node itself, children excluded.
pub fn validate_shallow(node: &Node, depth: usize, limits: &EngineLimits) -> Result<()> {
    let id = node.id.as_str();
    if id.trim().is_empty() {
        return Err(EngineError::invalid_node(id, "id must be a non-empty string"));
    }
    if id.trim() != id {
        return Err(EngineError::invalid_node(id, "id must not have surrounding whitespace"));
    }
    if id.chars().count() > limits.max_id_length {
        return Err(EngineError::invalid_node(
            id,
            format!("id exceeds max length {}", limits.max_id_length),
        ));
    }
    if depth > limits.max_depth {
        return Err(EngineError::invalid_node(
            id,
            format!("exceeds max depth {}", limits.max_depth),
        ));
    }

    for (breakpoint, frame) in node.frames.iter() {
        frame
            .check(limits.max_coord)
            .map_err(|reason| EngineError::invalid_node(id, format!("frames.{}: {}", breakpoint, reason)))?;
    }

    if !node.is_container() && !node.nodes.is_empty() {
        return Err(EngineError::invalid_node(
            id,
            format!("'{}' nodes cannot have children", node.type_tag()),
        ));
    }

    Ok(())
}
