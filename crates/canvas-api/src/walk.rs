//! Canonical traversal of a node tree.
//!
//! Depth-first pre-order: a container is visited before its children and
//! children are visited in stored order. Stored order is authoring order,
//! independent of z.

use std::sync::Arc;

use crate::Node;

/// Position of the node being visited.
#[derive(Debug, Clone, Copy)]
pub struct WalkContext<'a, 'p> {
    /// 0 for nodes of the list the walk started from
    pub depth: usize,
    /// Position within the sibling list
    pub index: usize,
    pub parent: Option<&'a Node>,
    /// Child-index path from the document root
    pub path: &'p [usize],
}

impl WalkContext<'_, '_> {
    pub fn parent_id(&self) -> Option<&str> {
        self.parent.map(|p| p.id.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    SkipChildren,
    Stop,
}

/// Visit every node.
pub fn walk<'a, F>(nodes: &'a [Arc<Node>], mut visit: F)
where
    F: for<'p> FnMut(&'a Node, &WalkContext<'a, 'p>),
{
    walk_with(nodes, |node, ctx| {
        visit(node, ctx);
        WalkControl::Continue
    });
}

/// Visit nodes, letting the visitor prune subtrees or stop early.
/// Returns `true` when the walk was stopped.
pub fn walk_with<'a, F>(nodes: &'a [Arc<Node>], visit: F) -> bool
where
    F: for<'p> FnMut(&'a Node, &WalkContext<'a, 'p>) -> WalkControl,
{
    walk_subtree(nodes, None, &[], visit)
}

/// [`walk_with`] for a sibling list that lives below `prefix`.
/// Paths and depths handed to the visitor are absolute.
fn walk_subtree<'a, F>(
    nodes: &'a [Arc<Node>],
    parent: Option<&'a Node>,
    prefix: &[usize],
    mut visit: F,
) -> bool
where
    F: for<'p> FnMut(&'a Node, &WalkContext<'a, 'p>) -> WalkControl,
{
    let mut path = prefix.to_vec();
    walk_inner(nodes, parent, &mut path, &mut visit)
}

fn walk_inner<'a, F>(
    nodes: &'a [Arc<Node>],
    parent: Option<&'a Node>,
    path: &mut Vec<usize>,
    visit: &mut F,
) -> bool
where
    F: for<'p> FnMut(&'a Node, &WalkContext<'a, 'p>) -> WalkControl,
{
    for (index, node) in nodes.iter().enumerate() {
        let node: &'a Node = node;
        path.push(index);
        let ctx = WalkContext {
            depth: path.len() - 1,
            index,
            parent,
            path: path.as_slice(),
        };
        let control = visit(node, &ctx);
        let stopped = match control {
            WalkControl::Stop => true,
            WalkControl::SkipChildren => false,
            WalkControl::Continue => walk_inner(&node.nodes, Some(node), path, visit),
        };
        path.pop();
        if stopped {
            return true;
        }
    }
    false
}

/// First node, in walk order, matching `pred`.
pub fn find_first<'a>(nodes: &'a [Arc<Node>], mut pred: impl FnMut(&Node) -> bool) -> Option<&'a Node> {
    let mut found = None;
    walk_with(nodes, |node, _| {
        if pred(node) {
            found = Some(node);
            WalkControl::Stop
        } else {
            WalkControl::Continue
        }
    });
    found
}

/// Rebuild a tree children-first, in stored order.
///
/// `edit` receives each original node together with its already rebuilt
/// children and returns the node to keep in its place.
pub fn rewrite<F>(nodes: &[Arc<Node>], mut edit: F) -> Vec<Arc<Node>>
where
    F: FnMut(&Arc<Node>, Vec<Arc<Node>>) -> Arc<Node>,
{
    rewrite_inner(nodes, &mut edit)
}

fn rewrite_inner<F>(nodes: &[Arc<Node>], edit: &mut F) -> Vec<Arc<Node>>
where
    F: FnMut(&Arc<Node>, Vec<Arc<Node>>) -> Arc<Node>,
{
    let mut rebuilt = Vec::with_capacity(nodes.len());
    for node in nodes {
        let children = rewrite_inner(&node.nodes, edit);
        rebuilt.push(edit(node, children));
    }
    rebuilt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Frame, FrameLayout, NodeKind};

    fn leaf(id: &str) -> Node {
        Node::new(id, NodeKind::text(id), Frame::new(0.0, 0.0, 10.0, 10.0))
    }

    fn tree() -> Vec<Arc<Node>> {
        let frame = Node::new(
            "a",
            NodeKind::frame(FrameLayout::Box),
            Frame::new(0.0, 0.0, 100.0, 100.0),
        )
        .with_children(vec![leaf("a1"), leaf("a2")]);
        vec![Arc::new(frame), Arc::new(leaf("b"))]
    }

    #[test]
    fn test_walk_is_preorder_in_stored_order() {
        let nodes = tree();
        let mut seen = Vec::new();
        walk(&nodes, |node, ctx| {
            seen.push((node.id.clone(), ctx.depth, ctx.path.to_vec()));
        });
        assert_eq!(
            seen,
            vec![
                ("a".to_string(), 0, vec![0]),
                ("a1".to_string(), 1, vec![0, 0]),
                ("a2".to_string(), 1, vec![0, 1]),
                ("b".to_string(), 0, vec![1]),
            ]
        );
    }

    #[test]
    fn test_walk_with_skip_and_stop() {
        let nodes = tree();
        let mut seen = Vec::new();
        walk_with(&nodes, |node, _| {
            seen.push(node.id.clone());
            WalkControl::SkipChildren
        });
        assert_eq!(seen, vec!["a", "b"]);

        let mut count = 0;
        let stopped = walk_with(&nodes, |_, _| {
            count += 1;
            if count == 2 {
                WalkControl::Stop
            } else {
                WalkControl::Continue
            }
        });
        assert!(stopped);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_rewrite_visits_children_first_and_can_share() {
        let nodes = tree();
        let mut order = Vec::new();
        let rebuilt = rewrite(&nodes, |node, children| {
            order.push(node.id.clone());
            if node.id == "a2" {
                let mut copy = Node::clone(node);
                copy.id = "a2x".into();
                Arc::new(copy)
            } else if children.is_empty() {
                Arc::clone(node)
            } else {
                let mut copy = Node::clone(node);
                copy.nodes = children;
                Arc::new(copy)
            }
        });
        assert_eq!(order, vec!["a1", "a2", "a", "b"]);
        assert_eq!(rebuilt[0].nodes[1].id, "a2x");
        assert!(Arc::ptr_eq(&rebuilt[0].nodes[0], &nodes[0].nodes[0]));
        assert!(Arc::ptr_eq(&rebuilt[1], &nodes[1]));
    }

    #[test]
    fn test_find_first_reports_parent() {
        let nodes = tree();
        assert_eq!(find_first(&nodes, |n| n.id == "a2").map(|n| n.id.as_str()), Some("a2"));
        assert!(find_first(&nodes, |n| n.id == "zz").is_none());

        let mut parent_of_a2 = None;
        walk(&nodes, |node, ctx| {
            if node.id == "a2" {
                parent_of_a2 = ctx.parent_id().map(str::to_string);
            }
        });
        assert_eq!(parent_of_a2.as_deref(), Some("a"));
    }
}
