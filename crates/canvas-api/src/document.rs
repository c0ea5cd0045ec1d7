use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;
use tracing::debug;

use crate::node::{ChildList, Extra};
use crate::validate::validate_at_depth;
use crate::{Breakpoint, EngineError, EngineLimits, Node, NodeIndex, PerBreakpoint, Result};

/// Current stored document version.
pub const CANONICAL_VERSION: u32 = 6;

/// Smallest and largest `snapPx`.
pub const SNAP_PX_RANGE: (u32, u32) = (1, 128);
/// Smallest canvas width or `minHeightPx`; the largest is `max_coord`.
pub const MIN_CANVAS_DIMENSION: u32 = 240;

/// Canvas-wide settings. Missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasSettings {
    /// Grid the editing surface snaps to
    pub snap_px: u32,
    pub widths: PerBreakpoint<u32>,
    /// Smallest canvas height regardless of content
    pub min_height_px: u32,
}

impl CanvasSettings {
    pub fn width(&self, breakpoint: Breakpoint) -> u32 {
        *self.widths.get(breakpoint)
    }

    /// Check every field against the bounds stored documents are read with.
    /// Fails with the first field out of range.
    pub fn validate(&self, limits: &EngineLimits) -> Result<()> {
        let (min_snap, max_snap) = SNAP_PX_RANGE;
        if !(min_snap..=max_snap).contains(&self.snap_px) {
            return Err(EngineError::InvalidDocument {
                reason: format!("canvas.snapPx must be between {} and {}", min_snap, max_snap),
            });
        }
        let in_range = |value: u32| {
            value >= MIN_CANVAS_DIMENSION && f64::from(value) <= limits.max_coord
        };
        for (bp, width) in self.widths.iter() {
            if !in_range(*width) {
                return Err(EngineError::InvalidDocument {
                    reason: format!(
                        "canvas.widths.{} must be between {} and {}",
                        bp, MIN_CANVAS_DIMENSION, limits.max_coord
                    ),
                });
            }
        }
        if !in_range(self.min_height_px) {
            return Err(EngineError::InvalidDocument {
                reason: format!(
                    "canvas.minHeightPx must be between {} and {}",
                    MIN_CANVAS_DIMENSION, limits.max_coord
                ),
            });
        }
        Ok(())
    }
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            snap_px: 1,
            widths: PerBreakpoint::new(390, 820, 1200),
            min_height_px: 800,
        }
    }
}

/// Template the page renders inside, plus the menus that template uses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl TemplateRef {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.menu.is_none() && self.footer.is_none() && self.extra.is_empty()
    }
}

// =============================================================================
// Document
// =============================================================================

/// The page-builder document: node tree, canvas settings and template.
///
/// A `Document` is an immutable value. Every edit produces a new document;
/// subtrees the edit did not touch are shared with the previous version.
/// The id index travels with the tree and is not part of equality.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Arc<Node>>,
    pub canvas: CanvasSettings,
    pub template: TemplateRef,
    index: NodeIndex,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.canvas == other.canvas && self.template == other.template
    }
}

impl Document {
    pub fn new(canvas: CanvasSettings, template: TemplateRef) -> Self {
        Self {
            nodes: Vec::new(),
            canvas,
            template,
            index: NodeIndex::default(),
        }
    }

    /// Build a document from candidate top-level nodes.
    ///
    /// Every node is validated against `limits` and ids must be unique
    /// across the whole tree.
    pub fn from_nodes(
        nodes: Vec<Node>,
        canvas: CanvasSettings,
        template: TemplateRef,
        limits: &EngineLimits,
    ) -> Result<Self> {
        for node in &nodes {
            validate_at_depth(node, 0, limits)?;
        }
        let nodes: Vec<Arc<Node>> = nodes.into_iter().map(Arc::new).collect();
        let index = NodeIndex::build(&nodes)
            .map_err(|reason| EngineError::InvalidDocument { reason })?;
        if index.len() > limits.max_nodes {
            return Err(EngineError::InvalidDocument {
                reason: format!("exceeds max node count {}", limits.max_nodes),
            });
        }
        Ok(Self {
            nodes,
            canvas,
            template,
            index,
        })
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn index(&self) -> &NodeIndex {
        &self.index
    }

    /// Number of nodes in the whole tree.
    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Child-index path from the top-level list to `id`.
    pub fn path_of(&self, id: &str) -> Option<Vec<usize>> {
        self.locate(id).map(|(path, _)| path)
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        self.locate(id).map(|(_, node)| node)
    }

    pub fn node_at_path(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node: &Node = self.nodes.get(*first)?;
        for &i in rest {
            node = node.nodes.get(i)?;
        }
        Some(node)
    }

    /// Descend along the indexed ancestry of `id`, scanning one sibling
    /// list per level.
    fn locate(&self, id: &str) -> Option<(Vec<usize>, &Node)> {
        let ancestry = self.index.ancestry(id)?;
        let mut path = Vec::with_capacity(ancestry.len());
        let mut list: &[Arc<Node>] = &self.nodes;
        let mut found = None;
        for step in ancestry {
            let position = list.iter().position(|node| node.id == step)?;
            path.push(position);
            let node: &Node = &list[position];
            list = &node.nodes;
            found = Some(node);
        }
        found.map(|node| (path, node))
    }

    /// Parent container of `id`; `None` for top-level or unknown ids.
    pub fn parent_of(&self, id: &str) -> Option<&Node> {
        self.find(self.index.parent_id(id)?)
    }

    /// The sibling list `id` lives in (the top-level list for top-level nodes).
    pub fn siblings_of(&self, id: &str) -> Option<&[Arc<Node>]> {
        match self.index.get(id)? {
            None => Some(&self.nodes),
            Some(parent) => self.find(parent).map(|parent| parent.nodes.as_slice()),
        }
    }

    /// Whether `id` is `ancestor_id` or lives below it.
    pub fn is_descendant_or_self(&self, id: &str, ancestor_id: &str) -> bool {
        self.contains(ancestor_id)
            && self
                .index
                .ancestry(id)
                .is_some_and(|chain| chain.contains(&ancestor_id))
    }

    /// Copy-on-write edit of one node's own fields.
    ///
    /// Only the path from the root to the node is copied. The id is restored
    /// after `edit` runs; ids are never reassigned. When the edit replaces
    /// children, the children that changed are re-indexed, and the edit is
    /// refused (`None`) if that would duplicate an id or give children to a
    /// non-container. Returns `None` for unknown ids.
    pub fn update_node<F>(&self, id: &str, edit: F) -> Option<Document>
    where
        F: FnOnce(&mut Node),
    {
        let (path, current) = self.locate(id)?;
        let old_children = current.nodes.clone();

        let mut next = self.clone();
        let node = node_at_path_mut(&mut next.nodes, &path)?;
        edit(node);
        node.id = id.to_string();

        if !node.is_container() && !node.nodes.is_empty() {
            debug!("Refusing edit of {}: '{}' nodes cannot have children", id, node.type_tag());
            return None;
        }
        let new_children = node.nodes.clone();
        if let Err(reason) = next.index.replace_list(&old_children, &new_children, Some(id)) {
            debug!("Refusing edit of {}: {}", id, reason);
            return None;
        }
        Some(next)
    }

    /// Copy-on-write edit of a sibling list: the children of `parent`, or
    /// the top-level list when `parent` is `None`.
    ///
    /// Children that entered or left the list are re-indexed. Returns `None`
    /// when the parent is unknown or not a container, or when the edited
    /// list would duplicate an id found elsewhere in the tree.
    pub fn edit_children<F>(&self, parent: Option<&str>, edit: F) -> Option<Document>
    where
        F: FnOnce(&mut Vec<Arc<Node>>),
    {
        let prefix: Vec<usize> = match parent {
            None => Vec::new(),
            Some(parent_id) => {
                let (path, node) = self.locate(parent_id)?;
                if !node.is_container() {
                    return None;
                }
                path
            }
        };

        let mut next = self.clone();
        let list = children_at_path_mut(&mut next.nodes, &prefix)?;
        let old_list = list.clone();
        edit(list);
        let new_list = list.clone();

        if let Err(reason) = next.index.replace_list(&old_list, &new_list, parent) {
            debug!("Refusing sibling edit under {:?}: {}", parent, reason);
            return None;
        }
        Some(next)
    }

    /// Replace canvas settings, keeping the tree.
    pub fn with_canvas(mut self, canvas: CanvasSettings) -> Self {
        self.canvas = canvas;
        self
    }

    pub fn with_template(mut self, template: TemplateRef) -> Self {
        self.template = template;
        self
    }
}

fn children_at_path_mut<'a>(
    mut list: &'a mut Vec<Arc<Node>>,
    path: &[usize],
) -> Option<&'a mut Vec<Arc<Node>>> {
    for &i in path {
        let child = list.get_mut(i)?;
        list = &mut Arc::make_mut(child).nodes;
    }
    Some(list)
}

fn node_at_path_mut<'a>(list: &'a mut Vec<Arc<Node>>, path: &[usize]) -> Option<&'a mut Node> {
    let (last, parents) = path.split_last()?;
    let list = children_at_path_mut(list, parents)?;
    list.get_mut(*last).map(Arc::make_mut)
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Document", 4)?;
        state.serialize_field("version", &CANONICAL_VERSION)?;
        state.serialize_field("nodes", &ChildList(&self.nodes))?;
        state.serialize_field("canvas", &self.canvas)?;
        if self.template.is_empty() {
            state.skip_field("template")?;
        } else {
            state.serialize_field("template", &self.template)?;
        }
        state.end()
    }
}
