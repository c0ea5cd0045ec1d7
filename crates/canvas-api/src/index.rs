//! Side index from node id to its parent's id.
//!
//! Nodes carry no parent back-references. The index answers "which
//! container owns this id" in O(1); positions are recovered from the tree
//! by climbing the parent chain. Only parentage is recorded, so reordering
//! a list never touches the index and moving a node rewrites one entry.
//!
//! Entries live in fixed shards behind `Arc`. Cloning the index copies the
//! shard handles, and an edit copies only the shards it writes to, so a
//! document and its edited successor share almost all of their index.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::walk::{walk_with, WalkControl};
use crate::Node;

const SHARDS: usize = 64;

type Shard = HashMap<String, Option<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIndex {
    shards: Vec<Arc<Shard>>,
}

impl Default for NodeIndex {
    fn default() -> Self {
        Self {
            shards: (0..SHARDS).map(|_| Arc::default()).collect(),
        }
    }
}

impl NodeIndex {
    /// Index a whole tree. Fails with the first duplicated id.
    pub fn build(nodes: &[Arc<Node>]) -> std::result::Result<Self, String> {
        let mut index = Self::default();
        index.insert_list(nodes, None)?;
        Ok(index)
    }

    /// Parentage of `id`: `None` for unknown ids, `Some(None)` for top-level
    /// nodes.
    pub fn get(&self, id: &str) -> Option<Option<&str>> {
        self.shard(id).get(id).map(Option::as_deref)
    }

    /// Id of the container owning `id`; `None` for top-level or unknown ids.
    pub fn parent_id(&self, id: &str) -> Option<&str> {
        self.get(id).flatten()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.shard(id).contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.is_empty())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.shards
            .iter()
            .flat_map(|shard| shard.keys().map(String::as_str))
    }

    /// Ids from the top-level ancestor down to `id` itself.
    pub fn ancestry(&self, id: &str) -> Option<Vec<&str>> {
        let (key, mut parent) = self.shard(id).get_key_value(id)?;
        let mut chain = vec![key.as_str()];
        while let Some(parent_id) = parent.as_deref() {
            let (key, next) = self.shard(parent_id).get_key_value(parent_id)?;
            // Corrupt chains would otherwise loop forever
            if chain.len() > self.len() {
                return None;
            }
            chain.push(key.as_str());
            parent = next;
        }
        chain.reverse();
        Some(chain)
    }

    /// Index a sibling list (and everything below it) owned by `parent`.
    pub fn insert_list(
        &mut self,
        nodes: &[Arc<Node>],
        parent: Option<&str>,
    ) -> std::result::Result<(), String> {
        let mut duplicate = None;
        walk_with(nodes, |node, ctx| {
            if self.contains(&node.id) {
                duplicate = Some(node.id.clone());
                return WalkControl::Stop;
            }
            let owner = ctx.parent_id().or(parent).map(str::to_string);
            self.shard_mut(&node.id).insert(node.id.clone(), owner);
            WalkControl::Continue
        });
        match duplicate {
            Some(id) => Err(format!("duplicate node id '{}'", id)),
            None => Ok(()),
        }
    }

    /// Forget a sibling list and everything below it.
    pub fn remove_list(&mut self, nodes: &[Arc<Node>]) {
        walk_with(nodes, |node, _| {
            self.shard_mut(&node.id).remove(&node.id);
            WalkControl::Continue
        });
    }

    /// Bring the index in line with a sibling list that changed from `old`
    /// to `new`. Children present in both (the same `Arc`) keep their
    /// entries; the rest are removed or indexed.
    pub fn replace_list(
        &mut self,
        old: &[Arc<Node>],
        new: &[Arc<Node>],
        parent: Option<&str>,
    ) -> std::result::Result<(), String> {
        let (removed, added) = list_changes(old, new);
        self.remove_list(&removed);
        self.insert_list(&added, parent)
    }

    fn shard(&self, id: &str) -> &Shard {
        &self.shards[shard_of(id)]
    }

    fn shard_mut(&mut self, id: &str) -> &mut Shard {
        Arc::make_mut(&mut self.shards[shard_of(id)])
    }
}

fn shard_of(id: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    (hasher.finish() % SHARDS as u64) as usize
}

/// Children that left and children that arrived between two versions of a
/// list, compared by identity. A child repeated in `new` more often than in
/// `old` counts as arrived, so the duplicate id is caught on insert.
fn list_changes(old: &[Arc<Node>], new: &[Arc<Node>]) -> (Vec<Arc<Node>>, Vec<Arc<Node>>) {
    let mut unmatched: HashMap<*const Node, usize> = HashMap::new();
    for node in old {
        *unmatched.entry(Arc::as_ptr(node)).or_default() += 1;
    }

    let mut added = Vec::new();
    for node in new {
        match unmatched.get_mut(&Arc::as_ptr(node)) {
            Some(count) if *count > 0 => *count -= 1,
            _ => added.push(Arc::clone(node)),
        }
    }

    let mut removed = Vec::new();
    let mut seen = HashSet::new();
    for node in old {
        let ptr = Arc::as_ptr(node);
        if unmatched.get(&ptr).is_some_and(|count| *count > 0) && seen.insert(ptr) {
            removed.push(Arc::clone(node));
        }
    }
    (removed, added)
}
