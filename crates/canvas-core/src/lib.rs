//! Layout, mutation and projection over canvas documents
//!
//! - [`geometry`]: canvas height, slot composition, bounding boxes
//! - [`mutation`]: copy-on-write tree edits that keep the document invariants
//! - [`outline`]: the layer panel projection
//! - [`render`]: positioned, styled output plus collaborator references

pub mod geometry;
pub mod mutation;
pub mod outline;
pub mod render;

pub use geometry::{
    bounding_box, canvas_height, compose_slot, compose_template, effective_height, find_slot,
    Composition, SlotPlacement,
};
pub use mutation::{
    bring_to_front, duplicate_node, insert_node, move_node, patch_meta, remove_node, rename,
    reorder, send_to_back, set_data, set_frame, set_style, set_z, toggle_collapsed,
    toggle_hidden, FramePropagation,
};
pub use outline::{outline, IconKind, OutlineRow};
pub use render::{
    render, render_composed, resolve_references, Reference, ReferenceResolver, RenderedCanvas,
    RenderedNode, Resolution, ResolvedReference,
};
