//! Canvas page-builder document model
//!
//! This crate holds the types shared by every part of the engine:
//! - `Node` / `NodeKind`: the placeable unit and its closed set of variants
//! - `Frame` / `PerBreakpoint`: per-breakpoint absolute geometry
//! - `StyleCascade`: the layered style record attached to nodes
//! - `Document`: the node tree plus canvas settings and an id index
//!
//! Traversal goes through [`walk`], validation through [`validate_node`].

pub mod breakpoint;
pub mod document;
pub mod error;
pub mod frame;
pub mod index;
pub mod limits;
pub mod node;
pub mod style;
pub mod template;
pub mod validate;
pub mod walk;

pub use breakpoint::{Breakpoint, PerBreakpoint};
pub use document::{
    CanvasSettings, Document, TemplateRef, CANONICAL_VERSION, MIN_CANVAS_DIMENSION, SNAP_PX_RANGE,
};
pub use error::{EngineError, Result};
pub use frame::Frame;
pub use index::NodeIndex;
pub use limits::EngineLimits;
pub use node::{
    ButtonData, CollectionListData, EditorData, FrameData, FrameLayout, ImageData, MenuData, Meta,
    MetaPatch, Node, NodeKind, SeparatorData, ShapeData, SlotData, TextData, UnknownData,
};
pub use style::{InteractionState, StyleCascade, StyleMap};
pub use validate::validate_node;
pub use walk::{rewrite, walk, walk_with, WalkContext, WalkControl};
