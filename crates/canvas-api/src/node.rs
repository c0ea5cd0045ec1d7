use serde::ser::{SerializeSeq, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::{Breakpoint, Frame, PerBreakpoint, StyleCascade};

/// Unrecognized payload keys, kept verbatim so a round-trip never drops data.
pub type Extra = BTreeMap<String, Value>;

/// Longest label derived from node content before truncation.
pub const MAX_LABEL_CHARS: usize = 32;

// =============================================================================
// Variant payloads
// =============================================================================

/// Layout semantics of a frame container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameLayout {
    #[default]
    Box,
    Flex,
    Grid,
    Section,
}

impl FrameLayout {
    pub fn display_name(&self) -> &'static str {
        match self {
            FrameLayout::Box => "Box",
            FrameLayout::Flex => "Flex",
            FrameLayout::Grid => "Grid",
            FrameLayout::Section => "Section",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameData {
    #[serde(default)]
    pub layout: FrameLayout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShapeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Rich text. The document format belongs to the editor, so `doc` is opaque.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditorData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Navigation reference. `menu` names the menu a data source resolves.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MenuData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SlotData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Dynamic data-bound repeater. The query is resolved by a collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectionListData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ButtonData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeparatorData {
    #[serde(flatten)]
    pub extra: Extra,
}

/// A node whose type this engine does not understand.
///
/// The original type string, payload and raw children are kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownData {
    pub original_type: String,
    pub data: Value,
    pub nodes: Option<Value>,
}

// =============================================================================
// NodeKind - closed set of node variants
// =============================================================================

/// The node variant and its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Frame(FrameData),
    Shape(ShapeData),
    Text(TextData),
    Editor(EditorData),
    Image(ImageData),
    Menu(MenuData),
    Slot(SlotData),
    CollectionList(CollectionListData),
    Button(ButtonData),
    Separator(SeparatorData),
    Unknown(UnknownData),
}

impl NodeKind {
    /// Build a kind from the stored `type` tag and `data` payload.
    ///
    /// Legacy tags are folded into their current variant (`typography` is
    /// text, `tiptap` is editor). Unrecognized tags become `Unknown`.
    pub fn from_parts(type_tag: &str, data: Value) -> std::result::Result<Self, String> {
        let normalized = type_tag.trim().to_ascii_lowercase();
        let known = matches!(
            normalized.as_str(),
            "frame"
                | "shape"
                | "text"
                | "typography"
                | "editor"
                | "tiptap"
                | "image"
                | "menu"
                | "slot"
                | "collection-list"
                | "button"
                | "separator"
        );
        if !known {
            return Ok(NodeKind::Unknown(UnknownData {
                original_type: type_tag.to_string(),
                data,
                nodes: None,
            }));
        }

        let data = match data {
            Value::Null => Value::Object(Default::default()),
            Value::Object(_) => data,
            _ => return Err("data must be an object".to_string()),
        };

        fn typed<T: serde::de::DeserializeOwned>(data: Value) -> std::result::Result<T, String> {
            serde_json::from_value(data).map_err(|e| format!("invalid data: {}", e))
        }

        Ok(match normalized.as_str() {
            "frame" => NodeKind::Frame(typed(data)?),
            "shape" => NodeKind::Shape(typed(data)?),
            "text" | "typography" => NodeKind::Text(typed(data)?),
            "editor" | "tiptap" => NodeKind::Editor(typed(data)?),
            "image" => NodeKind::Image(typed(data)?),
            "menu" => NodeKind::Menu(typed(data)?),
            "slot" => NodeKind::Slot(typed(data)?),
            "collection-list" => NodeKind::CollectionList(typed(data)?),
            "button" => NodeKind::Button(typed(data)?),
            _ => NodeKind::Separator(typed(data)?),
        })
    }

    pub fn frame(layout: FrameLayout) -> Self {
        NodeKind::Frame(FrameData {
            layout,
            ..Default::default()
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        NodeKind::Text(TextData {
            text: Some(text.into()),
            ..Default::default()
        })
    }

    pub fn image(url: impl Into<String>, alt: impl Into<String>) -> Self {
        NodeKind::Image(ImageData {
            url: Some(url.into()),
            alt: Some(alt.into()),
            ..Default::default()
        })
    }

    pub fn slot() -> Self {
        NodeKind::Slot(SlotData::default())
    }

    /// The `type` tag written to JSON. Unknown nodes keep their original tag.
    pub fn type_tag(&self) -> &str {
        match self {
            NodeKind::Frame(_) => "frame",
            NodeKind::Shape(_) => "shape",
            NodeKind::Text(_) => "text",
            NodeKind::Editor(_) => "editor",
            NodeKind::Image(_) => "image",
            NodeKind::Menu(_) => "menu",
            NodeKind::Slot(_) => "slot",
            NodeKind::CollectionList(_) => "collection-list",
            NodeKind::Button(_) => "button",
            NodeKind::Separator(_) => "separator",
            NodeKind::Unknown(u) => &u.original_type,
        }
    }

    /// Whether nodes of this kind may own children. Shapes group their
    /// children the way frames do.
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Frame(_) | NodeKind::Shape(_))
    }

    /// Same variant, payload ignored.
    pub fn same_variant(&self, other: &NodeKind) -> bool {
        match (self, other) {
            (NodeKind::Unknown(a), NodeKind::Unknown(b)) => a.original_type == b.original_type,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }

    /// Label used when the author has not named the node.
    pub fn default_label(&self) -> String {
        match self {
            NodeKind::Frame(data) => data
                .label
                .as_deref()
                .and_then(non_blank)
                .map(truncate_label)
                .unwrap_or_else(|| data.layout.display_name().to_string()),
            NodeKind::Shape(_) => "Shape".to_string(),
            NodeKind::Text(data) => data
                .text
                .as_deref()
                .and_then(non_blank)
                .map(truncate_label)
                .unwrap_or_else(|| "Text".to_string()),
            NodeKind::Editor(_) => "Rich text".to_string(),
            NodeKind::Image(data) => data
                .alt
                .as_deref()
                .and_then(non_blank)
                .map(truncate_label)
                .unwrap_or_else(|| "Image".to_string()),
            NodeKind::Menu(data) => match data.menu.as_deref().and_then(non_blank) {
                Some(menu) => truncate_label(&format!("menu:{}", menu)),
                None => "Menu".to_string(),
            },
            NodeKind::Slot(data) => data
                .name
                .as_deref()
                .and_then(non_blank)
                .map(truncate_label)
                .unwrap_or_else(|| "Slot".to_string()),
            NodeKind::CollectionList(data) => match data.type_slug.as_deref().and_then(non_blank)
            {
                Some(slug) => truncate_label(&format!("collection:{}", slug)),
                None => "Collection".to_string(),
            },
            NodeKind::Button(data) => data
                .label
                .as_deref()
                .and_then(non_blank)
                .map(truncate_label)
                .unwrap_or_else(|| "Button".to_string()),
            NodeKind::Separator(_) => "Separator".to_string(),
            NodeKind::Unknown(data) => truncate_label(&data.original_type),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_tag())
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Collapse whitespace and cut to [`MAX_LABEL_CHARS`], ending with an ellipsis when cut.
pub fn truncate_label(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_LABEL_CHARS {
        return collapsed;
    }
    let mut out: String = collapsed.chars().take(MAX_LABEL_CHARS - 1).collect();
    out.push('…');
    out
}

/// Serializes the payload of a kind as the `data` field.
struct KindData<'a>(&'a NodeKind);

impl Serialize for KindData<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            NodeKind::Frame(d) => d.serialize(serializer),
            NodeKind::Shape(d) => d.serialize(serializer),
            NodeKind::Text(d) => d.serialize(serializer),
            NodeKind::Editor(d) => d.serialize(serializer),
            NodeKind::Image(d) => d.serialize(serializer),
            NodeKind::Menu(d) => d.serialize(serializer),
            NodeKind::Slot(d) => d.serialize(serializer),
            NodeKind::CollectionList(d) => d.serialize(serializer),
            NodeKind::Button(d) => d.serialize(serializer),
            NodeKind::Separator(d) => d.serialize(serializer),
            NodeKind::Unknown(d) => d.data.serialize(serializer),
        }
    }
}

// =============================================================================
// Meta
// =============================================================================

fn is_false(b: &bool) -> bool {
    !*b
}

/// Presentation-only metadata. Never affects layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub collapsed: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Meta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && !self.hidden && !self.collapsed && self.extra.is_empty()
    }

    /// Merge the set fields of `patch` into this meta.
    pub fn apply(&mut self, patch: &MetaPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(hidden) = patch.hidden {
            self.hidden = hidden;
        }
        if let Some(collapsed) = patch.collapsed {
            self.collapsed = collapsed;
        }
    }
}

/// Partial update of [`Meta`]. `None` fields are left untouched;
/// `name: Some(None)` clears the name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetaPatch {
    pub name: Option<Option<String>>,
    pub hidden: Option<bool>,
    pub collapsed: Option<bool>,
}

impl MetaPatch {
    pub fn name(name: Option<String>) -> Self {
        Self {
            name: Some(name),
            ..Default::default()
        }
    }

    pub fn hidden(hidden: bool) -> Self {
        Self {
            hidden: Some(hidden),
            ..Default::default()
        }
    }

    pub fn collapsed(collapsed: bool) -> Self {
        Self {
            collapsed: Some(collapsed),
            ..Default::default()
        }
    }
}

// =============================================================================
// Node
// =============================================================================

/// The unit of placement on the canvas.
///
/// Children are positioned in canvas coordinates; parentage expresses
/// ownership and clipping only. Children are reference counted so document
/// versions share untouched subtrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Stable identifier, unique across the whole document
    pub id: String,
    pub kind: NodeKind,
    /// Rectangle for every breakpoint
    pub frames: PerBreakpoint<Frame>,
    pub meta: Meta,
    pub style: Option<StyleCascade>,
    /// Ordered children; only containers may have any
    pub nodes: Vec<Arc<Node>>,
}

impl Node {
    /// Create a node using the same frame at every breakpoint.
    pub fn new(id: impl Into<String>, kind: NodeKind, frame: Frame) -> Self {
        Self {
            id: id.into(),
            kind,
            frames: PerBreakpoint::splat(frame),
            meta: Meta::default(),
            style: None,
            nodes: Vec::new(),
        }
    }

    /// Full-width frames for every breakpoint at the given vertical position.
    pub fn default_frames(widths: &PerBreakpoint<u32>, y: f64, h: f64) -> PerBreakpoint<Frame> {
        widths.map(|_, w| Frame::new(0.0, y, f64::from(*w), h))
    }

    pub fn with_frames(mut self, frames: PerBreakpoint<Frame>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_frame(mut self, breakpoint: Breakpoint, frame: Frame) -> Self {
        self.frames.set(breakpoint, frame);
        self
    }

    /// Attach children. Non-containers accept them here but fail validation.
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.nodes = children.into_iter().map(Arc::new).collect();
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_style(mut self, style: StyleCascade) -> Self {
        self.style = Some(style);
        self
    }

    pub fn frame(&self, breakpoint: Breakpoint) -> &Frame {
        self.frames.get(breakpoint)
    }

    pub fn children(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn type_tag(&self) -> &str {
        self.kind.type_tag()
    }

    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }

    /// Explicit name if set, otherwise the type-derived default.
    pub fn label(&self) -> String {
        match self.meta.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.kind.default_label(),
        }
    }
}

pub(crate) struct ChildList<'a>(pub(crate) &'a [Arc<Node>]);

impl Serialize for ChildList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for child in self.0 {
            seq.serialize_element(child.as_ref())?;
        }
        seq.end()
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Node", 7)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("type", self.kind.type_tag())?;
        state.serialize_field("data", &KindData(&self.kind))?;
        state.serialize_field("frames", &self.frames)?;

        if self.meta.is_empty() {
            state.skip_field("meta")?;
        } else {
            state.serialize_field("meta", &self.meta)?;
        }

        match &self.style {
            Some(style) if !style.is_empty() => state.serialize_field("style", style)?,
            _ => state.skip_field("style")?,
        }

        match &self.kind {
            NodeKind::Unknown(UnknownData {
                nodes: Some(raw), ..
            }) => state.serialize_field("nodes", raw)?,
            _ if !self.nodes.is_empty() => {
                state.serialize_field("nodes", &ChildList(&self.nodes))?
            }
            _ => state.skip_field("nodes")?,
        }

        state.end()
    }
}
