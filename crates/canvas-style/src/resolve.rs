//! Cascade resolution.
//!
//! The applicable layers are listed explicitly, lowest priority first, and
//! folded by one `merge` reducer. Precedence lives in [`style_layers`] only.

use canvas_api::{Breakpoint, InteractionState, StyleCascade, StyleMap};
use std::fmt;

/// Which layer of a cascade a property map came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerName {
    Base,
    Breakpoint(Breakpoint),
    State(InteractionState),
    StateBreakpoint(InteractionState, Breakpoint),
    Advanced,
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerName::Base => write!(f, "base"),
            LayerName::Breakpoint(bp) => write!(f, "breakpoints.{}", bp),
            LayerName::State(state) => write!(f, "states.{}", state),
            LayerName::StateBreakpoint(state, bp) => write!(f, "stateBreakpoints.{}.{}", state, bp),
            LayerName::Advanced => write!(f, "advanced"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleLayer<'a> {
    pub name: LayerName,
    pub properties: &'a StyleMap,
}

/// Layers that apply at `breakpoint` and `state`, lowest priority first.
///
/// Breakpoint layers are skipped at desktop (base already is desktop) and
/// state layers are skipped at the default state.
pub fn style_layers(
    style: &StyleCascade,
    breakpoint: Breakpoint,
    state: InteractionState,
) -> Vec<StyleLayer<'_>> {
    let mut layers = vec![StyleLayer {
        name: LayerName::Base,
        properties: &style.base,
    }];

    let scoped_breakpoint = (breakpoint != Breakpoint::Desktop).then_some(breakpoint);
    let active_state = (state != InteractionState::Default).then_some(state);

    if let Some(bp) = scoped_breakpoint {
        if let Some(properties) = style.breakpoint_layer(bp) {
            layers.push(StyleLayer {
                name: LayerName::Breakpoint(bp),
                properties,
            });
        }
    }
    if let Some(state) = active_state {
        if let Some(properties) = style.state_layer(state) {
            layers.push(StyleLayer {
                name: LayerName::State(state),
                properties,
            });
        }
        if let Some(bp) = scoped_breakpoint {
            if let Some(properties) = style.state_breakpoint_layer(state, bp) {
                layers.push(StyleLayer {
                    name: LayerName::StateBreakpoint(state, bp),
                    properties,
                });
            }
        }
    }

    layers.push(StyleLayer {
        name: LayerName::Advanced,
        properties: &style.advanced,
    });
    layers
}

/// Fold one layer into the accumulated map; the layer wins on conflicts.
pub fn merge(mut acc: StyleMap, layer: &StyleLayer<'_>) -> StyleMap {
    acc.extend(
        layer
            .properties
            .iter()
            .map(|(property, value)| (property.clone(), value.clone())),
    );
    acc
}

/// Final property map for a node's style at `breakpoint` and `state`.
pub fn resolve_style(
    style: Option<&StyleCascade>,
    breakpoint: Breakpoint,
    state: InteractionState,
) -> StyleMap {
    match style {
        Some(style) => style_layers(style, breakpoint, state)
            .iter()
            .fold(StyleMap::new(), merge),
        None => StyleMap::new(),
    }
}
