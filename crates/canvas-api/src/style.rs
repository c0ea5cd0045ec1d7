//! Style cascade record attached to nodes.
//!
//! Resolution and sanitization live in `canvas-style`; this module only
//! carries the data so the document model can own it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::Breakpoint;

/// Flat property map, property name -> value. Sorted so serialization is stable.
pub type StyleMap = BTreeMap<String, String>;

/// Interaction state a style is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionState {
    Default,
    Hover,
    Active,
    Focus,
}

impl InteractionState {
    /// States that may carry an override layer.
    pub const OVERRIDABLE: [InteractionState; 3] = [
        InteractionState::Hover,
        InteractionState::Active,
        InteractionState::Focus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionState::Default => "default",
            InteractionState::Hover => "hover",
            InteractionState::Active => "active",
            InteractionState::Focus => "focus",
        }
    }
}

impl fmt::Display for InteractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "" => Ok(InteractionState::Default),
            "hover" => Ok(InteractionState::Hover),
            "active" => Ok(InteractionState::Active),
            "focus" => Ok(InteractionState::Focus),
            other => Err(format!("unknown interaction state '{}'", other)),
        }
    }
}

/// Layered style declarations, lowest priority first:
/// `base` -> `breakpoints` -> `states` -> `stateBreakpoints` -> `advanced`.
///
/// `base` is the desktop default, so `breakpoints` only ever holds
/// mobile/tablet overrides.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleCascade {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub base: StyleMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub breakpoints: BTreeMap<Breakpoint, StyleMap>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub states: BTreeMap<InteractionState, StyleMap>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub state_breakpoints: BTreeMap<InteractionState, BTreeMap<Breakpoint, StyleMap>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub advanced: StyleMap,
}

impl StyleCascade {
    /// Flat style used as the base layer.
    pub fn from_base(base: StyleMap) -> Self {
        Self {
            base,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
            && self.breakpoints.values().all(BTreeMap::is_empty)
            && self.states.values().all(BTreeMap::is_empty)
            && self
                .state_breakpoints
                .values()
                .all(|per_bp| per_bp.values().all(BTreeMap::is_empty))
            && self.advanced.is_empty()
    }

    pub fn breakpoint_layer(&self, breakpoint: Breakpoint) -> Option<&StyleMap> {
        self.breakpoints.get(&breakpoint)
    }

    pub fn state_layer(&self, state: InteractionState) -> Option<&StyleMap> {
        self.states.get(&state)
    }

    pub fn state_breakpoint_layer(
        &self,
        state: InteractionState,
        breakpoint: Breakpoint,
    ) -> Option<&StyleMap> {
        self.state_breakpoints
            .get(&state)
            .and_then(|per_bp| per_bp.get(&breakpoint))
    }

    /// Drop empty nested maps so equal cascades serialize identically.
    pub fn pruned(mut self) -> Self {
        self.breakpoints.retain(|_, map| !map.is_empty());
        self.states.retain(|_, map| !map.is_empty());
        for per_bp in self.state_breakpoints.values_mut() {
            per_bp.retain(|_, map| !map.is_empty());
        }
        self.state_breakpoints.retain(|_, per_bp| !per_bp.is_empty());
        self
    }
}
