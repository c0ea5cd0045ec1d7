//! Ingestion of untrusted style input.
//!
//! Sanitization is total: anything that fails a check is dropped and
//! recorded as [`EngineError::SanitizationRejected`], never returned as an
//! error. Callers that only need the cleaned cascade use [`sanitize_style`].

use canvas_api::{Breakpoint, EngineError, EngineLimits, InteractionState, StyleCascade, StyleMap};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::grammar::property_grammar;

const LAYER_KEYS: [&str; 5] = ["base", "breakpoints", "states", "stateBreakpoints", "advanced"];

static INJECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)<\s*script|</\s*style|javascript\s*:|vbscript\s*:|data\s*:\s*text/html|@import|expression\s*\(|behavior\s*:|[{}]",
    )
    .expect("static injection pattern")
});

static ADVANCED_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:--[a-zA-Z0-9_-]{1,64}|-?[a-zA-Z][a-zA-Z0-9-]{0,63})$")
        .expect("static advanced key pattern")
});

/// Clean an untrusted style record with the default limits.
///
/// Returns `None` when nothing survives.
pub fn sanitize_style(raw: &Value) -> Option<StyleCascade> {
    sanitize_style_with(raw, &EngineLimits::default())
}

pub fn sanitize_style_with(raw: &Value, limits: &EngineLimits) -> Option<StyleCascade> {
    StyleSanitizer::new(limits).sanitize(raw)
}

/// Sanitizer that keeps the list of everything it rejected.
///
/// At most `max_style_items` rejections are kept; past that a single
/// trailing entry counts the ones omitted.
#[derive(Debug)]
pub struct StyleSanitizer<'l> {
    limits: &'l EngineLimits,
    rejected: Vec<EngineError>,
    omitted: usize,
}

impl<'l> StyleSanitizer<'l> {
    pub fn new(limits: &'l EngineLimits) -> Self {
        Self {
            limits,
            rejected: Vec::new(),
            omitted: 0,
        }
    }

    /// Rejections recorded so far, oldest first.
    pub fn rejected(&self) -> &[EngineError] {
        &self.rejected
    }

    pub fn into_rejected(self) -> Vec<EngineError> {
        self.rejected
    }

    pub fn sanitize(&mut self, raw: &Value) -> Option<StyleCascade> {
        let Some(object) = raw.as_object() else {
            if !raw.is_null() {
                self.reject("style", "style must be an object");
            }
            return None;
        };

        let layered = LAYER_KEYS.iter().any(|key| object.contains_key(*key));
        let style = if layered {
            self.layered(object)
        } else {
            StyleCascade::from_base(self.allowlisted_map("base", object))
        };

        let style = style.pruned();
        (!style.is_empty()).then_some(style)
    }

    fn layered(&mut self, object: &Map<String, Value>) -> StyleCascade {
        for (key, _) in self.capped("style", object) {
            if !LAYER_KEYS.contains(&key.as_str()) {
                self.reject(key, "unknown style layer");
            }
        }

        let mut style = StyleCascade::default();
        if let Some(base) = self.object_at(object, "base") {
            style.base = self.allowlisted_map("base", base);
        }
        if let Some(breakpoints) = self.object_at(object, "breakpoints") {
            style.breakpoints = self.per_breakpoint("breakpoints", breakpoints);
        }
        if let Some(states) = self.object_at(object, "states") {
            for (key, value) in self.capped("states", states) {
                let path = format!("states.{}", key);
                let Some(state) = self.overridable_state(&path, key) else {
                    continue;
                };
                if let Some(map) = self.expect_object(&path, value) {
                    let map = self.allowlisted_map(&path, map);
                    style.states.insert(state, map);
                }
            }
        }
        if let Some(scoped) = self.object_at(object, "stateBreakpoints") {
            for (key, value) in self.capped("stateBreakpoints", scoped) {
                let path = format!("stateBreakpoints.{}", key);
                let Some(state) = self.overridable_state(&path, key) else {
                    continue;
                };
                if let Some(per_bp) = self.expect_object(&path, value) {
                    let per_bp = self.per_breakpoint(&path, per_bp);
                    style.state_breakpoints.insert(state, per_bp);
                }
            }
        }
        if let Some(advanced) = self.object_at(object, "advanced") {
            style.advanced = self.advanced_map(advanced);
        }
        style
    }

    fn per_breakpoint(
        &mut self,
        path: &str,
        object: &Map<String, Value>,
    ) -> BTreeMap<Breakpoint, StyleMap> {
        let mut out = BTreeMap::new();
        for (key, value) in self.capped(path, object) {
            let layer_path = format!("{}.{}", path, key);
            match key.parse::<Breakpoint>() {
                Ok(Breakpoint::Desktop) => {
                    self.reject(&layer_path, "desktop overrides belong in base");
                }
                Ok(bp) => {
                    if let Some(map) = self.expect_object(&layer_path, value) {
                        let map = self.allowlisted_map(&layer_path, map);
                        out.insert(bp, map);
                    }
                }
                Err(reason) => self.reject(&layer_path, reason),
            }
        }
        out
    }

    fn overridable_state(&mut self, path: &str, key: &str) -> Option<InteractionState> {
        match key.parse::<InteractionState>() {
            Ok(state) if InteractionState::OVERRIDABLE.contains(&state) => Some(state),
            Ok(_) => {
                self.reject(path, "default state has no override layer");
                None
            }
            Err(reason) => {
                self.reject(path, reason);
                None
            }
        }
    }

    fn allowlisted_map(&mut self, path: &str, object: &Map<String, Value>) -> StyleMap {
        let mut out = StyleMap::new();
        for (property, raw) in self.capped(path, object) {
            let Some(grammar) = property_grammar(property) else {
                self.reject(property, format!("{}: unsupported property", path));
                continue;
            };
            let Some(value) = self.clean_value(property, raw) else {
                continue;
            };
            if grammar.accepts(&value) {
                out.insert(property.clone(), value);
            } else {
                self.reject(property, format!("{}: invalid value '{}'", path, value));
            }
        }
        out
    }

    fn advanced_map(&mut self, object: &Map<String, Value>) -> StyleMap {
        let mut out = StyleMap::new();
        for (key, raw) in self.capped("advanced", object) {
            if !ADVANCED_KEY.is_match(key) {
                self.reject(key, "advanced: key is not a safe identifier");
                continue;
            }
            if let Some(value) = self.clean_value(key, raw) {
                out.insert(key.clone(), value);
            }
        }
        out
    }

    /// Entries of `object` up to the per-map cap.
    fn capped<'o>(
        &mut self,
        path: &str,
        object: &'o Map<String, Value>,
    ) -> Vec<(&'o String, &'o Value)> {
        let max = self.limits.max_style_items;
        if object.len() > max {
            self.reject(
                path,
                format!("{} entries exceed the limit of {}", object.len(), max),
            );
        }
        object.iter().take(max).collect()
    }

    /// Shared value checks: type, trimming, length cap and injection patterns.
    fn clean_value(&mut self, property: &str, raw: &Value) -> Option<String> {
        let value = match raw {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.is_finite() => n.to_string(),
                _ => {
                    self.reject(property, "number is not finite");
                    return None;
                }
            },
            _ => {
                self.reject(property, "value must be a string or number");
                return None;
            }
        };

        if value.is_empty() {
            self.reject(property, "empty value");
            return None;
        }
        if value.chars().count() > self.limits.max_style_value_len {
            self.reject(
                property,
                format!("value longer than {} characters", self.limits.max_style_value_len),
            );
            return None;
        }
        if INJECTION.is_match(&value) {
            self.reject(property, "value matches an injection pattern");
            return None;
        }
        Some(value)
    }

    fn object_at<'o>(
        &mut self,
        object: &'o Map<String, Value>,
        key: &str,
    ) -> Option<&'o Map<String, Value>> {
        object
            .get(key)
            .and_then(|value| self.expect_object(key, value))
    }

    fn expect_object<'o>(&mut self, path: &str, value: &'o Value) -> Option<&'o Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            Value::Null => None,
            _ => {
                self.reject(path, "layer must be an object");
                None
            }
        }
    }

    fn reject(&mut self, property: &str, reason: impl Into<String>) {
        let err = EngineError::rejected(property, reason);
        debug!("{}", err);

        let max = self.limits.max_style_items;
        if self.rejected.len() < max {
            self.rejected.push(err);
            return;
        }
        self.omitted += 1;
        let summary = EngineError::rejected(
            "style",
            format!("{} more rejections omitted", self.omitted),
        );
        if self.rejected.len() == max {
            self.rejected.push(summary);
        } else if let Some(last) = self.rejected.last_mut() {
            *last = summary;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_script_scheme_is_rejected() {
        let style = sanitize_style(&json!({
            "base": {"backgroundImage": "url(javascript:alert(1))", "color": "red"}
        }))
        .unwrap();
        assert!(!style.base.contains_key("backgroundImage"));
        assert_eq!(style.base.get("color").map(String::as_str), Some("red"));
    }

    #[test]
    fn test_width_needs_a_unit() {
        let style = sanitize_style(&json!({"base": {"width": "100px"}})).unwrap();
        assert_eq!(style.base.get("width").map(String::as_str), Some("100px"));

        assert!(sanitize_style(&json!({"base": {"width": "100"}})).is_none());
        assert!(sanitize_style(&json!({"base": {"width": 100}})).is_none());
    }

    #[test]
    fn test_opacity_out_of_range_is_rejected() {
        assert!(sanitize_style(&json!({"base": {"opacity": "1.5"}})).is_none());
        let style = sanitize_style(&json!({"base": {"opacity": 0.5}})).unwrap();
        assert_eq!(style.base.get("opacity").map(String::as_str), Some("0.5"));
    }

    #[test]
    fn test_advanced_custom_property_is_accepted() {
        let style = sanitize_style(&json!({"advanced": {"--brand-color": "#1a2b3c"}})).unwrap();
        assert_eq!(
            style.advanced.get("--brand-color").map(String::as_str),
            Some("#1a2b3c")
        );

        assert!(sanitize_style(&json!({"advanced": {"--x; color": "red"}})).is_none());
        assert!(sanitize_style(&json!({"advanced": {"--x": "a}b"}})).is_none());
    }

    #[test]
    fn test_vendor_prefixed_advanced_keys() {
        let style = sanitize_style(&json!({"advanced": {
            "-webkit-line-clamp": "3",
            "-moz-appearance": "none"
        }}))
        .unwrap();
        assert_eq!(
            style.advanced.get("-webkit-line-clamp").map(String::as_str),
            Some("3")
        );
        assert_eq!(style.advanced.len(), 2);

        assert!(sanitize_style(&json!({"advanced": {"-1abc": "x"}})).is_none());
        assert!(sanitize_style(&json!({"advanced": {"---": "x"}})).is_some());
    }

    #[test]
    fn test_flat_legacy_object_reads_as_base() {
        let style = sanitize_style(&json!({"color": " #fff ", "position": "absolute"})).unwrap();
        assert_eq!(style.base.get("color").map(String::as_str), Some("#fff"));
        assert_eq!(style.base.get("position").map(String::as_str), Some("absolute"));
    }

    #[test]
    fn test_layers_are_validated() {
        let raw = json!({
            "breakpoints": {"mobile": {"width": "100%"}, "desktop": {"width": "50%"}, "watch": {}},
            "states": {"hover": {"color": "blue"}, "default": {"color": "red"}},
            "stateBreakpoints": {"focus": {"tablet": {"borderColor": "#000"}}},
            "extra": {}
        });
        let limits = EngineLimits::default();
        let mut sanitizer = StyleSanitizer::new(&limits);
        let style = sanitizer.sanitize(&raw).unwrap();

        assert_eq!(style.breakpoints.len(), 1);
        assert!(style.breakpoints.contains_key(&Breakpoint::Mobile));
        assert_eq!(style.states.len(), 1);
        assert_eq!(
            style
                .state_breakpoint_layer(InteractionState::Focus, Breakpoint::Tablet)
                .and_then(|m| m.get("borderColor"))
                .map(String::as_str),
            Some("#000")
        );
        // desktop override, unknown breakpoint, default state, unknown layer
        assert_eq!(sanitizer.rejected().len(), 4);
        assert!(sanitizer
            .rejected()
            .iter()
            .all(|e| matches!(e, EngineError::SanitizationRejected { .. })));
    }

    #[test]
    fn test_item_cap_bounds_each_map() {
        let limits = EngineLimits {
            max_style_items: 2,
            ..Default::default()
        };
        let raw = json!({"base": {"color": "red", "display": "flex", "opacity": "1", "zIndex": "3"}});
        let style = sanitize_style_with(&raw, &limits).unwrap();
        assert_eq!(style.base.len(), 2);
    }

    #[test]
    fn test_layer_maps_and_rejections_are_bounded() {
        let limits = EngineLimits {
            max_style_items: 4,
            ..Default::default()
        };
        let bogus: Map<String, Value> = (0..500)
            .map(|i| (format!("state{}", i), json!({"color": "red"})))
            .collect();
        let breakpoints: Map<String, Value> = (0..500)
            .map(|i| (format!("bp{}", i), json!({})))
            .collect();
        let raw = json!({
            "base": {"color": "red"},
            "states": bogus,
            "stateBreakpoints": bogus,
            "breakpoints": breakpoints
        });

        let mut sanitizer = StyleSanitizer::new(&limits);
        let style = sanitizer.sanitize(&raw).unwrap();
        assert!(style.states.is_empty());
        assert!(style.breakpoints.is_empty());

        let rejected = sanitizer.into_rejected();
        assert_eq!(rejected.len(), 5);
        match rejected.last() {
            Some(EngineError::SanitizationRejected { reason, .. }) => {
                assert!(reason.ends_with("more rejections omitted"), "{}", reason);
            }
            other => panic!("expected a summary, got {:?}", other),
        }
    }

    #[test]
    fn test_over_long_values_are_rejected() {
        let long = format!("{}px", "1".repeat(300));
        assert!(sanitize_style(&json!({"base": {"width": long}})).is_none());
    }

    #[test]
    fn test_non_objects_yield_nothing() {
        assert!(sanitize_style(&Value::Null).is_none());
        assert!(sanitize_style(&json!("color: red")).is_none());
        assert!(sanitize_style(&json!({"base": {"color": ["red"]}})).is_none());
    }
}
