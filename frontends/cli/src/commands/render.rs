// Positioned, styled render tree

use anyhow::Result;
use serde_json::{json, Map, Value};
use std::path::Path;

use canvas_api::{Breakpoint, EngineError, InteractionState};
use canvas_core::{render, render_composed, resolve_references, Reference};

use super::{load, read_json, to_pretty_json};
use crate::config::CanvasConfig;

pub struct RenderArgs<'a> {
    pub page: &'a Path,
    /// Render the page inside this template's slot
    pub template: Option<&'a Path>,
    pub breakpoint: Breakpoint,
    pub state: InteractionState,
    /// JSON object mapping reference keys (`media:/a.png`) to content
    pub references: Option<&'a Path>,
}

pub fn run(args: &RenderArgs<'_>, config: &CanvasConfig) -> Result<String> {
    let page = load(args.page, config)?;
    let canvas = match args.template {
        Some(template) => {
            let template = load(template, config)?;
            render_composed(&template, &page, args.breakpoint, args.state)
        }
        None => render(&page, args.breakpoint, args.state),
    };

    let Some(references) = args.references else {
        return to_pretty_json(&canvas);
    };
    let known = match read_json(references)? {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => anyhow::bail!("{} must hold a JSON object", references.display()),
    };
    let resolver = |reference: &Reference| -> canvas_api::Result<Value> {
        known
            .get(&reference.key())
            .cloned()
            .ok_or_else(|| EngineError::unresolved(reference.key(), "not found"))
    };
    let resolved = resolve_references(&canvas, &resolver);
    to_pretty_json(&json!({"canvas": canvas, "references": resolved}))
}
