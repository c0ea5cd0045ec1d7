// Summary of a stored document

use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::path::Path;

use canvas_api::{Breakpoint, PerBreakpoint};
use canvas_core::effective_height;
use canvas_format::ParseOutcome;

use super::{load_document, to_pretty_json};
use crate::config::CanvasConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectReport {
    pub source_version: Option<u32>,
    pub upgraded: bool,
    pub node_count: usize,
    pub widths: PerBreakpoint<u32>,
    /// Effective canvas height per breakpoint
    pub heights: PerBreakpoint<f64>,
    pub template: Option<String>,
    pub dropped: Vec<String>,
}

impl InspectReport {
    pub fn from_outcome(outcome: &ParseOutcome) -> Self {
        let doc = &outcome.document;
        Self {
            source_version: outcome.source_version,
            upgraded: outcome.upgraded,
            node_count: doc.node_count(),
            widths: doc.canvas.widths,
            heights: PerBreakpoint::new(
                effective_height(doc, Breakpoint::Mobile),
                effective_height(doc, Breakpoint::Tablet),
                effective_height(doc, Breakpoint::Desktop),
            ),
            template: doc.template.id.clone(),
            dropped: outcome.dropped.iter().map(ToString::to_string).collect(),
        }
    }
}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source_version {
            Some(v) if self.upgraded => writeln!(f, "version:  {} (upgraded)", v)?,
            Some(v) => writeln!(f, "version:  {}", v)?,
            None if self.upgraded => writeln!(f, "version:  none (upgraded)")?,
            None => writeln!(f, "version:  none")?,
        }
        writeln!(f, "nodes:    {}", self.node_count)?;
        for (bp, height) in self.heights.iter() {
            writeln!(f, "{:<9} {}x{}", format!("{}:", bp), self.widths.get(bp), height)?;
        }
        if let Some(template) = &self.template {
            writeln!(f, "template: {}", template)?;
        }
        if !self.dropped.is_empty() {
            writeln!(f, "dropped ({}):", self.dropped.len())?;
            for reason in &self.dropped {
                writeln!(f, "  - {}", reason)?;
            }
        }
        Ok(())
    }
}

pub fn run(path: &Path, json: bool, config: &CanvasConfig) -> Result<String> {
    let report = InspectReport::from_outcome(&load_document(path, config)?);
    if json {
        to_pretty_json(&report)
    } else {
        Ok(report.to_string())
    }
}
