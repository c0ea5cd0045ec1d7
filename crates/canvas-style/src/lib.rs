//! Style cascade resolution and sanitization
//!
//! - [`resolve_style`]: fold the applicable layers of a cascade into one map
//! - [`sanitize_style`]: admit untrusted style input through the property
//!   allowlist and value grammars

pub mod grammar;
pub mod resolve;
pub mod sanitize;

pub use canvas_api::{InteractionState, StyleCascade, StyleMap};
pub use grammar::{property_grammar, Grammar};
pub use resolve::{merge, resolve_style, style_layers, LayerName, StyleLayer};
pub use sanitize::{sanitize_style, sanitize_style_with, StyleSanitizer};
