//! Value grammars for allowlisted style properties.
//!
//! Every property accepted outside `advanced` maps to one [`Grammar`]; a
//! property missing from [`property_grammar`] is not on the allowlist.

use once_cell::sync::Lazy;
use regex::Regex;

/// Accepted shape of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    /// One of a fixed keyword set
    Keywords(&'static [&'static str]),
    /// Space separated lengths or percentages
    Length {
        max_tokens: usize,
        negative: bool,
        keywords: &'static [&'static str],
    },
    Color,
    Integer,
    /// Plain number in `[0, 1]`
    UnitInterval,
    /// `normal`, a unitless multiplier, or a length
    LineHeight,
    /// `normal`, `bold`, or a 100..=900 weight
    FontWeight,
    TimingFunction,
    Time,
    /// No grammar beyond the shared injection and length checks
    Free,
}

const SIZE_KEYWORDS: &[&str] = &["auto", "fit-content", "min-content", "max-content"];
const MAX_SIZE_KEYWORDS: &[&str] = &["none", "fit-content", "min-content", "max-content"];
const FONT_SIZE_KEYWORDS: &[&str] = &[
    "xx-small", "x-small", "small", "medium", "large", "x-large", "xx-large", "smaller", "larger",
];

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "solid", "dashed", "dotted", "double", "groove", "ridge", "inset", "outset",
];
const DISPLAY: &[&str] = &[
    "block", "inline", "inline-block", "flex", "inline-flex", "grid", "inline-grid", "none",
    "contents",
];
const FLEX_DIRECTION: &[&str] = &["row", "row-reverse", "column", "column-reverse"];
const FLEX_WRAP: &[&str] = &["nowrap", "wrap", "wrap-reverse"];
const JUSTIFY_CONTENT: &[&str] = &[
    "flex-start", "flex-end", "center", "space-between", "space-around", "space-evenly", "start",
    "end", "stretch", "normal",
];
const ALIGN_ITEMS: &[&str] = &[
    "flex-start", "flex-end", "center", "baseline", "stretch", "start", "end", "normal",
];
const TEXT_ALIGN: &[&str] = &["left", "right", "center", "justify", "start", "end"];
const TEXT_DECORATION: &[&str] = &["none", "underline", "overline", "line-through"];
const TEXT_TRANSFORM: &[&str] = &["none", "uppercase", "lowercase", "capitalize"];
const FONT_STYLE: &[&str] = &["normal", "italic", "oblique"];
const OVERFLOW: &[&str] = &["visible", "hidden", "scroll", "auto", "clip"];
const CURSOR: &[&str] = &[
    "auto", "default", "pointer", "text", "move", "not-allowed", "grab", "grabbing", "crosshair",
];
const POSITION: &[&str] = &["static", "relative", "absolute", "fixed", "sticky"];
const OBJECT_FIT: &[&str] = &["fill", "contain", "cover", "none", "scale-down"];

/// Named colors accepted besides hex and functional notation.
const NAMED_COLORS: &[&str] = &[
    "transparent", "currentcolor", "black", "white", "red", "green", "blue", "yellow", "orange",
    "purple", "pink", "brown", "gray", "grey", "silver", "maroon", "navy", "teal", "olive",
    "lime", "aqua", "cyan", "fuchsia", "magenta", "indigo", "violet", "gold", "beige", "coral",
    "crimson", "salmon", "tomato", "khaki", "lavender", "ivory", "tan", "turquoise", "orchid",
    "plum", "skyblue", "steelblue", "slategray", "slategrey", "darkgray", "darkgrey", "lightgray",
    "lightgrey", "whitesmoke", "gainsboro", "inherit",
];

const TIMING_KEYWORDS: &[&str] = &[
    "ease", "ease-in", "ease-out", "ease-in-out", "linear", "step-start", "step-end",
];

/// Grammar for an allowlisted property, `None` when the property is not allowed.
pub fn property_grammar(property: &str) -> Option<Grammar> {
    use Grammar::*;

    let single = |keywords| Length {
        max_tokens: 1,
        negative: false,
        keywords,
    };
    let grammar = match property {
        "width" | "height" | "minWidth" | "minHeight" => single(SIZE_KEYWORDS),
        "maxWidth" | "maxHeight" => single(MAX_SIZE_KEYWORDS),
        "top" | "right" | "bottom" | "left" => Length {
            max_tokens: 1,
            negative: true,
            keywords: &["auto"],
        },
        "padding" => Length {
            max_tokens: 4,
            negative: false,
            keywords: &[],
        },
        "paddingTop" | "paddingRight" | "paddingBottom" | "paddingLeft" => single(&[]),
        "margin" => Length {
            max_tokens: 4,
            negative: true,
            keywords: &["auto"],
        },
        "marginTop" | "marginRight" | "marginBottom" | "marginLeft" => Length {
            max_tokens: 1,
            negative: true,
            keywords: &["auto"],
        },
        "gap" => Length {
            max_tokens: 2,
            negative: false,
            keywords: &["normal"],
        },
        "rowGap" | "columnGap" => single(&["normal"]),
        "borderWidth" => Length {
            max_tokens: 4,
            negative: false,
            keywords: &["thin", "medium", "thick"],
        },
        "borderRadius" => Length {
            max_tokens: 4,
            negative: false,
            keywords: &[],
        },
        "fontSize" => single(FONT_SIZE_KEYWORDS),
        "letterSpacing" => Length {
            max_tokens: 1,
            negative: true,
            keywords: &["normal"],
        },
        "color" | "backgroundColor" | "borderColor" => Color,
        "borderStyle" => Keywords(BORDER_STYLES),
        "display" => Keywords(DISPLAY),
        "position" => Keywords(POSITION),
        "flexDirection" => Keywords(FLEX_DIRECTION),
        "flexWrap" => Keywords(FLEX_WRAP),
        "justifyContent" => Keywords(JUSTIFY_CONTENT),
        "alignItems" => Keywords(ALIGN_ITEMS),
        "textAlign" => Keywords(TEXT_ALIGN),
        "textDecoration" => Keywords(TEXT_DECORATION),
        "textTransform" => Keywords(TEXT_TRANSFORM),
        "fontStyle" => Keywords(FONT_STYLE),
        "overflow" | "overflowX" | "overflowY" => Keywords(OVERFLOW),
        "cursor" => Keywords(CURSOR),
        "objectFit" => Keywords(OBJECT_FIT),
        "opacity" => UnitInterval,
        "zIndex" => Integer,
        "lineHeight" => LineHeight,
        "fontWeight" => FontWeight,
        "transitionTimingFunction" => TimingFunction,
        "transitionDuration" | "transitionDelay" => Time,
        "fontFamily" | "boxShadow" | "gridTemplateColumns" | "gridTemplateRows" | "transition"
        | "transform" | "backgroundImage" => Free,
        _ => return None,
    };
    Some(grammar)
}

// =============================================================================
// Token patterns
// =============================================================================

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("static style pattern")
}

static LENGTH: Lazy<Regex> = Lazy::new(|| {
    pattern(r"^-?(?:\d+(?:\.\d+)?|\.\d+)(?:px|em|rem|%|vw|vh|vmin|vmax|ch|ex|pt)$")
});
static ZERO: Lazy<Regex> = Lazy::new(|| pattern(r"^-?0+(?:\.0+)?$"));
static NUMBER: Lazy<Regex> = Lazy::new(|| pattern(r"^-?(?:\d+(?:\.\d+)?|\.\d+)$"));
static INTEGER: Lazy<Regex> = Lazy::new(|| pattern(r"^-?\d{1,9}$"));
static VAR: Lazy<Regex> = Lazy::new(|| pattern(r"^var\(\s*--[a-zA-Z0-9_-]{1,64}\s*\)$"));
static CALC: Lazy<Regex> = Lazy::new(|| pattern(r"^calc\([0-9a-z%.+\-*/()\s]+\)$"));
static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| pattern(r"^#(?:[0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$"));
static FUNCTIONAL_COLOR: Lazy<Regex> =
    Lazy::new(|| pattern(r"^(?i:rgba?|hsla?)\(\s*[0-9.,%/+\-\s]*(?:deg|turn|rad)?[0-9.,%/+\-\s]*\)$"));
static CUBIC_BEZIER: Lazy<Regex> = Lazy::new(|| {
    let n = r"\s*-?(?:\d+(?:\.\d+)?|\.\d+)\s*";
    pattern(&format!(r"^cubic-bezier\({n},{n},{n},{n}\)$"))
});
static STEPS: Lazy<Regex> = Lazy::new(|| {
    pattern(r"^steps\(\s*\d{1,4}\s*(?:,\s*(?:jump-start|jump-end|jump-none|jump-both|start|end)\s*)?\)$")
});
static TIME: Lazy<Regex> = Lazy::new(|| pattern(r"^(?:\d+(?:\.\d+)?|\.\d+)(?:ms|s)$"));

fn is_length_token(token: &str, negative: bool) -> bool {
    if !negative && token.starts_with('-') {
        return false;
    }
    ZERO.is_match(token) || LENGTH.is_match(token) || VAR.is_match(token) || CALC.is_match(token)
}

pub fn is_color(value: &str) -> bool {
    HEX_COLOR.is_match(value)
        || FUNCTIONAL_COLOR.is_match(value)
        || VAR.is_match(value)
        || NAMED_COLORS.contains(&value.to_ascii_lowercase().as_str())
}

impl Grammar {
    /// Whether the trimmed `value` is accepted by this grammar.
    pub fn accepts(&self, value: &str) -> bool {
        match *self {
            Grammar::Keywords(keywords) => keywords.contains(&value),
            Grammar::Length {
                max_tokens,
                negative,
                keywords,
            } => {
                if keywords.contains(&value) || VAR.is_match(value) || CALC.is_match(value) {
                    return true;
                }
                let tokens: Vec<&str> = value.split_whitespace().collect();
                !tokens.is_empty()
                    && tokens.len() <= max_tokens
                    && tokens
                        .iter()
                        .all(|t| is_length_token(t, negative) || (*t == "auto" && keywords.contains(&"auto")))
            }
            Grammar::Color => is_color(value),
            Grammar::Integer => INTEGER.is_match(value),
            Grammar::UnitInterval => {
                NUMBER.is_match(value)
                    && value
                        .parse::<f64>()
                        .map(|n| (0.0..=1.0).contains(&n))
                        .unwrap_or(false)
            }
            Grammar::LineHeight => {
                value == "normal"
                    || (NUMBER.is_match(value) && !value.starts_with('-'))
                    || is_length_token(value, false)
            }
            Grammar::FontWeight => {
                matches!(value, "normal" | "bold" | "bolder" | "lighter")
                    || value
                        .parse::<u32>()
                        .map(|w| (100..=900).contains(&w) && w % 100 == 0)
                        .unwrap_or(false)
            }
            Grammar::TimingFunction => {
                TIMING_KEYWORDS.contains(&value)
                    || CUBIC_BEZIER.is_match(value)
                    || STEPS.is_match(value)
            }
            Grammar::Time => TIME.is_match(value),
            Grammar::Free => true,
        }
    }
}
