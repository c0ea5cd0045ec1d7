use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three fixed canvas widths a node is laid out for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Mobile,
    Tablet,
    Desktop,
}

impl Breakpoint {
    /// Iteration order used everywhere geometry is touched for all breakpoints.
    pub const ALL: [Breakpoint; 3] = [Breakpoint::Mobile, Breakpoint::Tablet, Breakpoint::Desktop];

    pub fn as_str(&self) -> &'static str {
        match self {
            Breakpoint::Mobile => "mobile",
            Breakpoint::Tablet => "tablet",
            Breakpoint::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Breakpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mobile" => Ok(Breakpoint::Mobile),
            "tablet" => Ok(Breakpoint::Tablet),
            "desktop" => Ok(Breakpoint::Desktop),
            other => Err(format!("unknown breakpoint '{}'", other)),
        }
    }
}

/// A value stored once per breakpoint.
///
/// Serializes as `{ "mobile": .., "tablet": .., "desktop": .. }` in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerBreakpoint<T> {
    pub mobile: T,
    pub tablet: T,
    pub desktop: T,
}

impl<T> PerBreakpoint<T> {
    pub fn new(mobile: T, tablet: T, desktop: T) -> Self {
        Self {
            mobile,
            tablet,
            desktop,
        }
    }

    pub fn get(&self, breakpoint: Breakpoint) -> &T {
        match breakpoint {
            Breakpoint::Mobile => &self.mobile,
            Breakpoint::Tablet => &self.tablet,
            Breakpoint::Desktop => &self.desktop,
        }
    }

    pub fn get_mut(&mut self, breakpoint: Breakpoint) -> &mut T {
        match breakpoint {
            Breakpoint::Mobile => &mut self.mobile,
            Breakpoint::Tablet => &mut self.tablet,
            Breakpoint::Desktop => &mut self.desktop,
        }
    }

    pub fn set(&mut self, breakpoint: Breakpoint, value: T) {
        *self.get_mut(breakpoint) = value;
    }

    pub fn map<U>(&self, mut f: impl FnMut(Breakpoint, &T) -> U) -> PerBreakpoint<U> {
        PerBreakpoint {
            mobile: f(Breakpoint::Mobile, &self.mobile),
            tablet: f(Breakpoint::Tablet, &self.tablet),
            desktop: f(Breakpoint::Desktop, &self.desktop),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Breakpoint, &T)> {
        Breakpoint::ALL.into_iter().map(move |bp| (bp, self.get(bp)))
    }
}

impl<T: Clone> PerBreakpoint<T> {
    /// Same value at every breakpoint.
    pub fn splat(value: T) -> Self {
        Self {
            mobile: value.clone(),
            tablet: value.clone(),
            desktop: value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakpoint_parse_and_display() {
        assert_eq!("Tablet".parse::<Breakpoint>(), Ok(Breakpoint::Tablet));
        assert_eq!(Breakpoint::Desktop.to_string(), "desktop");
        assert!("watch".parse::<Breakpoint>().is_err());
    }

    #[test]
    fn test_per_breakpoint_access() {
        let mut widths = PerBreakpoint::new(390, 820, 1200);
        assert_eq!(*widths.get(Breakpoint::Tablet), 820);

        widths.set(Breakpoint::Mobile, 400);
        let doubled = widths.map(|_, w| w * 2);
        assert_eq!(doubled, PerBreakpoint::new(800, 1640, 2400));

        let order: Vec<_> = widths.iter().map(|(bp, _)| bp).collect();
        assert_eq!(order, Breakpoint::ALL.to_vec());
    }

    #[test]
    fn test_per_breakpoint_serializes_in_fixed_order() {
        let json = serde_json::to_string(&PerBreakpoint::new(1, 2, 3)).unwrap();
        assert_eq!(json, r#"{"mobile":1,"tablet":2,"desktop":3}"#);
    }
}
