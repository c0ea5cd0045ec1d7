use serde::{Deserialize, Serialize, Serializer};

/// A node's rectangle at one breakpoint, in canvas-local coordinates.
///
/// Whole-number coordinates serialize as JSON integers so stored documents
/// keep the same text after a parse/serialize cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(serialize_with = "serialize_coord")]
    pub x: f64,
    #[serde(serialize_with = "serialize_coord")]
    pub y: f64,
    #[serde(serialize_with = "serialize_coord")]
    pub w: f64,
    #[serde(serialize_with = "serialize_coord")]
    pub h: f64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_coord"
    )]
    pub z: Option<f64>,
}

impl Frame {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h, z: None }
    }

    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    /// z used for presentation ordering; missing z counts as 0.
    pub fn z_or_default(&self) -> f64 {
        self.z.unwrap_or(0.0)
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Smallest frame containing both rectangles. Keeps `self.z`.
    pub fn union(&self, other: &Frame) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self {
            x,
            y,
            w: self.right().max(other.right()) - x,
            h: self.bottom().max(other.bottom()) - y,
            z: self.z,
        }
    }

    /// Check the geometric invariants: finite values, non-negative size,
    /// everything within `max_coord`.
    pub fn check(&self, max_coord: f64) -> std::result::Result<(), String> {
        for (name, value) in [("x", self.x), ("y", self.y), ("w", self.w), ("h", self.h)] {
            if !value.is_finite() {
                return Err(format!("{} must be finite", name));
            }
            if value.abs() > max_coord {
                return Err(format!("{} is out of bounds", name));
            }
        }
        if self.w < 0.0 || self.h < 0.0 {
            return Err("w/h must not be negative".to_string());
        }
        if let Some(z) = self.z {
            if !z.is_finite() {
                return Err("z must be finite".to_string());
            }
        }
        Ok(())
    }
}

fn serialize_coord<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    // 2^53: beyond this f64 cannot hold every integer anyway
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn serialize_opt_coord<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serialize_coord(v, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_coordinates_serialize_as_integers() {
        let frame = Frame::new(0.0, 120.0, 390.5, 96.0).with_z(2.0);
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"x":0,"y":120,"w":390.5,"h":96,"z":2}"#);
    }

    #[test]
    fn test_check_rejects_bad_geometry() {
        assert!(Frame::new(0.0, 0.0, 10.0, 10.0).check(1_000_000.0).is_ok());
        assert!(Frame::new(0.0, 0.0, 0.0, 0.0).check(1_000_000.0).is_ok());
        assert!(Frame::new(0.0, 0.0, -1.0, 10.0).check(1_000_000.0).is_err());
        assert!(Frame::new(f64::NAN, 0.0, 1.0, 1.0).check(1_000_000.0).is_err());
        assert!(Frame::new(0.0, 2_000_000.0, 1.0, 1.0).check(1_000_000.0).is_err());
        assert!(Frame::new(0.0, 0.0, 1.0, 1.0)
            .with_z(f64::INFINITY)
            .check(1_000_000.0)
            .is_err());
    }

    #[test]
    fn test_union_and_bottom() {
        let a = Frame::new(10.0, 10.0, 100.0, 50.0);
        let b = Frame::new(0.0, 40.0, 20.0, 100.0);
        let u = a.union(&b);
        assert_eq!(u, Frame::new(0.0, 10.0, 110.0, 130.0));
        assert_eq!(u.bottom(), 140.0);
    }
}
