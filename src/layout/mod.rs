//! Zone Layout
//!
//! Free-form 2D placement of aisles and decorative annotations on a map
//! canvas. Layout is purely visual: a stored position never implies that an
//! aisle exists, and bins never depend on where their aisle is drawn.
//!
//! # Rotation
//!
//! Rotation is stored in degrees, normalised to `[0, 360)`, clockwise in
//! screen coordinates (y grows downwards). The pivot is explicit:
//!
//! ```text
//! Pivot::Center            Pivot::Origin
//!   ┌─────┐                  o─────┐
//!   │  o  │  rotates about   │     │  rotates about the
//!   └─────┘  the centre      └─────┘  top-left corner (x, y)
//! ```

mod store;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use store::{Committed, LayoutSnapshot, LayoutStore, MoveTarget};

use crate::error::{Error, Result};

// =============================================================================
// Geometry
// =============================================================================

/// A point on the layout canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Within `epsilon` on both axes.
    pub fn approx_eq(&self, other: &Point, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

/// Drawn size of an aisle or annotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub width: f64,
    pub height: f64,
}

impl Footprint {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn validate(&self) -> Result<()> {
        finite("width", self.width)?;
        finite("height", self.height)?;
        Ok(())
    }
}

/// Point a shape rotates about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pivot {
    #[default]
    Center,
    Origin,
}

/// Reject NaN and infinities; JSON has no encoding for them.
pub fn finite(field: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::config(field, format!("{} is not a finite number", value)))
    }
}

/// Normalise degrees to `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> Result<f64> {
    let d = finite("rotation", degrees)?.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if d >= 360.0 || d == 0.0 {
        Ok(0.0)
    } else {
        Ok(d)
    }
}

/// Rotate `point` clockwise (screen coordinates) about `pivot`.
pub fn rotate_about(point: Point, pivot: Point, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let dx = point.x - pivot.x;
    let dy = point.y - pivot.y;
    Point::new(pivot.x + dx * cos - dy * sin, pivot.y + dx * sin + dy * cos)
}

/// Corners of the rectangle at `(x, y)` of the given size after rotation.
///
/// Order is top-left, top-right, bottom-right, bottom-left before rotation.
pub fn rotated_corners(origin: Point, footprint: Footprint, degrees: f64, pivot: Pivot) -> [Point; 4] {
    let pivot_point = pivot_point(origin, footprint, pivot);
    [
        origin,
        Point::new(origin.x + footprint.width, origin.y),
        Point::new(origin.x + footprint.width, origin.y + footprint.height),
        Point::new(origin.x, origin.y + footprint.height),
    ]
    .map(|p| rotate_about(p, pivot_point, degrees))
}

fn pivot_point(origin: Point, footprint: Footprint, pivot: Pivot) -> Point {
    match pivot {
        Pivot::Center => Point::new(
            origin.x + footprint.width / 2.0,
            origin.y + footprint.height / 2.0,
        ),
        Pivot::Origin => origin,
    }
}

// =============================================================================
// Aisle Positions
// =============================================================================

/// Visual placement of an aisle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AislePosition {
    pub aisle_number: u32,
    pub x: f64,
    pub y: f64,
    /// Degrees in `[0, 360)`
    pub rotation: f64,
}

impl AislePosition {
    pub fn new(aisle_number: u32, x: f64, y: f64, rotation: f64) -> Result<Self> {
        Ok(Self {
            aisle_number,
            x: finite("x", x)?,
            y: finite("y", y)?,
            rotation: normalize_degrees(rotation)?,
        })
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Rotation pivot in canvas coordinates.
    pub fn pivot(&self, footprint: Footprint, pivot: Pivot) -> Point {
        pivot_point(self.origin(), footprint, pivot)
    }

    /// The aisle's drawn rectangle after rotation.
    pub fn corners(&self, footprint: Footprint, pivot: Pivot) -> [Point; 4] {
        rotated_corners(self.origin(), footprint, self.rotation, pivot)
    }
}

/// Whether a stored position still matches a structural aisle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    Active,
    /// No such aisle in the current structure; hide or flag when drawing
    Orphaned,
}

/// A stored position with its status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionReport {
    pub position: AislePosition,
    pub status: PositionStatus,
}

// =============================================================================
// Annotations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnotationKind {
    /// Shaded region such as a loading dock
    Area,
    /// Point marker such as an exit
    Marker,
    /// Free text
    Label,
}

/// Decorative shape on the layout canvas; unrelated to bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutAnnotation {
    pub id: Uuid,
    pub kind: AnnotationKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub label: String,
    pub color: String,
}

impl LayoutAnnotation {
    pub fn footprint(&self) -> Footprint {
        Footprint::new(self.width, self.height)
    }

    pub fn corners(&self, pivot: Pivot) -> [Point; 4] {
        rotated_corners(Point::new(self.x, self.y), self.footprint(), self.rotation, pivot)
    }
}

/// Fields for a new annotation; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationSpec {
    pub kind: AnnotationKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "#9e9e9e".to_string()
}

impl AnnotationSpec {
    pub fn validate(&self) -> Result<()> {
        finite("x", self.x)?;
        finite("y", self.y)?;
        Footprint::new(self.width, self.height).validate()?;
        finite("rotation", self.rotation)?;
        Ok(())
    }

    pub fn new(kind: AnnotationKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            kind,
            x,
            y,
            width,
            height,
            rotation: 0.0,
            label: String::new(),
            color: default_color(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }
}
