//! Geometry produced by the turtles and consumed by the growth scheduler.
//!
//! Both turtles emit the same shapes; the only difference is the point type.
//! [`Point`] is implemented for [`DVec2`] and [`DVec3`], so the scheduler and
//! the frame materializer are written once.

use std::fmt::Debug;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Coordinate type of a geometry set.
pub trait Point: Copy + PartialEq + Debug + Send + Sync + 'static {
    const DIM: usize;

    fn splat(value: f64) -> Self;
    fn axis(self, index: usize) -> f64;
    fn with_axis(self, index: usize, value: f64) -> Self;
    fn min_point(self, other: Self) -> Self;
    fn max_point(self, other: Self) -> Self;
    fn lerp_to(self, other: Self, t: f64) -> Self;
    fn distance_to(self, other: Self) -> f64;
    /// Embeds the point in 3D space (2D points get `z = 0`).
    fn to_dvec3(self) -> DVec3;
}

impl Point for DVec2 {
    const DIM: usize = 2;

    fn splat(value: f64) -> Self {
        DVec2::splat(value)
    }

    fn axis(self, index: usize) -> f64 {
        self[index]
    }

    fn with_axis(mut self, index: usize, value: f64) -> Self {
        self[index] = value;
        self
    }

    fn min_point(self, other: Self) -> Self {
        self.min(other)
    }

    fn max_point(self, other: Self) -> Self {
        self.max(other)
    }

    fn lerp_to(self, other: Self, t: f64) -> Self {
        self.lerp(other, t)
    }

    fn distance_to(self, other: Self) -> f64 {
        self.distance(other)
    }

    fn to_dvec3(self) -> DVec3 {
        self.extend(0.0)
    }
}

impl Point for DVec3 {
    const DIM: usize = 3;

    fn splat(value: f64) -> Self {
        DVec3::splat(value)
    }

    fn axis(self, index: usize) -> f64 {
        self[index]
    }

    fn with_axis(mut self, index: usize, value: f64) -> Self {
        self[index] = value;
        self
    }

    fn min_point(self, other: Self) -> Self {
        self.min(other)
    }

    fn max_point(self, other: Self) -> Self {
        self.max(other)
    }

    fn lerp_to(self, other: Self, t: f64) -> Self {
        self.lerp(other, t)
    }

    fn distance_to(self, other: Self) -> f64 {
        self.distance(other)
    }

    fn to_dvec3(self) -> DVec3 {
        self
    }
}

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// One drawn line, in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment<V> {
    pub start: V,
    pub end: V,
    pub depth: usize,
    pub width: f64,
    /// Creation order; only used for animation ordering.
    pub index: usize,
    pub color_index: u32,
}

pub type Segment2D = Segment<DVec2>;
pub type Segment3D = Segment<DVec3>;

impl<V: Point> Segment<V> {
    pub fn length(&self) -> f64 {
        self.start.distance_to(self.end)
    }

    /// Copy revealed up to `visibility` (clamped to `[0, 1]`), growing from
    /// `start`.
    pub fn partial(&self, visibility: f64) -> Self {
        let end = if visibility >= 1.0 {
            self.end
        } else if visibility > 0.0 {
            self.start.lerp_to(self.end, visibility)
        } else {
            self.start
        };
        Self { end, ..*self }
    }

    pub fn with_width(self, width: f64) -> Self {
        Self { width, ..self }
    }
}

// ---------------------------------------------------------------------------
// Polygons
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon<V> {
    pub vertices: Vec<V>,
    pub depth: usize,
    pub color_index: u32,
    /// Creation order among polygons.
    pub index: usize,
    /// Last segment drawn before the polygon closed, if any.
    pub anchor: Option<usize>,
}

pub type Polygon2D = Polygon<DVec2>;
pub type Polygon3D = Polygon<DVec3>;

impl<V> Polygon<V> {
    pub fn is_valid(&self) -> bool {
        self.vertices.len() >= 3
    }
}

impl Polygon<DVec3> {
    /// Unit normal from the first three vertices, if they are not collinear.
    pub fn normal(&self) -> Option<DVec3> {
        let [a, b, c] = [self.vertices.first()?, self.vertices.get(1)?, self.vertices.get(2)?];
        (*b - *a).cross(*c - *a).try_normalize()
    }
}

// ---------------------------------------------------------------------------
// Bounding boxes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox<V> {
    pub min: V,
    pub max: V,
}

impl<V: Point> BoundingBox<V> {
    /// Smallest box containing `points`, grown to at least one unit on
    /// every axis. An empty set yields the unit box at the origin.
    pub fn from_points(points: impl IntoIterator<Item = V>) -> Self {
        let mut points = points.into_iter();
        let Some(first) = points.next() else {
            return Self {
                min: V::splat(0.0),
                max: V::splat(1.0),
            };
        };
        let (min, max) = points.fold((first, first), |(min, max), p| {
            (min.min_point(p), max.max_point(p))
        });
        Self { min, max }.with_min_extent(1.0)
    }

    fn with_min_extent(mut self, extent: f64) -> Self {
        for axis in 0..V::DIM {
            let lo = self.min.axis(axis);
            let hi = self.max.axis(axis);
            if hi - lo < extent {
                let center = (lo + hi) * 0.5;
                self.min = self.min.with_axis(axis, center - extent * 0.5);
                self.max = self.max.with_axis(axis, center + extent * 0.5);
            }
        }
        self
    }

    pub fn width(&self) -> f64 {
        self.max.axis(0) - self.min.axis(0)
    }

    pub fn height(&self) -> f64 {
        self.max.axis(1) - self.min.axis(1)
    }

    pub fn center(&self) -> V {
        self.min.lerp_to(self.max, 0.5)
    }

    pub fn with_padding(self, padding: f64) -> Self {
        self.padded_by(|_| padding)
    }

    /// Pads each axis by `percent` of its own extent.
    pub fn with_padding_percent(self, percent: f64) -> Self {
        self.padded_by(|extent| extent * percent / 100.0)
    }

    fn padded_by(self, pad: impl Fn(f64) -> f64) -> Self {
        let mut padded = self;
        for axis in 0..V::DIM {
            let (lo, hi) = (self.min.axis(axis), self.max.axis(axis));
            let amount = pad(hi - lo);
            padded.min = padded.min.with_axis(axis, lo - amount);
            padded.max = padded.max.with_axis(axis, hi + amount);
        }
        padded
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min_point(other.min),
            max: self.max.max_point(other.max),
        }
    }
}

impl BoundingBox<DVec3> {
    pub fn depth(&self) -> f64 {
        self.max.z - self.min.z
    }
}

// ---------------------------------------------------------------------------
// Interpretation result
// ---------------------------------------------------------------------------

/// Everything a turtle emitted for one word.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Interpretation<V> {
    pub segments: Vec<Segment<V>>,
    pub polygons: Vec<Polygon<V>>,
}

pub type Interpretation2D = Interpretation<DVec2>;
pub type Interpretation3D = Interpretation<DVec3>;

impl<V: Point> Interpretation<V> {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.polygons.is_empty()
    }

    /// Box over every segment endpoint and polygon vertex.
    pub fn bounding_box(&self) -> BoundingBox<V> {
        let endpoints = self.segments.iter().flat_map(|s| [s.start, s.end]);
        let vertices = self.polygons.iter().flat_map(|p| p.vertices.iter().copied());
        BoundingBox::from_points(endpoints.chain(vertices))
    }

    pub fn max_depth(&self) -> usize {
        self.segments.iter().map(|s| s.depth).max().unwrap_or(0)
    }

    pub fn max_color_index(&self) -> u32 {
        let segments = self.segments.iter().map(|s| s.color_index);
        let polygons = self.polygons.iter().map(|p| p.color_index);
        segments.chain(polygons).max().unwrap_or(0)
    }
}
