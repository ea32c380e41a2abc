//! Polygon and extent primitives shared by the pipeline stages.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Areas at or below this are treated as degenerate.
pub const AREA_EPSILON: f64 = 1e-12;

/// Area of the triangle `a b c`.
pub fn triangle_area(a: DVec3, b: DVec3, c: DVec3) -> f64 {
    0.5 * (b - a).cross(c - a).length()
}

/// An ordered loop of vertex positions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<DVec3>,
}

impl Polygon {
    pub fn new(vertices: Vec<DVec3>) -> Self {
        Self { vertices }
    }

    pub fn triangle(a: DVec3, b: DVec3, c: DVec3) -> Self {
        Self::new(vec![a, b, c])
    }

    /// Unit normal from the first three vertices, `(v1 - v0) × (v2 - v0)`.
    ///
    /// Zero for polygons with fewer than three vertices or collinear leading vertices.
    pub fn normal(&self) -> DVec3 {
        match self.vertices.as_slice() {
            [v0, v1, v2, ..] => (*v1 - *v0).cross(*v2 - *v0).normalize_or_zero(),
            _ => DVec3::ZERO,
        }
    }

    /// Area of the fan triangulation from vertex 0.
    pub fn area(&self) -> f64 {
        self.fan().map(|[a, b, c]| triangle_area(a, b, c)).sum()
    }

    /// Fan triangles `(v0, vi, vi+1)` in emission order.
    pub fn fan(&self) -> impl Iterator<Item = [DVec3; 3]> + '_ {
        let first = self.vertices.first().copied();
        self.vertices
            .windows(2)
            .skip(1)
            .filter_map(move |w| first.map(|v0| [v0, w[0], w[1]]))
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Axis-aligned bounds, inclusive on both corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min: DVec3,
    pub max: DVec3,
}

impl Extent {
    /// Exact per-axis min/max. `None` for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = DVec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(
            Self {
                min: first,
                max: first,
            },
            |extent, p| Self {
                min: extent.min.min(p),
                max: extent.max.max(p),
            },
        ))
    }

    /// True if `point` lies inside or on the boundary.
    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Smallest extent enclosing both.
    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Edge lengths along each axis.
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }
}
