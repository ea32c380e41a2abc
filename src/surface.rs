//! Raw leaf surface assembly.

use crate::geometry::{AREA_EPSILON, Polygon};
use crate::interpreter::Trace;
use tracing::{debug, warn};

/// Triangulated, un-merged surface.
#[derive(Clone, Debug, Default)]
pub struct RawSurface {
    pub polygons: Vec<Polygon>,
    /// Triangles dropped for having area at or below epsilon.
    pub degenerate: usize,
}

impl RawSurface {
    pub fn area(&self) -> f64 {
        self.polygons.iter().map(Polygon::area).sum()
    }
}

/// Turns traced polygons into triangles with usable normals.
///
/// Polygons with more than three vertices are fan-triangulated from their
/// first vertex, which keeps the traced winding. Normals are never flipped.
#[derive(Clone, Debug)]
pub struct SurfaceBuilder {
    epsilon: f64,
}

impl Default for SurfaceBuilder {
    fn default() -> Self {
        Self {
            epsilon: AREA_EPSILON,
        }
    }
}

impl SurfaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn build_from_trace(&self, trace: &Trace) -> RawSurface {
        self.build(&trace.polygons)
    }

    pub fn build(&self, polygons: &[Polygon]) -> RawSurface {
        let mut surface = RawSurface::default();

        for (index, polygon) in polygons.iter().enumerate() {
            for [a, b, c] in polygon.fan() {
                let triangle = Polygon::triangle(a, b, c);
                let area = triangle.area();
                if area <= self.epsilon {
                    warn!(
                        "Dropping degenerate triangle from polygon {} (area {:e})",
                        index, area
                    );
                    surface.degenerate += 1;
                    continue;
                }
                surface.polygons.push(triangle);
            }
        }

        debug!(
            "Built raw surface: {} triangles from {} polygons, {} degenerate",
            surface.polygons.len(),
            polygons.len(),
            surface.degenerate
        );

        surface
    }
}
