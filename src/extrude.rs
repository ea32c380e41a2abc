//! Offset extrusion of a merged surface into a closed shell, and the leaf layer stack.

use crate::error::{LeafError, LeafResult};
use crate::geometry::{Polygon, triangle_area};
use crate::merge::MergedSurface;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Material names the layer stack asks the backend for.
pub mod materials {
    pub const AIR: &str = "pv-air";
    pub const GLASS: &str = "pv-glass";
    pub const SILICON: &str = "pv-silicon";
}

/// Triangle shell produced by [`extrude`].
///
/// Front vertices occupy `0..n`, back vertices `n..2n`, where `n` is the
/// number of merged vertices. Triangles are ordered front, back, then sides.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtrudedMesh {
    pub positions: Vec<DVec3>,
    pub triangles: Vec<[u32; 3]>,
    pub front_triangles: usize,
    pub back_triangles: usize,
    pub side_triangles: usize,
}

impl ExtrudedMesh {
    /// Corner positions of `tri`, or `None` if an index is out of range.
    pub fn triangle_positions(&self, tri: [u32; 3]) -> Option<[DVec3; 3]> {
        let [a, b, c] = tri.map(|i| self.positions.get(i as usize).copied());
        Some([a?, b?, c?])
    }

    /// Area of the front face only.
    pub fn front_area(&self) -> f64 {
        self.triangles[..self.front_triangles]
            .iter()
            .filter_map(|&tri| self.triangle_positions(tri))
            .map(|[a, b, c]| triangle_area(a, b, c))
            .sum()
    }
}

/// Offsets `surface` to `p + n * front_offset` and `p - n * back_offset` and
/// seals the two faces along every boundary edge.
///
/// Either offset may be zero or negative as long as their sum is not negative.
pub fn extrude(surface: &MergedSurface, front_offset: f64, back_offset: f64) -> LeafResult<ExtrudedMesh> {
    if !front_offset.is_finite() || !back_offset.is_finite() {
        return Err(LeafError::InvalidConfiguration(format!(
            "extrusion offsets must be finite (front {front_offset}, back {back_offset})"
        )));
    }
    if front_offset + back_offset < 0.0 {
        return Err(LeafError::InvalidConfiguration(format!(
            "total extrusion thickness {} is negative",
            front_offset + back_offset
        )));
    }

    let n = surface.vertices.len() as u32;
    let mut positions = Vec::with_capacity(surface.vertices.len() * 2);
    positions.extend(
        surface
            .vertices
            .iter()
            .map(|v| v.position + v.normal * front_offset),
    );
    positions.extend(
        surface
            .vertices
            .iter()
            .map(|v| v.position - v.normal * back_offset),
    );

    let mut front = Vec::new();
    for polygon in &surface.polygons {
        let indices = &polygon.indices;
        for w in indices.windows(2).skip(1) {
            front.push([indices[0], w[0], w[1]]);
        }
    }
    let back: Vec<[u32; 3]> = front.iter().map(|&[a, b, c]| [a + n, c + n, b + n]).collect();

    let mut sides = Vec::new();
    for (fa, fb) in surface.boundary_edges() {
        let (ba, bb) = (fa + n, fb + n);
        sides.push([fb, fa, ba]);
        sides.push([fb, ba, bb]);
    }

    let (front_triangles, back_triangles, side_triangles) = (front.len(), back.len(), sides.len());
    let mut triangles = front;
    triangles.extend(back);
    triangles.extend(sides);

    debug!(
        "Extruded {} vertices: {} front, {} back, {} side triangles",
        n, front_triangles, back_triangles, side_triangles
    );

    Ok(ExtrudedMesh {
        positions,
        triangles,
        front_triangles,
        back_triangles,
        side_triangles,
    })
}

/// Total area of `polygons`.
pub fn surface_area(polygons: &[Polygon]) -> f64 {
    polygons.iter().map(Polygon::area).sum()
}

/// Front-face area of `surface` extruded by the given offsets.
pub fn extrapolated_surface_area(
    surface: &MergedSurface,
    front_offset: f64,
    back_offset: f64,
) -> LeafResult<f64> {
    Ok(extrude(surface, front_offset, back_offset)?.front_area())
}

/// Role of a volume in the leaf layer stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    /// Glass cover on the light-facing side.
    Front,
    /// Thin absorbing layer whose front area is reported.
    Sensitive,
    /// Glass backing below the sensitive layer.
    Back,
    /// Air volume enclosing the other layers.
    Envelope,
}

impl LayerKind {
    /// Name the layer's solid is registered under.
    pub fn solid_name(self) -> &'static str {
        match self {
            LayerKind::Front => "LeafFrontSolid",
            LayerKind::Sensitive => "LeafSensitiveSolid",
            LayerKind::Back => "LeafBackSolid",
            LayerKind::Envelope => "LeafEnvelopeSolid",
        }
    }
}

/// One extruded volume of the leaf.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub kind: LayerKind,
    pub front_offset: f64,
    pub back_offset: f64,
    pub material: String,
}

impl LayerSpec {
    pub fn new(kind: LayerKind, front_offset: f64, back_offset: f64, material: &str) -> Self {
        Self {
            kind,
            front_offset,
            back_offset,
            material: material.to_string(),
        }
    }

    pub fn thickness(&self) -> f64 {
        self.front_offset + self.back_offset
    }
}

/// Layers to extrude, plus the envelope around them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerStack {
    pub layers: Vec<LayerSpec>,
    pub envelope: LayerSpec,
}

impl LayerStack {
    /// Glass front, thin silicon sensitive layer, glass back.
    ///
    /// Sensitive spans `[0, 0.03t]` above the surface, front `[0.03t, 0.5t]`,
    /// back `[-0.5t, 0]`.
    pub fn layered(thickness: f64) -> Self {
        let t = thickness;
        Self {
            layers: vec![
                LayerSpec::new(LayerKind::Front, 0.5 * t, -0.03 * t, materials::GLASS),
                LayerSpec::new(LayerKind::Sensitive, 0.03 * t, 0.0, materials::SILICON),
                LayerSpec::new(LayerKind::Back, 0.0, 0.5 * t, materials::GLASS),
            ],
            envelope: LayerSpec::new(LayerKind::Envelope, 0.5 * t, 0.5 * t, materials::AIR),
        }
    }

    /// A single sensitive layer filling the whole thickness.
    pub fn single(thickness: f64) -> Self {
        let t = thickness;
        Self {
            layers: vec![LayerSpec::new(
                LayerKind::Sensitive,
                0.5 * t,
                0.5 * t,
                materials::SILICON,
            )],
            envelope: LayerSpec::new(LayerKind::Envelope, 0.5 * t, 0.5 * t, materials::AIR),
        }
    }

    pub fn sensitive(&self) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.kind == LayerKind::Sensitive)
    }
}
