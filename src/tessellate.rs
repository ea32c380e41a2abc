//! Conversion of an extruded shell into a registered solid.

use crate::backend::{GeometryBackend, SolidDescriptor, SolidHandle};
use crate::error::{LeafError, LeafResult};
use crate::extrude::ExtrudedMesh;
use crate::geometry::{AREA_EPSILON, Extent, triangle_area};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A solid as handed to the backend, plus what was dropped on the way.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TessellatedSolid {
    pub handle: SolidHandle,
    pub name: String,
    pub positions: Vec<DVec3>,
    pub triangles: Vec<[u32; 3]>,
    /// Triangles with area at or below epsilon.
    pub dropped: usize,
    /// Bounds of the vertices used by retained triangles. `None` when nothing was retained.
    pub extent: Option<Extent>,
}

/// Validates triangles before registration.
#[derive(Clone, Debug)]
pub struct Tessellator {
    epsilon: f64,
}

impl Default for Tessellator {
    fn default() -> Self {
        Self {
            epsilon: AREA_EPSILON,
        }
    }
}

impl Tessellator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Triangles of `mesh` whose area is above epsilon, and the dropped count.
    ///
    /// A triangle indexing past `mesh.positions` is dropped as well.
    pub fn retain_valid(&self, mesh: &ExtrudedMesh) -> (Vec<[u32; 3]>, usize) {
        let mut dropped = 0;
        let retained = mesh
            .triangles
            .iter()
            .copied()
            .filter(|&tri| {
                let Some([a, b, c]) = mesh.triangle_positions(tri) else {
                    warn!(
                        "Dropping triangle {:?}: index outside {} positions",
                        tri,
                        mesh.positions.len()
                    );
                    dropped += 1;
                    return false;
                };
                let area = triangle_area(a, b, c);
                if area <= self.epsilon {
                    warn!("Dropping degenerate triangle {:?} (area {:e})", tri, area);
                    dropped += 1;
                    false
                } else {
                    true
                }
            })
            .collect();
        (retained, dropped)
    }

    /// Registers `mesh` with `backend` as solid `name` made of `material`.
    ///
    /// Degenerate triangles are dropped, never fatal. Only an unknown material
    /// fails.
    pub fn tessellate(
        &self,
        mesh: &ExtrudedMesh,
        name: &str,
        material: &str,
        backend: &mut dyn GeometryBackend,
    ) -> LeafResult<TessellatedSolid> {
        let material_id = backend
            .resolve_material(material)
            .ok_or_else(|| LeafError::UnknownMaterial(material.to_string()))?;

        let (triangles, dropped) = self.retain_valid(mesh);
        let extent = Extent::from_points(
            triangles
                .iter()
                .filter_map(|&tri| mesh.triangle_positions(tri))
                .flatten(),
        );

        let handle = backend.register_solid(SolidDescriptor {
            name: name.to_string(),
            material: material_id,
            positions: mesh.positions.clone(),
            triangles: triangles.clone(),
            extent,
        });

        debug!(
            "Tessellated {}: {} triangles kept, {} dropped",
            name,
            triangles.len(),
            dropped
        );

        Ok(TessellatedSolid {
            handle,
            name: name.to_string(),
            positions: mesh.positions.clone(),
            triangles,
            dropped,
            extent,
        })
    }
}

/// [`Tessellator::tessellate`] with the default epsilon.
pub fn tessellate(
    mesh: &ExtrudedMesh,
    name: &str,
    material: &str,
    backend: &mut dyn GeometryBackend,
) -> LeafResult<TessellatedSolid> {
    Tessellator::new().tessellate(mesh, name, material, backend)
}
