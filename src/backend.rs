//! Geometry backend capability.
//!
//! The host application passes a [`GeometryBackend`] into the build; it owns the
//! material table and receives every finished solid. [`InMemoryBackend`] keeps
//! everything in vectors and is what tests and standalone tools use.

use crate::geometry::Extent;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A material known to the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

/// Opaque identifier of a registered solid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SolidHandle(pub u64);

/// Everything the backend gets to know about a solid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolidDescriptor {
    pub name: String,
    pub material: MaterialId,
    pub positions: Vec<DVec3>,
    /// Outward-wound triangles indexing `positions`.
    pub triangles: Vec<[u32; 3]>,
    /// Bounds of the vertices the triangles use.
    pub extent: Option<Extent>,
}

/// Host-side store for materials and finished solids.
///
/// A build resolves every layer material before tracing, then registers one
/// solid per layer plus the envelope.
pub trait GeometryBackend {
    /// Looks a material up by name.
    fn resolve_material(&self, name: &str) -> Option<MaterialId>;

    /// Takes ownership of a finished solid.
    fn register_solid(&mut self, solid: SolidDescriptor) -> SolidHandle;
}

/// Backend that stores solids in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryBackend {
    materials: Vec<String>,
    solids: Vec<SolidDescriptor>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend knowing the materials the standard leaf layer stacks use.
    pub fn with_leaf_materials() -> Self {
        use crate::extrude::materials;
        let mut backend = Self::new();
        for name in [materials::AIR, materials::GLASS, materials::SILICON] {
            backend.add_material(name);
        }
        backend
    }

    /// Registers a material, returning the existing id if `name` is already known.
    pub fn add_material(&mut self, name: &str) -> MaterialId {
        if let Some(id) = self.resolve_material(name) {
            return id;
        }
        self.materials.push(name.to_string());
        MaterialId((self.materials.len() - 1) as u32)
    }

    /// Every registered solid in registration order.
    pub fn solids(&self) -> &[SolidDescriptor] {
        &self.solids
    }

    /// Looks a solid up by the handle `register_solid` returned.
    pub fn solid(&self, handle: SolidHandle) -> Option<&SolidDescriptor> {
        self.solids.get(handle.0 as usize)
    }

    /// Name a material was registered under.
    pub fn material_name(&self, id: MaterialId) -> Option<&str> {
        self.materials.get(id.0 as usize).map(String::as_str)
    }

    /// Forgets every solid; materials are kept. Earlier handles become invalid.
    pub fn clear_solids(&mut self) {
        self.solids.clear();
    }
}

impl GeometryBackend for InMemoryBackend {
    fn resolve_material(&self, name: &str) -> Option<MaterialId> {
        self.materials
            .iter()
            .position(|m| m == name)
            .map(|i| MaterialId(i as u32))
    }

    fn register_solid(&mut self, solid: SolidDescriptor) -> SolidHandle {
        self.solids.push(solid);
        SolidHandle((self.solids.len() - 1) as u64)
    }
}
