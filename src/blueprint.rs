use crate::error::LeafResult;
use crate::extrude::LayerKind;
use crate::geometry::Extent;
use crate::tessellate::TessellatedSolid;
use serde::{Deserialize, Serialize};

/// Scale applied to the largest extent corner when sizing the world volume.
const WORLD_SCALE: f64 = 1.5;

/// The complete, engine-agnostic result of one leaf build.
///
/// Every solid has already been registered with the backend passed to the
/// build; the handles inside refer to that backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeafBlueprint {
    /// Material layers, outermost front first.
    pub layers: Vec<LayerSolid>,

    /// Air volume enclosing all layers.
    pub envelope: LayerSolid,

    /// Front-face area of the sensitive layer, in squared length units.
    pub sensitive_area: f64,

    /// Bounds of the envelope. `None` if the grammar traced no surface.
    pub extent: Option<Extent>,

    /// Counters for everything dropped along the way.
    pub diagnostics: BuildDiagnostics,
}

impl LeafBlueprint {
    pub fn layer(&self, kind: LayerKind) -> Option<&LayerSolid> {
        if kind == LayerKind::Envelope {
            return Some(&self.envelope);
        }
        self.layers.iter().find(|l| l.kind == kind)
    }

    pub fn sensitive(&self) -> Option<&LayerSolid> {
        self.layer(LayerKind::Sensitive)
    }

    /// Radius of a sphere centred on the origin that safely encloses the leaf.
    pub fn world_radius(&self) -> f64 {
        self.extent.map_or(0.0, |e| {
            let corner = e.min.abs().max(e.max.abs()) * WORLD_SCALE;
            3f64.sqrt() * corner.length()
        })
    }

    pub fn to_json(&self) -> LeafResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A tessellated layer and the material it was registered with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerSolid {
    pub kind: LayerKind,
    pub material: String,
    pub solid: TessellatedSolid,
}

/// Recoverable losses and sizes recorded during a build.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDiagnostics {
    /// Symbols after grammar expansion.
    pub symbols: usize,
    /// Polygons closed by the interpreter.
    pub traced_polygons: usize,
    /// Polygons closed with fewer than three vertices, or left open.
    pub rejected_polygons: usize,
    /// Stray `.` and `}` symbols.
    pub ignored_symbols: usize,
    /// Surface triangles dropped for zero area.
    pub degenerate_polygons: usize,
    /// Triangles collapsed by vertex merging.
    pub collapsed_polygons: usize,
    /// Triangles dropped while tessellating, summed over all solids.
    pub dropped_triangles: usize,
    pub unique_vertices: usize,
    pub boundary_edges: usize,
    pub turtles: usize,
}
