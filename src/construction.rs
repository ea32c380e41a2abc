//! End-to-end leaf build driver.
//!
//! A [`LeafConstruction`] owns one leaf's configuration and the intermediate
//! geometry of its last build. [`LeafConstruction::build`] runs the whole chain:
//! grammar expansion, turtle tracing, surface assembly, vertex merging, layer
//! extrusion and tessellation into the supplied [`GeometryBackend`].

use crate::backend::GeometryBackend;
use crate::blueprint::{BuildDiagnostics, LayerSolid, LeafBlueprint};
use crate::config::{LeafConfiguration, names};
use crate::error::{LeafError, LeafResult};
use crate::extrude::{LayerKind, LayerSpec, LayerStack, extrude};
use crate::geometry::Extent;
use crate::grammar::{LeafFamily, angle_jitter, expand_seeded};
use crate::interpreter::{Trace, TurtleInterpreter};
use crate::merge::{DEFAULT_MERGE_TOLERANCE, MergedSurface, merge};
use crate::surface::{RawSurface, SurfaceBuilder};
use crate::symbol::Symbol;
use crate::tessellate::Tessellator;
use crate::turtle::Turtle;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// How many material layers the leaf is made of.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerMode {
    /// Front, sensitive and back layers.
    #[default]
    Layered,
    /// One sensitive layer through the full thickness.
    Single,
}

/// Intermediate buffers of one build.
#[derive(Clone, Debug)]
pub struct LeafGeometry {
    pub symbols: Vec<Symbol>,
    pub trace: Trace,
    pub surface: RawSurface,
    pub merged: MergedSurface,
}

/// Builds leaves of one family, holding the state of the last build.
#[derive(Debug)]
pub struct LeafConstruction {
    family: LeafFamily,
    config: LeafConfiguration,
    initial_turtle: Turtle,
    layer_mode: LayerMode,
    seed: u64,
    geometry: Option<LeafGeometry>,
    constructed: bool,
}

impl LeafConstruction {
    /// A construction for `family` using its default configuration.
    pub fn new(family: LeafFamily) -> Self {
        Self {
            family,
            config: family.default_configuration(),
            initial_turtle: Turtle::default(),
            layer_mode: LayerMode::default(),
            seed: 0,
            geometry: None,
            constructed: false,
        }
    }

    pub fn with_configuration(mut self, config: LeafConfiguration) -> Self {
        self.config = config;
        self
    }

    pub fn with_initial_turtle(mut self, turtle: Turtle) -> Self {
        self.initial_turtle = turtle;
        self
    }

    pub fn with_layer_mode(mut self, mode: LayerMode) -> Self {
        self.layer_mode = mode;
        self
    }

    /// Seed for randomised rule evaluation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn family(&self) -> LeafFamily {
        self.family
    }

    pub fn configuration(&self) -> &LeafConfiguration {
        &self.config
    }

    /// Mutable access to the parameters. Takes effect on the next build.
    pub fn configuration_mut(&mut self) -> &mut LeafConfiguration {
        &mut self.config
    }

    /// True while the buffers of a finished build are held.
    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// Buffers of the last build, if any.
    pub fn geometry(&self) -> Option<&LeafGeometry> {
        self.geometry.as_ref()
    }

    /// Releases every buffer of the last build.
    pub fn reset_geometry(&mut self) {
        if self.geometry.take().is_some() {
            debug!("Released {} leaf geometry", self.family);
        }
        self.constructed = false;
    }

    /// Checks the configuration for everything a build needs.
    pub fn validate(&self) -> LeafResult<()> {
        self.config.validate(&self.family.required_parameters())?;

        let thickness = self.config.double(names::THICKNESS)?;
        if thickness <= 0.0 {
            return Err(LeafError::ParameterOutOfRange {
                name: names::THICKNESS.to_string(),
                value: thickness,
                min: f64::MIN_POSITIVE,
                max: f64::INFINITY,
            });
        }

        angle_jitter(&self.config)?;

        let tolerance = self.merge_tolerance();
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(LeafError::InvalidConfiguration(format!(
                "merge tolerance must be positive, got {tolerance}"
            )));
        }

        Ok(())
    }

    fn merge_tolerance(&self) -> f64 {
        self.config
            .double_or(names::MERGE_TOLERANCE, DEFAULT_MERGE_TOLERANCE)
    }

    fn generations(&self) -> LeafResult<usize> {
        let iterations = self.config.integer(names::ITERATION_NUMBER)?;
        usize::try_from(iterations).map_err(|_| {
            LeafError::InvalidConfiguration(format!(
                "iteration number must not be negative, got {iterations}"
            ))
        })
    }

    fn layer_stack(&self) -> LeafResult<LayerStack> {
        let thickness = self.config.double(names::THICKNESS)?;
        Ok(match self.layer_mode {
            LayerMode::Layered => LayerStack::layered(thickness),
            LayerMode::Single => LayerStack::single(thickness),
        })
    }

    /// Runs the grammar and traces the merged surface, replacing any held geometry.
    pub fn trace_surface(&mut self) -> LeafResult<&LeafGeometry> {
        self.reset_geometry();
        self.validate()?;

        let axiom = self.family.axiom(&self.config)?;
        let symbols = expand_seeded(&axiom, self.generations()?, &self.config, self.seed)?;
        let trace = TurtleInterpreter::new().interpret(&symbols, self.initial_turtle)?;
        let surface = SurfaceBuilder::new().build_from_trace(&trace);
        let merged = merge(&surface.polygons, self.merge_tolerance());

        if merged.polygons.is_empty() {
            warn!("{} grammar traced no usable surface", self.family);
        }

        Ok(&*self.geometry.insert(LeafGeometry {
            symbols,
            trace,
            surface,
            merged,
        }))
    }

    /// Builds the leaf and registers its solids with `backend`.
    ///
    /// Configuration problems and unknown materials are reported before any
    /// geometry is traced. A previous build is released first.
    pub fn build(&mut self, backend: &mut dyn GeometryBackend) -> LeafResult<LeafBlueprint> {
        info!("Building {} leaf", self.family);
        self.reset_geometry();
        self.validate()?;

        let stack = self.layer_stack()?;
        for layer in stack.layers.iter().chain(std::iter::once(&stack.envelope)) {
            if backend.resolve_material(&layer.material).is_none() {
                return Err(LeafError::UnknownMaterial(layer.material.clone()));
            }
        }

        let geometry = self.trace_surface()?;
        let mut diagnostics = BuildDiagnostics {
            symbols: geometry.symbols.len(),
            traced_polygons: geometry.trace.polygons.len(),
            rejected_polygons: geometry.trace.rejected_polygons,
            ignored_symbols: geometry.trace.ignored_symbols,
            degenerate_polygons: geometry.surface.degenerate,
            collapsed_polygons: geometry.merged.collapsed,
            dropped_triangles: 0,
            unique_vertices: geometry.merged.vertices.len(),
            boundary_edges: geometry.merged.boundary_edges().len(),
            turtles: geometry.trace.turtles.len(),
        };

        let tessellator = Tessellator::new();
        let mut build_layer = |spec: &LayerSpec| -> LeafResult<(LayerSolid, f64)> {
            let mesh = extrude(&geometry.merged, spec.front_offset, spec.back_offset)?;
            let solid = tessellator.tessellate(
                &mesh,
                spec.kind.solid_name(),
                &spec.material,
                &mut *backend,
            )?;
            diagnostics.dropped_triangles += solid.dropped;
            Ok((
                LayerSolid {
                    kind: spec.kind,
                    material: spec.material.clone(),
                    solid,
                },
                mesh.front_area(),
            ))
        };

        let mut layers = Vec::with_capacity(stack.layers.len());
        let mut sensitive_area = 0.0;
        for spec in &stack.layers {
            let (layer, front_area) = build_layer(spec)?;
            if spec.kind == LayerKind::Sensitive {
                sensitive_area = front_area;
            }
            layers.push(layer);
        }
        let (envelope, _) = build_layer(&stack.envelope)?;
        let extent = envelope.solid.extent;

        self.constructed = true;
        info!(
            "Built {} leaf: {} layers, sensitive area {:.6e}, {} triangles dropped",
            self.family,
            layers.len(),
            sensitive_area,
            diagnostics.dropped_triangles
        );

        Ok(LeafBlueprint {
            layers,
            envelope,
            sensitive_area,
            extent,
            diagnostics,
        })
    }

    /// Redraws every parameter from its interval with `seed`, then builds.
    pub fn rebuild(
        &mut self,
        seed: u64,
        backend: &mut dyn GeometryBackend,
    ) -> LeafResult<LeafBlueprint> {
        self.reset_geometry();
        self.config.randomize_parameters(seed)?;
        self.seed = seed;
        self.build(backend)
    }

    /// Builds the leaf as part of a tree, starting from `turtle`.
    pub fn build_for_tree(
        &mut self,
        turtle: Turtle,
        backend: &mut dyn GeometryBackend,
    ) -> LeafResult<LeafBlueprint> {
        self.initial_turtle = turtle;
        self.build(backend)
    }

    /// Bounds of the enclosing envelope when grown from `turtle`, without
    /// registering anything. `None` if no surface was traced.
    pub fn extent_for_tree(&mut self, turtle: Turtle) -> LeafResult<Option<Extent>> {
        self.initial_turtle = turtle;
        let stack = self.layer_stack()?;
        let geometry = self.trace_surface()?;
        let mesh = extrude(
            &geometry.merged,
            stack.envelope.front_offset,
            stack.envelope.back_offset,
        )?;
        let (triangles, _) = Tessellator::new().retain_valid(&mesh);
        Ok(Extent::from_points(
            triangles
                .iter()
                .filter_map(|&tri| mesh.triangle_positions(tri))
                .flatten(),
        ))
    }
}
