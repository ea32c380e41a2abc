// tests/pipeline.rs
use approx::assert_relative_eq;
use glam::DVec3;
use symbios_leaf::{
    EdgeTopology, Extent, ExtrudedMesh, InMemoryBackend, LayerStack, LeafBlueprint,
    LeafConfiguration, LeafConstruction, LeafError, LeafFamily, Polygon, SurfaceBuilder, Symbol, Tessellator, Turtle,
    TurtleInterpreter, expand_seeded, extrapolated_surface_area, extrude, merge, surface_area,
    triangle_area,
};

fn g(length: f64) -> Symbol {
    Symbol::Move {
        length,
        growth_rate: 1.0,
    }
}

/// `[ { . &(90) G(1) . &(90) G(1) . } ]`
fn single_triangle_axiom() -> Vec<Symbol> {
    vec![
        Symbol::Branch,
        Symbol::OpenPolygon,
        Symbol::Vertex,
        Symbol::Pitch(90.0),
        g(1.0),
        Symbol::Vertex,
        Symbol::Pitch(90.0),
        g(1.0),
        Symbol::Vertex,
        Symbol::ClosePolygon,
        Symbol::Join,
    ]
}

fn assert_closed_shells(blueprint: &LeafBlueprint, label: &str) {
    for layer in blueprint.layers.iter().chain(std::iter::once(&blueprint.envelope)) {
        let topo = EdgeTopology::build(&layer.solid.triangles);
        assert!(topo.is_closed_manifold(), "{label}: {:?} not closed", layer.kind);
        assert!(
            topo.is_consistently_oriented(),
            "{label}: {:?} inconsistently wound",
            layer.kind
        );
    }
}

fn assert_contained(extent: &Extent, mesh_positions: &[DVec3], triangles: &[[u32; 3]]) {
    for tri in triangles {
        for &i in tri {
            assert!(extent.contains(mesh_positions[i as usize]));
        }
    }
}

#[test]
fn test_single_triangle_pipeline() {
    let config = LeafFamily::Planar.default_configuration();
    let symbols = expand_seeded(&single_triangle_axiom(), 0, &config, 0).unwrap();
    let trace = TurtleInterpreter::new()
        .interpret(&symbols, Turtle::default())
        .unwrap();
    assert_eq!(trace.polygons.len(), 1);

    let surface = SurfaceBuilder::new().build_from_trace(&trace);
    let raw_area = surface_area(&surface.polygons);
    assert_relative_eq!(raw_area, 0.5, epsilon = 1e-12);

    let merged = merge(&surface.polygons, 1e-6);
    assert_eq!(merged.vertices.len(), 3);

    let stack = LayerStack::layered(0.01);
    let sensitive = stack.sensitive().unwrap();
    let mesh = extrude(&merged, sensitive.front_offset, sensitive.back_offset).unwrap();

    let mut backend = InMemoryBackend::with_leaf_materials();
    let solid = Tessellator::new()
        .tessellate(&mesh, "LeafSensitiveSolid", &sensitive.material, &mut backend)
        .unwrap();

    assert_eq!(solid.dropped, 0);
    assert!(EdgeTopology::build(&solid.triangles).is_closed_manifold());
    assert!((mesh.front_area() - raw_area).abs() <= 1e-9);
}

#[test]
fn test_bare_join_underflows_without_polygons() {
    let mut symbols = vec![Symbol::Join];
    symbols.extend(single_triangle_axiom());

    let result = TurtleInterpreter::new().interpret(&symbols, Turtle::default());
    match result {
        Err(LeafError::TurtleStackUnderflow { index }) => assert_eq!(index, 0),
        other => panic!("expected underflow, got {other:?}"),
    }
}

#[test]
fn test_shared_edge_merges_to_four_vertices() {
    let polygons = vec![
        Polygon::triangle(DVec3::ZERO, DVec3::X, DVec3::Y),
        Polygon::triangle(
            DVec3::new(1.0, 4e-7, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(-3e-7, 1.0, 2e-7),
        ),
    ];
    let merged = merge(&polygons, 1e-6);
    assert_eq!(merged.vertices.len(), 4);
}

#[test]
fn test_collinear_triangle_dropped_by_tessellator() {
    let positions = vec![
        DVec3::ZERO,
        DVec3::X,
        DVec3::Y,
        DVec3::new(0.5, 0.0, 0.0),
        DVec3::new(1.0, 1.0, 0.0),
    ];
    let triangles = vec![[0, 1, 2], [0, 3, 1], [1, 4, 2]];
    let mesh = ExtrudedMesh {
        positions,
        front_triangles: triangles.len(),
        triangles,
        back_triangles: 0,
        side_triangles: 0,
    };

    let mut backend = InMemoryBackend::with_leaf_materials();
    let solid = Tessellator::new()
        .tessellate(&mesh, "Leaf", "pv-silicon", &mut backend)
        .unwrap();
    assert_eq!(solid.triangles.len(), mesh.triangles.len() - 1);
    assert_eq!(solid.dropped, 1);
}

#[test]
fn test_planar_leaf_is_closed_unit_square() {
    let mut backend = InMemoryBackend::with_leaf_materials();
    let mut leaf = LeafConstruction::new(LeafFamily::Planar);
    let blueprint = leaf.build(&mut backend).unwrap();

    assert_relative_eq!(blueprint.sensitive_area, 1.0, max_relative = 1e-9);
    assert_eq!(blueprint.diagnostics.traced_polygons, 2);
    assert_eq!(blueprint.diagnostics.dropped_triangles, 0);

    let extent = blueprint.extent.unwrap();
    assert_relative_eq!(extent.min.x, -0.5, epsilon = 1e-12);
    assert_relative_eq!(extent.max.y, 0.5, epsilon = 1e-12);
    assert_relative_eq!(extent.min.z, -0.005, epsilon = 1e-12);
    assert_relative_eq!(extent.max.z, 0.005, epsilon = 1e-12);

    for layer in blueprint.layers.iter().chain(std::iter::once(&blueprint.envelope)) {
        let topo = EdgeTopology::build(&layer.solid.triangles);
        assert!(topo.is_closed_manifold(), "{:?} not closed", layer.kind);
        assert!(topo.is_consistently_oriented());
        assert_eq!(layer.solid.triangles.len(), 12);
    }
}

#[test]
fn test_zero_thickness_area_equals_surface_area() {
    let mut leaf = LeafConstruction::new(LeafFamily::Cordate);
    let geometry = leaf.trace_surface().unwrap();
    let raw = surface_area(&geometry.surface.polygons);
    let extrapolated = extrapolated_surface_area(&geometry.merged, 0.0, 0.0).unwrap();

    assert!(raw > 0.0);
    assert_relative_eq!(extrapolated, raw, max_relative = 1e-9);
}

#[test]
fn test_tessellator_drop_count_matches_degenerate_triangles() {
    let mut leaf = LeafConstruction::new(LeafFamily::Cordate);
    let geometry = leaf.trace_surface().unwrap();

    for (front, back) in [(0.005, 0.005), (0.0, 0.0), (0.0003, 0.0)] {
        let mesh = extrude(&geometry.merged, front, back).unwrap();
        let degenerate = mesh
            .triangles
            .iter()
            .filter(|&&tri| {
                let [a, b, c] = mesh.triangle_positions(tri).unwrap();
                triangle_area(a, b, c) <= symbios_leaf::AREA_EPSILON
            })
            .count();

        let (kept, dropped) = Tessellator::new().retain_valid(&mesh);
        assert_eq!(dropped, degenerate);
        assert_eq!(kept.len(), mesh.triangles.len() - degenerate);
    }
}

#[test]
fn test_every_family_builds_and_is_contained() {
    for family in LeafFamily::ALL {
        let mut backend = InMemoryBackend::with_leaf_materials();
        let mut leaf = LeafConstruction::new(family);
        let blueprint = leaf.build(&mut backend).unwrap();

        assert!(blueprint.sensitive_area > 0.0, "{family} has no area");
        assert_closed_shells(&blueprint, &family.to_string());
        let extent = blueprint.extent.unwrap();
        for layer in blueprint.layers.iter().chain(std::iter::once(&blueprint.envelope)) {
            assert_contained(
                &layer.solid.extent.unwrap(),
                &layer.solid.positions,
                &layer.solid.triangles,
            );
        }
        assert_contained(
            &extent,
            &blueprint.envelope.solid.positions,
            &blueprint.envelope.solid.triangles,
        );
        assert!(blueprint.world_radius() > 0.0);
    }
}

#[test]
fn test_randomized_rebuilds_stay_closed() {
    for family in LeafFamily::ALL {
        let mut leaf = LeafConstruction::new(family);
        for seed in [3, 17, 256] {
            let mut backend = InMemoryBackend::with_leaf_materials();
            let blueprint = leaf.rebuild(seed, &mut backend).unwrap();
            assert_closed_shells(&blueprint, &format!("{family} seed {seed}"));
        }
    }
}

#[test]
fn test_merged_vertices_are_separated_by_tolerance() {
    let tolerance = 1e-8;
    let mut leaf = LeafConstruction::new(LeafFamily::Cordate);
    let geometry = leaf.trace_surface().unwrap();
    let vertices = &geometry.merged.vertices;
    assert!(vertices.len() > 3);

    for (i, a) in vertices.iter().enumerate() {
        for b in &vertices[i + 1..] {
            let close = (a.position - b.position).abs().cmplt(DVec3::splat(tolerance)).all();
            assert!(!close, "{:?} and {:?} were not merged", a.position, b.position);
        }
    }
}

#[test]
fn test_seeded_rebuild_is_reproducible() {
    let mut first_backend = InMemoryBackend::with_leaf_materials();
    let mut second_backend = InMemoryBackend::with_leaf_materials();

    let mut first = LeafConstruction::new(LeafFamily::Cordate);
    let mut second = LeafConstruction::new(LeafFamily::Cordate);
    let a = first.rebuild(17, &mut first_backend).unwrap();
    let b = second.rebuild(17, &mut second_backend).unwrap();

    assert_eq!(first.configuration(), second.configuration());
    assert_eq!(a.sensitive_area, b.sensitive_area);
    assert_eq!(a.envelope.solid.positions, b.envelope.solid.positions);
}

#[test]
fn test_rebuild_replaces_previous_geometry() {
    let mut backend = InMemoryBackend::with_leaf_materials();
    let mut leaf = LeafConstruction::new(LeafFamily::Simple);

    leaf.rebuild(1, &mut backend).unwrap();
    let first_symbols = leaf.geometry().map(|g| g.symbols.len()).unwrap();
    leaf.rebuild(1, &mut backend).unwrap();
    let second_symbols = leaf.geometry().map(|g| g.symbols.len()).unwrap();

    assert_eq!(first_symbols, second_symbols);
    assert!(leaf.is_constructed());
}

#[test]
fn test_leaf_grown_from_tree_turtle_is_translated() {
    let mut leaf = LeafConstruction::new(LeafFamily::Planar);
    let at_origin = leaf.extent_for_tree(Turtle::default()).unwrap().unwrap();

    let offset = DVec3::new(3.0, -2.0, 5.0);
    let tip = Turtle {
        position: offset,
        ..Turtle::default()
    };
    let moved = leaf.extent_for_tree(tip).unwrap().unwrap();

    assert_relative_eq!(moved.min.x, at_origin.min.x + offset.x, epsilon = 1e-12);
    assert_relative_eq!(moved.max.z, at_origin.max.z + offset.z, epsilon = 1e-12);

    let mut backend = InMemoryBackend::with_leaf_materials();
    let blueprint = leaf.build_for_tree(tip, &mut backend).unwrap();
    assert_eq!(blueprint.extent, Some(moved));
}

#[test]
fn test_configuration_errors_stop_the_build() {
    let mut backend = InMemoryBackend::with_leaf_materials();

    // A stored configuration whose thickness lies outside its interval.
    let mut value = serde_json::to_value(LeafFamily::Planar.default_configuration()).unwrap();
    for entry in value["doubles"].as_array_mut().unwrap() {
        if entry["name"] == "thickness" {
            entry["value"] = serde_json::json!(0.5);
        }
    }
    let config: LeafConfiguration = serde_json::from_value(value).unwrap();
    let mut thick = LeafConstruction::new(LeafFamily::Planar).with_configuration(config);
    let err = thick.build(&mut backend).unwrap_err();
    assert!(matches!(err, LeafError::ParameterOutOfRange { ref name, .. } if name == "thickness"));

    let mut negative = LeafConstruction::new(LeafFamily::Cordate);
    negative
        .configuration_mut()
        .set_integer_parameter("iterationNumber", -1);
    let err = negative.build(&mut backend).unwrap_err();
    assert!(err.is_configuration_error());

    assert!(backend.solids().is_empty());

    for jitter in [f64::INFINITY, 1e308] {
        let mut jittered = LeafConstruction::new(LeafFamily::Cordate);
        jittered
            .configuration_mut()
            .set_parameter("angleJitter", jitter);
        let err = jittered.build(&mut backend).unwrap_err();
        assert!(matches!(err, LeafError::ParameterOutOfRange { ref name, .. } if name == "angleJitter"));
    }

    let mut wide = LeafConstruction::new(LeafFamily::Cordate);
    wide.configuration_mut().set_parameter("offsetLength", 1e308);
    wide.configuration_mut().set_parameter("offsetLength", -1e308);
    let err = wide.rebuild(3, &mut backend).unwrap_err();
    assert!(matches!(err, LeafError::InvalidConfiguration(_)));

    assert!(backend.solids().is_empty());

    let mut missing = LeafConstruction::new(LeafFamily::Simple)
        .with_configuration(LeafFamily::Planar.default_configuration());
    let err = missing.build(&mut backend).unwrap_err();
    assert!(matches!(err, LeafError::MissingParameter { .. }));
    assert!(!missing.is_constructed());
}

#[test]
fn test_blueprint_serializes() {
    let mut backend = InMemoryBackend::with_leaf_materials();
    let mut leaf = LeafConstruction::new(LeafFamily::Planar);
    let blueprint = leaf.build(&mut backend).unwrap();

    let json = blueprint.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["layers"].as_array().map(Vec::len), Some(3));
    assert_eq!(value["envelope"]["kind"], "Envelope");
}
