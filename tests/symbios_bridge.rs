// tests/symbios_bridge.rs
use glam::DVec3;
use symbios::{SymbiosState, SymbolTable};
use symbios_leaf::{
    LeafInterpreter, LeafInterpreterConfig, LeafOp, SurfaceBuilder, Symbol, Turtle, merge,
};

fn setup() -> (LeafInterpreter, SymbolTable) {
    let mut interner = SymbolTable::new();
    let mut interpreter = LeafInterpreter::new(LeafInterpreterConfig::default());

    for sym in ["G", "&", "[", "]", "{", "}", ".", "X"] {
        interner.intern(sym).unwrap();
    }
    interpreter.populate_standard_symbols(&interner);

    (interpreter, interner)
}

fn id(interner: &SymbolTable, sym: &str) -> u16 {
    interner.resolve_id(sym).unwrap()
}

#[test]
fn test_state_converts_to_symbols() {
    let (interpreter, interner) = setup();

    let mut state = SymbiosState::new();
    state.push(id(&interner, "["), 0.0, &[]).unwrap();
    state.push(id(&interner, "G"), 0.0, &[0.5, 2.0]).unwrap();
    state.push(id(&interner, "X"), 0.0, &[]).unwrap(); // unmapped
    state.push(id(&interner, "&"), 0.0, &[]).unwrap(); // default angle
    state.push(id(&interner, "]"), 0.0, &[]).unwrap();

    let symbols = interpreter.symbols_from_state(&state);
    assert_eq!(
        symbols,
        vec![
            Symbol::Branch,
            Symbol::Move {
                length: 0.5,
                growth_rate: 2.0
            },
            Symbol::Pitch(90.0),
            Symbol::Join,
        ]
    );
}

#[test]
fn test_derived_triangle_traces_surface() {
    let (interpreter, interner) = setup();
    let (open, close, dot, pitch, g) = (
        id(&interner, "{"),
        id(&interner, "}"),
        id(&interner, "."),
        id(&interner, "&"),
        id(&interner, "G"),
    );

    // { . &(90) G(2) . &(90) G(2) . }
    let mut state = SymbiosState::new();
    state.push(open, 0.0, &[]).unwrap();
    state.push(dot, 0.0, &[]).unwrap();
    state.push(pitch, 0.0, &[90.0]).unwrap();
    state.push(g, 0.0, &[2.0]).unwrap();
    state.push(dot, 0.0, &[]).unwrap();
    state.push(pitch, 0.0, &[90.0]).unwrap();
    state.push(g, 0.0, &[2.0]).unwrap();
    state.push(dot, 0.0, &[]).unwrap();
    state.push(close, 0.0, &[]).unwrap();

    let trace = interpreter
        .interpret_state(&state, Turtle::default())
        .unwrap();
    let surface = SurfaceBuilder::new().build_from_trace(&trace);
    assert_eq!(surface.polygons.len(), 1);
    assert!((surface.area() - 2.0).abs() < 1e-12);

    let merged = merge(&surface.polygons, 1e-8);
    assert_eq!(merged.vertices.len(), 3);
    assert!((merged.vertices[0].normal - DVec3::NEG_X).length() < 1e-12);
}

#[test]
fn test_explicit_map_overrides_standard_symbols() {
    let (_, interner) = setup();
    let g = id(&interner, "G");

    let mut map = vec![LeafOp::Ignore; g as usize + 1];
    map[g as usize] = LeafOp::Down;
    let interpreter = LeafInterpreter::new(LeafInterpreterConfig::default()).with_map(map);

    let mut state = SymbiosState::new();
    state.push(g, 0.0, &[3.0]).unwrap();
    state.push(id(&interner, "."), 0.0, &[]).unwrap();

    assert_eq!(interpreter.symbols_from_state(&state), vec![Symbol::Down(3.0)]);
}
