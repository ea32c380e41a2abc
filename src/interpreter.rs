//! Turtle interpretation of terminal symbol sequences.
//!
//! [`TurtleInterpreter`] walks a `&[Symbol]` and records the polygons traced by
//! `{ . }` groups. [`LeafInterpreter`] is the bridge for strings derived by
//! [`symbios`]: register symbol-to-operation mappings via
//! [`LeafInterpreter::set_op`] or [`LeafInterpreter::populate_standard_symbols`],
//! then convert a [`SymbiosState`] with [`LeafInterpreter::symbols_from_state`].

use crate::error::{LeafError, LeafResult};
use crate::geometry::{Extent, Polygon};
use crate::symbol::Symbol;
use crate::turtle::{LeafOp, Turtle, TurtleArena};
use glam::DVec3;
use symbios::{SymbiosState, SymbolTable};
use tracing::{debug, warn};

/// Interpreter state between two symbols.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceState {
    Tracing,
    /// `depth` polygons are currently accumulating vertices.
    PolygonOpen { depth: usize },
}

/// Output of one interpretation pass.
#[derive(Clone, Debug)]
pub struct Trace {
    /// Polygons in the order they were closed.
    pub polygons: Vec<Polygon>,
    /// Polygons closed with fewer than three vertices, or never closed.
    pub rejected_polygons: usize,
    /// `.` and `}` found outside any polygon.
    pub ignored_symbols: usize,
    /// Every turtle created while tracing.
    pub turtles: TurtleArena,
}

impl Trace {
    /// Bounds of every position a turtle finished at, active or retired.
    pub fn turtle_extent(&self) -> Option<Extent> {
        Extent::from_points(self.turtles.positions())
    }

    /// The turtle left active at the bottom of the stack.
    pub fn final_turtle(&self) -> &Turtle {
        self.turtles.current()
    }
}

/// Consumes terminal symbols and traces polygons.
///
/// Non-terminals are skipped. `[` pushes a clone of the current turtle, `]`
/// retires it; a `]` that would retire the starting turtle aborts with
/// [`LeafError::TurtleStackUnderflow`].
#[derive(Debug)]
pub struct TurtleInterpreter {
    state: TraceState,
    open: Vec<Vec<DVec3>>,
}

impl Default for TurtleInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl TurtleInterpreter {
    pub fn new() -> Self {
        Self {
            state: TraceState::Tracing,
            open: Vec::new(),
        }
    }

    pub fn state(&self) -> TraceState {
        self.state
    }

    /// Interprets `symbols` starting from `initial`.
    pub fn interpret(&mut self, symbols: &[Symbol], initial: Turtle) -> LeafResult<Trace> {
        let mut trace = Trace {
            polygons: Vec::new(),
            rejected_polygons: 0,
            ignored_symbols: 0,
            turtles: TurtleArena::new(initial),
        };
        self.open.clear();
        self.state = TraceState::Tracing;

        for (index, symbol) in symbols.iter().enumerate() {
            self.step(index, symbol, &mut trace)?;
        }

        if !self.open.is_empty() {
            warn!(
                "{} polygon(s) still open at end of input, rejecting",
                self.open.len()
            );
            trace.rejected_polygons += self.open.len();
            self.open.clear();
            self.state = TraceState::Tracing;
        }

        debug!(
            "Traced {} polygons ({} rejected) with {} turtles",
            trace.polygons.len(),
            trace.rejected_polygons,
            trace.turtles.len()
        );

        Ok(trace)
    }

    fn step(&mut self, index: usize, symbol: &Symbol, trace: &mut Trace) -> LeafResult<()> {
        let turtles = &mut trace.turtles;
        match *symbol {
            Symbol::Move { length, .. } => turtles.current_mut().advance(length),
            Symbol::Down(distance) => turtles.current_mut().translate(DVec3::NEG_Z * distance),
            Symbol::Roll(angle) => turtles.current_mut().roll(angle),
            Symbol::Pitch(angle) => turtles.current_mut().pitch(angle),
            Symbol::Yaw(angle) => turtles.current_mut().yaw(angle),
            Symbol::Branch => {
                turtles.branch();
            }
            Symbol::Join => {
                if turtles.join().is_none() {
                    return Err(LeafError::TurtleStackUnderflow { index });
                }
            }
            Symbol::OpenPolygon => {
                self.open.push(Vec::new());
                self.state = TraceState::PolygonOpen {
                    depth: self.open.len(),
                };
            }
            Symbol::Vertex => {
                let position = turtles.current().position;
                match self.open.last_mut() {
                    Some(vertices) => vertices.push(position),
                    None => {
                        warn!("Vertex at symbol {} outside any polygon, ignoring", index);
                        trace.ignored_symbols += 1;
                    }
                }
            }
            Symbol::ClosePolygon => match self.open.pop() {
                Some(vertices) if vertices.len() >= 3 => {
                    trace.polygons.push(Polygon::new(vertices));
                    self.settle();
                }
                Some(vertices) => {
                    debug!(
                        "Polygon closed at symbol {} with {} vertices, rejecting",
                        index,
                        vertices.len()
                    );
                    trace.rejected_polygons += 1;
                    self.settle();
                }
                None => {
                    warn!("Polygon close at symbol {} without an open polygon", index);
                    trace.ignored_symbols += 1;
                }
            },
            Symbol::Growth(_) => {}
        }
        Ok(())
    }

    fn settle(&mut self) {
        self.state = match self.open.len() {
            0 => TraceState::Tracing,
            depth => TraceState::PolygonOpen { depth },
        };
    }
}

/// Configuration for [`LeafInterpreter`].
#[derive(Clone, Debug)]
pub struct LeafInterpreterConfig {
    /// Move length when a `G` carries no parameter.
    pub default_length: f64,
    /// Turn angle in degrees when a turn carries no parameter.
    pub default_angle: f64,
}

impl Default for LeafInterpreterConfig {
    fn default() -> Self {
        Self {
            default_length: 1.0,
            default_angle: 90.0,
        }
    }
}

/// Maps symbols derived by a Symbios L-system onto [`Symbol`]s.
pub struct LeafInterpreter {
    op_map: Vec<LeafOp>,
    config: LeafInterpreterConfig,
}

impl LeafInterpreter {
    /// Creates an interpreter with an empty symbol map.
    pub fn new(config: LeafInterpreterConfig) -> Self {
        Self {
            op_map: Vec::new(),
            config,
        }
    }

    /// Replaces the whole symbol-to-operation map, indexed by symbol id.
    /// Ids outside the slice are treated as [`LeafOp::Ignore`].
    pub fn with_map(mut self, map: Vec<LeafOp>) -> Self {
        self.op_map = map;
        self
    }

    /// Assigns a [`LeafOp`] to a symbol id, growing the map with
    /// [`LeafOp::Ignore`] as needed.
    pub fn set_op(&mut self, sym_id: u16, op: LeafOp) {
        let idx = sym_id as usize;
        if idx >= self.op_map.len() {
            self.op_map.resize(idx + 1, LeafOp::Ignore);
        }
        self.op_map[idx] = op;
    }

    /// Registers the conventional mappings for every standard symbol present in
    /// `interner`. Missing symbols are skipped.
    pub fn populate_standard_symbols(&mut self, interner: &SymbolTable) {
        let mappings = [
            ("G", LeafOp::Move),
            ("F", LeafOp::Move),
            ("D", LeafOp::Down),
            ("/", LeafOp::Roll(1.0)),
            ("\\", LeafOp::Roll(-1.0)),
            ("&", LeafOp::Pitch(1.0)),
            ("^", LeafOp::Pitch(-1.0)),
            ("+", LeafOp::Yaw(1.0)),
            ("-", LeafOp::Yaw(-1.0)),
            ("[", LeafOp::Branch),
            ("]", LeafOp::Join),
            ("{", LeafOp::OpenPolygon),
            ("}", LeafOp::ClosePolygon),
            (".", LeafOp::Vertex),
        ];

        for (sym, op) in mappings {
            if let Some(id) = interner.resolve_id(sym) {
                self.set_op(id, op);
            }
        }
    }

    /// Converts every mapped symbol of `state` into a [`Symbol`], in order.
    pub fn symbols_from_state(&self, state: &SymbiosState) -> Vec<Symbol> {
        let mut symbols = Vec::with_capacity(state.len());

        for i in 0..state.len() {
            let view = match state.get_view(i) {
                Some(v) => v,
                None => break,
            };

            let op = self
                .op_map
                .get(view.sym as usize)
                .unwrap_or(&LeafOp::Ignore);

            let p = |idx: usize, def: f64| -> f64 { view.params.get(idx).copied().unwrap_or(def) };
            let angle = p(0, self.config.default_angle);

            let symbol = match *op {
                LeafOp::Move => Symbol::Move {
                    length: p(0, self.config.default_length),
                    growth_rate: p(1, 1.0),
                },
                LeafOp::Down => Symbol::Down(p(0, self.config.default_length)),
                LeafOp::Roll(s) => Symbol::Roll(angle * s),
                LeafOp::Pitch(s) => Symbol::Pitch(angle * s),
                LeafOp::Yaw(s) => Symbol::Yaw(angle * s),
                LeafOp::Branch => Symbol::Branch,
                LeafOp::Join => Symbol::Join,
                LeafOp::OpenPolygon => Symbol::OpenPolygon,
                LeafOp::ClosePolygon => Symbol::ClosePolygon,
                LeafOp::Vertex => Symbol::Vertex,
                LeafOp::Ignore => continue,
            };
            symbols.push(symbol);
        }

        symbols
    }

    /// Converts `state` and traces it from `initial`.
    pub fn interpret_state(&self, state: &SymbiosState, initial: Turtle) -> LeafResult<Trace> {
        let symbols = self.symbols_from_state(state);
        TurtleInterpreter::new().interpret(&symbols, initial)
    }
}
