//! Grammar tokens.
//!
//! Every token the grammar can produce is a variant of [`Symbol`]. Terminal
//! variants have a turtle meaning; [`Growth`] variants only exist to be rewritten
//! and are ignored by the interpreter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One token of an L-system string.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Symbol {
    /// `G(length, rate)`: move forward along the heading. Each generation
    /// multiplies `length` by `growth_rate`.
    Move { length: f64, growth_rate: f64 },
    /// `D(distance)`: move along world −Z, independent of orientation.
    Down(f64),
    /// `/(deg)`: rotate the left vector about the heading.
    Roll(f64),
    /// `&(deg)`: rotate the heading about the left vector.
    Pitch(f64),
    /// `+(deg)` / `-(deg)`: rotate heading and left vector about world +Z.
    Yaw(f64),
    /// `[`: save the active turtle.
    Branch,
    /// `]`: restore the previously saved turtle.
    Join,
    /// `{`: start accumulating polygon vertices.
    OpenPolygon,
    /// `}`: finish the innermost polygon.
    ClosePolygon,
    /// `.`: record the active turtle position as a polygon vertex.
    Vertex,
    /// Non-terminal, rewritten by the grammar.
    Growth(Growth),
}

/// Non-terminal symbols of the built-in leaf families.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Growth {
    /// Cordate `A(direction)`: grows the right-hand lobe.
    CordateApex { direction: f64 },
    /// Cordate `B(direction)`: grows the left-hand lobe.
    CordateLobe { direction: f64 },
    /// Cordate `C`: the elongating midrib.
    CordateStalk,
    /// Simple `A(t)`: main axis apex at time index `t`.
    SimpleApex { time_index: f64 },
    /// Simple `B(t)`: lateral axis with remaining growth potential `t`.
    SimpleLateral { time_index: f64 },
}

impl Symbol {
    /// True when the symbol has a turtle meaning (it is never rewritten into
    /// anything but a copy of itself, apart from `Move` growth).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Symbol::Growth(_))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Move {
                length,
                growth_rate,
            } => write!(f, "G({length},{growth_rate})"),
            Symbol::Down(d) => write!(f, "D({d})"),
            Symbol::Roll(a) => write!(f, "/({a})"),
            Symbol::Pitch(a) => write!(f, "&({a})"),
            Symbol::Yaw(a) if *a < 0.0 => write!(f, "-({})", -a),
            Symbol::Yaw(a) => write!(f, "+({a})"),
            Symbol::Branch => write!(f, "["),
            Symbol::Join => write!(f, "]"),
            Symbol::OpenPolygon => write!(f, "{{"),
            Symbol::ClosePolygon => write!(f, "}}"),
            Symbol::Vertex => write!(f, "."),
            Symbol::Growth(g) => write!(f, "{g}"),
        }
    }
}

impl fmt::Display for Growth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Growth::CordateApex { direction } => write!(f, "A({direction})"),
            Growth::CordateLobe { direction } => write!(f, "B({direction})"),
            Growth::CordateStalk => write!(f, "C"),
            Growth::SimpleApex { time_index } => write!(f, "A({time_index})"),
            Growth::SimpleLateral { time_index } => write!(f, "B({time_index})"),
        }
    }
}

/// Concatenates the text form of a symbol sequence.
pub fn format_symbols(symbols: &[Symbol]) -> String {
    symbols.iter().map(ToString::to_string).collect()
}
