//! # symbios-leaf
//!
//! Procedural leaf geometry for L-Systems. A leaf grammar is expanded, traced by
//! a turtle into planar polygons, merged into a shared-vertex surface, extruded
//! into closed material layers and tessellated into solids registered with a
//! host-supplied [`GeometryBackend`].
//!
//! The result is a [`LeafBlueprint`]: per-layer solids, an enclosing envelope,
//! the sensitive front-face area and the bounding extent, ready to be consumed
//! by a particle-transport simulation or any other engine.
//!
//! Grammars can come from the built-in [`LeafFamily`] rules or from strings
//! derived by [Symbios](https://crates.io/crates/symbios) via [`LeafInterpreter`].

pub mod backend;
pub mod blueprint;
pub mod config;
pub mod construction;
pub mod error;
pub mod extrude;
pub mod geometry;
pub mod grammar;
pub mod interpreter;
pub mod merge;
pub mod surface;
pub mod symbol;
pub mod tessellate;
pub mod topology;
pub mod turtle;

pub use backend::*;
pub use blueprint::*;
pub use config::{DoubleParameter, IntegerParameter, LeafConfiguration, names};
pub use construction::*;
pub use error::*;
pub use extrude::*;
pub use geometry::*;
pub use grammar::*;
pub use interpreter::*;
pub use merge::*;
pub use surface::*;
pub use symbol::*;
pub use tessellate::*;
pub use topology::*;
pub use turtle::*;
