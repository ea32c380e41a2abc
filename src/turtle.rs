//! Turtle state and the turtle arena used while tracing a leaf.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Position and orientation of the tracing cursor.
///
/// `heading` and `left` are kept orthonormal; `up` is derived as `heading × left`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turtle {
    /// Current world-space position.
    pub position: DVec3,
    /// Direction a forward move travels along.
    pub heading: DVec3,
    /// The turtle's left-hand side.
    pub left: DVec3,
}

impl Default for Turtle {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            heading: DVec3::Z,
            left: DVec3::NEG_X,
        }
    }
}

impl Turtle {
    /// Creates a turtle at `position`. `heading` and `left` are normalised.
    pub fn new(position: DVec3, heading: DVec3, left: DVec3) -> Self {
        Self {
            position,
            heading: heading.normalize_or_zero(),
            left: left.normalize_or_zero(),
        }
    }

    /// Returns the turtle's local up direction in world space.
    pub fn up(&self) -> DVec3 {
        self.heading.cross(self.left)
    }

    /// Rotates the left vector about the heading by `degrees`.
    pub fn roll(&mut self, degrees: f64) {
        let rot = DQuat::from_axis_angle(self.heading, degrees.to_radians());
        self.left = (rot * self.left).normalize_or_zero();
    }

    /// Rotates the heading about the left vector by `degrees`.
    pub fn pitch(&mut self, degrees: f64) {
        let rot = DQuat::from_axis_angle(self.left, degrees.to_radians());
        self.heading = (rot * self.heading).normalize_or_zero();
    }

    /// Rotates heading and left about world +Z by `degrees`.
    pub fn yaw(&mut self, degrees: f64) {
        let rot = DQuat::from_axis_angle(DVec3::Z, degrees.to_radians());
        self.heading = (rot * self.heading).normalize_or_zero();
        self.left = (rot * self.left).normalize_or_zero();
    }

    /// Moves `distance` along the heading.
    pub fn advance(&mut self, distance: f64) {
        self.position += self.heading * distance;
    }

    /// Moves by a world-space offset, ignoring orientation.
    pub fn translate(&mut self, offset: DVec3) {
        self.position += offset;
    }
}

/// Index of a turtle inside a [`TurtleArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TurtleId(usize);

impl TurtleId {
    /// Position in the arena's creation order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Owns every turtle created during one trace.
///
/// `active` is the branch stack; the root turtle sits at its bottom and can
/// never be popped. Joined turtles move to `retired` and stay addressable until
/// the arena is reset, so extent queries can visit every position reached.
#[derive(Clone, Debug)]
pub struct TurtleArena {
    turtles: Vec<Turtle>,
    active: Vec<TurtleId>,
    retired: Vec<TurtleId>,
}

impl Default for TurtleArena {
    fn default() -> Self {
        Self::new(Turtle::default())
    }
}

impl TurtleArena {
    pub fn new(root: Turtle) -> Self {
        Self {
            turtles: vec![root],
            active: vec![TurtleId(0)],
            retired: Vec::new(),
        }
    }

    /// Drops every turtle and starts over from `root`.
    pub fn reset(&mut self, root: Turtle) {
        self.turtles.clear();
        self.active.clear();
        self.retired.clear();
        self.turtles.push(root);
        self.active.push(TurtleId(0));
    }

    /// Id of the turtle currently receiving commands.
    pub fn current_id(&self) -> TurtleId {
        self.active.last().copied().unwrap_or(TurtleId(0))
    }

    /// The turtle currently receiving commands.
    pub fn current(&self) -> &Turtle {
        &self.turtles[self.current_id().0]
    }

    /// Mutable access to the current turtle.
    pub fn current_mut(&mut self) -> &mut Turtle {
        let id = self.current_id();
        &mut self.turtles[id.0]
    }

    /// Any turtle of this trace, active or retired.
    pub fn get(&self, id: TurtleId) -> Option<&Turtle> {
        self.turtles.get(id.0)
    }

    /// Clones the current turtle and makes the clone current.
    pub fn branch(&mut self) -> TurtleId {
        let id = TurtleId(self.turtles.len());
        let clone = *self.current();
        self.turtles.push(clone);
        self.active.push(id);
        id
    }

    /// Retires the current turtle. Returns `None` when only the root is left.
    pub fn join(&mut self) -> Option<TurtleId> {
        if self.active.len() <= 1 {
            return None;
        }
        let id = self.active.pop()?;
        self.retired.push(id);
        Some(id)
    }

    /// Number of turtles created since the last reset, root included.
    pub fn len(&self) -> usize {
        self.turtles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turtles.is_empty()
    }

    /// Depth of the branch stack, root included.
    pub fn active_depth(&self) -> usize {
        self.active.len()
    }

    /// Ids of joined turtles, oldest first.
    pub fn retired(&self) -> &[TurtleId] {
        &self.retired
    }

    /// Final positions of every turtle, active and retired.
    pub fn positions(&self) -> impl Iterator<Item = DVec3> + '_ {
        self.turtles.iter().map(|t| t.position)
    }
}

/// Operations a Symbios symbol id can be mapped to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LeafOp {
    /// Move forward (`G`, `F`). Params: `(length, growth_rate)`.
    Move,
    /// Move along world −Z (`D`).
    Down,
    /// Rotate left about heading (`/`, `\`). The value is the sign.
    Roll(f64),
    /// Rotate heading about left (`&`, `^`).
    Pitch(f64),
    /// Rotate about world Z (`+`, `-`).
    Yaw(f64),
    /// Save the current turtle (`[`).
    Branch,
    /// Restore the saved turtle (`]`).
    Join,
    /// `{`
    OpenPolygon,
    /// `}`
    ClosePolygon,
    /// `.`
    Vertex,
    /// Symbol has no registered meaning.
    Ignore,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_pose() {
        let t = Turtle::default();
        assert_eq!(t.up(), DVec3::NEG_Y);
    }

    #[test]
    fn test_pitch_then_advance() {
        let mut t = Turtle::default();
        t.pitch(90.0);
        t.advance(2.0);
        assert_relative_eq!(t.position.y, 2.0, epsilon = 1e-12);
        assert_relative_eq!(t.position.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_roll_keeps_heading() {
        let mut t = Turtle::default();
        t.roll(90.0);
        assert_eq!(t.heading, DVec3::Z);
        assert_relative_eq!(t.left.z, 0.0, epsilon = 1e-12);
        assert_relative_eq!(t.left.length(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_yaw_rotates_about_world_z() {
        let mut t = Turtle::default();
        t.yaw(90.0);
        assert_relative_eq!(t.left.y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(t.heading.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_arena_root_cannot_be_joined() {
        let mut arena = TurtleArena::default();
        assert_eq!(arena.join(), None);

        let id = arena.branch();
        arena.current_mut().advance(1.0);
        assert_eq!(arena.join(), Some(id));
        assert_eq!(arena.current().position, DVec3::ZERO);
        assert_eq!(arena.get(id).map(|t| t.position), Some(DVec3::Z));
        assert_eq!(arena.retired(), &[id]);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_arena_reset() {
        let mut arena = TurtleArena::default();
        arena.branch();
        arena.branch();
        arena.reset(Turtle::default());
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.active_depth(), 1);
        assert!(arena.retired().is_empty());
    }
}
