/// Item types, grid positions and entity ids.
/// Item properties are queried via methods, not stored as flags,
/// so item semantics are centralized here.

use std::fmt;

use super::face::Move;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ItemType {
    #[default]
    Empty,  // Removed entity, skipped by every query
    Floor,  // Walkable background
    Block,  // Pushable, may carry tunnels
    Player, // The single mover controlled by input
    Button, // Inert, gates a tunnel id
}

impl ItemType {
    /// Does this entity exist as far as grid queries are concerned?
    pub fn is_live(self) -> bool {
        self != ItemType::Empty
    }

    /// Can a mover collide with this item? (everything but floor)
    pub fn is_blocking(self) -> bool {
        !matches!(self, ItemType::Empty | ItemType::Floor)
    }

    /// Does this item press a button it stands on?
    pub fn presses_buttons(self) -> bool {
        matches!(self, ItemType::Block | ItemType::Player)
    }

    /// Only one occupant of this kind fits in a cell.
    pub fn is_solid(self) -> bool {
        matches!(self, ItemType::Block | ItemType::Player)
    }

    /// Items that need an existing cell underneath when placed by the editor.
    pub fn needs_ground(self) -> bool {
        self != ItemType::Floor
    }
}

/// Integer grid cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        GridPosition { x, y }
    }

    pub fn offset(self, m: Move) -> Self {
        GridPosition { x: self.x + m.dx(), y: self.y + m.dy() }
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Index into the tilemap's entity arena. Never reused within a session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct EntityId(pub usize);

impl EntityId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_and_empty_never_block() {
        assert!(!ItemType::Floor.is_blocking());
        assert!(!ItemType::Empty.is_blocking());
        assert!(ItemType::Button.is_blocking());
        assert!(!ItemType::Button.is_solid());
        assert!(ItemType::Player.presses_buttons());
        assert!(!ItemType::default().is_live());
    }

    #[test]
    fn offset_applies_move() {
        let p = GridPosition::new(2, 1);
        assert_eq!(p.offset(Move::RIGHT), GridPosition::new(3, 1));
        assert_eq!(p.offset(Move::UP), GridPosition::new(2, 0));
    }
}
