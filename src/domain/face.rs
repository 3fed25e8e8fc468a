/// Faces and unit moves.
///
/// Faces are numbered clockwise starting at Up, so turning a face by one
/// quarter turn clockwise is `+1 mod 4`. A `Move` can only be built from
/// one of the four unit vectors, which makes `Face::of` total.

use super::error::MoveError;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Face {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Face {
    pub const ALL: [Face; 4] = [Face::Up, Face::Right, Face::Down, Face::Left];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Face {
        Face::ALL[i % 4]
    }

    /// The face a move points out of: (0,-1) is Up, (1,0) is Right.
    pub fn of(m: Move) -> Face {
        match (m.dx, m.dy) {
            (0, -1) => Face::Up,
            (1, 0) => Face::Right,
            (0, 1) => Face::Down,
            _ => Face::Left,
        }
    }

    /// Unit move leaving the cell through this face.
    pub fn to_move(self) -> Move {
        match self {
            Face::Up => Move { dx: 0, dy: -1 },
            Face::Right => Move { dx: 1, dy: 0 },
            Face::Down => Move { dx: 0, dy: 1 },
            Face::Left => Move { dx: -1, dy: 0 },
        }
    }

    pub fn opposite(self) -> Face {
        self.rotated(2)
    }

    /// Rotate clockwise by `quarter_turns`.
    pub fn rotated(self, quarter_turns: usize) -> Face {
        Face::from_index(self.index() + quarter_turns)
    }

    /// Clockwise quarter turns needed to go from `self` to `other` (0..=3).
    pub fn quarter_turns_to(self, other: Face) -> usize {
        (other.index() + 4 - self.index()) % 4
    }

    /// Face of a block that a mover travelling along `m` runs into.
    /// Moving east hits the block's Left face.
    pub fn struck_by(m: Move) -> Face {
        Face::of(m).opposite()
    }

    pub fn from_letter(c: char) -> Option<Face> {
        match c.to_ascii_uppercase() {
            'U' => Some(Face::Up),
            'R' => Some(Face::Right),
            'D' => Some(Face::Down),
            'L' => Some(Face::Left),
            _ => None,
        }
    }
}

/// A unit step on the grid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Move {
    dx: i32,
    dy: i32,
}

impl Move {
    pub const UP: Move = Move { dx: 0, dy: -1 };
    pub const RIGHT: Move = Move { dx: 1, dy: 0 };
    pub const DOWN: Move = Move { dx: 0, dy: 1 };
    pub const LEFT: Move = Move { dx: -1, dy: 0 };

    /// Only the four axis-aligned unit vectors are accepted.
    pub fn new(dx: i32, dy: i32) -> Result<Move, MoveError> {
        match (dx, dy) {
            (0, -1) | (1, 0) | (0, 1) | (-1, 0) => Ok(Move { dx, dy }),
            _ => Err(MoveError::InvalidMove { dx, dy }),
        }
    }

    pub fn dx(self) -> i32 {
        self.dx
    }

    pub fn dy(self) -> i32 {
        self.dy
    }
}
