/// Tunnel ids and per-block face bindings.

use std::fmt;

use super::face::Face;

/// Pairing key shared by two faces. Also selects the draw color.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct TunnelId(pub u8);

impl fmt::Display for TunnelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Four optional tunnels, indexed by `Face`.
pub type TunnelBindings = [Option<TunnelId>; 4];

pub const NO_TUNNELS: TunnelBindings = [None; 4];

pub fn binding(b: &TunnelBindings, face: Face) -> Option<TunnelId> {
    b[face.index()]
}

/// Rotate bindings clockwise: what was on face `i` ends up on `i + turns`.
pub fn rotate_bindings(b: TunnelBindings, quarter_turns: usize) -> TunnelBindings {
    let mut out = NO_TUNNELS;
    for face in Face::ALL {
        out[face.rotated(quarter_turns).index()] = b[face.index()];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(id: u8) -> Option<TunnelId> {
        Some(TunnelId(id))
    }

    #[test]
    fn zero_turns_is_identity() {
        let b = [t(1), None, t(2), None];
        assert_eq!(rotate_bindings(b, 0), b);
        assert_eq!(rotate_bindings(b, 4), b);
    }

    #[test]
    fn one_turn_moves_up_to_right() {
        let b = [t(1), t(2), t(3), None];
        let r = rotate_bindings(b, 1);
        assert_eq!(binding(&r, Face::Right), t(1));
        assert_eq!(binding(&r, Face::Down), t(2));
        assert_eq!(binding(&r, Face::Left), t(3));
        assert_eq!(binding(&r, Face::Up), None);
    }

    #[test]
    fn three_turns_undo_one() {
        let b = [t(0), None, None, t(5)];
        assert_eq!(rotate_bindings(rotate_bindings(b, 1), 3), b);
        assert_eq!(rotate_bindings(b, 2), [None, t(5), t(0), None]);
    }
}
