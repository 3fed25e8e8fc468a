/// Movement resolution: pushing chains and tunnel teleports.
///
/// `try_move(id, m, from)` asks "can the entity at `from` advance by `m`?"
///
///   1. The target cell must be registered (floor or anything live).
///   2. A player on the target blocks; players are never pushed.
///   3. A block that is itself moving on the current path blocks too. Its
///      cell is only vacated on the way back up, and whoever pushed it
///      commits into that cell.
///   4. Any other block on the target is struck on the face pointing back at the
///      mover. An open tunnel on that face redirects the *same* call to the
///      paired exit block, travelling out of the exit face. If that works the
///      mover's own bindings are rotated to its new heading and we are done.
///   5. Otherwise the block itself must move by `m` first.
///   6. Commit the mover onto the target.
///
/// Positions only change on the way back up a successful path, so a `false`
/// or an error never leaves anything half-moved.
///
/// The board does not change while descending, so seeing the same
/// (entity, move, origin) twice on the current path means the recursion
/// would never end; that aborts the turn as a tunnel loop.

use tracing::debug;

use crate::domain::error::ResolveError;
use crate::domain::face::{Face, Move};
use crate::domain::item::{EntityId, GridPosition, ItemType};
use crate::domain::tunnel::{binding, rotate_bindings};
use super::event::GameEvent;
use super::tilemap::Tilemap;

pub struct Resolver<'a> {
    map: &'a mut Tilemap,
    limit: usize,
    path: Vec<(EntityId, Move, GridPosition)>,
    events: Vec<GameEvent>,
}

impl<'a> Resolver<'a> {
    pub fn new(map: &'a mut Tilemap) -> Self {
        let limit = map.depth_limit();
        Resolver { map, limit, path: Vec::new(), events: Vec::new() }
    }

    /// Returns whether `id` (and everything it had to push) advanced.
    pub fn try_move(&mut self, id: EntityId, m: Move, from: GridPosition) -> Result<bool, ResolveError> {
        let key = (id, m, from);
        if self.path.contains(&key) {
            return Err(ResolveError::TunnelLoop { entity: id, from });
        }
        if self.path.len() >= self.limit {
            return Err(ResolveError::DepthExceeded { limit: self.limit });
        }

        self.path.push(key);
        let result = self.resolve(id, m, from);
        self.path.pop();
        result
    }

    pub fn into_events(self) -> Vec<GameEvent> {
        self.events
    }

    fn resolve(&mut self, id: EntityId, m: Move, from: GridPosition) -> Result<bool, ResolveError> {
        let target = from.offset(m);

        if self.map.is_empty(target) {
            return Ok(false);
        }

        if self.map.find(ItemType::Player, target).is_some() {
            return Ok(false);
        }

        if let Some(block) = self.map.find(ItemType::Block, target) {
            if self.is_moving(block) {
                debug!(%id, %block, "target held by a block already in motion");
                return Ok(false);
            }
            if self.try_tunnel(id, m, block)? {
                return Ok(true);
            }
            if !self.try_move(block, m, target)? {
                return Ok(false);
            }
        }

        self.commit(id, target);
        Ok(true)
    }

    /// Send `id` through the tunnel on the struck face of `block`, if open.
    fn try_tunnel(&mut self, id: EntityId, m: Move, block: EntityId) -> Result<bool, ResolveError> {
        let face = Face::struck_by(m);
        let tunnel = match binding(&self.map.bindings(block), face) {
            Some(t) => t,
            None => return Ok(false),
        };
        if !self.map.is_activated(tunnel) {
            debug!(%tunnel, "tunnel closed by button");
            return Ok(false);
        }
        let (exit, exit_face) = match self.map.find_paired(block, face)? {
            Some(pair) => pair,
            None => return Ok(false),
        };

        let next = exit_face.to_move();
        let exit_at = self.map.position(exit);
        if !self.try_move(id, next, exit_at)? {
            debug!(%tunnel, %id, "tunnel exit blocked");
            return Ok(false);
        }

        debug!(%tunnel, %id, exit = %exit, ?exit_face, "teleported");
        self.events.push(GameEvent::Teleported { id, tunnel, exit, exit_face });

        let turns = Face::of(m).quarter_turns_to(exit_face);
        if turns != 0 {
            let rotated = rotate_bindings(self.map.bindings(id), turns);
            self.map.set_bindings(id, rotated);
            self.events.push(GameEvent::Rotated { id, quarter_turns: turns });
        }
        Ok(true)
    }

    /// Is `id` one of the movers on the current recursion path?
    fn is_moving(&self, id: EntityId) -> bool {
        self.path.iter().any(|&(mover, _, _)| mover == id)
    }

    fn commit(&mut self, id: EntityId, to: GridPosition) {
        let from = self.map.position(id);
        self.map.set_position(id, to);
        self.events.push(GameEvent::Stepped { id, item: self.map.item_type(id), from, to });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tunnel::{TunnelBindings, TunnelId};

    /// w×h floor with the player on `player`.
    fn board(w: i32, h: i32, player: (i32, i32)) -> (Tilemap, EntityId) {
        let mut map = Tilemap::new();
        for y in 0..h {
            for x in 0..w {
                map.add_entity(ItemType::Floor, x, y);
            }
        }
        let p = map.add_entity(ItemType::Player, player.0, player.1);
        (map, p)
    }

    fn block(map: &mut Tilemap, x: i32, y: i32, tunnels: &[(Face, u8)]) -> EntityId {
        let id = map.add_entity(ItemType::Block, x, y);
        for &(face, t) in tunnels {
            map.set_tunnel(id, face, Some(TunnelId(t)));
        }
        id
    }

    fn at(x: i32, y: i32) -> GridPosition {
        GridPosition::new(x, y)
    }

    fn snapshot(map: &Tilemap) -> Vec<(EntityId, GridPosition, TunnelBindings)> {
        map.entities().map(|id| (id, map.position(id), map.bindings(id))).collect()
    }

    #[test]
    fn step_onto_floor() {
        let (mut map, p) = board(3, 3, (1, 1));
        let events = map.move_player(Move::RIGHT);
        assert_eq!(map.position(p), at(2, 1));
        assert_eq!(events, vec![GameEvent::Stepped {
            id: p, item: ItemType::Player, from: at(1, 1), to: at(2, 1),
        }]);
    }

    #[test]
    fn boundary_is_a_no_op() {
        let (mut map, _) = board(3, 3, (0, 0));
        block(&mut map, 2, 2, &[]);
        let before = snapshot(&map);
        assert_eq!(map.move_player(Move::LEFT), vec![GameEvent::Bumped]);
        assert_eq!(map.move_player(Move::UP), vec![GameEvent::Bumped]);
        assert_eq!(snapshot(&map), before);
    }

    #[test]
    fn button_only_cell_is_walkable() {
        let mut map = Tilemap::new();
        map.add_entity(ItemType::Floor, 0, 0);
        map.add_entity(ItemType::Button, 1, 0);
        let p = map.add_entity(ItemType::Player, 0, 0);
        map.move_player(Move::RIGHT);
        assert_eq!(map.position(p), at(1, 0));
    }

    #[test]
    fn push_chain_shifts_every_block_once() {
        for k in 1..=3 {
            let (mut map, p) = board(k + 2, 1, (0, 0));
            let chain: Vec<_> = (1..=k).map(|x| block(&mut map, x, 0, &[])).collect();

            map.move_player(Move::RIGHT);
            assert_eq!(map.position(p), at(1, 0));
            for (i, &b) in chain.iter().enumerate() {
                assert_eq!(map.position(b), at(i as i32 + 2, 0), "chain of {k}");
            }

            // Last block now sits on the edge: the whole chain is stuck.
            let before = snapshot(&map);
            assert_eq!(map.move_player(Move::RIGHT), vec![GameEvent::Bumped]);
            assert_eq!(snapshot(&map), before);
        }
    }

    #[test]
    fn pushed_block_can_exit_beside_player() {
        let (mut map, p) = board(6, 3, (1, 1));
        let pushed = block(&mut map, 2, 1, &[]);
        block(&mut map, 3, 1, &[(Face::Left, 0)]);
        block(&mut map, 0, 0, &[(Face::Down, 0)]);
        // Pushed block enters tunnel 0 and drops out below (0,0).
        map.move_player(Move::RIGHT);
        assert_eq!(map.position(p), at(2, 1));
        assert_eq!(map.position(pushed), at(0, 1));
    }

    #[test]
    fn player_in_the_way_blocks_a_pushed_block() {
        // (3,1) sits on the right edge, so it cannot be pushed either.
        let (mut map, p) = board(4, 3, (1, 1));
        let pushed = block(&mut map, 2, 1, &[]);
        block(&mut map, 3, 1, &[(Face::Left, 0)]);
        // Exit goes Right from (0,1), straight into the player at (1,1).
        block(&mut map, 0, 1, &[(Face::Right, 0)]);
        let before = snapshot(&map);
        map.move_player(Move::RIGHT);
        assert_eq!(snapshot(&map), before);
        assert_eq!(map.position(pushed), at(2, 1));
        assert_eq!(map.position(p), at(1, 1));
    }

    #[test]
    fn block_exiting_into_its_own_cell_is_pushed_instead() {
        let (mut map, p) = board(4, 4, (0, 1));
        let x = block(&mut map, 1, 1, &[]);
        let y = block(&mut map, 2, 1, &[(Face::Left, 0)]);
        // Exit of tunnel 0 leads Up from (1,2), straight back into x's cell.
        let z = block(&mut map, 1, 2, &[(Face::Up, 0)]);

        let events = map.move_player(Move::RIGHT);

        assert!(!events.iter().any(|e| matches!(e, GameEvent::Teleported { .. })));
        assert_eq!(map.position(p), at(1, 1));
        assert_eq!(map.position(x), at(2, 1));
        assert_eq!(map.position(y), at(3, 1));
        assert_eq!(map.position(z), at(1, 2));
    }

    #[test]
    fn tunnel_exit_cannot_land_on_a_block_still_in_the_chain() {
        let (mut map, p) = board(5, 3, (0, 1));
        let a = block(&mut map, 1, 1, &[]);
        let b = block(&mut map, 2, 1, &[]);
        let c = block(&mut map, 3, 1, &[(Face::Left, 0)]);
        // b would come out of (1,2) heading Up, into a's cell.
        block(&mut map, 1, 2, &[(Face::Up, 0)]);

        map.move_player(Move::RIGHT);

        assert_eq!(map.position(p), at(1, 1));
        assert_eq!(map.position(a), at(2, 1));
        assert_eq!(map.position(b), at(3, 1));
        assert_eq!(map.position(c), at(4, 1));
    }

    #[test]
    fn player_exiting_into_its_own_cell_pushes_instead() {
        let (mut map, p) = board(5, 1, (1, 0));
        let a = block(&mut map, 2, 0, &[(Face::Left, 0)]);
        block(&mut map, 0, 0, &[(Face::Right, 0)]);
        map.move_player(Move::RIGHT);
        assert_eq!(map.position(p), at(2, 0));
        assert_eq!(map.position(a), at(3, 0));
    }

    #[test]
    fn tunnel_redirects_to_exit_face() {
        let (mut map, p) = board(10, 10, (2, 1));
        let a = block(&mut map, 3, 1, &[(Face::Left, 7)]);
        let b = block(&mut map, 4, 2, &[(Face::Left, 7)]);

        let events = map.move_player(Move::RIGHT);

        assert_eq!(map.position(p), at(3, 2));
        assert_eq!(map.position(a), at(3, 1));
        assert_eq!(map.position(b), at(4, 2));
        assert!(events.contains(&GameEvent::Teleported {
            id: p, tunnel: TunnelId(7), exit: b, exit_face: Face::Left,
        }));
    }

    #[test]
    fn tunnel_on_other_face_does_not_trigger() {
        let (mut map, p) = board(10, 10, (2, 1));
        let a = block(&mut map, 3, 1, &[(Face::Right, 7)]);
        block(&mut map, 4, 2, &[(Face::Left, 7)]);
        map.move_player(Move::RIGHT);
        assert_eq!(map.position(p), at(3, 1));
        assert_eq!(map.position(a), at(4, 1));
    }

    #[test]
    fn covered_button_turns_teleport_into_push() {
        let (mut map, p) = board(10, 10, (2, 1));
        let btn = map.add_entity(ItemType::Button, 2, 1);
        map.bind_button(btn, Some(TunnelId(7)));
        let a = block(&mut map, 3, 1, &[(Face::Left, 7)]);
        block(&mut map, 4, 2, &[(Face::Left, 7)]);

        let events = map.move_player(Move::RIGHT);

        assert_eq!(map.position(p), at(3, 1));
        assert_eq!(map.position(a), at(4, 1));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::Teleported { .. })));
    }

    #[test]
    fn uncovered_button_leaves_tunnel_open() {
        let (mut map, p) = board(10, 10, (0, 0));
        let btn = map.add_entity(ItemType::Button, 3, 3);
        map.bind_button(btn, Some(TunnelId(0)));
        block(&mut map, 3, 1, &[(Face::Left, 0)]);
        block(&mut map, 4, 2, &[(Face::Left, 0)]);

        map.move_player(Move::DOWN);
        map.move_player(Move::RIGHT);
        map.move_player(Move::RIGHT);
        assert_eq!(map.position(p), at(2, 1));
        map.move_player(Move::RIGHT);
        assert_eq!(map.position(p), at(3, 2));
    }

    #[test]
    fn blocked_exit_falls_back_to_push() {
        let (mut map, p) = board(10, 10, (2, 1));
        let a = block(&mut map, 3, 1, &[(Face::Left, 7)]);
        // Exit face points off the map.
        block(&mut map, 0, 5, &[(Face::Left, 7)]);
        map.move_player(Move::RIGHT);
        assert_eq!(map.position(p), at(3, 1));
        assert_eq!(map.position(a), at(4, 1));
    }

    #[test]
    fn pushed_block_rotates_its_own_tunnels() {
        let (mut map, p) = board(10, 10, (1, 1));
        let mover = block(&mut map, 2, 1, &[(Face::Up, 5)]);
        block(&mut map, 3, 1, &[(Face::Left, 1)]);
        block(&mut map, 6, 4, &[(Face::Down, 1)]);
        block(&mut map, 8, 8, &[(Face::Up, 5)]);

        // Heading Right, leaving Down: one clockwise quarter turn.
        let events = map.move_player(Move::RIGHT);
        assert_eq!(map.position(p), at(2, 1));
        assert_eq!(map.position(mover), at(6, 5));
        assert!(events.contains(&GameEvent::Rotated { id: mover, quarter_turns: 1 }));
        let b = map.bindings(mover);
        assert_eq!(binding(&b, Face::Up), None);
        assert_eq!(binding(&b, Face::Right), Some(TunnelId(5)));

        // A westward push now strikes the rotated Right-face tunnel.
        map.set_position(p, at(7, 5));
        map.move_player(Move::LEFT);
        assert_eq!(map.position(p), at(8, 7));
        assert_eq!(map.position(mover), at(6, 5));
    }

    #[test]
    fn straight_through_tunnel_keeps_bindings() {
        let (mut map, _) = board(10, 3, (0, 1));
        let mover = block(&mut map, 1, 1, &[(Face::Up, 3)]);
        block(&mut map, 2, 1, &[(Face::Left, 1)]);
        block(&mut map, 6, 1, &[(Face::Right, 1)]);
        block(&mut map, 9, 0, &[(Face::Down, 3)]);
        let events = map.move_player(Move::RIGHT);
        assert_eq!(map.position(mover), at(7, 1));
        assert_eq!(binding(&map.bindings(mover), Face::Up), Some(TunnelId(3)));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::Rotated { .. })));
    }

    #[test]
    fn lone_tunnel_aborts_without_change() {
        let (mut map, _) = board(5, 5, (0, 0));
        let lone = block(&mut map, 1, 0, &[(Face::Left, 9)]);
        let before = snapshot(&map);
        assert_eq!(map.move_player(Move::RIGHT), vec![GameEvent::Aborted {
            reason: ResolveError::NoPairedTunnel { entity: lone, face: Face::Left, tunnel: TunnelId(9) },
        }]);
        assert_eq!(snapshot(&map), before);
    }

    #[test]
    fn tunnel_loop_aborts_without_change() {
        // The pushed block's own Right face is the exit of the tunnel it
        // runs into, so it would re-enter the same tunnel forever.
        let (mut map, _) = board(6, 1, (1, 0));
        let looping = block(&mut map, 2, 0, &[(Face::Right, 0)]);
        block(&mut map, 3, 0, &[(Face::Left, 0)]);
        let before = snapshot(&map);
        assert_eq!(map.move_player(Move::RIGHT), vec![GameEvent::Aborted {
            reason: ResolveError::TunnelLoop { entity: looping, from: at(2, 0) },
        }]);
        assert_eq!(snapshot(&map), before);
    }

    #[test]
    fn tunnel_through_one_block_passes_across_it() {
        let (mut map, p) = board(6, 1, (1, 0));
        let x = block(&mut map, 2, 0, &[(Face::Left, 0), (Face::Right, 0)]);
        map.move_player(Move::RIGHT);
        assert_eq!(map.position(p), at(3, 0));
        assert_eq!(map.position(x), at(2, 0));
    }

    #[test]
    fn depth_limit_aborts_long_chains() {
        let (map, _) = board(8, 1, (0, 0));
        let mut map = map.with_depth_limit(3);
        for x in 1..=4 {
            block(&mut map, x, 0, &[]);
        }
        let before = snapshot(&map);
        assert_eq!(map.move_player(Move::RIGHT), vec![GameEvent::Aborted {
            reason: ResolveError::DepthExceeded { limit: 3 },
        }]);
        assert_eq!(snapshot(&map), before);
    }
}
