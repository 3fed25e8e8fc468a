/// Turn and edit dispatch: the only places the live board changes.
///
///   - `player_turn`: one move in Playing phase; counts moves and sets
///     the status message for teleports and aborted turns.
///   - `edit`       : one editor command in Editing phase.
///
/// Leaving the editor makes the edited board the new restart point.

use crate::domain::error::ResolveError;
use crate::domain::face::Move;
use crate::domain::item::ItemType;
use super::editor::{self, EditCommand};
use super::event::GameEvent;
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Playing
// ══════════════════════════════════════════════════════════════

pub fn player_turn(world: &mut WorldState, m: Move) -> Vec<GameEvent> {
    if world.phase != Phase::Playing { return vec![]; }

    let events = world.map.move_player(m);
    let player = world.map.player();

    for event in &events {
        match event {
            GameEvent::Stepped { id, .. } if Some(*id) == player => world.moves += 1,
            GameEvent::Teleported { id, tunnel, .. } if Some(*id) == player => {
                world.set_message(&format!("Through tunnel {}", tunnel), 20);
            }
            GameEvent::Aborted { reason } => {
                world.set_message(&abort_message(reason), 60);
            }
            _ => {}
        }
    }

    events
}

fn abort_message(reason: &ResolveError) -> String {
    match reason {
        ResolveError::NoPairedTunnel { tunnel, .. } => {
            format!("Move aborted: tunnel {} has no exit", tunnel)
        }
        ResolveError::TunnelLoop { .. } => "Move aborted: tunnels loop back on themselves".into(),
        ResolveError::DepthExceeded { limit } => {
            format!("Move aborted: more than {} pushes in one turn", limit)
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Editing
// ══════════════════════════════════════════════════════════════

/// Apply one editor command. Returns whether the board or cursor changed.
pub fn edit(world: &mut WorldState, cmd: EditCommand) -> bool {
    if world.phase != Phase::Editing { return false; }

    let ed = &mut world.editor;
    let map = &mut world.map;
    let changed = match cmd {
        EditCommand::MoveCursor(m) => {
            let to = ed.cursor.offset(m);
            ed.move_cursor(map, to)
        }
        EditCommand::CursorTo(to) => ed.move_cursor(map, to),
        EditCommand::SelectFace(face) => {
            ed.face = face;
            true
        }
        EditCommand::CycleFace => {
            ed.cycle_face();
            true
        }
        EditCommand::Place(item) => ed.place(map, item).is_some(),
        EditCommand::Remove => ed.remove(map),
        EditCommand::Grab => ed.grab(map),
        EditCommand::Tunnel(t) => ed.apply_tunnel(map, t),
    };

    let touched_board = matches!(
        cmd,
        EditCommand::Place(_) | EditCommand::Remove | EditCommand::Tunnel(_)
    );
    if !changed {
        let why = match cmd {
            EditCommand::Place(ItemType::Floor) => "There is already a floor here",
            EditCommand::Place(_) => "Cannot place here",
            EditCommand::Remove => "Nothing to remove",
            EditCommand::Grab => "Nothing to pick up",
            EditCommand::Tunnel(_) => "No block or button under the cursor",
            _ => "Cannot move there",
        };
        world.set_message(why, 30);
    } else if touched_board {
        match editor::unpaired_report(&world.map) {
            Some(report) => world.set_message(&report, 60),
            None => {
                world.message.clear();
                world.message_timer = 0;
            }
        }
    }
    changed
}

/// Enter or leave the editor. On leaving, the edited board becomes the
/// base that restarts return to.
pub fn toggle_editor(world: &mut WorldState) {
    world.toggle_editor();
    match world.phase {
        Phase::Editing => {
            if let Some(p) = world.map.player() {
                world.editor.cursor = world.map.position(p);
            }
            world.set_message("Editor", 30);
        }
        Phase::Playing => {
            world.base = world.map.clone();
            world.moves = 0;
            match editor::unpaired_report(&world.map) {
                Some(report) => world.set_message(&report, 60),
                None => world.set_message("Playing", 30),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::face::Face;
    use crate::domain::item::GridPosition;
    use crate::domain::tunnel::TunnelId;
    use crate::sim::level::{load_level, parse_level_file};

    fn world_from(text: &str) -> WorldState {
        let def = parse_level_file(text).unwrap();
        let mut world = WorldState::new(vec![def], 256);
        load_level(&mut world, 0).unwrap();
        world
    }

    #[test]
    fn moves_counted_only_when_player_advances() {
        let mut world = world_from("# R\nP.\n");
        player_turn(&mut world, Move::RIGHT);
        assert_eq!(world.moves, 1);
        let events = player_turn(&mut world, Move::RIGHT);
        assert_eq!(events, vec![GameEvent::Bumped]);
        assert_eq!(world.moves, 1);
    }

    #[test]
    fn crossing_room_teleports_and_reports() {
        let mut world = world_from(
            "# R\n@ 3,1 L 0\n@ 4,2 L 0\n! 3,3 0\n.....\n.P.#.\n....#\n..._.\n",
        );
        player_turn(&mut world, Move::RIGHT);
        let events = player_turn(&mut world, Move::RIGHT);
        assert!(events.iter().any(|e| matches!(e, GameEvent::Teleported { .. })));
        let p = world.map.player().unwrap();
        assert_eq!(world.map.position(p), GridPosition::new(3, 2));
        assert_eq!(world.moves, 2);
        assert!(world.message.contains("tunnel 0"));
    }

    #[test]
    fn aborted_turn_names_the_reason() {
        let mut world = world_from("# R\nP#.\n");
        let b = world.map.find(ItemType::Block, GridPosition::new(1, 0)).unwrap();
        world.map.set_tunnel(b, Face::Left, Some(TunnelId(4)));
        let events = player_turn(&mut world, Move::RIGHT);
        assert!(matches!(events.last(), Some(GameEvent::Aborted { .. })));
        assert_eq!(world.message, "Move aborted: tunnel 4 has no exit");
        assert_eq!(world.moves, 0);

        let def = parse_level_file("# R\nP##.\n").unwrap();
        let mut world = WorldState::new(vec![def], 2);
        load_level(&mut world, 0).unwrap();
        player_turn(&mut world, Move::RIGHT);
        assert_eq!(world.message, "Move aborted: more than 2 pushes in one turn");
    }

    #[test]
    fn turns_ignored_while_editing() {
        let mut world = world_from("# R\nP.\n");
        toggle_editor(&mut world);
        assert!(player_turn(&mut world, Move::RIGHT).is_empty());
        assert_eq!(world.moves, 0);
    }

    #[test]
    fn restart_returns_to_loaded_board() {
        let mut world = world_from("# R\nP..\n");
        player_turn(&mut world, Move::RIGHT);
        world.restart_level();
        let p = world.map.player().unwrap();
        assert_eq!(world.map.position(p), GridPosition::new(0, 0));
        assert_eq!(world.moves, 0);
    }

    #[test]
    fn edits_become_the_restart_point() {
        let mut world = world_from("# R\nP..\n");
        toggle_editor(&mut world);
        assert_eq!(world.editor.cursor, GridPosition::new(0, 0));
        assert!(edit(&mut world, EditCommand::MoveCursor(Move::RIGHT)));
        assert!(edit(&mut world, EditCommand::MoveCursor(Move::RIGHT)));
        assert!(edit(&mut world, EditCommand::Place(ItemType::Block)));
        toggle_editor(&mut world);
        assert_eq!(world.phase, Phase::Playing);

        player_turn(&mut world, Move::RIGHT);
        world.restart_level();
        assert!(world.map.find(ItemType::Block, GridPosition::new(2, 0)).is_some());
    }

    #[test]
    fn single_faced_tunnel_is_reported_while_editing() {
        let mut world = world_from("# R\nP.#\n");
        toggle_editor(&mut world);
        edit(&mut world, EditCommand::CursorTo(GridPosition::new(2, 0)));
        edit(&mut world, EditCommand::SelectFace(Face::Left));
        assert!(edit(&mut world, EditCommand::Tunnel(Some(TunnelId(1)))));
        assert_eq!(world.message, "Unpaired tunnels: 1");

        edit(&mut world, EditCommand::SelectFace(Face::Right));
        assert!(edit(&mut world, EditCommand::Tunnel(Some(TunnelId(1)))));
        assert!(world.message.is_empty());
    }

    #[test]
    fn refused_edit_leaves_a_message() {
        let mut world = world_from("# R\nP.\n");
        toggle_editor(&mut world);
        edit(&mut world, EditCommand::CursorTo(GridPosition::new(7, 7)));
        assert!(!edit(&mut world, EditCommand::Place(ItemType::Block)));
        assert_eq!(world.message, "Cannot place here");
    }
}
