/// Level editor: a cursor over the board plus one selected face.
///
/// Placement rules:
///   - Floor goes anywhere that has no floor yet.
///   - Everything else needs a registered cell, and a cell holds at most
///     one solid (block or player) and one button.
///   - Placing the player moves the existing one.
///
/// Remove takes the block first, then the floor, then the button.

use tracing::debug;

use crate::domain::face::{Face, Move};
use crate::domain::item::{EntityId, GridPosition, ItemType};
use crate::domain::tunnel::TunnelId;
use super::tilemap::Tilemap;

/// One editor action, already decoded from keys or mouse.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EditCommand {
    MoveCursor(Move),
    CursorTo(GridPosition),
    SelectFace(Face),
    CycleFace,
    Place(ItemType),
    Remove,
    /// Pick up the item under the cursor, or drop the one being carried.
    Grab,
    /// Set (or clear) a tunnel on the selected face of the block under the
    /// cursor, or bind the button under the cursor.
    Tunnel(Option<TunnelId>),
}

#[derive(Clone, Debug)]
pub struct Editor {
    pub cursor: GridPosition,
    pub face: Face,
    pub dragging: Option<EntityId>,
}

impl Default for Editor {
    fn default() -> Self {
        Editor::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Editor { cursor: GridPosition::new(0, 0), face: Face::Up, dragging: None }
    }

    pub fn reset(&mut self) {
        *self = Editor::new();
    }

    pub fn stop_drag(&mut self) {
        self.dragging = None;
    }

    pub fn cycle_face(&mut self) {
        self.face = self.face.rotated(1);
    }

    /// Move the cursor; a carried item follows when the target allows it.
    /// Returns false if the carried item could not follow.
    pub fn move_cursor(&mut self, map: &mut Tilemap, to: GridPosition) -> bool {
        if let Some(id) = self.dragging {
            if !can_hold(map, map.item_type(id), to, Some(id)) {
                return false;
            }
            map.set_position(id, to);
        }
        self.cursor = to;
        true
    }

    pub fn place(&self, map: &mut Tilemap, item: ItemType) -> Option<EntityId> {
        let at = self.cursor;
        if item == ItemType::Player {
            if let Some(p) = map.player() {
                if !can_hold(map, item, at, Some(p)) {
                    return None;
                }
                map.set_position(p, at);
                return Some(p);
            }
        }
        if !can_hold(map, item, at, None) {
            return None;
        }
        let id = map.add_entity(item, at.x, at.y);
        debug!(id = %id, ?item, at = %at, "placed");
        Some(id)
    }

    pub fn remove(&mut self, map: &mut Tilemap) -> bool {
        let at = self.cursor;
        let target = map.find(ItemType::Block, at)
            .or_else(|| map.find(ItemType::Floor, at))
            .or_else(|| map.find(ItemType::Button, at));
        match target {
            Some(id) if map.remove_entity(id) => {
                if self.dragging == Some(id) {
                    self.dragging = None;
                }
                debug!(id = %id, at = %at, "removed");
                true
            }
            _ => false,
        }
    }

    /// Toggle carrying. Solids are picked before buttons.
    pub fn grab(&mut self, map: &Tilemap) -> bool {
        if self.dragging.take().is_some() {
            return true;
        }
        let at = self.cursor;
        self.dragging = map.find(ItemType::Block, at)
            .or_else(|| map.find(ItemType::Player, at))
            .or_else(|| map.find(ItemType::Button, at));
        self.dragging.is_some()
    }

    pub fn apply_tunnel(&self, map: &mut Tilemap, tunnel: Option<TunnelId>) -> bool {
        let at = self.cursor;
        if let Some(block) = map.find(ItemType::Block, at) {
            return map.set_tunnel(block, self.face, tunnel);
        }
        if let Some(button) = map.find(ItemType::Button, at) {
            return map.bind_button(button, tunnel);
        }
        false
    }
}

/// Could `item` sit at `at`? `moving` is ignored when checking for
/// another occupant, so an entity never blocks itself.
pub fn can_hold(map: &Tilemap, item: ItemType, at: GridPosition, moving: Option<EntityId>) -> bool {
    let other = |kind: ItemType| map.find(kind, at).map_or(false, |id| Some(id) != moving);
    match item {
        ItemType::Empty => false,
        ItemType::Floor => !other(ItemType::Floor),
        ItemType::Block | ItemType::Player => {
            !map.is_empty(at) && !other(ItemType::Block) && !other(ItemType::Player)
        }
        ItemType::Button => !map.is_empty(at) && !other(ItemType::Button),
    }
}

/// Which face of a cell a point inside it selects. `fx`, `fy` are the
/// fractional position inside the cell, y growing downward. The cell is
/// split along both diagonals.
pub fn face_at(fx: f32, fy: f32) -> Face {
    let bottom_left = fx < fy;
    let top_left = 1.0 - fy > fx;
    match (top_left, bottom_left) {
        (true, false) => Face::Up,
        (false, false) => Face::Right,
        (false, true) => Face::Down,
        (true, true) => Face::Left,
    }
}

/// Status line listing tunnels bound on fewer than two faces.
pub fn unpaired_report(map: &Tilemap) -> Option<String> {
    let unpaired = map.unpaired_tunnels();
    if unpaired.is_empty() {
        return None;
    }
    let ids: Vec<String> = unpaired.iter().map(|t| t.to_string()).collect();
    Some(format!("Unpaired tunnels: {}", ids.join(", ")))
}
