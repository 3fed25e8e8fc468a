/// Tilemap: the entity arena plus the grid index over it.
///
/// ## Arena
///
/// Every per-entity table is indexed by `EntityId`. Entities are never
/// deleted: `remove_entity` flips the type to `Empty` and every query skips
/// `Empty`, so ids held elsewhere stay valid for the rest of the session.
///
/// ## Queries
///
///   - `is_empty(cell)`     : nothing live registered at `cell` (off the map)
///   - `find(type, cell)`   : lowest id of exactly that type at `cell`
///   - `find_blocking(cell)`: lowest id at `cell` that is not floor
///
/// Mutations go through `add_entity` / `remove_entity` / `set_position`
/// so the grid index and render transforms never drift from the tables.

use tracing::{debug, warn};

use crate::domain::affine::Affine;
use crate::domain::error::ResolveError;
use crate::domain::face::{Face, Move};
use crate::domain::item::{EntityId, GridPosition, ItemType};
use crate::domain::tunnel::{TunnelBindings, TunnelId, NO_TUNNELS};
use super::event::GameEvent;
use super::gate;
use super::grid::GridIndex;
use super::resolver::Resolver;
use super::tunnels;

/// Players are drawn slightly smaller than a tile.
pub const PLAYER_SCALE: f32 = 0.8;

pub const DEFAULT_DEPTH_LIMIT: usize = 256;

#[derive(Clone, Debug)]
pub struct Tilemap {
    types: Vec<ItemType>,
    positions: Vec<GridPosition>,
    tunnels: Vec<TunnelBindings>,
    buttons: Vec<Option<TunnelId>>,
    transforms: Vec<Affine>,
    grid: GridIndex,
    player: Option<EntityId>,
    depth_limit: usize,
}

// ── Construction / mutation ──

impl Tilemap {
    pub fn new() -> Self {
        Tilemap {
            types: vec![],
            positions: vec![],
            tunnels: vec![],
            buttons: vec![],
            transforms: vec![],
            grid: GridIndex::new(),
            player: None,
            depth_limit: DEFAULT_DEPTH_LIMIT,
        }
    }

    pub fn with_depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = limit.max(1);
        self
    }

    pub fn depth_limit(&self) -> usize {
        self.depth_limit
    }

    /// Register a new entity. Adding a player retires the previous one,
    /// so there is always at most one.
    pub fn add_entity(&mut self, item: ItemType, x: i32, y: i32) -> EntityId {
        let id = EntityId(self.types.len());
        let at = GridPosition::new(x, y);
        let scale = if item == ItemType::Player { PLAYER_SCALE } else { 1.0 };

        self.types.push(item);
        self.positions.push(at);
        self.tunnels.push(NO_TUNNELS);
        self.buttons.push(None);
        self.transforms.push(Affine::for_cell(x, y, scale));
        self.grid.insert(id, at);

        if item == ItemType::Player {
            if let Some(old) = self.player.replace(id) {
                debug!(old = %old, new = %id, "replacing player");
                self.types[old.index()] = ItemType::Empty;
            }
        }
        id
    }

    /// Flip an entity to `Empty`. The player cannot be removed.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        match self.types.get(id.index()) {
            Some(ItemType::Player) | Some(ItemType::Empty) | None => false,
            Some(_) => {
                self.types[id.index()] = ItemType::Empty;
                true
            }
        }
    }

    /// Move an entity to `at` and refresh its render transform.
    pub fn set_position(&mut self, id: EntityId, at: GridPosition) {
        let from = self.positions[id.index()];
        self.grid.relocate(id, from, at);
        self.positions[id.index()] = at;
        self.transforms[id.index()] = self.transforms[id.index()].moved_to(at.x, at.y);
    }

    /// Bind or clear a tunnel on one face. Only blocks carry tunnels.
    pub fn set_tunnel(&mut self, id: EntityId, face: Face, tunnel: Option<TunnelId>) -> bool {
        if self.item_type(id) != ItemType::Block { return false; }
        self.tunnels[id.index()][face.index()] = tunnel;
        true
    }

    pub fn set_bindings(&mut self, id: EntityId, bindings: TunnelBindings) {
        self.tunnels[id.index()] = bindings;
    }

    /// Bind a button to the tunnel it gates.
    pub fn bind_button(&mut self, id: EntityId, tunnel: Option<TunnelId>) -> bool {
        if self.item_type(id) != ItemType::Button { return false; }
        self.buttons[id.index()] = tunnel;
        true
    }
}

impl Default for Tilemap {
    fn default() -> Self {
        Tilemap::new()
    }
}

// ── Per-entity reads ──

impl Tilemap {
    pub fn player(&self) -> Option<EntityId> {
        self.player
    }

    pub fn item_type(&self, id: EntityId) -> ItemType {
        self.types.get(id.index()).copied().unwrap_or(ItemType::Empty)
    }

    pub fn position(&self, id: EntityId) -> GridPosition {
        self.positions[id.index()]
    }

    pub fn bindings(&self, id: EntityId) -> TunnelBindings {
        self.tunnels[id.index()]
    }

    pub fn button_tunnel(&self, id: EntityId) -> Option<TunnelId> {
        self.buttons[id.index()]
    }

    pub fn transform(&self, id: EntityId) -> Affine {
        self.transforms[id.index()]
    }

    /// Live entity ids in ascending order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.types.iter()
            .enumerate()
            .filter(|(_, t)| t.is_live())
            .map(|(i, _)| EntityId(i))
    }

    /// Live entities of one type, ascending.
    pub fn entities_of(&self, item: ItemType) -> impl Iterator<Item = EntityId> + '_ {
        self.entities().filter(move |&id| self.item_type(id) == item)
    }

    /// Bounding box of all live entities: (min, max) inclusive.
    pub fn bounds(&self) -> Option<(GridPosition, GridPosition)> {
        let mut it = self.entities().map(|id| self.position(id));
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), p| {
            (
                GridPosition::new(lo.x.min(p.x), lo.y.min(p.y)),
                GridPosition::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        }))
    }
}

// ── Grid queries ──

impl Tilemap {
    fn live_at(&self, at: GridPosition) -> impl Iterator<Item = EntityId> + '_ {
        self.grid.ids_at(at).iter().copied().filter(|&id| self.item_type(id).is_live())
    }

    /// True iff nothing live is registered at `at`.
    pub fn is_empty(&self, at: GridPosition) -> bool {
        self.live_at(at).next().is_none()
    }

    pub fn find(&self, item: ItemType, at: GridPosition) -> Option<EntityId> {
        self.live_at(at).find(|&id| self.item_type(id) == item)
    }

    pub fn find_blocking(&self, at: GridPosition) -> Option<EntityId> {
        self.live_at(at).find(|&id| self.item_type(id).is_blocking())
    }
}

// ── Tunnels / gate / movement ──

impl Tilemap {
    pub fn find_paired(&self, id: EntityId, face: Face) -> Result<Option<(EntityId, Face)>, ResolveError> {
        tunnels::find_paired(self, id, face)
    }

    pub fn unpaired_tunnels(&self) -> Vec<TunnelId> {
        tunnels::unpaired_tunnels(self)
    }

    pub fn is_activated(&self, tunnel: TunnelId) -> bool {
        gate::is_activated(self, tunnel)
    }

    /// Resolve one player turn. A blocked or aborted move is a no-op;
    /// the returned events say what happened.
    pub fn move_player(&mut self, m: Move) -> Vec<GameEvent> {
        let player = match self.player {
            Some(p) => p,
            None => return vec![GameEvent::Bumped],
        };
        let from = self.position(player);

        let mut resolver = Resolver::new(self);
        let result = resolver.try_move(player, m, from);
        let mut events = resolver.into_events();

        match result {
            Ok(true) => {}
            Ok(false) => events.push(GameEvent::Bumped),
            Err(e) => {
                warn!(error = %e, "turn aborted");
                events.push(GameEvent::Aborted { reason: e });
            }
        }
        events
    }
}
