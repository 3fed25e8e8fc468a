/// Sparse cell → occupants index.
///
/// Ids inside a cell are kept sorted so "first entity at cell" means the
/// lowest id, independent of the order entities arrived there. Type
/// filtering happens in `Tilemap`, which owns the type table.

use std::collections::HashMap;

use crate::domain::item::{EntityId, GridPosition};

#[derive(Clone, Debug, Default)]
pub struct GridIndex {
    cells: HashMap<GridPosition, Vec<EntityId>>,
}

impl GridIndex {
    pub fn new() -> Self {
        GridIndex { cells: HashMap::new() }
    }

    pub fn insert(&mut self, id: EntityId, at: GridPosition) {
        let ids = self.cells.entry(at).or_default();
        if let Err(pos) = ids.binary_search(&id) {
            ids.insert(pos, id);
        }
    }

    pub fn remove(&mut self, id: EntityId, at: GridPosition) {
        if let Some(ids) = self.cells.get_mut(&at) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.cells.remove(&at);
            }
        }
    }

    pub fn relocate(&mut self, id: EntityId, from: GridPosition, to: GridPosition) {
        if from == to { return; }
        self.remove(id, from);
        self.insert(id, to);
    }

    /// All ids registered at `at`, lowest first. Includes removed entities.
    pub fn ids_at(&self, at: GridPosition) -> &[EntityId] {
        self.cells.get(&at).map(Vec::as_slice).unwrap_or(&[])
    }
}
