/// Events emitted while resolving a turn.
/// The presentation layer consumes these for sound and status messages.

use crate::domain::error::ResolveError;
use crate::domain::face::Face;
use crate::domain::item::{EntityId, GridPosition, ItemType};
use crate::domain::tunnel::TunnelId;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    /// An entity committed a one-cell step (possibly out of a tunnel exit).
    Stepped { id: EntityId, item: ItemType, from: GridPosition, to: GridPosition },
    /// An entity went into `tunnel` and came out of `exit`'s `exit_face`.
    Teleported { id: EntityId, tunnel: TunnelId, exit: EntityId, exit_face: Face },
    /// An entity's own tunnel bindings were rotated after a teleport.
    Rotated { id: EntityId, quarter_turns: usize },
    /// The player's move had no effect.
    Bumped,
    /// The turn was abandoned; nothing moved.
    Aborted { reason: ResolveError },
}
