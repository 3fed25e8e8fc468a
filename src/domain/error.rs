/// Error types for moves, resolution and level loading.

use std::path::PathBuf;

use thiserror::Error;

use super::face::Face;
use super::item::{EntityId, GridPosition};
use super::tunnel::TunnelId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("invalid move ({dx}, {dy}): direction must be one of the four unit vectors")]
    InvalidMove { dx: i32, dy: i32 },
}

/// Aborts a turn. The board is left exactly as it was before the turn.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("tunnel {tunnel} on {face:?} face of entity {entity} has no paired face")]
    NoPairedTunnel { entity: EntityId, face: Face, tunnel: TunnelId },

    #[error("move resolution exceeded depth limit of {limit}")]
    DepthExceeded { limit: usize },

    #[error("entity {entity} re-entered the same move from {from} through a tunnel loop")]
    TunnelLoop { entity: EntityId, from: GridPosition },
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("could not read level {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("level '{name}' has no player start")]
    NoPlayer { name: String },

    #[error("level '{name}' has {count} player starts, expected one")]
    MultiplePlayers { name: String, count: usize },

    #[error("line {line}: malformed directive '{text}'")]
    BadDirective { line: usize, text: String },

    #[error("line {line}: unknown face '{face}' (use U, R, D or L)")]
    UnknownFace { line: usize, face: String },

    #[error("line {line}: no {expected} at ({x}, {y})")]
    MissingItem { line: usize, expected: &'static str, x: i32, y: i32 },

    #[error("tunnel {tunnel} is bound on a single face")]
    UnpairedTunnel { tunnel: TunnelId },

    #[error("level is empty")]
    Empty,
}
