/// Tunnel pairing over the tilemap's blocks.
///
/// Pairing is by equal id and is not required to be exactly one-to-one:
/// the exit is the first other face carrying the same id, scanning blocks
/// by ascending id and faces Up, Right, Down, Left.

use std::collections::BTreeMap;

use crate::domain::error::ResolveError;
use crate::domain::face::Face;
use crate::domain::item::{EntityId, ItemType};
use crate::domain::tunnel::{binding, TunnelId};
use super::tilemap::Tilemap;

/// Exit face for a tunnel entered through (`id`, `face`).
///
/// `Ok(None)` when that face has no tunnel. A bound id with no other face
/// is malformed level data and aborts the turn.
pub fn find_paired(map: &Tilemap, id: EntityId, face: Face) -> Result<Option<(EntityId, Face)>, ResolveError> {
    let tunnel = match binding(&map.bindings(id), face) {
        Some(t) => t,
        None => return Ok(None),
    };

    for other in map.entities_of(ItemType::Block) {
        let b = map.bindings(other);
        for other_face in Face::ALL {
            if other == id && other_face == face { continue; }
            if binding(&b, other_face) == Some(tunnel) {
                return Ok(Some((other, other_face)));
            }
        }
    }

    Err(ResolveError::NoPairedTunnel { entity: id, face, tunnel })
}

/// Tunnel ids bound on fewer than two block faces, ascending.
pub fn unpaired_tunnels(map: &Tilemap) -> Vec<TunnelId> {
    let mut counts: BTreeMap<TunnelId, usize> = BTreeMap::new();
    for id in map.entities_of(ItemType::Block) {
        for t in map.bindings(id).iter().flatten() {
            *counts.entry(*t).or_default() += 1;
        }
    }
    counts.into_iter().filter(|&(_, n)| n < 2).map(|(t, _)| t).collect()
}
