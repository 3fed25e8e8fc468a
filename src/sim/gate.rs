/// Button gating for tunnels.
///
/// A tunnel is open unless one of its buttons is covered. Standing on a
/// button closes the tunnel; stepping off reopens it.

use crate::domain::item::{GridPosition, ItemType};
use crate::domain::tunnel::TunnelId;
use super::tilemap::Tilemap;

pub fn is_activated(map: &Tilemap, tunnel: TunnelId) -> bool {
    map.entities_of(ItemType::Button)
        .filter(|&btn| map.button_tunnel(btn) == Some(tunnel))
        .all(|btn| !is_covered(map, map.position(btn)))
}

fn is_covered(map: &Tilemap, at: GridPosition) -> bool {
    map.find(ItemType::Player, at).is_some() || map.find(ItemType::Block, at).is_some()
}
