/// Property tests over random boards: random floor holes, blocks, tunnel
/// bindings (paired or not) and buttons, driven by random move sequences.

use std::collections::HashMap;

use proptest::prelude::*;

use crate::domain::face::Face;
use crate::domain::item::{EntityId, GridPosition, ItemType};
use crate::domain::tunnel::{TunnelBindings, TunnelId};
use super::event::GameEvent;
use super::tilemap::Tilemap;

#[derive(Clone, Debug)]
struct Layout {
    w: i32,
    h: i32,
    holes: Vec<(i32, i32)>,
    blocks: Vec<(i32, i32)>,
    /// (block index, face, tunnel, aim). An aimed tunnel goes on the first
    /// face from `face` onward that points at a neighbouring block, so
    /// exits lead straight into other blocks far more often.
    tunnels: Vec<(usize, usize, u8, bool)>,
    buttons: Vec<((i32, i32), u8)>,
}

fn layout() -> impl Strategy<Value = Layout> {
    (3i32..6, 3i32..6)
        .prop_flat_map(|(w, h)| {
            let cell = (0..w, 0..h);
            (
                Just(w),
                Just(h),
                prop::collection::vec(cell.clone(), 0..4),
                prop::collection::vec(cell.clone(), 0..10),
                prop::collection::vec((0usize..10, 0usize..4, 0u8..3, any::<bool>()), 0..10),
                prop::collection::vec((cell, 0u8..3), 0..3),
            )
        })
        .prop_map(|(w, h, holes, blocks, tunnels, buttons)| Layout {
            w, h, holes, blocks, tunnels, buttons,
        })
}

fn moves() -> impl Strategy<Value = Vec<Face>> {
    prop::collection::vec((0usize..4).prop_map(Face::from_index), 1..40)
}

fn build(l: &Layout) -> Tilemap {
    let mut map = Tilemap::new();
    for y in 0..l.h {
        for x in 0..l.w {
            if (x, y) == (0, 0) || !l.holes.contains(&(x, y)) {
                map.add_entity(ItemType::Floor, x, y);
            }
        }
    }
    for &((x, y), t) in &l.buttons {
        let btn = map.add_entity(ItemType::Button, x, y);
        map.bind_button(btn, Some(TunnelId(t)));
    }
    map.add_entity(ItemType::Player, 0, 0);

    let mut blocks: Vec<EntityId> = Vec::new();
    for &(x, y) in &l.blocks {
        let at = GridPosition::new(x, y);
        if map.find(ItemType::Block, at).is_some() || map.find(ItemType::Player, at).is_some() {
            continue;
        }
        blocks.push(map.add_entity(ItemType::Block, x, y));
    }
    if !blocks.is_empty() {
        for &(i, face, t, aim) in &l.tunnels {
            let b = blocks[i % blocks.len()];
            let face = if aim { aimed_face(&map, b, face) } else { Face::from_index(face) };
            map.set_tunnel(b, face, Some(TunnelId(t)));
        }
    }
    map
}

fn aimed_face(map: &Tilemap, block: EntityId, start: usize) -> Face {
    let at = map.position(block);
    (0..4)
        .map(|k| Face::from_index((start + k) % 4))
        .find(|f| map.find(ItemType::Block, at.offset(f.to_move())).is_some())
        .unwrap_or(Face::from_index(start))
}

fn snapshot(map: &Tilemap) -> Vec<(EntityId, ItemType, GridPosition, TunnelBindings)> {
    map.entities()
        .map(|id| (id, map.item_type(id), map.position(id), map.bindings(id)))
        .collect()
}

fn max_solids_per_cell(map: &Tilemap) -> usize {
    let mut counts: HashMap<GridPosition, usize> = HashMap::new();
    for id in map.entities().filter(|&id| map.item_type(id).is_solid()) {
        *counts.entry(map.position(id)).or_default() += 1;
    }
    counts.values().copied().max().unwrap_or(0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1024))]

    #[test]
    fn solids_never_share_a_cell(l in layout(), seq in moves()) {
        let mut map = build(&l);
        let blocks = map.entities_of(ItemType::Block).count();
        prop_assert!(max_solids_per_cell(&map) <= 1);

        for face in seq {
            map.move_player(face.to_move());
            prop_assert!(max_solids_per_cell(&map) <= 1);
            prop_assert_eq!(map.entities_of(ItemType::Player).count(), 1);
            prop_assert_eq!(map.entities_of(ItemType::Block).count(), blocks);
        }
    }

    #[test]
    fn failed_moves_change_nothing(l in layout(), seq in moves()) {
        let mut map = build(&l);
        for face in seq {
            let before = snapshot(&map);
            let events = map.move_player(face.to_move());
            if matches!(events.last(), Some(GameEvent::Bumped) | Some(GameEvent::Aborted { .. })) {
                prop_assert_eq!(snapshot(&map), before);
            }
        }
    }
}
