/// Scene composition: turns a board into an ordered list of draw commands.
///
/// Floors are emitted first so everything else lands on top of them. Each
/// tunnel-bearing face of a block adds a `Segment` along that edge, in
/// unit-square coordinates run through the block's transform.

use crate::domain::affine::Affine;
use crate::domain::face::Face;
use crate::domain::item::ItemType;
use crate::domain::tunnel::TunnelId;
use super::tilemap::Tilemap;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn from_hex(hex: u32) -> Self {
        Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    /// Halve every channel. Used for closed tunnels.
    pub fn dimmed(self) -> Self {
        Rgb(self.0 / 2, self.1 / 2, self.2 / 2)
    }
}

const TUNNEL_PALETTE: [u32; 6] = [0xff595e, 0xffca3a, 0x8ac926, 0x1982c4, 0x6a4c93, 0xf28482];

pub fn tunnel_color(tunnel: TunnelId) -> Rgb {
    Rgb::from_hex(TUNNEL_PALETTE[tunnel.0 as usize % TUNNEL_PALETTE.len()])
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum DrawCommand {
    Sprite { item: ItemType, transform: Affine },
    /// A tunnel edge. `active` is false while a button holds the tunnel shut.
    Segment { from: (f32, f32), to: (f32, f32), face: Face, tunnel: TunnelId, color: Rgb, active: bool },
}

/// Edge of the unit square for each face, walked clockwise.
pub fn face_segment(face: Face) -> ((f32, f32), (f32, f32)) {
    match face {
        Face::Up => ((0.0, 0.0), (1.0, 0.0)),
        Face::Right => ((1.0, 0.0), (1.0, 1.0)),
        Face::Down => ((1.0, 1.0), (0.0, 1.0)),
        Face::Left => ((0.0, 1.0), (0.0, 0.0)),
    }
}

pub fn compose(map: &Tilemap) -> Vec<DrawCommand> {
    let mut out = Vec::new();

    for id in map.entities_of(ItemType::Floor) {
        out.push(DrawCommand::Sprite { item: ItemType::Floor, transform: map.transform(id) });
    }

    for id in map.entities().filter(|&id| map.item_type(id) != ItemType::Floor) {
        let item = map.item_type(id);
        let transform = map.transform(id);
        out.push(DrawCommand::Sprite { item, transform });

        if item != ItemType::Block {
            continue;
        }
        for face in Face::ALL {
            if let Some(tunnel) = map.bindings(id)[face.index()] {
                let (a, b) = face_segment(face);
                out.push(DrawCommand::Segment {
                    from: transform.apply(a),
                    to: transform.apply(b),
                    face,
                    tunnel,
                    color: tunnel_color(tunnel),
                    active: map.is_activated(tunnel),
                });
            }
        }
    }

    out
}
