/// Uniform-scale + translation transform, in world units (one tile = `TILE_SIZE`).

pub const TILE_SIZE: f32 = 1.0;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Affine {
    pub scale: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Affine {
    pub const IDENTITY: Affine = Affine { scale: 1.0, tx: 0.0, ty: 0.0 };

    /// Tile-space unit square scaled by `scale` and placed on cell (x, y).
    pub fn for_cell(x: i32, y: i32, scale: f32) -> Self {
        Affine {
            scale: TILE_SIZE * scale,
            tx: TILE_SIZE * x as f32,
            ty: TILE_SIZE * y as f32,
        }
    }

    /// Keep the scale, move the origin to cell (x, y).
    pub fn moved_to(self, x: i32, y: i32) -> Self {
        Affine { tx: TILE_SIZE * x as f32, ty: TILE_SIZE * y as f32, ..self }
    }

    pub fn apply(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (x * self.scale + self.tx, y * self.scale + self.ty)
    }
}
