/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Rasterize the scene's draw commands into the `front` buffer
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// One board tile is `CELL_W` × `CELL_H` terminal cells.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::affine::{Affine, TILE_SIZE};
use crate::domain::face::Face;
use crate::domain::item::{GridPosition, ItemType};
use crate::sim::scene::{self, DrawCommand, Rgb};
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for every empty terminal cell, also used
    /// for `Clear`, so row gaps match cell color on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer; differs from any real cell.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

fn rgb(c: Rgb) -> Color {
    Color::Rgb { r: c.0, g: c.1, b: c.2 }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Recolor the background of a cell, keeping its glyph.
    fn tint_bg(&mut self, x: usize, y: usize, bg: Color) {
        let cell = self.get(x, y);
        self.set(x, y, Cell { bg, ..cell });
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Viewport: board ↔ terminal mapping ──

pub const CELL_W: usize = 4;
pub const CELL_H: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
const MAP_COL: usize = 2;

/// Where the board sits on screen this frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Viewport {
    /// Board cell drawn at the top-left of the map area.
    pub origin: GridPosition,
    /// Board size in cells.
    pub cols: usize,
    pub rows: usize,
}

impl Viewport {
    /// Frame the live board. The editor gets a one-cell margin and always
    /// keeps the cursor in view.
    pub fn frame(world: &WorldState) -> Self {
        let (mut lo, mut hi) = world.map.bounds()
            .unwrap_or((GridPosition::new(0, 0), GridPosition::new(0, 0)));
        if world.phase == Phase::Editing {
            let c = world.editor.cursor;
            lo = GridPosition::new(lo.x.min(c.x) - 1, lo.y.min(c.y) - 1);
            hi = GridPosition::new(hi.x.max(c.x) + 1, hi.y.max(c.y) + 1);
        }
        Viewport {
            origin: lo,
            cols: (hi.x - lo.x + 1) as usize,
            rows: (hi.y - lo.y + 1) as usize,
        }
    }

    /// Board-space point → fractional terminal (col, row).
    fn to_screen(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (
            MAP_COL as f32 + (x / TILE_SIZE - self.origin.x as f32) * CELL_W as f32,
            MAP_ROW as f32 + (y / TILE_SIZE - self.origin.y as f32) * CELL_H as f32,
        )
    }

    /// Top-left terminal cell of board cell (x, y), if it is on screen.
    fn cell_origin(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        let col = MAP_COL as i64 + (x - self.origin.x) as i64 * CELL_W as i64;
        let row = MAP_ROW as i64 + (y - self.origin.y) as i64 * CELL_H as i64;
        if col < 0 || row < 0 { return None; }
        Some((col as usize, row as usize))
    }

    /// Terminal cell → board cell plus the fractional position inside it.
    /// Clicks outside the framed board miss.
    pub fn screen_to_cell(&self, col: u16, row: u16) -> Option<(GridPosition, f32, f32)> {
        let (col, row) = (col as usize, row as usize);
        if col < MAP_COL || row < MAP_ROW { return None; }
        let wx = (col - MAP_COL) as f32 / CELL_W as f32 + 0.5 / CELL_W as f32;
        let wy = (row - MAP_ROW) as f32 / CELL_H as f32 + 0.5 / CELL_H as f32;
        if wx >= self.cols as f32 || wy >= self.rows as f32 { return None; }
        let cell = GridPosition::new(
            self.origin.x + wx.floor() as i32,
            self.origin.y + wy.floor() as i32,
        );
        Some((cell, wx.fract(), wy.fract()))
    }

    fn bottom_row(&self) -> usize {
        MAP_ROW + self.rows * CELL_H
    }
}

// ── Sprite table ──

struct Sprite {
    rows: [&'static str; CELL_H],
    fg: Color,
    /// `None` keeps whatever is underneath.
    bg: Option<Color>,
}

fn sprite_for(item: ItemType) -> Option<Sprite> {
    match item {
        ItemType::Floor => Some(Sprite {
            rows: ["·   ", "    "],
            fg: Color::Rgb { r: 90, g: 90, b: 115 },
            bg: Some(Color::Rgb { r: 48, g: 48, b: 64 }),
        }),
        ItemType::Block => Some(Sprite {
            rows: ["┌──┐", "└──┘"],
            fg: Color::Rgb { r: 245, g: 215, b: 165 },
            bg: Some(Color::Rgb { r: 150, g: 100, b: 50 }),
        }),
        ItemType::Button => Some(Sprite {
            rows: ["    ", "(__)"],
            fg: Color::Rgb { r: 230, g: 200, b: 60 },
            bg: None,
        }),
        ItemType::Player => Some(Sprite {
            rows: [" ◢◣ ", " ◥◤ "],
            fg: Color::Rgb { r: 120, g: 220, b: 255 },
            bg: None,
        }),
        ItemType::Empty => None,
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            viewport: Viewport { origin: GridPosition::new(0, 0), cols: 0, rows: 0 },
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Mapping used by the last rendered frame, for mouse hit-testing.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.compose(world);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the
        // terminal's own default and show seams.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, w: &WorldState) {
        self.front.clear();
        let vp = Viewport::frame(w);
        self.viewport = vp;

        for cmd in scene::compose(&w.map) {
            match cmd {
                DrawCommand::Sprite { item, transform } => self.paint_sprite(&vp, item, transform),
                DrawCommand::Segment { from, to, color, active, .. } => {
                    let c = if active { color } else { color.dimmed() };
                    self.paint_segment(&vp, from, to, rgb(c));
                }
            }
        }

        if w.phase == Phase::Editing {
            self.paint_cursor(&vp, w);
        }

        self.compose_hud(w);
        self.compose_bars(w, vp.bottom_row());
    }

    fn paint_sprite(&mut self, vp: &Viewport, item: ItemType, t: Affine) {
        let sprite = match sprite_for(item) {
            Some(s) => s,
            None => return,
        };
        let (x, y) = ((t.tx / TILE_SIZE).floor() as i32, (t.ty / TILE_SIZE).floor() as i32);
        let (col, row) = match vp.cell_origin(x, y) {
            Some(o) => o,
            None => return,
        };
        // Shrunken sprites leave the outer columns to whatever is below.
        let inset = t.scale < TILE_SIZE;

        for (dy, line) in sprite.rows.iter().enumerate() {
            for (dx, ch) in line.chars().enumerate() {
                if inset && (dx == 0 || dx + 1 == CELL_W) { continue; }
                let under = self.front.get(col + dx, row + dy);
                let bg = sprite.bg.unwrap_or(under.bg);
                let cell = if ch == ' ' && sprite.bg.is_none() {
                    under
                } else {
                    Cell::new(ch, sprite.fg, bg)
                };
                self.front.set(col + dx, row + dy, cell);
            }
        }
    }

    /// Color the terminal cells just inside a tunnel edge. The edge is
    /// walked clockwise, so the block's interior is on its right-hand side.
    fn paint_segment(&mut self, vp: &Viewport, from: (f32, f32), to: (f32, f32), color: Color) {
        let (x0, y0) = vp.to_screen(from);
        let (x1, y1) = vp.to_screen(to);
        let (dx, dy) = (x1 - x0, y1 - y0);
        let steps = dx.abs().max(dy.abs()).round().max(1.0) as usize;
        let len = (dx * dx + dy * dy).sqrt().max(f32::EPSILON);
        let (nx, ny) = (-dy / len * 0.5, dx / len * 0.5);

        for k in 0..steps {
            let t = (k as f32 + 0.5) / steps as f32;
            let (px, py) = (x0 + dx * t + nx, y0 + dy * t + ny);
            if px < 0.0 || py < 0.0 { continue; }
            self.front.tint_bg(px as usize, py as usize, color);
        }
    }

    fn paint_cursor(&mut self, vp: &Viewport, w: &WorldState) {
        let c = w.editor.cursor;
        let (col, row) = match vp.cell_origin(c.x, c.y) {
            Some(o) => o,
            None => return,
        };
        let frame = if w.editor.dragging.is_some() {
            Color::Rgb { r: 255, g: 150, b: 40 }
        } else {
            Color::White
        };
        for dy in 0..CELL_H {
            let bg = self.front.get(col, row + dy).bg;
            self.front.set(col, row + dy, Cell::new('[', frame, bg));
            let bg = self.front.get(col + CELL_W - 1, row + dy).bg;
            self.front.set(col + CELL_W - 1, row + dy, Cell::new(']', frame, bg));
        }

        let marker = Color::Rgb { r: 255, g: 240, b: 120 };
        let (mx, my, ch) = match w.editor.face {
            Face::Up => (col + 1, row, '▔'),
            Face::Right => (col + CELL_W - 2, row, '▕'),
            Face::Down => (col + 1, row + CELL_H - 1, '▁'),
            Face::Left => (col + 1, row + CELL_H - 1, '▏'),
        };
        let bg = self.front.get(mx, my).bg;
        self.front.set(mx, my, Cell::new(ch, marker, bg));
        if matches!(w.editor.face, Face::Up | Face::Down) {
            let bg = self.front.get(mx + 1, my).bg;
            self.front.set(mx + 1, my, Cell::new(ch, marker, bg));
        }
    }

    fn compose_hud(&mut self, w: &WorldState) {
        let hud_bg = Color::Rgb { r: 20, g: 20, b: 60 };
        let mode = match w.phase {
            Phase::Playing => "",
            Phase::Editing => "  [EDIT]",
        };
        let hud = format!(
            " {}   Room {}/{}   Moves {}{} ",
            w.level_name, w.current_level + 1, w.levels.len().max(1), w.moves, mode,
        );
        self.front.fill_row(HUD_ROW, hud_bg);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, hud_bg);
    }

    fn compose_bars(&mut self, w: &WorldState, bottom: usize) {
        let msg_row = bottom + 1;
        if msg_row < self.front.height && !w.message.is_empty() {
            let bar = Color::Rgb { r: 200, g: 180, b: 50 };
            self.front.fill_row(msg_row, bar);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", w.message), Color::Black, bar);
        }

        let help_row = bottom + 3;
        if help_row < self.front.height {
            let help = match w.phase {
                Phase::Playing =>
                    " Arrows/WASD:Move  R:Restart  N/P:Room  Enter:Edit  Q/Esc:Quit",
                Phase::Editing =>
                    " Arrows:Cursor  F/B/U/P:Place  X:Del  G:Grab  Tab:Face  1-4:Tunnel  0:Clear  Enter:Play",
            };
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::face::Move;
    use crate::sim::level::{load_level, parse_level_file};
    use crate::sim::step;

    fn world_from(text: &str) -> WorldState {
        let def = parse_level_file(text).unwrap();
        let mut world = WorldState::new(vec![def], 256);
        load_level(&mut world, 0).unwrap();
        world
    }

    fn composed(world: &WorldState) -> Renderer {
        let mut r = Renderer::new();
        r.front.resize(80, 30);
        r.compose(world);
        r
    }

    #[test]
    fn screen_mapping_round_trips_cells() {
        let vp = Viewport { origin: GridPosition::new(-1, 2), cols: 5, rows: 5 };
        let (col, row) = vp.cell_origin(1, 3).unwrap();
        assert_eq!((col, row), (MAP_COL + 2 * CELL_W, MAP_ROW + CELL_H));
        let (cell, fx, fy) = vp.screen_to_cell(col as u16, row as u16).unwrap();
        assert_eq!(cell, GridPosition::new(1, 3));
        assert!(fx < 0.5 && fy < 0.5);
        let (cell, fx, fy) = vp.screen_to_cell((col + CELL_W - 1) as u16, (row + 1) as u16).unwrap();
        assert_eq!(cell, GridPosition::new(1, 3));
        assert!(fx > 0.5 && fy > 0.5);
        assert!(vp.screen_to_cell(0, 0).is_none());
        assert!(vp.screen_to_cell((MAP_COL + 5 * CELL_W) as u16, row as u16).is_none());
    }

    #[test]
    fn editor_view_keeps_a_margin_and_the_cursor() {
        let mut world = world_from("# R\nP.\n");
        assert_eq!(Viewport::frame(&world).origin, GridPosition::new(0, 0));
        step::toggle_editor(&mut world);
        world.editor.cursor = GridPosition::new(6, 0);
        let vp = Viewport::frame(&world);
        assert_eq!(vp.origin, GridPosition::new(-1, -1));
        assert_eq!(vp.cols, 9);
    }

    #[test]
    fn block_and_player_are_drawn_in_their_tiles() {
        let world = world_from("# R\nP#\n");
        let r = composed(&world);
        let (bc, br) = r.viewport.cell_origin(1, 0).unwrap();
        assert_eq!(r.front.get(bc, br).ch, '┌');
        let (pc, pr) = r.viewport.cell_origin(0, 0).unwrap();
        assert_eq!(r.front.get(pc + 1, pr).ch, '◢');
        // Inset: the floor shows through at the tile's edge.
        assert_eq!(r.front.get(pc, pr).ch, '·');
    }

    #[test]
    fn tunnel_edge_tints_inside_the_face() {
        let world = world_from("# R\n@ 1,0 L 0\n@ 1,0 R 0\nP#.\n");
        let r = composed(&world);
        let (col, row) = r.viewport.cell_origin(1, 0).unwrap();
        let red = rgb(scene::tunnel_color(crate::domain::tunnel::TunnelId(0)));
        assert_eq!(r.front.get(col, row).bg, red);
        assert_eq!(r.front.get(col, row + 1).bg, red);
        assert_eq!(r.front.get(col + CELL_W - 1, row).bg, red);
        assert_ne!(r.front.get(col + 1, row).bg, red);
    }

    #[test]
    fn hud_shows_name_and_moves() {
        let mut world = world_from("# Lobby\nP.\n");
        step::player_turn(&mut world, Move::RIGHT);
        let r = composed(&world);
        let hud: String = (0..40).map(|x| r.front.get(x, HUD_ROW).ch).collect();
        assert!(hud.contains("Lobby"));
        assert!(hud.contains("Moves 1"));
    }
}
