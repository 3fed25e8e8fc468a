/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels/` directory (individual `.txt` files, sorted by filename)
///   2. Built-in embedded levels
///
/// ## Single-level format (`.txt`):
///   Line 1: `# Level Name`
///   `@ x,y FACE id`: tunnel `id` on FACE (U/R/D/L) of the block at (x,y)
///   `! x,y id`     : the button at (x,y) gates tunnel `id`
///   Other lines: map rows
///
/// ## Tile legend:
///   '.' = Floor                  '#' = Block on floor
///   'P' = Player on floor        '_' = Button on floor
///   '*' = Block on button        '+' = Player on button
///   ' ' = Void (nothing registered)

use std::path::Path;

use tracing::{info, warn};

use crate::domain::error::LevelError;
use crate::domain::face::Face;
use crate::domain::item::{GridPosition, ItemType};
use crate::domain::tunnel::TunnelId;
use crate::sim::tilemap::Tilemap;
use crate::sim::world::{Phase, WorldState};

/// Runtime level data (owned strings, loaded from file or embedded).
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<String>,
    pub tunnels: Vec<TunnelDirective>,
    pub buttons: Vec<ButtonDirective>,
}

/// `@ x,y FACE id`, with the 1-based source line for error reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TunnelDirective {
    pub line: usize,
    pub at: GridPosition,
    pub face: Face,
    pub tunnel: TunnelId,
}

/// `! x,y id`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonDirective {
    pub line: usize,
    pub at: GridPosition,
    pub tunnel: TunnelId,
}

const LEGEND: &[char] = &['.', '#', 'P', '_', '*', '+', ' '];

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Build level `level_idx` into the world. Resets the move counter and
/// leaves the editor.
pub fn load_level(world: &mut WorldState, level_idx: usize) -> Result<(), LevelError> {
    let def = world.levels.get(level_idx).ok_or(LevelError::Empty)?;
    let map = build_tilemap(def, world.max_resolve_depth)?;
    let name = def.name.clone();

    world.base = map.clone();
    world.map = map;
    world.current_level = level_idx;
    world.level_name = name.clone();
    world.moves = 0;
    world.phase = Phase::Playing;
    world.editor.reset();
    world.set_message(&name, 60);

    info!(level = level_idx, name = %name, "level loaded");
    Ok(())
}

/// Step forward (`delta > 0`) or back through the level list, wrapping.
pub fn switch_level(world: &mut WorldState, delta: isize) -> Result<(), LevelError> {
    let count = world.levels.len();
    if count == 0 {
        return Err(LevelError::Empty);
    }
    let idx = (world.current_level as isize + delta).rem_euclid(count as isize) as usize;
    load_level(world, idx)
}

/// All playable levels: the directory's valid files, or the embedded set
/// when the directory is missing or yields nothing.
pub fn load_levels(dir: &Path, depth_limit: usize) -> Vec<LevelDef> {
    if dir.is_dir() {
        let mut levels = load_from_directory(dir, depth_limit);
        if !levels.is_empty() {
            levels.sort_by(|a, b| a.0.cmp(&b.0));
            info!(count = levels.len(), dir = %dir.display(), "levels loaded from directory");
            return levels.into_iter().map(|(_, def)| def).collect();
        }
    }
    embedded_levels()
}

pub fn read_level_file(path: &Path) -> Result<LevelDef, LevelError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| LevelError::Io { path: path.to_path_buf(), source })?;
    parse_level_file(&content)
}

// ══════════════════════════════════════════════════════════════
// Parsing
// ══════════════════════════════════════════════════════════════

/// Parse a single level from text content.
pub fn parse_level_file(content: &str) -> Result<LevelDef, LevelError> {
    let mut name = String::new();
    let mut rows = vec![];
    let mut tunnels = vec![];
    let mut buttons = vec![];

    for (i, line) in content.lines().enumerate() {
        let line_no = i + 1;
        if line.starts_with('#') && name.is_empty() && rows.is_empty() && is_name_line(line) {
            name = line[1..].trim().to_string();
        } else if let Some(rest) = line.strip_prefix("@ ") {
            tunnels.push(parse_tunnel_directive(line_no, line, rest)?);
        } else if let Some(rest) = line.strip_prefix("! ") {
            buttons.push(parse_button_directive(line_no, line, rest)?);
        } else {
            rows.push(line.to_string());
        }
    }

    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }

    if rows.is_empty() {
        return Err(LevelError::Empty);
    }

    let max_width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    for row in &mut rows {
        let len = row.chars().count();
        if len < max_width {
            row.extend(std::iter::repeat(' ').take(max_width - len));
        }
    }

    if name.is_empty() {
        name = "Untitled Room".to_string();
    }

    Ok(LevelDef { name, rows, tunnels, buttons })
}

/// Distinguish `# Level Name` from `#.#..` (level data).
/// A name line has at least one character outside the tile legend.
fn is_name_line(line: &str) -> bool {
    line[1..].chars().any(|c| !LEGEND.contains(&c))
}

fn parse_tunnel_directive(line: usize, text: &str, rest: &str) -> Result<TunnelDirective, LevelError> {
    let bad = || LevelError::BadDirective { line, text: text.to_string() };
    let parts: Vec<&str> = rest.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(bad());
    }
    let at = parse_position(parts[0]).ok_or_else(bad)?;
    let face = parse_face(parts[1])
        .ok_or_else(|| LevelError::UnknownFace { line, face: parts[1].to_string() })?;
    let tunnel = parts[2].parse::<u8>().map(TunnelId).map_err(|_| bad())?;
    Ok(TunnelDirective { line, at, face, tunnel })
}

fn parse_button_directive(line: usize, text: &str, rest: &str) -> Result<ButtonDirective, LevelError> {
    let bad = || LevelError::BadDirective { line, text: text.to_string() };
    let parts: Vec<&str> = rest.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(bad());
    }
    let at = parse_position(parts[0]).ok_or_else(bad)?;
    let tunnel = parts[1].parse::<u8>().map(TunnelId).map_err(|_| bad())?;
    Ok(ButtonDirective { line, at, tunnel })
}

fn parse_position(pair: &str) -> Option<GridPosition> {
    let (x, y) = pair.split_once(',')?;
    Some(GridPosition::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

fn parse_face(word: &str) -> Option<Face> {
    let mut chars = word.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Face::from_letter(c)
}

// ══════════════════════════════════════════════════════════════
// Building
// ══════════════════════════════════════════════════════════════

/// Turn a parsed level into a validated board.
///
/// Entities are added row by row, left to right, bottom layer first
/// (floor, button, block, player), so block ids follow reading order.
pub fn build_tilemap(def: &LevelDef, depth_limit: usize) -> Result<Tilemap, LevelError> {
    let players = def.rows.iter()
        .flat_map(|r| r.chars())
        .filter(|&c| c == 'P' || c == '+')
        .count();
    match players {
        0 => return Err(LevelError::NoPlayer { name: def.name.clone() }),
        1 => {}
        count => return Err(LevelError::MultiplePlayers { name: def.name.clone(), count }),
    }

    let mut map = Tilemap::new().with_depth_limit(depth_limit);

    for (y, row) in def.rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let (x, y) = (x as i32, y as i32);
            let layers: &[ItemType] = match ch {
                '.' => &[ItemType::Floor],
                '#' => &[ItemType::Floor, ItemType::Block],
                'P' => &[ItemType::Floor, ItemType::Player],
                '_' => &[ItemType::Floor, ItemType::Button],
                '*' => &[ItemType::Floor, ItemType::Button, ItemType::Block],
                '+' => &[ItemType::Floor, ItemType::Button, ItemType::Player],
                _ => &[],
            };
            for &item in layers {
                map.add_entity(item, x, y);
            }
        }
    }

    for d in &def.tunnels {
        let block = map.find(ItemType::Block, d.at).ok_or(LevelError::MissingItem {
            line: d.line, expected: "block", x: d.at.x, y: d.at.y,
        })?;
        map.set_tunnel(block, d.face, Some(d.tunnel));
    }

    for d in &def.buttons {
        let button = map.find(ItemType::Button, d.at).ok_or(LevelError::MissingItem {
            line: d.line, expected: "button", x: d.at.x, y: d.at.y,
        })?;
        map.bind_button(button, Some(d.tunnel));
    }

    if let Some(&tunnel) = map.unpaired_tunnels().first() {
        return Err(LevelError::UnpairedTunnel { tunnel });
    }

    Ok(map)
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path, depth_limit: usize) -> Vec<(String, LevelDef)> {
    let mut results = vec![];

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot list levels directory");
            return results;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(false, |e| e == "txt") {
            let checked = read_level_file(&path)
                .and_then(|def| build_tilemap(&def, depth_limit).map(|_| def));
            match checked {
                Ok(def) => {
                    let filename = path.file_name()
                        .unwrap_or_default()
                        .to_string_lossy()
                        .to_string();
                    results.push((filename, def));
                }
                Err(e) => warn!(file = %path.display(), error = %e, "skipping level file"),
            }
        }
    }

    results
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

const EMBEDDED: &[&str] = &[
    "# Room 1 - First Crossing
@ 3,1 L 0
@ 4,2 L 0
! 3,3 0
..........
.P.#......
....#.....
..._......
..........
..........
..........
..........
..........
..........
",
    "# Room 2 - Corner Turn
@ 3,1 L 1
@ 6,3 U 1
@ 6,3 D 2
@ 2,4 R 2
........
.P.#....
........
......#.
..#.....
........
",
    "# Room 3 - Weighed Down
@ 3,1 L 0
@ 6,1 R 0
! 1,3 0
....  ....
.P.#  #...
....  ....
.*..  ....
",
];

fn embedded_levels() -> Vec<LevelDef> {
    EMBEDDED.iter()
        .filter_map(|text| match parse_level_file(text) {
            Ok(def) => Some(def),
            Err(e) => {
                warn!(error = %e, "embedded level rejected");
                None
            }
        })
        .collect()
}
