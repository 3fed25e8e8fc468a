/// WorldState: everything a running session needs between turns.
///
/// ## Board layers
///
///   - `base`: the level as loaded. **Never mutated** after load.
///   - `map` : the live board that turns and the editor change.
///
/// `restart_level` resets `map = base.clone()`.

use super::editor::Editor;
use super::level::LevelDef;
use super::tilemap::Tilemap;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    Editing,
}

pub struct WorldState {
    // ── Board ──
    pub base: Tilemap,
    pub map: Tilemap,

    // ── Levels ──
    pub levels: Vec<LevelDef>,
    pub current_level: usize,
    pub level_name: String,

    // ── Meta ──
    pub phase: Phase,
    pub moves: u32,
    pub max_resolve_depth: usize,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
    pub editor: Editor,
}

impl WorldState {
    pub fn new(levels: Vec<LevelDef>, max_resolve_depth: usize) -> Self {
        WorldState {
            base: Tilemap::new(),
            map: Tilemap::new(),
            levels,
            current_level: 0,
            level_name: String::new(),
            phase: Phase::Playing,
            moves: 0,
            max_resolve_depth,
            message: String::new(),
            message_timer: 0,
            editor: Editor::new(),
        }
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    /// Count down the status message; clears it when the timer runs out.
    pub fn tick_message(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 { self.message.clear(); }
        }
    }

    pub fn restart_level(&mut self) {
        self.map = self.base.clone();
        self.moves = 0;
        self.editor.stop_drag();
    }

    pub fn toggle_editor(&mut self) {
        self.phase = match self.phase {
            Phase::Playing => Phase::Editing,
            Phase::Editing => {
                self.editor.stop_drag();
                Phase::Playing
            }
        };
    }
}
