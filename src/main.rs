/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::Duration;

use crossterm::event::KeyCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::face::Move;
use domain::item::ItemType;
use domain::tunnel::TunnelId;
use sim::editor::{self, EditCommand};
use sim::level::{load_level, load_levels, switch_level};
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::{InputState, MouseAction};
use ui::renderer::Renderer;
use ui::sound::{self, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(10);

fn main() {
    let config = GameConfig::load();
    init_logging(&config);

    let levels = load_levels(&config.levels_dir, config.rules.max_resolve_depth);
    let mut world = WorldState::new(levels, config.rules.max_resolve_depth);
    if let Err(e) = load_level(&mut world, 0) {
        error!(error = %e, "no playable level");
        eprintln!("No playable level: {e}");
        return;
    }

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!(error = %e, "game loop failed");
        eprintln!("Game error: {e}");
    }

    info!(level = world.current_level, moves = world.moves, "session ended");
}

/// Log to a file: the terminal belongs to the renderer. `RUST_LOG`
/// overrides the configured level.
fn init_logging(config: &GameConfig) {
    let file = match File::create(&config.log_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: cannot open log file {}: {e}", config.log_file.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, &kb, &gp) {
            break;
        }

        match world.phase {
            Phase::Playing => {
                let moves = kb.presses().iter()
                    .filter_map(|&k| key_move(k))
                    .chain(gp.move_pressed());
                for m in moves.collect::<Vec<_>>() {
                    let events = step::player_turn(world, m);
                    sound::play_turn(sound, &events);
                }
            }
            Phase::Editing => {
                for &k in kb.presses() {
                    if let Some(cmd) = key_edit(k) {
                        step::edit(world, cmd);
                    }
                }
                if let Some(m) = gp.move_pressed() {
                    step::edit(world, EditCommand::MoveCursor(m));
                }
                for &action in &kb.mouse {
                    handle_mouse(world, renderer, action);
                }
            }
        }

        world.tick_message();
        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

// ── Key Constants ──

const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];
const KEYS_EDITOR: &[KeyCode] = &[KeyCode::Enter];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_NEXT: &[KeyCode] = &[KeyCode::Char('n'), KeyCode::Char('N'), KeyCode::PageDown];
const KEYS_PREV: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::PageUp];

fn key_move(k: KeyCode) -> Option<Move> {
    match k {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(Move::UP),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(Move::DOWN),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Move::LEFT),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Move::RIGHT),
        _ => None,
    }
}

/// Editor key bindings. Arrows and IJKL move the cursor; `1`-`4` put
/// tunnels 0-3 on the selected face, `0` clears it.
fn key_edit(k: KeyCode) -> Option<EditCommand> {
    let cmd = match k {
        KeyCode::Up | KeyCode::Char('i') => EditCommand::MoveCursor(Move::UP),
        KeyCode::Down | KeyCode::Char('k') => EditCommand::MoveCursor(Move::DOWN),
        KeyCode::Left | KeyCode::Char('j') => EditCommand::MoveCursor(Move::LEFT),
        KeyCode::Right | KeyCode::Char('l') => EditCommand::MoveCursor(Move::RIGHT),
        KeyCode::Tab => EditCommand::CycleFace,
        KeyCode::Char('f') | KeyCode::Char('F') => EditCommand::Place(ItemType::Floor),
        KeyCode::Char('b') | KeyCode::Char('B') => EditCommand::Place(ItemType::Block),
        KeyCode::Char('u') | KeyCode::Char('U') => EditCommand::Place(ItemType::Button),
        KeyCode::Char('p') | KeyCode::Char('P') => EditCommand::Place(ItemType::Player),
        KeyCode::Char('x') | KeyCode::Char('X') | KeyCode::Delete => EditCommand::Remove,
        KeyCode::Char('g') | KeyCode::Char('G') | KeyCode::Char(' ') => EditCommand::Grab,
        KeyCode::Char('0') => EditCommand::Tunnel(None),
        KeyCode::Char(c @ '1'..='4') => EditCommand::Tunnel(Some(TunnelId(c as u8 - b'1'))),
        _ => return None,
    };
    Some(cmd)
}

fn handle_mouse(world: &mut WorldState, renderer: &Renderer, action: MouseAction) {
    let vp = renderer.viewport();
    match action {
        MouseAction::Down { col, row } => {
            let (cell, fx, fy) = match vp.screen_to_cell(col, row) {
                Some(hit) => hit,
                None => return,
            };
            step::edit(world, EditCommand::CursorTo(cell));
            step::edit(world, EditCommand::SelectFace(editor::face_at(fx, fy)));
            if world.editor.dragging.is_none() && world.map.find_blocking(cell).is_some() {
                step::edit(world, EditCommand::Grab);
            }
        }
        MouseAction::Drag { col, row } => {
            if world.editor.dragging.is_none() { return; }
            if let Some((cell, _, _)) = vp.screen_to_cell(col, row) {
                if cell != world.editor.cursor {
                    step::edit(world, EditCommand::CursorTo(cell));
                }
            }
        }
        MouseAction::Up { .. } => {
            if world.editor.dragging.is_some() {
                step::edit(world, EditCommand::Grab);
            }
        }
    }
}

/// Quit, editor toggle, restart and level switching. Returns true to quit.
fn handle_meta(world: &mut WorldState, kb: &InputState, gp: &GamepadState) -> bool {
    if kb.any_pressed(KEYS_QUIT) || gp.cancel_pressed() {
        return true;
    }

    if kb.any_pressed(KEYS_EDITOR) || gp.confirm_pressed() {
        step::toggle_editor(world);
        return false;
    }

    if world.phase != Phase::Playing {
        return false;
    }

    if kb.any_pressed(KEYS_RESTART) || gp.restart_pressed() {
        world.restart_level();
        world.set_message("Room restarted", 30);
    } else if kb.any_pressed(KEYS_NEXT) || gp.next_level_pressed() {
        change_level(world, 1);
    } else if kb.any_pressed(KEYS_PREV) || gp.prev_level_pressed() {
        change_level(world, -1);
    }
    false
}

fn change_level(world: &mut WorldState, delta: isize) {
    if let Err(e) = switch_level(world, delta) {
        error!(error = %e, "level switch failed");
        world.set_message(&format!("Cannot load room: {e}"), 60);
    }
}
