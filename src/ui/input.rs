/// Keyboard and mouse input collector.
///
/// Every Press or Repeat counts as one discrete action, so a held arrow
/// key walks one cell per terminal repeat. Release events are ignored.

use std::time::Duration;

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

/// Mouse actions relevant to the editor, in terminal coordinates.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MouseAction {
    Down { col: u16, row: u16 },
    Drag { col: u16, row: u16 },
    Up { col: u16, row: u16 },
}

pub struct InputState {
    /// Key presses (including repeats) in arrival order.
    presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for modifier checks.
    pub raw_events: Vec<KeyEvent>,

    pub mouse: Vec<MouseAction>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            mouse: Vec::with_capacity(8),
        }
    }

    /// Drain all pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        self.presses.clear();
        self.raw_events.clear();
        self.mouse.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => self.push_key(key),
                Ok(Event::Mouse(m)) => self.push_mouse(m),
                _ => {}
            }
        }
    }

    fn push_key(&mut self, key: KeyEvent) {
        self.raw_events.push(key);
        if key.kind != KeyEventKind::Release {
            self.presses.push(key.code);
        }
    }

    fn push_mouse(&mut self, m: MouseEvent) {
        let (col, row) = (m.column, m.row);
        let action = match m.kind {
            MouseEventKind::Down(MouseButton::Left) => MouseAction::Down { col, row },
            MouseEventKind::Drag(MouseButton::Left) => MouseAction::Drag { col, row },
            MouseEventKind::Up(MouseButton::Left) => MouseAction::Up { col, row },
            _ => return,
        };
        self.mouse.push(action);
    }

    /// Key presses this frame, oldest first.
    pub fn presses(&self) -> &[KeyCode] {
        &self.presses
    }

    /// Convenience: was any of these keys pressed this frame?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.presses.contains(c))
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    #[test]
    fn repeats_count_and_releases_do_not() {
        let mut input = InputState::new();
        input.push_key(key(KeyCode::Right, KeyEventKind::Press));
        input.push_key(key(KeyCode::Right, KeyEventKind::Repeat));
        input.push_key(key(KeyCode::Right, KeyEventKind::Release));
        assert_eq!(input.presses(), &[KeyCode::Right, KeyCode::Right]);
        assert!(input.any_pressed(&[KeyCode::Left, KeyCode::Right]));
    }

    #[test]
    fn ctrl_c_is_detected() {
        let mut input = InputState::new();
        input.push_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(input.ctrl_c_pressed());
    }

    #[test]
    fn only_left_button_mouse_actions_are_kept() {
        let mut input = InputState::new();
        let ev = |kind| MouseEvent { kind, column: 3, row: 4, modifiers: KeyModifiers::NONE };
        input.push_mouse(ev(MouseEventKind::Down(MouseButton::Left)));
        input.push_mouse(ev(MouseEventKind::Down(MouseButton::Right)));
        input.push_mouse(ev(MouseEventKind::Moved));
        input.push_mouse(ev(MouseEventKind::Up(MouseButton::Left)));
        assert_eq!(input.mouse, vec![
            MouseAction::Down { col: 3, row: 4 },
            MouseAction::Up { col: 3, row: 4 },
        ]);
    }
}
