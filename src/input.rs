//! Key bindings: arrows and vim keys to engine intents.

use crate::engine::Intent;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Map a key event to an intent. Releases only matter for soft drop; terminals that never
/// report releases leave soft drop on until the piece locks.
pub fn key_to_intent(key: KeyEvent) -> Option<Intent> {
    let KeyEvent {
        code,
        modifiers,
        kind,
        ..
    } = key;
    if kind == KeyEventKind::Release {
        return matches!(code, KeyCode::Down | KeyCode::Char('j')).then_some(Intent::SoftDropOff);
    }
    if modifiers == KeyModifiers::CONTROL {
        return matches!(code, KeyCode::Char('c')).then_some(Intent::QuitRequested);
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Intent::QuitRequested),
        KeyCode::Left | KeyCode::Char('h') => Some(Intent::MoveLeft),
        KeyCode::Right | KeyCode::Char('l') => Some(Intent::MoveRight),
        KeyCode::Up | KeyCode::Char('k') => Some(Intent::RotateClockwise),
        KeyCode::Down | KeyCode::Char('j') => Some(Intent::SoftDropOn),
        _ => None,
    }
}
