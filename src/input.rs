use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    SelectUp,
    SelectDown,
    JumpTop,
    JumpBottom,
    None,
}

pub fn handle_key(key: KeyEvent) -> Action {
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _)
        | (KeyCode::Esc, _)
        | (KeyCode::Char('c'), KeyModifiers::CONTROL) => Action::Quit,

        // Navigation: arrow keys and vim jk
        (KeyCode::Up,   _) | (KeyCode::Char('k'), _) => Action::SelectUp,
        (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Action::SelectDown,

        (KeyCode::Char('g'), _) | (KeyCode::Home, _) => Action::JumpTop,
        (KeyCode::Char('G'), _) | (KeyCode::End,  _) => Action::JumpBottom,

        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_keys() {
        assert_eq!(handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)), Action::Quit);
        assert_eq!(handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)), Action::Quit);
        assert_eq!(handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)), Action::Quit);
        assert_eq!(handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)), Action::None);
    }

    #[test]
    fn navigation_keys() {
        assert_eq!(handle_key(KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE)), Action::SelectDown);
        assert_eq!(handle_key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE)), Action::SelectUp);
        assert_eq!(handle_key(KeyEvent::new(KeyCode::Char('G'), KeyModifiers::SHIFT)), Action::JumpBottom);
    }
}
