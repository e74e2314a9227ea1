//! Input events as delivered by the windowing layer.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Char(char),
    Escape,
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    /// Parses a scripted key: a single character or one of `esc`, `up`,
    /// `down`, `left`, `right`, `space`.
    pub fn parse(token: &str) -> Option<Key> {
        let key = match token {
            "esc" | "escape" => Key::Escape,
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            "space" => Key::Char(' '),
            other => {
                let mut chars = other.chars();
                let first = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                Key::Char(first)
            }
        };
        Some(key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    Resize {
        width: u32,
        height: u32,
    },
    Key(Key),
    MouseButton {
        button: MouseButton,
        pressed: bool,
        x: f64,
        y: f64,
    },
    MouseMove {
        x: f64,
        y: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_single_keys() {
        assert_eq!(Key::parse("esc"), Some(Key::Escape));
        assert_eq!(Key::parse("space"), Some(Key::Char(' ')));
        assert_eq!(Key::parse("+"), Some(Key::Char('+')));
        assert_eq!(Key::parse("plus"), None);
        assert_eq!(Key::parse(""), None);
    }
}
