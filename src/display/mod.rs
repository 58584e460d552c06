// src/display/mod.rs
//! Live terminal display and keyboard control

pub mod terminal;

pub use terminal::{spawn_key_reader, TerminalDisplay};

/// Keys understood while recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
    Start,
    Pause,
    Resume,
    Stop,
    Reset,
    Quit,
}

impl ControlKey {
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'n' => Some(ControlKey::Start),
            'p' => Some(ControlKey::Pause),
            'r' => Some(ControlKey::Resume),
            's' => Some(ControlKey::Stop),
            'x' => Some(ControlKey::Reset),
            'q' => Some(ControlKey::Quit),
            _ => None,
        }
    }
}
