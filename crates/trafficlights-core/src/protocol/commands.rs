//! Protocol commands
//!
//! Defines the colors understood by the traffic light controller and the
//! single byte that selects each of them on the wire.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Colors supported by the controller sketch.
///
/// This list must match the one compiled into the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Color {
    /// All lamps dark
    Off,
    Red,
    Yellow,
    Green,
    Blue,
    White,
    /// Not a color, runs the controller's lamp test routine
    SelfTest,
}

impl Color {
    /// Every supported color, in declaration order
    pub const ALL: [Color; 7] = [
        Color::Off,
        Color::Red,
        Color::Yellow,
        Color::Green,
        Color::Blue,
        Color::White,
        Color::SelfTest,
    ];

    /// Get the command byte sent to the controller
    pub fn wire_code(&self) -> u8 {
        match self {
            Color::Off => b'o',
            Color::Red => b'r',
            Color::Yellow => b'y',
            Color::Green => b'g',
            Color::Blue => b'b',
            Color::White => b'w',
            Color::SelfTest => b't',
        }
    }

    /// Canonical lower-case name
    pub fn name(&self) -> &'static str {
        match self {
            Color::Off => "off",
            Color::Red => "red",
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::White => "white",
            Color::SelfTest => "self-test",
        }
    }

    /// Look a color up by name, ignoring case and surrounding whitespace.
    ///
    /// `black` and `test` are accepted as older spellings of `off` and
    /// `self-test`.
    pub fn from_name(name: &str) -> Option<Color> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("black") {
            return Some(Color::Off);
        }
        if name.eq_ignore_ascii_case("test") {
            return Some(Color::SelfTest);
        }
        Color::ALL
            .into_iter()
            .find(|color| color.name().eq_ignore_ascii_case(name))
    }
}

/// A color together with the byte that selects it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorCommand {
    /// Color this command switches to
    pub color: Color,
    /// Command byte written to the serial port
    pub wire_code: u8,
}

impl ColorCommand {
    /// Build the command for a color
    pub fn new(color: Color) -> Self {
        Self {
            color,
            wire_code: color.wire_code(),
        }
    }

    /// Canonical name of the color
    pub fn name(&self) -> &'static str {
        self.color.name()
    }

    /// Bytes to put on the wire
    pub fn to_bytes(&self) -> [u8; 1] {
        [self.wire_code]
    }
}

impl From<Color> for ColorCommand {
    fn from(color: Color) -> Self {
        ColorCommand::new(color)
    }
}

/// Returned by [`resolve`] for names that are not in the registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No such color: {name}")]
pub struct ColorNotFound {
    /// The name that was looked up
    pub name: String,
}

/// Resolve a color name to its command
pub fn resolve(name: &str) -> Result<ColorCommand, ColorNotFound> {
    Color::from_name(name)
        .map(ColorCommand::new)
        .ok_or_else(|| ColorNotFound {
            name: name.to_string(),
        })
}

/// All supported commands, sorted by name ignoring case
pub fn list() -> Vec<ColorCommand> {
    let mut commands: Vec<ColorCommand> = Color::ALL.into_iter().map(ColorCommand::new).collect();
    commands.sort_by_key(|cmd| cmd.name().to_ascii_lowercase());
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes() {
        assert_eq!(Color::Off.wire_code(), b'o');
        assert_eq!(Color::Green.wire_code(), b'g');
        assert_eq!(Color::SelfTest.wire_code(), b't');
    }

    #[test]
    fn test_resolve_ignores_case() {
        assert_eq!(resolve("RED").unwrap().wire_code, b'r');
        assert_eq!(resolve("Yellow").unwrap().wire_code, b'y');
        assert_eq!(resolve("  green\n").unwrap().wire_code, b'g');
        assert_eq!(resolve("Self-Test").unwrap().color, Color::SelfTest);
    }

    #[test]
    fn test_resolve_aliases() {
        assert_eq!(resolve("BLACK").unwrap().color, Color::Off);
        assert_eq!(resolve("test").unwrap().color, Color::SelfTest);
    }

    #[test]
    fn test_resolve_unknown() {
        let err = resolve("purple").unwrap_err();
        assert_eq!(err.name, "purple");
        assert_eq!(err.to_string(), "No such color: purple");
        assert!(resolve("").is_err());
    }

    #[test]
    fn test_command_to_bytes() {
        let cmd = ColorCommand::from(Color::Blue);
        assert_eq!(cmd.to_bytes(), *b"b");
        assert_eq!(cmd.name(), "blue");
    }
}
