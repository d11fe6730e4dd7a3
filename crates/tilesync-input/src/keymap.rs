//! Key mapping from raw key tokens to input actions.

use tilesync_protocol::{Direction, Intent};

/// What a recognized key asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Move(Direction),
    Restart,
}

impl InputAction {
    /// The intent this action requests, before any gating.
    pub fn intent(self) -> Intent {
        match self {
            InputAction::Move(direction) => Intent::Move { direction },
            InputAction::Restart => Intent::Restart,
        }
    }
}

/// Map a key token to an action.
///
/// Tokens use browser key names (`"ArrowUp"`, `"Escape"`) plus the
/// WASD letters in either case.
pub fn map_key(key: &str) -> Option<InputAction> {
    match key {
        "ArrowUp" | "w" | "W" => Some(InputAction::Move(Direction::Up)),
        "ArrowRight" | "d" | "D" => Some(InputAction::Move(Direction::Right)),
        "ArrowDown" | "s" | "S" => Some(InputAction::Move(Direction::Down)),
        "ArrowLeft" | "a" | "A" => Some(InputAction::Move(Direction::Left)),
        "Escape" => Some(InputAction::Restart),
        _ => None,
    }
}

/// Check if a key should quit the client.
pub fn should_quit(key: &str) -> bool {
    matches!(key, "q" | "Q")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_keys() {
        assert_eq!(map_key("ArrowUp"), Some(InputAction::Move(Direction::Up)));
        assert_eq!(
            map_key("ArrowRight"),
            Some(InputAction::Move(Direction::Right))
        );
        assert_eq!(
            map_key("ArrowDown"),
            Some(InputAction::Move(Direction::Down))
        );
        assert_eq!(
            map_key("ArrowLeft"),
            Some(InputAction::Move(Direction::Left))
        );
    }

    #[test]
    fn test_wasd_keys_either_case() {
        for (lower, upper, direction) in [
            ("w", "W", Direction::Up),
            ("d", "D", Direction::Right),
            ("s", "S", Direction::Down),
            ("a", "A", Direction::Left),
        ] {
            assert_eq!(map_key(lower), Some(InputAction::Move(direction)));
            assert_eq!(map_key(upper), Some(InputAction::Move(direction)));
        }
    }

    #[test]
    fn test_escape_restarts() {
        assert_eq!(map_key("Escape"), Some(InputAction::Restart));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        for key in ["", "x", "Enter", "arrowup", "r", " ", "q"] {
            assert_eq!(map_key(key), None, "{key:?} should not map");
        }
    }

    #[test]
    fn test_quit_keys() {
        assert!(should_quit("q"));
        assert!(should_quit("Q"));
        assert!(!should_quit("Escape"));
    }

    #[test]
    fn test_action_intent() {
        assert_eq!(
            InputAction::Move(Direction::Left).intent(),
            Intent::Move {
                direction: Direction::Left
            }
        );
        assert_eq!(InputAction::Restart.intent(), Intent::Restart);
    }
}
