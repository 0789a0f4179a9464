//! Keyboard shortcut matching.
//!
//! Patterns are written `modifier+...+key`. A modifier suffixed with `?` may
//! be either up or down; unlisted modifiers must be up. `mod` is Cmd on
//! Apple platforms and Ctrl elsewhere, `opt` is Alt.

use smol_str::SmolStr;

/// A key press as delivered by `keydown`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyCombo {
    /// Normalized key name: lowercase, `Arrow` prefix dropped.
    pub key: SmolStr,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl KeyCombo {
    pub fn new(key: &str) -> Self {
        let lower = key.to_lowercase();
        let key = lower.strip_prefix("arrow").unwrap_or(&lower);
        Self {
            key: SmolStr::new(key),
            ..Default::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hotkey {
    Bold,
    Italic,
    MoveBackward,
    MoveForward,
    MoveWordBackward,
    MoveWordForward,
    MoveLineBackward,
    MoveLineForward,
    ExtendLineBackward,
    ExtendLineForward,
    DeleteBackward,
    DeleteForward,
    DeleteWordBackward,
    DeleteWordForward,
    DeleteLineBackward,
    DeleteLineForward,
    SplitBlock,
    TransposeCharacter,
    Undo,
    Redo,
}

impl Hotkey {
    fn generic(self) -> &'static [&'static str] {
        match self {
            Hotkey::Bold => &["mod+b"],
            Hotkey::Italic => &["mod+i"],
            Hotkey::MoveBackward => &["left"],
            Hotkey::MoveForward => &["right"],
            Hotkey::MoveWordBackward => &["ctrl+left"],
            Hotkey::MoveWordForward => &["ctrl+right"],
            Hotkey::DeleteBackward => &["shift?+backspace"],
            Hotkey::DeleteForward => &["shift?+delete"],
            Hotkey::SplitBlock => &["shift?+enter"],
            Hotkey::Undo => &["mod+z"],
            _ => &[],
        }
    }

    fn apple(self) -> &'static [&'static str] {
        match self {
            Hotkey::MoveLineBackward => &["opt+up"],
            Hotkey::MoveLineForward => &["opt+down"],
            Hotkey::MoveWordBackward => &["opt+left"],
            Hotkey::MoveWordForward => &["opt+right"],
            Hotkey::DeleteBackward => &["ctrl+backspace", "ctrl+h"],
            Hotkey::DeleteForward => &["ctrl+delete", "ctrl+d"],
            Hotkey::DeleteLineBackward => &["cmd+shift?+backspace"],
            Hotkey::DeleteLineForward => &["cmd+shift?+delete", "ctrl+k"],
            Hotkey::DeleteWordBackward => &["opt+shift?+backspace"],
            Hotkey::DeleteWordForward => &["opt+shift?+delete"],
            Hotkey::ExtendLineBackward => &["opt+shift+up"],
            Hotkey::ExtendLineForward => &["opt+shift+down"],
            Hotkey::Redo => &["cmd+shift+z"],
            Hotkey::TransposeCharacter => &["ctrl+t"],
            _ => &[],
        }
    }

    fn windows(self) -> &'static [&'static str] {
        match self {
            Hotkey::DeleteWordBackward => &["ctrl+shift?+backspace"],
            Hotkey::DeleteWordForward => &["ctrl+shift?+delete"],
            Hotkey::Redo => &["ctrl+y", "ctrl+shift+z"],
            _ => &[],
        }
    }

    pub fn matches(self, combo: &KeyCombo, is_apple: bool) -> bool {
        let platform = if is_apple { self.apple() } else { self.windows() };
        self.generic()
            .iter()
            .chain(platform)
            .any(|pattern| pattern_matches(pattern, combo, is_apple))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Want {
    Up,
    Down,
    Either,
}

fn pattern_matches(pattern: &str, combo: &KeyCombo, is_apple: bool) -> bool {
    let (mut ctrl, mut alt, mut shift, mut meta) = (Want::Up, Want::Up, Want::Up, Want::Up);
    let mut key = "";
    for part in pattern.split('+') {
        let (name, want) = match part.strip_suffix('?') {
            Some(name) => (name, Want::Either),
            None => (part, Want::Down),
        };
        match name {
            "ctrl" | "control" => ctrl = want,
            "alt" | "opt" | "option" => alt = want,
            "shift" => shift = want,
            "meta" | "cmd" | "command" => meta = want,
            "mod" if is_apple => meta = want,
            "mod" => ctrl = want,
            other => key = other,
        }
    }
    let ok = |want: Want, down: bool| match want {
        Want::Up => !down,
        Want::Down => down,
        Want::Either => true,
    };
    combo.key == key
        && ok(ctrl, combo.ctrl)
        && ok(alt, combo.alt)
        && ok(shift, combo.shift)
        && ok(meta, combo.meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalization() {
        assert_eq!(KeyCombo::new("ArrowLeft").key, "left");
        assert_eq!(KeyCombo::new("Backspace").key, "backspace");
        assert_eq!(KeyCombo::new("B").key, "b");
    }

    #[test]
    fn test_mod_follows_platform() {
        let cmd_z = KeyCombo::new("z").meta();
        let ctrl_z = KeyCombo::new("z").ctrl();
        assert!(Hotkey::Undo.matches(&cmd_z, true));
        assert!(!Hotkey::Undo.matches(&ctrl_z, true));
        assert!(Hotkey::Undo.matches(&ctrl_z, false));
        assert!(!Hotkey::Undo.matches(&cmd_z, false));
    }

    #[test]
    fn test_unlisted_modifiers_must_be_up() {
        assert!(Hotkey::MoveBackward.matches(&KeyCombo::new("ArrowLeft"), false));
        assert!(!Hotkey::MoveBackward.matches(&KeyCombo::new("ArrowLeft").shift(), false));
        assert!(!Hotkey::Undo.matches(&KeyCombo::new("z").ctrl().shift(), false));
    }

    #[test]
    fn test_optional_modifier() {
        assert!(Hotkey::SplitBlock.matches(&KeyCombo::new("Enter"), false));
        assert!(Hotkey::SplitBlock.matches(&KeyCombo::new("Enter").shift(), false));
    }

    #[test]
    fn test_platform_tables() {
        let opt_left = KeyCombo::new("ArrowLeft").alt();
        assert!(Hotkey::MoveWordBackward.matches(&opt_left, true));
        assert!(!Hotkey::MoveWordBackward.matches(&opt_left, false));

        let ctrl_y = KeyCombo::new("y").ctrl();
        assert!(Hotkey::Redo.matches(&ctrl_y, false));
        assert!(!Hotkey::Redo.matches(&ctrl_y, true));
        assert!(Hotkey::Redo.matches(&KeyCombo::new("z").meta().shift(), true));

        let ctrl_k = KeyCombo::new("k").ctrl();
        assert!(Hotkey::DeleteLineForward.matches(&ctrl_k, true));
    }
}
