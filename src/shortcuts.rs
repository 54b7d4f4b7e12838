#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyChord {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl KeyChord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShortcutAction {
    InsertPageLink,
    ToggleTagPanel,
    CloseTagPanel,
}

/// Shift is ignored for the link chord, so Ctrl+Shift+L also inserts it.
pub fn resolve_shortcut(chord: &KeyChord, panel_open: bool) -> Option<ShortcutAction> {
    let key = chord.key.to_ascii_lowercase();
    if chord.command() && key == "l" {
        Some(ShortcutAction::InsertPageLink)
    } else if chord.command() && chord.shift && key == "t" {
        Some(ShortcutAction::ToggleTagPanel)
    } else if key == "escape" && panel_open {
        Some(ShortcutAction::CloseTagPanel)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_command_shortcuts() {
        assert_eq!(
            resolve_shortcut(&KeyChord::new("l").ctrl(), false),
            Some(ShortcutAction::InsertPageLink)
        );
        assert_eq!(
            resolve_shortcut(&KeyChord::new("L").meta(), true),
            Some(ShortcutAction::InsertPageLink)
        );
        assert_eq!(
            resolve_shortcut(&KeyChord::new("T").ctrl().shift(), false),
            Some(ShortcutAction::ToggleTagPanel)
        );
    }

    #[test]
    fn shifted_link_chord_still_inserts_link() {
        assert_eq!(
            resolve_shortcut(&KeyChord::new("L").ctrl().shift(), false),
            Some(ShortcutAction::InsertPageLink)
        );
        assert_eq!(
            resolve_shortcut(&KeyChord::new("l").meta().shift(), true),
            Some(ShortcutAction::InsertPageLink)
        );
    }

    #[test]
    fn escape_only_acts_on_open_panel() {
        assert_eq!(
            resolve_shortcut(&KeyChord::new("Escape"), true),
            Some(ShortcutAction::CloseTagPanel)
        );
        assert_eq!(resolve_shortcut(&KeyChord::new("Escape"), false), None);
    }

    #[test]
    fn plain_keys_pass_through() {
        assert_eq!(resolve_shortcut(&KeyChord::new("l"), false), None);
        assert_eq!(resolve_shortcut(&KeyChord::new("t").ctrl(), false), None);
        assert_eq!(resolve_shortcut(&KeyChord::new("Enter").ctrl(), false), None);
    }
}
