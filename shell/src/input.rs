//! Key bindings and the context menu
//!
//! Both are declarative tables mapping input to [`Action`]s; the window
//! context performs the actions.

use common::{Action, Key, KeyPress, Modifiers};

use crate::config::Config;

/// What a matched key does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Run(Action),
    /// Close the window, but only once a held child has exited
    CloseHeld,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding {
    key: Key,
    modifiers: Modifiers,
    shortcut: Shortcut,
}

#[derive(Debug, Clone, Default)]
pub struct KeyBindings {
    bindings: Vec<Binding>,
}

impl KeyBindings {
    /// Build the shortcut table. Zoom keys are only bound when zoom is enabled.
    pub fn from_config(config: &Config, zoom_enabled: bool) -> Self {
        let toggles = &config.shortcuts;
        let mut table = Self::default();

        if zoom_enabled {
            if toggles.zoom_in {
                table.bind(Key::Char('+'), Modifiers::CTRL, Shortcut::Run(Action::ZoomIn));
                table.bind(Key::Char('='), Modifiers::CTRL, Shortcut::Run(Action::ZoomIn));
            }
            if toggles.zoom_out {
                table.bind(Key::Char('-'), Modifiers::CTRL, Shortcut::Run(Action::ZoomOut));
            }
            if toggles.zoom_reset {
                table.bind(Key::Char('0'), Modifiers::CTRL, Shortcut::Run(Action::ZoomReset));
            }
        }

        if toggles.seek_backward {
            table.bind(Key::Left, Modifiers::ALT, Shortcut::Run(Action::SeekBackward));
        }
        if toggles.seek_forward {
            table.bind(Key::Right, Modifiers::ALT, Shortcut::Run(Action::SeekForward));
        }
        if toggles.seek_start {
            table.bind(Key::Home, Modifiers::ALT, Shortcut::Run(Action::SeekStart));
        }

        if toggles.hold_escape {
            table.bind(Key::Escape, Modifiers::NONE, Shortcut::CloseHeld);
        }

        log::debug!("{} key bindings active", table.bindings.len());
        table
    }

    fn bind(&mut self, key: Key, modifiers: Modifiers, shortcut: Shortcut) {
        self.bindings.push(Binding {
            key,
            modifiers,
            shortcut,
        });
    }

    /// First binding whose key matches and whose modifiers are all held
    pub fn lookup(&self, press: &KeyPress) -> Option<Shortcut> {
        self.bindings
            .iter()
            .find(|b| b.key == press.key && press.modifiers.contains(b.modifiers))
            .map(|b| b.shortcut)
    }
}

/// Ordered context menu entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Menu {
    entries: Vec<Action>,
}

impl Menu {
    pub fn from_config(config: &Config, zoom_enabled: bool) -> Self {
        let mut entries = Vec::new();
        if zoom_enabled && config.menu.zoom {
            entries.extend([Action::ZoomIn, Action::ZoomOut, Action::ZoomReset]);
        }
        if config.menu.close {
            entries.push(Action::Close);
        }
        Self { entries }
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|a| a.label().to_string()).collect()
    }

    pub fn action_at(&self, index: usize) -> Option<Action> {
        self.entries.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(s: &str) -> KeyPress {
        s.parse().unwrap()
    }

    #[test]
    fn test_default_bindings() {
        let bindings = KeyBindings::from_config(&Config::default(), true);

        assert_eq!(
            bindings.lookup(&press("ctrl+plus")),
            Some(Shortcut::Run(Action::ZoomIn))
        );
        assert_eq!(
            bindings.lookup(&press("ctrl+equal")),
            Some(Shortcut::Run(Action::ZoomIn))
        );
        assert_eq!(
            bindings.lookup(&press("ctrl+minus")),
            Some(Shortcut::Run(Action::ZoomOut))
        );
        assert_eq!(
            bindings.lookup(&press("ctrl+0")),
            Some(Shortcut::Run(Action::ZoomReset))
        );
        assert_eq!(
            bindings.lookup(&press("alt+left")),
            Some(Shortcut::Run(Action::SeekBackward))
        );
        assert_eq!(
            bindings.lookup(&press("alt+right")),
            Some(Shortcut::Run(Action::SeekForward))
        );
        assert_eq!(
            bindings.lookup(&press("alt+home")),
            Some(Shortcut::Run(Action::SeekStart))
        );
        assert_eq!(bindings.lookup(&press("escape")), Some(Shortcut::CloseHeld));
    }

    #[test]
    fn test_modifiers_required_but_extra_allowed() {
        let bindings = KeyBindings::from_config(&Config::default(), true);

        assert_eq!(bindings.lookup(&press("plus")), None);
        assert_eq!(bindings.lookup(&press("left")), None);
        assert_eq!(
            bindings.lookup(&press("ctrl+shift+plus")),
            Some(Shortcut::Run(Action::ZoomIn))
        );
    }

    #[test]
    fn test_zoom_disabled_drops_zoom_keys() {
        let bindings = KeyBindings::from_config(&Config::default(), false);
        assert_eq!(bindings.lookup(&press("ctrl+plus")), None);
        assert_eq!(bindings.lookup(&press("ctrl+0")), None);
        assert!(bindings.lookup(&press("alt+home")).is_some());
    }

    #[test]
    fn test_shortcut_toggles() {
        let mut config = Config::default();
        config.shortcuts.zoom_out = false;
        config.shortcuts.hold_escape = false;
        let bindings = KeyBindings::from_config(&config, true);

        assert_eq!(bindings.lookup(&press("ctrl+minus")), None);
        assert_eq!(bindings.lookup(&press("escape")), None);
        assert!(bindings.lookup(&press("ctrl+plus")).is_some());
    }

    #[test]
    fn test_menu_entries() {
        let menu = Menu::from_config(&Config::default(), true);
        assert_eq!(
            menu.labels(),
            vec!["Zoom In", "Zoom Out", "Zoom Reset", "Close"]
        );
        assert_eq!(menu.action_at(2), Some(Action::ZoomReset));
        assert_eq!(menu.action_at(4), None);

        let menu = Menu::from_config(&Config::default(), false);
        assert_eq!(menu.labels(), vec!["Close"]);
    }
}
