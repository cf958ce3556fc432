use crate::model::ActionKind;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Down,
    Up,
    ToggleFocus,
    Refresh,
    Container(ActionKind),
}

pub struct KeyBinding {
    pub keys: &'static str,
    pub label: &'static str,
}

/// Bindings listed in the legend, in display order. `map_key` below must
/// accept every key named here.
pub const KEY_BINDINGS: [KeyBinding; 9] = [
    KeyBinding {
        keys: "↑/↓",
        label: "Navigate",
    },
    KeyBinding {
        keys: "esc",
        label: "Focus",
    },
    KeyBinding {
        keys: "e",
        label: "Exec shell",
    },
    KeyBinding {
        keys: "s",
        label: "Stop",
    },
    KeyBinding {
        keys: "r",
        label: "Restart/Start",
    },
    KeyBinding {
        keys: "d",
        label: "Delete",
    },
    KeyBinding {
        keys: "o",
        label: "Open in browser",
    },
    KeyBinding {
        keys: "F5",
        label: "Refresh",
    },
    KeyBinding {
        keys: "q",
        label: "Quit",
    },
];

pub fn legend() -> String {
    KEY_BINDINGS
        .iter()
        .map(|binding| format!("{}: {}", binding.keys, binding.label))
        .collect::<Vec<_>>()
        .join(" • ")
}

pub fn map_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('j') if key.modifiers.is_empty() => Some(Action::Down),
        KeyCode::Up => Some(Action::Up),
        KeyCode::Char('k') if key.modifiers.is_empty() => Some(Action::Up),
        KeyCode::Esc => Some(Action::ToggleFocus),
        KeyCode::F(5) => Some(Action::Refresh),
        KeyCode::Char('e') if key.modifiers.is_empty() => {
            Some(Action::Container(ActionKind::Attach))
        }
        KeyCode::Char('s') if key.modifiers.is_empty() => Some(Action::Container(ActionKind::Stop)),
        KeyCode::Char('r') if key.modifiers.is_empty() => {
            Some(Action::Container(ActionKind::Restart))
        }
        KeyCode::Char('d') if key.modifiers.is_empty() => {
            Some(Action::Container(ActionKind::Delete))
        }
        KeyCode::Char('o') if key.modifiers.is_empty() => Some(Action::Container(ActionKind::Open)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, KEY_BINDINGS, legend, map_key};
    use crate::model::ActionKind;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn codes_for(keys: &str) -> Vec<KeyCode> {
        keys.split('/')
            .map(|token| match token {
                "↑" => KeyCode::Up,
                "↓" => KeyCode::Down,
                "esc" => KeyCode::Esc,
                "F5" => KeyCode::F(5),
                single => KeyCode::Char(single.chars().next().unwrap_or(' ')),
            })
            .collect()
    }

    #[test]
    fn maps_quit_keys() {
        assert_eq!(map_key(key(KeyCode::Char('q'))), Some(Action::Quit));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(ctrl_c), Some(Action::Quit));
    }

    #[test]
    fn maps_container_action_letters() {
        let expected = [
            ('e', ActionKind::Attach),
            ('s', ActionKind::Stop),
            ('r', ActionKind::Restart),
            ('d', ActionKind::Delete),
            ('o', ActionKind::Open),
        ];
        for (letter, kind) in expected {
            assert_eq!(
                map_key(key(KeyCode::Char(letter))),
                Some(Action::Container(kind))
            );
        }
    }

    #[test]
    fn ctrl_modified_letters_are_not_actions() {
        let ctrl_d = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert_eq!(map_key(ctrl_d), None);
    }

    #[test]
    fn maps_vim_navigation_aliases() {
        assert_eq!(map_key(key(KeyCode::Char('j'))), Some(Action::Down));
        assert_eq!(map_key(key(KeyCode::Char('k'))), Some(Action::Up));
    }

    #[test]
    fn every_legend_binding_is_mapped() {
        for binding in KEY_BINDINGS.iter() {
            for code in codes_for(binding.keys) {
                assert!(
                    map_key(key(code)).is_some(),
                    "legend key {:?} is not mapped",
                    code
                );
            }
        }
    }

    #[test]
    fn legend_lists_bindings_in_order() {
        let legend = legend();
        assert!(legend.starts_with("↑/↓: Navigate • esc: Focus"));
        assert!(legend.ends_with("F5: Refresh • q: Quit"));
    }
}
