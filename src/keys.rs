use crate::config::KeyConfig;

/// The parts of a key-down event the shortcuts care about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyPress {
    pub fn plain(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn has_modifier(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    ToggleSpeed,
    TogglePause,
}

impl Shortcut {
    /// Shortcuts triggered by `press`, in the order they should run. Both bindings are checked
    /// independently, so a config binding the same key twice fires both.
    pub fn matching(press: &KeyPress, keys: &KeyConfig) -> Vec<Self> {
        if press.has_modifier() {
            return vec![];
        }
        let key = press.key.to_lowercase();
        let mut shortcuts = vec![];
        if key == keys.toggle.to_lowercase() {
            shortcuts.push(Self::ToggleSpeed);
        }
        if key == keys.pause.to_lowercase() {
            shortcuts.push(Self::TogglePause);
        }
        shortcuts
    }
}

/// Snapshot of the element holding focus when a key went down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusedElement {
    pub tag_name: String,
    pub content_editable: bool,
    pub contenteditable_attr: Option<String>,
}

impl FocusedElement {
    pub fn tag(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Self::default()
        }
    }

    /// True when keystrokes are going into a text field and must not be hijacked.
    pub fn accepts_text(&self) -> bool {
        let tag = self.tag_name.to_ascii_uppercase();
        tag == "INPUT"
            || tag == "TEXTAREA"
            || self.content_editable
            || self.contenteditable_attr.as_deref() == Some("true")
    }
}
