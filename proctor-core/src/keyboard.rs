//! Keyboard shortcut decision table.
//!
//! Ctrl/Cmd + C, V and X are deliberately absent: they bubble into the clipboard observers,
//! which capture the clipboard content before suppressing.
use serde_json::{Value, json};

use crate::platform::KeyInput;

pub const DEVTOOLS: &str = "Developer Tools attempt";
pub const DEVTOOLS_PANELS: &str = "Developer Tools (Inspect/Console/Element) attempt";
pub const VIEW_SOURCE: &str = "View Source attempt";

/// What to do with one keydown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShortcutVerdict {
    /// `false` when the browser cannot reliably be stopped from the page (PrintScreen, Alt+Tab)
    pub suppress: bool,
    pub key: String,
    pub description: Option<&'static str>,
}

impl ShortcutVerdict {
    fn suppressed(key: String, description: Option<&'static str>) -> Self {
        Self {
            suppress: true,
            key,
            description,
        }
    }

    fn logged(key: &str) -> Self {
        Self {
            suppress: false,
            key: key.to_string(),
            description: None,
        }
    }

    /// `meta_data` of the `keyboard_shortcut` activity
    pub fn meta_data(&self) -> Value {
        match self.description {
            Some(description) => json!({"key": self.key, "description": description}),
            None => json!({"key": self.key}),
        }
    }
}

/// Classifies a keydown; `None` means the key is of no interest.
pub fn classify(input: &KeyInput) -> Option<ShortcutVerdict> {
    if input.key == "F12" {
        return Some(ShortcutVerdict::suppressed("F12".to_string(), Some(DEVTOOLS)));
    }

    let primary = input.ctrl || input.meta;
    let letter = input.key.to_lowercase();

    if primary && input.shift && matches!(letter.as_str(), "i" | "j" | "c") {
        return Some(ShortcutVerdict::suppressed(
            shortcut_label(input, &letter),
            Some(DEVTOOLS_PANELS),
        ));
    }
    if primary && letter == "u" {
        return Some(ShortcutVerdict::suppressed(
            shortcut_label(input, &letter),
            Some(VIEW_SOURCE),
        ));
    }
    if primary && matches!(letter.as_str(), "a" | "p" | "s") {
        return Some(ShortcutVerdict::suppressed(shortcut_label(input, &letter), None));
    }

    if input.key == "PrintScreen" {
        return Some(ShortcutVerdict::logged("PrintScreen"));
    }
    if input.alt && input.key == "Tab" {
        return Some(ShortcutVerdict::logged("Alt+Tab"));
    }

    None
}

/// `Ctrl+Alt+Shift+S`, with `Cmd` in place of `Ctrl` when only meta is held
fn shortcut_label(input: &KeyInput, letter: &str) -> String {
    let mut label = String::from(if input.meta && !input.ctrl { "Cmd" } else { "Ctrl" });
    if input.alt {
        label.push_str("+Alt");
    }
    if input.shift {
        label.push_str("+Shift");
    }
    label.push('+');
    label.push_str(&letter.to_uppercase());
    label
}
