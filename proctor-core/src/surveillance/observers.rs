use serde_json::json;

use super::Observer;
use crate::{
    activity::ActivityLogger,
    keyboard,
    platform::{BrowserEvent, Document, EventKind, EventPayload, EventTarget},
};

pub struct VisibilityObserver;

impl Observer for VisibilityObserver {
    fn name(&self) -> &'static str {
        "visibility"
    }

    fn bindings(&self) -> &'static [(EventTarget, EventKind)] {
        &[(EventTarget::Document, EventKind::VisibilityChange)]
    }

    fn on_event(&self, _event: &BrowserEvent, document: &dyn Document, logger: &ActivityLogger) {
        let state = document.visibility_state();
        logger.log_activity("tab_switched", json!({"type": state.as_str()}));
    }
}

pub struct FocusObserver;

impl Observer for FocusObserver {
    fn name(&self) -> &'static str {
        "window_focus"
    }

    fn bindings(&self) -> &'static [(EventTarget, EventKind)] {
        &[
            (EventTarget::Window, EventKind::Blur),
            (EventTarget::Window, EventKind::Focus),
        ]
    }

    fn on_event(&self, event: &BrowserEvent, _document: &dyn Document, logger: &ActivityLogger) {
        match event.kind() {
            EventKind::Blur => logger.log("window_blur"),
            EventKind::Focus => logger.log("window_focus"),
            _ => {}
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipboardAction {
    Copy,
    Paste,
    Cut,
}

pub struct ClipboardObserver {
    action: ClipboardAction,
}

impl ClipboardObserver {
    pub fn new(action: ClipboardAction) -> Self {
        Self { action }
    }
}

impl Observer for ClipboardObserver {
    fn name(&self) -> &'static str {
        match self.action {
            ClipboardAction::Copy => "copy",
            ClipboardAction::Paste => "paste",
            ClipboardAction::Cut => "cut",
        }
    }

    fn bindings(&self) -> &'static [(EventTarget, EventKind)] {
        match self.action {
            ClipboardAction::Copy => &[(EventTarget::Document, EventKind::Copy)],
            ClipboardAction::Paste => &[(EventTarget::Document, EventKind::Paste)],
            ClipboardAction::Cut => &[(EventTarget::Document, EventKind::Cut)],
        }
    }

    fn on_event(&self, event: &BrowserEvent, document: &dyn Document, logger: &ActivityLogger) {
        // Content is read before the default action is cancelled.
        let (activity_type, meta_data) = match self.action {
            ClipboardAction::Copy => (
                "copy_detected",
                json!({"key": "Ctrl+C", "copied_text": document.selection_text()}),
            ),
            ClipboardAction::Cut => (
                "cut_detected",
                json!({"key": "Ctrl+X", "cut_text": document.selection_text()}),
            ),
            ClipboardAction::Paste => {
                let pasted = match event.payload() {
                    EventPayload::Clipboard(Some(text)) => text.clone(),
                    _ => String::new(),
                };
                (
                    "paste_detected",
                    json!({"key": "Ctrl+V", "pasted_text": pasted}),
                )
            }
        };
        event.prevent_default();
        logger.log_activity(activity_type, meta_data);
    }
}

pub struct ContextMenuObserver;

impl Observer for ContextMenuObserver {
    fn name(&self) -> &'static str {
        "context_menu"
    }

    fn bindings(&self) -> &'static [(EventTarget, EventKind)] {
        &[(EventTarget::Document, EventKind::ContextMenu)]
    }

    fn on_event(&self, event: &BrowserEvent, _document: &dyn Document, logger: &ActivityLogger) {
        event.prevent_default();
        let meta_data = match event.payload() {
            EventPayload::Pointer { x, y } => json!({"x": x, "y": y}),
            _ => json!({}),
        };
        logger.log_activity("right_click_detected", meta_data);
    }
}

/// Silently cancels drag and drop.
pub struct DragObserver;

impl Observer for DragObserver {
    fn name(&self) -> &'static str {
        "drag_drop"
    }

    fn bindings(&self) -> &'static [(EventTarget, EventKind)] {
        &[
            (EventTarget::Document, EventKind::DragStart),
            (EventTarget::Document, EventKind::Drop),
            (EventTarget::Document, EventKind::DragOver),
        ]
    }

    fn on_event(&self, event: &BrowserEvent, _document: &dyn Document, _logger: &ActivityLogger) {
        event.prevent_default();
    }
}

pub struct FullscreenObserver;

impl Observer for FullscreenObserver {
    fn name(&self) -> &'static str {
        "fullscreen"
    }

    fn bindings(&self) -> &'static [(EventTarget, EventKind)] {
        &[(EventTarget::Document, EventKind::FullscreenChange)]
    }

    fn on_event(&self, _event: &BrowserEvent, document: &dyn Document, logger: &ActivityLogger) {
        if document.fullscreen_active() {
            logger.log("fullscreen_enter");
        } else {
            logger.log("fullscreen_exit");
        }
    }
}

pub struct KeyboardObserver;

impl Observer for KeyboardObserver {
    fn name(&self) -> &'static str {
        "keyboard"
    }

    fn bindings(&self) -> &'static [(EventTarget, EventKind)] {
        &[(EventTarget::Document, EventKind::KeyDown)]
    }

    fn on_event(&self, event: &BrowserEvent, _document: &dyn Document, logger: &ActivityLogger) {
        let EventPayload::Key(input) = event.payload() else {
            return;
        };
        let Some(verdict) = keyboard::classify(input) else {
            return;
        };
        if verdict.suppress {
            event.prevent_default();
        }
        logger.log_activity("keyboard_shortcut", verdict.meta_data());
    }
}
