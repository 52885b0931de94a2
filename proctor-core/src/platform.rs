//! Browser surface consumed by the monitor.
//!
//! A host adapts its real document/window to [`Document`]. [`SyntheticDocument`] is an in-memory
//! implementation for headless hosts and tests.
use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Document,
    Window,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    VisibilityChange,
    Blur,
    Focus,
    Copy,
    Paste,
    Cut,
    ContextMenu,
    DragStart,
    Drop,
    DragOver,
    FullscreenChange,
    KeyDown,
}

impl EventKind {
    /// DOM event name
    pub fn dom_name(&self) -> &'static str {
        match self {
            EventKind::VisibilityChange => "visibilitychange",
            EventKind::Blur => "blur",
            EventKind::Focus => "focus",
            EventKind::Copy => "copy",
            EventKind::Paste => "paste",
            EventKind::Cut => "cut",
            EventKind::ContextMenu => "contextmenu",
            EventKind::DragStart => "dragstart",
            EventKind::Drop => "drop",
            EventKind::DragOver => "dragover",
            EventKind::FullscreenChange => "fullscreenchange",
            EventKind::KeyDown => "keydown",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisibilityState {
    Visible,
    Hidden,
}

impl VisibilityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityState::Visible => "visible",
            VisibilityState::Hidden => "hidden",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyInput {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
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

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EventPayload {
    Empty,
    /// `clipboardData.getData('text')`, when the event carries it
    Clipboard(Option<String>),
    Pointer { x: f64, y: f64 },
    Key(KeyInput),
}

/// A dispatched browser event. `prevent_default` calls are counted.
#[derive(Debug)]
pub struct BrowserEvent {
    kind: EventKind,
    payload: EventPayload,
    prevented: AtomicUsize,
}

impl BrowserEvent {
    pub fn new(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            kind,
            payload,
            prevented: AtomicUsize::new(0),
        }
    }

    pub fn plain(kind: EventKind) -> Self {
        Self::new(kind, EventPayload::Empty)
    }

    pub fn key(input: KeyInput) -> Self {
        Self::new(EventKind::KeyDown, EventPayload::Key(input))
    }

    pub fn clipboard(kind: EventKind, data: Option<String>) -> Self {
        Self::new(kind, EventPayload::Clipboard(data))
    }

    pub fn context_menu(x: f64, y: f64) -> Self {
        Self::new(EventKind::ContextMenu, EventPayload::Pointer { x, y })
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn prevent_default(&self) {
        self.prevented.fetch_add(1, Ordering::AcqRel);
    }

    pub fn default_prevented(&self) -> bool {
        self.prevent_default_calls() > 0
    }

    pub fn prevent_default_calls(&self) -> usize {
        self.prevented.load(Ordering::Acquire)
    }
}

pub type Listener = Arc<dyn Fn(&BrowserEvent) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

pub trait Document: Send + Sync {
    fn add_listener(&self, target: EventTarget, kind: EventKind, listener: Listener) -> ListenerId;

    /// Removing an unknown or already removed id is a no-op.
    fn remove_listener(&self, id: ListenerId);

    /// Whether the host exposes the API behind `kind`. Unsupported kinds never get a listener.
    fn supports(&self, _kind: EventKind) -> bool {
        true
    }

    fn visibility_state(&self) -> VisibilityState;

    /// `document.fullscreenElement !== null`
    fn fullscreen_active(&self) -> bool;

    /// `window.getSelection().toString()`
    fn selection_text(&self) -> String;
}

struct Registration {
    id: ListenerId,
    target: EventTarget,
    kind: EventKind,
    listener: Listener,
}

struct SyntheticState {
    next_id: u64,
    registrations: Vec<Registration>,
    visibility: VisibilityState,
    fullscreen: bool,
    selection: String,
    unsupported: HashSet<EventKind>,
}

/// In-memory document: listeners run synchronously on [`SyntheticDocument::dispatch`].
pub struct SyntheticDocument {
    state: Mutex<SyntheticState>,
}

impl Default for SyntheticDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticDocument {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SyntheticState {
                next_id: 0,
                registrations: Vec::new(),
                visibility: VisibilityState::Visible,
                fullscreen: false,
                selection: String::new(),
                unsupported: HashSet::new(),
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SyntheticState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs every listener registered for `(target, event.kind())`.
    pub fn dispatch(&self, target: EventTarget, event: &BrowserEvent) {
        // Listeners may add or remove registrations, so they run outside the lock.
        let listeners: Vec<Listener> = self
            .state()
            .registrations
            .iter()
            .filter(|r| r.target == target && r.kind == event.kind())
            .map(|r| Arc::clone(&r.listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Dispatches on the document and hands the event back for inspection.
    pub fn fire(&self, event: BrowserEvent) -> BrowserEvent {
        self.dispatch(EventTarget::Document, &event);
        event
    }

    pub fn fire_on_window(&self, event: BrowserEvent) -> BrowserEvent {
        self.dispatch(EventTarget::Window, &event);
        event
    }

    pub fn set_visibility(&self, visibility: VisibilityState) {
        self.state().visibility = visibility;
        self.dispatch(
            EventTarget::Document,
            &BrowserEvent::plain(EventKind::VisibilityChange),
        );
    }

    pub fn set_fullscreen(&self, active: bool) {
        self.state().fullscreen = active;
        self.dispatch(
            EventTarget::Document,
            &BrowserEvent::plain(EventKind::FullscreenChange),
        );
    }

    pub fn select_text(&self, text: impl Into<String>) {
        self.state().selection = text.into();
    }

    pub fn mark_unsupported(&self, kind: EventKind) {
        self.state().unsupported.insert(kind);
    }

    pub fn listener_count(&self) -> usize {
        self.state().registrations.len()
    }
}

impl Document for SyntheticDocument {
    fn add_listener(&self, target: EventTarget, kind: EventKind, listener: Listener) -> ListenerId {
        let mut state = self.state();
        let id = ListenerId(state.next_id);
        state.next_id += 1;
        state.registrations.push(Registration {
            id,
            target,
            kind,
            listener,
        });
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.state().registrations.retain(|r| r.id != id);
    }

    fn supports(&self, kind: EventKind) -> bool {
        !self.state().unsupported.contains(&kind)
    }

    fn visibility_state(&self) -> VisibilityState {
        self.state().visibility
    }

    fn fullscreen_active(&self) -> bool {
        self.state().fullscreen
    }

    fn selection_text(&self) -> String {
        self.state().selection.clone()
    }
}
