//! Event surveillance: independent observers, each with its own attach/detach pair.
use std::sync::{Arc, Weak};

use tracing::debug;

use crate::{
    activity::ActivityLogger,
    platform::{BrowserEvent, Document, EventKind, EventTarget, Listener, ListenerId},
};

mod observers;

pub use observers::{
    ClipboardAction, ClipboardObserver, ContextMenuObserver, DragObserver, FocusObserver,
    FullscreenObserver, KeyboardObserver, VisibilityObserver,
};

/// Translates raw browser events into suppression and/or logged activity.
pub trait Observer: Send + Sync {
    fn name(&self) -> &'static str;

    fn bindings(&self) -> &'static [(EventTarget, EventKind)];

    fn on_event(&self, event: &BrowserEvent, document: &dyn Document, logger: &ActivityLogger);
}

/// Listeners one observer holds on a document. Detaching twice is a no-op.
pub struct Subscription {
    name: &'static str,
    document: Weak<dyn Document>,
    ids: Vec<ListenerId>,
}

impl Subscription {
    pub fn attach(
        observer: Arc<dyn Observer>,
        document: &Arc<dyn Document>,
        logger: &ActivityLogger,
    ) -> Self {
        let mut ids = Vec::new();
        for &(target, kind) in observer.bindings() {
            if !document.supports(kind) {
                debug!(
                    observer = observer.name(),
                    event = kind.dom_name(),
                    "event unsupported by host, not observing"
                );
                continue;
            }
            let listener = listener(Arc::clone(&observer), Arc::downgrade(document), logger.clone());
            ids.push(document.add_listener(target, kind, listener));
        }

        Self {
            name: observer.name(),
            document: Arc::downgrade(document),
            ids,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_attached(&self) -> bool {
        !self.ids.is_empty()
    }

    pub fn detach(&mut self) {
        if self.ids.is_empty() {
            return;
        }
        if let Some(document) = self.document.upgrade() {
            for id in self.ids.drain(..) {
                document.remove_listener(id);
            }
        } else {
            self.ids.clear();
        }
        debug!(observer = self.name, "detached");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

fn listener(
    observer: Arc<dyn Observer>,
    document: Weak<dyn Document>,
    logger: ActivityLogger,
) -> Listener {
    Arc::new(move |event: &BrowserEvent| {
        // Gate at call time: the session may have been disabled since attach.
        if !logger.is_enabled() {
            return;
        }
        let Some(document) = document.upgrade() else {
            return;
        };
        observer.on_event(event, document.as_ref(), &logger);
    })
}

/// The observers wired for every proctored session.
#[derive(Clone)]
pub struct SurveillanceSet {
    observers: Vec<Arc<dyn Observer>>,
}

impl Default for SurveillanceSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl SurveillanceSet {
    pub fn standard() -> Self {
        Self {
            observers: vec![
                Arc::new(VisibilityObserver),
                Arc::new(FocusObserver),
                Arc::new(ClipboardObserver::new(ClipboardAction::Copy)),
                Arc::new(ClipboardObserver::new(ClipboardAction::Paste)),
                Arc::new(ClipboardObserver::new(ClipboardAction::Cut)),
                Arc::new(ContextMenuObserver),
                Arc::new(DragObserver),
                Arc::new(FullscreenObserver),
                Arc::new(KeyboardObserver),
            ],
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn attach(&self, document: &Arc<dyn Document>, logger: &ActivityLogger) -> AttachedSurveillance {
        let subscriptions = self
            .observers
            .iter()
            .map(|observer| Subscription::attach(Arc::clone(observer), document, logger))
            .collect();
        AttachedSurveillance { subscriptions }
    }
}

pub struct AttachedSurveillance {
    subscriptions: Vec<Subscription>,
}

impl AttachedSurveillance {
    pub fn detach(&mut self) {
        for subscription in self.subscriptions.iter_mut() {
            subscription.detach();
        }
    }

    pub fn attached(&self) -> Vec<&'static str> {
        self.subscriptions
            .iter()
            .filter(|s| s.is_attached())
            .map(Subscription::name)
            .collect()
    }
}
