//! Minimal publish/subscribe primitive shared by every manager.
//!
//! Managers own a private `EventEmitter` and expose `on`/`off` that forward
//! to it, so nothing has to inherit from an emitter base. Each manager emits
//! its own event enum, which keeps payloads typed.
//!
//! # Examples
//!
//! ```ignore
//! use deepzoom_annotator::event::EventEmitter;
//!
//! let mut emitter: EventEmitter<String> = EventEmitter::new();
//! let id = emitter.on(|msg| println!("got {msg}"));
//! emitter.emit(&"hello".to_string());
//! emitter.off(id);
//! ```

use std::fmt;

/// Handle returned by [`EventEmitter::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler<E> = Box<dyn FnMut(&E)>;

/// A list of event handlers for one event type.
pub struct EventEmitter<E> {
    listeners: Vec<(ListenerId, Handler<E>)>,
    next_id: u64,
}

impl<E> EventEmitter<E> {
    /// Create an emitter with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Subscribe a handler. Handlers run in subscription order.
    pub fn on<F>(&mut self, handler: F) -> ListenerId
    where
        F: FnMut(&E) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(handler)));
        id
    }

    /// Unsubscribe a handler. Returns false if the id was not subscribed.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Deliver an event to every listener.
    pub fn emit(&mut self, event: &E) {
        for (_, handler) in self.listeners.iter_mut() {
            handler(event);
        }
    }

    /// Remove every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Number of subscribed listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
