//! Typed event bus
//!
//! - Events are a closed enum, routed by [`EventTopic`]
//! - Handler returns bool (true = consumed, stops forwarding)
//! - Registration system (only notify interested handlers)
//! - Queuing support (immediate publish + queued dispatch)
//!
//! The bus holds subscribers weakly. A handler that has been dropped is
//! reported and pruned the next time its topic fires.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::scene::NodeId;

/// Topic used to route events to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    /// Scene graph topology changes
    Scene,
    /// Window and framebuffer notifications
    Window,
}

/// Scene graph topology change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    /// A node was attached under `parent`
    NodeAdded {
        /// Attached node
        node: NodeId,
        /// Its new parent
        parent: NodeId,
    },
    /// A node was detached from `parent` and destroyed with its subtree
    NodeRemoved {
        /// Removed node
        node: NodeId,
        /// Its former parent
        parent: NodeId,
    },
}

/// Window notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// Framebuffer was resized
    Resized {
        /// New width in pixels
        width: u32,
        /// New height in pixels
        height: u32,
    },
}

/// Event delivered through the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Scene graph event
    Scene(SceneEvent),
    /// Window event
    Window(WindowEvent),
}

impl Event {
    /// Topic this event is routed on
    pub const fn topic(&self) -> EventTopic {
        match self {
            Self::Scene(_) => EventTopic::Scene,
            Self::Window(_) => EventTopic::Window,
        }
    }
}

/// Event handler trait
/// Returns true if event was consumed (stops forwarding)
/// Returns false to allow forwarding to other handlers
pub trait EventHandler {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &Event) -> bool;
}

type Subscriber = Weak<RefCell<dyn EventHandler>>;

/// Owned publish/subscribe bus
#[derive(Default)]
pub struct EventBus {
    queue: Vec<Event>,
    handlers: HashMap<EventTopic, Vec<Subscriber>>,
}

impl EventBus {
    /// Create a new empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a topic.
    ///
    /// The bus keeps only a weak reference; the caller owns the handler.
    pub fn subscribe<H: EventHandler + 'static>(&mut self, topic: EventTopic, handler: &Rc<RefCell<H>>) {
        let handler: Rc<RefCell<dyn EventHandler>> = handler.clone();
        self.handlers.entry(topic).or_default().push(Rc::downgrade(&handler));
    }

    /// Number of registered subscribers for a topic, including expired ones
    /// that have not been pruned yet
    pub fn subscriber_count(&self, topic: EventTopic) -> usize {
        self.handlers.get(&topic).map_or(0, Vec::len)
    }

    /// Queue an event for the next [`EventBus::dispatch`]
    pub fn send(&mut self, event: Event) {
        self.queue.push(event);
    }

    /// Deliver an event immediately
    pub fn publish(&mut self, event: &Event) {
        let Some(handlers) = self.handlers.get_mut(&event.topic()) else {
            return;
        };

        let before = handlers.len();
        handlers.retain(|handler| handler.strong_count() > 0);
        if handlers.len() < before {
            log::warn!(
                "Pruned {} expired {:?} event subscriber(s)",
                before - handlers.len(),
                event.topic()
            );
        }

        for handler in handlers.iter() {
            let Some(subscriber) = handler.upgrade() else { continue };
            let Ok(mut handler) = subscriber.try_borrow_mut() else {
                log::warn!("Skipped re-entrant delivery of {event:?}");
                continue;
            };
            if handler.on_event(event) {
                break;
            }
        }
    }

    /// Deliver all queued events in order
    pub fn dispatch(&mut self) {
        let queued = std::mem::take(&mut self.queue);
        for event in &queued {
            self.publish(event);
        }
    }

    /// Drop all queued events
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("queued", &self.queue.len())
            .field("topics", &self.handlers.len())
            .finish()
    }
}
