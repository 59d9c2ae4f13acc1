//! Synchronous event broadcast for status and item changes.
//!
//! Listeners subscribe with a channel; `broadcast` sends to every registered
//! listener from the thread that fires the event. A listener whose receiver
//! was dropped is pruned on the next broadcast.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Status;

/// A lifecycle or exchange-item notification.
#[derive(Clone, Debug)]
pub enum Event {
  StatusChanged {
    component: String,
    old: Status,
    new: Status,
  },
  ItemChanged {
    item: String,
    message: String,
  },
}

/// Listener registry.
#[derive(Default)]
pub struct EventBus {
  listeners: Vec<Sender<Event>>,
}

impl EventBus {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a listener and hand back its receiving end.
  pub fn subscribe(&mut self) -> Receiver<Event> {
    let (tx, rx) = unbounded();
    self.listeners.push(tx);
    rx
  }

  /// Deliver an event to every live listener.
  pub fn broadcast(&mut self, event: Event) {
    self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
  }

  pub fn listener_count(&self) -> usize {
    self.listeners.len()
  }
}
