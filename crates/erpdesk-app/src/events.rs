// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Cached role listings are stale and should be reloaded.
    RolesUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

/// Receiving end handed to a screen for the duration of its lifecycle.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Drains every pending event without blocking.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}

#[derive(Debug, Default)]
pub struct ChangeNotifier {
    next_id: u64,
    subscribers: Vec<(SubscriberId, Sender<ChangeEvent>)>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Subscription {
        self.next_id += 1;
        let id = SubscriberId(self.next_id);
        let (tx, rx) = mpsc::channel();
        self.subscribers.push((id, tx));
        Subscription { id, rx }
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(subscriber, _)| *subscriber != id);
        self.subscribers.len() != before
    }

    /// Returns the number of subscribers reached; dropped receivers are pruned.
    pub fn publish(&mut self, event: ChangeEvent) -> usize {
        self.subscribers.retain(|(_, tx)| tx.send(event).is_ok());
        tracing::debug!(?event, subscribers = self.subscribers.len(), "published change");
        self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
