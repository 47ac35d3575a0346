//! Location change notifications

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cfi::CanonicalAddress;

/// Emitted when the current location changes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationChanged {
    pub index: usize,
    pub percentage: f64,
    pub address: CanonicalAddress,
}

/// Token returned by [`super::Locations::on_changed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subscription(u64);

type Listener = Box<dyn FnMut(LocationChanged) + Send + Sync>;

/// Registered change listeners, called in subscription order
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

impl Listeners {
    pub(crate) fn subscribe<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(LocationChanged) + Send + Sync + 'static,
    {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.listeners.insert(id, Box::new(listener));
        Subscription(id)
    }

    pub(crate) fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.listeners.remove(&subscription.0).is_some()
    }

    pub(crate) fn emit(&mut self, event: &LocationChanged) {
        for listener in self.listeners.values_mut() {
            listener(event.clone());
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}
