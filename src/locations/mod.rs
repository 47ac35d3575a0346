//! Location index
//!
//! Partitions a publication's text into fixed-size chunks and keeps one
//! range CFI per chunk, in reading order. The index supports percentage
//! navigation and binary-search lookup of arbitrary CFIs.
//!
//! Generation is asynchronous and walks the spine one section at a time
//! through a [`QueueHandle`], which other tasks can use to pause, resume or
//! stop it.

mod chunker;
mod events;
mod queue;

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::cfi::{compare, CanonicalAddress};
use crate::config::LocationsConfig;
use crate::error::Result;
use crate::loader::SectionLoader;
use crate::spine::{Section, Spine};

pub use chunker::WordLocation;
pub use events::{LocationChanged, Subscription};
pub use queue::{QueueHandle, QueueState};

use events::Listeners;

/// One entry of the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationEntry<'a> {
    pub ordinal: usize,
    pub address: &'a CanonicalAddress,
}

/// A location to make current
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentLocation {
    Address(CanonicalAddress),
    Index(usize),
}

/// Ordered location index for one publication
#[derive(Debug)]
pub struct Locations {
    entries: Vec<CanonicalAddress>,
    break_size: usize,
    word_break: usize,
    current: Option<usize>,
    queue: QueueHandle,
    listeners: Listeners,
}

impl Locations {
    pub fn new(config: &LocationsConfig) -> Self {
        Self {
            entries: Vec::new(),
            break_size: config.break_size,
            word_break: config.word_break,
            current: None,
            queue: QueueHandle::new(),
            listeners: Listeners::default(),
        }
    }

    /// Handle for pausing, resuming or stopping generation from another task
    pub fn queue(&self) -> QueueHandle {
        self.queue.clone()
    }

    pub fn break_size(&self) -> usize {
        self.break_size
    }

    /// Build the index in character mode, replacing any previous one.
    ///
    /// Non-linear sections are skipped, as are sections that fail to load.
    pub async fn generate<L: SectionLoader>(
        &mut self,
        spine: &Spine,
        loader: &L,
    ) -> &[CanonicalAddress] {
        self.reset();
        let sections: Vec<Section> = spine.linear().cloned().collect();
        let break_size = self.break_size;

        let entries = self
            .queue
            .process(&sections, loader, None, |section, doc| {
                let base = section.base()?;
                Ok(chunker::character_chunks(doc, &base, break_size)?)
            })
            .await;

        self.entries = entries;
        info!(
            sections = sections.len(),
            locations = self.entries.len(),
            break_size,
            "Generated locations"
        );
        &self.entries
    }

    /// Build the index in word mode, replacing any previous one.
    ///
    /// With `start`, sections before its spine position and text before
    /// it are skipped. With `count`, generation ends after that many
    /// locations.
    pub async fn generate_from_words<L: SectionLoader>(
        &mut self,
        spine: &Spine,
        loader: &L,
        start: Option<&CanonicalAddress>,
        count: Option<usize>,
    ) -> Vec<WordLocation> {
        self.reset();
        let sections: Vec<Section> = spine
            .linear()
            .filter(|section| start.map_or(true, |s| section.index >= s.spine_position))
            .cloned()
            .collect();
        let word_break = self.word_break;

        let words = self
            .queue
            .process(&sections, loader, count, |section, doc| {
                let base = section.base()?;
                let from = start.filter(|s| s.spine_position == section.index);
                Ok(chunker::word_chunks(doc, &base, word_break, from)?)
            })
            .await;

        self.entries = words.iter().map(|w| w.address.clone()).collect();
        info!(
            sections = sections.len(),
            locations = words.len(),
            word_break,
            "Generated word locations"
        );
        words
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.current = None;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn addresses(&self) -> &[CanonicalAddress] {
        &self.entries
    }

    pub fn entries(&self) -> impl Iterator<Item = LocationEntry<'_>> {
        self.entries
            .iter()
            .enumerate()
            .map(|(ordinal, address)| LocationEntry { ordinal, address })
    }

    /// Index of the last entry not after `cfi` (0 when `cfi` precedes
    /// every entry); `None` when the index is empty
    pub fn index_from_address(&self, cfi: &CanonicalAddress) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let after = self
            .entries
            .partition_point(|entry| compare(entry, cfi) != Ordering::Greater);
        Some(after.saturating_sub(1).min(self.entries.len() - 1))
    }

    /// `index / (len - 1)`, or 0 for indexes of fewer than two entries
    pub fn percentage_from_index(&self, index: usize) -> f64 {
        let last = self.entries.len().saturating_sub(1);
        if last == 0 {
            return 0.0;
        }
        (index.min(last) as f64) / (last as f64)
    }

    pub fn percentage_from_address(&self, cfi: &CanonicalAddress) -> f64 {
        self.index_from_address(cfi)
            .map(|index| self.percentage_from_index(index))
            .unwrap_or(0.0)
    }

    pub fn address_from_index(&self, index: usize) -> Option<&CanonicalAddress> {
        self.entries.get(index)
    }

    /// Entry at `ceil((len - 1) * percentage)`; at or past 1.0 the last
    /// entry collapsed to its end
    pub fn address_from_percentage(&self, percentage: f64) -> Option<CanonicalAddress> {
        let last_entry = self.entries.last()?;
        if percentage >= 1.0 {
            return Some(last_entry.collapse(false));
        }
        let last = (self.entries.len() - 1) as f64;
        let index = (last * percentage.max(0.0)).ceil() as usize;
        self.address_from_index(index).cloned()
    }

    /// Serialize the index as a JSON array of CFI strings
    pub fn save(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    /// Replace the index with a saved one
    pub fn load(&mut self, json: &str) -> Result<&[CanonicalAddress]> {
        let entries: Vec<CanonicalAddress> = serde_json::from_str(json)?;
        self.reset();
        self.entries = entries;
        debug!(locations = self.entries.len(), "Loaded locations");
        Ok(&self.entries)
    }

    /// Current ordinal, if one was set
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Make a location current and notify listeners.
    ///
    /// Returns the emitted event, or `None` when the location is outside
    /// the index.
    pub fn set_current(&mut self, location: CurrentLocation) -> Option<LocationChanged> {
        let index = match location {
            CurrentLocation::Address(cfi) => self.index_from_address(&cfi)?,
            CurrentLocation::Index(index) => index,
        };
        let address = self.entries.get(index)?.clone();

        self.current = Some(index);
        let event = LocationChanged {
            index,
            percentage: self.percentage_from_index(index),
            address,
        };
        self.listeners.emit(&event);
        Some(event)
    }

    /// Register a listener for current-location changes
    pub fn on_changed<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(LocationChanged) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.listeners.unsubscribe(subscription)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for Locations {
    fn default() -> Self {
        Self::new(&LocationsConfig::default())
    }
}
