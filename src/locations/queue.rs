//! Section processing queue
//!
//! Generation walks the spine one section at a time, yielding to the
//! scheduler between sections. A [`QueueHandle`] can be cloned into other
//! tasks to pause, resume or stop the walk while it runs.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::error::Result;
use crate::loader::SectionLoader;
use crate::spine::Section;

/// Lifecycle of a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Running,
    Paused,
    Stopped,
}

#[derive(Debug)]
struct Progress {
    state: QueueState,
    completed: usize,
    total: usize,
}

#[derive(Debug)]
struct Shared {
    progress: Mutex<Progress>,
    resumed: Notify,
}

/// Cloneable control handle for a running (or idle) generation
#[derive(Debug, Clone)]
pub struct QueueHandle {
    shared: Arc<Shared>,
}

impl Default for QueueHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueHandle {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                progress: Mutex::new(Progress {
                    state: QueueState::Idle,
                    completed: 0,
                    total: 0,
                }),
                resumed: Notify::new(),
            }),
        }
    }

    pub fn state(&self) -> QueueState {
        self.shared.progress.lock().state
    }

    /// Sections finished and sections queued in the current run
    pub fn progress(&self) -> (usize, usize) {
        let progress = self.shared.progress.lock();
        (progress.completed, progress.total)
    }

    /// Hold the queue before its next section. No effect unless running.
    pub fn pause(&self) {
        let mut progress = self.shared.progress.lock();
        if progress.state == QueueState::Running {
            progress.state = QueueState::Paused;
        }
    }

    /// Continue a paused queue
    pub fn resume(&self) {
        {
            let mut progress = self.shared.progress.lock();
            if progress.state != QueueState::Paused {
                return;
            }
            progress.state = QueueState::Running;
        }
        self.shared.resumed.notify_waiters();
    }

    /// Drop the pending sections. The section in flight is discarded;
    /// sections already finished keep their results.
    pub fn stop(&self) {
        {
            let mut progress = self.shared.progress.lock();
            if matches!(progress.state, QueueState::Idle | QueueState::Stopped) {
                return;
            }
            progress.state = QueueState::Stopped;
        }
        self.shared.resumed.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == QueueState::Stopped
    }

    fn begin(&self, total: usize) {
        let mut progress = self.shared.progress.lock();
        progress.state = QueueState::Running;
        progress.completed = 0;
        progress.total = total;
    }

    fn finish(&self) {
        let mut progress = self.shared.progress.lock();
        if progress.state != QueueState::Stopped {
            progress.state = QueueState::Idle;
        }
    }

    fn complete_one(&self) {
        self.shared.progress.lock().completed += 1;
    }

    /// Wait out a pause. Returns `false` once the queue is stopped.
    async fn ready(&self) -> bool {
        loop {
            // Register before checking so a resume between the check and
            // the await is not lost
            let resumed = self.shared.resumed.notified();
            match self.state() {
                QueueState::Paused => resumed.await,
                QueueState::Stopped => return false,
                QueueState::Idle | QueueState::Running => return true,
            }
        }
    }

    /// Load each section in turn, extract items from it and release it.
    ///
    /// Load and extraction failures are logged and the section skipped.
    /// Stops early once `limit` items are collected.
    pub(crate) async fn process<L, T, F>(
        &self,
        sections: &[Section],
        loader: &L,
        limit: Option<usize>,
        mut extract: F,
    ) -> Vec<T>
    where
        L: SectionLoader,
        F: FnMut(&Section, &L::Document) -> Result<Vec<T>>,
    {
        self.begin(sections.len());
        let mut results = Vec::new();

        for section in sections {
            if !self.ready().await {
                break;
            }

            let doc = match loader.load(section).await {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(section = section.index, href = %section.href, error = %e, "Failed to load section, skipping");
                    self.complete_one();
                    continue;
                }
            };

            let extracted = extract(section, &doc);
            drop(doc);
            loader.unload(section).await;

            if self.is_stopped() {
                debug!(section = section.index, "Queue stopped, discarding section");
                break;
            }

            match extracted {
                Ok(items) => {
                    debug!(section = section.index, items = items.len(), "Processed section");
                    results.extend(items);
                }
                Err(e) => {
                    warn!(section = section.index, error = %e, "Failed to process section, skipping");
                }
            }
            self.complete_one();

            if limit.is_some_and(|limit| results.len() >= limit) {
                break;
            }

            tokio::task::yield_now().await;
        }

        if let Some(limit) = limit {
            results.truncate(limit);
        }
        self.finish();
        results
    }
}
