//! Improvement queue: observed near-miss domains
//!
//! Every fuzzy hit is worth a human look: either a typo worth adding as
//! an alias, or a false positive worth tightening the policy for. The
//! queue holds the last 100 observations, oldest evicted first.
//!
//! Privacy: a record carries two base domains, a distance, and a
//! timestamp. Never a URL, path, query string, or any user identifier.
//!
//! The decision path does not write the queue directly. It holds a
//! [`QueueRecorder`] whose `record` is a non-blocking channel send; a
//! [`QueueDrain`] on the other end folds records into the persisted queue
//! whenever the host gets around to it. A full channel drops the record;
//! losing a curation hint is fine, stalling the decision path is not.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::AllowlistStorage;

/// Maximum number of persisted records.
pub const QUEUE_CAPACITY: usize = 100;

/// In-flight records between decision path and consumer.
const CHANNEL_CAPACITY: usize = 128;

/// One observed fuzzy match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuzzyMatchRecord {
    /// Base domain the user actually visited.
    #[serde(rename = "candidateDomain")]
    pub candidate_domain: String,
    /// Protected domain it matched.
    #[serde(rename = "matchedDomain")]
    pub matched_domain: String,
    pub distance: u32,
    #[serde(rename = "observedAt")]
    pub observed_at: DateTime<Utc>,
}

// =============================================================================
// Bounded Queue
// =============================================================================

/// FIFO of the most recent [`QUEUE_CAPACITY`] fuzzy-match records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImprovementQueue {
    records: VecDeque<FuzzyMatchRecord>,
}

impl ImprovementQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, evicting the oldest once past capacity.
    pub fn push(&mut self, record: FuzzyMatchRecord) {
        if self.records.len() >= QUEUE_CAPACITY {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &FuzzyMatchRecord> {
        self.records.iter()
    }
}

// =============================================================================
// Fire-and-Forget Channel
// =============================================================================

/// Create a connected recorder/drain pair.
pub fn channel() -> (QueueRecorder, QueueDrain) {
    let (tx, rx) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
    (QueueRecorder { tx }, QueueDrain { rx })
}

/// Decision-path handle. Cheap to clone, never blocks.
#[derive(Debug, Clone)]
pub struct QueueRecorder {
    tx: crossbeam_channel::Sender<FuzzyMatchRecord>,
}

impl QueueRecorder {
    /// Record an observed fuzzy match. Drops the record if the channel is
    /// full or disconnected.
    pub fn record(&self, candidate_domain: &str, matched_domain: &str, distance: usize) {
        let record = FuzzyMatchRecord {
            candidate_domain: candidate_domain.to_string(),
            matched_domain: matched_domain.to_string(),
            distance: distance as u32,
            observed_at: Utc::now(),
        };
        let _ = self.tx.try_send(record);
    }
}

/// Consumer handle, owned by whatever schedules background work.
#[derive(Debug)]
pub struct QueueDrain {
    rx: crossbeam_channel::Receiver<FuzzyMatchRecord>,
}

impl QueueDrain {
    /// Move every pending record into `queue`. Returns how many arrived.
    pub fn drain_into(&self, queue: &mut ImprovementQueue) -> usize {
        let mut drained = 0;
        while let Ok(record) = self.rx.try_recv() {
            queue.push(record);
            drained += 1;
        }
        drained
    }

    /// Drain pending records into the persisted queue. Storage failures
    /// are swallowed: the queue is best-effort by contract.
    pub fn flush_to_storage(&self, storage: &dyn AllowlistStorage) -> usize {
        let mut queue = match storage.load_queue() {
            Ok(Some(queue)) => queue,
            Ok(None) => ImprovementQueue::new(),
            Err(e) => {
                log::debug!("fuzzy queue load failed ({e}); starting fresh");
                ImprovementQueue::new()
            }
        };

        let drained = self.drain_into(&mut queue);
        if drained == 0 {
            return 0;
        }

        if let Err(e) = storage.save_queue(&queue) {
            log::debug!("fuzzy queue save failed ({e}); dropping {drained} records");
        }
        drained
    }
}
