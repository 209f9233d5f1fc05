//! Deadline queue with lazy deletion
//!
//! A min-heap of (deadline, seq) keys plus a HashMap holding the live entries.
//! Cancelled timeouts are removed from the map only; their heap keys become
//! stale and are skipped on peek/pop. Entries with equal deadlines come out
//! in insertion (seq) order.

use crate::timers::{TimeMs, TimeoutId};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

#[derive(Clone, Copy, Debug)]
struct Key {
    deadline: TimeMs,
    seq: u64,
    id: TimeoutId,
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so BinaryHeap (a max-heap) pops the earliest deadline first.
impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .total_cmp(&other.deadline)
            .then(self.seq.cmp(&other.seq))
            .reverse()
    }
}

struct Entry<M> {
    deadline: TimeMs,
    meta: M,
}

/// Min-queue of timeouts ordered by deadline, FIFO within a deadline.
pub struct DeadlineQueue<M> {
    heap: BinaryHeap<Key>,
    live: HashMap<TimeoutId, Entry<M>>,
    seq: u64,
}

impl<M> Default for DeadlineQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> DeadlineQueue<M> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
            seq: 0,
        }
    }

    /// Insert a timeout. Returns false if the id is already queued.
    pub fn add(&mut self, id: TimeoutId, deadline: TimeMs, meta: M) -> bool {
        if self.live.contains_key(&id) {
            return false;
        }
        let seq = self.seq;
        self.seq += 1;
        self.live.insert(id, Entry { deadline, meta });
        self.heap.push(Key { deadline, seq, id });
        true
    }

    /// Remove a timeout by id, returning its payload.
    pub fn remove(&mut self, id: TimeoutId) -> Option<M> {
        self.live.remove(&id).map(|e| e.meta)
    }

    pub fn contains(&self, id: TimeoutId) -> bool {
        self.live.contains_key(&id)
    }

    /// The earliest live deadline.
    pub fn peek_deadline(&mut self) -> Option<TimeMs> {
        self.clean_top();
        self.heap.peek().map(|k| k.deadline)
    }

    /// Pop the earliest live entry.
    pub fn pop(&mut self) -> Option<(TimeoutId, TimeMs, M)> {
        while let Some(k) = self.heap.pop() {
            if let Some(entry) = self.live.remove(&k.id) {
                return Some((k.id, entry.deadline, entry.meta));
            }
        }
        None
    }

    /// Pop the earliest entry only if it is due at or before `time`.
    pub fn pop_due(&mut self, time: TimeMs) -> Option<(TimeoutId, TimeMs, M)> {
        match self.peek_deadline() {
            Some(dl) if dl <= time => self.pop(),
            _ => None,
        }
    }

    /// Drop everything, returning the payloads so the caller controls when
    /// they are destroyed.
    pub fn drain(&mut self) -> Vec<M> {
        self.heap.clear();
        self.live.drain().map(|(_, e)| e.meta).collect()
    }

    fn clean_top(&mut self) {
        while let Some(k) = self.heap.peek() {
            if self.live.contains_key(&k.id) {
                break;
            }
            self.heap.pop();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }
}
