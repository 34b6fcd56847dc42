//! Ordered queue of in-flight requests.
//!
//! Slots are kept in transmission order and addressed by a monotonically
//! increasing sequence number (`seq - head_seq` is the index). Resolution is
//! strictly FIFO, so the unresolved slots always form a suffix of the queue.

use crate::{ConnectorError, Result};
use rhp12rn_control_table::DataType;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Flag shared between a slot and its handle, set once nobody will ask for
/// the result.
#[derive(Debug, Clone, Default)]
pub(crate) struct Release(Arc<AtomicBool>);

impl Release {
    pub(crate) fn release(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub(crate) fn is_released(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What the drain needs to know about a transmitted request.
#[derive(Debug, Clone)]
pub(crate) struct InFlight {
    pub(crate) field: String,
    pub(crate) data_type: DataType,
    /// Value sent for writes; `None` for reads.
    pub(crate) written: Option<i64>,
}

impl InFlight {
    /// Bytes the status packet should carry.
    pub(crate) fn expected_length(&self) -> u16 {
        match self.written {
            Some(_) => 0,
            None => self.data_type.size() as u16,
        }
    }
}

#[derive(Debug)]
enum Slot {
    Sent { request: InFlight, release: Release },
    Resolved { outcome: Result<i64>, release: Release },
    /// Consumed by its caller or discarded.
    Done,
}

/// Outcome of looking up a slot by sequence number.
#[derive(Debug)]
pub(crate) enum Lookup {
    Resolved(Result<i64>),
    InFlight,
    Unknown,
}

#[derive(Debug, Default)]
pub(crate) struct PendingQueue {
    slots: VecDeque<Slot>,
    head_seq: u64,
    next_seq: u64,
    in_flight: usize,
}

impl PendingQueue {
    pub(crate) fn new() -> Self {
        PendingQueue::default()
    }

    /// Append a transmitted request. Returns its sequence number and the
    /// release flag for its handle.
    pub(crate) fn push(&mut self, request: InFlight) -> (u64, Release) {
        self.compact();
        if self.slots.is_empty() {
            self.head_seq = self.next_seq;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let release = Release::default();
        self.slots.push_back(Slot::Sent {
            request,
            release: release.clone(),
        });
        self.in_flight += 1;
        (seq, release)
    }

    /// Number of transmitted but undrained requests.
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// The oldest undrained request.
    pub(crate) fn next_in_flight(&self) -> Option<&InFlight> {
        if self.in_flight == 0 {
            return None;
        }
        match &self.slots[self.slots.len() - self.in_flight] {
            Slot::Sent { request, .. } => Some(request),
            _ => None,
        }
    }

    /// Resolve the oldest undrained request.
    pub(crate) fn resolve_next(&mut self, outcome: Result<i64>) {
        if self.in_flight == 0 {
            return;
        }
        let index = self.slots.len() - self.in_flight;
        let resolved = match std::mem::replace(&mut self.slots[index], Slot::Done) {
            Slot::Sent { release, .. } if !release.is_released() => {
                Slot::Resolved { outcome, release }
            }
            _ => Slot::Done,
        };
        self.slots[index] = resolved;
        self.in_flight -= 1;
        self.compact();
    }

    fn index(&self, seq: u64) -> Option<usize> {
        let offset = seq.checked_sub(self.head_seq)?;
        let index = usize::try_from(offset).ok()?;
        (index < self.slots.len()).then_some(index)
    }

    /// Take the result for `seq` if it has been resolved.
    pub(crate) fn take(&mut self, seq: u64) -> Lookup {
        let Some(index) = self.index(seq) else {
            return Lookup::Unknown;
        };
        let lookup = match std::mem::replace(&mut self.slots[index], Slot::Done) {
            Slot::Resolved { outcome, .. } => Lookup::Resolved(outcome),
            sent @ Slot::Sent { .. } => {
                self.slots[index] = sent;
                return Lookup::InFlight;
            }
            Slot::Done => Lookup::Unknown,
        };
        self.compact();
        lookup
    }

    /// Drop the result for `seq`, now or when it is drained.
    ///
    /// Returns `false` if no such slot is held.
    pub(crate) fn discard(&mut self, seq: u64) -> bool {
        let Some(index) = self.index(seq) else {
            return false;
        };
        let slot = &mut self.slots[index];
        match slot {
            Slot::Sent { release, .. } => release.release(),
            Slot::Resolved { .. } => *slot = Slot::Done,
            Slot::Done => return false,
        }
        self.compact();
        true
    }

    /// Empty the queue.
    ///
    /// Undrained requests that still have a caller become
    /// [`ConnectorError::Abandoned`]. Returns how many were abandoned and the
    /// results still owed to live handles, keyed by sequence number.
    pub(crate) fn abandon_all(&mut self) -> (usize, Vec<(u64, Owed)>) {
        let mut abandoned = 0;
        let mut owed = Vec::new();
        for (seq, slot) in (self.head_seq..).zip(self.slots.drain(..)) {
            match slot {
                Slot::Sent { release, .. } if !release.is_released() => {
                    abandoned += 1;
                    let outcome = Err(ConnectorError::Abandoned);
                    owed.push((seq, Owed { outcome, release }));
                }
                Slot::Resolved { outcome, release } if !release.is_released() => {
                    owed.push((seq, Owed { outcome, release }))
                }
                Slot::Sent { .. } | Slot::Resolved { .. } | Slot::Done => {}
            }
        }
        self.in_flight = 0;
        self.head_seq = self.next_seq;
        (abandoned, owed)
    }

    /// Pop consumed slots, and results whose handle is gone, off the front.
    fn compact(&mut self) {
        while let Some(front) = self.slots.front() {
            let consumed = match front {
                Slot::Done => true,
                Slot::Resolved { release, .. } => release.is_released(),
                Slot::Sent { .. } => false,
            };
            if !consumed {
                break;
            }
            self.slots.pop_front();
            self.head_seq += 1;
        }
    }

    #[cfg(test)]
    pub(crate) fn retained(&mut self) -> usize {
        self.compact();
        self.slots.len()
    }
}

/// A result kept after disconnect until its handle collects it.
#[derive(Debug)]
pub(crate) struct Owed {
    pub(crate) outcome: Result<i64>,
    pub(crate) release: Release,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(field: &str) -> InFlight {
        InFlight {
            field: field.to_string(),
            data_type: DataType::U16,
            written: None,
        }
    }

    #[test]
    fn test_fifo_resolution() {
        let mut queue = PendingQueue::new();
        let (a, _) = queue.push(read("a"));
        let (b, _) = queue.push(read("b"));
        assert_eq!(queue.in_flight(), 2);
        assert_eq!(queue.next_in_flight().map(|r| r.field.as_str()), Some("a"));

        queue.resolve_next(Ok(1));
        assert_eq!(queue.next_in_flight().map(|r| r.field.as_str()), Some("b"));
        assert!(matches!(queue.take(b), Lookup::InFlight));

        queue.resolve_next(Ok(2));
        assert!(matches!(queue.take(b), Lookup::Resolved(Ok(2))));
        assert!(matches!(queue.take(a), Lookup::Resolved(Ok(1))));
        assert!(matches!(queue.take(a), Lookup::Unknown));
        assert_eq!(queue.slots.len(), 0);
    }

    #[test]
    fn test_discard_in_flight() {
        let mut queue = PendingQueue::new();
        let (a, _) = queue.push(read("a"));
        let (b, _) = queue.push(read("b"));
        assert!(queue.discard(a));
        queue.resolve_next(Ok(1));
        // a was dropped on resolution and compacted away
        assert!(matches!(queue.take(a), Lookup::Unknown));
        queue.resolve_next(Ok(2));
        assert!(matches!(queue.take(b), Lookup::Resolved(Ok(2))));
    }

    #[test]
    fn test_abandon_all_keeps_resolved() {
        let mut queue = PendingQueue::new();
        let (a, _) = queue.push(read("a"));
        let (b, _) = queue.push(read("b"));
        let (c, _) = queue.push(read("c"));
        queue.discard(c);
        queue.resolve_next(Ok(7));

        let (abandoned, owed) = queue.abandon_all();
        assert_eq!(abandoned, 1);
        assert_eq!(owed.len(), 2);
        assert_eq!(owed[0].0, a);
        assert!(matches!(owed[0].1.outcome, Ok(7)));
        assert_eq!(owed[1].0, b);
        assert!(matches!(owed[1].1.outcome, Err(ConnectorError::Abandoned)));
        assert_eq!(queue.in_flight(), 0);

        let (d, _) = queue.push(read("d"));
        assert!(d > c);
        assert!(matches!(queue.take(d), Lookup::InFlight));
    }

    #[test]
    fn test_released_result_does_not_pin_queue() {
        let mut queue = PendingQueue::new();
        let (_, release) = queue.push(read("forgotten"));
        queue.resolve_next(Ok(1));
        release.release();

        for _ in 0..10_000 {
            let (seq, _) = queue.push(read("x"));
            queue.resolve_next(Ok(2));
            assert!(matches!(queue.take(seq), Lookup::Resolved(Ok(2))));
        }
        assert_eq!(queue.retained(), 0);
    }

    #[test]
    fn test_released_in_flight_is_dropped_on_drain() {
        let mut queue = PendingQueue::new();
        let (_, release) = queue.push(read("a"));
        let (b, _) = queue.push(read("b"));
        release.release();
        queue.resolve_next(Ok(1));
        assert_eq!(queue.retained(), 1);
        queue.resolve_next(Ok(2));
        assert!(matches!(queue.take(b), Lookup::Resolved(Ok(2))));
        assert_eq!(queue.retained(), 0);

        let (_, release) = queue.push(read("c"));
        release.release();
        let (abandoned, owed) = queue.abandon_all();
        assert_eq!(abandoned, 0);
        assert!(owed.is_empty());
    }

    #[test]
    fn test_write_expects_no_data() {
        let write = InFlight {
            field: "goal_current".to_string(),
            data_type: DataType::S16,
            written: Some(-50),
        };
        assert_eq!(write.expected_length(), 0);
        assert_eq!(read("x").expected_length(), 2);
    }
}
