//! Bounded pending-frame window.
//!
//! Index-based separation:
//! - HeapRb stores lightweight metadata (frame id + slab key), oldest first
//! - Slab stores the pending entries (frame, matched result, ticks)
//!
//! Frames are pushed in increasing id order, so ring order is capture order.

use std::fmt;

use contracts::{FlowResult, Frame, FrameId};
use ringbuf::{traits::*, HeapRb};
use slab::Slab;

/// Lightweight metadata stored in ring buffer
#[derive(Debug, Clone, Copy)]
struct PendingMeta {
    frame_id: FrameId,
    slab_key: usize,
}

/// Frame waiting for its flow result
#[derive(Debug)]
pub struct PendingEntry {
    pub frame: Frame,
    pub result: Option<FlowResult>,
    pub enqueued_tick: u64,
    pub matched_tick: Option<u64>,
}

impl PendingEntry {
    /// Whether a result (valid or not) has matched
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.result.is_some()
    }
}

/// Result of offering a flow result to the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// Attached to a pending frame
    Matched,
    /// The pending frame already had a result
    Duplicate,
    /// No pending frame with this id
    NotPending,
}

/// Fixed-capacity FIFO of pending frames
pub struct PendingWindow {
    /// Ring buffer of metadata (frame id + slab key)
    index: HeapRb<PendingMeta>,
    /// Pending entry storage
    storage: Slab<PendingEntry>,
    capacity: usize,
}

impl fmt::Debug for PendingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingWindow")
            .field("len", &self.index.occupied_len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl PendingWindow {
    /// Create an empty window. Capacity is clamped to at least one slot.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            index: HeapRb::new(capacity),
            storage: Slab::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a frame as the newest entry.
    ///
    /// If the window is full, the oldest entry is removed first and
    /// returned so the caller can emit it.
    pub fn push(&mut self, frame: Frame, tick: u64) -> Option<PendingEntry> {
        let evicted = if self.index.is_full() {
            self.pop_front()
        } else {
            None
        };

        let frame_id = frame.id;
        let slab_key = self.storage.insert(PendingEntry {
            frame,
            result: None,
            enqueued_tick: tick,
            matched_tick: None,
        });
        // the index has room: a full index was popped above
        let pushed = self.index.try_push(PendingMeta { frame_id, slab_key });
        debug_assert!(pushed.is_ok(), "pending index full after eviction");

        evicted
    }

    /// Attach a result to the pending frame with the same id
    pub fn attach(&mut self, result: FlowResult, tick: u64) -> AttachOutcome {
        let Some(meta) = self
            .index
            .iter()
            .find(|m| m.frame_id == result.frame_id)
            .copied()
        else {
            return AttachOutcome::NotPending;
        };

        match self.storage.get_mut(meta.slab_key) {
            Some(entry) if entry.result.is_some() => AttachOutcome::Duplicate,
            Some(entry) => {
                entry.result = Some(result);
                entry.matched_tick = Some(tick);
                AttachOutcome::Matched
            }
            None => AttachOutcome::NotPending,
        }
    }

    /// Oldest pending entry
    #[inline]
    pub fn front(&self) -> Option<&PendingEntry> {
        self.index
            .iter()
            .next()
            .and_then(|meta| self.storage.get(meta.slab_key))
    }

    /// Remove and return the oldest pending entry
    #[inline]
    pub fn pop_front(&mut self) -> Option<PendingEntry> {
        let meta = self.index.try_pop()?;
        self.storage.try_remove(meta.slab_key)
    }

    /// Id of the newest pending frame
    pub fn newest_id(&self) -> Option<FrameId> {
        self.index.iter().last().map(|m| m.frame_id)
    }

    /// Whether a frame with this id is pending
    pub fn contains(&self, frame_id: FrameId) -> bool {
        self.index.iter().any(|m| m.frame_id == frame_id)
    }

    /// Number of pending frames
    #[inline]
    pub fn len(&self) -> usize {
        self.index.occupied_len()
    }

    /// Check if the window is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Maximum number of pending frames
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{PixelFormat, TransformDescriptor};

    fn make_frame(id: u64) -> Frame {
        Frame {
            id: FrameId::new(id),
            timestamp: id as f64 / 30.0,
            width: 1,
            height: 1,
            format: PixelFormat::Gray8,
            data: Bytes::from_static(&[0]),
        }
    }

    fn make_result(id: u64) -> FlowResult {
        FlowResult::new(
            FrameId::new(id),
            TransformDescriptor::Homography(TransformDescriptor::IDENTITY_HOMOGRAPHY),
            1.0,
        )
    }

    #[test]
    fn test_window_fifo_order() {
        let mut window = PendingWindow::new(4);
        window.push(make_frame(1), 1);
        window.push(make_frame(2), 2);
        window.push(make_frame(3), 3);

        assert_eq!(window.front().unwrap().frame.id, FrameId::new(1));
        assert_eq!(window.newest_id(), Some(FrameId::new(3)));
        assert_eq!(window.pop_front().unwrap().frame.id, FrameId::new(1));
        assert_eq!(window.pop_front().unwrap().frame.id, FrameId::new(2));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_window_capacity_evicts_oldest() {
        let mut window = PendingWindow::new(2);
        assert!(window.push(make_frame(1), 1).is_none());
        assert!(window.push(make_frame(2), 2).is_none());

        let evicted = window.push(make_frame(3), 3).unwrap();
        assert_eq!(evicted.frame.id, FrameId::new(1));
        assert_eq!(window.len(), 2);
        assert!(!window.contains(FrameId::new(1)));
    }

    #[test]
    fn test_full_window_keeps_index_and_storage_aligned() {
        let mut window = PendingWindow::new(3);
        for id in 1..=20 {
            window.push(make_frame(id), id);
            assert_eq!(window.index.occupied_len(), window.storage.len());
        }

        assert_eq!(window.len(), 3);
        assert_eq!(window.front().unwrap().frame.id, FrameId::new(18));
        assert_eq!(window.newest_id(), Some(FrameId::new(20)));
    }

    #[test]
    fn test_attach_outcomes() {
        let mut window = PendingWindow::new(4);
        window.push(make_frame(5), 1);

        assert_eq!(window.attach(make_result(5), 2), AttachOutcome::Matched);
        assert_eq!(window.attach(make_result(5), 3), AttachOutcome::Duplicate);
        assert_eq!(window.attach(make_result(6), 3), AttachOutcome::NotPending);

        let entry = window.front().unwrap();
        assert!(entry.is_resolved());
        assert_eq!(entry.matched_tick, Some(2));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut window = PendingWindow::new(0);
        assert_eq!(window.capacity(), 1);
        window.push(make_frame(1), 1);
        let evicted = window.push(make_frame(2), 2);
        assert_eq!(evicted.unwrap().frame.id, FrameId::new(1));
    }
}
