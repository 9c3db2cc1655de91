use std::collections::{HashMap, VecDeque};

use crate::buffer::frame::{FrameId, FrameTable};
use crate::buffer::replacer::ReplacementPolicy;

/// Per-frame access history used by [`LruKReplacer`].
#[derive(Debug)]
struct LruKNode {
    /// Last `k` access timestamps, oldest first.
    history: VecDeque<usize>,
    k: usize,
}

impl LruKNode {
    fn new(k: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(k),
            k,
        }
    }

    fn record_access(&mut self, timestamp: usize) {
        if self.history.len() == self.k {
            self.history.pop_front();
        }
        self.history.push_back(timestamp);
    }

    /// The k'th most recent access's distance from `current_timestamp`, or
    /// `usize::MAX` if fewer than `k` accesses have been recorded yet.
    fn backward_k_distance(&self, current_timestamp: usize) -> usize {
        if self.history.len() < self.k {
            return usize::MAX;
        }
        let kth_last = self.history[self.history.len() - self.k];
        current_timestamp.saturating_sub(kth_last)
    }

    fn earliest_access(&self) -> usize {
        *self.history.front().unwrap_or(&usize::MAX)
    }
}

/// An LRU-K replacement policy: among frames with an infinite backward
/// k-distance (fewer than `k` recorded accesses), evict the one with the
/// earliest first access; otherwise evict the frame with the largest
/// backward k-distance. Demonstrates that [`ReplacementPolicy`] admits
/// drop-in alternatives to [`FifoReplacer`](crate::buffer::replacer::FifoReplacer)
/// without the Pool Controller changing at all.
#[derive(Debug)]
pub struct LruKReplacer {
    node_store: HashMap<FrameId, LruKNode>,
    current_timestamp: usize,
    k: usize,
}

impl LruKReplacer {
    pub fn new(k: usize) -> Self {
        assert!(k > 0, "k must be at least 1");
        Self {
            node_store: HashMap::new(),
            current_timestamp: 0,
            k,
        }
    }
}

impl ReplacementPolicy for LruKReplacer {
    fn on_admit(&mut self, frame_id: FrameId) {
        let node = self
            .node_store
            .entry(frame_id)
            .or_insert_with(|| LruKNode::new(self.k));
        node.record_access(self.current_timestamp);
        self.current_timestamp += 1;
    }

    fn on_hit(&mut self, frame_id: FrameId) {
        let node = self
            .node_store
            .entry(frame_id)
            .or_insert_with(|| LruKNode::new(self.k));
        node.record_access(self.current_timestamp);
        self.current_timestamp += 1;
    }

    fn on_evict(&mut self, frame_id: FrameId) {
        self.node_store.remove(&frame_id);
    }

    fn select_victim(&self, frame_table: &FrameTable) -> Option<FrameId> {
        let mut victim: Option<FrameId> = None;
        let mut earliest_with_infinite_distance = usize::MAX;
        let mut max_k_distance = 0usize;

        for (frame_id, frame) in frame_table.iter().enumerate() {
            let frame = frame.read().unwrap();
            if frame.is_empty() || frame.fix_count() != 0 {
                continue;
            }
            let Some(node) = self.node_store.get(&frame_id) else {
                continue;
            };

            if node.history.len() < node.k {
                let first_access = node.earliest_access();
                if earliest_with_infinite_distance == usize::MAX
                    || first_access < earliest_with_infinite_distance
                {
                    earliest_with_infinite_distance = first_access;
                    victim = Some(frame_id);
                }
                continue;
            }

            if earliest_with_infinite_distance != usize::MAX {
                // A frame with infinite backward distance always outranks
                // one with a finite distance.
                continue;
            }

            let k_distance = node.backward_k_distance(self.current_timestamp);
            if victim.is_none() || k_distance > max_k_distance {
                max_k_distance = k_distance;
                victim = Some(frame_id);
            }
        }

        victim
    }
}
