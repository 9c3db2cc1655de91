use std::collections::HashMap;
use std::fmt::Debug;

use crate::buffer::frame::{FrameId, FrameTable};

/// A pluggable victim selector.
///
/// Given the frame table and a demand for a new page, [`select_victim`]
/// returns the index of a frame whose `fix_count == 0`, or `None` if every
/// frame is pinned. The Pool Controller writes the victim's buffer back if
/// dirty and reuses the frame; it never inspects `policy_metadata` itself.
///
/// `on_admit`/`on_hit`/`on_evict` let a policy track whatever bookkeeping
/// it needs (load order for FIFO, recency for LRU, a reference bit for
/// CLOCK, access counts for LFU) without the controller knowing which
/// policy is active.
///
/// [`select_victim`]: ReplacementPolicy::select_victim
pub trait ReplacementPolicy: Debug {
    /// Called when `frame_id` is freshly admitted (the page was not
    /// previously resident anywhere).
    fn on_admit(&mut self, frame_id: FrameId);

    /// Called when `frame_id` is hit (the page was already resident).
    fn on_hit(&mut self, frame_id: FrameId);

    /// Called when `frame_id` is evicted and about to be reused.
    fn on_evict(&mut self, frame_id: FrameId);

    /// Selects a victim frame with `fix_count == 0`, or `None` if no frame
    /// is currently evictable.
    fn select_victim(&self, frame_table: &FrameTable) -> Option<FrameId>;
}

/// The baseline replacement policy: the frame that has been resident
/// longest and is currently unpinned is evicted first. Ties (e.g. frames
/// all admitted simultaneously at startup) are broken by lowest frame
/// index.
#[derive(Debug, Default)]
pub struct FifoReplacer {
    load_order: HashMap<FrameId, u64>,
    next_seq: u64,
}

impl FifoReplacer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplacementPolicy for FifoReplacer {
    fn on_admit(&mut self, frame_id: FrameId) {
        self.load_order.insert(frame_id, self.next_seq);
        self.next_seq += 1;
    }

    fn on_hit(&mut self, _frame_id: FrameId) {
        // FIFO does not reorder on a hit; load order is fixed at admission.
    }

    fn on_evict(&mut self, frame_id: FrameId) {
        self.load_order.remove(&frame_id);
    }

    fn select_victim(&self, frame_table: &FrameTable) -> Option<FrameId> {
        let mut best: Option<(u64, FrameId)> = None;
        for (frame_id, frame) in frame_table.iter().enumerate() {
            let frame = frame.read().unwrap();
            if frame.is_empty() || frame.fix_count() != 0 {
                continue;
            }
            let Some(&seq) = self.load_order.get(&frame_id) else {
                continue;
            };
            best = match best {
                None => Some((seq, frame_id)),
                Some((best_seq, _)) if seq < best_seq => Some((seq, frame_id)),
                some => some,
            };
        }
        best.map(|(_, frame_id)| frame_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::frame::FrameTable;

    #[test]
    fn evicts_oldest_unpinned_frame() {
        let mut table = FrameTable::new(3);
        let mut replacer = FifoReplacer::new();

        table.admit(0, 10);
        replacer.on_admit(0);
        table.admit(1, 11);
        replacer.on_admit(1);
        table.admit(2, 12);
        replacer.on_admit(2);

        // all resident, all unpinned (fix_count was set to 1 by admit).
        table.get(0).write().unwrap().decrement_fix_count();
        table.get(1).write().unwrap().decrement_fix_count();
        table.get(2).write().unwrap().decrement_fix_count();

        assert_eq!(replacer.select_victim(&table), Some(0));
    }

    #[test]
    fn skips_pinned_frames() {
        let mut table = FrameTable::new(2);
        let mut replacer = FifoReplacer::new();

        table.admit(0, 10);
        replacer.on_admit(0);
        table.admit(1, 11);
        replacer.on_admit(1);
        table.get(1).write().unwrap().decrement_fix_count();
        // frame 0 stays pinned (fix_count == 1).

        assert_eq!(replacer.select_victim(&table), Some(1));
    }

    #[test]
    fn no_victim_when_all_pinned() {
        let mut table = FrameTable::new(1);
        let mut replacer = FifoReplacer::new();
        table.admit(0, 10);
        replacer.on_admit(0);

        assert_eq!(replacer.select_victim(&table), None);
    }

    #[test]
    fn ties_break_on_lowest_frame_index() {
        // Simulate frames admitted at the exact same sequence number, as can
        // happen with a coarser clock source than this policy assumes.
        let mut table = FrameTable::new(2);
        let mut replacer = FifoReplacer::new();
        table.admit(0, 10);
        table.admit(1, 11);
        replacer.load_order.insert(0, 5);
        replacer.load_order.insert(1, 5);
        table.get(0).write().unwrap().decrement_fix_count();
        table.get(1).write().unwrap().decrement_fix_count();

        assert_eq!(replacer.select_victim(&table), Some(0));
    }
}
