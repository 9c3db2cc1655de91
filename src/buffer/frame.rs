use std::sync::{Arc, RwLock};

use crate::common::constants::{NO_PAGE, PAGE_SIZE};
use crate::storage::PageId;

/// A frame identifier: the index of a slot in the [`FrameTable`].
pub type FrameId = usize;

/// One cache slot, holding at most one resident page plus its metadata.
///
/// Matches the data model exactly: `resident_page` (empty is represented
/// by [`NO_PAGE`]), `fix_count`, `dirty`, and a `PAGE_SIZE`-byte `buffer`
/// that is only meaningful while the frame is resident.
#[derive(Debug)]
pub struct Frame {
    resident_page: PageId,
    fix_count: usize,
    dirty: bool,
    buffer: Box<[u8; PAGE_SIZE]>,
}

/// A frame, shared via reference count so a [`crate::buffer::pool::PageHandle`]
/// returned by `pin` can outlive the call that produced it while several
/// other pins are outstanding against other frames. Validity past the
/// matching `unpin` is a contract the caller must honor; the lock itself
/// only protects against concurrent access, not stale use.
pub type FrameHandle = Arc<RwLock<Frame>>;

impl Frame {
    fn empty() -> Self {
        Self {
            resident_page: NO_PAGE,
            fix_count: 0,
            dirty: false,
            buffer: Box::new([0u8; PAGE_SIZE]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resident_page == NO_PAGE
    }

    pub fn resident_page(&self) -> PageId {
        self.resident_page
    }

    pub fn fix_count(&self) -> usize {
        self.fix_count
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn buffer(&self) -> &[u8; PAGE_SIZE] {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.buffer
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn increment_fix_count(&mut self) {
        self.fix_count += 1;
    }

    /// Decrements `fix_count`. Returns `false` (and leaves the count
    /// untouched) if it is already zero — the underflow case the Pool
    /// Controller turns into `Error::UnpinUnderflow`.
    pub fn decrement_fix_count(&mut self) -> bool {
        if self.fix_count == 0 {
            return false;
        }
        self.fix_count -= 1;
        true
    }

    /// Reuses this frame for a newly admitted page, clearing whatever was
    /// here before. Caller is responsible for having written back a dirty
    /// victim first.
    pub(crate) fn admit(&mut self, page_no: PageId) {
        self.resident_page = page_no;
        self.fix_count = 1;
        self.dirty = false;
    }

    pub(crate) fn release(&mut self) {
        self.resident_page = NO_PAGE;
        self.fix_count = 0;
        self.dirty = false;
    }
}

/// The fixed-length array of frames, indexed `0..num_frames`. Allocated at
/// `init`, freed at `shutdown`; the array itself never resizes.
#[derive(Debug)]
pub struct FrameTable {
    frames: Vec<FrameHandle>,
}

impl FrameTable {
    pub fn new(num_frames: usize) -> Self {
        Self {
            frames: (0..num_frames)
                .map(|_| Arc::new(RwLock::new(Frame::empty())))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// A borrowed reference to frame `frame_id`'s shared handle.
    pub fn get(&self, frame_id: FrameId) -> &FrameHandle {
        &self.frames[frame_id]
    }

    /// A cloned, reference-counted handle — this is what `pin` hands back
    /// inside a [`crate::buffer::pool::PageHandle`].
    pub fn handle(&self, frame_id: FrameId) -> FrameHandle {
        Arc::clone(&self.frames[frame_id])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameHandle> {
        self.frames.iter()
    }

    pub fn admit(&mut self, frame_id: FrameId, page_no: PageId) {
        self.frames[frame_id].write().unwrap().admit(page_no);
    }

    pub fn release(&mut self, frame_id: FrameId) {
        self.frames[frame_id].write().unwrap().release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_frame_table_is_all_empty() {
        let table = FrameTable::new(3);
        assert_eq!(table.len(), 3);
        assert!(table.iter().all(|f| f.read().unwrap().is_empty()));
    }

    #[test]
    fn admit_then_release_round_trips() {
        let mut table = FrameTable::new(1);
        table.admit(0, 7);
        {
            let frame = table.get(0).read().unwrap();
            assert_eq!(frame.resident_page(), 7);
            assert_eq!(frame.fix_count(), 1);
            assert!(!frame.is_dirty());
        }

        table.release(0);
        let frame = table.get(0).read().unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.fix_count(), 0);
    }

    #[test]
    fn decrement_fix_count_reports_underflow() {
        let mut frame = Frame::empty();
        assert!(!frame.decrement_fix_count());
        frame.increment_fix_count();
        assert!(frame.decrement_fix_count());
        assert_eq!(frame.fix_count(), 0);
    }
}
