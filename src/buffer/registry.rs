use crate::buffer::frame::{FrameId, FrameTable};
use crate::storage::PageId;

/// The logical view over the frame table that answers "is page P resident?
/// in which frame?" and "is there an empty frame?".
///
/// Holds no state of its own beyond the frame table it is handed — a view,
/// not a store, per the component contract. The baseline backing is a
/// linear scan, which the contract says is acceptable at the pool sizes
/// (dozens to low hundreds of frames) this crate targets.
pub struct PinRegistry;

impl PinRegistry {
    /// Locates the frame currently holding `page_no`, if any.
    pub fn find(frame_table: &FrameTable, page_no: PageId) -> Option<FrameId> {
        frame_table
            .iter()
            .position(|frame| frame.read().unwrap().resident_page() == page_no)
    }

    /// Returns an empty frame, if one exists.
    pub fn any_empty(frame_table: &FrameTable) -> Option<FrameId> {
        frame_table
            .iter()
            .position(|frame| frame.read().unwrap().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_locates_resident_page() {
        let mut table = FrameTable::new(2);
        table.admit(1, 42);
        assert_eq!(PinRegistry::find(&table, 42), Some(1));
        assert_eq!(PinRegistry::find(&table, 7), None);
    }

    #[test]
    fn any_empty_prefers_lowest_index() {
        let mut table = FrameTable::new(3);
        table.admit(0, 1);
        assert_eq!(PinRegistry::any_empty(&table), Some(1));
        table.admit(1, 2);
        table.admit(2, 3);
        assert_eq!(PinRegistry::any_empty(&table), None);
    }
}
