use crate::storage::PageId;

/// Size, in bytes, of every page moved between the buffer pool and disk.
/// Shared between the buffer pool and the storage manager — nothing in
/// this crate ever reads or writes a partial page.
pub const PAGE_SIZE: usize = 4096;

/// Sentinel page identifier marking an empty frame.
pub const NO_PAGE: PageId = -1;
