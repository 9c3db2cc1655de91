mod page_file;

pub use page_file::{PagedFile, StorageManager};

/// A page identifier: a non-negative integer denoting a page's position in
/// the underlying file. [`crate::common::constants::NO_PAGE`] is the
/// sentinel value meaning "no page".
pub type PageId = i64;
