use crate::storage::PageId;
use thiserror::Error;

/// Errors raised by the buffer pool and the storage manager it drives.
///
/// Every operation surfaces its error to the caller; nothing here is
/// silently swallowed.
#[derive(Error, Debug)]
pub enum Error {
    /// Frame table or frame buffer allocation failed during `init` or `pin`.
    #[error("failed to allocate frame table or frame buffer")]
    AllocFailed,

    /// `shutdown` was called while at least one frame still has `fix_count > 0`.
    #[error("cannot shut down buffer pool: at least one frame is still pinned")]
    PoolHasPinnedPages,

    /// `pin` demanded a new page but every frame is resident and pinned.
    #[error("no victim frame available: all frames resident and pinned")]
    NoVictimAvailable,

    /// `unpin`, `mark_dirty`, or `force_page` referred to a page that is not
    /// currently resident in any frame.
    #[error("page {0} is not resident in the buffer pool")]
    PageNotResident(PageId),

    /// `unpin` was called on a page whose `fix_count` is already zero.
    #[error("page {0} underflowed its fix count on unpin")]
    UnpinUnderflow(PageId),

    /// The storage manager reported a failure while reading or writing a block.
    #[error("storage manager I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded or validated.
    #[error("invalid buffer pool configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
