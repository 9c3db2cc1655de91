mod frame;
mod lru_k_replacer;
mod pool;
mod registry;
mod replacer;

pub use frame::{Frame, FrameHandle, FrameId, FrameTable};
pub use lru_k_replacer::LruKReplacer;
pub use pool::{BufferPoolManager, PageHandle, SharedBufferPool};
pub use registry::PinRegistry;
pub use replacer::{FifoReplacer, ReplacementPolicy};
