use std::path::Path;
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use crate::buffer::frame::{Frame, FrameHandle, FrameTable};
use crate::buffer::lru_k_replacer::LruKReplacer;
use crate::buffer::registry::PinRegistry;
use crate::buffer::replacer::{FifoReplacer, ReplacementPolicy};
use crate::common::{Error, Result};
use crate::config::{BufferPoolConfig, ReplacementStrategy};
use crate::storage::{PagedFile, PageId, StorageManager};

/// A caller-facing view into a pinned page, returned by
/// [`BufferPoolManager::pin`]. Exposes the page number and read/write
/// access to the frame's buffer. Its validity is a contract bounded by the
/// matching [`BufferPoolManager::unpin`] — nothing prevents a caller from
/// retaining it longer, but the bytes it reaches may be reused for a
/// different page once the frame is evicted.
#[derive(Debug, Clone)]
pub struct PageHandle {
    page_num: PageId,
    frame: FrameHandle,
}

impl PageHandle {
    pub fn page_num(&self) -> PageId {
        self.page_num
    }

    /// Shared read access to the page's bytes.
    pub fn read(&self) -> std::sync::RwLockReadGuard<'_, Frame> {
        self.frame.read().unwrap()
    }

    /// Exclusive access to the page's bytes. Does not itself mark the page
    /// dirty — call [`BufferPoolManager::mark_dirty`] after modifying it.
    pub fn write(&self) -> std::sync::RwLockWriteGuard<'_, Frame> {
        self.frame.write().unwrap()
    }
}

/// The buffer pool's public surface: `init`/`shutdown`, the pin/unpin
/// protocol, dirty tracking, write-back, and introspection. Mediates
/// between callers, the [`PinRegistry`] view, the pluggable
/// [`ReplacementPolicy`], and the [`StorageManager`] it drives.
///
/// Single-threaded cooperative baseline: every method takes `&mut self`. A
/// [`SharedBufferPool`] wraps this in a pool-wide mutex for the
/// recommended multi-threaded model.
#[derive(Debug)]
pub struct BufferPoolManager<S: StorageManager = PagedFile> {
    frame_table: FrameTable,
    replacer: Box<dyn ReplacementPolicy>,
    storage: Option<S>,
    reads: u64,
    writes: u64,
}

impl<S: StorageManager> BufferPoolManager<S> {
    /// Allocates and initializes the frame table, and acquires the storage
    /// manager handle for the page file at `path` — opened once here and
    /// released at `shutdown`, rather than per operation, per the scoped
    /// I/O handle design note.
    pub fn init(path: &Path, num_frames: usize, replacer: Box<dyn ReplacementPolicy>) -> Result<Self> {
        if num_frames == 0 {
            return Err(Error::AllocFailed);
        }
        let storage = S::open_page_file(path)?;
        debug!("buffer pool initialized with {num_frames} frames over {}", path.display());
        Ok(Self {
            frame_table: FrameTable::new(num_frames),
            replacer,
            storage: Some(storage),
            reads: 0,
            writes: 0,
        })
    }

    /// Convenience constructor for the baseline FIFO replacement policy.
    pub fn init_fifo(path: &Path, num_frames: usize) -> Result<Self> {
        Self::init(path, num_frames, Box::new(FifoReplacer::new()))
    }

    /// Builds a pool from a loaded [`BufferPoolConfig`], mapping its
    /// `strategy` to the matching [`ReplacementPolicy`].
    pub fn from_config(config: &BufferPoolConfig, path: &Path) -> Result<Self> {
        let replacer: Box<dyn ReplacementPolicy> = match config.strategy {
            ReplacementStrategy::Fifo => Box::new(FifoReplacer::new()),
            ReplacementStrategy::LruK { k } => Box::new(LruKReplacer::new(k)),
        };
        Self::init(path, config.pool_size, replacer)
    }

    fn storage_mut(&mut self) -> &mut S {
        self.storage
            .as_mut()
            .expect("buffer pool operation attempted after shutdown")
    }

    /// Succeeds only if every frame has `fix_count == 0`. Flushes all dirty
    /// frames, then releases the storage manager handle and frame table.
    pub fn shutdown(&mut self) -> Result<()> {
        for frame in self.frame_table.iter() {
            if frame.read().unwrap().fix_count() > 0 {
                return Err(Error::PoolHasPinnedPages);
            }
        }
        self.force_flush()?;

        // close_page_file takes &mut self rather than consuming it, so a
        // failure here leaves self.storage populated and the pool usable
        // instead of silently discarding the handle.
        self.storage_mut().close_page_file()?;
        self.storage = None;
        self.frame_table = FrameTable::new(0);
        debug!("buffer pool shut down cleanly");
        Ok(())
    }

    /// Pins `page_no`, loading it from disk if it is not already resident.
    ///
    /// Hit path does no I/O. On a miss, an empty frame is preferred; if
    /// none exists, the replacement policy selects a victim (failing with
    /// [`Error::NoVictimAvailable`] if every frame is pinned), writing it
    /// back first if dirty.
    pub fn pin(&mut self, page_no: PageId) -> Result<PageHandle> {
        if let Some(frame_id) = PinRegistry::find(&self.frame_table, page_no) {
            self.frame_table
                .get(frame_id)
                .write()
                .unwrap()
                .increment_fix_count();
            self.replacer.on_hit(frame_id);
            return Ok(PageHandle {
                page_num: page_no,
                frame: self.frame_table.handle(frame_id),
            });
        }

        if let Some(frame_id) = PinRegistry::any_empty(&self.frame_table) {
            let frame_handle = self.frame_table.get(frame_id).clone();
            {
                let mut frame = frame_handle.write().unwrap();
                self.storage_mut().ensure_capacity(page_no + 1)?;
                self.storage_mut().read_block(page_no, frame.buffer_mut())?;
                self.reads += 1;
                frame.admit(page_no);
            }
            self.replacer.on_admit(frame_id);
            return Ok(PageHandle {
                page_num: page_no,
                frame: frame_handle,
            });
        }

        let victim = self
            .replacer
            .select_victim(&self.frame_table)
            .ok_or(Error::NoVictimAvailable)?;
        let frame_handle = self.frame_table.get(victim).clone();
        {
            let mut frame = frame_handle.write().unwrap();
            if frame.is_dirty() {
                let old_page = frame.resident_page();
                self.storage_mut().write_block(old_page, frame.buffer())?;
                self.writes += 1;
            }
            self.replacer.on_evict(victim);
            self.storage_mut().ensure_capacity(page_no + 1)?;
            self.storage_mut().read_block(page_no, frame.buffer_mut())?;
            self.reads += 1;
            frame.admit(page_no);
        }
        self.replacer.on_admit(victim);
        debug!("pinned page {page_no} into frame {victim} (evicted a resident page)");

        Ok(PageHandle {
            page_num: page_no,
            frame: frame_handle,
        })
    }

    /// Decrements the fix count of the frame `page_handle` was pinned
    /// against.
    pub fn unpin(&mut self, page_handle: &PageHandle) -> Result<()> {
        let mut frame = page_handle.frame.write().unwrap();
        if frame.resident_page() != page_handle.page_num {
            return Err(Error::PageNotResident(page_handle.page_num));
        }
        if !frame.decrement_fix_count() {
            return Err(Error::UnpinUnderflow(page_handle.page_num));
        }
        Ok(())
    }

    /// Marks the frame `page_handle` was pinned against as dirty.
    pub fn mark_dirty(&mut self, page_handle: &PageHandle) -> Result<()> {
        let mut frame = page_handle.frame.write().unwrap();
        if frame.resident_page() != page_handle.page_num {
            return Err(Error::PageNotResident(page_handle.page_num));
        }
        frame.set_dirty(true);
        Ok(())
    }

    /// Writes the frame's buffer to disk unconditionally and clears dirty.
    pub fn force_page(&mut self, page_handle: &PageHandle) -> Result<()> {
        let mut frame = page_handle.frame.write().unwrap();
        if frame.resident_page() != page_handle.page_num {
            return Err(Error::PageNotResident(page_handle.page_num));
        }
        self.storage_mut()
            .write_block(page_handle.page_num, frame.buffer())?;
        self.writes += 1;
        frame.set_dirty(false);
        Ok(())
    }

    /// Writes every dirty frame to disk, clearing dirty as each succeeds.
    /// Pinned dirty pages are flushed too — flushing a page mid-update is
    /// not a contradiction of pinning, only a snapshot of its current
    /// bytes. Aborts at the first I/O failure; frames already flushed stay
    /// clean, the rest stay dirty.
    pub fn force_flush(&mut self) -> Result<()> {
        let storage = self
            .storage
            .as_mut()
            .expect("buffer pool operation attempted after shutdown");
        for frame_handle in self.frame_table.iter() {
            let mut frame = frame_handle.write().unwrap();
            if !frame.is_dirty() {
                continue;
            }
            let page_no = frame.resident_page();
            storage.write_block(page_no, frame.buffer())?;
            // Counted immediately: if a later frame's write_block fails and
            // aborts the loop via `?`, every already-committed write here
            // must still be reflected in `self.writes`.
            self.writes += 1;
            frame.set_dirty(false);
        }
        Ok(())
    }

    /// Snapshot of each frame's resident page (`NO_PAGE` for empty frames).
    pub fn frame_contents(&self) -> Vec<PageId> {
        self.frame_table
            .iter()
            .map(|f| f.read().unwrap().resident_page())
            .collect()
    }

    /// Snapshot of each frame's dirty flag.
    pub fn dirty_flags(&self) -> Vec<bool> {
        self.frame_table
            .iter()
            .map(|f| f.read().unwrap().is_dirty())
            .collect()
    }

    /// Snapshot of each frame's fix count.
    pub fn fix_counts(&self) -> Vec<usize> {
        self.frame_table
            .iter()
            .map(|f| f.read().unwrap().fix_count())
            .collect()
    }

    pub fn num_read_io(&self) -> u64 {
        self.reads
    }

    pub fn num_write_io(&self) -> u64 {
        self.writes
    }

    pub fn size(&self) -> usize {
        self.frame_table.len()
    }
}

/// A pool-wide mutex around [`BufferPoolManager`], matching the
/// "recommended model for a systems-language rewrite" in the concurrency
/// design: a single lock guarding the frame table, following the same
/// `Arc`-sharing idiom the pool already uses for frame handles. No
/// condition variable is layered on top — a `pin` that finds no victim
/// returns `NoVictimAvailable` rather than blocking, matching the baseline
/// contract.
#[derive(Debug, Clone)]
pub struct SharedBufferPool<S: StorageManager = PagedFile> {
    inner: Arc<Mutex<BufferPoolManager<S>>>,
}

impl<S: StorageManager> SharedBufferPool<S> {
    pub fn new(pool: BufferPoolManager<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    pub fn pin(&self, page_no: PageId) -> Result<PageHandle> {
        self.inner.lock().unwrap().pin(page_no)
    }

    pub fn unpin(&self, page_handle: &PageHandle) -> Result<()> {
        self.inner.lock().unwrap().unpin(page_handle)
    }

    pub fn mark_dirty(&self, page_handle: &PageHandle) -> Result<()> {
        self.inner.lock().unwrap().mark_dirty(page_handle)
    }

    pub fn force_page(&self, page_handle: &PageHandle) -> Result<()> {
        self.inner.lock().unwrap().force_page(page_handle)
    }

    pub fn force_flush(&self) -> Result<()> {
        self.inner.lock().unwrap().force_flush()
    }

    pub fn shutdown(&self) -> Result<()> {
        let result = self.inner.lock().unwrap().shutdown();
        if result.is_err() {
            warn!("shutdown refused: pool still has pinned pages");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_pool(dir: &tempfile::TempDir, name: &str, num_frames: usize) -> BufferPoolManager<PagedFile> {
        let _ = env_logger::try_init();
        let path = dir.path().join(name);
        PagedFile::create_page_file(&path).unwrap();
        BufferPoolManager::init(&path, num_frames, Box::new(FifoReplacer::new())).unwrap()
    }

    // S1 — hit path, no I/O.
    #[test]
    fn hit_path_does_not_increment_reads() {
        let dir = tempdir().unwrap();
        let mut pool = new_pool(&dir, "s1.db", 3);
        pool.storage_mut().ensure_capacity(5).unwrap();

        let h1 = pool.pin(2).unwrap();
        assert_eq!(pool.num_read_io(), 1);

        let h2 = pool.pin(2).unwrap();
        assert_eq!(pool.num_read_io(), 1);
        assert_eq!(h1.page_num(), h2.page_num());

        pool.unpin(&h1).unwrap();
        pool.unpin(&h2).unwrap();
    }

    // S2 — FIFO eviction, dirty write-back.
    #[test]
    fn fifo_eviction_writes_back_dirty_victim() {
        let dir = tempdir().unwrap();
        let mut pool = new_pool(&dir, "s2.db", 2);

        let h0 = pool.pin(0).unwrap();
        h0.write().buffer_mut()[0] = b'A';
        pool.mark_dirty(&h0).unwrap();
        pool.unpin(&h0).unwrap();

        let h1 = pool.pin(1).unwrap();
        pool.unpin(&h1).unwrap();

        // page 0 is the oldest unpinned resident page; pinning page 2 must
        // evict it and write its dirty buffer back first.
        let h2 = pool.pin(2).unwrap();
        assert_eq!(pool.num_write_io(), 1);
        assert_eq!(pool.num_read_io(), 3);
        pool.unpin(&h2).unwrap();

        let mut reread = vec![0u8; crate::common::constants::PAGE_SIZE];
        pool.storage_mut().read_block(0, &mut reread).unwrap();
        assert_eq!(reread[0], b'A');
    }

    // S3 — force_flush while pinned.
    #[test]
    fn force_flush_writes_pinned_dirty_page() {
        let dir = tempdir().unwrap();
        let mut pool = new_pool(&dir, "s3.db", 2);

        let h0 = pool.pin(0).unwrap();
        h0.write().buffer_mut()[0] = b'B';
        pool.mark_dirty(&h0).unwrap();

        pool.force_flush().unwrap();
        assert_eq!(pool.num_write_io(), 1);
        assert_eq!(pool.fix_counts()[0], 1);
        assert!(!pool.dirty_flags()[0]);
    }

    // S4 — shutdown refusal while pinned, success after unpin.
    #[test]
    fn shutdown_refuses_while_pinned_then_succeeds() {
        let dir = tempdir().unwrap();
        let mut pool = new_pool(&dir, "s4.db", 2);

        let h0 = pool.pin(0).unwrap();
        assert!(matches!(pool.shutdown(), Err(Error::PoolHasPinnedPages)));

        pool.unpin(&h0).unwrap();
        assert!(pool.shutdown().is_ok());
    }

    // Persistence across shutdown law: pin; mark_dirty; shutdown; init;
    // pin(P) observes the written bytes, through the public API only (no
    // `storage_mut()` escape hatch).
    #[test]
    fn marked_dirty_bytes_survive_shutdown_and_reinit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s12.db");
        PagedFile::create_page_file(&path).unwrap();
        let mut pool: BufferPoolManager<PagedFile> =
            BufferPoolManager::init(&path, 2, Box::new(FifoReplacer::new())).unwrap();

        let h0 = pool.pin(0).unwrap();
        h0.write().buffer_mut()[0] = b'P';
        pool.mark_dirty(&h0).unwrap();
        pool.unpin(&h0).unwrap();

        pool.shutdown().unwrap();

        let mut reopened: BufferPoolManager<PagedFile> =
            BufferPoolManager::init(&path, 2, Box::new(FifoReplacer::new())).unwrap();
        let h0_again = reopened.pin(0).unwrap();
        assert_eq!(h0_again.read().buffer()[0], b'P');
        reopened.unpin(&h0_again).unwrap();
        reopened.shutdown().unwrap();
    }

    // S5 — no victim available.
    #[test]
    fn no_victim_available_when_all_pinned() {
        let dir = tempdir().unwrap();
        let mut pool = new_pool(&dir, "s5.db", 1);

        let _h0 = pool.pin(0).unwrap();
        assert!(matches!(pool.pin(1), Err(Error::NoVictimAvailable)));
    }

    // S6 — growth via ensure_capacity.
    #[test]
    fn pinning_beyond_extent_grows_file_with_zeroes() {
        let dir = tempdir().unwrap();
        let mut pool = new_pool(&dir, "s6.db", 3);

        let handle = pool.pin(9).unwrap();
        assert!(handle.read().buffer().iter().all(|&b| b == 0));
        assert_eq!(pool.num_read_io(), 1);
    }

    #[test]
    fn unpin_on_non_resident_page_is_an_error() {
        let dir = tempdir().unwrap();
        let mut pool = new_pool(&dir, "s7.db", 2);

        let h0 = pool.pin(0).unwrap();
        pool.unpin(&h0).unwrap();
        // A second unpin of the same handle underflows the fix count.
        assert!(matches!(pool.unpin(&h0), Err(Error::UnpinUnderflow(0))));
    }

    #[test]
    fn mark_dirty_on_non_resident_page_is_an_error() {
        let dir = tempdir().unwrap();
        let mut pool = new_pool(&dir, "s8.db", 1);

        let h0 = pool.pin(0).unwrap();
        pool.unpin(&h0).unwrap();
        // Evict page 0 by pinning a second page into the single frame.
        let _h1 = pool.pin(1).unwrap();

        assert!(matches!(
            pool.mark_dirty(&h0),
            Err(Error::PageNotResident(0))
        ));
    }

    #[test]
    fn pin_unpin_n_times_returns_fix_count_to_zero() {
        let dir = tempdir().unwrap();
        let mut pool = new_pool(&dir, "s9.db", 1);

        let handles: Vec<_> = (0..4).map(|_| pool.pin(0).unwrap()).collect();
        assert_eq!(pool.fix_counts()[0], 4);
        for h in &handles {
            pool.unpin(h).unwrap();
        }
        assert_eq!(pool.fix_counts()[0], 0);
    }

    #[test]
    fn shared_buffer_pool_delegates_under_lock() {
        let dir = tempdir().unwrap();
        let pool = new_pool(&dir, "s10.db", 2);
        let shared = SharedBufferPool::new(pool);

        let handle = shared.pin(0).unwrap();
        shared.unpin(&handle).unwrap();
        assert!(shared.shutdown().is_ok());
    }

    #[test]
    fn from_config_selects_lru_k_policy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s11.db");
        PagedFile::create_page_file(&path).unwrap();

        let config = BufferPoolConfig::builder()
            .pool_size(2)
            .strategy(ReplacementStrategy::LruK { k: 1 })
            .build()
            .unwrap();
        let mut pool: BufferPoolManager<PagedFile> = BufferPoolManager::from_config(&config, &path).unwrap();

        let h0 = pool.pin(0).unwrap();
        pool.unpin(&h0).unwrap();
        let h1 = pool.pin(1).unwrap();
        pool.unpin(&h1).unwrap();
        // with k=1, frame 0 (pinned longer ago) has the larger backward
        // distance once both have one recorded access, so it is evicted.
        let h2 = pool.pin(2).unwrap();
        assert_eq!(pool.frame_contents().iter().filter(|&&p| p == 0).count(), 0);
        pool.unpin(&h2).unwrap();
    }
}
