use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::common::constants::PAGE_SIZE;
use crate::common::{Error, Result};
use crate::storage::PageId;

/// The page-file abstraction the buffer pool consumes and never interprets.
///
/// Named after the operations in the original storage manager interface
/// (`create_page_file`, `open_page_file`, `read_block`, `write_block`,
/// `ensure_capacity`, ...), translated into ordinary Rust methods on an
/// open-file handle rather than C's explicit `SM_FileHandle` out-parameter.
/// A trait so an embedder can substitute a fake for tests or a different
/// backing store without touching the buffer pool.
pub trait StorageManager: Sized {
    /// Creates an empty page file at `path`. Fails if it already exists.
    fn create_page_file(path: &Path) -> Result<()>;

    /// Opens an existing page file.
    fn open_page_file(path: &Path) -> Result<Self>;

    /// Closes the page file, flushing any OS-buffered writes. Takes `&mut
    /// self` rather than consuming it, so a caller that gets an error back
    /// still holds a live handle instead of one silently dropped mid-failure.
    fn close_page_file(&mut self) -> Result<()>;

    /// Removes a page file from disk.
    fn destroy_page_file(path: &Path) -> Result<()>;

    /// Reads the block at `page_no` into `buf`, which must hold exactly
    /// `PAGE_SIZE` bytes.
    fn read_block(&mut self, page_no: PageId, buf: &mut [u8]) -> Result<()>;

    /// Writes `buf` (exactly `PAGE_SIZE` bytes) to the block at `page_no`.
    fn write_block(&mut self, page_no: PageId, buf: &[u8]) -> Result<()>;

    /// Grows the file with zero-filled blocks, if needed, so that it holds
    /// at least `n_pages` pages.
    fn ensure_capacity(&mut self, n_pages: i64) -> Result<()>;

    /// The page number last read or written via the `read_*_block`/
    /// `read_block`/`write_block` family.
    fn get_block_pos(&self) -> PageId;

    /// Total number of `PAGE_SIZE`-byte blocks currently in the file.
    fn total_num_pages(&self) -> i64;

    /// Appends one zero-filled block to the end of the file.
    fn append_empty_block(&mut self) -> Result<()>;

    fn read_first_block(&mut self, buf: &mut [u8]) -> Result<()>;
    fn read_next_block(&mut self, buf: &mut [u8]) -> Result<()>;
    fn read_previous_block(&mut self, buf: &mut [u8]) -> Result<()>;
    fn read_current_block(&mut self, buf: &mut [u8]) -> Result<()>;
}

/// A `std::fs::File`-backed [`StorageManager`]: a page file is a sequence of
/// `PAGE_SIZE`-byte blocks, byte-for-byte equal to the buffers pinned
/// against them.
#[derive(Debug)]
pub struct PagedFile {
    path: PathBuf,
    file: File,
    total_pages: i64,
    current_page: PageId,
}

impl PagedFile {
    fn block_offset(page_no: PageId) -> u64 {
        (page_no as u64) * (PAGE_SIZE as u64)
    }

    fn read_at(&mut self, page_no: PageId, buf: &mut [u8]) -> Result<()> {
        assert_eq!(buf.len(), PAGE_SIZE, "read buffer must be exactly PAGE_SIZE bytes");
        self.file.seek(SeekFrom::Start(Self::block_offset(page_no)))?;
        self.file.read_exact(buf)?;
        self.current_page = page_no;
        Ok(())
    }
}

impl StorageManager for PagedFile {
    fn create_page_file(path: &Path) -> Result<()> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        file.set_len(PAGE_SIZE as u64)?;
        debug!("created page file at {}", path.display());
        Ok(())
    }

    fn open_page_file(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        let total_pages = (len / PAGE_SIZE as u64) as i64;
        debug!("opened page file {} ({} pages)", path.display(), total_pages);
        Ok(Self {
            path: path.to_path_buf(),
            file,
            total_pages,
            current_page: -1,
        })
    }

    fn close_page_file(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn destroy_page_file(path: &Path) -> Result<()> {
        std::fs::remove_file(path)?;
        Ok(())
    }

    fn read_block(&mut self, page_no: PageId, buf: &mut [u8]) -> Result<()> {
        self.read_at(page_no, buf)
    }

    fn write_block(&mut self, page_no: PageId, buf: &[u8]) -> Result<()> {
        assert_eq!(buf.len(), PAGE_SIZE, "write buffer must be exactly PAGE_SIZE bytes");
        self.file.seek(SeekFrom::Start(Self::block_offset(page_no)))?;
        self.file.write_all(buf)?;
        self.current_page = page_no;
        if page_no + 1 > self.total_pages {
            self.total_pages = page_no + 1;
        }
        Ok(())
    }

    fn ensure_capacity(&mut self, n_pages: i64) -> Result<()> {
        if n_pages <= self.total_pages {
            return Ok(());
        }
        let target_len = (n_pages as u64) * (PAGE_SIZE as u64);
        self.file.set_len(target_len)?;
        self.total_pages = n_pages;
        debug!("grew page file {} to {} pages", self.path.display(), n_pages);
        Ok(())
    }

    fn get_block_pos(&self) -> PageId {
        self.current_page
    }

    fn total_num_pages(&self) -> i64 {
        self.total_pages
    }

    fn append_empty_block(&mut self) -> Result<()> {
        let new_total = self.total_pages + 1;
        self.ensure_capacity(new_total)
    }

    fn read_first_block(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_at(0, buf)
    }

    fn read_next_block(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.current_page + 1 >= self.total_pages {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no next block in page file",
            )));
        }
        self.read_at(self.current_page + 1, buf)
    }

    fn read_previous_block(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.current_page <= 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no previous block in page file",
            )));
        }
        self.read_at(self.current_page - 1, buf)
    }

    fn read_current_block(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.current_page < 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no block has been read yet",
            )));
        }
        let page_no = self.current_page;
        self.read_at(page_no, buf)
    }
}
