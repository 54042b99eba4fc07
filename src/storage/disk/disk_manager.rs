use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::common::{DbError, PageId, Result};

/// DiskManager reads and writes whole pages of one table file.
///
/// The file is a flat run of `page_size` byte pages starting at offset 0,
/// with no header. Page `n` lives at `n * page_size`. The file only grows:
/// a page may be overwritten in place or written exactly one past the end.
pub struct DiskManager {
    /// The table file
    file: Mutex<File>,
    path: PathBuf,
    page_size: usize,
    /// floor(file length / page_size)
    num_pages: AtomicU32,
    /// Number of page reads performed
    num_reads: AtomicU32,
    /// Number of page writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens the file at `path`, creating it empty if it doesn't exist.
    pub fn new<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;

        let file_size = file.metadata()?.len();
        let num_pages = (file_size / page_size as u64) as u32;

        Ok(Self {
            file: Mutex::new(file),
            path: path.as_ref().to_path_buf(),
            page_size,
            num_pages: AtomicU32::new(num_pages),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Reads exactly one page into `data`.
    /// Fails with `PageOutOfRange` when the file holds fewer pages.
    pub fn read_page(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        self.check_buffer(data.len())?;

        let num_pages = self.num_pages();
        if page_id.page_no >= num_pages {
            return Err(DbError::PageOutOfRange { page_id, num_pages });
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page_id.offset(self.page_size)))?;
        file.read_exact(data)?;

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes one page. `page_no` may be at most `num_pages()`; writing at
    /// `num_pages()` extends the file by one page.
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        self.check_buffer(data.len())?;

        let mut file = self.file.lock();
        let num_pages = self.num_pages.load(Ordering::SeqCst);
        if page_id.page_no > num_pages {
            return Err(DbError::PageOutOfRange { page_id, num_pages });
        }

        file.seek(SeekFrom::Start(page_id.offset(self.page_size)))?;
        file.write_all(data)?;
        file.flush()?;

        if page_id.page_no == num_pages {
            self.num_pages.store(num_pages + 1, Ordering::SeqCst);
        }
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Appends one zero-filled page and returns its page number.
    pub fn append_empty_page(&self) -> Result<u32> {
        let zeros = vec![0u8; self.page_size];

        let mut file = self.file.lock();
        let page_no = self.num_pages.load(Ordering::SeqCst);
        file.seek(SeekFrom::Start(page_no as u64 * self.page_size as u64))?;
        file.write_all(&zeros)?;
        file.flush()?;

        self.num_pages.store(page_no + 1, Ordering::SeqCst);
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(page_no)
    }

    fn check_buffer(&self, len: usize) -> Result<()> {
        if len != self.page_size {
            return Err(DbError::InvalidPageData(format!(
                "page buffer is {} bytes, page size is {}",
                len, self.page_size
            )));
        }
        Ok(())
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages.load(Ordering::SeqCst)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes buffered writes to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let _ = self.file.get_mut().sync_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;
    use tempfile::NamedTempFile;

    const PAGE: usize = 128;

    fn pid(page_no: u32) -> PageId {
        PageId::new(TableId::new(1), page_no)
    }

    #[test]
    fn test_new_file_is_empty() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path(), PAGE).unwrap();
        assert_eq!(dm.num_pages(), 0);
    }

    #[test]
    fn test_append_and_read() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path(), PAGE).unwrap();

        assert_eq!(dm.append_empty_page().unwrap(), 0);
        assert_eq!(dm.append_empty_page().unwrap(), 1);
        assert_eq!(dm.num_pages(), 2);

        let mut data = vec![0u8; PAGE];
        data[0] = 42;
        data[PAGE - 1] = 7;
        dm.write_page(pid(1), &data).unwrap();

        let mut read = vec![0xffu8; PAGE];
        dm.read_page(pid(1), &mut read).unwrap();
        assert_eq!(read, data);

        dm.read_page(pid(0), &mut read).unwrap();
        assert!(read.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_read_past_end_fails() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path(), PAGE).unwrap();
        dm.append_empty_page().unwrap();

        let mut data = vec![0u8; PAGE];
        let err = dm.read_page(pid(1), &mut data).unwrap_err();
        assert!(matches!(err, DbError::PageOutOfRange { num_pages: 1, .. }));
    }

    #[test]
    fn test_write_may_extend_by_one_only() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path(), PAGE).unwrap();
        let data = vec![1u8; PAGE];

        dm.write_page(pid(0), &data).unwrap();
        assert_eq!(dm.num_pages(), 1);

        let err = dm.write_page(pid(5), &data).unwrap_err();
        assert!(matches!(err, DbError::PageOutOfRange { .. }));
        assert_eq!(dm.num_pages(), 1);
    }

    #[test]
    fn test_persistence() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        {
            let dm = DiskManager::new(&path, PAGE).unwrap();
            let mut data = vec![0u8; PAGE];
            data[3] = 123;
            dm.write_page(pid(0), &data).unwrap();
        }

        let dm = DiskManager::new(&path, PAGE).unwrap();
        assert_eq!(dm.num_pages(), 1);
        let mut data = vec![0u8; PAGE];
        dm.read_page(pid(0), &mut data).unwrap();
        assert_eq!(data[3], 123);
        assert_eq!(dm.num_reads(), 1);
    }

    #[test]
    fn test_wrong_buffer_size() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path(), PAGE).unwrap();
        assert!(dm.write_page(pid(0), &[0u8; 10]).is_err());
    }
}
