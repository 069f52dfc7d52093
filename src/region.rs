//! Regions: the fixed-size extents a workload traverses
//!
//! A region is acquired fresh for every trial and released by `Drop`, so an
//! early return anywhere in a trial still unmaps or closes it.

use std::fs::{File, OpenOptions};
use std::io::Seek;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::ptr;

use memmap2::MmapMut;

use crate::error::{BenchError, Result};
use crate::pattern::Access;

/// A contiguous extent divided into equally sized units
pub trait Region {
    /// Extent in bytes
    fn size(&self) -> u64;

    /// Unit granularity in bytes (page size or block size)
    fn unit(&self) -> usize;

    /// Number of units, counting a trailing partial unit
    fn units(&self) -> usize {
        let unit = self.unit() as u64;
        usize::try_from(self.size().div_ceil(unit)).unwrap_or(usize::MAX)
    }

    /// Access unit `index`, returning the number of bytes moved
    fn touch(&mut self, index: usize, access: Access) -> Result<u64>;

    /// Reset to the start of the region before a second pass
    fn rewind(&mut self) -> Result<()>;
}

fn out_of_range(op: &'static str, offset: u64) -> BenchError {
    BenchError::Io {
        op,
        offset,
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "unit outside region",
        ),
    }
}

/// Private anonymous mapping, touched one byte per page
pub struct MemoryRegion {
    map: Option<MmapMut>,
    size: u64,
    page_size: usize,
    sink: u8,
}

impl MemoryRegion {
    /// Map `size` bytes of fresh anonymous memory. A zero size maps nothing.
    pub fn map(size: u64, page_size: usize) -> Result<Self> {
        let len = usize::try_from(size).map_err(|_| BenchError::Map {
            size,
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "size exceeds address space",
            ),
        })?;
        let map = if len == 0 {
            None
        } else {
            Some(MmapMut::map_anon(len).map_err(|source| BenchError::Map { size, source })?)
        };
        tracing::trace!(size, page_size, "mapped anonymous region");
        Ok(Self {
            map,
            size,
            page_size,
            sink: 0,
        })
    }

    /// Fold of every byte read so far; keeps reads observable
    pub fn sink(&self) -> u8 {
        self.sink
    }
}

impl Region for MemoryRegion {
    fn size(&self) -> u64 {
        self.size
    }

    fn unit(&self) -> usize {
        self.page_size
    }

    #[inline]
    fn touch(&mut self, index: usize, access: Access) -> Result<u64> {
        let offset = index.saturating_mul(self.page_size);
        let byte = self
            .map
            .as_mut()
            .and_then(|m| m.get_mut(offset))
            .ok_or_else(|| out_of_range("touch", offset as u64))?;
        match access {
            // SAFETY: `byte` is a live, exclusive reference into the mapping.
            Access::Write => unsafe { ptr::write_volatile(byte as *mut u8, 1) },
            Access::Read => {
                // SAFETY: as above.
                let v = unsafe { ptr::read_volatile(byte as *const u8) };
                self.sink = self.sink.wrapping_add(v);
            }
        }
        Ok(1)
    }

    fn rewind(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Open file read (or written) one block per unit with positional I/O
pub struct FileRegion {
    file: File,
    path: PathBuf,
    size: u64,
    block_size: usize,
    buf: Vec<u8>,
    calls: u64,
}

impl FileRegion {
    /// Open `path` for a traversal of its first `size` bytes
    pub fn open(path: &Path, size: u64, block_size: usize, writable: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(path)
            .map_err(|source| BenchError::FixtureOpen {
                path: path.to_path_buf(),
                source,
            })?;
        let len = file
            .metadata()
            .map_err(|source| BenchError::FixtureOpen {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if len < size {
            return Err(BenchError::FixtureTooSmall {
                path: path.to_path_buf(),
                len,
                needed: size,
            });
        }
        Ok(Self {
            file,
            path: path.to_path_buf(),
            size,
            block_size,
            buf: vec![0xA5; block_size],
            calls: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// read/write calls issued so far
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Region for FileRegion {
    fn size(&self) -> u64 {
        self.size
    }

    fn unit(&self) -> usize {
        self.block_size
    }

    #[inline]
    fn touch(&mut self, index: usize, access: Access) -> Result<u64> {
        let offset = (index as u64).saturating_mul(self.block_size as u64);
        if offset >= self.size {
            return Err(out_of_range("touch", offset));
        }
        let len = (self.size - offset).min(self.block_size as u64) as usize;
        let buf = &mut self.buf[..len];
        self.calls += 1;
        let n = match access {
            Access::Read => self.file.read_at(buf, offset).map_err(|source| BenchError::Io {
                op: "pread",
                offset,
                source,
            })?,
            Access::Write => self.file.write_at(buf, offset).map_err(|source| BenchError::Io {
                op: "pwrite",
                offset,
                source,
            })?,
        };
        Ok(n as u64)
    }

    fn rewind(&mut self) -> Result<()> {
        self.file.rewind().map_err(|source| BenchError::Io {
            op: "lseek",
            offset: 0,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_memory_units_round_up() {
        let r = MemoryRegion::map(4096 * 3 + 1, 4096).unwrap();
        assert_eq!(r.units(), 4);
    }

    #[test]
    fn test_memory_zero_size() {
        let mut r = MemoryRegion::map(0, 4096).unwrap();
        assert_eq!(r.units(), 0);
        assert!(r.touch(0, Access::Write).is_err());
    }

    #[test]
    fn test_memory_write_then_read() {
        let mut r = MemoryRegion::map(4096 * 4, 4096).unwrap();
        for i in 0..4 {
            r.touch(i, Access::Write).unwrap();
        }
        for i in 0..4 {
            r.touch(i, Access::Read).unwrap();
        }
        assert_eq!(r.sink(), 4);
    }

    #[test]
    fn test_memory_touch_out_of_range() {
        let mut r = MemoryRegion::map(4096, 4096).unwrap();
        assert!(r.touch(1, Access::Read).is_err());
    }

    fn fixture(len: usize) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&vec![7u8; len]).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn test_file_reads_whole_blocks() {
        let f = fixture(4096 * 2);
        let mut r = FileRegion::open(f.path(), 4096 * 2, 4096, false).unwrap();
        assert_eq!(r.units(), 2);
        assert_eq!(r.touch(0, Access::Read).unwrap(), 4096);
        assert_eq!(r.touch(1, Access::Read).unwrap(), 4096);
        assert_eq!(r.calls(), 2);
    }

    #[test]
    fn test_file_partial_last_block() {
        let f = fixture(5000);
        let mut r = FileRegion::open(f.path(), 5000, 4096, false).unwrap();
        assert_eq!(r.units(), 2);
        assert_eq!(r.touch(1, Access::Read).unwrap(), 904);
        assert!(r.touch(2, Access::Read).is_err());
    }

    #[test]
    fn test_file_too_small() {
        let f = fixture(100);
        let err = FileRegion::open(f.path(), 4096, 4096, false).err().unwrap();
        assert!(matches!(
            err,
            BenchError::FixtureTooSmall {
                len: 100,
                needed: 4096,
                ..
            }
        ));
    }

    #[test]
    fn test_file_missing() {
        let err = FileRegion::open(Path::new("/nonexistent/fixture"), 1, 1, false)
            .err()
            .unwrap();
        assert!(matches!(err, BenchError::FixtureOpen { .. }));
    }

    #[test]
    fn test_file_write_and_rewind() {
        let f = fixture(8192);
        let mut r = FileRegion::open(f.path(), 8192, 4096, true).unwrap();
        assert_eq!(r.touch(1, Access::Write).unwrap(), 4096);
        r.rewind().unwrap();
        assert_eq!(r.path(), f.path());
    }
}
