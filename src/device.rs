//! Device I/O: the seekable, byte-addressed backing store every other layer
//! of the driver addresses through a partition-relative offset.
//!
//! The contract is a plain byte offset/length pair instead of a
//! const-generic sector size: FATX's cluster size is a runtime quantity
//! (`sectors_per_cluster` from the header), not a compile-time constant, so
//! there's nothing for `typenum`/`generic-array` to buy us here.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// A seekable, byte-addressed backing store.
///
/// Implementors need only promise that `read_at`/`write_at` address the same
/// linear byte space consistently across calls; the mount layer is the
/// only component that ever adds a partition offset on top.
pub trait Device {
    /// Reads exactly `len` bytes starting at absolute byte offset `offset`.
    fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Vec<u8>>;

    /// Writes `data` starting at absolute byte offset `offset`.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()>;

    /// Total length of the backing store, in bytes.
    fn len(&mut self) -> io::Result<u64>;
}

/// A `Device` backed by a host file (or block device) opened for
/// read/write.
#[derive(Debug)]
pub struct FileDevice {
    file: File,
}

impl FileDevice {
    /// Opens `path` for read/write use as a backing store.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    /// Wraps an already-open file.
    pub fn from_file(file: File) -> Self {
        Self { file }
    }
}

impl Device for FileDevice {
    fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)
    }

    fn len(&mut self) -> io::Result<u64> {
        self.file.seek(SeekFrom::End(0))
    }
}

/// An in-memory `Device`, primarily for tests: a `Vec<u8>` behind the same
/// contract a real disk image or block device satisfies.
#[derive(Debug, Default, Clone)]
pub struct MemDevice {
    data: Vec<u8>,
}

impl MemDevice {
    /// Creates a zero-filled in-memory device of the given size.
    pub fn zeroed(size: usize) -> Self {
        Self { data: vec![0u8; size] }
    }
}

impl Device for MemDevice {
    fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of device")
        })?;
        if end > self.data.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of device"));
        }
        Ok(self.data[start..end].to_vec())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        let start = offset as usize;
        let end = start.checked_add(data.len()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "write past end of device")
        })?;
        if end > self.data.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "write past end of device"));
        }
        self.data[start..end].copy_from_slice(data);
        Ok(())
    }

    fn len(&mut self) -> io::Result<u64> {
        Ok(self.data.len() as u64)
    }
}
