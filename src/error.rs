//! The crate's single error type.
//!
//! One `thiserror`-derived enum covers every failure mode described by the
//! driver: bad geometry, corrupt directory state, and the underlying device
//! bubbling up an I/O error.

use std::io;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The four bytes at the partition's header offset aren't `"FATX"`.
    #[error("not a FATX partition (bad magic)")]
    InvalidSignature,

    /// `mount_index` was given an index outside the fixed partition table.
    #[error("partition index {0} is out of range")]
    InvalidPartitionIndex(usize),

    /// `lookup` found no live entry with the requested name.
    #[error("not found: {0}")]
    NotFound(String),

    /// `lookup` found more than one live entry with the requested name.
    ///
    /// Only possible on a directory that wasn't written by this driver
    /// (e.g. hand-authored or corrupt).
    #[error("ambiguous: {0} matches more than one entry")]
    Ambiguous(String),

    /// `write_file`/`make_directory` collided with an existing entry of the
    /// other kind (file vs. directory).
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// No contiguous run of free clusters large enough for the request.
    #[error("out of space: no contiguous run of {0} free cluster(s)")]
    OutOfSpace(u32),

    /// A FAT chain walk detected a cycle or an out-of-range cluster pointer.
    #[error("corrupt cluster chain starting at cluster {0}")]
    CorruptChain(u32),

    /// `write_chain` was given more data than the destination chain has
    /// room for.
    #[error("chain starting at cluster {0} is too short for the requested write")]
    ShortChain(u32),

    /// A directory's cluster chain can't be grown to fit another entry
    /// (the volume has no free clusters left).
    #[error("directory is full and cannot be grown")]
    DirectoryFull,

    /// A name passed to `write_file`/`make_directory` is empty or longer
    /// than the 42-byte FATX limit.
    #[error("invalid name {0:?}: must be 1..=42 bytes")]
    InvalidName(String),

    /// The underlying device rejected a read or write.
    #[error("device I/O error: {0}")]
    DeviceIO(#[from] io::Error),
}
