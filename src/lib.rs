//! A read/write driver for the Xbox FATX on-disk filesystem.
//!
//! FATX is FAT-like but not FAT: a 16-byte header (no BIOS parameter block),
//! 64-byte directory entries, and a fixed five-entry partition table instead
//! of an on-disk partition scheme. [`driver::Driver`] is the entry point —
//! mount a [`device::Device`] with one of `Driver::mount_default`,
//! `Driver::mount_index`, or `Driver::mount_range`, then read, write, and
//! walk directories through it.

pub mod device;
pub mod directory;
pub mod error;
pub mod fat;
pub mod partition;
pub mod driver;

pub use device::{Device, FileDevice, MemDevice};
pub use driver::Driver;
pub use error::{Error, Result};
