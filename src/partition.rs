//! The fixed Xbox HDD partition table, and the three ways a caller can
//! locate the FATX partition it wants to mount.
//!
//! Unlike a GUID Partition Table read off the disk, the Xbox layout predates
//! GPT entirely: it's five fixed (offset, size) pairs baked into every
//! retail Xbox HDD, never stored on the medium itself.

use crate::error::{Error, Result};

/// One entry in the fixed Xbox HDD partition table: absolute byte offset
/// and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRange {
    pub offset: u64,
    pub size: u64,
}

/// The five fixed (offset, size) pairs from the Xbox HDD layout.
pub const FIXED_PARTITION_TABLE: [PartitionRange; 5] = [
    PartitionRange { offset: 0x0008_0000, size: 0x2EE0_0000 },
    PartitionRange { offset: 0x2EE8_0000, size: 0x2EE0_0000 },
    PartitionRange { offset: 0x5DC8_0000, size: 0x2EE0_0000 },
    PartitionRange { offset: 0x8CA8_0000, size: 0x1F40_0000 },
    PartitionRange { offset: 0xABE8_0000, size: 0x1_3200_0000 },
];

/// Resolves partition index `i` into a fixed-table entry.
pub fn by_index(i: usize) -> Result<PartitionRange> {
    FIXED_PARTITION_TABLE
        .get(i)
        .copied()
        .ok_or(Error::InvalidPartitionIndex(i))
}
