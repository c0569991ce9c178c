//! The FATX header (what FAT calls a "boot sector"), and the geometry
//! derived from it.
//!
//! Layout (partition-relative, little-endian):
//!
//! | Off | Size | Field |
//! |-----|------|-------|
//! | 0   | 4    | Magic: ASCII `"FATX"` |
//! | 4   | 4    | Volume id (opaque) |
//! | 8   | 4    | Sectors per cluster |
//! | 12  | 4    | Root-directory first cluster (by convention 1) |

use crate::error::{Error, Result};

pub const MAGIC: [u8; 4] = *b"FATX";
pub const HEADER_LEN: usize = 16;
pub const SECTOR_SIZE: u64 = 512;

/// The FAT always starts here, partition-relative.
pub const FAT_OFFSET: u64 = 0x1000;

/// The sixteen header bytes, decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub volume_id: u32,
    pub sectors_per_cluster: u32,
    pub root_dir_first_cluster: u32,
}

macro_rules! le {
    ($ty:ty, $bytes:expr, $offset:literal) => {
        <$ty>::from_le_bytes($bytes[$offset..$offset + core::mem::size_of::<$ty>()].try_into().unwrap())
    };
}

impl Header {
    /// Decodes a header from the first [`HEADER_LEN`] bytes of `raw`,
    /// validating the magic.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() < HEADER_LEN || raw[0..4] != MAGIC {
            return Err(Error::InvalidSignature);
        }

        Ok(Self {
            volume_id: le!(u32, raw, 4),
            sectors_per_cluster: le!(u32, raw, 8),
            root_dir_first_cluster: le!(u32, raw, 12),
        })
    }

    /// Encodes the header back into its 16-byte on-disk form.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..8].copy_from_slice(&self.volume_id.to_le_bytes());
        buf[8..12].copy_from_slice(&self.sectors_per_cluster.to_le_bytes());
        buf[12..16].copy_from_slice(&self.root_dir_first_cluster.to_le_bytes());
        buf
    }
}

/// The FAT entry width, selected by cluster count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatWidth {
    Fat16,
    Fat32,
}

impl FatWidth {
    pub fn from_total_clusters(total_clusters: u32) -> Self {
        if total_clusters <= 65525 {
            FatWidth::Fat16
        } else {
            FatWidth::Fat32
        }
    }

    /// Bytes occupied by one entry on disk.
    pub fn bytes(self) -> u64 {
        match self {
            FatWidth::Fat16 => 2,
            FatWidth::Fat32 => 4,
        }
    }

    /// The smallest in-memory value (all FAT entries are widened to `u32`
    /// regardless of on-disk width) that terminates a chain.
    pub fn end_of_chain_threshold(self) -> u32 {
        match self {
            FatWidth::Fat16 => 0xFFF0,
            FatWidth::Fat32 => 0xFFFF_FFF0,
        }
    }

    /// The sentinel value a fresh allocation writes to mark a chain's end.
    pub fn end_of_chain_sentinel(self) -> u32 {
        match self {
            FatWidth::Fat16 => 0xFFFF,
            FatWidth::Fat32 => 0xFFFF_FFFF,
        }
    }
}

/// Partition geometry, derived at mount time and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub partition_offset: u64,
    pub partition_size: u64,
    pub cluster_size: u64,
    pub total_clusters: u32,
    pub fat_width: FatWidth,
    pub fat_offset: u64,
    pub data_offset: u64,
}

impl Geometry {
    /// Derives geometry from a decoded header and the partition's extent:
    /// cluster size, total cluster count, FAT width, and the fixed FAT and
    /// data offsets.
    pub fn derive(header: &Header, partition_offset: u64, partition_size: u64) -> Result<Self> {
        let cluster_size = header.sectors_per_cluster as u64 * SECTOR_SIZE;
        if cluster_size == 0 {
            return Err(Error::InvalidSignature);
        }

        let total_clusters = (partition_size / cluster_size) as u32;
        let fat_width = FatWidth::from_total_clusters(total_clusters);
        let fat_offset = FAT_OFFSET;

        let fat_bytes = total_clusters as u64 * fat_width.bytes();
        let data_offset = round_up_to_0x1000(fat_offset + fat_bytes);

        Ok(Self {
            partition_offset,
            partition_size,
            cluster_size,
            total_clusters,
            fat_width,
            fat_offset,
            data_offset,
        })
    }

    /// Partition-relative byte offset of cluster `n` (n >= 1).
    pub fn cluster_offset(&self, cluster: u32) -> u64 {
        debug_assert!(cluster >= 1, "cluster 0 is not a data cluster");
        self.data_offset + (cluster as u64 - 1) * self.cluster_size
    }
}

fn round_up_to_0x1000(n: u64) -> u64 {
    const ALIGN: u64 = 0x1000;
    (n + ALIGN - 1) / ALIGN * ALIGN
}
