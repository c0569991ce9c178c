//! The FAT itself: an in-memory array of cluster-link values, chain
//! traversal, first-fit allocation, and write-back.

use std::collections::HashSet;

use crate::device::Device;
use crate::error::{Error, Result};
use crate::fat::header::{FatWidth, Geometry};

/// The first two FAT indices are reserved and never handed out by
/// `allocate`.
const FIRST_ALLOCATABLE_CLUSTER: u32 = 2;

/// In-memory representation of the File Allocation Table.
///
/// Every entry is widened to `u32` in memory regardless of on-disk width
///; `flush` narrows back down for FATX16 volumes.
#[derive(Debug, Clone)]
pub struct Fat {
    entries: Vec<u32>,
    width: FatWidth,
}

impl Fat {
    /// Reads the whole FAT into memory.
    pub fn load<D: Device>(device: &mut D, geometry: &Geometry) -> Result<Self> {
        let width = geometry.fat_width;
        let entry_bytes = width.bytes() as usize;
        let total = geometry.total_clusters as usize;

        let raw = device.read_at(
            geometry.partition_offset + geometry.fat_offset,
            total * entry_bytes,
        )?;

        let mut entries = Vec::with_capacity(total);
        for chunk in raw.chunks_exact(entry_bytes) {
            let v = match width {
                FatWidth::Fat16 => u16::from_le_bytes(chunk.try_into().unwrap()) as u32,
                FatWidth::Fat32 => u32::from_le_bytes(chunk.try_into().unwrap()),
            };
            entries.push(v);
        }

        Ok(Self { entries, width })
    }

    /// Writes the entire FAT back to disk.
    pub fn flush<D: Device>(&self, device: &mut D, geometry: &Geometry) -> Result<()> {
        let entry_bytes = self.width.bytes() as usize;
        let mut raw = Vec::with_capacity(self.entries.len() * entry_bytes);

        for &v in &self.entries {
            match self.width {
                FatWidth::Fat16 => raw.extend_from_slice(&(v as u16).to_le_bytes()),
                FatWidth::Fat32 => raw.extend_from_slice(&v.to_le_bytes()),
            }
        }

        device.write_at(geometry.partition_offset + geometry.fat_offset, &raw)?;
        log::debug!("flushed {} FAT entries ({:?})", self.entries.len(), self.width);
        Ok(())
    }

    /// `fat[c]`, widened to `u32`. Callers compare this against
    /// [`Fat::is_end`] before treating it as a next-cluster pointer.
    pub fn next(&self, cluster: u32) -> u32 {
        self.entries[cluster as usize]
    }

    /// Whether `value` is an end-of-chain marker for this FAT's width.
    pub fn is_end(&self, value: u32) -> bool {
        value >= self.width.end_of_chain_threshold()
    }

    /// Overwrites `fat[cluster]` to point at `next` directly, bypassing the
    /// free-run search `allocate` does. Used only to splice a freshly
    /// allocated cluster onto the tail of an existing chain when a
    /// directory outgrows its current extent.
    pub fn link(&mut self, cluster: u32, next: u32) {
        self.entries[cluster as usize] = next;
    }

    /// Walks `start, fat[start], ...` until an end-of-chain marker,
    /// returning the ordered cluster numbers visited. Detects cycles
    /// (a cluster number seen twice) and fails with `CorruptChain`
    /// rather than hanging.
    pub fn chain(&self, start: u32) -> Result<Vec<u32>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut cur = start;

        loop {
            if !seen.insert(cur) {
                return Err(Error::CorruptChain(start));
            }
            out.push(cur);

            if cur as usize >= self.entries.len() {
                return Err(Error::CorruptChain(start));
            }

            let next = self.next(cur);
            if self.is_end(next) {
                break;
            }
            cur = next;
        }

        Ok(out)
    }

    /// First-fit search for a contiguous run of `n_clusters` free entries,
    /// starting at cluster index 2. On success, links the run into a chain
    /// terminated with the end-of-chain sentinel and returns its first
    /// cluster.
    pub fn allocate(&mut self, n_clusters: u32) -> Result<u32> {
        assert!(n_clusters >= 1);

        let total = self.entries.len() as u32;
        let mut run_start: Option<u32> = None;
        let mut run_len: u32 = 0;

        for c in FIRST_ALLOCATABLE_CLUSTER..total {
            if self.entries[c as usize] == 0 {
                if run_start.is_none() {
                    run_start = Some(c);
                }
                run_len += 1;

                if run_len == n_clusters {
                    let first = run_start.unwrap();
                    for i in 0..(n_clusters - 1) {
                        let cur = first + i;
                        self.entries[cur as usize] = cur + 1;
                    }
                    let last = first + n_clusters - 1;
                    self.entries[last as usize] = self.width.end_of_chain_sentinel();

                    log::trace!("allocated {} cluster(s) starting at {}", n_clusters, first);
                    return Ok(first);
                }
            } else {
                run_start = None;
                run_len = 0;
            }
        }

        Err(Error::OutOfSpace(n_clusters))
    }

    /// Walks the chain starting at `start` and frees every cluster on it.
    /// A no-op if `start` is already an end-of-chain marker; bounded
    /// against cycles.
    pub fn free_chain(&mut self, start: u32) {
        if self.is_end(start) {
            return;
        }

        let mut seen = HashSet::new();
        let mut cur = start;
        loop {
            if !seen.insert(cur) || cur as usize >= self.entries.len() {
                break;
            }
            let next = self.next(cur);
            self.entries[cur as usize] = 0;
            if self.is_end(next) {
                break;
            }
            cur = next;
        }

        log::trace!("freed chain starting at {}", start);
    }

    /// Number of entries (== `total_clusters`).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Raw value of a single entry, for tests and diagnostics.
    #[cfg(test)]
    pub(crate) fn entry(&self, cluster: u32) -> u32 {
        self.entries[cluster as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemDevice;
    use crate::fat::header::{FatWidth, Geometry};

    fn geometry(total_clusters: u32) -> Geometry {
        Geometry {
            partition_offset: 0,
            partition_size: 0,
            cluster_size: 0x4000,
            total_clusters,
            fat_width: FatWidth::from_total_clusters(total_clusters),
            fat_offset: 0x1000,
            data_offset: 0x2000,
        }
    }

    fn empty_fat(total_clusters: u32) -> Fat {
        Fat { entries: vec![0u32; total_clusters as usize], width: FatWidth::from_total_clusters(total_clusters) }
    }

    #[test]
    fn flush_then_load_round_trips() {
        let g = geometry(1024);
        let mut dev = MemDevice::zeroed(0x1000000);

        let mut fat = empty_fat(1024);
        fat.allocate(3).unwrap();
        fat.flush(&mut dev, &g).unwrap();

        let reloaded = Fat::load(&mut dev, &g).unwrap();
        assert_eq!(reloaded.entries, fat.entries);
    }

    #[test]
    fn allocate_is_contiguous_and_terminated() {
        let mut fat = empty_fat(16);
        let first = fat.allocate(3).unwrap();

        assert_eq!(first, 2);
        assert_eq!(fat.entry(2), 3);
        assert_eq!(fat.entry(3), 4);
        assert!(fat.is_end(fat.entry(4)));
    }

    #[test]
    fn allocate_skips_occupied_runs() {
        let mut fat = empty_fat(16);
        fat.entries[2] = 1; // occupy cluster 2 with a bogus but non-zero link
        let first = fat.allocate(2).unwrap();
        assert_eq!(first, 3);
    }

    #[test]
    fn out_of_space_leaves_fat_unchanged() {
        let mut fat = empty_fat(6); // only clusters 2..6 allocatable: 4 free
        let before = fat.entries.clone();

        assert!(matches!(fat.allocate(5), Err(Error::OutOfSpace(5))));
        assert_eq!(fat.entries, before);
    }

    #[test]
    fn chain_detects_cycles() {
        let mut fat = empty_fat(8);
        fat.entries[2] = 3;
        fat.entries[3] = 2; // cycle back to 2

        assert!(matches!(fat.chain(2), Err(Error::CorruptChain(2))));
    }

    #[test]
    fn chain_walks_to_end() {
        let mut fat = empty_fat(8);
        let first = fat.allocate(3).unwrap();
        assert_eq!(fat.chain(first).unwrap(), vec![2, 3, 4]);
    }

    #[test]
    fn free_chain_zeroes_every_visited_cluster() {
        let mut fat = empty_fat(8);
        let first = fat.allocate(3).unwrap();
        fat.free_chain(first);

        assert_eq!(fat.entry(2), 0);
        assert_eq!(fat.entry(3), 0);
        assert_eq!(fat.entry(4), 0);
    }

    #[test]
    fn free_chain_is_noop_on_already_terminal_cluster() {
        let mut fat = empty_fat(8);
        fat.free_chain(fat.width.end_of_chain_sentinel());
        assert!(fat.entries.iter().all(|&e| e == 0));
    }
}
