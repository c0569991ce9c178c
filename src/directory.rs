//! The directory engine: decode/encode, lookup, insert,
//! tombstone, prune, and write-back for one directory's cluster chain.

use crate::device::Device;
use crate::error::{Error, Result};
use crate::fat::cluster;
use crate::fat::dirent::{self, DirEntry};
use crate::fat::header::Geometry;
use crate::fat::table::Fat;

/// A directory's decoded entry list plus the first cluster of its chain.
///
/// Entries include tombstones and "unknown" records: they're preserved in
/// place so write-back doesn't reshuffle the on-disk layout.
#[derive(Debug, Clone)]
pub struct Directory {
    pub first_cluster: u32,
    pub entries: Vec<DirEntry>,
}

impl Directory {
    /// Loads a directory by reading its entire cluster chain.
    pub fn load<D: Device>(device: &mut D, geometry: &Geometry, fat: &Fat, first_cluster: u32) -> Result<Self> {
        let bytes = cluster::read_chain(device, geometry, fat, first_cluster)?;
        Ok(Self { first_cluster, entries: dirent::decode_all(bytes.as_slice()) })
    }

    /// Case-insensitive ASCII lookup over live entries only. Exactly one
    /// match is required.
    pub fn lookup_index(&self, name: &str) -> Result<usize> {
        let mut found = None;
        for (idx, entry) in self.entries.iter().enumerate() {
            if let Some(entry_name) = entry.name() {
                if entry_name.eq_ignore_ascii_case(name) {
                    if found.is_some() {
                        return Err(Error::Ambiguous(name.to_string()));
                    }
                    found = Some(idx);
                }
            }
        }
        found.ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn lookup(&self, name: &str) -> Result<&DirEntry> {
        self.lookup_index(name).map(|idx| &self.entries[idx])
    }

    /// Appends `entry` to the in-memory list. Does not write back; callers
    /// must call [`Directory::save`].
    pub fn insert(&mut self, entry: DirEntry) {
        self.entries.push(entry);
    }

    /// Sets `name_length = 0xE5` on the matching live entry, in place.
    pub fn tombstone(&mut self, name: &str) -> Result<()> {
        let idx = self.lookup_index(name)?;
        self.entries[idx].tombstone();
        Ok(())
    }

    /// Drops every entry that isn't a live `ValidFile` record. Used only by
    /// the host-mirroring export path, never by normal
    /// file ops.
    pub fn prune(&mut self) {
        self.entries.retain(DirEntry::is_valid_file);
    }

    /// Live entries only, in on-disk order — the view `list()`
    /// exposes.
    pub fn live_entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries.iter().filter(|e| e.is_valid_file())
    }

    /// Writes this directory back to its cluster chain.
    ///
    /// First blanks the chain's *full current extent* with `0xFF` (so a
    /// shrunk entry list doesn't leave stale bytes after the new
    /// terminator), then writes `encode(entries)` starting at the first
    /// cluster. If the encoded form doesn't fit the current extent, grows
    /// the chain by linking freshly allocated clusters onto its tail
    /// and retries.
    pub fn save<D: Device>(&self, device: &mut D, geometry: &Geometry, fat: &mut Fat) -> Result<()> {
        loop {
            let chain = fat.chain(self.first_cluster)?;
            let capacity = chain.len() as u64 * geometry.cluster_size;
            let encoded = dirent::encode_all(&self.entries);

            if (encoded.len() as u64) <= capacity {
                let blank = vec![0xFFu8; capacity as usize];
                cluster::write_chain(device, geometry, fat, self.first_cluster, &blank)?;
                cluster::write_chain(device, geometry, fat, self.first_cluster, &encoded)?;
                log::trace!("saved directory at cluster {} ({} entries)", self.first_cluster, self.entries.len());
                return Ok(());
            }

            let tail = *chain.last().unwrap();
            match fat.allocate(1) {
                Ok(new_cluster) => fat.link(tail, new_cluster),
                Err(Error::OutOfSpace(_)) => return Err(Error::DirectoryFull),
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemDevice;
    use crate::fat::header::{FatWidth, Geometry};

    fn geometry() -> Geometry {
        Geometry {
            partition_offset: 0,
            partition_size: 0x1000000,
            cluster_size: 0x4000,
            total_clusters: 1024,
            fat_width: FatWidth::Fat16,
            fat_offset: 0x1000,
            data_offset: 0x2000,
        }
    }

    fn fresh_dir(dev: &mut MemDevice, g: &Geometry, fat: &mut Fat) -> Directory {
        let first = fat.allocate(1).unwrap();
        let blank = vec![0xFFu8; g.cluster_size as usize];
        cluster::write_chain(dev, g, fat, first, &blank).unwrap();
        Directory { first_cluster: first, entries: Vec::new() }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let g = geometry();
        let mut dev = MemDevice::zeroed(g.partition_size as usize);
        let mut fat = Fat::load(&mut dev, &g).unwrap();
        let mut dir = fresh_dir(&mut dev, &g, &mut fat);

        dir.insert(DirEntry::new_file("Readme.TXT", 2, 0).unwrap());
        assert!(dir.lookup("README.TXT").is_ok());
        assert!(dir.lookup("readme.txt").is_ok());
    }

    #[test]
    fn lookup_reports_not_found_and_ambiguous() {
        let g = geometry();
        let mut dev = MemDevice::zeroed(g.partition_size as usize);
        let mut fat = Fat::load(&mut dev, &g).unwrap();
        let mut dir = fresh_dir(&mut dev, &g, &mut fat);

        assert!(matches!(dir.lookup("missing"), Err(Error::NotFound(_))));

        dir.insert(DirEntry::new_file("dup", 2, 0).unwrap());
        dir.insert(DirEntry::new_file("DUP", 3, 0).unwrap());
        assert!(matches!(dir.lookup("dup"), Err(Error::Ambiguous(_))));
    }

    #[test]
    fn tombstone_keeps_position_and_is_invisible_to_lookup() {
        let g = geometry();
        let mut dev = MemDevice::zeroed(g.partition_size as usize);
        let mut fat = Fat::load(&mut dev, &g).unwrap();
        let mut dir = fresh_dir(&mut dev, &g, &mut fat);

        dir.insert(DirEntry::new_file("a", 2, 0).unwrap());
        dir.insert(DirEntry::new_file("b", 3, 0).unwrap());
        dir.tombstone("a").unwrap();

        assert_eq!(dir.entries.len(), 2);
        assert!(dir.lookup("a").is_err());
        assert!(dir.lookup("b").is_ok());
    }

    #[test]
    fn save_then_load_round_trips_and_terminator_is_fresh() {
        let g = geometry();
        let mut dev = MemDevice::zeroed(g.partition_size as usize);
        let mut fat = Fat::load(&mut dev, &g).unwrap();
        let mut dir = fresh_dir(&mut dev, &g, &mut fat);

        dir.insert(DirEntry::new_file("a", 2, 0).unwrap());
        dir.insert(DirEntry::new_directory("b", 3).unwrap());
        dir.save(&mut dev, &g, &mut fat).unwrap();

        let reloaded = Directory::load(&mut dev, &g, &fat, dir.first_cluster).unwrap();
        assert_eq!(reloaded.live_entries().count(), 2);
        assert_eq!(reloaded.entries.len(), 2); // the terminator itself isn't part of the loaded list
    }

    #[test]
    fn save_grows_chain_when_entries_overflow_one_cluster() {
        // A tiny cluster size forces growth with only a couple of entries.
        let mut g = geometry();
        g.cluster_size = 128; // 2 entries' worth, room for 1 live + terminator
        let mut dev = MemDevice::zeroed(g.partition_size as usize);
        let mut fat = Fat::load(&mut dev, &g).unwrap();
        let mut dir = fresh_dir(&mut dev, &g, &mut fat);

        for i in 0..5 {
            dir.insert(DirEntry::new_file(&format!("f{}", i), 2, 0).unwrap());
        }
        dir.save(&mut dev, &g, &mut fat).unwrap();

        let chain = fat.chain(dir.first_cluster).unwrap();
        assert!(chain.len() > 1, "expected directory chain to grow past one cluster");

        let reloaded = Directory::load(&mut dev, &g, &fat, dir.first_cluster).unwrap();
        assert_eq!(reloaded.live_entries().count(), 5);
    }
}
