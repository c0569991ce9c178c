//! The top-level `Driver`: ties the mounter, FAT engine, cluster I/O, and
//! directory engine together into the file operations callers actually use.

use crate::device::Device;
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::fat::cluster;
use crate::fat::dirent::DirEntry;
use crate::fat::header::{Geometry, Header};
use crate::fat::table::Fat;
use crate::partition;

/// Everything that exists only once a partition is mounted. Kept as one
/// struct so a re-mount can build a fresh instance and only swap it into
/// the `Driver` on success — a failed re-mount must leave the prior mount
/// entirely untouched.
struct Mounted {
    geometry: Geometry,
    fat: Fat,
    /// Root directory's first cluster, read from the header (conventionally
    /// 1, but the header field exists precisely so it needn't be).
    root_cluster: u32,
    cur_dir: Directory,
    cur_cluster: u32,
    dir_stack: Vec<u32>,
}

/// A mounted FATX driver: exclusive owner of a backing [`Device`], the
/// in-memory FAT, and the current-directory state.
pub struct Driver<D: Device> {
    device: D,
    mounted: Mounted,
}

impl<D: Device> Driver<D> {
    /// Mounts at `(offset = 0, size = device length)`.
    pub fn mount_default(mut device: D) -> Result<Self> {
        let size = device.len()?;
        let mounted = Self::do_mount(&mut device, 0, size)?;
        Ok(Self { device, mounted })
    }

    /// Mounts the `i`th entry of the fixed Xbox HDD partition table.
    pub fn mount_index(mut device: D, index: usize) -> Result<Self> {
        let range = partition::by_index(index)?;
        let mounted = Self::do_mount(&mut device, range.offset, range.size)?;
        Ok(Self { device, mounted })
    }

    /// Mounts an explicit partition-relative offset and size.
    pub fn mount_range(mut device: D, offset: u64, size: u64) -> Result<Self> {
        let mounted = Self::do_mount(&mut device, offset, size)?;
        Ok(Self { device, mounted })
    }

    /// Re-mounts in place. On failure, the driver's prior state is left
    /// exactly as it was.
    pub fn remount_range(&mut self, offset: u64, size: u64) -> Result<()> {
        self.mounted = Self::do_mount(&mut self.device, offset, size)?;
        Ok(())
    }

    fn do_mount(device: &mut D, offset: u64, size: u64) -> Result<Mounted> {
        let header_bytes = device.read_at(offset, crate::fat::header::HEADER_LEN)?;
        let header = Header::decode(&header_bytes)?;
        let geometry = Geometry::derive(&header, offset, size)?;
        let fat = Fat::load(device, &geometry)?;
        let root_cluster = header.root_dir_first_cluster;
        let cur_dir = Directory::load(device, &geometry, &fat, root_cluster)?;

        log::debug!(
            "mounted FATX partition at {:#x} (+{:#x}): cluster_size={:#x} total_clusters={} fat_width={:?} root_cluster={}",
            offset, size, geometry.cluster_size, geometry.total_clusters, geometry.fat_width, root_cluster,
        );

        Ok(Mounted { geometry, fat, root_cluster, cur_dir, cur_cluster: root_cluster, dir_stack: Vec::new() })
    }

    /// Resets current-directory state back to root, reloading its entries.
    fn reset_to_root(&mut self) -> Result<()> {
        self.mounted.cur_cluster = self.mounted.root_cluster;
        self.mounted.cur_dir =
            Directory::load(&mut self.device, &self.mounted.geometry, &self.mounted.fat, self.mounted.root_cluster)?;
        self.mounted.dir_stack.clear();
        Ok(())
    }

    /// Changes the current directory along a slash-delimited path.
    pub fn change_directory(&mut self, path: &str) -> Result<()> {
        if path.starts_with('/') {
            self.reset_to_root()?;
        }

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            match segment {
                "." => continue,
                ".." => {
                    if let Some(parent) = self.mounted.dir_stack.pop() {
                        self.mounted.cur_cluster = parent;
                        self.mounted.cur_dir =
                            Directory::load(&mut self.device, &self.mounted.geometry, &self.mounted.fat, parent)?;
                    } else {
                        self.reset_to_root()?;
                    }
                }
                name => {
                    let entry = self.mounted.cur_dir.lookup(name)?;
                    if !entry.is_directory() {
                        return Err(Error::NotFound(name.to_string()));
                    }
                    let next_cluster = entry.first_cluster;

                    self.mounted.dir_stack.push(self.mounted.cur_cluster);
                    self.mounted.cur_cluster = next_cluster;
                    self.mounted.cur_dir =
                        Directory::load(&mut self.device, &self.mounted.geometry, &self.mounted.fat, next_cluster)?;
                }
            }
        }

        Ok(())
    }

    /// The current directory's live entries.
    pub fn list(&self) -> Vec<DirEntry> {
        self.mounted.cur_dir.live_entries().cloned().collect()
    }

    /// Looks up `name` in the current directory.
    pub fn stat(&self, name: &str) -> Result<DirEntry> {
        self.mounted.cur_dir.lookup(name).cloned()
    }

    /// Whether `name` exists in the current directory. `NotFound` collapses
    /// to `Ok(false)`; every other error still propagates.
    pub fn file_exists(&self, name: &str) -> Result<bool> {
        match self.stat(name) {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Reads a file's full contents.
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = self.mounted.cur_dir.lookup(name)?.clone();
        let raw = cluster::read_chain(&mut self.device, &self.mounted.geometry, &self.mounted.fat, entry.first_cluster)?;
        raw.get(..entry.file_size as usize)
            .map(|slice| slice.to_vec())
            .ok_or(Error::CorruptChain(entry.first_cluster))
    }

    /// Creates a new file with the given contents. Fails `AlreadyExists`
    /// if `name` is already present, `InvalidName` if `name` is empty or
    /// longer than 42 bytes.
    pub fn write_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        if name.is_empty() || name.len() > crate::fat::dirent::NAME_MAX {
            return Err(Error::InvalidName(name.to_string()));
        }
        if self.mounted.cur_dir.lookup(name).is_ok() {
            return Err(Error::AlreadyExists(name.to_string()));
        }

        let cluster_size = self.mounted.geometry.cluster_size as usize;
        let n_clusters = ((data.len() + cluster_size - 1) / cluster_size).max(1) as u32;

        let first = self.mounted.fat.allocate(n_clusters)?;
        cluster::write_chain(&mut self.device, &self.mounted.geometry, &self.mounted.fat, first, data)?;

        let entry = DirEntry::new_file(name, first, data.len() as u32)?;
        self.mounted.cur_dir.insert(entry);
        self.mounted.cur_dir.save(&mut self.device, &self.mounted.geometry, &mut self.mounted.fat)?;
        self.mounted.fat.flush(&mut self.device, &self.mounted.geometry)?;

        Ok(())
    }

    /// Tombstones the directory entry and frees its cluster chain.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let entry = self.mounted.cur_dir.lookup(name)?.clone();

        self.mounted.cur_dir.tombstone(name)?;
        self.mounted.fat.free_chain(entry.first_cluster);

        self.mounted.cur_dir.save(&mut self.device, &self.mounted.geometry, &mut self.mounted.fat)?;
        self.mounted.fat.flush(&mut self.device, &self.mounted.geometry)?;

        Ok(())
    }

    /// Creates a subdirectory. Idempotent if `name` already names a
    /// directory; fails `AlreadyExists` if it names a file, `InvalidName`
    /// if `name` is empty or longer than 42 bytes.
    pub fn make_directory(&mut self, name: &str) -> Result<()> {
        if name.is_empty() || name.len() > crate::fat::dirent::NAME_MAX {
            return Err(Error::InvalidName(name.to_string()));
        }
        match self.mounted.cur_dir.lookup(name) {
            Ok(entry) if entry.is_directory() => return Ok(()),
            Ok(_) => return Err(Error::AlreadyExists(name.to_string())),
            Err(Error::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let first = self.mounted.fat.allocate(1)?;
        let blank = vec![0xFFu8; self.mounted.geometry.cluster_size as usize];
        cluster::write_chain(&mut self.device, &self.mounted.geometry, &self.mounted.fat, first, &blank)?;

        let entry = DirEntry::new_directory(name, first)?;
        self.mounted.cur_dir.insert(entry);
        self.mounted.cur_dir.save(&mut self.device, &self.mounted.geometry, &mut self.mounted.fat)?;
        self.mounted.fat.flush(&mut self.device, &self.mounted.geometry)?;

        Ok(())
    }

    /// Saves the current directory and the FAT.
    pub fn flush(&mut self) -> Result<()> {
        self.mounted.cur_dir.save(&mut self.device, &self.mounted.geometry, &mut self.mounted.fat)?;
        self.mounted.fat.flush(&mut self.device, &self.mounted.geometry)?;
        Ok(())
    }

    /// The geometry derived at mount time, for diagnostics.
    pub fn geometry(&self) -> &Geometry {
        &self.mounted.geometry
    }
}
