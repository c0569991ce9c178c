//! Cluster I/O: translates a cluster number to a byte offset and moves
//! whole clusters (or whole chains) of bytes to and from the device.

use crate::device::Device;
use crate::error::{Error, Result};
use crate::fat::header::Geometry;
use crate::fat::table::Fat;

/// Reads a single cluster's worth of bytes.
pub fn read_cluster<D: Device>(device: &mut D, geometry: &Geometry, cluster: u32) -> Result<Vec<u8>> {
    let offset = geometry.partition_offset + geometry.cluster_offset(cluster);
    Ok(device.read_at(offset, geometry.cluster_size as usize)?)
}

/// Writes `data` into a single cluster; only `min(data.len(), cluster_size)`
/// bytes are written.
pub fn write_cluster<D: Device>(device: &mut D, geometry: &Geometry, cluster: u32, data: &[u8]) -> Result<()> {
    let offset = geometry.partition_offset + geometry.cluster_offset(cluster);
    let len = data.len().min(geometry.cluster_size as usize);
    device.write_at(offset, &data[..len])?;
    Ok(())
}

/// Reads an entire cluster chain, producing `chain_length * cluster_size`
/// bytes (callers truncate to a file's logical size themselves).
pub fn read_chain<D: Device>(device: &mut D, geometry: &Geometry, fat: &Fat, start: u32) -> Result<Vec<u8>> {
    let clusters = fat.chain(start)?;
    let mut out = Vec::with_capacity(clusters.len() * geometry.cluster_size as usize);
    for cluster in clusters {
        out.extend_from_slice(&read_cluster(device, geometry, cluster)?);
    }
    Ok(out)
}

/// Writes `data` across the existing chain starting at `start`, one
/// cluster-sized slice per cluster. Fails `ShortChain` if the chain isn't
/// long enough to hold all of `data`, rather than silently truncating the
/// write.
pub fn write_chain<D: Device>(device: &mut D, geometry: &Geometry, fat: &Fat, start: u32, data: &[u8]) -> Result<()> {
    let clusters = fat.chain(start)?;
    let cluster_size = geometry.cluster_size as usize;
    let needed = (data.len() + cluster_size - 1) / cluster_size.max(1);

    if clusters.len() < needed {
        return Err(Error::ShortChain(start));
    }

    for (i, cluster) in clusters.iter().enumerate() {
        let chunk_start = i * cluster_size;
        if chunk_start >= data.len() {
            break;
        }
        let chunk_end = (chunk_start + cluster_size).min(data.len());
        write_cluster(device, geometry, *cluster, &data[chunk_start..chunk_end])?;
    }

    Ok(())
}
