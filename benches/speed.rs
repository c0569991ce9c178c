//! Benchmarks for the hot paths: FAT allocation and whole-file write/read.

use criterion::{
    criterion_group, criterion_main, AxisScale, BatchSize, BenchmarkId, Criterion,
    PlotConfiguration, Throughput,
};

use fatx::device::MemDevice;
use fatx::driver::Driver;
use fatx::fat::header::{Geometry, Header};
use fatx::Device;

const SECTORS_PER_CLUSTER: u32 = 32;
const TOTAL_CLUSTERS: u32 = 1 << 16;

fn fresh_image() -> MemDevice {
    let header = Header { volume_id: 0, sectors_per_cluster: SECTORS_PER_CLUSTER, root_dir_first_cluster: 1 };
    let cluster_size = SECTORS_PER_CLUSTER as u64 * 512;
    let partition_size = cluster_size * TOTAL_CLUSTERS as u64;
    let geometry = Geometry::derive(&header, 0, partition_size).unwrap();

    let mut dev = MemDevice::zeroed(partition_size as usize);
    dev.write_at(0, &header.encode()).unwrap();

    let sentinel = geometry.fat_width.end_of_chain_sentinel() as u16;
    dev.write_at(geometry.fat_offset + 2, &sentinel.to_le_bytes()).unwrap();

    let blank = vec![0xFFu8; cluster_size as usize];
    dev.write_at(geometry.cluster_offset(1), &blank).unwrap();

    dev
}

fn bench_write_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("file write/read");
    let plot_config = PlotConfiguration::default().summary_scale(AxisScale::Logarithmic);
    group.plot_config(plot_config);

    for file_size in [1024usize, 100 * 1024, 5 * 1024 * 1024] {
        group.throughput(Throughput::Bytes(file_size as u64));

        group.bench_with_input(BenchmarkId::new("write_file", file_size), &file_size, |b, &size| {
            b.iter_batched(
                || (Driver::mount_default(fresh_image()).unwrap(), vec![0xABu8; size]),
                |(mut driver, data)| driver.write_file("bench.bin", &data).unwrap(),
                BatchSize::LargeInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("read_file", file_size), &file_size, |b, &size| {
            b.iter_batched(
                || {
                    let mut driver = Driver::mount_default(fresh_image()).unwrap();
                    driver.write_file("bench.bin", &vec![0xABu8; size]).unwrap();
                    driver
                },
                |mut driver| driver.read_file("bench.bin").unwrap(),
                BatchSize::LargeInput,
            )
        });
    }
}

fn bench_allocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("fat allocate");

    for n_clusters in [1u32, 64, 4096] {
        group.throughput(Throughput::Elements(n_clusters as u64));
        group.bench_with_input(BenchmarkId::new("allocate", n_clusters), &n_clusters, |b, &n| {
            b.iter_batched(
                || {
                    let header =
                        Header { volume_id: 0, sectors_per_cluster: SECTORS_PER_CLUSTER, root_dir_first_cluster: 1 };
                    let cluster_size = SECTORS_PER_CLUSTER as u64 * 512;
                    let geometry = Geometry::derive(&header, 0, cluster_size * TOTAL_CLUSTERS as u64).unwrap();
                    fatx::fat::table::Fat::load(&mut fresh_image(), &geometry).unwrap()
                },
                |mut fat| fat.allocate(n).unwrap(),
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(benches, bench_write_read, bench_allocate);
criterion_main!(benches);
