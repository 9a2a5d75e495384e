use criterion::{BenchmarkId, Criterion, Throughput, black_box};
use spark_ringbuf::{NoopLock, ParkingLock, RingBuffer, SpinLock, SystemAllocator};
use std::{env, time::Duration};

/// 环形缓冲吞吐基准：对比不同锁能力在“写入 -> 读出”往返中的开销。
///
/// # 设计背景（Why）
/// - 锁由调用方注入，单线程场景可以选择 `NoopLock`；需要量化互斥锁带来的额外成本。
/// - 每轮写入的块长与容量互素，读写游标会频繁越过物理末尾，分段拷贝路径被持续覆盖。
///
/// # 逻辑解析（How）
/// - 固定容量 4 KiB，每轮写入 `chunk` 字节后立即读出，缓冲占用始终很低；
/// - 分别以 `NoopLock`、`SpinLock`、`ParkingLock` 运行同一循环。
fn bench_locked_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_roundtrip");
    for chunk in [64usize, 1000] {
        group.throughput(Throughput::Bytes(chunk as u64));
        let payload = vec![0xA5u8; chunk];

        let noop = RingBuffer::new(4096, false).expect("构造基准缓冲");
        group.bench_with_input(BenchmarkId::new("noop", chunk), &payload, |b, payload| {
            let mut sink = vec![0u8; payload.len()];
            b.iter(|| {
                noop.write(black_box(payload));
                black_box(noop.read(&mut sink))
            });
        });

        let spin: RingBuffer<SystemAllocator, SpinLock> =
            RingBuffer::with_lock(4096, false, SpinLock::new()).expect("构造基准缓冲");
        group.bench_with_input(BenchmarkId::new("spin", chunk), &payload, |b, payload| {
            let mut sink = vec![0u8; payload.len()];
            b.iter(|| {
                spin.write(black_box(payload));
                black_box(spin.read(&mut sink))
            });
        });

        let parking: RingBuffer<SystemAllocator, ParkingLock> =
            RingBuffer::with_lock(4096, false, ParkingLock::new()).expect("构造基准缓冲");
        group.bench_with_input(BenchmarkId::new("parking", chunk), &payload, |b, payload| {
            let mut sink = vec![0u8; payload.len()];
            b.iter(|| {
                parking.write(black_box(payload));
                black_box(parking.read(&mut sink))
            });
        });
    }
    group.finish();
}

/// 扩容基准：从容量 1 开始连续写入 64 KiB，测量翻倍与搬迁的累计成本。
fn bench_growth(c: &mut Criterion) {
    let payload = [0x5Au8; 256];
    c.bench_function("ring_growth_to_64k", |b| {
        b.iter(|| {
            let ring: RingBuffer<SystemAllocator, NoopLock> =
                RingBuffer::new(1, true).expect("构造可扩容缓冲");
            for _ in 0..256 {
                ring.write(black_box(&payload));
            }
            black_box(ring.capacity())
        });
    });
}

fn main() {
    let mut quick_mode = false;
    for arg in env::args().skip(1) {
        if arg == "--quick" {
            quick_mode = true;
        }
    }

    let mut criterion = Criterion::default();
    if quick_mode {
        criterion = criterion
            .sample_size(10)
            .warm_up_time(Duration::from_millis(100))
            .measurement_time(Duration::from_millis(250));
    }

    bench_locked_roundtrip(&mut criterion);
    bench_growth(&mut criterion);
    criterion.final_summary();
}
