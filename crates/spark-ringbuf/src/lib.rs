#![cfg_attr(not(feature = "std"), no_std)]

//! `spark-ringbuf` 提供面向流式字节暂存的环形缓冲实现。
//!
//! # 模块定位（Why）
//! - I/O 暂存、生产者/消费者字节管道需要一个有界 FIFO：写满时返回部分结果而不是阻塞，
//!   读空时返回 0 而不是挂起；
//! - 分配器与互斥策略由调用方决定，核心只负责游标算术与跨边界拷贝。
//!
//! # 设计概要（How）
//! - `ring` 模块实现 [`RingBuffer`]：容量恒为 2 的幂，逻辑游标单调递增，
//!   通过掩码（`capacity - 1`）映射到物理偏移；
//! - `span` 模块集中实现跨越物理末尾的“分段拷贝”，读、写与扩容搬迁共用同一份逻辑；
//! - `allocator` 与 `lock` 模块以 trait 形式注入分配器与锁能力，取代进程级的全局函数指针；
//! - `io` 模块在 `std` 下桥接 `std::io::Read`/`Write`。
//!
//! # 命名约定（Consistency）
//! - `occupied_length` 表示尚未读取的字节数，`available_length` 表示剩余空间，
//!   二者之和在无并发操作时恒等于 `capacity`。

extern crate alloc;

pub mod allocator;
mod config;
mod cursor;
mod error;
#[cfg(feature = "std")]
mod io;
pub mod lock;
mod ring;
mod span;
mod sync;

pub use allocator::{RingAllocator, SystemAllocator};
pub use config::RingBufferConfig;
pub use cursor::Cursor;
pub use error::{Result, RingBufferError};
pub use lock::{ExclusiveLock, LockGuard, NoopLock, RingLock, SpinLock};
#[cfg(feature = "std")]
pub use lock::ParkingLock;
pub use ring::{RingBuffer, RingStats, RingUsage};
