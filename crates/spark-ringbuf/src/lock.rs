//! 锁能力。
//!
//! # 模块角色（Why）
//! - 环形缓冲本身不规定任何互斥策略：调用方可以选择无锁（单线程）、自旋锁或可阻塞的互斥锁；
//! - 每个缓冲在构造时注入自己的锁对象，调用方也可以传入 `Arc<L>` 让多个缓冲共享同一把锁。
//!
//! # 核心机制（How）
//! - [`RingLock`] 只有 `acquire`/`release` 两个钩子，与 `lock_api::RawMutex` 的形状一致；
//! - 缓冲内部一律通过 [`LockGuard`] 获取锁，任何退出路径（包括提前返回与 panic 展开）都会释放；
//! - [`ExclusiveLock`] 是 `unsafe` 标记：只有真正提供互斥的实现才能标记，
//!   缓冲仅在锁实现该标记时才是 `Sync`。默认的 [`NoopLock`] 不实现它，
//!   “未提供锁只能单线程使用”的调用约定因此由编译器检查。

use alloc::sync::Arc;
use core::fmt;

#[cfg(feature = "std")]
use parking_lot::lock_api::RawMutex as _;

/// 可插拔的加锁/解锁钩子。
pub trait RingLock {
    /// 进入临界区。
    fn acquire(&self);

    /// 离开临界区。
    ///
    /// # Safety
    /// 调用方必须持有此前通过 [`RingLock::acquire`] 获得的锁。
    unsafe fn release(&self);
}

/// 标记 `acquire`/`release` 之间的区段对其它线程真正互斥。
///
/// # Safety
/// 实现者保证：一次 `acquire` 返回后、对应的 `release` 调用前，
/// 其它线程上的 `acquire` 不会返回；且 `release` 对后续 `acquire` 建立 happens-before 关系。
pub unsafe trait ExclusiveLock: RingLock + Sync {}

impl<T: RingLock + ?Sized> RingLock for &T {
    fn acquire(&self) {
        (**self).acquire()
    }

    unsafe fn release(&self) {
        unsafe { (**self).release() }
    }
}

// SAFETY: 转发给内部实现，互斥性与内部实现一致。
unsafe impl<T: ExclusiveLock + ?Sized> ExclusiveLock for &T {}

impl<T: RingLock + ?Sized> RingLock for Arc<T> {
    fn acquire(&self) {
        (**self).acquire()
    }

    unsafe fn release(&self) {
        unsafe { (**self).release() }
    }
}

// SAFETY: 同上；`Arc<T>: Sync` 需要 `T: Send + Sync`。
unsafe impl<T: ExclusiveLock + Send + ?Sized> ExclusiveLock for Arc<T> {}

/// 作用域锁：构造时加锁，析构时解锁。
#[must_use = "锁在 LockGuard 析构时立即释放"]
pub struct LockGuard<'a, L: RingLock + ?Sized> {
    lock: &'a L,
}

impl<'a, L: RingLock + ?Sized> LockGuard<'a, L> {
    pub fn acquire(lock: &'a L) -> Self {
        lock.acquire();
        Self { lock }
    }
}

impl<L: RingLock + ?Sized> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        // SAFETY: 守卫只能由 `acquire` 构造，构造时已经持有锁。
        unsafe { self.lock.release() }
    }
}

impl<L: RingLock + ?Sized> fmt::Debug for LockGuard<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard").finish_non_exhaustive()
    }
}

/// 默认锁：两个钩子均为空操作。使用它的缓冲不是 `Sync`。
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLock;

impl RingLock for NoopLock {
    fn acquire(&self) {}

    unsafe fn release(&self) {}
}

/// 基于 `spin::Mutex` 的自旋锁，适用于无操作系统或临界区极短的场景。
#[derive(Default)]
pub struct SpinLock {
    inner: spin::Mutex<()>,
}

impl SpinLock {
    pub const fn new() -> Self {
        Self {
            inner: spin::Mutex::new(()),
        }
    }
}

impl RingLock for SpinLock {
    fn acquire(&self) {
        // 守卫被遗忘后锁保持占用，直到 `release` 调用 `force_unlock`。
        core::mem::forget(self.inner.lock());
    }

    unsafe fn release(&self) {
        // SAFETY: 调用方持有 `acquire` 遗忘掉守卫的那把锁。
        unsafe { self.inner.force_unlock() }
    }
}

// SAFETY: `spin::Mutex` 以获取/释放语义的原子交换实现互斥。
unsafe impl ExclusiveLock for SpinLock {}

impl fmt::Debug for SpinLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLock")
            .field("locked", &self.inner.is_locked())
            .finish()
    }
}

/// 基于 `parking_lot::RawMutex` 的可阻塞互斥锁，竞争激烈时会让出线程。
#[cfg(feature = "std")]
pub struct ParkingLock {
    raw: parking_lot::RawMutex,
}

#[cfg(feature = "std")]
impl ParkingLock {
    pub const fn new() -> Self {
        Self {
            raw: parking_lot::RawMutex::INIT,
        }
    }
}

#[cfg(feature = "std")]
impl Default for ParkingLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl RingLock for ParkingLock {
    fn acquire(&self) {
        self.raw.lock();
    }

    unsafe fn release(&self) {
        // SAFETY: 调用方持有锁，满足 `RawMutex::unlock` 的前置条件。
        unsafe { self.raw.unlock() }
    }
}

#[cfg(feature = "std")]
// SAFETY: `parking_lot::RawMutex` 满足 `lock_api::RawMutex` 的互斥契约。
unsafe impl ExclusiveLock for ParkingLock {}

#[cfg(feature = "std")]
impl fmt::Debug for ParkingLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParkingLock")
            .field("locked", &self.raw.is_locked())
            .finish()
    }
}
