use alloc::boxed::Box;
use core::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::{
    allocator::{RingAllocator, SystemAllocator},
    config::RingBufferConfig,
    cursor::Cursor,
    error::{Result, RingBufferError},
    lock::{ExclusiveLock, LockGuard, NoopLock, RingLock},
    span::WrapSpan,
    sync::{AtomicBool, AtomicUsize, Ordering, StateCell},
};

/// 缓冲生命周期内的累计计数，`reset` 不会清零。
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RingStats {
    pub bytes_written: u64,
    pub bytes_read: u64,
    pub rejected_writes: u64,
    pub growths: u64,
}

/// 在同一次加锁内取得的容量与占用快照。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RingUsage {
    pub capacity: usize,
    pub occupied: usize,
}

impl RingUsage {
    pub fn available(&self) -> usize {
        self.capacity - self.occupied
    }
}

/// 扩容搬迁的结果：新存储与重定基到 0 的游标对。
///
/// 由 [`RingState::relocate`] 生成、[`RingState::adopt`] 一次性采纳，
/// 存储与游标不会在两个可被观察的步骤中分别修改。
struct Relocation {
    storage: Box<[u8]>,
    read: Cursor,
    write: Cursor,
}

/// 受锁保护的全部可变状态。
struct RingState {
    storage: Option<Box<[u8]>>,
    mask: usize,
    read: Cursor,
    write: Cursor,
    stats: RingStats,
}

impl RingState {
    fn new(storage: Box<[u8]>) -> Self {
        Self {
            mask: storage.len() - 1,
            storage: Some(storage),
            read: Cursor::ZERO,
            write: Cursor::ZERO,
            stats: RingStats::default(),
        }
    }

    fn capacity(&self) -> usize {
        self.storage.as_ref().map_or(0, |storage| storage.len())
    }

    fn occupied(&self) -> usize {
        let occupied = self.write.distance_from(self.read);
        debug_assert!(
            occupied <= self.capacity(),
            "占用 {occupied} 超过容量 {}",
            self.capacity()
        );
        occupied
    }

    fn free(&self) -> usize {
        self.capacity() - self.occupied()
    }

    fn readable_span(&self, max_len: usize) -> Option<(WrapSpan, &[u8])> {
        let storage = self.storage.as_deref()?;
        let take = max_len.min(self.occupied());
        let span = WrapSpan::new(storage.len(), self.read.offset(self.mask), take);
        Some((span, storage))
    }

    fn peek(&self, dst: &mut [u8]) -> usize {
        match self.readable_span(dst.len()) {
            Some((span, storage)) => {
                let take = span.len();
                span.copy_out(storage, &mut dst[..take]);
                take
            }
            None => 0,
        }
    }

    fn consume(&mut self, len: usize) {
        self.read = self.read.advance(len);
        self.stats.bytes_read += len as u64;
    }

    /// 写入路径第 3–5 步：按剩余空间截断、分段拷贝、推进写游标。
    fn append(&mut self, src: &[u8]) -> usize {
        let len = src.len().min(self.free());
        let offset = self.write.offset(self.mask);
        let Some(storage) = self.storage.as_deref_mut() else {
            return 0;
        };
        WrapSpan::new(storage.len(), offset, len).copy_in(storage, &src[..len]);
        self.write = self.write.advance(len);
        self.stats.bytes_written += len as u64;
        len
    }

    /// 把现有内容按逻辑顺序拷贝到 `target` 的 `[0, occupied)`，生成零基布局。
    fn relocate(&self, mut target: Box<[u8]>) -> Relocation {
        let occupied = self.occupied();
        debug_assert!(target.len() >= occupied);
        if let Some(storage) = self.storage.as_deref() {
            WrapSpan::new(storage.len(), self.read.offset(self.mask), occupied)
                .copy_out(storage, &mut target[..occupied]);
        }
        Relocation {
            storage: target,
            read: Cursor::ZERO,
            write: Cursor::ZERO.advance(occupied),
        }
    }

    /// 采纳搬迁结果，返回需要归还给分配器的旧存储。
    fn adopt(&mut self, relocation: Relocation) -> Option<Box<[u8]>> {
        self.mask = relocation.storage.len() - 1;
        self.read = relocation.read;
        self.write = relocation.write;
        self.stats.growths += 1;
        self.storage.replace(relocation.storage)
    }
}

/// 扩容目标：从当前容量开始反复翻倍，直到不小于 `capacity + len`。
///
/// 任何一步溢出 `usize` 都返回 `None`。
fn growth_target(capacity: usize, len: usize) -> Option<usize> {
    let required = capacity.checked_add(len)?;
    let mut size = capacity;
    loop {
        size = size.checked_mul(2)?;
        if size >= required {
            return Some(size);
        }
    }
}

/// 临界区占用标记。
///
/// 分配器、`BufMut` 与 tracing 订阅者都在临界区内被回调；它们若回到同一个缓冲，
/// 嵌套调用会在触及状态之前看到标记并退出，外层持有的状态引用因此始终唯一。
/// 标记只在持锁期间读写，跨线程的可见性由锁本身保证。
struct Entered<'a>(&'a AtomicBool);

impl<'a> Entered<'a> {
    fn enter(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::Relaxed) {
            None
        } else {
            Some(Entered(flag))
        }
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// `RingBuffer` 是容量为 2 的幂的字节环形缓冲。
///
/// # 设计动机（Why）
/// - 为 I/O 暂存与字节管道提供有界 FIFO：`read`/`write` 从不阻塞，只返回当前状态允许的字节数；
/// - 分配器 `A` 与锁 `L` 以泛型注入，调用方完全掌控内存来源与互斥策略。
///
/// # 架构关系（How）
/// - 读写游标是单调递增的 [`Cursor`]，两者之差即占用长度；物理偏移为 `cursor & (capacity - 1)`；
/// - 所有触及存储或游标的操作都通过 [`LockGuard`] 在临界区内完成；
/// - 可扩容缓冲在空间不足时翻倍扩容，把内容搬迁到新存储的零起点，并把游标重定基为
///   `read = 0`、`write = occupied`。依赖原始游标数值的外部代码需要容忍这一跳变。
///
/// # 契约说明（What）
/// - **写入**：剩余空间必须严格大于写入长度（始终保留至少 1 字节余量）；
///   不可扩容时放不下的写入被整体拒绝，返回 0，不会写入截断的前缀；
/// - **读取**：返回 `min(请求长度, 占用长度)`，少于请求不是错误；
/// - **并发**：`capacity()` 不加锁；`available_length()` 由两次独立加锁的读取组合而成，
///   与并发写入之间不具备原子性。需要一致快照时使用 [`RingBuffer::usage`]。
///
/// # 风险与取舍（Trade-offs）
/// - 使用 [`NoopLock`] 时缓冲不是 `Sync`，只能单线程使用；
///   注入实现 [`ExclusiveLock`] 的锁后才可跨线程共享 `&RingBuffer`；
/// - 分配器与 `BufMut` 的回调运行在临界区内。回调中重入同一个缓冲时，嵌套调用不触及状态：
///   `try_write` 返回 [`RingBufferError::Reentrant`]，其余读写返回 0，查询返回空值。
///   注入的锁若不可重入（`SpinLock`、`ParkingLock`），嵌套调用会先在加锁处死锁。
pub struct RingBuffer<A: RingAllocator = SystemAllocator, L: RingLock = NoopLock> {
    state: StateCell<RingState>,
    capacity: AtomicUsize,
    entered: AtomicBool,
    growable: bool,
    allocator: A,
    lock: L,
}

// SAFETY: 存储与游标仅在 `ExclusiveLock` 保证的互斥区内访问；分配器以 `&A` 在锁内被调用，需要 `A: Sync`。
unsafe impl<A, L> Sync for RingBuffer<A, L>
where
    A: RingAllocator + Sync,
    L: ExclusiveLock,
{
}

impl RingBuffer {
    /// 使用系统堆与空锁创建缓冲，适用于单线程场景。
    pub fn new(capacity: usize, growable: bool) -> Result<Self> {
        Self::create(
            RingBufferConfig::new(capacity).growable(growable),
            SystemAllocator,
            NoopLock,
        )
    }
}

impl<L: RingLock> RingBuffer<SystemAllocator, L> {
    /// 使用系统堆与指定锁创建缓冲。
    pub fn with_lock(capacity: usize, growable: bool, lock: L) -> Result<Self> {
        Self::create(
            RingBufferConfig::new(capacity).growable(growable),
            SystemAllocator,
            lock,
        )
    }
}

impl<A: RingAllocator, L: RingLock> RingBuffer<A, L> {
    /// 按配置构造缓冲。
    ///
    /// # 契约
    /// - 容量非法时返回 [`RingBufferError::InvalidCapacity`]，此时分配器不会被调用；
    /// - 分配器返回 `None` 或长度不符时返回 [`RingBufferError::AllocationFailure`]，不留下任何部分状态；
    /// - 成功后两个游标均为 0，存储长度恰为 `config.capacity`。
    pub fn create(config: RingBufferConfig, allocator: A, lock: L) -> Result<Self> {
        config.validate()?;
        let capacity = config.capacity;
        let storage = match allocator.allocate(capacity) {
            Some(block) if block.len() == capacity => block,
            other => {
                if let Some(block) = other {
                    allocator.release(block);
                }
                warn!(capacity, "ring buffer allocation failed during construction");
                return Err(RingBufferError::AllocationFailure {
                    requested: capacity,
                });
            }
        };
        Ok(Self {
            state: StateCell::new(RingState::new(storage)),
            capacity: AtomicUsize::new(capacity),
            entered: AtomicBool::new(false),
            growable: config.growable,
            allocator,
            lock,
        })
    }

    /// 在锁内访问状态；从临界区内的回调重入时返回 [`RingBufferError::Reentrant`]。
    fn locked<R>(&self, f: impl FnOnce(&mut RingState) -> R) -> Result<R> {
        let _guard = LockGuard::acquire(&self.lock);
        let Some(_entered) = Entered::enter(&self.entered) else {
            return Err(RingBufferError::Reentrant);
        };
        // SAFETY: `NoopLock` 等非互斥锁使缓冲 `!Sync`，此时只有当前线程能触达状态；
        // 互斥锁下守卫存续期间没有其它线程持有状态引用。同一线程的嵌套调用已被
        // `entered` 标记拦在上面，因此这里取得的可变引用是唯一的。
        Ok(self.state.with_mut(|state| f(unsafe { &mut *state })))
    }

    /// 当前物理容量；扩容后可能大于构造时请求的值，`destroy` 后为 0。
    ///
    /// 不加锁：容量镜像在原子变量中，写路径在锁内扩容时更新。
    /// 与正在进行的扩容并发调用时可能读到旧值。
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// 尚未读取的字节数。
    pub fn occupied_length(&self) -> usize {
        self.locked(|state| state.occupied()).unwrap_or(0)
    }

    /// `capacity() - occupied_length()`。
    ///
    /// 两次读取各自独立加锁，期间若有并发写入或扩容，结果可能与任何真实时刻都不一致；
    /// 这里以饱和减法避免下溢。需要一致视图时使用 [`RingBuffer::usage`]。
    pub fn available_length(&self) -> usize {
        self.capacity().saturating_sub(self.occupied_length())
    }

    /// 单次加锁内的容量与占用快照。
    pub fn usage(&self) -> RingUsage {
        self.locked(|state| RingUsage {
            capacity: state.capacity(),
            occupied: state.occupied(),
        })
        .unwrap_or(RingUsage {
            capacity: self.capacity(),
            occupied: 0,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.occupied_length() == 0
    }

    pub fn is_growable(&self) -> bool {
        self.growable
    }

    pub fn stats(&self) -> RingStats {
        self.locked(|state| state.stats).unwrap_or_default()
    }

    /// 构造时注入的锁，原样返回，缓冲不解释其含义。
    pub fn lock_handle(&self) -> &L {
        &self.lock
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// 丢弃全部未读内容，两个游标归零；不重新分配，容量保持不变。
    pub fn reset(&self) {
        let reset = self.locked(|state| {
            let discarded = state.occupied();
            state.read = Cursor::ZERO;
            state.write = Cursor::ZERO;
            discarded
        });
        if let Ok(discarded) = reset {
            debug!(discarded, "ring buffer reset");
        }
    }

    /// 读取至多 `dst.len()` 字节，返回实际拷贝的字节数（可能为 0）。
    pub fn read(&self, dst: &mut [u8]) -> usize {
        self.locked(|state| {
            let taken = state.peek(dst);
            state.consume(taken);
            taken
        })
        .unwrap_or(0)
    }

    /// 与 [`RingBuffer::read`] 相同，但不推进读游标。
    pub fn peek(&self, dst: &mut [u8]) -> usize {
        self.locked(|state| state.peek(dst)).unwrap_or(0)
    }

    /// 读取至多 `max_len` 字节并以 [`Bytes`] 返回。
    pub fn read_bytes(&self, max_len: usize) -> Bytes {
        self.locked(|state| {
            let take = max_len.min(state.occupied());
            let mut out = BytesMut::zeroed(take);
            let taken = state.peek(&mut out);
            state.consume(taken);
            out.freeze()
        })
        .unwrap_or_default()
    }

    /// 读取至多 `dst.remaining_mut()` 字节追加到 `dst`。
    pub fn read_into<B: BufMut>(&self, dst: &mut B) -> usize {
        self.locked(|state| {
            let Some((span, storage)) = state.readable_span(dst.remaining_mut()) else {
                return 0;
            };
            let (first, second) = span.slices(storage);
            dst.put_slice(first);
            dst.put_slice(second);
            let taken = span.len();
            state.consume(taken);
            taken
        })
        .unwrap_or(0)
    }

    /// 写入 `src`，返回实际写入的字节数；被拒绝时返回 0。
    ///
    /// 需要区分拒绝原因时使用 [`RingBuffer::try_write`]。
    pub fn write(&self, src: &[u8]) -> usize {
        self.try_write(src).unwrap_or(0)
    }

    /// 写入 `src`，失败时给出原因。
    ///
    /// # 执行逻辑（How）
    /// 1. 剩余空间 `free <= src.len()` 时：不可扩容则整体拒绝（[`RingBufferError::Overflow`]）；
    ///    可扩容则翻倍扩容直到容量不小于 `capacity + src.len()`，搬迁内容并重定基游标；
    /// 2. 按剩余空间截断写入长度；
    /// 3. 从 `write & mask` 开始分段拷贝，推进写游标。
    ///
    /// # 契约（What）
    /// - 空切片直接返回 `Ok(0)`，不会触发扩容；
    /// - 从分配器等临界区内的回调重入时返回 [`RingBufferError::Reentrant`]；
    /// - 任何失败都不改变缓冲内容与游标，调用方的源数据保持原样。
    pub fn try_write(&self, src: &[u8]) -> Result<usize> {
        if src.is_empty() {
            return Ok(0);
        }
        self.locked(|state| {
            if state.storage.is_none() {
                return Err(RingBufferError::Destroyed);
            }
            let available = state.free();
            if available <= src.len() {
                if !self.growable {
                    state.stats.rejected_writes += 1;
                    trace!(
                        requested = src.len(),
                        available,
                        "ring buffer write rejected"
                    );
                    return Err(RingBufferError::Overflow {
                        requested: src.len(),
                        available,
                    });
                }
                self.grow(state, src.len())?;
            }
            Ok(state.append(src))
        })?
    }

    /// 在锁内完成扩容：申请新存储、搬迁、采纳、归还旧存储。
    ///
    /// 失败时状态保持原样，旧存储仍由缓冲持有。
    fn grow(&self, state: &mut RingState, len: usize) -> Result<()> {
        let old_capacity = state.capacity();
        let target = growth_target(old_capacity, len);
        let block = target.and_then(|target| match self.allocator.allocate(target) {
            Some(block) if block.len() == target => Some(block),
            Some(block) => {
                self.allocator.release(block);
                None
            }
            None => None,
        });
        let Some(block) = block else {
            state.stats.rejected_writes += 1;
            let requested = target.unwrap_or_else(|| old_capacity.saturating_add(len));
            warn!(old_capacity, requested, "ring buffer growth allocation failed");
            return Err(RingBufferError::AllocationFailure { requested });
        };

        let new_capacity = block.len();
        let relocation = state.relocate(block);
        let occupied = relocation.write.distance_from(relocation.read);
        if let Some(old) = state.adopt(relocation) {
            self.allocator.release(old);
        }
        self.capacity.store(new_capacity, Ordering::Relaxed);
        debug!(old_capacity, new_capacity, occupied, "ring buffer grown");
        Ok(())
    }

    /// 把存储归还分配器。重复调用是空操作；之后 `capacity()` 为 0，读写均移动 0 字节。
    pub fn destroy(&mut self) {
        let state = self.state.get_mut();
        let Some(storage) = state.storage.take() else {
            return;
        };
        state.mask = 0;
        state.read = Cursor::ZERO;
        state.write = Cursor::ZERO;
        let released = storage.len();
        self.allocator.release(storage);
        self.capacity.store(0, Ordering::Relaxed);
        debug!(released, "ring buffer destroyed");
    }
}

impl<A: RingAllocator, L: RingLock> Drop for RingBuffer<A, L> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<A: RingAllocator, L: RingLock> fmt::Debug for RingBuffer<A, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("growable", &self.growable)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "std")]
    use tracing_test::traced_test;

    #[test]
    fn growth_target_doubles_until_sufficient() {
        assert_eq!(growth_target(4, 10), Some(16));
        assert_eq!(growth_target(8, 5), Some(16));
        assert_eq!(growth_target(8, 8), Some(16), "恰好等于 capacity + len 即停止");
        assert_eq!(growth_target(1, 1), Some(2));
        assert_eq!(growth_target(usize::MAX / 2 + 1, 1), None);
    }

    #[test]
    fn relocate_defragments_wrapped_content() {
        let ring = RingBuffer::new(8, false).expect("构造容量为 8 的缓冲");
        assert_eq!(ring.write(b"abcdef"), 6);
        let mut sink = [0u8; 4];
        assert_eq!(ring.read(&mut sink), 4);
        assert_eq!(ring.write(b"ghij"), 4, "写入应跨越物理末尾");

        let relocation = ring
            .locked(|state| state.relocate(alloc::vec![0u8; 16].into_boxed_slice()))
            .expect("非重入调用");
        assert_eq!(relocation.read, Cursor::ZERO);
        assert_eq!(relocation.write.get(), 6);
        assert_eq!(&relocation.storage[..6], b"efghij");
    }

    #[test]
    fn cursors_rebase_after_growth() {
        let ring = RingBuffer::new(4, true).expect("构造可扩容缓冲");
        assert_eq!(ring.write(b"abc"), 3);
        let mut sink = [0u8; 2];
        ring.read(&mut sink);
        assert_eq!(ring.write(b"defg"), 4);
        let (read, write) = ring
            .locked(|state| (state.read, state.write))
            .expect("非重入调用");
        assert_eq!(read, Cursor::ZERO, "扩容后读游标重定基为 0");
        assert_eq!(write.get(), 5);
        assert_eq!(&ring.read_bytes(16)[..], b"cdefg");
    }

    #[test]
    fn nested_critical_section_is_refused() {
        let ring = RingBuffer::new(8, true).expect("构造可扩容缓冲");
        let nested = ring
            .locked(|_| {
                (
                    ring.try_write(b"x"),
                    ring.occupied_length(),
                    ring.locked(|state| state.occupied()),
                )
            })
            .expect("外层调用未重入");
        assert_eq!(nested.0, Err(RingBufferError::Reentrant));
        assert_eq!(nested.1, 0);
        assert_eq!(nested.2, Err(RingBufferError::Reentrant));
        assert_eq!(ring.write(b"ok"), 2, "外层退出后标记被清除");
    }

    #[cfg(feature = "std")]
    #[test]
    #[traced_test]
    fn growth_and_rejection_are_logged() {
        let growable = RingBuffer::new(8, true).expect("构造可扩容缓冲");
        growable.write(b"Hello");
        growable.write(b"World");
        assert!(logs_contain("ring buffer grown"));

        let fixed = RingBuffer::new(8, false).expect("构造固定容量缓冲");
        fixed.write(b"Hello");
        assert_eq!(fixed.write(b"World"), 0);
        assert!(logs_contain("ring buffer write rejected"));
    }

    #[test]
    fn stats_track_traffic_and_survive_reset() {
        let ring = RingBuffer::new(4, true).expect("构造可扩容缓冲");
        ring.write(b"0123456789");
        let mut sink = [0u8; 3];
        ring.read(&mut sink);
        ring.reset();
        let stats = ring.stats();
        assert_eq!(stats.bytes_written, 10);
        assert_eq!(stats.bytes_read, 3);
        assert_eq!(stats.growths, 1);
        assert_eq!(stats.rejected_writes, 0);
    }
}
