//! 分配器能力。
//!
//! # 模块角色（Why）
//! - 环形缓冲的存储由调用方决定从哪里来：普通堆、预留的内存池或带配额的测试替身；
//! - 能力以 trait 对象或泛型参数在构造时注入，不存在进程级可变的全局函数指针，
//!   因而也不存在“运行中途替换分配器”这种未定义场景。
//!
//! # 契约说明（What）
//! - 唯一必需方法 [`RingAllocator::reallocate`] 的语义：
//!   - `size == 0`：释放 `existing`（若有）并返回 `None`；
//!   - `size > 0`：分配（`existing` 为 `None`）或调整大小，返回新块；
//!   - 返回 `None` 且 `size > 0` 视为分配失败。
//! - 回调发生在缓冲的临界区内；回调中再调用同一个 [`RingBuffer`](crate::RingBuffer) 时，
//!   嵌套调用不触及状态，`try_write` 返回 [`RingBufferError::Reentrant`](crate::RingBufferError::Reentrant)。

use alloc::{boxed::Box, sync::Arc, vec::Vec};

/// 可插拔的字节块分配器。
pub trait RingAllocator {
    /// 分配、调整或释放一块字节存储。
    fn reallocate(&self, existing: Option<Box<[u8]>>, size: usize) -> Option<Box<[u8]>>;

    /// 分配 `size` 字节的新块。
    fn allocate(&self, size: usize) -> Option<Box<[u8]>> {
        self.reallocate(None, size)
    }

    /// 归还一个块。
    fn release(&self, block: Box<[u8]>) {
        let _ = self.reallocate(Some(block), 0);
    }
}

impl<T: RingAllocator + ?Sized> RingAllocator for &T {
    fn reallocate(&self, existing: Option<Box<[u8]>>, size: usize) -> Option<Box<[u8]>> {
        (**self).reallocate(existing, size)
    }
}

impl<T: RingAllocator + ?Sized> RingAllocator for Arc<T> {
    fn reallocate(&self, existing: Option<Box<[u8]>>, size: usize) -> Option<Box<[u8]>> {
        (**self).reallocate(existing, size)
    }
}

/// 基于全局堆的默认分配器。
///
/// 使用 `try_reserve_exact` 申请内存，堆耗尽时返回 `None` 而不是中止进程，
/// 使 `AllocationFailure` 可以作为普通返回值传递给调用方。新分配的字节清零。
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemAllocator;

impl RingAllocator for SystemAllocator {
    fn reallocate(&self, existing: Option<Box<[u8]>>, size: usize) -> Option<Box<[u8]>> {
        if size == 0 {
            drop(existing);
            return None;
        }
        let mut block = existing.map(Vec::from).unwrap_or_default();
        if size > block.len() {
            block.try_reserve_exact(size - block.len()).ok()?;
        }
        block.resize(size, 0);
        Some(block.into_boxed_slice())
    }
}
