//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 环形缓冲没有多层调用栈，错误分类小而本地，全部在单次调用内同步产生；
//! - `write` 仍以“写入字节数为 0”表达失败，本模块为需要区分原因的调用方提供强类型枚举。
//!
//! ## 设计要求（What）
//! - 所有变体派生 [`thiserror::Error`]，可直接交给 `anyhow` 等上层框架；
//! - 变体只携带 `usize` 上下文，保持 `Copy`，在热路径上构造无分配。

use thiserror::Error;

/// `spark-ringbuf` 的统一结果别名。
pub type Result<T, E = RingBufferError> = core::result::Result<T, E>;

/// 环形缓冲错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把 `write` 返回 0 的多种原因显式化，调用方可据此选择重试、扩容或丢弃；
/// - **契约 (What)**：所有失败均同步返回，不会被延迟或在后台重试；失败后缓冲状态与调用前一致；
/// - **设计权衡 (Trade-offs)**：`Overflow` 是可恢复的背压信号而非故障，调用方的源数据保持原样。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum RingBufferError {
    /// 请求的容量为 0 或不是 2 的幂；在任何分配发生之前拒绝。
    #[error("ring buffer capacity must be a non-zero power of two, got {requested}")]
    InvalidCapacity { requested: usize },

    /// 写入数据放不下且缓冲不可扩容；整个写入被拒绝，不会写入截断的前缀。
    #[error("ring buffer overflow: {requested} bytes requested, {available} bytes available")]
    Overflow { requested: usize, available: usize },

    /// 分配器未能提供 `requested` 字节，或扩容目标超出 `usize` 表示范围。
    #[error("ring buffer allocation of {requested} bytes failed")]
    AllocationFailure { requested: usize },

    /// 分配器或 `BufMut` 的回调在临界区内回到了同一个缓冲；嵌套调用未触及任何状态。
    #[error("ring buffer re-entered from a callback running inside its critical section")]
    Reentrant,

    /// 缓冲已通过 `destroy` 归还存储，不再接受写入。
    #[error("ring buffer storage has been released")]
    Destroyed,
}

impl RingBufferError {
    /// 是否属于“调用方稍后可重试”的背压类错误。
    pub fn is_overflow(&self) -> bool {
        matches!(self, RingBufferError::Overflow { .. })
    }
}
