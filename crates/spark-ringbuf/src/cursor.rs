use core::fmt;

/// 逻辑游标：自创建（或最近一次扩容重定基）以来累计读/写的字节数。
///
/// # 设计动机（Why）
/// - 游标只增不减，不在到达容量时回绕；回绕只发生在与掩码按位与之后的物理偏移上；
/// - 以 `u64` 承载，即便每秒写入数 GB 也需要数百年才会溢出；
///   即使真的溢出，占用长度仍按模 2^64 的无符号减法计算，结果依旧正确。
///
/// # 契约说明（What）
/// - [`Cursor::advance`] 与 [`Cursor::distance_from`] 均为回绕算术，不会 panic；
/// - [`Cursor::offset`] 要求 `mask + 1` 为 2 的幂。
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct Cursor(u64);

impl Cursor {
    pub const ZERO: Cursor = Cursor(0);

    pub const fn new(position: u64) -> Self {
        Cursor(position)
    }

    /// 原始逻辑位置。扩容会把游标重定基到 0，外部记录的原始值需容忍这一跳变。
    pub const fn get(self) -> u64 {
        self.0
    }

    /// 以模 2^64 的方式前进 `len` 字节。
    #[must_use]
    pub const fn advance(self, len: usize) -> Self {
        Cursor(self.0.wrapping_add(len as u64))
    }

    /// `self - earlier` 的回绕差值，即两游标之间的字节数。
    pub const fn distance_from(self, earlier: Cursor) -> usize {
        self.0.wrapping_sub(earlier.0) as usize
    }

    /// 映射到物理偏移：`cursor & mask`。
    pub const fn offset(self, mask: usize) -> usize {
        (self.0 & mask as u64) as usize
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({})", self.0)
    }
}
