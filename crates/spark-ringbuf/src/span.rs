/// 一段可能跨越物理末尾的逻辑区间。
///
/// # 教案式说明
/// - **意图 (Why)**：读、写与扩容搬迁都需要把“从物理偏移 `offset` 开始、长 `len` 的逻辑区间”
///   拆成最多两段拷贝。三处若各写一遍回绕逻辑，极易出现细微差异，因此集中在此实现；
/// - **逻辑 (How)**：首段长度为 `min(len, capacity - offset)`，位于 `[offset, offset + head)`；
///   剩余 `tail = len - head` 字节从物理偏移 0 开始；
/// - **契约 (What)**：`offset < capacity` 且 `len <= capacity`。在此前提下必有 `tail <= offset`，
///   两段互不重叠。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct WrapSpan {
    offset: usize,
    head: usize,
    tail: usize,
}

impl WrapSpan {
    pub(crate) fn new(capacity: usize, offset: usize, len: usize) -> Self {
        debug_assert!(offset < capacity, "物理偏移 {offset} 越过容量 {capacity}");
        debug_assert!(len <= capacity, "区间长度 {len} 超过容量 {capacity}");
        let head = len.min(capacity - offset);
        Self {
            offset,
            head,
            tail: len - head,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.head + self.tail
    }

    /// 按逻辑顺序返回两段只读切片，拼接后即为完整区间。
    pub(crate) fn slices<'a>(&self, storage: &'a [u8]) -> (&'a [u8], &'a [u8]) {
        (
            &storage[self.offset..self.offset + self.head],
            &storage[..self.tail],
        )
    }

    /// 按逻辑顺序返回两段可写切片。
    pub(crate) fn slices_mut<'a>(&self, storage: &'a mut [u8]) -> (&'a mut [u8], &'a mut [u8]) {
        let (front, back) = storage.split_at_mut(self.offset);
        (&mut back[..self.head], &mut front[..self.tail])
    }

    /// 存储 → 目标。`dst.len()` 必须等于区间长度。
    pub(crate) fn copy_out(&self, storage: &[u8], dst: &mut [u8]) {
        let (first, second) = self.slices(storage);
        let (dst_first, dst_second) = dst.split_at_mut(first.len());
        dst_first.copy_from_slice(first);
        dst_second.copy_from_slice(second);
    }

    /// 源 → 存储。`src.len()` 必须等于区间长度。
    pub(crate) fn copy_in(&self, storage: &mut [u8], src: &[u8]) {
        let (first, second) = self.slices_mut(storage);
        let (src_first, src_second) = src.split_at(first.len());
        first.copy_from_slice(src_first);
        second.copy_from_slice(src_second);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn span_without_wrap_has_empty_tail() {
        let span = WrapSpan::new(8, 2, 4);
        assert_eq!(span.len(), 4);
        let storage: Vec<u8> = (0..8).collect();
        let (first, second) = span.slices(&storage);
        assert_eq!(first, &[2, 3, 4, 5]);
        assert!(second.is_empty());
    }

    #[test]
    fn span_across_end_splits_into_two_copies() {
        let span = WrapSpan::new(8, 6, 5);
        let storage: Vec<u8> = (0..8).collect();
        let mut out = [0u8; 5];
        span.copy_out(&storage, &mut out);
        assert_eq!(out, [6, 7, 0, 1, 2]);

        let mut target = [0u8; 8];
        span.copy_in(&mut target, b"ABCDE");
        assert_eq!(&target, b"CDE\0\0\0AB");
    }

    #[test]
    fn full_span_from_offset_zero_fills_storage() {
        let span = WrapSpan::new(4, 0, 4);
        let mut storage = [0u8; 4];
        span.copy_in(&mut storage, b"ring");
        assert_eq!(&storage, b"ring");
    }
}
