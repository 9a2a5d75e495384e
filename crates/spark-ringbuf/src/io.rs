//! `std::io` 桥接。
//!
//! - `Read` 直接映射到 [`RingBuffer::read`]，缓冲为空时返回 `Ok(0)`；
//! - `Write` 在写入被整体拒绝时返回 `Ok(0)`，`write_all` 因而以 `ErrorKind::WriteZero` 结束，
//!   与“不阻塞、返回部分结果”的语义一致；分配失败与已销毁则映射为真正的 I/O 错误。

use std::io;

use crate::{
    allocator::RingAllocator,
    error::RingBufferError,
    lock::RingLock,
    ring::RingBuffer,
};

impl From<RingBufferError> for io::Error {
    fn from(err: RingBufferError) -> Self {
        let kind = match err {
            RingBufferError::InvalidCapacity { .. } => io::ErrorKind::InvalidInput,
            RingBufferError::Overflow { .. } => io::ErrorKind::WriteZero,
            RingBufferError::AllocationFailure { .. } => io::ErrorKind::OutOfMemory,
            RingBufferError::Reentrant => io::ErrorKind::ResourceBusy,
            RingBufferError::Destroyed => io::ErrorKind::BrokenPipe,
        };
        io::Error::new(kind, err)
    }
}

fn write_through<A: RingAllocator, L: RingLock>(
    ring: &RingBuffer<A, L>,
    buf: &[u8],
) -> io::Result<usize> {
    match ring.try_write(buf) {
        Ok(written) => Ok(written),
        Err(err) if err.is_overflow() => Ok(0),
        Err(err) => Err(err.into()),
    }
}

impl<A: RingAllocator, L: RingLock> io::Read for &RingBuffer<A, L> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(RingBuffer::<A, L>::read(*self, buf))
    }
}

impl<A: RingAllocator, L: RingLock> io::Read for RingBuffer<A, L> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(RingBuffer::<A, L>::read(&*self, buf))
    }
}

impl<A: RingAllocator, L: RingLock> io::Write for &RingBuffer<A, L> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        write_through(*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<A: RingAllocator, L: RingLock> io::Write for RingBuffer<A, L> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        write_through(&*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
