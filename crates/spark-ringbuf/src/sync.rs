//! 内部同步原语垫片。
//!
//! 常规构建使用 `core` 提供的 `UnsafeCell` 与原子类型；在 `--cfg loom` 且启用 `loom-model`
//! 特性时切换为 loom 的同名类型，使模型检测器能够观察到对缓冲状态的每一次访问。

#[cfg(all(feature = "loom-model", any(loom, spark_loom)))]
pub(crate) use loom::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[cfg(not(all(feature = "loom-model", any(loom, spark_loom))))]
pub(crate) use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// 对 `UnsafeCell` 的统一包装，只暴露与 loom 一致的 `with_mut` 接口。
pub(crate) struct StateCell<T> {
    #[cfg(all(feature = "loom-model", any(loom, spark_loom)))]
    inner: loom::cell::UnsafeCell<T>,
    #[cfg(not(all(feature = "loom-model", any(loom, spark_loom))))]
    inner: core::cell::UnsafeCell<T>,
}

impl<T> StateCell<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            #[cfg(all(feature = "loom-model", any(loom, spark_loom)))]
            inner: loom::cell::UnsafeCell::new(value),
            #[cfg(not(all(feature = "loom-model", any(loom, spark_loom))))]
            inner: core::cell::UnsafeCell::new(value),
        }
    }

    #[cfg(all(feature = "loom-model", any(loom, spark_loom)))]
    pub(crate) fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
        self.inner.with_mut(f)
    }

    #[cfg(not(all(feature = "loom-model", any(loom, spark_loom))))]
    pub(crate) fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
        f(self.inner.get())
    }

    /// 独占访问：已持有 `&mut self` 时无需任何锁。
    pub(crate) fn get_mut(&mut self) -> &mut T {
        #[cfg(all(feature = "loom-model", any(loom, spark_loom)))]
        {
            // loom 的 UnsafeCell 不提供 get_mut；独占借用下经 with_mut 取得的指针同样唯一。
            self.inner.with_mut(|ptr| unsafe { &mut *ptr })
        }
        #[cfg(not(all(feature = "loom-model", any(loom, spark_loom))))]
        {
            self.inner.get_mut()
        }
    }
}
