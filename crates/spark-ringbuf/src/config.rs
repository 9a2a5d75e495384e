use serde::{Deserialize, Serialize};

use crate::error::{Result, RingBufferError};

/// 未显式指定时使用的默认容量（4 KiB）。
const DEFAULT_CAPACITY: usize = 4096;

/// `RingBufferConfig` 描述构造环形缓冲所需的静态参数。
///
/// # 设计动机（Why）
/// - 容量与扩容开关在构造后不可变，集中成一个可序列化结构，便于从配置文件加载后直接注入；
/// - 锁与分配器是运行期能力而非数据，因此不进入配置，由 [`RingBuffer::create`](crate::RingBuffer::create) 单独接收。
///
/// # 契约说明（What）
/// - `capacity`：请求容量，必须是非零的 2 的幂；
/// - `growable`：写入放不下时是否允许翻倍扩容；
/// - 反序列化缺省字段时分别回落到 4096 与 `false`。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingBufferConfig {
    pub capacity: usize,
    pub growable: bool,
}

impl Default for RingBufferConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            growable: false,
        }
    }
}

impl RingBufferConfig {
    /// 以指定容量创建不可扩容的配置。
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            growable: false,
        }
    }

    /// 设置扩容开关。
    pub fn growable(mut self, growable: bool) -> Self {
        self.growable = growable;
        self
    }

    /// 校验容量是否为非零的 2 的幂。
    ///
    /// `usize::is_power_of_two` 对 0 返回 `false`，因此一次判断即可覆盖两类非法输入。
    pub fn validate(&self) -> Result<()> {
        if self.capacity.is_power_of_two() {
            Ok(())
        } else {
            Err(RingBufferError::InvalidCapacity {
                requested: self.capacity,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_zero_and_non_powers_of_two() {
        for requested in [0usize, 3, 5, 100] {
            assert_eq!(
                RingBufferConfig::new(requested).validate(),
                Err(RingBufferError::InvalidCapacity { requested }),
                "容量 {requested} 应被拒绝"
            );
        }
        for accepted in [1usize, 2, 4, 1024] {
            assert!(RingBufferConfig::new(accepted).validate().is_ok());
        }
    }

    #[test]
    fn builder_keeps_capacity_and_flag() {
        let config = RingBufferConfig::new(64).growable(true);
        assert_eq!(config.capacity, 64);
        assert!(config.growable);
        assert_eq!(RingBufferConfig::default().capacity, DEFAULT_CAPACITY);
    }
}
