//! spark-ringbuf-fuzz 公共支持库。
//!
//! # 教案式定位
//! - **Why**：fuzz target 与常规回归测试共用同一套“操作脚本 + 影子模型”执行逻辑，
//!   CI 无需 libFuzzer 运行时即可重放种子样本。
//! - **What**：[`RingScript`] 描述一次随机会话（初始容量、是否可扩容、操作序列）；
//!   [`execute_ring_script`] 把任意字节解释为脚本并逐步比对 `RingBuffer` 与 `VecDeque<u8>`。
//! - **How**：借助 `arbitrary::Unstructured` 把原始字节结构化；任何不一致都以 panic 报告，
//!   由 libFuzzer 记录为崩溃样本。

use std::collections::VecDeque;

use arbitrary::{Arbitrary, Unstructured};
use spark_ringbuf::{RingBuffer, RingBufferError};

/// 单步操作。长度字段使用 `u8`，让脚本在有限输入下也能频繁触发回绕与扩容。
#[derive(Debug, Arbitrary)]
pub enum RingOp {
    Write(Vec<u8>),
    Read(u8),
    Peek(u8),
    Reset,
}

/// 一次 fuzz 会话。
#[derive(Debug, Arbitrary)]
pub struct RingScript {
    /// 容量取 `1 << (capacity_shift % 10)`，保证构造总是合法。
    pub capacity_shift: u8,
    pub growable: bool,
    pub ops: Vec<RingOp>,
}

/// 把原始字节解释为 [`RingScript`] 并执行；无法解析的输入直接忽略。
pub fn execute_ring_script(data: &[u8]) {
    if let Ok(script) = RingScript::arbitrary_take_rest(Unstructured::new(data)) {
        run_script(&script);
    }
}

/// 执行脚本并在每一步比对缓冲与影子模型。
pub fn run_script(script: &RingScript) {
    let capacity = 1usize << (script.capacity_shift % 10);
    let ring = match RingBuffer::new(capacity, script.growable) {
        Ok(ring) => ring,
        Err(err) => panic!("合法容量 {capacity} 构造失败: {err}"),
    };
    let mut model: VecDeque<u8> = VecDeque::new();

    for op in &script.ops {
        match op {
            RingOp::Write(data) => {
                let before = ring.capacity();
                let free = before - model.len();
                match ring.try_write(data) {
                    Ok(written) => {
                        assert_eq!(written, data.len(), "被接受的写入必须完整");
                        assert!(
                            data.is_empty() || script.growable || data.len() < free,
                            "固定容量缓冲接受了放不下的写入"
                        );
                        model.extend(data.iter().copied());
                    }
                    Err(RingBufferError::Overflow {
                        requested,
                        available,
                    }) => {
                        assert!(!script.growable, "可扩容缓冲不应报告溢出");
                        assert_eq!(requested, data.len());
                        assert_eq!(available, free);
                        assert!(available <= requested);
                        assert_eq!(ring.capacity(), before);
                    }
                    Err(err) => panic!("意外错误: {err}"),
                }
            }
            RingOp::Read(len) => {
                let mut out = vec![0u8; usize::from(*len)];
                let n = ring.read(&mut out);
                assert_eq!(n, out.len().min(model.len()));
                for (index, byte) in out[..n].iter().enumerate() {
                    assert_eq!(Some(*byte), model.pop_front(), "第 {index} 个字节不一致");
                }
            }
            RingOp::Peek(len) => {
                let mut out = vec![0u8; usize::from(*len)];
                let n = ring.peek(&mut out);
                assert_eq!(n, out.len().min(model.len()));
                assert!(out[..n].iter().eq(model.iter().take(n)));
            }
            RingOp::Reset => {
                ring.reset();
                model.clear();
            }
        }

        let usage = ring.usage();
        assert_eq!(usage.occupied, model.len());
        assert!(usage.capacity.is_power_of_two());
        assert!(usage.occupied < usage.capacity);
    }
}
