#![no_main]

use libfuzzer_sys::fuzz_target;
use spark_ringbuf_fuzz::{RingScript, run_script};

// 结构化输入由 libFuzzer 直接生成，失败样本可用 `execute_ring_script` 在常规测试中重放。
fuzz_target!(|script: RingScript| {
    if script.ops.is_empty() {
        return;
    }
    run_script(&script);
});
