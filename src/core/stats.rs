//! 帧级诊断统计
//!
//! 进程级的粒子观测计数器：当前帧的存活粒子总数与堆内存占用。
//! 引擎帧循环在每帧开始时显式调用 [`reset_frame`]，各堆在 `process`
//! 中累加自己的贡献。
//!
//! 只用于诊断展示（编辑器性能面板、日志），不参与任何模拟决策。

use std::sync::atomic::{AtomicUsize, Ordering};

static TOTAL_PARTICLES: AtomicUsize = AtomicUsize::new(0);
static TOTAL_HEAP_BYTES: AtomicUsize = AtomicUsize::new(0);

/// 一帧的粒子统计快照
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// 当前帧存活粒子总数
    pub total_particles: usize,
    /// 当前帧所有粒子堆的存储字节数
    pub total_heap_bytes: usize,
}

/// 重置帧统计（每帧开始调用一次）
pub fn reset_frame() {
    TOTAL_PARTICLES.store(0, Ordering::Relaxed);
    TOTAL_HEAP_BYTES.store(0, Ordering::Relaxed);
}

/// 累加存活粒子数
pub fn add_live_particles(count: usize) {
    TOTAL_PARTICLES.fetch_add(count, Ordering::Relaxed);
}

/// 累加堆存储字节数
pub fn add_heap_bytes(bytes: usize) {
    TOTAL_HEAP_BYTES.fetch_add(bytes, Ordering::Relaxed);
}

/// 读取当前帧统计快照
pub fn frame_snapshot() -> FrameStats {
    FrameStats {
        total_particles: TOTAL_PARTICLES.load(Ordering::Relaxed),
        total_heap_bytes: TOTAL_HEAP_BYTES.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 计数器是进程级共享状态，并行测试也会累加，只验证本测试的贡献下界
    #[test]
    fn test_frame_stats_accumulate() {
        let before = frame_snapshot();
        add_live_particles(10);
        add_live_particles(5);
        add_heap_bytes(1024);

        let after = frame_snapshot();
        assert!(after.total_particles >= before.total_particles + 15);
        assert!(after.total_heap_bytes >= before.total_heap_bytes + 1024);
    }
}
