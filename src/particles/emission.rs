//! 发射策略
//!
//! 计算"这一帧该生成多少个粒子"的小状态机。策略对象本身无状态、
//! 可共享；唯一的可变状态是调用方持有的小数累加器，按 `&mut` 传入。
//! 小数进位保证长期平均发射速率与帧率无关。

/// Burst 发射后写入累加器的哨兵值
///
/// 累加器为负表示"本次激活已经发射过"，外部重置为 ≥0 后才会再次发射。
pub const BURST_FIRED: f32 = -1.0;

/// 发射策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmissionPolicy {
    /// 激活后一次性发射 `count` 个粒子
    Burst { count: u32 },
    /// 按 `rate`（个/秒）持续发射
    Infinite { rate: f32 },
    /// 按 `rate` 发射，持续 `duration` 秒
    ///
    /// 到期停止由调用方负责，策略本身只提供 [`EmissionPolicy::duration`]。
    Timed { duration: f32, rate: f32 },
}

impl EmissionPolicy {
    /// 计算本帧应发射的粒子数
    ///
    /// `accumulator` 由调用方（每个发射器实例一个）持有：
    /// - Burst：累加器 ≥0 时发射全部粒子并写入负哨兵值，此后一直返回 0，
    ///   直到外部调用 [`EmissionPolicy::reset_accumulator`]；
    /// - Infinite/Timed：`dt × rate` 加上累加器取整发射，小数部分进位。
    pub fn emit_count(&self, dt: f32, accumulator: &mut f32) -> u32 {
        match *self {
            EmissionPolicy::Burst { count } => {
                if *accumulator >= 0.0 {
                    *accumulator = BURST_FIRED;
                    count
                } else {
                    0
                }
            }
            EmissionPolicy::Infinite { rate } | EmissionPolicy::Timed { rate, .. } => {
                let emission = dt * rate + *accumulator;
                let count = emission.floor().max(0.0);
                *accumulator = emission - count;
                count as u32
            }
        }
    }

    /// 发射阶段的有限时长（仅 Timed）
    pub fn duration(&self) -> Option<f32> {
        match *self {
            EmissionPolicy::Timed { duration, .. } => Some(duration),
            _ => None,
        }
    }

    /// 估算同时存活粒子数的上界（不运行模拟）
    ///
    /// 用给定的最大粒子寿命换算：Burst 即全部粒子，
    /// Infinite/Timed 为 `rate × 寿命` 的四舍五入。
    pub fn max_particles(&self, max_particle_lifetime: f32) -> u32 {
        match *self {
            EmissionPolicy::Burst { count } => count,
            EmissionPolicy::Infinite { rate } | EmissionPolicy::Timed { rate, .. } => {
                (rate * max_particle_lifetime).round() as u32
            }
        }
    }

    /// 重新激活发射（Burst 再次发射的前提）
    pub fn reset_accumulator(accumulator: &mut f32) {
        *accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_emits_exactly_once_per_activation() {
        let policy = EmissionPolicy::Burst { count: 50 };
        let mut accumulator = 0.0;

        assert_eq!(policy.emit_count(0.016, &mut accumulator), 50);
        for _ in 0..100 {
            assert_eq!(policy.emit_count(0.016, &mut accumulator), 0);
        }

        EmissionPolicy::reset_accumulator(&mut accumulator);
        assert_eq!(policy.emit_count(0.016, &mut accumulator), 50);
    }

    #[test]
    fn test_infinite_rate_fractional_carry() {
        let policy = EmissionPolicy::Infinite { rate: 100.0 };
        let mut accumulator = 0.0;

        // 0.016 秒 × 100/秒 = 1.6：发 1 个，进位 0.6
        assert_eq!(policy.emit_count(0.016, &mut accumulator), 1);
        assert!((accumulator - 0.6).abs() < 1e-4);
        // 再来 1.6 + 0.6 = 2.2：发 2 个
        assert_eq!(policy.emit_count(0.016, &mut accumulator), 2);
    }

    #[test]
    fn test_accumulator_conservation_over_uneven_frames() {
        let policy = EmissionPolicy::Infinite { rate: 37.0 };
        let mut accumulator = 0.0;
        let steps = [0.016, 0.033, 0.007, 0.2, 0.05, 0.011, 0.1];

        let total_time: f32 = steps.iter().sum();
        let mut emitted = 0;
        for dt in steps {
            emitted += policy.emit_count(dt, &mut accumulator);
        }

        let ideal = (37.0 * total_time).floor() as u32;
        assert!(emitted == ideal || emitted == ideal + 1);
    }

    #[test]
    fn test_timed_reports_duration() {
        let policy = EmissionPolicy::Timed {
            duration: 2.5,
            rate: 10.0,
        };
        assert_eq!(policy.duration(), Some(2.5));
        assert_eq!(EmissionPolicy::Infinite { rate: 10.0 }.duration(), None);
        assert_eq!(EmissionPolicy::Burst { count: 5 }.duration(), None);
    }

    #[test]
    fn test_max_particles_estimate() {
        assert_eq!(
            EmissionPolicy::Burst { count: 42 }.max_particles(10.0),
            42
        );
        assert_eq!(
            EmissionPolicy::Infinite { rate: 10.0 }.max_particles(1.5),
            15
        );
        assert_eq!(
            EmissionPolicy::Timed {
                duration: 5.0,
                rate: 3.0
            }
            .max_particles(2.2),
            7
        );
    }
}
