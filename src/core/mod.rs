//! 核心模块
//!
//! 包含粒子核心的基础设施：
//! - `error` - 错误类型定义
//! - `stats` - 帧级诊断统计

pub mod error;
pub mod stats;

// 重新导出错误类型
pub use error::{ParticleError, ParticleResult};
pub use stats::FrameStats;
