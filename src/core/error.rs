//! 统一错误处理模块
//!
//! 粒子核心的错误类型定义。
//!
//! ## 错误分层
//!
//! 模拟内部的失败（容量耗尽、非法帧时间、未知 owner）按设计降级为
//! 日志 + 计数返回值，绝不中断帧循环；只有渲染边界上的真正可失败
//! 操作（填充缓冲区、属性字节块写入）才返回 `Result`。

use thiserror::Error;

/// 粒子核心错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParticleError {
    #[error("target buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("property blob size mismatch for {property}: expected {expected} bytes, got {actual}")]
    BlobSizeMismatch {
        property: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("vertex layout mismatch: expected stride {expected}, got {actual}")]
    LayoutMismatch { expected: usize, actual: usize },
}

/// 粒子核心结果类型别名
pub type ParticleResult<T> = Result<T, ParticleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParticleError::BufferTooSmall {
            needed: 128,
            actual: 64,
        };
        assert_eq!(
            err.to_string(),
            "target buffer too small: need 128 bytes, got 64"
        );
    }
}
