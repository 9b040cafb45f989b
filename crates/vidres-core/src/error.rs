//! 统一错误类型定义.
//!
//! 所有 vidres crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// vidres 统一错误类型
#[derive(Debug, Error)]
pub enum VidresError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 无效数据 (损坏或截断的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),
}

impl VidresError {
    /// 是否为流末尾错误
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }
}

/// vidres 统一 Result 类型
pub type VidresResult<T> = Result<T, VidresError>;
