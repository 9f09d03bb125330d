//! 统一错误类型定义.
//!
//! 所有 mpegv crate 共用的错误类型, 支持跨模块传播.
//! 码流内可恢复的语法错误不走这里, 由解码引擎内部计数并重同步.

use thiserror::Error;

/// mpegv 统一错误类型
#[derive(Debug, Error)]
pub enum MpegvError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的码流特性
    #[error("不支持的特性: {0}")]
    Unsupported(String),

    /// I/O 错误 (字节源读取失败)
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 已到达流末尾, 且未找到可解码的图像
    #[error("已到达流末尾")]
    Eof,

    /// 帧缓冲分配失败
    #[error("内存分配失败: {0}")]
    OutOfMemory(String),

    /// 无效数据 (头部字段非法等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

/// mpegv 统一 Result 类型
pub type MpegvResult<T> = Result<T, MpegvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "截断");
        let err: MpegvError = io.into();
        assert!(matches!(err, MpegvError::Io(_)));
        assert!(err.to_string().starts_with("I/O 错误"));
    }

    #[test]
    fn test_error_display() {
        let err = MpegvError::OutOfMemory("亮度平面 720x576".into());
        assert_eq!(err.to_string(), "内存分配失败: 亮度平面 720x576");
    }
}
