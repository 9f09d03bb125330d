//! 码流内可恢复错误.
//!
//! 这些错误只在解码引擎内部流动: 出现后放弃当前 slice, 在下一个起始码处
//! 重新同步, 不会作为 [`mpegv_core::MpegvError`] 抛给调用方.

use thiserror::Error;

/// 可恢复的码流错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BitstreamFault {
    /// 窗口值不属于任何合法码字
    #[error("无效的 {table} 码字: 窗口值 {window:#x}")]
    InvalidVlc {
        /// 码表名称
        table: &'static str,
        /// 窥视到的位窗口
        window: u32,
    },
    /// 系数索引超过 63
    #[error("DCT 系数索引越界 (>= 64)")]
    CoefficientOverflow,
    /// 转义码中的 level 为禁用值
    #[error("无效的转义 level: {0:#x}")]
    InvalidEscape(u32),
    /// frame_motion_type / field_motion_type 为保留值 0
    #[error("无效的运动类型 0")]
    InvalidMotionType,
    /// D 图像宏块类型不是 Intra
    #[error("D 图像中的非 Intra 宏块")]
    InvalidDcPicture,
    /// slice 的首个宏块地址不在图像内
    #[error("slice 起始宏块地址 {mba} 超出图像 (共 {limit} 个宏块)")]
    SliceAddressOutOfRange {
        mba: usize,
        limit: usize,
    },
    /// 帧缓冲的宏块行数为奇数, 无法按场图像寻址
    #[error("场图像需要偶数宏块行的帧缓冲, 当前 {mb_height} 行")]
    UnalignedFieldPicture {
        mb_height: usize,
    },
    /// 重复的序列头给出无效尺寸, 其后的图像被丢弃
    #[error("序列头尺寸无效: {width}x{height}")]
    InvalidSequenceSize {
        width: u32,
        height: u32,
    },
}

/// 码流解码结果
pub type FaultResult<T> = Result<T, BitstreamFault>;
