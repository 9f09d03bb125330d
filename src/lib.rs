//! # mpegv
//!
//! 纯 Rust 实现的 MPEG-1/MPEG-2 视频基本流解码器.
//!
//! - **码流解析**: 序列/GOP/图像头部与全部 MPEG-2 扩展头部
//! - **解码**: I/P/B/D 图像, 帧图像与场图像, 4:2:0/4:2:2/4:4:4
//! - **输出**: 色度上采样并转换为 ARGB, 按显示顺序推送给像素接收端
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use mpegv::core::{FrameCollector, ReadSource};
//!
//! let file = std::fs::File::open("clip.m1v").unwrap();
//! let (mut session, width, height) = mpegv::codec::init(ReadSource::new(file)).unwrap();
//! let mut frames = FrameCollector::new();
//! session.decode(&mut frames).unwrap();
//! println!("{}x{}, {} 帧", width, height, frames.frames().len());
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `mpegv-core` | 错误类型, 字节源/像素接收端接口, 基础类型 |
//! | `mpegv-codec` | 位流游标, VLC, 头部解析, 宏块引擎, 解码会话 |
//! | `mpegv-scale` | 色度上采样与颜色转换 |

use log::debug;

/// 核心类型与外部接口
pub use mpegv_core as core;

/// 解码引擎
pub use mpegv_codec as codec;

/// 色度上采样与颜色转换
pub use mpegv_scale as scale;

use mpegv_codec::{DecodeStatus, DecoderConfig, DecoderSession, DecoderStats};
use mpegv_core::{ArgbFrame, FrameCollector, MemorySource, MpegvResult};

/// 获取 mpegv 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 整段解码的结果
#[derive(Debug, Clone)]
pub struct DecodedStream {
    /// 按显示顺序排列的帧
    pub frames: Vec<ArgbFrame>,
    /// 结束状态
    pub status: DecodeStatus,
    /// 解码统计
    pub stats: DecoderStats,
}

/// 把内存中的完整基本流解码为 ARGB 帧
pub fn decode_all(data: impl Into<bytes::Bytes>, config: DecoderConfig) -> MpegvResult<DecodedStream> {
    let (mut session, width, height) = DecoderSession::with_config(MemorySource::new(data), config)?;
    debug!("decode_all: {}x{}", width, height);
    let mut collector = FrameCollector::new();
    let status = session.decode(&mut collector)?;
    let stats = session.stats();
    session.close();
    Ok(DecodedStream {
        frames: collector.into_frames(),
        status,
        stats,
    })
}
