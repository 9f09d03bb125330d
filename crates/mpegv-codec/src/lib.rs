//! # mpegv-codec
//!
//! MPEG-1 (ISO/IEC 11172-2) 与 MPEG-2 (ISO/IEC 13818-2) 视频基本流解码引擎.
//!
//! 解码流程:
//! 1. [`init`] 从字节源解析到第一个图像头, 按序列参数分配帧缓冲
//! 2. [`DecoderSession::decode`] 解码剩余全部图像, 按显示顺序把 ARGB 像素推送给像素接收端
//!    (也可以用 [`DecoderSession::decode_picture`] 逐幅解码)
//! 3. [`DecoderSession::close`] 释放帧缓冲并交还字节源
//!
//! 码流中的语法错误不会中断解码: 出错的 slice 被放弃, 解码器在下一个起始码处
//! 重新同步, 错误计入 [`DecoderStats`].

mod bitstream;
mod block;
pub mod config;
mod dequant;
mod fault;
mod frame;
pub mod header;
pub mod idct;
mod macroblock;
mod motion;
mod picture;
mod recon;
pub mod session;
mod tables;
pub mod types;
mod vlc;


// 重导出常用类型
pub use config::{DecoderConfig, IdctKind, OutputSize};
pub use header::{ColorDescription, GopHeader, PictureHeader, ScalableMode, SequenceHeader};
pub use idct::{InverseTransform, ReferenceIdct, SimpleIdct};
pub use picture::{DecoderStats, PictureInfo};
pub use session::{DecodeStatus, DecoderSession, PictureStatus, StreamInfo, init};
pub use types::{PictureCodingType, PictureStructure};
