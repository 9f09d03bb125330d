//! # mpegv-core
//!
//! mpegv 解码器核心库, 提供错误类型、外部 I/O 协作接口和基础类型定义.

pub mod bitwriter;
pub mod color;
pub mod error;
pub mod io;
pub mod rational;

// 重导出常用类型
pub use bitwriter::BitWriter;
pub use color::{ChromaFormat, MatrixCoefficients};
pub use error::{MpegvError, MpegvResult};
pub use io::{ArgbFrame, ByteSource, FrameCollector, MemorySource, PixelSink, ReadSource};
pub use rational::Rational;
