//! 解码器的外部协作接口: 字节源与像素接收端.
//!
//! 解码器本身不做任何文件或网络 I/O, 压缩数据通过 [`ByteSource`] 按块拉取,
//! 解码出的 ARGB 像素通过 [`PixelSink`] 逐行推送.

use std::io::{ErrorKind, Read};

use bytes::Bytes;
use log::debug;

use crate::error::MpegvResult;

// ============================================================================
// 字节源
// ============================================================================

/// 拉取式字节源
///
/// `read_block` 返回值小于 `buf.len()` 表示数据已结束,
/// 之后解码器不会再调用该字节源.
pub trait ByteSource {
    /// 尽量填满 `buf`, 返回实际读取的字节数
    fn read_block(&mut self, buf: &mut [u8]) -> MpegvResult<usize>;
}

impl<F> ByteSource for F
where
    F: FnMut(&mut [u8]) -> MpegvResult<usize>,
{
    fn read_block(&mut self, buf: &mut [u8]) -> MpegvResult<usize> {
        self(buf)
    }
}

/// 基于 `std::io::Read` 的字节源
///
/// 单次 `read` 可能返回不足量数据, 这里循环读取直到填满或遇到 EOF,
/// 以免把短读误判为流结束.
pub struct ReadSource<R> {
    inner: R,
}

impl<R: Read> ReadSource<R> {
    /// 包装一个读取器
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// 取回内部读取器
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn read_block(&mut self, buf: &mut [u8]) -> MpegvResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    debug!("ReadSource 到达 EOF, 本块 {} 字节", filled);
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}

/// 内存字节源
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
    pos: usize,
}

impl MemorySource {
    /// 从任意可转换为 `Bytes` 的数据创建
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    /// 剩余未读取的字节数
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl ByteSource for MemorySource {
    fn read_block(&mut self, buf: &mut [u8]) -> MpegvResult<usize> {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

// ============================================================================
// 像素接收端
// ============================================================================

/// 像素接收端
///
/// 每输出一帧, 解码器依次调用 `begin_picture`, 按行主序对每一行调用
/// `write_row` (默认实现逐像素转发给 `write`), 最后调用 `end_picture`.
/// 每个像素恰好写入一次.
pub trait PixelSink {
    /// 写入单个像素, `argb` 为 0xAARRGGBB
    fn write(&mut self, x: u32, y: u32, argb: u32);

    /// 写入一整行像素
    fn write_row(&mut self, y: u32, row: &[u32]) {
        for (x, &argb) in row.iter().enumerate() {
            self.write(x as u32, y, argb);
        }
    }

    /// 一帧开始
    fn begin_picture(&mut self, _width: u32, _height: u32) {}

    /// 一帧结束
    fn end_picture(&mut self) {}
}

impl<F> PixelSink for F
where
    F: FnMut(u32, u32, u32),
{
    fn write(&mut self, x: u32, y: u32, argb: u32) {
        self(x, y, argb)
    }
}

/// 一帧 ARGB 图像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgbFrame {
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 行主序像素, 长度为 width * height
    pub pixels: Vec<u32>,
}

impl ArgbFrame {
    /// 读取 (x, y) 处的像素
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[(y * self.width + x) as usize]
    }
}

/// 收集完整帧的像素接收端
#[derive(Debug, Default)]
pub struct FrameCollector {
    frames: Vec<ArgbFrame>,
    current: Option<ArgbFrame>,
}

impl FrameCollector {
    /// 创建空的收集器
    pub fn new() -> Self {
        Self::default()
    }

    /// 已收集的帧
    pub fn frames(&self) -> &[ArgbFrame] {
        &self.frames
    }

    /// 取出全部帧
    pub fn into_frames(self) -> Vec<ArgbFrame> {
        self.frames
    }
}

impl PixelSink for FrameCollector {
    fn write(&mut self, x: u32, y: u32, argb: u32) {
        if let Some(frame) = self.current.as_mut() {
            if x < frame.width && y < frame.height {
                frame.pixels[(y * frame.width + x) as usize] = argb;
            }
        }
    }

    fn write_row(&mut self, y: u32, row: &[u32]) {
        if let Some(frame) = self.current.as_mut() {
            if y < frame.height && row.len() == frame.width as usize {
                let start = (y * frame.width) as usize;
                frame.pixels[start..start + row.len()].copy_from_slice(row);
            }
        }
    }

    fn begin_picture(&mut self, width: u32, height: u32) {
        self.current = Some(ArgbFrame {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        });
    }

    fn end_picture(&mut self) {
        if let Some(frame) = self.current.take() {
            self.frames.push(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_short_read() {
        let mut src = MemorySource::new(vec![1u8, 2, 3, 4, 5]);
        let mut buf = [0u8; 4];
        assert_eq!(src.read_block(&mut buf).unwrap(), 4);
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(src.read_block(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 5);
        assert_eq!(src.read_block(&mut buf).unwrap(), 0);
    }

    /// 每次只返回 1 字节的读取器, 模拟管道短读
    struct Trickle(Vec<u8>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0.remove(0);
            Ok(1)
        }
    }

    #[test]
    fn test_read_source_fills_block_across_short_reads() {
        let mut src = ReadSource::new(Trickle(vec![9, 8, 7]));
        let mut buf = [0u8; 8];
        assert_eq!(src.read_block(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[9, 8, 7]);
    }

    #[test]
    fn test_closure_source_and_sink() {
        let mut calls = 0;
        let mut src = |buf: &mut [u8]| -> MpegvResult<usize> {
            calls += 1;
            buf[0] = 0xAB;
            Ok(1)
        };
        let mut buf = [0u8; 2];
        assert_eq!(src.read_block(&mut buf).unwrap(), 1);
        assert_eq!(calls, 1);

        let mut seen = Vec::new();
        let mut sink = |x: u32, y: u32, argb: u32| seen.push((x, y, argb));
        sink.write_row(3, &[1, 2]);
        assert_eq!(seen, vec![(0, 3, 1), (1, 3, 2)]);
    }

    #[test]
    fn test_frame_collector() {
        let mut sink = FrameCollector::new();
        sink.begin_picture(2, 2);
        sink.write_row(0, &[1, 2]);
        sink.write(0, 1, 3);
        sink.write(1, 1, 4);
        sink.end_picture();
        let frames = sink.into_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].pixels, vec![1, 2, 3, 4]);
        assert_eq!(frames[0].pixel(1, 1), 4);
    }
}
