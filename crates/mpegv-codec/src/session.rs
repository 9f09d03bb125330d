//! 解码会话: Init / Decode / Close
//!
//! 会话独占字节源和全部帧缓冲, 不存在任何全局状态.
//!
//! ```rust,no_run
//! use mpegv_codec::{DecodeStatus, init};
//! use mpegv_core::{FrameCollector, MemorySource};
//!
//! let data = std::fs::read("clip.m2v").unwrap();
//! let (mut session, width, height) = init(MemorySource::new(data)).unwrap();
//! let mut frames = FrameCollector::new();
//! let status = session.decode(&mut frames).unwrap();
//! assert_eq!(status, DecodeStatus::NormalEnd);
//! println!("{}x{}: {} 帧", width, height, frames.frames().len());
//! session.close();
//! ```

use log::{debug, info};
use mpegv_core::{ByteSource, ChromaFormat, MatrixCoefficients, MpegvError, MpegvResult, PixelSink, Rational};

use crate::bitstream::BitCursor;
use crate::config::DecoderConfig;
use crate::header::{GopHeader, HeaderEvent, HeaderParser, SequenceHeader};
use crate::picture::{DecoderStats, PictureEngine, PictureInfo};

/// `decode` 的结束状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// 解码到流末尾, 没有码流错误
    NormalEnd,
    /// 解码到流末尾, 期间出现过可恢复的码流错误
    Fault,
}

/// `decode_picture` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureStatus {
    /// 解码了一幅图像
    Decoded(PictureInfo),
    /// 码流已结束, 等待中的帧均已输出
    EndOfStream,
}

/// 码流概要信息
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    /// 输出宽度
    pub width: u32,
    /// 输出高度
    pub height: u32,
    /// 宏块网格宽度 (像素)
    pub coded_width: u32,
    /// 宏块网格高度 (像素)
    pub coded_height: u32,
    /// MPEG-2 码流
    pub mpeg2: bool,
    pub chroma_format: ChromaFormat,
    pub progressive_sequence: bool,
    pub frame_rate: Rational,
    pub aspect_ratio_code: u32,
    /// 码率 (bit/s)
    pub bit_rate: u64,
    pub profile_and_level: u32,
    pub matrix_coefficients: MatrixCoefficients,
}

/// 解码会话
pub struct DecoderSession<S> {
    cursor: BitCursor<S>,
    engine: PictureEngine,
    /// 已解析头部但尚未解码的图像
    pending: bool,
}

/// 使用默认配置初始化会话, 返回 (会话, 输出宽度, 输出高度)
pub fn init<S: ByteSource>(source: S) -> MpegvResult<(DecoderSession<S>, u32, u32)> {
    DecoderSession::with_config(source, DecoderConfig::default())
}

impl<S: ByteSource> DecoderSession<S> {
    /// 解析到第一个图像头并分配帧缓冲
    ///
    /// 在码流结束前找不到任何可解码的图像时返回 [`MpegvError::Eof`].
    pub fn with_config(source: S, config: DecoderConfig) -> MpegvResult<(Self, u32, u32)> {
        let mut cursor = BitCursor::new(source);
        let mut headers = HeaderParser::default();
        loop {
            let event = headers.get_header(&mut cursor);
            if let Some(err) = cursor.take_error() {
                return Err(err);
            }
            match event {
                HeaderEvent::PictureReady if headers.have_sequence => break,
                HeaderEvent::PictureReady => debug!("序列头之前的图像, 跳过"),
                HeaderEvent::SequenceEnd => {
                    if cursor.at_end_of_data() {
                        return Err(MpegvError::Eof);
                    }
                }
            }
        }

        let engine = PictureEngine::new(headers, config)?;
        let session = Self {
            cursor,
            engine,
            pending: true,
        };
        let info = session.stream_info();
        info!(
            "{} 视频: {}x{}, {:?}, {:.3} fps, {} bit/s",
            if info.mpeg2 { "MPEG-2" } else { "MPEG-1" },
            info.width,
            info.height,
            info.chroma_format,
            info.frame_rate.to_f64(),
            info.bit_rate
        );
        Ok((session, info.width, info.height))
    }

    /// 解码恰好一幅编码图像 (帧或单场)
    ///
    /// 无法解码而被丢弃的图像只计入码流错误, 不单独返回.
    /// 调用方可以在任意两次调用之间停止解码.
    pub fn decode_picture<K: PixelSink + ?Sized>(&mut self, sink: &mut K) -> MpegvResult<PictureStatus> {
        if let Some(err) = self.cursor.take_error() {
            return Err(err);
        }
        loop {
            while !self.pending {
                let event = self.engine.headers.get_header(&mut self.cursor);
                if let Some(err) = self.cursor.take_error() {
                    return Err(err);
                }
                match event {
                    HeaderEvent::PictureReady => self.pending = true,
                    HeaderEvent::SequenceEnd => {
                        self.engine.end_of_sequence(sink)?;
                        if self.cursor.at_end_of_data() {
                            return Ok(PictureStatus::EndOfStream);
                        }
                        debug!("序列结束码之后仍有数据, 继续解码");
                    }
                }
            }
            self.pending = false;
            if !self.engine.configure(&self.cursor, sink)? {
                continue;
            }
            if let Some(info) = self.engine.decode_picture(&mut self.cursor, sink)? {
                return Ok(PictureStatus::Decoded(info));
            }
        }
    }

    /// 解码剩余的全部图像
    pub fn decode<K: PixelSink + ?Sized>(&mut self, sink: &mut K) -> MpegvResult<DecodeStatus> {
        let faults_before = self.engine.stats.faults;
        while let PictureStatus::Decoded(_) = self.decode_picture(sink)? {}
        let stats = self.engine.stats;
        info!(
            "解码结束: {} 幅图像, 输出 {} 帧, {} 个码流错误",
            stats.pictures_decoded, stats.frames_output, stats.faults
        );
        if stats.faults > faults_before {
            Ok(DecodeStatus::Fault)
        } else {
            Ok(DecodeStatus::NormalEnd)
        }
    }

    /// 释放全部帧缓冲与游标状态, 交还字节源
    pub fn close(self) -> S {
        let Self { cursor, mut engine, .. } = self;
        engine.release();
        drop(engine);
        debug!("会话关闭, 已消耗 {} 位", cursor.position());
        cursor.into_source()
    }
}

impl<S> DecoderSession<S> {
    /// 解码统计
    pub fn stats(&self) -> DecoderStats {
        self.engine.stats
    }

    /// 当前序列的概要信息
    pub fn stream_info(&self) -> StreamInfo {
        let seq = &self.engine.headers.sequence;
        let layout = self.engine.store.layout();
        let (width, height) = self.engine.output_size();
        StreamInfo {
            width: width as u32,
            height: height as u32,
            coded_width: layout.coded_width as u32,
            coded_height: layout.coded_height as u32,
            mpeg2: seq.is_mpeg2,
            chroma_format: seq.chroma_format,
            progressive_sequence: seq.progressive_sequence,
            frame_rate: seq.frame_rate(),
            aspect_ratio_code: seq.aspect_ratio_code,
            bit_rate: seq.bit_rate(),
            profile_and_level: seq.profile_and_level,
            matrix_coefficients: seq.matrix_coefficients,
        }
    }

    /// 最近解析的序列头
    pub fn sequence_header(&self) -> &SequenceHeader {
        &self.engine.headers.sequence
    }

    /// 最近解析的 GOP 头
    pub fn gop_header(&self) -> Option<&GopHeader> {
        self.engine.headers.gop.as_ref()
    }

    /// 会话配置
    pub fn config(&self) -> &DecoderConfig {
        &self.engine.config
    }
}
