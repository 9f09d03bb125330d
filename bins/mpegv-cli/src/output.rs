//! 输出帧写入: 每帧一个 PPM (P6) 或原始 ARGB 文件

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::debug;
use mpegv_core::PixelSink;

/// 输出文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// 二进制 PPM (P6), 丢弃 alpha
    Ppm,
    /// 原始 32 位 ARGB, 大端字节序
    Argb,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Ppm => "ppm",
            Self::Argb => "argb",
        }
    }
}

/// 把每帧写入目录 `dir` 下的 `frame_NNNNN.{ext}`
///
/// 像素接收端无法返回错误, 第一个 I/O 错误被保存下来, 之后的帧不再写入.
pub struct FrameWriter {
    dir: PathBuf,
    format: OutputFormat,
    width: u32,
    height: u32,
    buf: Vec<u8>,
    frames_written: u32,
    error: Option<std::io::Error>,
}

impl FrameWriter {
    pub fn new(dir: &Path, format: OutputFormat) -> Self {
        Self {
            dir: dir.to_path_buf(),
            format,
            width: 0,
            height: 0,
            buf: Vec::new(),
            frames_written: 0,
            error: None,
        }
    }

    /// 已写出的帧数
    pub fn frames_written(&self) -> u32 {
        self.frames_written
    }

    /// 取走写入错误
    pub fn take_error(&mut self) -> Option<std::io::Error> {
        self.error.take()
    }

    fn frame_path(&self, index: u32) -> PathBuf {
        self.dir.join(format!("frame_{:05}.{}", index, self.format.extension()))
    }

    fn flush_frame(&mut self) -> std::io::Result<()> {
        let path = self.frame_path(self.frames_written);
        let mut out = BufWriter::new(File::create(&path)?);
        if self.format == OutputFormat::Ppm {
            write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        }
        out.write_all(&self.buf)?;
        out.flush()?;
        debug!("写出 {}", path.display());
        Ok(())
    }
}

impl PixelSink for FrameWriter {
    fn write(&mut self, _x: u32, _y: u32, argb: u32) {
        match self.format {
            OutputFormat::Ppm => self.buf.extend_from_slice(&argb.to_be_bytes()[1..]),
            OutputFormat::Argb => self.buf.extend_from_slice(&argb.to_be_bytes()),
        }
    }

    fn begin_picture(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.buf.clear();
    }

    fn end_picture(&mut self) {
        if self.error.is_some() {
            return;
        }
        match self.flush_frame() {
            Ok(()) => self.frames_written += 1,
            Err(e) => self.error = Some(e),
        }
    }
}
