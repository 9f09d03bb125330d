//! YCbCr 到 ARGB 的转换与输出.
//!
//! 色度先经 [`crate::upsample`] 插值到亮度分辨率, 再逐像素做定点矩阵变换.
//! 行与行之间相互独立, 变换用 rayon 按行并行, 输出到像素接收端时保持行主序.

use log::trace;
use mpegv_core::{ChromaFormat, MatrixCoefficients, MpegvError, MpegvResult, PixelSink};
use rayon::prelude::*;

use crate::upsample::{upsample_horizontal, upsample_vertical};

/// 反变换系数 (crv, cbu, cgu, cgv), 以 65536 为单位, 按 matrix_coefficients 码值索引
pub const INVERSE_COEFFICIENTS: [[i32; 4]; 8] = [
    [117504, 138453, 13954, 34903], // 0: 禁用值, 按 BT.709
    [117504, 138453, 13954, 34903], // 1: BT.709
    [104597, 132201, 25675, 53279], // 2: 未指定
    [104597, 132201, 25675, 53279], // 3: 保留
    [104448, 132798, 24759, 53109], // 4: FCC
    [104597, 132201, 25675, 53279], // 5: BT.470-2 B/G
    [104597, 132201, 25675, 53279], // 6: SMPTE 170M
    [117579, 136230, 16907, 35559], // 7: SMPTE 240M
];

/// 亮度缩放 255/219, 以 65536 为单位
const LUMA_SCALE: i32 = 76309;

#[inline]
fn clip(v: i32) -> u32 {
    v.clamp(0, 255) as u32
}

/// 单像素 YCbCr (BT.601 标称范围) 到 0xAARRGGBB
#[inline]
pub fn ycbcr_to_argb(y: u8, cb: u8, cr: u8, coeffs: &[i32; 4]) -> u32 {
    let [crv, cbu, cgu, cgv] = *coeffs;
    let u = i32::from(cb) - 128;
    let v = i32::from(cr) - 128;
    let l = LUMA_SCALE * (i32::from(y) - 16);
    let r = clip((l + crv * v + 32768) >> 16);
    let g = clip((l - cgu * u - cgv * v + 32768) >> 16);
    let b = clip((l + cbu * u + 32768) >> 16);
    0xFF00_0000 | (r << 16) | (g << 8) | b
}

/// 一帧解码完成的 YCbCr 平面 (只读借用)
#[derive(Debug, Clone, Copy)]
pub struct YuvFrame<'a> {
    /// 亮度平面, `width * height`
    pub y: &'a [u8],
    /// Cb 平面
    pub cb: &'a [u8],
    /// Cr 平面
    pub cr: &'a [u8],
    /// 编码宽度 (亮度)
    pub width: usize,
    /// 编码高度 (亮度)
    pub height: usize,
    /// 色度格式
    pub chroma_format: ChromaFormat,
}

/// 输出参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputParams {
    /// 输出宽度, 不超过编码宽度
    pub width: usize,
    /// 输出高度, 不超过编码高度
    pub height: usize,
    /// 矩阵系数
    pub matrix: MatrixCoefficients,
    /// 逐行帧 (决定垂直色度滤波器)
    pub progressive_frame: bool,
    /// MPEG-1 码流 (色度位于亮度样本之间)
    pub mpeg1: bool,
}

/// 颜色转换器, 持有可复用的中间缓冲
#[derive(Debug, Default)]
pub struct ColorConverter {
    cb_half: Vec<u8>,
    cr_half: Vec<u8>,
    cb_full: Vec<u8>,
    cr_full: Vec<u8>,
    argb: Vec<u32>,
}

impl ColorConverter {
    /// 创建转换器
    pub fn new() -> Self {
        Self::default()
    }

    /// 把一帧转换为行主序 ARGB 像素, 返回内部缓冲的借用
    pub fn convert(&mut self, frame: &YuvFrame<'_>, params: &OutputParams) -> MpegvResult<&[u32]> {
        validate(frame, params)?;
        let Self {
            cb_half,
            cr_half,
            cb_full,
            cr_full,
            argb,
        } = self;

        let (w, h) = (frame.width, frame.height);
        let (cw, ch) = frame.chroma_format.chroma_size(w, h);
        let (cb, cr): (&[u8], &[u8]) = match frame.chroma_format {
            ChromaFormat::Yuv444 => (frame.cb, frame.cr),
            ChromaFormat::Yuv422 => {
                resize(cb_full, w * h);
                resize(cr_full, w * h);
                upsample_horizontal(frame.cb, cb_full, cw, ch, params.mpeg1);
                upsample_horizontal(frame.cr, cr_full, cw, ch, params.mpeg1);
                (cb_full.as_slice(), cr_full.as_slice())
            }
            ChromaFormat::Yuv420 => {
                resize(cb_half, w * ch);
                resize(cr_half, w * ch);
                upsample_horizontal(frame.cb, cb_half, cw, ch, params.mpeg1);
                upsample_horizontal(frame.cr, cr_half, cw, ch, params.mpeg1);
                resize(cb_full, w * h);
                resize(cr_full, w * h);
                upsample_vertical(cb_half, cb_full, w, ch, params.progressive_frame);
                upsample_vertical(cr_half, cr_full, w, ch, params.progressive_frame);
                (cb_full.as_slice(), cr_full.as_slice())
            }
        };

        let coeffs = &INVERSE_COEFFICIENTS[params.matrix.code()];
        let out_w = params.width;
        argb.clear();
        argb.resize(out_w * params.height, 0);
        argb.par_chunks_mut(out_w)
            .enumerate()
            .for_each(|(row, out)| {
                let base = row * w;
                let ys = &frame.y[base..base + out_w];
                let cbs = &cb[base..base + out_w];
                let crs = &cr[base..base + out_w];
                for (x, px) in out.iter_mut().enumerate() {
                    *px = ycbcr_to_argb(ys[x], cbs[x], crs[x], coeffs);
                }
            });
        trace!(
            "颜色转换: {}x{} -> {}x{}, {:?}",
            w, h, out_w, params.height, frame.chroma_format
        );
        Ok(argb)
    }

    /// 转换一帧并按行主序推送到像素接收端
    pub fn emit<K: PixelSink + ?Sized>(
        &mut self,
        frame: &YuvFrame<'_>,
        params: &OutputParams,
        sink: &mut K,
    ) -> MpegvResult<()> {
        let width = params.width;
        let pixels = self.convert(frame, params)?;
        sink.begin_picture(width as u32, params.height as u32);
        for (y, row) in pixels.chunks_exact(width).enumerate() {
            sink.write_row(y as u32, row);
        }
        sink.end_picture();
        Ok(())
    }

    /// 释放中间缓冲
    pub fn release(&mut self) {
        *self = Self::default();
    }
}

fn resize(buf: &mut Vec<u8>, len: usize) {
    buf.clear();
    buf.resize(len, 0);
}

fn validate(frame: &YuvFrame<'_>, params: &OutputParams) -> MpegvResult<()> {
    let (w, h) = (frame.width, frame.height);
    let (cw, ch) = frame.chroma_format.chroma_size(w, h);
    if w == 0 || h == 0 || params.width == 0 || params.height == 0 {
        return Err(MpegvError::InvalidArgument(format!(
            "图像尺寸为 0: 编码 {}x{}, 输出 {}x{}",
            w, h, params.width, params.height
        )));
    }
    if params.width > w || params.height > h {
        return Err(MpegvError::InvalidArgument(format!(
            "输出尺寸 {}x{} 超出编码尺寸 {}x{}",
            params.width, params.height, w, h
        )));
    }
    if frame.y.len() < w * h || frame.cb.len() < cw * ch || frame.cr.len() < cw * ch {
        return Err(MpegvError::InvalidArgument(format!(
            "平面缓冲过小: Y={}, Cb={}, Cr={}, 需要 {}/{}",
            frame.y.len(),
            frame.cb.len(),
            frame.cr.len(),
            w * h,
            cw * ch
        )));
    }
    Ok(())
}
