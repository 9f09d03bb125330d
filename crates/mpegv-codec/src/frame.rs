//! 帧缓冲与参考帧管理
//!
//! 每个帧槽持有 Y/Cb/Cr 三个平面, 尺寸为完整的宏块网格. 参考帧的轮换只交换
//! 槽位下标, 从不复制像素.

use mpegv_core::{ChromaFormat, MpegvError, MpegvResult};
use mpegv_scale::YuvFrame;

use crate::types::PictureCodingType;

/// 宏块网格与平面尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Layout {
    pub mb_width: usize,
    /// 帧内宏块行数 (隔行序列为场宏块行数的 2 倍)
    pub mb_height: usize,
    pub coded_width: usize,
    pub coded_height: usize,
    pub chroma_width: usize,
    pub chroma_height: usize,
    pub chroma_format: ChromaFormat,
    pub block_count: usize,
}

impl Layout {
    /// 由序列参数推导; 隔行的 MPEG-2 序列高度按 32 行对齐
    pub fn new(
        horizontal_size: u32,
        vertical_size: u32,
        chroma_format: ChromaFormat,
        interlaced_mpeg2: bool,
    ) -> MpegvResult<Self> {
        if horizontal_size == 0 || vertical_size == 0 {
            return Err(MpegvError::InvalidData(format!(
                "图像尺寸为 0: {}x{}",
                horizontal_size, vertical_size
            )));
        }
        let mb_width = (horizontal_size as usize).div_ceil(16);
        let mb_height = if interlaced_mpeg2 {
            2 * (vertical_size as usize).div_ceil(32)
        } else {
            (vertical_size as usize).div_ceil(16)
        };
        let coded_width = mb_width * 16;
        let coded_height = mb_height * 16;
        let (chroma_width, chroma_height) = chroma_format.chroma_size(coded_width, coded_height);
        Ok(Self {
            mb_width,
            mb_height,
            coded_width,
            coded_height,
            chroma_width,
            chroma_height,
            chroma_format,
            block_count: chroma_format.block_count(),
        })
    }

    /// 平面 `cc` 的 (宽, 高)
    pub fn plane_size(&self, cc: usize) -> (usize, usize) {
        if cc == 0 {
            (self.coded_width, self.coded_height)
        } else {
            (self.chroma_width, self.chroma_height)
        }
    }

    /// 宏块内平面 `cc` 的 (宽, 高)
    pub fn mb_plane_size(&self, cc: usize) -> (usize, usize) {
        if cc == 0 {
            return (16, 16);
        }
        let w = if self.chroma_format.is_horizontally_subsampled() { 8 } else { 16 };
        let h = if self.chroma_format.is_vertically_subsampled() { 8 } else { 16 };
        (w, h)
    }
}

// ============================================================================
// 平面视图
// ============================================================================

/// 平面的帧或场视图: 行 `y` 起始于 `offset + y * stride`
#[derive(Clone, Copy)]
pub(crate) struct PlaneView<'a> {
    data: &'a [u8],
    offset: usize,
    stride: usize,
    width: usize,
    height: usize,
}

impl PlaneView<'_> {
    /// 读取采样点, 越界坐标钳位到最近的边缘
    #[inline]
    pub fn sample(&self, x: isize, y: isize) -> u8 {
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        self.data[self.offset + cy * self.stride + cx]
    }
}

/// 可写的平面视图
pub(crate) struct PlaneViewMut<'a> {
    data: &'a mut [u8],
    offset: usize,
    stride: usize,
    width: usize,
    height: usize,
}

impl PlaneViewMut<'_> {
    /// 第 `y` 行从 `x` 开始的 `len` 个采样
    #[inline]
    pub fn row_mut(&mut self, x: usize, y: usize, len: usize) -> &mut [u8] {
        debug_assert!(x + len <= self.width && y < self.height);
        let start = self.offset + y * self.stride + x;
        &mut self.data[start..start + len]
    }
}

/// 计算 (offset, stride, height): `field` 为 `None` 时是整帧
fn addressing(width: usize, height: usize, field: Option<usize>) -> (usize, usize, usize) {
    match field {
        None => (0, width, height),
        Some(parity) => (parity * width, width * 2, height / 2),
    }
}

// ============================================================================
// 帧缓冲
// ============================================================================

/// 一帧的三个平面
#[derive(Debug)]
pub(crate) struct FrameBuffer {
    planes: [Vec<u8>; 3],
    layout: Layout,
    /// 解码该帧时的 progressive_frame, 决定色度垂直插值方式
    pub progressive_frame: bool,
}

fn allocate_plane(len: usize, fill: u8) -> MpegvResult<Vec<u8>> {
    let mut plane = Vec::new();
    plane
        .try_reserve_exact(len)
        .map_err(|_| MpegvError::OutOfMemory(format!("{} 字节", len)))?;
    plane.resize(len, fill);
    Ok(plane)
}

impl FrameBuffer {
    /// 分配并填充为黑色
    pub fn allocate(layout: Layout) -> MpegvResult<Self> {
        let luma = layout.coded_width * layout.coded_height;
        let chroma = layout.chroma_width * layout.chroma_height;
        Ok(Self {
            planes: [
                allocate_plane(luma, 16)?,
                allocate_plane(chroma, 128)?,
                allocate_plane(chroma, 128)?,
            ],
            layout,
            progressive_frame: true,
        })
    }

    /// 平面 `cc` 的帧视图或场视图
    pub fn view(&self, cc: usize, field: Option<usize>) -> PlaneView<'_> {
        let (width, height) = self.layout.plane_size(cc);
        let (offset, stride, height) = addressing(width, height, field);
        PlaneView {
            data: &self.planes[cc],
            offset,
            stride,
            width,
            height,
        }
    }

    /// 可写视图
    pub fn view_mut(&mut self, cc: usize, field: Option<usize>) -> PlaneViewMut<'_> {
        let (width, height) = self.layout.plane_size(cc);
        let (offset, stride, height) = addressing(width, height, field);
        PlaneViewMut {
            data: &mut self.planes[cc],
            offset,
            stride,
            width,
            height,
        }
    }

    /// 供颜色转换使用的只读借用
    pub fn yuv(&self) -> YuvFrame<'_> {
        YuvFrame {
            y: &self.planes[0],
            cb: &self.planes[1],
            cr: &self.planes[2],
            width: self.layout.coded_width,
            height: self.layout.coded_height,
            chroma_format: self.layout.chroma_format,
        }
    }
}

// ============================================================================
// 参考帧轮换
// ============================================================================

/// 三个帧槽: 前向参考, 后向参考, B 图像暂存
#[derive(Debug)]
pub(crate) struct FrameStore {
    frames: [FrameBuffer; 3],
    forward: usize,
    backward: usize,
    aux: usize,
    current: usize,
    layout: Layout,
}

impl FrameStore {
    pub fn new(layout: Layout) -> MpegvResult<Self> {
        Ok(Self {
            frames: [
                FrameBuffer::allocate(layout)?,
                FrameBuffer::allocate(layout)?,
                FrameBuffer::allocate(layout)?,
            ],
            forward: 0,
            backward: 1,
            aux: 2,
            current: 1,
            layout,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// 在新编码帧开始时轮换
    ///
    /// B 图像写入暂存槽. I/P 图像 (第二场除外) 交换前后向参考, 新图像覆盖
    /// 旧的后向参考所在槽, 原后向参考成为前向参考.
    pub fn rotate(&mut self, coding_type: PictureCodingType, second_field: bool) {
        if coding_type == PictureCodingType::B {
            self.current = self.aux;
        } else {
            if !second_field {
                std::mem::swap(&mut self.forward, &mut self.backward);
            }
            self.current = self.backward;
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn forward_index(&self) -> usize {
        self.forward
    }

    pub fn backward_index(&self) -> usize {
        self.backward
    }

    pub fn aux_index(&self) -> usize {
        self.aux
    }

    pub fn frame(&self, index: usize) -> &FrameBuffer {
        &self.frames[index]
    }

    pub fn current_mut(&mut self) -> &mut FrameBuffer {
        &mut self.frames[self.current]
    }
}
