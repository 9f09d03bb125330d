//! 宏块重建: 运动补偿预测, 逆变换残差叠加, 写回当前帧
//!
//! 预测先写入宏块局部缓冲, 局部缓冲的行与当前图像的行一一对应
//! (帧图像为帧行, 场图像为本场的行), 残差按 DCT 类型映射到局部行,
//! 最后整体写回当前帧.

use crate::frame::{FrameBuffer, FrameStore, Layout};
use crate::header::PictureHeader;
use crate::macroblock::{MacroblockState, component_of};
use crate::motion::dual_prime_arithmetic;
use crate::picture::PictureEngine;
use crate::types::{MacroblockType, MotionType, PictureCodingType};

/// 宏块局部缓冲, 三个分量按各自宽度紧密排列
#[derive(Debug, Clone)]
pub(crate) struct MbBuffer {
    planes: [[u8; 256]; 3],
    size: [(usize, usize); 3],
}

impl MbBuffer {
    pub fn new(layout: &Layout) -> Self {
        Self {
            planes: [[0; 256]; 3],
            size: [layout.mb_plane_size(0), layout.mb_plane_size(1), layout.mb_plane_size(2)],
        }
    }
}

/// 预测写入的局部行: 起始行 `row0` (亮度单位), 帧图像场预测时只写 `field` 奇偶的行
#[derive(Debug, Clone, Copy, Default)]
struct Target {
    row0: usize,
    field: Option<usize>,
}

const WHOLE: Target = Target { row0: 0, field: None };
const LOWER_HALF: Target = Target { row0: 8, field: None };

/// 单次预测的参数, 坐标与矢量均为亮度单位
#[derive(Debug, Clone, Copy)]
struct Prediction {
    /// 参考场, `None` 表示按帧寻址
    src_field: Option<usize>,
    target: Target,
    /// 亮度行数 (16 或 8)
    h: usize,
    x: isize,
    y: isize,
    dx: i32,
    dy: i32,
    average: bool,
}

/// 半像素插值并写入局部缓冲的一个分量
#[allow(clippy::too_many_arguments)]
fn predict_component(
    src: &FrameBuffer,
    cc: usize,
    src_field: Option<usize>,
    dst: &mut [u8; 256],
    dst_width: usize,
    row0: usize,
    step: usize,
    w: usize,
    h: usize,
    x: isize,
    y: isize,
    dx: i32,
    dy: i32,
    average: bool,
) {
    let view = src.view(cc, src_field);
    let (xint, xh) = ((dx >> 1) as isize, dx & 1 != 0);
    let (yint, yh) = ((dy >> 1) as isize, dy & 1 != 0);
    for i in 0..h {
        let sy = y + yint + i as isize;
        let row = &mut dst[(row0 + i * step) * dst_width..][..w];
        for (j, d) in row.iter_mut().enumerate() {
            let sx = x + xint + j as isize;
            let p = u32::from(view.sample(sx, sy));
            let v = match (xh, yh) {
                (false, false) => p,
                (true, false) => (p + u32::from(view.sample(sx + 1, sy)) + 1) >> 1,
                (false, true) => (p + u32::from(view.sample(sx, sy + 1)) + 1) >> 1,
                (true, true) => {
                    (p + u32::from(view.sample(sx + 1, sy))
                        + u32::from(view.sample(sx, sy + 1))
                        + u32::from(view.sample(sx + 1, sy + 1))
                        + 2)
                        >> 2
                }
            };
            *d = if average { ((u32::from(*d) + v + 1) >> 1) as u8 } else { v as u8 };
        }
    }
}

/// 对三个分量执行一次预测, 色度按采样格式缩放坐标与矢量
fn form_prediction(src: &FrameBuffer, layout: &Layout, dst: &mut MbBuffer, p: Prediction) {
    let hsub = layout.chroma_format.is_horizontally_subsampled();
    let vsub = layout.chroma_format.is_vertically_subsampled();
    for cc in 0..3 {
        let (mut w, mut h, mut x, mut y, mut dx, mut dy) = (16, p.h, p.x, p.y, p.dx, p.dy);
        let mut row0 = p.target.row0;
        if cc > 0 {
            if hsub {
                w >>= 1;
                x >>= 1;
                dx /= 2;
            }
            if vsub {
                h >>= 1;
                y >>= 1;
                dy /= 2;
                row0 >>= 1;
            }
        }
        let (row0, step) = match p.target.field {
            Some(parity) => (row0 + parity, 2),
            None => (row0, 1),
        };
        let dst_width = dst.size[cc].0;
        predict_component(
            src,
            cc,
            p.src_field,
            &mut dst.planes[cc],
            dst_width,
            row0,
            step,
            w,
            h,
            x,
            y,
            dx,
            dy,
            p.average,
        );
    }
}

/// 按宏块类型与运动类型形成预测, 没有任何预测时返回 false
#[allow(clippy::too_many_arguments)]
fn form_predictions(
    store: &FrameStore,
    dst: &mut MbBuffer,
    pic: &PictureHeader,
    mb: &MacroblockState,
    second_field: bool,
    bx: usize,
    by: usize,
) -> bool {
    let layout = store.layout();
    let forward = store.frame(store.forward_index());
    let backward = store.frame(store.backward_index());
    let frame_picture = !pic.picture_structure.is_field();
    let fwd = mb.mb_type.contains(MacroblockType::MOTION_FORWARD);
    let bwd = mb.mb_type.contains(MacroblockType::MOTION_BACKWARD);
    let (bx, by) = (bx as isize, by as isize);
    let pmv = &mb.pmv;
    let sel = |r: usize, s: usize| usize::from(mb.field_select[r][s]);
    let mut formed = false;

    let mut predict = |src: &FrameBuffer, src_field: Option<usize>, target: Target, h: usize, y: isize, mv: [i32; 2], average: bool| {
        form_prediction(
            src,
            layout,
            dst,
            Prediction {
                src_field,
                target,
                h,
                x: bx,
                y,
                dx: mv[0],
                dy: mv[1],
                average,
            },
        );
    };

    if fwd || pic.coding_type == PictureCodingType::P {
        if frame_picture {
            if mb.motion_type == MotionType::Frame || !fwd {
                predict(forward, None, WHOLE, 16, by, pmv[0][0], false);
            } else if mb.motion_type == MotionType::Field {
                for r in 0..2 {
                    let target = Target { row0: 0, field: Some(r) };
                    let mv = [pmv[r][0][0], pmv[r][0][1] >> 1];
                    predict(forward, Some(sel(r, 0)), target, 8, by >> 1, mv, false);
                }
            } else if mb.motion_type == MotionType::DualPrime {
                let mv = [pmv[0][0][0], pmv[0][0][1] >> 1];
                let dmv = dual_prime_arithmetic(pic.picture_structure, pic.top_field_first, mb.dmvector, mv[0], mv[1]);
                for parity in 0..2 {
                    let target = Target { row0: 0, field: Some(parity) };
                    // 同奇偶场预测, 再与相反奇偶场的派生矢量预测取平均
                    predict(forward, Some(parity), target, 8, by >> 1, mv, false);
                    predict(forward, Some(1 - parity), target, 8, by >> 1, dmv[parity], true);
                }
            }
        } else {
            let current_field = pic.picture_structure.parity();
            // P 图像的第二场可以参考同一帧中已解码的另一场
            let reference_for = |field: usize| {
                if pic.coding_type == PictureCodingType::P && second_field && field != current_field {
                    backward
                } else {
                    forward
                }
            };
            if mb.motion_type == MotionType::Field || !fwd {
                predict(reference_for(sel(0, 0)), Some(sel(0, 0)), WHOLE, 16, by, pmv[0][0], false);
            } else if mb.motion_type == MotionType::Field16x8 {
                predict(reference_for(sel(0, 0)), Some(sel(0, 0)), WHOLE, 8, by, pmv[0][0], false);
                predict(reference_for(sel(1, 0)), Some(sel(1, 0)), LOWER_HALF, 8, by + 8, pmv[1][0], false);
            } else if mb.motion_type == MotionType::DualPrime {
                let opposite = if second_field { backward } else { forward };
                let dmv = dual_prime_arithmetic(
                    pic.picture_structure,
                    pic.top_field_first,
                    mb.dmvector,
                    pmv[0][0][0],
                    pmv[0][0][1],
                );
                predict(forward, Some(current_field), WHOLE, 16, by, pmv[0][0], false);
                predict(opposite, Some(1 - current_field), WHOLE, 16, by, dmv[0], true);
            }
        }
        formed = true;
    }

    if bwd {
        if frame_picture {
            if mb.motion_type == MotionType::Frame {
                predict(backward, None, WHOLE, 16, by, pmv[0][1], formed);
            } else {
                for r in 0..2 {
                    let target = Target { row0: 0, field: Some(r) };
                    let mv = [pmv[r][1][0], pmv[r][1][1] >> 1];
                    predict(backward, Some(sel(r, 1)), target, 8, by >> 1, mv, formed);
                }
            }
        } else if mb.motion_type == MotionType::Field16x8 {
            predict(backward, Some(sel(0, 1)), WHOLE, 8, by, pmv[0][1], formed);
            predict(backward, Some(sel(1, 1)), LOWER_HALF, 8, by + 8, pmv[1][1], formed);
        } else {
            predict(backward, Some(sel(0, 1)), WHOLE, 16, by, pmv[0][1], formed);
        }
        formed = true;
    }
    formed
}

/// 块 `comp` 在局部缓冲中的 (分量, 起始列, 起始行, 行步长)
fn block_origin(comp: usize, layout: &Layout, frame_picture: bool, dct_field: bool) -> (usize, usize, usize, usize) {
    let cc = component_of(comp);
    let (col, field_dct) = if cc == 0 {
        ((comp & 1) << 3, frame_picture && dct_field)
    } else {
        (comp & 8, frame_picture && dct_field && !layout.chroma_format.is_vertically_subsampled())
    };
    if field_dct {
        (cc, col, (comp & 2) >> 1, 2)
    } else {
        (cc, col, (comp & 2) << 2, 1)
    }
}

impl PictureEngine {
    /// 重建宏块 `mba` 并写回当前帧
    pub(crate) fn reconstruct_macroblock(&mut self, mba: usize) {
        let layout = *self.store.layout();
        let pic = &self.headers.picture;
        let mb = &self.mb;
        let bx = (mba % layout.mb_width) * 16;
        let by = (mba / layout.mb_width) * 16;
        let frame_picture = !pic.picture_structure.is_field();
        let current_field = if frame_picture {
            None
        } else {
            Some(pic.picture_structure.parity())
        };
        let intra = mb.mb_type.contains(MacroblockType::INTRA);
        let hshift = usize::from(layout.chroma_format.is_horizontally_subsampled());
        let vshift = usize::from(layout.chroma_format.is_vertically_subsampled());

        if !intra && !form_predictions(&self.store, &mut self.pred, pic, mb, self.second_field, bx, by) {
            // 没有可用预测 (非法码流), 在当前帧已有内容上叠加
            let current = self.store.frame(self.store.current_index());
            for cc in 0..3 {
                let (w, h) = self.pred.size[cc];
                let (x0, y0) = if cc == 0 { (bx, by) } else { (bx >> hshift, by >> vshift) };
                let view = current.view(cc, current_field);
                for i in 0..h {
                    for j in 0..w {
                        self.pred.planes[cc][i * w + j] = view.sample((x0 + j) as isize, (y0 + i) as isize);
                    }
                }
            }
        }

        for comp in 0..layout.block_count {
            let block = &mut self.blocks[comp];
            let coded = mb.is_coded(comp, layout.block_count);
            if coded {
                self.idct.inverse(block);
            }
            if !coded && !intra {
                continue;
            }
            let (cc, col, row0, step) = block_origin(comp, &layout, frame_picture, mb.dct_field);
            let width = self.pred.size[cc].0;
            let plane = &mut self.pred.planes[cc];
            for (i, residual) in block.chunks_exact(8).enumerate() {
                let row = &mut plane[(row0 + i * step) * width + col..][..8];
                for (d, &r) in row.iter_mut().zip(residual) {
                    let base = if intra { 128 } else { i32::from(*d) };
                    *d = (base + r).clamp(0, 255) as u8;
                }
            }
        }

        let current = self.store.current_mut();
        for cc in 0..3 {
            let (w, h) = self.pred.size[cc];
            let (x0, y0) = if cc == 0 { (bx, by) } else { (bx >> hshift, by >> vshift) };
            let mut view = current.view_mut(cc, current_field);
            for i in 0..h {
                view.row_mut(x0, y0 + i, w).copy_from_slice(&self.pred.planes[cc][i * w..(i + 1) * w]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mpegv_core::ChromaFormat;

    use super::*;

    #[test]
    fn test_block_origin_frame_and_field_dct() {
        let l420 = Layout::new(32, 32, ChromaFormat::Yuv420, false).unwrap();
        assert_eq!(block_origin(3, &l420, true, false), (0, 8, 8, 1));
        assert_eq!(block_origin(2, &l420, true, true), (0, 0, 1, 2));
        // 4:2:0 色度始终按帧 DCT
        assert_eq!(block_origin(5, &l420, true, true), (2, 0, 0, 1));
        // 场图像忽略 dct_type
        assert_eq!(block_origin(1, &l420, false, true), (0, 8, 0, 1));

        let l444 = Layout::new(32, 32, ChromaFormat::Yuv444, true).unwrap();
        assert_eq!(block_origin(10, &l444, true, false), (1, 8, 8, 1));
        assert_eq!(block_origin(11, &l444, true, true), (2, 8, 1, 2));
    }

    #[test]
    fn test_half_pel_prediction() {
        let layout = Layout::new(32, 32, ChromaFormat::Yuv420, false).unwrap();
        let mut frame = FrameBuffer::allocate(layout).unwrap();
        {
            let mut v = frame.view_mut(0, None);
            for y in 0..32 {
                let row = v.row_mut(0, y, 32);
                for (x, p) in row.iter_mut().enumerate() {
                    *p = (x * 4 + y) as u8;
                }
            }
        }
        let mut buf = MbBuffer::new(&layout);
        let p = Prediction {
            src_field: None,
            target: WHOLE,
            h: 16,
            x: 0,
            y: 0,
            dx: 3,
            dy: 0,
            average: false,
        };
        form_prediction(&frame, &layout, &mut buf, p);
        // 水平 1.5 像素: (4 + 8 + 1) / 2 = 6
        assert_eq!(buf.planes[0][0], 6);
        // 第 2 行
        assert_eq!(buf.planes[0][16 * 2], 8);

        // 与自身平均不改变结果
        form_prediction(&frame, &layout, &mut buf, Prediction { average: true, ..p });
        assert_eq!(buf.planes[0][0], 6);
    }

    #[test]
    fn test_field_prediction_rows() {
        let layout = Layout::new(16, 32, ChromaFormat::Yuv420, true).unwrap();
        let mut frame = FrameBuffer::allocate(layout).unwrap();
        frame.view_mut(0, Some(1)).row_mut(0, 0, 16).fill(90);
        let mut buf = MbBuffer::new(&layout);
        let p = Prediction {
            src_field: Some(1),
            target: Target { row0: 0, field: Some(0) },
            h: 8,
            x: 0,
            y: 0,
            dx: 0,
            dy: 0,
            average: false,
        };
        form_prediction(&frame, &layout, &mut buf, p);
        // 底场第 0 行写到局部的第 0 行, 第 1 行 (奇数) 未被写入
        assert_eq!(buf.planes[0][0], 90);
        assert_eq!(buf.planes[0][16], 0);
        assert_eq!(buf.planes[0][32], 16);
    }
}
