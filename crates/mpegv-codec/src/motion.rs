//! 运动矢量解码与预测
//!
//! 预测器数组 `pmv[r][s][t]`: r 为第几个矢量 (场预测时 0/1), s 为方向
//! (0 前向, 1 后向), t 为分量 (0 水平, 1 垂直). 单位为半像素.

use mpegv_core::ByteSource;

use crate::bitstream::BitCursor;
use crate::fault::FaultResult;
use crate::types::PictureStructure;
use crate::vlc::{decode_dmvector, decode_motion_code};

/// 运动矢量预测器
pub(crate) type MotionPredictors = [[[i32; 2]; 2]; 2];

/// 单个方向的矢量语法参数
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct VectorFormat {
    /// 水平 r_size (f_code - 1)
    pub h_r_size: u32,
    /// 垂直 r_size
    pub v_r_size: u32,
    /// 双基预测, 每个分量后带 dmvector
    pub dual_prime: bool,
    /// 帧图像中的场矢量: 垂直预测器先减半再加倍
    pub mv_scale: bool,
    /// MPEG-1 整像素矢量
    pub full_pel: bool,
}

impl VectorFormat {
    /// 由 f_code 推出 r_size, 非法的 0 按 1 处理
    pub(crate) fn r_size(f_code: u32) -> u32 {
        f_code.saturating_sub(1).min(14)
    }
}

/// 把 motion_code 与残差合并到预测值, 在 ±(16 << r_size) 处回绕
pub(crate) fn decode_motion_vector(pred: &mut i32, r_size: u32, motion_code: i32, residual: i32, full_pel: bool) {
    let lim = 16 << r_size;
    let mut vec = if full_pel { *pred >> 1 } else { *pred };
    if motion_code > 0 {
        vec += ((motion_code - 1) << r_size) + residual + 1;
        if vec >= lim {
            vec -= lim + lim;
        }
    } else if motion_code < 0 {
        vec -= ((-motion_code - 1) << r_size) + residual + 1;
        if vec < -lim {
            vec += lim + lim;
        }
    }
    *pred = if full_pel { vec << 1 } else { vec };
}

fn component<S: ByteSource>(c: &mut BitCursor<S>, r_size: u32) -> FaultResult<(i32, i32)> {
    let code = decode_motion_code(c)?;
    let residual = if r_size != 0 && code != 0 {
        c.get_bits(r_size) as i32
    } else {
        0
    };
    Ok((code, residual))
}

/// 解码一个 (水平, 垂直) 矢量并更新预测器
pub(crate) fn motion_vector<S: ByteSource>(
    c: &mut BitCursor<S>,
    pred: &mut [i32; 2],
    dmvector: &mut [i32; 2],
    fmt: &VectorFormat,
) -> FaultResult<()> {
    let (code, residual) = component(c, fmt.h_r_size)?;
    decode_motion_vector(&mut pred[0], fmt.h_r_size, code, residual, fmt.full_pel);
    if fmt.dual_prime {
        dmvector[0] = decode_dmvector(c);
    }

    let (code, residual) = component(c, fmt.v_r_size)?;
    if fmt.mv_scale {
        pred[1] >>= 1;
    }
    decode_motion_vector(&mut pred[1], fmt.v_r_size, code, residual, fmt.full_pel);
    if fmt.mv_scale {
        pred[1] <<= 1;
    }
    if fmt.dual_prime {
        dmvector[1] = decode_dmvector(c);
    }
    Ok(())
}

/// 解码方向 `s` 的 1 或 2 个矢量 (MPEG-2)
///
/// 只有一个矢量时, 场预测且非双基时先读 field_select, 两个预测器同步更新.
#[allow(clippy::too_many_arguments)]
pub(crate) fn motion_vectors<S: ByteSource>(
    c: &mut BitCursor<S>,
    pmv: &mut MotionPredictors,
    dmvector: &mut [i32; 2],
    field_select: &mut [[bool; 2]; 2],
    s: usize,
    count: usize,
    field_format: bool,
    fmt: &VectorFormat,
) -> FaultResult<()> {
    if count == 1 {
        if field_format && !fmt.dual_prime {
            let sel = c.get_bit();
            field_select[0][s] = sel;
            field_select[1][s] = sel;
        }
        motion_vector(c, &mut pmv[0][s], dmvector, fmt)?;
        pmv[1][s] = pmv[0][s];
    } else {
        field_select[0][s] = c.get_bit();
        motion_vector(c, &mut pmv[0][s], dmvector, fmt)?;
        field_select[1][s] = c.get_bit();
        motion_vector(c, &mut pmv[1][s], dmvector, fmt)?;
    }
    Ok(())
}

/// 双基预测的派生矢量
///
/// 帧图像返回两个矢量: `[0]` 由底场预测顶场, `[1]` 由顶场预测底场;
/// 场图像只使用 `[0]`, 指向相反奇偶的场. `mvy` 为场单位的垂直分量.
pub(crate) fn dual_prime_arithmetic(
    structure: PictureStructure,
    top_field_first: bool,
    dmvector: [i32; 2],
    mvx: i32,
    mvy: i32,
) -> [[i32; 2]; 2] {
    match structure {
        PictureStructure::Frame => {
            let (near, far): (fn(i32) -> i32, fn(i32) -> i32) = if top_field_first {
                (half, three_half)
            } else {
                (three_half, half)
            };
            [
                [near(mvx) + dmvector[0], near(mvy) + dmvector[1] - 1],
                [far(mvx) + dmvector[0], far(mvy) + dmvector[1] + 1],
            ]
        }
        PictureStructure::TopField => [[half(mvx) + dmvector[0], half(mvy) + dmvector[1] - 1], [0, 0]],
        PictureStructure::BottomField => [[half(mvx) + dmvector[0], half(mvy) + dmvector[1] + 1], [0, 0]],
    }
}

/// 按场间距 1/2 缩放, 正数向上取整
fn half(v: i32) -> i32 {
    (v + i32::from(v > 0)) >> 1
}

/// 按场间距 3/2 缩放
fn three_half(v: i32) -> i32 {
    (3 * v + i32::from(v > 0)) >> 1
}

#[cfg(test)]
mod tests {
    use mpegv_core::{BitWriter, MemorySource};

    use super::*;

    #[test]
    fn test_wrap_around() {
        // r_size 0: 范围 [-16, 15]
        let mut p = 15;
        decode_motion_vector(&mut p, 0, 1, 0, false);
        assert_eq!(p, -16);
        let mut p = -16;
        decode_motion_vector(&mut p, 0, -1, 0, false);
        assert_eq!(p, 15);
        // r_size 2: (3-1)<<2 + 1 + 1 = 10
        let mut p = 4;
        decode_motion_vector(&mut p, 2, 3, 1, false);
        assert_eq!(p, 14);
        // motion_code 0 不改变预测值
        let mut p = 7;
        decode_motion_vector(&mut p, 3, 0, 0, false);
        assert_eq!(p, 7);
    }

    #[test]
    fn test_full_pel() {
        let mut p = 4; // 整像素 2
        decode_motion_vector(&mut p, 0, 3, 0, true);
        assert_eq!(p, 10);
    }

    #[test]
    fn test_motion_vector_with_scale() {
        // 水平 motion_code +2 ('0010' + 符号 0), 垂直 motion_code -1 ('011')
        let mut bw = BitWriter::new();
        bw.write_bits(0b0010, 4);
        bw.write_bits(0b011, 3);
        let mut c = BitCursor::new(MemorySource::new(bw.finish()));
        let mut pred = [0, 8];
        let mut dmv = [0; 2];
        let fmt = VectorFormat {
            mv_scale: true,
            ..VectorFormat::default()
        };
        motion_vector(&mut c, &mut pred, &mut dmv, &fmt).unwrap();
        assert_eq!(pred[0], 2);
        // 8 >> 1 = 4, 减 1 得 3, 再加倍
        assert_eq!(pred[1], 6);
    }

    #[test]
    fn test_single_field_vector_updates_both_predictors() {
        let mut bw = BitWriter::new();
        bw.write_bit(true); // field_select
        bw.write_bit(true); // 水平 motion_code 0
        bw.write_bit(true); // 垂直 motion_code 0
        let mut c = BitCursor::new(MemorySource::new(bw.finish()));
        let mut pmv = [[[3, 5], [0, 0]], [[9, 9], [0, 0]]];
        let mut fs = [[false; 2]; 2];
        let mut dmv = [0; 2];
        motion_vectors(&mut c, &mut pmv, &mut dmv, &mut fs, 0, 1, true, &VectorFormat::default()).unwrap();
        assert!(fs[0][0] && fs[1][0]);
        assert_eq!(pmv[1][0], [3, 5]);
    }

    #[test]
    fn test_dual_prime_frame() {
        let v = dual_prime_arithmetic(PictureStructure::Frame, true, [1, -1], 4, 3);
        // half(4)=2, half(3)=2, three_half(4)=6, three_half(3)=5
        assert_eq!(v[0], [3, 0]);
        assert_eq!(v[1], [7, 5]);
        let v = dual_prime_arithmetic(PictureStructure::Frame, false, [0, 0], -4, -3);
        // three_half(-4)=-6, three_half(-3)=-5 (算术右移), half(-4)=-2, half(-3)=-2
        assert_eq!(v[0], [-6, -6]);
        assert_eq!(v[1], [-2, -1]);
    }

    #[test]
    fn test_dual_prime_field() {
        let v = dual_prime_arithmetic(PictureStructure::TopField, false, [0, 1], 5, 2);
        assert_eq!(v[0], [3, 1]);
        let v = dual_prime_arithmetic(PictureStructure::BottomField, false, [0, 0], 5, 2);
        assert_eq!(v[0], [3, 2]);
    }
}
