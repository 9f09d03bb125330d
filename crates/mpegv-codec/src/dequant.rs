//! 反量化, 饱和与失配控制
//!
//! 四种组合的右移位数: MPEG-1 Intra 3, MPEG-1 非 Intra 4,
//! MPEG-2 Intra 4, MPEG-2 非 Intra 5. 运算都在绝对值上进行, 最后恢复符号.

pub(crate) const COEFF_MIN: i32 = -2048;
pub(crate) const COEFF_MAX: i32 = 2047;

/// 限制到有符号 12 位
#[inline]
pub(crate) fn saturate(v: i32) -> i32 {
    v.clamp(COEFF_MIN, COEFF_MAX)
}

#[inline]
fn with_sign(magnitude: i32, negative: bool) -> i32 {
    saturate(if negative { -magnitude } else { magnitude })
}

/// MPEG-1 失配控制: 非零值强制为奇数
#[inline]
fn oddify(v: i32) -> i32 {
    if v != 0 { (v - 1) | 1 } else { 0 }
}

/// MPEG-1 Intra AC 系数
#[inline]
pub(crate) fn mpeg1_intra(level: i32, quantizer_scale: i32, weight: u8) -> i32 {
    let v = (level.abs() * quantizer_scale * i32::from(weight)) >> 3;
    with_sign(oddify(v), level < 0)
}

/// MPEG-1 非 Intra 系数
#[inline]
pub(crate) fn mpeg1_non_intra(level: i32, quantizer_scale: i32, weight: u8) -> i32 {
    let v = (((level.abs() << 1) + 1) * quantizer_scale * i32::from(weight)) >> 4;
    with_sign(oddify(v), level < 0)
}

/// MPEG-2 Intra AC 系数
#[inline]
pub(crate) fn mpeg2_intra(level: i32, quantizer_scale: i32, weight: u8) -> i32 {
    let v = (level.abs() * quantizer_scale * i32::from(weight)) >> 4;
    with_sign(v, level < 0)
}

/// MPEG-2 非 Intra 系数
#[inline]
pub(crate) fn mpeg2_non_intra(level: i32, quantizer_scale: i32, weight: u8) -> i32 {
    let v = (((level.abs() << 1) + 1) * quantizer_scale * i32::from(weight)) >> 5;
    with_sign(v, level < 0)
}

/// MPEG-2 失配控制: 系数和为偶数时翻转 F[7][7] 的最低位
pub(crate) fn mpeg2_mismatch_control(block: &mut [i32; 64]) {
    let sum: i32 = block.iter().sum();
    if sum & 1 == 0 {
        block[63] ^= 1;
    }
}
