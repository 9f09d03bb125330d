//! 8x8 逆 DCT.
//!
//! 解码引擎只依赖 [`InverseTransform`]: 输入反量化后的系数块 (光栅顺序),
//! 原地输出空间域残差, 结果限制在 [-256, 255].
//!
//! - [`SimpleIdct`]: 整数行列分离实现, W 常量按 2^14 缩放, 满足 IEEE 1180 精度
//! - [`ReferenceIdct`]: 双精度浮点直接实现, 用于一致性比对

use std::f64::consts::PI;
use std::sync::OnceLock;

/// 逆变换接口
pub trait InverseTransform: Send + Sync {
    /// 原地变换一个系数块
    fn inverse(&self, block: &mut [i32; 64]);

    /// 名称 (用于日志)
    fn name(&self) -> &'static str;
}

#[inline]
fn clamp_residual(v: i64) -> i32 {
    v.clamp(-256, 255) as i32
}

// ============================================================================
// 整数 IDCT
// ============================================================================

/// W 常量: cos(i*π/16) * √2 * 2^14
const W1: i64 = 22725;
const W2: i64 = 21407;
const W3: i64 = 19266;
const W4: i64 = 16383;
const W5: i64 = 12873;
const W6: i64 = 8867;
const W7: i64 = 4520;

const ROW_SHIFT: u32 = 11;
const COL_SHIFT: u32 = 20;

/// 一维 8 点蝶形, 返回未移位的 8 个输出
#[inline]
fn butterfly(x: [i64; 8], round: i64) -> [i64; 8] {
    let base = W4 * x[0] + round;
    let a0 = base + W2 * x[2] + W4 * x[4] + W6 * x[6];
    let a1 = base + W6 * x[2] - W4 * x[4] - W2 * x[6];
    let a2 = base - W6 * x[2] - W4 * x[4] + W2 * x[6];
    let a3 = base - W2 * x[2] + W4 * x[4] - W6 * x[6];

    let b0 = W1 * x[1] + W3 * x[3] + W5 * x[5] + W7 * x[7];
    let b1 = W3 * x[1] - W7 * x[3] - W1 * x[5] - W5 * x[7];
    let b2 = W5 * x[1] - W1 * x[3] + W7 * x[5] + W3 * x[7];
    let b3 = W7 * x[1] - W5 * x[3] + W3 * x[5] - W1 * x[7];

    [a0 + b0, a1 + b1, a2 + b2, a3 + b3, a3 - b3, a2 - b2, a1 - b1, a0 - b0]
}

/// 整数 IDCT
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleIdct;

impl SimpleIdct {
    fn rows(block: &mut [i32; 64]) {
        for row in block.chunks_exact_mut(8) {
            // 只有 DC 的行直接展开
            if row[1..].iter().all(|&v| v == 0) {
                let dc = row[0] << 3;
                row.fill(dc);
                continue;
            }
            let x: [i64; 8] = std::array::from_fn(|i| i64::from(row[i]));
            let out = butterfly(x, 1 << (ROW_SHIFT - 1));
            for (dst, v) in row.iter_mut().zip(out) {
                *dst = (v >> ROW_SHIFT) as i32;
            }
        }
    }

    fn cols(block: &mut [i32; 64]) {
        for col in 0..8 {
            let x: [i64; 8] = std::array::from_fn(|i| i64::from(block[col + i * 8]));
            let out = butterfly(x, 1 << (COL_SHIFT - 1));
            for (i, v) in out.into_iter().enumerate() {
                block[col + i * 8] = clamp_residual(v >> COL_SHIFT);
            }
        }
    }
}

impl InverseTransform for SimpleIdct {
    fn inverse(&self, block: &mut [i32; 64]) {
        Self::rows(block);
        Self::cols(block);
    }

    fn name(&self) -> &'static str {
        "simple"
    }
}

// ============================================================================
// 浮点参考 IDCT
// ============================================================================

/// 双精度参考 IDCT
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceIdct;

/// c[u][x] = C(u)/2 * cos((2x+1)uπ/16)
fn basis() -> &'static [[f64; 8]; 8] {
    static BASIS: OnceLock<[[f64; 8]; 8]> = OnceLock::new();
    BASIS.get_or_init(|| {
        let mut c = [[0.0; 8]; 8];
        for (u, row) in c.iter_mut().enumerate() {
            let scale = if u == 0 { 0.5 * std::f64::consts::FRAC_1_SQRT_2 } else { 0.5 };
            for (x, v) in row.iter_mut().enumerate() {
                *v = scale * ((2 * x + 1) as f64 * u as f64 * PI / 16.0).cos();
            }
        }
        c
    })
}

impl InverseTransform for ReferenceIdct {
    fn inverse(&self, block: &mut [i32; 64]) {
        let c = basis();
        let mut tmp = [0.0f64; 64];
        // 行方向: tmp[v][x] = Σu c[u][x] * F[v][u]
        for v in 0..8 {
            for x in 0..8 {
                tmp[v * 8 + x] = (0..8).map(|u| c[u][x] * f64::from(block[v * 8 + u])).sum();
            }
        }
        // 列方向
        for y in 0..8 {
            for x in 0..8 {
                let s: f64 = (0..8).map(|v| c[v][y] * tmp[v * 8 + x]).sum();
                block[y * 8 + x] = clamp_residual(s.round() as i64);
            }
        }
    }

    fn name(&self) -> &'static str {
        "reference"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 确定性的伪随机系数块
    fn pseudo_block(seed: &mut u32, range: i32) -> [i32; 64] {
        let mut b = [0i32; 64];
        for (i, v) in b.iter_mut().enumerate() {
            *seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            // 高频系数较小, 接近真实码流的分布
            let r = ((*seed >> 16) % (2 * range as u32 + 1)) as i32 - range;
            let (row, col) = (i / 8, i % 8);
            *v = r / (1 + (row + col) as i32);
        }
        b
    }

    #[test]
    fn test_dc_only_block_is_flat() {
        for idct in [&SimpleIdct as &dyn InverseTransform, &ReferenceIdct] {
            let mut b = [0i32; 64];
            b[0] = 80;
            idct.inverse(&mut b);
            assert!(b.iter().all(|&v| v == 10), "{} DC 块应平坦: {:?}", idct.name(), b);
        }
    }

    #[test]
    fn test_zero_block() {
        let mut b = [0i32; 64];
        SimpleIdct.inverse(&mut b);
        assert_eq!(b, [0; 64]);
    }

    #[test]
    fn test_output_clamped() {
        for idct in [&SimpleIdct as &dyn InverseTransform, &ReferenceIdct] {
            let mut b = [0i32; 64];
            b[0] = 2047;
            idct.inverse(&mut b);
            assert!(b.iter().all(|&v| v == 255), "{} 正向饱和", idct.name());
            let mut b = [0i32; 64];
            b[0] = -2048;
            idct.inverse(&mut b);
            assert!(b.iter().all(|&v| v == -256), "{} 负向饱和", idct.name());
        }
    }

    #[test]
    fn test_simple_matches_reference() {
        let mut seed = 7u32;
        for _ in 0..200 {
            let src = pseudo_block(&mut seed, 256);
            let mut a = src;
            let mut b = src;
            SimpleIdct.inverse(&mut a);
            ReferenceIdct.inverse(&mut b);
            for i in 0..64 {
                assert!(
                    (a[i] - b[i]).abs() <= 1,
                    "位置 {} 误差过大: simple={} reference={}",
                    i,
                    a[i],
                    b[i]
                );
            }
        }
    }

    #[test]
    fn test_single_ac_basis() {
        // 仅 F[0][1]: 每行相同, 左右反对称
        let mut b = [0i32; 64];
        b[1] = 100;
        ReferenceIdct.inverse(&mut b);
        for row in b.chunks_exact(8) {
            assert_eq!(row, &b[..8]);
            for x in 0..4 {
                assert_eq!(row[x], -row[7 - x]);
            }
        }
        assert!(b[0] > 0);
    }
}
