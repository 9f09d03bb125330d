//! 色度上采样 FIR 滤波器.
//!
//! 两级 1:2 插值: 水平 4:2:2 -> 4:4:4, 垂直 4:2:0 -> 4:2:2.
//! 边界处抽头夹到最近的有效样本. 系数均以 256 为单位, 结果四舍五入后截断到 0..=255.

#[inline]
fn clip(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// 水平 1:2 上采样, `src` 为 `width x height`, `dst` 为 `2*width x height`
///
/// MPEG-2 色度样本与偶数亮度样本共点, 偶数输出直接复制;
/// MPEG-1 色度位于两个亮度样本中间, 两个输出都需要插值.
pub fn upsample_horizontal(src: &[u8], dst: &mut [u8], width: usize, height: usize, mpeg1: bool) {
    if width == 0 {
        return;
    }
    let last = width as isize - 1;
    for (src_row, dst_row) in src
        .chunks_exact(width)
        .zip(dst.chunks_exact_mut(width * 2))
        .take(height)
    {
        let at = |i: isize| i32::from(src_row[i.clamp(0, last) as usize]);
        for i in 0..width {
            let c = i as isize;
            if mpeg1 {
                dst_row[2 * i] = clip(
                    (5 * at(c - 3) - 21 * at(c - 2) + 70 * at(c - 1) + 228 * at(c) - 37 * at(c + 1)
                        + 11 * at(c + 2)
                        + 128)
                        >> 8,
                );
                dst_row[2 * i + 1] = clip(
                    (5 * at(c + 3) - 21 * at(c + 2) + 70 * at(c + 1) + 228 * at(c) - 37 * at(c - 1)
                        + 11 * at(c - 2)
                        + 128)
                        >> 8,
                );
            } else {
                dst_row[2 * i] = src_row[i];
                dst_row[2 * i + 1] = clip(
                    (21 * (at(c - 2) + at(c + 3)) - 52 * (at(c - 1) + at(c + 2))
                        + 159 * (at(c) + at(c + 1))
                        + 128)
                        >> 8,
                );
            }
        }
    }
}

/// 垂直 1:2 上采样, `src` 为 `width x height`, `dst` 为 `width x 2*height`
///
/// 逐行帧使用单一多相滤波器. 隔行帧按场分别插值:
/// 偶数行属于顶场, 奇数行属于底场, 抽头步长为 2.
pub fn upsample_vertical(src: &[u8], dst: &mut [u8], width: usize, height: usize, progressive: bool) {
    if width == 0 || height == 0 {
        return;
    }
    if progressive || height < 2 || height % 2 != 0 {
        upsample_vertical_frame(src, dst, width, height);
    } else {
        upsample_vertical_field(src, dst, width, height);
    }
}

fn upsample_vertical_frame(src: &[u8], dst: &mut [u8], w: usize, h: usize) {
    let last = h as isize - 1;
    for i in 0..w {
        let at = |j: isize| i32::from(src[j.clamp(0, last) as usize * w + i]);
        for j in 0..h {
            let r = j as isize;
            dst[(2 * j) * w + i] = clip(
                (3 * at(r - 3) - 16 * at(r - 2) + 67 * at(r - 1) + 227 * at(r) - 32 * at(r + 1)
                    + 7 * at(r + 2)
                    + 128)
                    >> 8,
            );
            dst[(2 * j + 1) * w + i] = clip(
                (3 * at(r + 3) - 16 * at(r + 2) + 67 * at(r + 1) + 227 * at(r) - 32 * at(r - 1)
                    + 7 * at(r - 2)
                    + 128)
                    >> 8,
            );
        }
    }
}

fn upsample_vertical_field(src: &[u8], dst: &mut [u8], w: usize, h: usize) {
    let h = h as isize;
    for i in 0..w {
        // 顶场行夹在 [0, h-2], 底场行夹在 [1, h-1]
        let top = |j: isize| i32::from(src[j.clamp(0, h - 2) as usize * w + i]);
        let bot = |j: isize| i32::from(src[j.clamp(1, h - 1) as usize * w + i]);
        let mut j = 0;
        while j < h {
            let out = 2 * j as usize;
            dst[out * w + i] = clip(
                (top(j - 6) - 7 * top(j - 4) + 30 * top(j - 2) + 248 * top(j) - 21 * top(j + 2)
                    + 5 * top(j + 4)
                    + 128)
                    >> 8,
            );
            dst[(out + 2) * w + i] = clip(
                (7 * top(j - 4) - 35 * top(j - 2) + 194 * top(j) + 110 * top(j + 2)
                    - 24 * top(j + 4)
                    + 4 * top(j + 6)
                    + 128)
                    >> 8,
            );
            dst[(out + 1) * w + i] = clip(
                (4 * bot(j - 5) - 24 * bot(j - 3) + 110 * bot(j - 1) + 194 * bot(j + 1)
                    - 35 * bot(j + 3)
                    + 7 * bot(j + 5)
                    + 128)
                    >> 8,
            );
            dst[(out + 3) * w + i] = clip(
                (5 * bot(j - 3) - 21 * bot(j - 1) + 248 * bot(j + 1) + 30 * bot(j + 3)
                    - 7 * bot(j + 5)
                    + bot(j + 7)
                    + 128)
                    >> 8,
            );
            j += 2;
        }
    }
}
