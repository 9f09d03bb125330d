//! 8x8 块的 DC/AC 系数解码
//!
//! 按 (MPEG-1, MPEG-2) x (Intra, 非 Intra) 分为四个入口. 系数按扫描表放入
//! 光栅位置, 同时完成反量化与饱和. 调用方负责清零 `block`.

use mpegv_core::ByteSource;

use crate::bitstream::BitCursor;
use crate::dequant;
use crate::fault::{BitstreamFault, FaultResult};
use crate::vlc::{
    DctTable, RUN_EOB, RUN_ESCAPE, dct_table_first, dct_table_intra_alt, dct_table_next, decode_dc_size,
};

/// 单个块的量化参数
#[derive(Clone, Copy)]
pub(crate) struct BlockQuant<'a> {
    /// 当前 quantiser_scale (MPEG-2 已按 q_scale_type 映射)
    pub scale: i32,
    /// 量化矩阵 (光栅顺序)
    pub matrix: &'a [u8; 64],
    /// 扫描表
    pub scan: &'static [usize; 64],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Mpeg1,
    Mpeg2,
}

/// 解码 DC 差分: dct_dc_size 加 size 位原始值
pub(crate) fn decode_dc_differential<S: ByteSource>(c: &mut BitCursor<S>, luma: bool) -> FaultResult<i32> {
    let size = decode_dc_size(c, luma)?;
    if size == 0 {
        return Ok(0);
    }
    let bits = c.get_bits(size) as i32;
    if bits & (1 << (size - 1)) == 0 {
        Ok(bits - ((1 << size) - 1))
    } else {
        Ok(bits)
    }
}

/// 读取转义码后的 run 与带符号 level
fn read_escape<S: ByteSource>(c: &mut BitCursor<S>, syntax: Syntax) -> FaultResult<(usize, i32)> {
    let run = c.get_bits(6) as usize;
    let level = match syntax {
        Syntax::Mpeg1 => {
            let first = c.get_bits(8);
            match first {
                0 => {
                    let second = c.get_bits(8);
                    if second < 128 {
                        return Err(BitstreamFault::InvalidEscape(second));
                    }
                    second as i32
                }
                128 => {
                    let second = c.get_bits(8);
                    if second == 0 || second > 128 {
                        return Err(BitstreamFault::InvalidEscape(0x8000 | second));
                    }
                    second as i32 - 256
                }
                v if v > 128 => v as i32 - 256,
                v => v as i32,
            }
        }
        Syntax::Mpeg2 => {
            let v = c.get_bits(12);
            if v & 0x7FF == 0 {
                return Err(BitstreamFault::InvalidEscape(v));
            }
            if v >= 2048 { v as i32 - 4096 } else { v as i32 }
        }
    };
    Ok((run, level))
}

/// 读取下一个 (run, level), 块结束返回 `None`
fn next_coefficient<S: ByteSource>(
    c: &mut BitCursor<S>,
    table: &DctTable,
    syntax: Syntax,
) -> FaultResult<Option<(usize, i32)>> {
    let entry = table.decode(c)?;
    match entry.run {
        RUN_EOB => Ok(None),
        RUN_ESCAPE => read_escape(c, syntax).map(Some),
        run => {
            let level = i32::from(entry.level);
            let level = if c.get_bit() { -level } else { level };
            Ok(Some((usize::from(run), level)))
        }
    }
}

/// AC 系数循环, `start` 为第一个可用的扫描序号
#[allow(clippy::too_many_arguments)]
fn decode_coefficients<S: ByteSource>(
    c: &mut BitCursor<S>,
    block: &mut [i32; 64],
    q: &BlockQuant<'_>,
    syntax: Syntax,
    start: usize,
    mut table: &'static DctTable,
    next_table: &'static DctTable,
    dequantize: fn(i32, i32, u8) -> i32,
) -> FaultResult<()> {
    let mut next = start;
    while let Some((run, level)) = next_coefficient(c, table, syntax)? {
        let i = next + run;
        if i >= 64 {
            return Err(BitstreamFault::CoefficientOverflow);
        }
        let pos = q.scan[i];
        block[pos] = dequantize(level, q.scale, q.matrix[pos]);
        next = i + 1;
        table = next_table;
    }
    Ok(())
}

/// MPEG-1 Intra 块; D 图像只有 DC 系数
pub(crate) fn mpeg1_intra_block<S: ByteSource>(
    c: &mut BitCursor<S>,
    block: &mut [i32; 64],
    dc_pred: &mut i32,
    luma: bool,
    q: &BlockQuant<'_>,
    dc_only: bool,
) -> FaultResult<()> {
    *dc_pred += decode_dc_differential(c, luma)?;
    block[0] = dequant::saturate(*dc_pred << 3);
    if dc_only {
        return Ok(());
    }
    let table = dct_table_next();
    decode_coefficients(c, block, q, Syntax::Mpeg1, 1, table, table, dequant::mpeg1_intra)
}

/// MPEG-1 非 Intra 块
pub(crate) fn mpeg1_non_intra_block<S: ByteSource>(
    c: &mut BitCursor<S>,
    block: &mut [i32; 64],
    q: &BlockQuant<'_>,
) -> FaultResult<()> {
    decode_coefficients(
        c,
        block,
        q,
        Syntax::Mpeg1,
        0,
        dct_table_first(),
        dct_table_next(),
        dequant::mpeg1_non_intra,
    )
}

/// MPEG-2 Intra 块
pub(crate) fn mpeg2_intra_block<S: ByteSource>(
    c: &mut BitCursor<S>,
    block: &mut [i32; 64],
    dc_pred: &mut i32,
    luma: bool,
    q: &BlockQuant<'_>,
    intra_dc_precision: u32,
    intra_vlc_format: bool,
) -> FaultResult<()> {
    *dc_pred += decode_dc_differential(c, luma)?;
    block[0] = dequant::saturate(*dc_pred << (3 - intra_dc_precision.min(3)));
    let table = if intra_vlc_format {
        dct_table_intra_alt()
    } else {
        dct_table_next()
    };
    decode_coefficients(c, block, q, Syntax::Mpeg2, 1, table, table, dequant::mpeg2_intra)?;
    dequant::mpeg2_mismatch_control(block);
    Ok(())
}

/// MPEG-2 非 Intra 块
pub(crate) fn mpeg2_non_intra_block<S: ByteSource>(
    c: &mut BitCursor<S>,
    block: &mut [i32; 64],
    q: &BlockQuant<'_>,
) -> FaultResult<()> {
    decode_coefficients(
        c,
        block,
        q,
        Syntax::Mpeg2,
        0,
        dct_table_first(),
        dct_table_next(),
        dequant::mpeg2_non_intra,
    )?;
    dequant::mpeg2_mismatch_control(block);
    Ok(())
}

#[cfg(test)]
mod tests {
    use mpegv_core::{BitWriter, MemorySource};

    use super::*;
    use crate::tables::{ALTERNATE_SCAN, ZIGZAG_SCAN};
    use crate::vlc::{DC_SIZE_CHROMA_CODES, DC_SIZE_LUMA_CODES, DCT_B14_CODES, DCT_B15_CODES};

    const FLAT16: [u8; 64] = [16; 64];

    fn cursor_from(bw: BitWriter) -> BitCursor<MemorySource> {
        BitCursor::new(MemorySource::new(bw.finish()))
    }

    fn quant(scale: i32, scan: &'static [usize; 64]) -> BlockQuant<'static> {
        BlockQuant {
            scale,
            matrix: &FLAT16,
            scan,
        }
    }

    fn write_dc(bw: &mut BitWriter, luma: bool, diff: i32) {
        let size = 32 - diff.unsigned_abs().leading_zeros();
        let codes = if luma { DC_SIZE_LUMA_CODES } else { DC_SIZE_CHROMA_CODES };
        let &(len, code, _) = codes.iter().find(|e| u32::from(e.2) == size).unwrap();
        bw.write_bits(u32::from(code), u32::from(len));
        if size > 0 {
            let raw = if diff > 0 { diff } else { diff + (1 << size) - 1 };
            bw.write_bits(raw as u32, size);
        }
    }

    /// 按 B-14/B-15 写一个 (run, level); 不在码表中时写 MPEG-2 转义
    fn write_coef(bw: &mut BitWriter, codes: &[(u8, u16, u8, u8)], run: u8, level: i32) {
        if let Some(&(len, code, _, _)) = codes.iter().find(|e| e.2 == run && i32::from(e.3) == level.abs()) {
            bw.write_bits(u32::from(code), u32::from(len));
            bw.write_bit(level < 0);
        } else {
            bw.write_bits(0b000001, 6);
            bw.write_bits(u32::from(run), 6);
            bw.write_bits((level & 0xFFF) as u32, 12);
        }
    }

    #[test]
    fn test_dc_differential_signs() {
        let mut bw = BitWriter::new();
        for d in [0, 5, -2, 255, -255] {
            write_dc(&mut bw, true, d);
        }
        write_dc(&mut bw, false, -1);
        let mut c = cursor_from(bw);
        for d in [0, 5, -2, 255, -255] {
            assert_eq!(decode_dc_differential(&mut c, true).unwrap(), d);
        }
        assert_eq!(decode_dc_differential(&mut c, false).unwrap(), -1);
    }

    #[test]
    fn test_mpeg1_intra_block() {
        let mut bw = BitWriter::new();
        write_dc(&mut bw, true, 5);
        // run 0 level 2 (0100 s), run 1 level -1 (011 s), EOB
        bw.write_bits(0b0100, 4);
        bw.write_bit(false);
        bw.write_bits(0b011, 3);
        bw.write_bit(true);
        bw.write_bits(0b10, 2);
        let mut c = cursor_from(bw);
        let mut block = [0i32; 64];
        let mut pred = 10;
        mpeg1_intra_block(&mut c, &mut block, &mut pred, true, &quant(8, &ZIGZAG_SCAN), false).unwrap();
        assert_eq!(pred, 15);
        assert_eq!(block[0], 120);
        // 2*8*16 >> 3 = 32 -> 31
        assert_eq!(block[ZIGZAG_SCAN[1]], 31);
        // 扫描序号 3, 1*8*16 >> 3 = 16 -> 15
        assert_eq!(block[ZIGZAG_SCAN[3]], -15);
        assert_eq!(block.iter().filter(|&&v| v != 0).count(), 3);
    }

    #[test]
    fn test_mpeg1_dc_only() {
        let mut bw = BitWriter::new();
        write_dc(&mut bw, false, -3);
        bw.write_bits(0b0100, 4);
        let mut c = cursor_from(bw);
        let mut block = [0i32; 64];
        let mut pred = 0;
        mpeg1_intra_block(&mut c, &mut block, &mut pred, false, &quant(8, &ZIGZAG_SCAN), true).unwrap();
        assert_eq!(block[0], -24);
        // 后续位未被消耗
        assert_eq!(c.show_bits(4), 0b0100);
    }

    #[test]
    fn test_mpeg1_non_intra_first_coefficient() {
        let mut bw = BitWriter::new();
        bw.write_bit(true); // '1s' -> run 0 level 1
        bw.write_bit(false);
        bw.write_bits(0b10, 2); // EOB
        let mut c = cursor_from(bw);
        let mut block = [0i32; 64];
        mpeg1_non_intra_block(&mut c, &mut block, &quant(2, &ZIGZAG_SCAN)).unwrap();
        // (2+1)*2*16 >> 4 = 6 -> 5
        assert_eq!(block[0], 5);
    }

    #[test]
    fn test_mpeg1_escape_forms() {
        let mut bw = BitWriter::new();
        bw.write_bit(true);
        bw.write_bit(false);
        // 转义: run 2, 8 位 level -5
        bw.write_bits(0b000001, 6);
        bw.write_bits(2, 6);
        bw.write_bits(0xFB, 8);
        // 转义: run 0, 16 位 level 200
        bw.write_bits(0b000001, 6);
        bw.write_bits(0, 6);
        bw.write_bits(0, 8);
        bw.write_bits(200, 8);
        // 转义: run 0, 16 位 level -200
        bw.write_bits(0b000001, 6);
        bw.write_bits(0, 6);
        bw.write_bits(128, 8);
        bw.write_bits(56, 8);
        bw.write_bits(0b10, 2);
        let mut c = cursor_from(bw);
        let mut block = [0i32; 64];
        mpeg1_non_intra_block(&mut c, &mut block, &quant(1, &ZIGZAG_SCAN)).unwrap();
        assert_eq!(block[ZIGZAG_SCAN[3]], dequant::mpeg1_non_intra(-5, 1, 16));
        assert_eq!(block[ZIGZAG_SCAN[4]], dequant::mpeg1_non_intra(200, 1, 16));
        assert_eq!(block[ZIGZAG_SCAN[5]], dequant::mpeg1_non_intra(-200, 1, 16));
    }

    #[test]
    fn test_mpeg1_invalid_escape() {
        let mut bw = BitWriter::new();
        bw.write_bits(0b000001, 6);
        bw.write_bits(0, 6);
        bw.write_bits(0, 8);
        bw.write_bits(5, 8);
        let mut c = cursor_from(bw);
        let mut block = [0i32; 64];
        let err = mpeg1_non_intra_block(&mut c, &mut block, &quant(1, &ZIGZAG_SCAN)).unwrap_err();
        assert_eq!(err, BitstreamFault::InvalidEscape(5));
    }

    #[test]
    fn test_mpeg2_intra_alternate_scan_and_b15() {
        let mut bw = BitWriter::new();
        write_dc(&mut bw, true, 100);
        write_coef(&mut bw, DCT_B15_CODES, 0, 3);
        write_coef(&mut bw, DCT_B15_CODES, 4, -1);
        write_coef(&mut bw, DCT_B15_CODES, 0, 300);
        bw.write_bits(0b0110, 4); // B-15 EOB
        let mut c = cursor_from(bw);
        let mut block = [0i32; 64];
        let mut pred = 0;
        mpeg2_intra_block(&mut c, &mut block, &mut pred, true, &quant(4, &ALTERNATE_SCAN), 1, true).unwrap();
        assert_eq!(block[0], 400);
        assert_eq!(block[ALTERNATE_SCAN[1]], 12);
        assert_eq!(block[ALTERNATE_SCAN[6]], -4);
        assert_eq!(block[ALTERNATE_SCAN[7]], 1200);
        let sum: i32 = block.iter().sum();
        assert_eq!(sum & 1, 1, "失配控制后系数和应为奇数");
    }

    #[test]
    fn test_mpeg2_non_intra_escape() {
        let mut bw = BitWriter::new();
        write_coef(&mut bw, DCT_B14_CODES, 10, -300);
        bw.write_bits(0b10, 2);
        let mut c = cursor_from(bw);
        let mut block = [0i32; 64];
        mpeg2_non_intra_block(&mut c, &mut block, &quant(2, &ZIGZAG_SCAN)).unwrap();
        // (601*2*16) >> 5 = 601, 和为奇数不需调整
        assert_eq!(block[ZIGZAG_SCAN[10]], -601);
        assert_eq!(block[63], 0);
    }

    #[test]
    fn test_mpeg2_forbidden_escape_level() {
        let mut bw = BitWriter::new();
        bw.write_bits(0b000001, 6);
        bw.write_bits(0, 6);
        bw.write_bits(0x800, 12);
        let mut c = cursor_from(bw);
        let mut block = [0i32; 64];
        let err = mpeg2_non_intra_block(&mut c, &mut block, &quant(2, &ZIGZAG_SCAN)).unwrap_err();
        assert_eq!(err, BitstreamFault::InvalidEscape(0x800));
    }

    #[test]
    fn test_coefficient_overflow() {
        let mut bw = BitWriter::new();
        write_coef(&mut bw, DCT_B14_CODES, 40, 1);
        write_coef(&mut bw, DCT_B14_CODES, 30, 1);
        let mut c = cursor_from(bw);
        let mut block = [0i32; 64];
        let err = mpeg2_non_intra_block(&mut c, &mut block, &quant(2, &ZIGZAG_SCAN)).unwrap_err();
        assert_eq!(err, BitstreamFault::CoefficientOverflow);
    }
}
