//! VLC (变长编码) 表定义与解码函数
//!
//! 码表以 `(码长, 码字, 符号)` 列出, 首次使用时展开为直接查找表:
//! 窥视固定宽度的位窗口, 以窗口值为下标取出 (码长, 符号), 再消耗码长位.
//! 没有命中任何码字的窗口值即为码流错误.
//!
//! DCT 系数码字最长 16 位, 分两段查表: 前 6 位不全为 0 的码字不超过 8 位,
//! 用窗口高 8 位索引; 以 000000 开头的长码字用窗口低 10 位索引.

use std::sync::OnceLock;

use mpegv_core::ByteSource;

use crate::bitstream::BitCursor;
use crate::fault::{BitstreamFault, FaultResult};
use crate::types::{MacroblockType, PictureCodingType};

// ============================================================================
// VLC 表定义
// ============================================================================

const I: u8 = MacroblockType::INTRA.bits();
const PAT: u8 = MacroblockType::PATTERN.bits();
const BWD: u8 = MacroblockType::MOTION_BACKWARD.bits();
const FWD: u8 = MacroblockType::MOTION_FORWARD.bits();
const Q: u8 = MacroblockType::QUANT.bits();

/// macroblock_address_increment 符号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbaCode {
    /// 地址增量 1..=33
    Increment(u8),
    /// 填充码, 忽略
    Stuffing,
    /// 转义码, 增量加 33
    Escape,
}

/// Table B-1: macroblock_address_increment
pub const MBA_INCREMENT_CODES: &[(u8, u16, MbaCode)] = &[
    (1, 0b1, MbaCode::Increment(1)),
    (3, 0b011, MbaCode::Increment(2)),
    (3, 0b010, MbaCode::Increment(3)),
    (4, 0b0011, MbaCode::Increment(4)),
    (4, 0b0010, MbaCode::Increment(5)),
    (5, 0b00011, MbaCode::Increment(6)),
    (5, 0b00010, MbaCode::Increment(7)),
    (7, 0b0000111, MbaCode::Increment(8)),
    (7, 0b0000110, MbaCode::Increment(9)),
    (8, 0b00001011, MbaCode::Increment(10)),
    (8, 0b00001010, MbaCode::Increment(11)),
    (8, 0b00001001, MbaCode::Increment(12)),
    (8, 0b00001000, MbaCode::Increment(13)),
    (8, 0b00000111, MbaCode::Increment(14)),
    (8, 0b00000110, MbaCode::Increment(15)),
    (10, 0b0000010111, MbaCode::Increment(16)),
    (10, 0b0000010110, MbaCode::Increment(17)),
    (10, 0b0000010101, MbaCode::Increment(18)),
    (10, 0b0000010100, MbaCode::Increment(19)),
    (10, 0b0000010011, MbaCode::Increment(20)),
    (10, 0b0000010010, MbaCode::Increment(21)),
    (11, 0b00000100011, MbaCode::Increment(22)),
    (11, 0b00000100010, MbaCode::Increment(23)),
    (11, 0b00000100001, MbaCode::Increment(24)),
    (11, 0b00000100000, MbaCode::Increment(25)),
    (11, 0b00000011111, MbaCode::Increment(26)),
    (11, 0b00000011110, MbaCode::Increment(27)),
    (11, 0b00000011101, MbaCode::Increment(28)),
    (11, 0b00000011100, MbaCode::Increment(29)),
    (11, 0b00000011011, MbaCode::Increment(30)),
    (11, 0b00000011010, MbaCode::Increment(31)),
    (11, 0b00000011001, MbaCode::Increment(32)),
    (11, 0b00000011000, MbaCode::Increment(33)),
    (11, 0b00000001111, MbaCode::Stuffing),
    (11, 0b00000001000, MbaCode::Escape),
];

/// Table B-2: I 图像 macroblock_type
pub const MB_TYPE_I_CODES: &[(u8, u16, u8)] = &[(1, 0b1, I), (2, 0b01, Q | I)];

/// Table B-3: P 图像 macroblock_type
pub const MB_TYPE_P_CODES: &[(u8, u16, u8)] = &[
    (1, 0b1, FWD | PAT),
    (2, 0b01, PAT),
    (3, 0b001, FWD),
    (5, 0b00011, I),
    (5, 0b00010, Q | FWD | PAT),
    (5, 0b00001, Q | PAT),
    (6, 0b000001, Q | I),
];

/// Table B-4: B 图像 macroblock_type
pub const MB_TYPE_B_CODES: &[(u8, u16, u8)] = &[
    (2, 0b10, FWD | BWD),
    (2, 0b11, FWD | BWD | PAT),
    (3, 0b010, BWD),
    (3, 0b011, BWD | PAT),
    (4, 0b0010, FWD),
    (4, 0b0011, FWD | PAT),
    (5, 0b00011, I),
    (5, 0b00010, Q | FWD | BWD | PAT),
    (6, 0b000011, Q | FWD | PAT),
    (6, 0b000010, Q | BWD | PAT),
    (6, 0b000001, Q | I),
];

/// D 图像 macroblock_type (MPEG-1)
pub const MB_TYPE_D_CODES: &[(u8, u16, u8)] = &[(1, 0b1, I)];

/// Table B-10: motion_code 绝对值 (非零值后跟 1 位符号)
pub const MOTION_CODE_CODES: &[(u8, u16, u8)] = &[
    (1, 0b1, 0),
    (2, 0b01, 1),
    (3, 0b001, 2),
    (4, 0b0001, 3),
    (6, 0b000011, 4),
    (7, 0b0000101, 5),
    (7, 0b0000100, 6),
    (7, 0b0000011, 7),
    (9, 0b000001011, 8),
    (9, 0b000001010, 9),
    (9, 0b000001001, 10),
    (10, 0b0000010001, 11),
    (10, 0b0000010000, 12),
    (10, 0b0000001111, 13),
    (10, 0b0000001110, 14),
    (10, 0b0000001101, 15),
    (10, 0b0000001100, 16),
];

/// Table B-9: coded_block_pattern, 以 cbp 值为下标的 (码字, 码长)
#[rustfmt::skip]
pub const CBP_CODES: [(u16, u8); 64] = [
    (0x01, 9), (0x0b, 5), (0x09, 5), (0x0d, 6), (0x0d, 4), (0x17, 7), (0x13, 7), (0x1f, 8),
    (0x0c, 4), (0x16, 7), (0x12, 7), (0x1e, 8), (0x13, 5), (0x1b, 8), (0x17, 8), (0x13, 8),
    (0x0b, 4), (0x15, 7), (0x11, 7), (0x1d, 8), (0x11, 5), (0x19, 8), (0x15, 8), (0x11, 8),
    (0x0f, 6), (0x0f, 8), (0x0d, 8), (0x03, 9), (0x0f, 5), (0x0b, 8), (0x07, 8), (0x07, 9),
    (0x0a, 4), (0x14, 7), (0x10, 7), (0x1c, 8), (0x0e, 6), (0x0e, 8), (0x0c, 8), (0x02, 9),
    (0x10, 5), (0x18, 8), (0x14, 8), (0x10, 8), (0x0e, 5), (0x0a, 8), (0x06, 8), (0x06, 9),
    (0x12, 5), (0x1a, 8), (0x16, 8), (0x12, 8), (0x0d, 5), (0x09, 8), (0x05, 8), (0x05, 9),
    (0x0c, 5), (0x08, 8), (0x04, 8), (0x04, 9), (0x07, 3), (0x0a, 5), (0x08, 5), (0x0c, 6),
];

/// Table B-12: 亮度 dct_dc_size
pub const DC_SIZE_LUMA_CODES: &[(u8, u16, u8)] = &[
    (3, 0b100, 0),
    (2, 0b00, 1),
    (2, 0b01, 2),
    (3, 0b101, 3),
    (3, 0b110, 4),
    (4, 0b1110, 5),
    (5, 0b11110, 6),
    (6, 0b111110, 7),
    (7, 0b1111110, 8),
    (8, 0b11111110, 9),
    (9, 0b111111110, 10),
    (9, 0b111111111, 11),
];

/// Table B-13: 色度 dct_dc_size
pub const DC_SIZE_CHROMA_CODES: &[(u8, u16, u8)] = &[
    (2, 0b00, 0),
    (2, 0b01, 1),
    (2, 0b10, 2),
    (3, 0b110, 3),
    (4, 0b1110, 4),
    (5, 0b11110, 5),
    (6, 0b111110, 6),
    (7, 0b1111110, 7),
    (8, 0b11111110, 8),
    (9, 0b111111110, 9),
    (10, 0b1111111110, 10),
    (10, 0b1111111111, 11),
];

/// DCT 码表中表示块结束的 run 值
pub const RUN_EOB: u8 = 64;
/// DCT 码表中表示转义的 run 值
pub const RUN_ESCAPE: u8 = 65;

/// Table B-14 中首系数与后续系数共用的码字 (不含符号位)
/// 格式: (位数, 码字, run, level)
pub const DCT_B14_CODES: &[(u8, u16, u8, u8)] = &[
    (3, 0b011, 1, 1),
    (4, 0b0100, 0, 2),
    (4, 0b0101, 2, 1),
    (5, 0b00101, 0, 3),
    (5, 0b00111, 3, 1),
    (5, 0b00110, 4, 1),
    (6, 0b000110, 1, 2),
    (6, 0b000111, 5, 1),
    (6, 0b000101, 6, 1),
    (6, 0b000100, 7, 1),
    (7, 0b0000110, 0, 4),
    (7, 0b0000100, 2, 2),
    (7, 0b0000111, 8, 1),
    (7, 0b0000101, 9, 1),
    (6, 0b000001, RUN_ESCAPE, 0),
    (8, 0b00100110, 0, 5),
    (8, 0b00100001, 0, 6),
    (8, 0b00100101, 1, 3),
    (8, 0b00100100, 3, 2),
    (8, 0b00100111, 10, 1),
    (8, 0b00100011, 11, 1),
    (8, 0b00100010, 12, 1),
    (8, 0b00100000, 13, 1),
    (10, 0b0000001010, 0, 7),
    (10, 0b0000001100, 1, 4),
    (10, 0b0000001011, 2, 3),
    (10, 0b0000001111, 4, 2),
    (10, 0b0000001001, 5, 2),
    (10, 0b0000001110, 14, 1),
    (10, 0b0000001101, 15, 1),
    (10, 0b0000001000, 16, 1),
];

/// Table B-14 首系数专用码字: '1s' 为 (0, 1)
pub const DCT_B14_FIRST_CODES: &[(u8, u16, u8, u8)] = &[(1, 0b1, 0, 1)];

/// Table B-14 后续系数专用码字: '10' 为块结束, '11s' 为 (0, 1)
pub const DCT_B14_NEXT_CODES: &[(u8, u16, u8, u8)] = &[(2, 0b10, RUN_EOB, 0), (2, 0b11, 0, 1)];

/// Table B-15 (intra_vlc_format = 1) 的短码字
pub const DCT_B15_CODES: &[(u8, u16, u8, u8)] = &[
    (4, 0b0110, RUN_EOB, 0),
    (2, 0b10, 0, 1),
    (3, 0b010, 1, 1),
    (3, 0b110, 0, 2),
    (5, 0b00101, 2, 1),
    (4, 0b0111, 0, 3),
    (5, 0b00111, 3, 1),
    (6, 0b000110, 4, 1),
    (5, 0b00110, 1, 2),
    (6, 0b000111, 5, 1),
    (7, 0b0000110, 6, 1),
    (7, 0b0000100, 7, 1),
    (5, 0b11100, 0, 4),
    (7, 0b0000111, 2, 2),
    (7, 0b0000101, 8, 1),
    (7, 0b1111000, 9, 1),
    (6, 0b000001, RUN_ESCAPE, 0),
    (5, 0b11101, 0, 5),
    (6, 0b000101, 0, 6),
    (7, 0b1111001, 1, 3),
    (8, 0b00100110, 3, 2),
    (7, 0b1111010, 10, 1),
    (8, 0b00100001, 11, 1),
    (8, 0b00100101, 12, 1),
    (8, 0b00100100, 13, 1),
    (6, 0b000100, 0, 7),
    (8, 0b00100111, 1, 4),
    (8, 0b11111100, 2, 3),
    (8, 0b11111101, 4, 2),
    (9, 0b000000100, 5, 2),
    (9, 0b000000101, 14, 1),
    (9, 0b000000111, 15, 1),
    (10, 0b0000001101, 16, 1),
    (7, 0b1111011, 0, 8),
    (7, 0b1111100, 0, 9),
    (8, 0b00100011, 0, 10),
    (8, 0b00100010, 0, 11),
    (8, 0b00100000, 1, 5),
    (10, 0b0000001100, 2, 4),
    (8, 0b11111010, 0, 12),
    (8, 0b11111011, 0, 13),
    (8, 0b11111110, 0, 14),
    (8, 0b11111111, 0, 15),
];

/// 以 0000000 开头的 12..16 位码字, B-14 与 B-15 共用
pub const DCT_LONG_CODES: &[(u8, u16, u8, u8)] = &[
    (12, 0b000000011101, 0, 8),
    (12, 0b000000011000, 0, 9),
    (12, 0b000000010011, 0, 10),
    (12, 0b000000010000, 0, 11),
    (12, 0b000000011011, 1, 5),
    (12, 0b000000010100, 2, 4),
    (12, 0b000000011100, 3, 3),
    (12, 0b000000010010, 4, 3),
    (12, 0b000000011110, 6, 2),
    (12, 0b000000010101, 7, 2),
    (12, 0b000000010001, 8, 2),
    (12, 0b000000011111, 17, 1),
    (12, 0b000000011010, 18, 1),
    (12, 0b000000011001, 19, 1),
    (12, 0b000000010111, 20, 1),
    (12, 0b000000010110, 21, 1),
    (13, 0b0000000011010, 0, 12),
    (13, 0b0000000011001, 0, 13),
    (13, 0b0000000011000, 0, 14),
    (13, 0b0000000010111, 0, 15),
    (13, 0b0000000010110, 1, 6),
    (13, 0b0000000010101, 1, 7),
    (13, 0b0000000010100, 2, 5),
    (13, 0b0000000010011, 3, 4),
    (13, 0b0000000010010, 5, 3),
    (13, 0b0000000010001, 9, 2),
    (13, 0b0000000010000, 10, 2),
    (13, 0b0000000011111, 22, 1),
    (13, 0b0000000011110, 23, 1),
    (13, 0b0000000011101, 24, 1),
    (13, 0b0000000011100, 25, 1),
    (13, 0b0000000011011, 26, 1),
    (14, 0b00000000011111, 0, 16),
    (14, 0b00000000011110, 0, 17),
    (14, 0b00000000011101, 0, 18),
    (14, 0b00000000011100, 0, 19),
    (14, 0b00000000011011, 0, 20),
    (14, 0b00000000011010, 0, 21),
    (14, 0b00000000011001, 0, 22),
    (14, 0b00000000011000, 0, 23),
    (14, 0b00000000010111, 0, 24),
    (14, 0b00000000010110, 0, 25),
    (14, 0b00000000010101, 0, 26),
    (14, 0b00000000010100, 0, 27),
    (14, 0b00000000010011, 0, 28),
    (14, 0b00000000010010, 0, 29),
    (14, 0b00000000010001, 0, 30),
    (14, 0b00000000010000, 0, 31),
    (15, 0b000000000011000, 0, 32),
    (15, 0b000000000010111, 0, 33),
    (15, 0b000000000010110, 0, 34),
    (15, 0b000000000010101, 0, 35),
    (15, 0b000000000010100, 0, 36),
    (15, 0b000000000010011, 0, 37),
    (15, 0b000000000010010, 0, 38),
    (15, 0b000000000010001, 0, 39),
    (15, 0b000000000010000, 0, 40),
    (15, 0b000000000011111, 1, 8),
    (15, 0b000000000011110, 1, 9),
    (15, 0b000000000011101, 1, 10),
    (15, 0b000000000011100, 1, 11),
    (15, 0b000000000011011, 1, 12),
    (15, 0b000000000011010, 1, 13),
    (15, 0b000000000011001, 1, 14),
    (16, 0b0000000000010011, 1, 15),
    (16, 0b0000000000010010, 1, 16),
    (16, 0b0000000000010001, 1, 17),
    (16, 0b0000000000010000, 1, 18),
    (16, 0b0000000000010100, 6, 3),
    (16, 0b0000000000011010, 11, 2),
    (16, 0b0000000000011001, 12, 2),
    (16, 0b0000000000011000, 13, 2),
    (16, 0b0000000000010111, 14, 2),
    (16, 0b0000000000010110, 15, 2),
    (16, 0b0000000000010101, 16, 2),
    (16, 0b0000000000011111, 27, 1),
    (16, 0b0000000000011110, 28, 1),
    (16, 0b0000000000011101, 29, 1),
    (16, 0b0000000000011100, 30, 1),
    (16, 0b0000000000011011, 31, 1),
];

// ============================================================================
// 查找表构建
// ============================================================================

/// 直接查找表
pub(crate) struct VlcTable<T> {
    name: &'static str,
    bits: u32,
    entries: Box<[Option<(u8, T)>]>,
}

impl<T: Copy> VlcTable<T> {
    /// 把每个码字左移到窗口宽度, 填充所有低位组合
    fn build(name: &'static str, bits: u32, codes: impl IntoIterator<Item = (u8, u16, T)>) -> Self {
        let mut entries = vec![None; 1 << bits];
        for (len, code, sym) in codes {
            let pad = bits - u32::from(len);
            let base = (code as usize) << pad;
            for extra in 0..(1usize << pad) {
                entries[base | extra] = Some((len, sym));
            }
        }
        Self {
            name,
            bits,
            entries: entries.into_boxed_slice(),
        }
    }

    fn decode<S: ByteSource>(&self, cursor: &mut BitCursor<S>) -> FaultResult<T> {
        let window = cursor.show_bits(self.bits);
        match self.entries[window as usize] {
            Some((len, sym)) => {
                cursor.flush_bits(u32::from(len));
                Ok(sym)
            }
            None => Err(BitstreamFault::InvalidVlc {
                table: self.name,
                window,
            }),
        }
    }
}

/// DCT 系数码表条目, `run` 为 [`RUN_EOB`] / [`RUN_ESCAPE`] 时是哨兵值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DctEntry {
    /// 零游程
    pub run: u8,
    /// 系数绝对值
    pub level: u8,
}

/// 两段式 DCT 系数查找表
pub(crate) struct DctTable {
    name: &'static str,
    /// 前 6 位不全为 0: 以窗口高 8 位索引
    short: Box<[Option<(u8, DctEntry)>]>,
    /// 以 000000 开头: 以 16 位窗口的低 10 位索引
    long: Box<[Option<(u8, DctEntry)>]>,
}

impl DctTable {
    fn build<'a>(name: &'static str, lists: impl IntoIterator<Item = &'a [(u8, u16, u8, u8)]>) -> Self {
        let mut short = vec![None; 256];
        let mut long = vec![None; 1024];
        for &(len, code, run, level) in lists.into_iter().flatten() {
            let entry = Some((len, DctEntry { run, level }));
            let (table, pad) = if len <= 8 {
                (&mut short, 8 - u32::from(len))
            } else {
                (&mut long, 16 - u32::from(len))
            };
            let base = (code as usize) << pad;
            for extra in 0..(1usize << pad) {
                table[base | extra] = entry;
            }
        }
        Self {
            name,
            short: short.into_boxed_slice(),
            long: long.into_boxed_slice(),
        }
    }

    /// 解码一个 (run, level) 码字, 不读取符号位
    pub(crate) fn decode<S: ByteSource>(&self, cursor: &mut BitCursor<S>) -> FaultResult<DctEntry> {
        let window = cursor.show_bits(16);
        let slot = if window >= 1024 {
            self.short[(window >> 8) as usize]
        } else {
            self.long[window as usize]
        };
        match slot {
            Some((len, entry)) => {
                cursor.flush_bits(u32::from(len));
                Ok(entry)
            }
            None => Err(BitstreamFault::InvalidVlc {
                table: self.name,
                window,
            }),
        }
    }
}

fn with_flags(codes: &[(u8, u16, u8)]) -> impl Iterator<Item = (u8, u16, MacroblockType)> + '_ {
    codes
        .iter()
        .map(|&(len, code, bits)| (len, code, MacroblockType::from_bits_retain(bits)))
}

fn mba_table() -> &'static VlcTable<MbaCode> {
    static TABLE: OnceLock<VlcTable<MbaCode>> = OnceLock::new();
    TABLE.get_or_init(|| VlcTable::build("macroblock_address_increment", 11, MBA_INCREMENT_CODES.iter().copied()))
}

fn mb_type_table(coding_type: PictureCodingType) -> &'static VlcTable<MacroblockType> {
    static I_TABLE: OnceLock<VlcTable<MacroblockType>> = OnceLock::new();
    static P_TABLE: OnceLock<VlcTable<MacroblockType>> = OnceLock::new();
    static B_TABLE: OnceLock<VlcTable<MacroblockType>> = OnceLock::new();
    static D_TABLE: OnceLock<VlcTable<MacroblockType>> = OnceLock::new();
    match coding_type {
        PictureCodingType::I => I_TABLE.get_or_init(|| VlcTable::build("I macroblock_type", 2, with_flags(MB_TYPE_I_CODES))),
        PictureCodingType::P => P_TABLE.get_or_init(|| VlcTable::build("P macroblock_type", 6, with_flags(MB_TYPE_P_CODES))),
        PictureCodingType::B => B_TABLE.get_or_init(|| VlcTable::build("B macroblock_type", 6, with_flags(MB_TYPE_B_CODES))),
        PictureCodingType::D => D_TABLE.get_or_init(|| VlcTable::build("D macroblock_type", 1, with_flags(MB_TYPE_D_CODES))),
    }
}

fn motion_code_table() -> &'static VlcTable<u8> {
    static TABLE: OnceLock<VlcTable<u8>> = OnceLock::new();
    TABLE.get_or_init(|| VlcTable::build("motion_code", 10, MOTION_CODE_CODES.iter().copied()))
}

fn cbp_table() -> &'static VlcTable<u8> {
    static TABLE: OnceLock<VlcTable<u8>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let codes = CBP_CODES
            .iter()
            .enumerate()
            .map(|(cbp, &(code, len))| (len, code, cbp as u8));
        VlcTable::build("coded_block_pattern", 9, codes)
    })
}

fn dc_size_table(luma: bool) -> &'static VlcTable<u8> {
    static LUMA: OnceLock<VlcTable<u8>> = OnceLock::new();
    static CHROMA: OnceLock<VlcTable<u8>> = OnceLock::new();
    if luma {
        LUMA.get_or_init(|| VlcTable::build("dct_dc_size_luminance", 9, DC_SIZE_LUMA_CODES.iter().copied()))
    } else {
        CHROMA.get_or_init(|| VlcTable::build("dct_dc_size_chrominance", 10, DC_SIZE_CHROMA_CODES.iter().copied()))
    }
}

/// Table B-14, 非 Intra 块的首个系数
pub(crate) fn dct_table_first() -> &'static DctTable {
    static TABLE: OnceLock<DctTable> = OnceLock::new();
    TABLE.get_or_init(|| DctTable::build("DCT B-14 first", [DCT_B14_FIRST_CODES, DCT_B14_CODES, DCT_LONG_CODES]))
}

/// Table B-14, 其余系数
pub(crate) fn dct_table_next() -> &'static DctTable {
    static TABLE: OnceLock<DctTable> = OnceLock::new();
    TABLE.get_or_init(|| DctTable::build("DCT B-14 next", [DCT_B14_NEXT_CODES, DCT_B14_CODES, DCT_LONG_CODES]))
}

/// Table B-15, intra_vlc_format = 1 的 Intra 块
pub(crate) fn dct_table_intra_alt() -> &'static DctTable {
    static TABLE: OnceLock<DctTable> = OnceLock::new();
    TABLE.get_or_init(|| DctTable::build("DCT B-15", [DCT_B15_CODES, DCT_LONG_CODES]))
}

// ============================================================================
// VLC 解码函数
// ============================================================================

/// 解码 macroblock_address_increment, 吸收填充码并累加转义
pub(crate) fn decode_mba_increment<S: ByteSource>(cursor: &mut BitCursor<S>) -> FaultResult<u32> {
    let mut increment = 0;
    loop {
        match mba_table().decode(cursor)? {
            MbaCode::Increment(v) => return Ok(increment + u32::from(v)),
            MbaCode::Stuffing => {}
            MbaCode::Escape => increment += 33,
        }
    }
}

/// 按图像类型解码 macroblock_type
pub(crate) fn decode_macroblock_type<S: ByteSource>(
    cursor: &mut BitCursor<S>,
    coding_type: PictureCodingType,
) -> FaultResult<MacroblockType> {
    mb_type_table(coding_type).decode(cursor).map_err(|e| match coding_type {
        PictureCodingType::D => BitstreamFault::InvalidDcPicture,
        _ => e,
    })
}

/// 解码带符号的 motion_code (-16..=16)
pub(crate) fn decode_motion_code<S: ByteSource>(cursor: &mut BitCursor<S>) -> FaultResult<i32> {
    let magnitude = i32::from(motion_code_table().decode(cursor)?);
    if magnitude == 0 {
        return Ok(0);
    }
    Ok(if cursor.get_bit() { -magnitude } else { magnitude })
}

/// 解码 dmvector: '0' -> 0, '10' -> +1, '11' -> -1
pub(crate) fn decode_dmvector<S: ByteSource>(cursor: &mut BitCursor<S>) -> i32 {
    if !cursor.get_bit() {
        0
    } else if cursor.get_bit() {
        -1
    } else {
        1
    }
}

/// 解码 4:2:0 部分的 coded_block_pattern (6 位)
pub(crate) fn decode_coded_block_pattern<S: ByteSource>(cursor: &mut BitCursor<S>) -> FaultResult<u32> {
    cbp_table().decode(cursor).map(u32::from)
}

/// 解码 dct_dc_size
pub(crate) fn decode_dc_size<S: ByteSource>(cursor: &mut BitCursor<S>, luma: bool) -> FaultResult<u32> {
    dc_size_table(luma).decode(cursor).map(u32::from)
}
