//! 位流游标.
//!
//! 以 2048 字节为单位从 [`ByteSource`] 拉取数据, 在 64 位移位寄存器中维持
//! 一个滑动的位窗口. 每次消耗位之后立即补满寄存器, 保证任意时刻至少有
//! 32 个有效位可供 `show_bits` 窥视.
//!
//! 字节源读完后, 缓冲区先补 0 到 4 字节边界, 再以序列结束码 0x000001B7
//! 无限填充, 所有解析循环都会在结束码处自然终止.

use log::{trace, warn};
use mpegv_core::{ByteSource, MpegvError};

/// 每次从字节源拉取的块大小
pub const BUFFER_SIZE: usize = 2048;

/// 数据耗尽后用于填充的序列结束码
const END_CODE_BYTES: [u8; 4] = [0x00, 0x00, 0x01, 0xB7];

/// 位流游标
pub struct BitCursor<S> {
    source: S,
    buffer: Box<[u8; BUFFER_SIZE]>,
    /// 缓冲区读指针
    pos: usize,
    /// 移位寄存器, 有效位高位对齐
    reg: u64,
    /// 寄存器中的有效位数
    valid: u32,
    /// 字节源已结束 (短读或出错)
    exhausted: bool,
    /// 从字节源读到的真实字节数
    real_bytes: u64,
    /// 已消耗的位数
    consumed_bits: u64,
    /// 字节源返回的错误, 等待上层取走
    error: Option<MpegvError>,
}

impl<S: ByteSource> BitCursor<S> {
    /// 创建游标并预读第一个数据块
    pub fn new(source: S) -> Self {
        let mut cursor = Self {
            source,
            buffer: Box::new([0u8; BUFFER_SIZE]),
            pos: BUFFER_SIZE,
            reg: 0,
            valid: 0,
            exhausted: false,
            real_bytes: 0,
            consumed_bits: 0,
            error: None,
        };
        cursor.refill();
        cursor
    }

    /// 窥视接下来的 `n` 位 (0..=32), 不消耗
    #[inline]
    pub fn show_bits(&self, n: u32) -> u32 {
        debug_assert!(n <= 32);
        if n == 0 {
            return 0;
        }
        (self.reg >> (64 - n)) as u32
    }

    /// 消耗 `n` 位 (0..=32)
    #[inline]
    pub fn flush_bits(&mut self, n: u32) {
        debug_assert!(n <= 32);
        self.reg <<= n;
        self.valid -= n;
        self.consumed_bits += u64::from(n);
        self.refill();
    }

    /// 读取 `n` 位 (0..=32)
    #[inline]
    pub fn get_bits(&mut self, n: u32) -> u32 {
        let v = self.show_bits(n);
        self.flush_bits(n);
        v
    }

    /// 读取 1 位
    #[inline]
    pub fn get_bit(&mut self) -> bool {
        self.get_bits(1) != 0
    }

    /// 读取 marker_bit, 值为 0 时仅记录
    pub fn marker_bit(&mut self, field: &str) {
        if !self.get_bit() {
            trace!("marker_bit 缺失: {}", field);
        }
    }

    /// 丢弃当前字节中剩余的位
    pub fn byte_align(&mut self) {
        let rem = self.valid & 7;
        self.flush_bits(rem);
    }

    /// 对齐到字节边界, 然后丢弃字节直到窗口前端为起始码前缀 0x000001
    pub fn next_start_code(&mut self) {
        self.byte_align();
        while self.show_bits(24) != 0x00_0001 {
            self.flush_bits(8);
        }
    }

    /// 是否已越过字节源中的全部真实数据
    pub fn at_end_of_data(&self) -> bool {
        self.exhausted && self.consumed_bits >= self.real_bytes * 8
    }

    /// 已消耗的位数
    pub fn position(&self) -> u64 {
        self.consumed_bits
    }

    /// 取走字节源错误
    pub fn take_error(&mut self) -> Option<MpegvError> {
        self.error.take()
    }

    /// 取回字节源
    pub fn into_source(self) -> S {
        self.source
    }

    /// 把寄存器补到 56 位以上
    fn refill(&mut self) {
        while self.valid <= 56 {
            let byte = self.next_byte();
            self.reg |= u64::from(byte) << (56 - self.valid);
            self.valid += 8;
        }
    }

    fn next_byte(&mut self) -> u8 {
        if self.pos >= BUFFER_SIZE {
            self.fill_buffer();
            self.pos = 0;
        }
        let b = self.buffer[self.pos];
        self.pos += 1;
        b
    }

    fn fill_buffer(&mut self) {
        let mut level = 0;
        if !self.exhausted {
            match self.source.read_block(&mut self.buffer[..]) {
                Ok(n) => {
                    level = n.min(BUFFER_SIZE);
                    self.real_bytes += level as u64;
                    if level < BUFFER_SIZE {
                        self.exhausted = true;
                    }
                }
                Err(e) => {
                    warn!("字节源读取失败, 按数据结束处理: {}", e);
                    self.error = Some(e);
                    self.exhausted = true;
                }
            }
        }
        if level < BUFFER_SIZE {
            while level & 3 != 0 {
                self.buffer[level] = 0;
                level += 1;
            }
            for (i, b) in self.buffer[level..].iter_mut().enumerate() {
                *b = END_CODE_BYTES[i & 3];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mpegv_core::{MemorySource, MpegvResult};

    use super::*;

    fn cursor(data: &[u8]) -> BitCursor<MemorySource> {
        BitCursor::new(MemorySource::new(data.to_vec()))
    }

    #[test]
    fn test_show_and_get_bits() {
        let mut c = cursor(&[0b1011_0001, 0xFF, 0x00, 0x12, 0x34]);
        assert_eq!(c.show_bits(4), 0b1011);
        assert_eq!(c.get_bits(4), 0b1011);
        assert_eq!(c.get_bits(12), 0x1FF);
        assert_eq!(c.get_bits(32), 0x0012_3400);
        assert_eq!(c.position(), 48);
    }

    #[test]
    fn test_pads_with_sequence_end_codes() {
        // 3 字节数据补 1 个 0 到 4 字节边界, 之后全是结束码
        let mut c = cursor(&[0xAA, 0xBB, 0xCC]);
        assert_eq!(c.get_bits(32), 0xAABB_CC00);
        assert!(c.at_end_of_data());
        for _ in 0..1000 {
            assert_eq!(c.get_bits(32), 0x0000_01B7);
        }
    }

    #[test]
    fn test_empty_source_yields_end_codes() {
        let mut c = cursor(&[]);
        assert!(c.at_end_of_data());
        c.next_start_code();
        assert_eq!(c.get_bits(32), 0x0000_01B7);
    }

    #[test]
    fn test_next_start_code_skips_garbage() {
        let mut c = cursor(&[0x12, 0x00, 0x00, 0x00, 0x01, 0xB3, 0x55]);
        c.get_bits(3);
        c.next_start_code();
        assert_eq!(c.get_bits(32), 0x0000_01B3);
        assert_eq!(c.get_bits(8), 0x55);
    }

    #[test]
    fn test_refill_across_block_boundary() {
        let data: Vec<u8> = (0..BUFFER_SIZE * 2 + 5).map(|i| i as u8).collect();
        let mut c = cursor(&data);
        for (i, &b) in data.iter().enumerate() {
            assert_eq!(c.get_bits(8), u32::from(b), "字节 {i}");
        }
        assert!(c.at_end_of_data());
    }

    #[test]
    fn test_source_error_is_kept() {
        let source = |_buf: &mut [u8]| -> MpegvResult<usize> {
            Err(std::io::Error::other("断开").into())
        };
        let mut c = BitCursor::new(source);
        assert_eq!(c.show_bits(32), 0x0000_01B7);
        assert!(matches!(c.take_error(), Some(MpegvError::Io(_))));
        assert!(c.take_error().is_none());
    }
}
