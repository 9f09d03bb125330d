//! 比特流写入器.
//!
//! 按大端位序 (MSB first) 写入, 用于在测试与基准中合成 MPEG 视频基本流.

/// 比特流写入器
///
/// # 示例
/// ```
/// use mpegv_core::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0b101, 3);
/// bw.write_start_code(0xB7);
/// assert_eq!(bw.finish(), vec![0b1010_0000, 0x00, 0x00, 0x01, 0xB7]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    /// 已完成的字节
    data: Vec<u8>,
    /// 正在填充的字节
    current_byte: u8,
    /// 当前字节中已填充的位数 (0-7)
    bit_count: u8,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self::default()
    }

    /// 已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.bit_count as usize
    }

    /// 写入 1 个位
    pub fn write_bit(&mut self, bit: bool) {
        self.write_bits(u32::from(bit), 1);
    }

    /// 写入 `value` 的低 `n` 位 (最多 32 位), 高位在前
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={} 超过 32 位", n);
        let mut remaining = n;
        while remaining > 0 {
            let available = 8 - u32::from(self.bit_count);
            let take = remaining.min(available);
            let shift = remaining - take;
            let bits = ((u64::from(value) >> shift) & ((1u64 << take) - 1)) as u8;
            self.current_byte = ((u32::from(self.current_byte) << take) as u8) | bits;
            self.bit_count += take as u8;
            if self.bit_count == 8 {
                self.data.push(self.current_byte);
                self.current_byte = 0;
                self.bit_count = 0;
            }
            remaining -= take;
        }
    }

    /// 以二进制补码写入有符号整数的低 `n` 位
    pub fn write_bits_signed(&mut self, value: i32, n: u32) {
        let mask = ((1u64 << n) - 1) as u32;
        self.write_bits((value as u32) & mask, n);
    }

    /// 对齐到字节边界 (用 0 填充)
    pub fn align_to_byte(&mut self) {
        if self.bit_count > 0 {
            let pad = 8 - self.bit_count;
            self.current_byte <<= pad;
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// 对齐后写入起始码 0x000001xx
    pub fn write_start_code(&mut self, code: u8) {
        self.align_to_byte();
        self.data.extend_from_slice(&[0x00, 0x00, 0x01, code]);
    }

    /// 完成写入, 不足一个字节时用 0 补齐
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bits_cross_byte() {
        let mut bw = BitWriter::new();
        bw.write_bits(0b1011, 4);
        bw.write_bits(0b0001_0101, 8);
        bw.write_bits(0b0101, 4);
        assert_eq!(bw.bits_written(), 16);
        assert_eq!(bw.finish(), vec![0b1011_0001, 0b0101_0101]);
    }

    #[test]
    fn test_write_bits_32_bit() {
        let mut bw = BitWriter::new();
        bw.write_bit(true);
        bw.write_bits(0xFF00_FF00, 32);
        assert_eq!(bw.finish(), vec![0xFF, 0x80, 0x7F, 0x80, 0x00]);
    }

    #[test]
    fn test_write_signed() {
        let mut bw = BitWriter::new();
        bw.write_bits_signed(-1, 4);
        bw.write_bits_signed(5, 4);
        assert_eq!(bw.finish(), vec![0xF5]);
    }

    #[test]
    fn test_start_code_aligns() {
        let mut bw = BitWriter::new();
        bw.write_bit(true);
        bw.write_start_code(0x00);
        assert_eq!(bw.bits_written(), 40);
        bw.write_start_code(0xB3);
        assert_eq!(bw.finish(), vec![0x80, 0, 0, 1, 0, 0, 0, 1, 0xB3]);
    }
}
