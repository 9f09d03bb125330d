//! 集成测试公共工具: 用 BitWriter 合成 MPEG-1/MPEG-2 视频基本流.
//!
//! 合成的图像由平坦块组成: 每个宏块只编码 DC 系数, 便于按像素核对输出.

#![allow(dead_code)]

use mpegv::codec::PictureCodingType;
use mpegv::core::{BitWriter, ChromaFormat, MatrixCoefficients, PixelSink};
use mpegv::scale::{INVERSE_COEFFICIENTS, ycbcr_to_argb};

/// Table B-1 中增量 1..=33 的 (码长, 码字)
const MBA_CODES: [(u32, u32); 33] = [
    (1, 0b1),
    (3, 0b011),
    (3, 0b010),
    (4, 0b0011),
    (4, 0b0010),
    (5, 0b00011),
    (5, 0b00010),
    (7, 0b0000111),
    (7, 0b0000110),
    (8, 0b00001011),
    (8, 0b00001010),
    (8, 0b00001001),
    (8, 0b00001000),
    (8, 0b00000111),
    (8, 0b00000110),
    (10, 0b0000010111),
    (10, 0b0000010110),
    (10, 0b0000010101),
    (10, 0b0000010100),
    (10, 0b0000010011),
    (10, 0b0000010010),
    (11, 0b00000100011),
    (11, 0b00000100010),
    (11, 0b00000100001),
    (11, 0b00000100000),
    (11, 0b00000011111),
    (11, 0b00000011110),
    (11, 0b00000011101),
    (11, 0b00000011100),
    (11, 0b00000011011),
    (11, 0b00000011010),
    (11, 0b00000011001),
    (11, 0b00000011000),
];

/// Table B-10: motion_code 绝对值 0..=16 的 (码长, 码字)
const MOTION_CODES: [(u32, u32); 17] = [
    (1, 0b1),
    (2, 0b01),
    (3, 0b001),
    (4, 0b0001),
    (6, 0b000011),
    (7, 0b0000101),
    (7, 0b0000100),
    (7, 0b0000011),
    (9, 0b000001011),
    (9, 0b000001010),
    (9, 0b000001001),
    (10, 0b0000010001),
    (10, 0b0000010000),
    (10, 0b0000001111),
    (10, 0b0000001110),
    (10, 0b0000001101),
    (10, 0b0000001100),
];

/// Table B-12: 亮度 dct_dc_size 0..=8
const DC_LUMA_CODES: [(u32, u32); 9] = [
    (3, 0b100),
    (2, 0b00),
    (2, 0b01),
    (3, 0b101),
    (3, 0b110),
    (4, 0b1110),
    (5, 0b11110),
    (6, 0b111110),
    (7, 0b1111110),
];

/// Table B-13: 色度 dct_dc_size 0..=8
const DC_CHROMA_CODES: [(u32, u32); 9] = [
    (2, 0b00),
    (2, 0b01),
    (2, 0b10),
    (3, 0b110),
    (4, 0b1110),
    (5, 0b11110),
    (6, 0b111110),
    (7, 0b1111110),
    (8, 0b11111110),
];

/// 图像结构
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Structure {
    Frame,
    Top,
    Bottom,
}

/// MPEG-2 图像编码扩展中影响宏块语法的标志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coding {
    /// 为 false 时帧图像的宏块带 frame_motion_type 与 dct_type
    pub frame_pred_frame_dct: bool,
    /// Intra 宏块携带隐藏运动矢量
    pub concealment: bool,
}

/// MPEG-2 前向运动补偿方式, 矢量为半像素单位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// 帧图像中的场预测: 依次为顶场行与底场行的 (field_select, 矢量), 垂直分量为场单位
    FieldInFrame([(bool, [i32; 2]); 2]),
    /// 场图像中的单矢量场预测
    Field(bool, [i32; 2]),
    /// 场图像中上下两个 16x8 区域各自的 (field_select, 矢量)
    Field16x8([(bool, [i32; 2]); 2]),
    /// 双基预测: 矢量 (垂直为场单位) 与 dmvector
    DualPrime([i32; 2], [i32; 2]),
}

/// 基本流合成器
pub struct StreamBuilder {
    bw: BitWriter,
    mpeg2: bool,
    progressive: bool,
    chroma: ChromaFormat,
    kind: PictureCodingType,
    structure: Structure,
    coding: Coding,
    dc_pred: [i32; 3],
    /// [第几个矢量][方向][分量], 半像素单位, 帧图像的场矢量按帧单位保存
    pmv: [[[i32; 2]; 2]; 2],
}

impl StreamBuilder {
    pub fn mpeg1() -> Self {
        Self::new(false, true, ChromaFormat::Yuv420)
    }

    pub fn mpeg2(chroma: ChromaFormat, progressive: bool) -> Self {
        Self::new(true, progressive, chroma)
    }

    fn new(mpeg2: bool, progressive: bool, chroma: ChromaFormat) -> Self {
        Self {
            bw: BitWriter::new(),
            mpeg2,
            progressive,
            chroma,
            kind: PictureCodingType::I,
            structure: Structure::Frame,
            coding: Coding {
                frame_pred_frame_dct: true,
                concealment: false,
            },
            dc_pred: [0; 3],
            pmv: [[[0; 2]; 2]; 2],
        }
    }

    /// 序列头 (MPEG-2 附带序列扩展), 25 fps, 默认量化矩阵
    pub fn sequence(&mut self, width: u32, height: u32) -> &mut Self {
        let bw = &mut self.bw;
        bw.write_start_code(0xB3);
        bw.write_bits(width & 0xFFF, 12);
        bw.write_bits(height & 0xFFF, 12);
        bw.write_bits(1, 4);
        bw.write_bits(3, 4);
        bw.write_bits(2500, 18);
        bw.write_bit(true);
        bw.write_bits(20, 10);
        bw.write_bit(false);
        bw.write_bit(false);
        bw.write_bit(false);
        if self.mpeg2 {
            bw.write_start_code(0xB5);
            bw.write_bits(1, 4);
            bw.write_bits(0x48, 8);
            bw.write_bit(self.progressive);
            bw.write_bits(self.chroma.code(), 2);
            bw.write_bits(width >> 12, 2);
            bw.write_bits(height >> 12, 2);
            bw.write_bits(0, 12);
            bw.write_bit(true);
            bw.write_bits(0, 8);
            bw.write_bit(false);
            bw.write_bits(0, 2);
            bw.write_bits(0, 5);
        }
        self
    }

    /// 00:00:00:00 的封闭 GOP
    pub fn gop(&mut self) -> &mut Self {
        let bw = &mut self.bw;
        bw.write_start_code(0xB8);
        bw.write_bits(0, 1 + 5 + 6);
        bw.write_bit(true);
        bw.write_bits(0, 6 + 6);
        bw.write_bit(true);
        bw.write_bit(false);
        self
    }

    /// 帧图像头
    pub fn picture(&mut self, kind: PictureCodingType, temporal_reference: u32) -> &mut Self {
        self.picture_with_structure(kind, temporal_reference, Structure::Frame)
    }

    /// 图像头, MPEG-2 附带图像编码扩展 (f_code 为 1)
    pub fn picture_with_structure(
        &mut self,
        kind: PictureCodingType,
        temporal_reference: u32,
        structure: Structure,
    ) -> &mut Self {
        let coding = Coding {
            frame_pred_frame_dct: structure == Structure::Frame,
            concealment: false,
        };
        self.picture_with_coding(kind, temporal_reference, structure, coding)
    }

    /// 指定图像编码标志的 MPEG-2 图像头
    pub fn picture_with_coding(
        &mut self,
        kind: PictureCodingType,
        temporal_reference: u32,
        structure: Structure,
        coding: Coding,
    ) -> &mut Self {
        self.kind = kind;
        self.structure = structure;
        self.coding = coding;
        let header_f_code = if self.mpeg2 { 7 } else { 1 };
        let bw = &mut self.bw;
        bw.write_start_code(0x00);
        bw.write_bits(temporal_reference, 10);
        bw.write_bits(kind.code(), 3);
        bw.write_bits(0xFFFF, 16);
        if matches!(kind, PictureCodingType::P | PictureCodingType::B) {
            bw.write_bit(false);
            bw.write_bits(header_f_code, 3);
        }
        if kind == PictureCodingType::B {
            bw.write_bit(false);
            bw.write_bits(header_f_code, 3);
        }
        bw.write_bit(false);

        if self.mpeg2 {
            let forward = if matches!(kind, PictureCodingType::P | PictureCodingType::B) || coding.concealment {
                1
            } else {
                15
            };
            let backward = if kind == PictureCodingType::B { 1 } else { 15 };
            let frame = structure == Structure::Frame;
            bw.write_start_code(0xB5);
            bw.write_bits(8, 4);
            for f in [forward, forward, backward, backward] {
                bw.write_bits(f, 4);
            }
            bw.write_bits(0, 2); // intra_dc_precision
            bw.write_bits(
                match structure {
                    Structure::Top => 1,
                    Structure::Bottom => 2,
                    Structure::Frame => 3,
                },
                2,
            );
            bw.write_bit(frame && !self.progressive); // top_field_first
            bw.write_bit(coding.frame_pred_frame_dct);
            bw.write_bit(coding.concealment);
            bw.write_bit(false); // q_scale_type
            bw.write_bit(false); // intra_vlc_format
            bw.write_bit(false); // alternate_scan
            bw.write_bit(false); // repeat_first_field
            let progressive_frame = frame && self.progressive;
            bw.write_bit(progressive_frame); // chroma_420_type
            bw.write_bit(progressive_frame);
            bw.write_bit(false); // composite_display_flag
        }
        self
    }

    /// slice 头, `row` 从 0 开始, quantiser_scale_code 固定为 8
    pub fn slice(&mut self, row: u32) -> &mut Self {
        self.bw.write_start_code(0x01 + row as u8);
        self.bw.write_bits(8, 5);
        self.bw.write_bit(false);
        self.dc_pred = [0; 3];
        self.pmv = [[[0; 2]; 2]; 2];
        self
    }

    fn write_mba(&mut self, increment: u32) {
        let mut inc = increment;
        while inc > 33 {
            self.bw.write_bits(0b00000001000, 11);
            inc -= 33;
        }
        let (len, code) = MBA_CODES[inc as usize - 1];
        self.bw.write_bits(code, len);
        if increment > 1 {
            // 跳过的宏块清零 DC 预测; P 图像同时清零矢量预测
            self.dc_pred = [0; 3];
            if self.kind == PictureCodingType::P {
                self.pmv[0][0] = [0; 2];
                self.pmv[1][0] = [0; 2];
            }
        }
    }

    fn write_dc(&mut self, cc: usize, value: i32) {
        let diff = value - self.dc_pred[cc];
        self.dc_pred[cc] = value;
        let size = 32 - diff.unsigned_abs().leading_zeros();
        let (len, code) = if cc == 0 {
            DC_LUMA_CODES[size as usize]
        } else {
            DC_CHROMA_CODES[size as usize]
        };
        self.bw.write_bits(code, len);
        if size > 0 {
            let bits = if diff > 0 { diff } else { diff + (1 << size) - 1 };
            self.bw.write_bits(bits as u32, size);
        }
    }

    /// 平坦的 Intra 宏块, 三个分量分别取 (y, cb, cr)
    pub fn intra_mb(&mut self, increment: u32, y: u8, cb: u8, cr: u8) -> &mut Self {
        self.write_intra(increment, [y; 4], cb, cr, false, [0, 0])
    }

    /// 场 DCT 的 Intra 宏块: 顶场行取 `top`, 底场行取 `bottom`, 色度为 128
    pub fn field_dct_intra_mb(&mut self, increment: u32, top: u8, bottom: u8) -> &mut Self {
        self.write_intra(increment, [top, top, bottom, bottom], 128, 128, true, [0, 0])
    }

    /// 帧 DCT 的 Intra 宏块, 上半 8 行取 `upper`, 下半 8 行取 `lower`
    pub fn split_intra_mb(&mut self, increment: u32, upper: u8, lower: u8) -> &mut Self {
        self.write_intra(increment, [upper, upper, lower, lower], 128, 128, false, [0, 0])
    }

    /// 携带隐藏运动矢量的平坦 Intra 宏块
    pub fn concealed_intra_mb(&mut self, increment: u32, y: u8, mv: [i32; 2]) -> &mut Self {
        assert!(self.coding.concealment);
        self.write_intra(increment, [y; 4], 128, 128, false, mv)
    }

    fn write_intra(
        &mut self,
        increment: u32,
        luma: [u8; 4],
        cb: u8,
        cr: u8,
        dct_field: bool,
        concealment_mv: [i32; 2],
    ) -> &mut Self {
        self.write_mba(increment);
        match self.kind {
            PictureCodingType::I | PictureCodingType::D => self.bw.write_bits(0b1, 1),
            PictureCodingType::P | PictureCodingType::B => self.bw.write_bits(0b00011, 5),
        }
        if self.has_dct_type() {
            self.bw.write_bit(dct_field);
        } else {
            assert!(!dct_field, "该图像没有 dct_type");
        }
        if self.mpeg2 && self.coding.concealment {
            if self.structure != Structure::Frame {
                self.bw.write_bit(self.structure == Structure::Bottom); // field_select
            }
            self.write_vector_at(0, 0, concealment_mv, false, None);
            self.pmv[1][0] = self.pmv[0][0];
            self.bw.write_bit(true); // marker_bit
        } else {
            self.pmv = [[[0; 2]; 2]; 2];
        }
        let chroma_levels = [i32::from(cb) - 128, i32::from(cr) - 128];
        for comp in 0..self.chroma.block_count() {
            let (cc, level) = if comp < 4 {
                (0, i32::from(luma[comp]) - 128)
            } else {
                let cc = (comp & 1) + 1;
                (cc, chroma_levels[cc - 1])
            };
            self.write_dc(cc, level);
            if self.kind != PictureCodingType::D {
                self.bw.write_bits(0b10, 2); // EOB
            }
        }
        if self.kind == PictureCodingType::D {
            self.bw.write_bit(true); // end_of_macroblock
        }
        self
    }

    /// 帧图像且 frame_pred_frame_dct 为 0 时, Intra 与有残差的宏块带 dct_type
    fn has_dct_type(&self) -> bool {
        self.mpeg2 && self.structure == Structure::Frame && !self.coding.frame_pred_frame_dct
    }

    fn write_motion_code(&mut self, delta: i32) {
        assert!((-16..=15).contains(&delta), "f_code 1 的矢量差超出范围: {}", delta);
        let (len, code) = MOTION_CODES[delta.unsigned_abs() as usize];
        self.bw.write_bits(code, len);
        if delta != 0 {
            self.bw.write_bit(delta < 0);
        }
    }

    fn write_dmvector(&mut self, value: i32) {
        match value {
            0 => self.bw.write_bits(0b0, 1),
            1 => self.bw.write_bits(0b10, 2),
            -1 => self.bw.write_bits(0b11, 2),
            other => panic!("dmvector 只能是 -1/0/1: {}", other),
        }
    }

    /// 写入预测器 `pmv[r][s]` 对应的矢量; `field_scale` 时 `mv` 的垂直分量为场单位,
    /// 预测器按帧单位保存
    fn write_vector_at(&mut self, r: usize, s: usize, mv: [i32; 2], field_scale: bool, dmv: Option<[i32; 2]>) {
        self.write_motion_code(mv[0] - self.pmv[r][s][0]);
        self.pmv[r][s][0] = mv[0];
        if let Some(d) = dmv {
            self.write_dmvector(d[0]);
        }
        let pred = if field_scale { self.pmv[r][s][1] >> 1 } else { self.pmv[r][s][1] };
        self.write_motion_code(mv[1] - pred);
        self.pmv[r][s][1] = if field_scale { mv[1] << 1 } else { mv[1] };
        if let Some(d) = dmv {
            self.write_dmvector(d[1]);
        }
    }

    fn write_vector(&mut self, s: usize, mv: [i32; 2]) {
        self.write_vector_at(0, s, mv, false, None);
        self.pmv[1][s] = self.pmv[0][s];
    }

    /// MPEG-2 P 图像中只有前向运动补偿的宏块, 无残差
    pub fn motion_mb(&mut self, increment: u32, motion: Motion) -> &mut Self {
        assert!(self.mpeg2 && self.kind == PictureCodingType::P);
        let frame_picture = self.structure == Structure::Frame;
        assert!(!(frame_picture && self.coding.frame_pred_frame_dct), "frame_pred_frame_dct 时只有帧预测");
        self.write_mba(increment);
        self.bw.write_bits(0b001, 3);
        let motion_type = match motion {
            Motion::FieldInFrame(_) | Motion::Field(..) => 0b01,
            Motion::Field16x8(_) => 0b10,
            Motion::DualPrime(..) => 0b11,
        };
        self.bw.write_bits(motion_type, 2);
        match motion {
            Motion::FieldInFrame(vectors) => {
                assert!(frame_picture);
                for (r, (select, mv)) in vectors.into_iter().enumerate() {
                    self.bw.write_bit(select);
                    self.write_vector_at(r, 0, mv, true, None);
                }
            }
            Motion::Field(select, mv) => {
                assert!(!frame_picture);
                self.bw.write_bit(select);
                self.write_vector(0, mv);
            }
            Motion::Field16x8(vectors) => {
                assert!(!frame_picture);
                for (r, (select, mv)) in vectors.into_iter().enumerate() {
                    self.bw.write_bit(select);
                    self.write_vector_at(r, 0, mv, false, None);
                }
            }
            Motion::DualPrime(mv, dmv) => {
                self.write_vector_at(0, 0, mv, frame_picture, Some(dmv));
                self.pmv[1][0] = self.pmv[0][0];
            }
        }
        self.dc_pred = [0; 3];
        self
    }

    /// 只有前向运动补偿, 无残差
    pub fn forward_mb(&mut self, increment: u32, mv: [i32; 2]) -> &mut Self {
        self.write_mba(increment);
        match self.kind {
            PictureCodingType::P => self.bw.write_bits(0b001, 3),
            PictureCodingType::B => self.bw.write_bits(0b0010, 4),
            other => panic!("{:?} 图像没有前向预测", other),
        }
        self.write_vector(0, mv);
        self.dc_pred = [0; 3];
        self
    }

    /// 只有后向运动补偿, 无残差
    pub fn backward_mb(&mut self, increment: u32, mv: [i32; 2]) -> &mut Self {
        assert_eq!(self.kind, PictureCodingType::B);
        self.write_mba(increment);
        self.bw.write_bits(0b010, 3);
        self.write_vector(1, mv);
        self.dc_pred = [0; 3];
        self
    }

    /// 双向插值预测, 无残差
    pub fn bidirectional_mb(&mut self, increment: u32, forward: [i32; 2], backward: [i32; 2]) -> &mut Self {
        assert_eq!(self.kind, PictureCodingType::B);
        self.write_mba(increment);
        self.bw.write_bits(0b10, 2);
        self.write_vector(0, forward);
        self.write_vector(1, backward);
        self.dc_pred = [0; 3];
        self
    }

    /// 写入任意位, 用于构造损坏的码流
    pub fn raw_bits(&mut self, value: u32, n: u32) -> &mut Self {
        self.bw.write_bits(value, n);
        self
    }

    /// 一行全部为平坦 Intra 宏块的 slice
    pub fn intra_row(&mut self, row: u32, mb_count: u32, y: u8) -> &mut Self {
        self.slice(row);
        for _ in 0..mb_count {
            self.intra_mb(1, y, 128, 128);
        }
        self
    }

    /// 整幅平坦 Intra 图像
    pub fn flat_picture(&mut self, kind: PictureCodingType, temporal_reference: u32, mb_width: u32, mb_height: u32, y: u8) -> &mut Self {
        self.picture(kind, temporal_reference);
        for row in 0..mb_height {
            self.intra_row(row, mb_width, y);
        }
        self
    }

    pub fn sequence_end(&mut self) -> &mut Self {
        self.bw.write_start_code(0xB7);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.bw.finish()
    }
}

/// 默认矩阵系数下 (y, cb, cr) 对应的 ARGB
pub fn argb(y: u8, cb: u8, cr: u8) -> u32 {
    ycbcr_to_argb(y, cb, cr, &INVERSE_COEFFICIENTS[MatrixCoefficients::default().code()])
}

/// 灰度像素
pub fn gray(y: u8) -> u32 {
    argb(y, 128, 128)
}

/// 记录调用顺序的像素接收端, 逐像素校验行主序
#[derive(Debug, Default)]
pub struct OrderCheckingSink {
    pub pictures: Vec<(u32, u32)>,
    pub pixels: u64,
    pub ended: usize,
    next: (u32, u32),
    width: u32,
    pub out_of_order: bool,
    pub first_pixel: Vec<u32>,
}

impl PixelSink for OrderCheckingSink {
    fn write(&mut self, x: u32, y: u32, argb: u32) {
        if (x, y) != self.next {
            self.out_of_order = true;
        }
        if (x, y) == (0, 0) {
            self.first_pixel.push(argb);
        }
        self.pixels += 1;
        self.next = if x + 1 == self.width { (0, y + 1) } else { (x + 1, y) };
    }

    fn begin_picture(&mut self, width: u32, height: u32) {
        self.pictures.push((width, height));
        self.width = width;
        self.next = (0, 0);
    }

    fn end_picture(&mut self) {
        self.ended += 1;
    }
}
